use std::io::Write;
use std::path::{Path, PathBuf};

use structopt::clap::AppSettings::*;
use structopt::StructOpt;
use userfile_format::{
    fs, random_access, read_users, reformat, transcode, write_users, Format, Settings, User,
    XmlStreamReader,
};

mod error;

use error::{Error, Result};

#[derive(Debug, StructOpt)]
enum Commands {
    #[structopt(
        name = "s",
        visible_alias = "show",
        about = "Decode a user file and print it as JSON"
    )]
    Show {
        #[structopt(long, help = "Read XML with the streaming reader")]
        stream: bool,

        #[structopt(
            name = "userfile",
            parse(from_os_str),
            help = "Path to a .csv, .json or .xml file"
        )]
        path: PathBuf,
    },

    #[structopt(
        name = "c",
        visible_alias = "convert",
        about = "Convert a user file to another format, chosen by extension"
    )]
    Convert {
        #[structopt(parse(from_os_str), help = "File to read")]
        source: PathBuf,

        #[structopt(parse(from_os_str), help = "File to write; replaced if it exists")]
        target: PathBuf,
    },

    #[structopt(
        name = "r",
        visible_alias = "read-at",
        about = "Read bytes at an offset of a file"
    )]
    ReadAt {
        #[structopt(parse(from_os_str))]
        path: PathBuf,

        #[structopt(help = "Zero-based byte offset")]
        position: u64,

        #[structopt(help = "Maximum number of bytes to read")]
        length: u64,

        #[structopt(short, long, help = "Print as UTF-8 text instead of raw bytes")]
        text: bool,
    },

    #[structopt(
        name = "w",
        visible_alias = "write-at",
        about = "Write text at an offset of a file"
    )]
    WriteAt {
        #[structopt(parse(from_os_str))]
        path: PathBuf,

        #[structopt(help = "Zero-based byte offset")]
        position: u64,

        #[structopt(help = "Text to write, as UTF-8")]
        data: String,
    },

    #[structopt(
        name = "t",
        visible_alias = "transcode",
        about = "Re-encode a text file between character sets"
    )]
    Transcode {
        #[structopt(parse(from_os_str))]
        source: PathBuf,

        #[structopt(parse(from_os_str))]
        target: PathBuf,

        #[structopt(short, long, default_value = "utf-8", help = "Charset of the source")]
        from: String,

        #[structopt(short, long, help = "Charset to write")]
        to: String,
    },

    #[structopt(
        name = "f",
        visible_alias = "format",
        about = "Trim, collapse spaces and capitalize each line into a new file"
    )]
    Format {
        #[structopt(parse(from_os_str))]
        source: PathBuf,

        #[structopt(
            short,
            long,
            parse(from_os_str),
            help = "Directory for the output [default: configured temp_path]"
        )]
        output_dir: Option<PathBuf>,
    },

    #[structopt(name = "i", visible_alias = "info", about = "Show file information")]
    Info {
        #[structopt(parse(from_os_str))]
        path: PathBuf,
    },

    #[structopt(
        name = "g",
        visible_alias = "search",
        about = "Find the lines of a file containing some text"
    )]
    Search {
        #[structopt(parse(from_os_str))]
        path: PathBuf,

        needle: String,
    },

    #[structopt(
        name = "b",
        visible_alias = "bench",
        about = "Time unbuffered, buffered and whole-file reads of a file"
    )]
    Bench {
        #[structopt(parse(from_os_str))]
        path: PathBuf,
    },

    #[structopt(name = "l", visible_alias = "list", about = "List user files in a directory")]
    List {
        #[structopt(
            parse(from_os_str),
            help = "Directory to list [default: configured base_path]"
        )]
        dir: Option<PathBuf>,
    },

    #[structopt(name = "init", about = "Create the data, exports and temp directories")]
    Init {
        #[structopt(
            parse(from_os_str),
            help = "Base directory [default: configured base_path]"
        )]
        base: Option<PathBuf>,
    },
}

#[derive(Debug, StructOpt)]
#[structopt(
    name = "userfile",
    about = "Read, convert and inspect user record files.",
    settings = &[SubcommandRequiredElseHelp, DisableHelpSubcommand, VersionlessSubcommands],
    usage = "userfile (s|c|r|w|t|f|i|g|l|init) [FLAGS|OPTIONS] <args>..."
)]
struct CliOpts {
    #[structopt(short, long, help = "Show verbose output", global = true)]
    verbose: bool,

    #[structopt(
        short,
        long,
        parse(from_os_str),
        help = "Settings file layered over userfile.toml",
        global = true
    )]
    config: Option<PathBuf>,

    #[structopt(subcommand)]
    cmd: Commands,
}

fn format_of(path: &Path) -> Result<Format> {
    Format::from_path(path).ok_or_else(|| Error::UnknownFormat {
        path: path.to_path_buf(),
    })
}

fn load_users(settings: &Settings, path: &Path, stream: bool) -> Result<Vec<User>> {
    let format = format_of(path)?;
    let result = if stream && format == Format::Xml {
        read_users(&XmlStreamReader, path)
    } else {
        if stream {
            tracing::warn!(format = format.name(), "--stream only applies to XML; ignoring");
        }
        read_users(&*format.codec(settings.json), path)
    };
    result.map_err(|source| Error::ReadUsers {
        path: path.to_path_buf(),
        source,
    })
}

fn stdout_line(line: &str) -> Result<()> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    writeln!(out, "{}", line).map_err(|source| Error::Stdout { source })
}

fn show(settings: &Settings, path: PathBuf, stream: bool) -> Result<()> {
    let users = load_users(settings, &path, stream)?;
    let json = serde_json::to_string_pretty(&users).map_err(|source| Error::Render { source })?;
    stdout_line(&json)
}

fn convert(settings: &Settings, source: PathBuf, target: PathBuf, verbose: bool) -> Result<()> {
    let users = load_users(settings, &source, false)?;
    let codec = format_of(&target)?.codec(settings.json);
    write_users(&*codec, &target, &users).map_err(|e| Error::WriteUsers {
        path: target.clone(),
        source: e,
    })?;

    if verbose {
        stdout_line(&format!(
            "{} -> {} ({} users)",
            source.display(),
            target.display(),
            users.len()
        ))?;
    }
    Ok(())
}

fn read_at(path: PathBuf, position: u64, length: u64, text: bool) -> Result<()> {
    let bytes = random_access::read_at(&path, position, length)
        .map_err(|source| Error::ReadAt { path, source })?;

    if text {
        return stdout_line(&String::from_utf8_lossy(&bytes));
    }
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    out.write_all(&bytes)
        .and_then(|_| out.flush())
        .map_err(|source| Error::Stdout { source })
}

fn write_at(path: PathBuf, position: u64, data: String, verbose: bool) -> Result<()> {
    random_access::write_text_at(&path, position, &data).map_err(|source| Error::WriteAt {
        path: path.clone(),
        source,
    })?;

    if verbose {
        stdout_line(&format!(
            "Wrote {} bytes at offset {} of {}",
            data.len(),
            position,
            path.display()
        ))?;
    }
    Ok(())
}

fn transcode_file(source: PathBuf, target: PathBuf, from: String, to: String) -> Result<()> {
    let stats = transcode(&source, &target, &from, &to).map_err(|e| Error::Transcode {
        path: source.clone(),
        target: target.clone(),
        source: e,
    })?;

    if stats.substitutions > 0 {
        eprintln!(
            "{} character(s) could not be represented in {} and were replaced with '?'",
            stats.substitutions, to
        );
    }
    stdout_line(&format!("{} lines written to {}", stats.lines, target.display()))
}

fn format_file(settings: &Settings, source: PathBuf, output_dir: Option<PathBuf>) -> Result<()> {
    let dir = output_dir.unwrap_or_else(|| settings.temp_path.clone());
    let out = reformat::reformat_file_in(&source, &dir).map_err(|e| Error::Reformat {
        path: source.clone(),
        source: e,
    })?;
    stdout_line(&out.display().to_string())
}

fn info(path: PathBuf, verbose: bool) -> Result<()> {
    use humansize::{file_size_opts as options, FileSize};

    let info = fs::file_info(&path).map_err(|source| Error::Inspect {
        path: path.clone(),
        source,
    })?;
    stdout_line(&info.to_string())?;

    if let Some(size) = info.size.filter(|_| verbose) {
        let human = size
            .file_size(options::BINARY)
            .unwrap_or_else(|_| format!("{} B", size));
        stdout_line(&format!("Size: {}", human))?;
    }
    Ok(())
}

fn search(path: PathBuf, needle: String) -> Result<()> {
    let found = fs::search_text(&path, &needle).map_err(|source| Error::Inspect {
        path: path.clone(),
        source,
    })?;

    if found.is_empty() {
        return stdout_line(&format!("'{}' not found in {}", needle, path.display()));
    }
    let lines = found
        .lines
        .iter()
        .map(|n| n.to_string())
        .collect::<Vec<_>>()
        .join(", ");
    stdout_line(&format!(
        "'{}' found {} time(s) on line(s) {}",
        needle, found.occurrences, lines
    ))
}

fn bench(path: PathBuf) -> Result<()> {
    let comparison = fs::compare_read_strategies(&path).map_err(|source| Error::Inspect {
        path: path.clone(),
        source,
    })?;
    stdout_line(&comparison.to_string())
}

fn list(dir: PathBuf) -> Result<()> {
    let names = fs::list_user_files(&dir).map_err(|source| Error::Inspect {
        path: dir.clone(),
        source,
    })?;
    for name in names {
        stdout_line(&name)?;
    }
    Ok(())
}

fn init(base: PathBuf, verbose: bool) -> Result<()> {
    let layout = fs::validate_directory_structure(&base).map_err(|source| {
        Error::PrepareDirectories {
            path: base.clone(),
            source,
        }
    })?;

    for dir in layout.directories() {
        let created = layout.created.iter().any(|c| c == dir);
        if verbose || created {
            let status = if created { "created" } else { "ok" };
            stdout_line(&format!("{:8} {}", status, dir.display()))?;
        }
    }
    Ok(())
}

fn load_settings(config: Option<&Path>) -> Result<Settings> {
    let settings = match config {
        Some(path) => Settings::load_from(path),
        None => Settings::load(),
    }
    .map_err(|source| Error::Settings { source })?;

    settings
        .ensure_directories()
        .map_err(|source| Error::PrepareDirectories {
            path: settings.base_path.clone(),
            source,
        })?;
    tracing::debug!(?settings, "settings loaded");
    Ok(settings)
}

fn run(opts: CliOpts) -> Result<()> {
    let settings = load_settings(opts.config.as_deref())?;
    let verbose = opts.verbose;

    match opts.cmd {
        Commands::Show { path, stream } => show(&settings, path, stream),
        Commands::Convert { source, target } => convert(&settings, source, target, verbose),
        Commands::ReadAt {
            path,
            position,
            length,
            text,
        } => read_at(path, position, length, text),
        Commands::WriteAt {
            path,
            position,
            data,
        } => write_at(path, position, data, verbose),
        Commands::Transcode {
            source,
            target,
            from,
            to,
        } => transcode_file(source, target, from, to),
        Commands::Format { source, output_dir } => format_file(&settings, source, output_dir),
        Commands::Info { path } => info(path, verbose),
        Commands::Search { path, needle } => search(path, needle),
        Commands::Bench { path } => bench(path),
        Commands::List { dir } => list(dir.unwrap_or_else(|| settings.base_path.clone())),
        Commands::Init { base } => {
            init(base.unwrap_or_else(|| settings.base_path.clone()), verbose)
        }
    }
}

fn main() {
    let opts = CliOpts::from_iter(wild::args_os());

    let level = if opts.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level)
        .init();

    if let Err(e) = run(opts) {
        tracing::debug!(kind = ?e.kind(), "command failed");
        eprintln!("error: {}", e);
        let mut source = std::error::Error::source(&e);
        while let Some(cause) = source {
            eprintln!("  caused by: {}", cause);
            source = cause.source();
        }
        std::process::exit(1);
    }
}
