//! Layered settings: built-in defaults, then `userfile.toml`, then
//! `USERFILE_*` environment variables.

use std::path::PathBuf;

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::codec::JsonConfig;
use crate::error::{Error, Result};
use crate::fs::DirectoryLayout;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub base_path: PathBuf,
    pub temp_path: PathBuf,
    pub export_path: PathBuf,
    pub create_directories_on_startup: bool,
    pub json: JsonConfig,
}

impl Default for Settings {
    fn default() -> Self {
        let base = PathBuf::from("./data");
        Settings {
            temp_path: base.join("temp"),
            export_path: base.join("exports"),
            base_path: base,
            create_directories_on_startup: true,
            json: JsonConfig::default(),
        }
    }
}

impl Settings {
    pub const DEFAULT_CONFIG_FILE: &'static str = "userfile.toml";
    pub const ENV_PREFIX: &'static str = "USERFILE_";

    /// The provider stack behind [`Settings::load`]. Nested keys are written
    /// with a double underscore, as in `USERFILE_JSON__INDENT=4`.
    pub fn figment() -> Figment {
        Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(Self::DEFAULT_CONFIG_FILE))
            .merge(Env::prefixed(Self::ENV_PREFIX).split("__"))
    }

    pub fn load() -> std::result::Result<Settings, figment::Error> {
        Self::figment().extract()
    }

    /// Like [`Settings::load`], with an extra TOML file merged over the
    /// default one and under the environment.
    pub fn load_from(path: &std::path::Path) -> std::result::Result<Settings, figment::Error> {
        Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(Self::DEFAULT_CONFIG_FILE))
            .merge(Toml::file(path))
            .merge(Env::prefixed(Self::ENV_PREFIX).split("__"))
            .extract()
    }

    /// Creates the configured directories, plus the standard layout under
    /// `base_path`, when `create_directories_on_startup` is set.
    pub fn ensure_directories(&self) -> Result<Option<DirectoryLayout>> {
        if !self.create_directories_on_startup {
            return Ok(None);
        }

        for dir in [&self.base_path, &self.temp_path, &self.export_path] {
            std::fs::create_dir_all(dir).map_err(|e| Error::Io(e, dir.clone()))?;
        }
        crate::fs::validate_directory_structure(&self.base_path).map(Some)
    }
}
