//! Byte and line level file tools, driven through the public API.

use tempfile::TempDir;
use userfile_format::fs::{
    create_temp_file, list_user_files, search_text, validate_directory_structure,
};
use userfile_format::{
    read_at, reformat, reformat_file_in, transcode, write_at, write_users, CsvCodec, ErrorKind,
    User,
};

#[test]
fn write_past_end_then_read_whole_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("blob.bin");
    std::fs::write(&path, [0xAAu8; 10]).unwrap();

    write_at(&path, 100, b"xyz").unwrap();
    let bytes = read_at(&path, 0, 200).unwrap();

    assert_eq!(bytes.len() as u64, std::fs::metadata(&path).unwrap().len());
    assert_eq!(bytes.len(), 103);
    assert!(bytes[..10].iter().all(|b| *b == 0xAA));
    assert!(bytes[10..100].iter().all(|b| *b == 0));
    assert_eq!(&bytes[100..], b"xyz");
}

#[test]
fn reformatter_normalizes_lines() {
    assert_eq!(reformat("   hello   world"), "Hello world");

    let dir = TempDir::new().unwrap();
    let source = dir.path().join("draft.txt");
    std::fs::write(&source, "   hello   world\n  second    line  \n").unwrap();

    let out = reformat_file_in(&source, dir.path()).unwrap();
    assert_ne!(out, source);
    assert_eq!(
        std::fs::read_to_string(out).unwrap(),
        "Hello world\nSecond line \n"
    );
}

#[test]
fn transcode_round_trip_preserves_text() {
    let dir = TempDir::new().unwrap();
    let original = dir.path().join("utf8.txt");
    let latin = dir.path().join("latin1.txt");
    let back = dir.path().join("back.txt");
    std::fs::write(&original, "Señor Muñoz\r\nÀ bientôt\n").unwrap();

    transcode(&original, &latin, "UTF-8", "ISO-8859-1").unwrap();
    assert_eq!(std::fs::read(&latin).unwrap().len(), "Senor Munoz\nA bientot\n".len());

    transcode(&latin, &back, "ISO-8859-1", "UTF-8").unwrap();
    assert_eq!(
        std::fs::read_to_string(&back).unwrap(),
        "Señor Muñoz\nÀ bientôt\n"
    );

    let err = transcode(&original, &back, "UTF-8", "EBCDIC-42").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Encoding);
}

#[test]
fn data_directory_workflow() {
    let dir = TempDir::new().unwrap();
    let layout = validate_directory_structure(dir.path()).unwrap();

    let users = vec![User::new(Some(1), "Ana", "ana@example.com", "IT", "Dev")];
    write_users(&CsvCodec, layout.data.join("team.csv"), &users).unwrap();
    std::fs::write(layout.data.join("notes.txt"), "Ana is on call").unwrap();

    assert_eq!(list_user_files(&layout.data).unwrap(), vec!["team.csv"]);

    let found = search_text(layout.data.join("team.csv"), "Ana").unwrap();
    assert_eq!(found.lines, vec![2]);

    let temp = create_temp_file(&layout.temp, "report_", "draft").unwrap();
    assert_eq!(temp.parent(), Some(layout.temp.as_path()));
}
