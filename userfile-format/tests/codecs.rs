//! End-to-end reads and writes of user files through every codec.

use chrono::NaiveDate;
use tempfile::TempDir;
use userfile_format::{
    read_users, write_users, CsvCodec, Decoder, Encoder, ErrorKind, Format, JsonCodec, JsonConfig,
    User, XmlStreamReader, XmlTreeCodec,
};

fn sample_users() -> Vec<User> {
    let at = |d: u32, h: u32| {
        NaiveDate::from_ymd_opt(2024, 1, d)
            .unwrap()
            .and_hms_opt(h, 15, 30)
            .unwrap()
    };

    let mut ana = User::new(Some(1), "Ana Ruiz", "ana@example.com", "IT", "Developer");
    ana.created_at = at(1, 9);
    ana.updated_at = at(3, 17);

    let mut bo = User::new(None, "Bo <Lee> & Co", "bo@example.com", "R&D", "Lead");
    bo.active = false;
    bo.created_at = at(2, 10);
    bo.updated_at = at(2, 10);

    let mut eva = User::new(Some(-42), "", "", "", "");
    eva.created_at = at(5, 0);
    eva.updated_at = at(6, 23);

    let mut blank = User::new(Some(i64::MAX), " ", "  ", "\t", " \t ");
    blank.created_at = at(7, 8);
    blank.updated_at = at(7, 8);

    let mut padded = User::new(Some(i64::MIN), "  Ana  ", " ana@example.com", "IT ", "  Ops");
    padded.created_at = at(8, 1);
    padded.updated_at = at(9, 2);

    let mut unicode = User::new(None, "Zoë Ñúñez 東京", "zoë@例え.jp", "Δ-team", "Straße");
    unicode.active = false;
    unicode.created_at = at(10, 11);
    unicode.updated_at = at(11, 12);

    vec![ana, bo, eva, blank, padded, unicode]
}

#[test]
fn every_format_round_trips_through_files() {
    let dir = TempDir::new().unwrap();
    let users = sample_users();

    for ext in Format::EXTENSIONS {
        let path = dir.path().join(format!("users.{}", ext));
        let format = Format::from_path(&path).unwrap();
        let codec = format.codec(JsonConfig::default());

        write_users(&*codec, &path, &users).unwrap();
        let back = read_users(&*codec, &path).unwrap();
        assert_eq!(back, users, "{} round trip", format.name());
    }
}

#[test]
fn csv_round_trip_keeps_comma_free_values() {
    // CSV has no quoting, so only the comma-free sample survives it intact.
    let users = sample_users();
    let text = CsvCodec.encode(&users).unwrap();
    assert_eq!(CsvCodec.decode(&text).unwrap(), users);
}

#[test]
fn conversion_chain_preserves_records() {
    let users = sample_users();

    let json = JsonCodec::default().encode(&users).unwrap();
    let from_json = JsonCodec::default().decode(&json).unwrap();
    let xml = XmlTreeCodec.encode(&from_json).unwrap();
    let from_xml = XmlStreamReader.decode(&xml).unwrap();
    let csv = CsvCodec.encode(&from_xml).unwrap();

    assert_eq!(CsvCodec.decode(&csv).unwrap(), users);
}

#[test]
fn tree_and_stream_readers_agree() {
    let now = NaiveDate::from_ymd_opt(2024, 2, 2)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap();
    let doc = "<users><user><name>Ana</name><id>7</id></user></users>";

    let tree = XmlTreeCodec.decode_at(doc, now).unwrap();
    let stream = XmlStreamReader.decode_at(doc, now).unwrap();
    assert_eq!(tree, stream);
    assert_eq!(tree.len(), 1);
    assert_eq!(tree[0].id, Some(7));
    assert_eq!(tree[0].name, "Ana");
    assert!(tree[0].active);
    assert_eq!(tree[0].created_at, now);

    let encoded = XmlTreeCodec.encode(&sample_users()).unwrap();
    assert_eq!(
        XmlTreeCodec.decode_at(&encoded, now).unwrap(),
        XmlStreamReader.decode_streaming(&encoded).unwrap()
    );
}

#[test]
fn empty_inputs_decode_to_nothing() {
    let csv = "id,name,email,department,role,active,createdAt,updatedAt\n";
    assert!(CsvCodec.decode(csv).unwrap().is_empty());
    assert!(JsonCodec::default().decode("[]").unwrap().is_empty());
    assert!(XmlTreeCodec.decode("<users></users>").unwrap().is_empty());
    assert!(XmlStreamReader.decode("<users></users>").unwrap().is_empty());
}

#[test]
fn failures_are_classified() {
    let dir = TempDir::new().unwrap();
    let err = read_users(&CsvCodec, dir.path().join("missing.csv")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let err = JsonCodec::default().decode("{not json").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Parse);

    let err = XmlTreeCodec.decode("<users><user></users>").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Parse);
}

#[test]
fn compact_json_is_single_line() {
    let codec = JsonCodec::new(JsonConfig {
        pretty: false,
        indent: 0,
    });
    let text = codec.encode(&sample_users()).unwrap();
    assert!(!text.trim_end().contains('\n'));
    assert_eq!(codec.decode(&text).unwrap(), sample_users());
}

#[test]
fn byte_order_mark_is_ignored_on_read() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bom.json");
    std::fs::write(&path, "\u{feff}[{\"id\": 3, \"name\": \"Zoe\"}]").unwrap();

    let users = read_users(&JsonCodec::default(), &path).unwrap();
    assert_eq!(users[0].id, Some(3));
    assert_eq!(users[0].name, "Zoe");
}
