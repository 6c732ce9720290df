use std::path::PathBuf;

use sprinkler::Anchor;
use sprinkler::Config;
use sprinkler::ConfigError;
use sprinkler::Document;
use sprinkler::StartTime;

fn sample_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("config.sample.ini")
}

#[test]
fn loads_sample_config() {
    let config = Config::load(sample_path()).unwrap();
    assert_eq!(config.opensprinkler.controller, "http://192.168.1.20");
    assert_eq!(config.database.table, "public.lines");
    assert_eq!(config.irrigation.daily_slots(), 2);

    let morning = &config.irrigation.slots[0];
    assert_eq!(morning.name, "morning");
    assert_eq!(morning.time.anchor(), Some(Anchor::Sunrise));
    assert_eq!(morning.time.to_string(), "sunrise");

    let evening = &config.irrigation.slots[1];
    assert_eq!(evening.time, StartTime::sunset(-180).unwrap());
    assert_eq!(
        config.irrigation.program_names(1),
        ["Auto Day 1 morning", "Auto Day 1 evening"]
    );
}

#[test]
fn sample_survives_a_rewrite() {
    let text = std::fs::read_to_string(sample_path()).unwrap();
    let original = Document::parse(&text).unwrap();
    let rewritten = Document::parse(&original.to_string()).unwrap();
    assert_eq!(original, rewritten);

    let config = Config::from_document(&original).unwrap();
    assert_eq!(config.to_document().unwrap(), original);
}

#[test]
fn missing_file_is_an_io_error() {
    let path = sample_path().with_file_name("no-such-config.ini");
    match Config::load(&path) {
        Err(ConfigError::Io { path: p, .. }) => assert_eq!(p, path),
        other => panic!("unexpected result {other:?}"),
    }
}

#[test]
fn one_slot_defined_for_two_daily_slots_is_rejected() {
    let text = "\
[opensprinkler]
controller = http://os.local
password = secret

[database]
config = dbname=garden
table = lines

[irrigation]
daily_slots = 2
slot_minutes = 45
slot_1_name = morning
slot_1_time = 390
";
    let err = text.parse::<Config>().unwrap_err();
    assert!(matches!(
        err,
        ConfigError::SlotCountMismatch {
            expected: 2,
            found: 1,
            ..
        }
    ));
    assert_eq!(
        err.to_string(),
        "daily_slots is 2, but only 1 complete slot definitions were found (slot_2_name is missing)"
    );
}
