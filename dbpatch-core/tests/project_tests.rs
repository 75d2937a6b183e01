//! Settings files, on-disk databases and the ledger working together.

use assert_fs::prelude::*;
use dbpatch_core::{
    config::{self, ConnectionConfig},
    Connections, Ledger, PatchError, PatchId, Settings,
};
use predicates::prelude::predicate;
use std::fs;
use std::path::PathBuf;

// ---------------------------------------------------------------------------
// 1. Settings files
// ---------------------------------------------------------------------------

#[test]
fn init_writes_defaults_once() {
    let root = assert_fs::TempDir::new().expect("tempdir");

    assert!(config::init_at(root.path()).expect("first init"));
    root.child("dbpatch.yaml").assert(predicate::path::exists());
    root.child("dbpatch.yaml.tmp").assert(predicate::path::missing());

    let mut custom = Settings::default();
    custom.table = "schema_log".to_string();
    config::save_at(root.path(), &custom).expect("save");

    assert!(!config::init_at(root.path()).expect("second init"));
    let loaded = config::load_at(root.path()).expect("load");
    assert_eq!(loaded.table, "schema_log");
}

#[test]
fn corrupt_settings_report_the_file() {
    let root = assert_fs::TempDir::new().expect("tempdir");
    root.child("dbpatch.yaml")
        .write_str("table: [unclosed\n")
        .expect("write");

    let err = config::load_at(root.path()).unwrap_err();
    assert!(matches!(err, PatchError::ConfigParse { .. }), "got: {err}");
    assert!(err.to_string().contains("dbpatch.yaml"));
}

#[test]
fn invalid_table_name_is_rejected_on_load() {
    let root = assert_fs::TempDir::new().expect("tempdir");
    root.child("dbpatch.yaml")
        .write_str("table: \"patches; DROP TABLE users\"\n")
        .expect("write");

    let err = config::load_at(root.path()).unwrap_err();
    assert!(matches!(err, PatchError::InvalidTableName(_)), "got: {err}");
}

#[test]
fn default_connection_must_be_configured() {
    let root = assert_fs::TempDir::new().expect("tempdir");
    root.child("dbpatch.yaml")
        .write_str("default_connection: reporting\n")
        .expect("write");

    let err = config::load_at(root.path()).unwrap_err();
    assert!(matches!(err, PatchError::UnknownConnection { .. }), "got: {err}");
}

// ---------------------------------------------------------------------------
// 2. On-disk ledger
// ---------------------------------------------------------------------------

#[test]
fn ledger_survives_reopening_the_database() {
    let root = assert_fs::TempDir::new().expect("tempdir");
    let settings = Settings::default();

    {
        let conns = Connections::open_at(root.path(), &settings).expect("open");
        let ledger =
            Ledger::new(conns.get("main").expect("main"), &settings.table).expect("ledger");
        ledger.create().expect("create");
        ledger.record(&PatchId::from("001_create_users"), 1).expect("record");
        ledger.record(&PatchId::from("002_add_index"), 2).expect("record");
    }

    root.child("database/database.sqlite")
        .assert(predicate::path::is_file());

    let conns = Connections::open_at(root.path(), &settings).expect("reopen");
    let ledger = Ledger::new(conns.get("main").expect("main"), &settings.table).expect("ledger");
    assert!(ledger.exists().expect("exists"));
    assert_eq!(ledger.last_batch_number().expect("last"), 2);
    assert_eq!(
        ledger.most_recent_batch().expect("batch"),
        vec![dbpatch_core::LedgerEntry::new(PatchId::from("002_add_index"), 2)]
    );
}

#[test]
fn named_connections_are_separate_databases() {
    let root = assert_fs::TempDir::new().expect("tempdir");
    let mut settings = Settings::default();
    settings.connections.insert(
        "analytics".to_string(),
        ConnectionConfig {
            database: PathBuf::from("data").join("analytics.sqlite"),
        },
    );

    let conns = Connections::open_at(root.path(), &settings).expect("open");
    assert_eq!(conns.names().collect::<Vec<_>>(), ["analytics", "main"]);

    let main = Ledger::new(conns.get("main").expect("main"), "patches").expect("ledger");
    main.create().expect("create");
    let analytics =
        Ledger::new(conns.get("analytics").expect("analytics"), "patches").expect("ledger");
    assert!(!analytics.exists().expect("exists"));

    root.child("data/analytics.sqlite")
        .assert(predicate::path::is_file());
}

#[test]
fn scanner_from_settings_uses_the_configured_extension() {
    let root = assert_fs::TempDir::new().expect("tempdir");
    let patches = root.child("database/patches");
    patches.create_dir_all().expect("mkdir");
    patches.child("001_a.sql").touch().expect("touch");
    patches.child("002_b.patch").touch().expect("touch");
    fs::write(root.path().join("dbpatch.yaml"), "extension: patch\n").expect("write");

    let settings = config::load_at(root.path()).expect("load");
    let paths = settings.patch_paths(root.path(), &[], false);
    let found = settings.scanner().scan(&paths).expect("scan");

    assert_eq!(
        found.keys().map(PatchId::as_str).collect::<Vec<_>>(),
        ["002_b"]
    );
}
