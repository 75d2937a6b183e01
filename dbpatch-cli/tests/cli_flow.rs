use std::fs;
use std::path::Path;
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::prelude::PredicateBooleanExt;
use predicates::str::contains;
use rusqlite::Connection;
use tempfile::TempDir;

fn dbpatch(root: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("dbpatch"));
    cmd.arg("--root").arg(root).env("NO_COLOR", "1").env_remove("RUST_LOG");
    cmd
}

fn write_patch(root: &Path, id: &str, body: &str) {
    let dir = root.join("database").join("patches");
    fs::create_dir_all(&dir).expect("patch dir");
    fs::write(dir.join(format!("{id}.sql")), body).expect("write patch");
}

fn ledger(root: &Path) -> Vec<(String, u32)> {
    let conn = Connection::open(root.join("database").join("database.sqlite")).expect("open db");
    let mut stmt = conn
        .prepare("SELECT patch, batch FROM patches ORDER BY batch, patch")
        .expect("prepare");
    let rows = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
        .expect("query");
    rows.collect::<Result<_, _>>().expect("rows")
}

fn table_exists(root: &Path, table: &str) -> bool {
    let conn = Connection::open(root.join("database").join("database.sqlite")).expect("open db");
    let count: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [table],
            |row| row.get(0),
        )
        .expect("query");
    count > 0
}

const USERS: &str = "-- up\nCREATE TABLE users (id INTEGER PRIMARY KEY);\n-- down\nDROP TABLE users;\n";
const POSTS: &str = "-- up\nCREATE TABLE posts (id INTEGER PRIMARY KEY);\n-- down\nDROP TABLE posts;\n";

#[test]
fn install_creates_settings_directory_and_table() {
    let root = TempDir::new().expect("root");

    dbpatch(root.path())
        .arg("install")
        .assert()
        .success()
        .stdout(contains("Patch table created successfully."));

    assert!(root.path().join("dbpatch.yaml").is_file());
    assert!(root.path().join("database").join("patches").is_dir());
    assert!(table_exists(root.path(), "patches"));

    dbpatch(root.path())
        .arg("install")
        .assert()
        .success()
        .stdout(contains("Patch table already exists."));
}

#[test]
fn patch_installs_applies_and_is_idempotent() {
    let root = TempDir::new().expect("root");
    write_patch(root.path(), "001_create_users", USERS);
    write_patch(root.path(), "002_create_posts", POSTS);

    dbpatch(root.path())
        .arg("patch")
        .assert()
        .success()
        .stdout(contains("Patch table created successfully."))
        .stdout(contains("Patched:").and(contains("002_create_posts")));

    assert_eq!(
        ledger(root.path()),
        [
            ("001_create_users".to_string(), 1),
            ("002_create_posts".to_string(), 1)
        ]
    );

    dbpatch(root.path())
        .arg("patch")
        .assert()
        .success()
        .stdout(contains("Nothing to patch."));
}

#[test]
fn rollback_and_step_rollback() {
    let root = TempDir::new().expect("root");
    write_patch(root.path(), "001_create_users", USERS);
    write_patch(root.path(), "002_create_posts", POSTS);

    dbpatch(root.path())
        .args(["patch", "--step"])
        .assert()
        .success();
    assert_eq!(
        ledger(root.path()),
        [
            ("001_create_users".to_string(), 1),
            ("002_create_posts".to_string(), 2)
        ]
    );

    dbpatch(root.path())
        .arg("rollback")
        .assert()
        .success()
        .stdout(contains("Rolled back:").and(contains("002_create_posts")));
    assert!(!table_exists(root.path(), "posts"));
    assert!(table_exists(root.path(), "users"));

    dbpatch(root.path())
        .args(["rollback", "--step", "5"])
        .assert()
        .success()
        .stdout(contains("001_create_users"));
    assert!(ledger(root.path()).is_empty());

    dbpatch(root.path())
        .arg("rollback")
        .assert()
        .success()
        .stdout(contains("Nothing to rollback."));
}

#[test]
fn pretend_prints_statements_without_running_them() {
    let root = TempDir::new().expect("root");
    write_patch(root.path(), "001_create_users", USERS);

    dbpatch(root.path())
        .args(["patch", "--pretend"])
        .assert()
        .success()
        .stdout(contains("CreateUsers:"))
        .stdout(contains("CREATE TABLE users (id INTEGER PRIMARY KEY);"))
        .stdout(contains("Patched:").not());

    assert!(ledger(root.path()).is_empty());
    assert!(!table_exists(root.path(), "users"));
}

#[test]
fn reset_and_status_without_ledger_say_so() {
    let root = TempDir::new().expect("root");

    dbpatch(root.path())
        .arg("status")
        .assert()
        .success()
        .stdout(contains("Patch table not found."));

    dbpatch(root.path())
        .arg("reset")
        .assert()
        .success()
        .stdout(contains("Patch table not found."));

    dbpatch(root.path())
        .arg("rollback")
        .assert()
        .failure()
        .stderr(contains("patch table 'patches' not found"));
}

#[test]
fn status_table_and_json() {
    let root = TempDir::new().expect("root");
    write_patch(root.path(), "001_create_users", USERS);
    dbpatch(root.path()).arg("patch").assert().success();
    write_patch(root.path(), "002_create_posts", POSTS);

    dbpatch(root.path())
        .arg("status")
        .assert()
        .success()
        .stdout(contains("Ran?"))
        .stdout(contains("001_create_users"))
        .stdout(contains("1 pending"));

    let output = dbpatch(root.path())
        .args(["status", "--json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let stdout = String::from_utf8(output).expect("utf8");
    assert!(stdout.contains("\"ran\": 1"), "got: {stdout}");
    assert!(stdout.contains("\"pending\": 1"), "got: {stdout}");
    assert!(stdout.contains("\"patch\": \"002_create_posts\""), "got: {stdout}");
}

#[test]
fn reset_then_refresh() {
    let root = TempDir::new().expect("root");
    write_patch(root.path(), "001_create_users", USERS);
    write_patch(root.path(), "002_create_posts", POSTS);
    dbpatch(root.path()).arg("patch").assert().success();

    dbpatch(root.path())
        .arg("refresh")
        .assert()
        .success()
        .stdout(contains("Rolled back:"))
        .stdout(contains("Patched:"));
    assert_eq!(ledger(root.path()).len(), 2);

    dbpatch(root.path()).arg("reset").assert().success();
    assert!(ledger(root.path()).is_empty());
    assert!(!table_exists(root.path(), "users"));
}

#[test]
fn failing_patch_reports_error_and_keeps_earlier_work() {
    let root = TempDir::new().expect("root");
    write_patch(root.path(), "001_create_users", USERS);
    write_patch(
        root.path(),
        "002_broken",
        "-- up\nCREATE TABLE half (id INTEGER);\nINSERT INTO nowhere VALUES (1);\n",
    );

    dbpatch(root.path())
        .arg("patch")
        .assert()
        .failure()
        .stdout(contains("Patched:").and(contains("001_create_users")))
        .stderr(contains("002_broken"));

    assert_eq!(ledger(root.path()), [("001_create_users".to_string(), 1)]);
    assert!(!table_exists(root.path(), "half"));
}

#[test]
fn explicit_path_scans_only_that_location() {
    let root = TempDir::new().expect("root");
    write_patch(root.path(), "001_create_users", USERS);
    let extra = root.path().join("extra");
    fs::create_dir_all(&extra).expect("extra dir");
    fs::write(extra.join("005_create_posts.sql"), POSTS).expect("write");

    dbpatch(root.path())
        .args(["patch", "--path", "extra"])
        .assert()
        .success()
        .stdout(contains("005_create_posts"))
        .stdout(contains("001_create_users").not());

    dbpatch(root.path())
        .args(["patch", "--realpath", "--path"])
        .arg(extra.join("005_create_posts.sql"))
        .assert()
        .success()
        .stdout(contains("Nothing to patch."));

    assert!(table_exists(root.path(), "posts"));
    assert!(!table_exists(root.path(), "users"));
}

#[test]
fn make_scaffolds_a_loadable_patch() {
    let root = TempDir::new().expect("root");

    dbpatch(root.path())
        .args(["make", "CreateUsersTable"])
        .assert()
        .success()
        .stdout(contains("Created Patch:").and(contains("_create_users_table")));

    let dir = root.path().join("database").join("patches");
    let files: Vec<_> = fs::read_dir(&dir)
        .expect("read dir")
        .map(|e| e.expect("entry").file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(files.len(), 1);
    assert!(files[0].ends_with("_create_users_table.sql"), "got: {files:?}");

    dbpatch(root.path()).arg("patch").assert().success();
    assert!(table_exists(root.path(), "users"));
}
