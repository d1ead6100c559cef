//! CLI integration tests
//!
//! Run the `snapvault` binary against a temporary store and check its output,
//! exit codes and on-disk effects.

use rusqlite::Connection;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

fn snapvault(db: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_snapvault"))
        .arg("--db")
        .arg(db)
        .args(args)
        .env_remove("SNAPVAULT_DB")
        .output()
        .expect("Failed to execute CLI")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn assert_success(output: &Output) {
    assert!(
        output.status.success(),
        "CLI command should succeed. Stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
}

fn setup_source(temp_dir: &TempDir) -> PathBuf {
    let source = temp_dir.path().join("source");
    fs::create_dir_all(source.join("nested")).unwrap();
    fs::write(source.join("file1.txt"), b"hello world").unwrap();
    fs::write(source.join("file2.bin"), [1u8, 2, 3, 4, 5]).unwrap();
    fs::write(source.join("nested").join("file3.txt"), b"hello world").unwrap();
    source
}

#[test]
fn test_snapshot_list_restore_prune_cycle() {
    let temp_dir = TempDir::new().unwrap();
    let db = temp_dir.path().join("store.db");
    let source = setup_source(&temp_dir);

    // Snapshot
    let output = snapvault(
        &db,
        &["snapshot", "--target-directory", source.to_str().unwrap()],
    );
    assert_success(&output);
    assert!(stdout(&output).contains("Snapshot 1 created."));

    // List
    let output = snapvault(&db, &["list"]);
    assert_success(&output);
    let listing = stdout(&output);
    let mut lines = listing.lines();
    let header = lines.next().unwrap();
    for column in ["SNAPSHOT", "TIMESTAMP", "FILES", "SIZE"] {
        assert!(header.contains(column), "missing {} in {:?}", column, header);
    }
    let row: Vec<_> = lines.next().unwrap().split_whitespace().collect();
    assert_eq!(row[0], "1");
    assert_eq!(row[row.len() - 2], "3");
    assert_eq!(row[row.len() - 1], "27");

    // Restore
    let out_dir = temp_dir.path().join("restored");
    let output = snapvault(
        &db,
        &[
            "restore",
            "--snapshot-number",
            "1",
            "--output-directory",
            out_dir.to_str().unwrap(),
        ],
    );
    assert_success(&output);
    assert_eq!(fs::read(out_dir.join("file1.txt")).unwrap(), b"hello world");
    assert_eq!(fs::read(out_dir.join("file2.bin")).unwrap(), vec![1, 2, 3, 4, 5]);
    assert_eq!(
        fs::read(out_dir.join("nested").join("file3.txt")).unwrap(),
        b"hello world"
    );

    // Prune
    let output = snapvault(&db, &["prune", "--snapshot", "1"]);
    assert_success(&output);
    assert!(stdout(&output).contains("Snapshot 1 pruned."));
    assert!(stdout(&output).contains("blobs reclaimed: 2"));

    // Restoring the pruned snapshot reports not found and still exits 0
    let output = snapvault(
        &db,
        &[
            "restore",
            "--snapshot-number",
            "1",
            "--output-directory",
            temp_dir.path().join("again").to_str().unwrap(),
        ],
    );
    assert_success(&output);
    assert!(stdout(&output).contains("not found"));
    assert!(!temp_dir.path().join("again").exists());
}

#[test]
fn test_list_json() {
    let temp_dir = TempDir::new().unwrap();
    let db = temp_dir.path().join("store.db");
    let source = setup_source(&temp_dir);

    for _ in 0..2 {
        assert_success(&snapvault(
            &db,
            &["snapshot", "--target-directory", source.to_str().unwrap()],
        ));
    }

    let output = snapvault(&db, &["list", "--json"]);
    assert_success(&output);
    let parsed: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    let ids: Vec<_> = parsed
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, vec![1, 2]);
    assert_eq!(parsed[0]["entry_count"], 3);
}

#[test]
fn test_stats_reflect_deduplication() {
    let temp_dir = TempDir::new().unwrap();
    let db = temp_dir.path().join("store.db");
    let source = setup_source(&temp_dir);
    assert_success(&snapvault(
        &db,
        &["snapshot", "--target-directory", source.to_str().unwrap()],
    ));

    let output = snapvault(&db, &["stats", "--json"]);
    assert_success(&output);
    let stats: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(stats["snapshots"], 1);
    assert_eq!(stats["entries"], 3);
    assert_eq!(stats["blobs"], 2);
}

#[test]
fn test_prune_unknown_snapshot_exits_zero() {
    let temp_dir = TempDir::new().unwrap();
    let db = temp_dir.path().join("store.db");

    let output = snapvault(&db, &["prune", "--snapshot", "99"]);

    assert_success(&output);
    assert!(stdout(&output).contains("Snapshot 99 not found"));
}

#[test]
fn test_missing_arguments_are_usage_errors() {
    let temp_dir = TempDir::new().unwrap();
    let db = temp_dir.path().join("store.db");

    for args in [
        vec!["snapshot"],
        vec!["restore", "--snapshot-number", "1"],
        vec!["prune"],
        vec!["prune", "--snapshot", "not-a-number"],
    ] {
        let output = snapvault(&db, &args);
        assert_eq!(output.status.code(), Some(2), "args {:?}", args);
    }
}

#[test]
fn test_snapshot_of_missing_directory_fails() {
    let temp_dir = TempDir::new().unwrap();
    let db = temp_dir.path().join("store.db");

    let output = snapvault(
        &db,
        &[
            "snapshot",
            "--target-directory",
            temp_dir.path().join("nope").to_str().unwrap(),
        ],
    );

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("ERR_INVALID_INPUT"));
}

#[test]
fn test_restore_with_corrupt_blob_exits_one() {
    let temp_dir = TempDir::new().unwrap();
    let db = temp_dir.path().join("store.db");
    let source = setup_source(&temp_dir);
    assert_success(&snapvault(
        &db,
        &["snapshot", "--target-directory", source.to_str().unwrap()],
    ));

    let conn = Connection::open(&db).unwrap();
    conn.execute("UPDATE blobs SET content = x'01020304FF' WHERE size = 5", [])
        .unwrap();
    drop(conn);

    let out_dir = temp_dir.path().join("restored");
    let output = snapvault(
        &db,
        &[
            "restore",
            "--snapshot-number",
            "1",
            "--output-directory",
            out_dir.to_str().unwrap(),
        ],
    );

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("file2.bin"));
    // The intact entries were still restored
    assert_eq!(fs::read(out_dir.join("file1.txt")).unwrap(), b"hello world");

    let output = snapvault(&db, &["verify"]);
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn test_restore_with_missing_blob_exits_one() {
    let temp_dir = TempDir::new().unwrap();
    let db = temp_dir.path().join("store.db");
    let source = setup_source(&temp_dir);
    assert_success(&snapvault(
        &db,
        &["snapshot", "--target-directory", source.to_str().unwrap()],
    ));

    let conn = Connection::open(&db).unwrap();
    conn.execute_batch("PRAGMA foreign_keys = OFF;").unwrap();
    conn.execute("DELETE FROM blobs WHERE size = 5", []).unwrap();
    drop(conn);

    let out_dir = temp_dir.path().join("restored");
    let output = snapvault(
        &db,
        &[
            "restore",
            "--snapshot-number",
            "1",
            "--output-directory",
            out_dir.to_str().unwrap(),
        ],
    );

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("file2.bin"));
    assert!(stderr.contains("ERR_MISSING_BLOB"));
    assert!(!out_dir.join("file2.bin").exists());
    assert_eq!(
        fs::read(out_dir.join("nested").join("file3.txt")).unwrap(),
        b"hello world"
    );

    let output = snapvault(&db, &["verify"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("references missing blob"));
}

#[test]
fn test_db_location_from_environment() {
    let temp_dir = TempDir::new().unwrap();
    let db = temp_dir.path().join("from-env.db");
    let source = setup_source(&temp_dir);

    let output = Command::new(env!("CARGO_BIN_EXE_snapvault"))
        .env("SNAPVAULT_DB", &db)
        .args(["snapshot", "--target-directory", source.to_str().unwrap()])
        .output()
        .expect("Failed to execute CLI");

    assert_success(&output);
    assert!(db.exists());
}
