// Test suite for pruning and blob reclamation
// Tests shared vs exclusive blobs, not-found handling and the orphan sweep

use rusqlite::Connection;
use snapvault_core::ContentDigest;
use snapvault_engine::commands::listing::{list_snapshots, store_stats};
use snapvault_engine::commands::prune::{PruneReport, SweepReport};
use snapvault_engine::commands::verify::verify_store;
use snapvault_engine::{
    create_snapshot, prune_snapshot, restore_snapshot, sweep_unreferenced_blobs, PruneOutcome,
    RestoreOptions, RestoreOutcome, SnapshotOptions,
};
use snapvault_store::catalog::detach_snapshot;
use snapvault_store::db::{open_store, StoreConfig};
use snapvault_store::BlobStore;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn setup_store() -> (TempDir, Connection) {
    let temp_dir = TempDir::new().unwrap();
    let conn = open_store(&StoreConfig::new(temp_dir.path().join("store.db"))).unwrap();
    (temp_dir, conn)
}

fn source_dir(root: &Path, name: &str, files: &[(&str, &[u8])]) -> PathBuf {
    let dir = root.join(name);
    fs::create_dir_all(&dir).unwrap();
    for (relative, content) in files {
        fs::write(dir.join(relative), content).unwrap();
    }
    dir
}

#[test]
fn test_prune_reclaims_exclusive_blobs() {
    let (temp_dir, mut conn) = setup_store();
    let source = source_dir(
        temp_dir.path(),
        "source",
        &[("file1.txt", b"hello world"), ("file2.bin", &[1, 2, 3, 4, 5])],
    );
    let report = create_snapshot(&mut conn, &source, SnapshotOptions::default()).unwrap();

    let outcome = prune_snapshot(&mut conn, report.snapshot_id).unwrap();

    assert_eq!(
        outcome,
        PruneOutcome::Pruned(PruneReport {
            snapshot_id: report.snapshot_id,
            entries_removed: 2,
            blobs_reclaimed: 2,
            bytes_reclaimed: 16,
        })
    );
    let stats = store_stats(&conn).unwrap();
    assert_eq!((stats.snapshots, stats.entries, stats.blobs), (0, 0, 0));

    // A restore of the pruned id now reports not found
    let restore = restore_snapshot(
        &mut conn,
        report.snapshot_id,
        &temp_dir.path().join("out"),
        RestoreOptions::default(),
    )
    .unwrap();
    assert!(matches!(restore, RestoreOutcome::NotFound { .. }));
}

#[test]
fn test_prune_keeps_blobs_shared_with_other_snapshots() {
    let (temp_dir, mut conn) = setup_store();
    let first_dir = source_dir(
        temp_dir.path(),
        "first",
        &[("shared.txt", b"shared"), ("only-first.txt", b"first")],
    );
    let second_dir = source_dir(
        temp_dir.path(),
        "second",
        &[("shared-copy.txt", b"shared"), ("only-second.txt", b"second")],
    );
    let first = create_snapshot(&mut conn, &first_dir, SnapshotOptions::default()).unwrap();
    let second = create_snapshot(&mut conn, &second_dir, SnapshotOptions::default()).unwrap();

    let outcome = prune_snapshot(&mut conn, first.snapshot_id).unwrap();

    match outcome {
        PruneOutcome::Pruned(report) => {
            assert_eq!(report.entries_removed, 2);
            assert_eq!(report.blobs_reclaimed, 1);
            assert_eq!(report.bytes_reclaimed, 5);
        }
        other => panic!("unexpected outcome {:?}", other),
    }
    assert!(BlobStore::exists(&conn, &ContentDigest::of(b"shared")).unwrap());
    assert!(!BlobStore::exists(&conn, &ContentDigest::of(b"first")).unwrap());

    // The surviving snapshot is still fully restorable
    let output = temp_dir.path().join("out");
    let restore =
        restore_snapshot(&mut conn, second.snapshot_id, &output, RestoreOptions::default())
            .unwrap();
    assert_eq!(restore.restored(), 2);
    assert_eq!(fs::read(output.join("shared-copy.txt")).unwrap(), b"shared");
    assert_eq!(fs::read(output.join("only-second.txt")).unwrap(), b"second");
}

#[test]
fn test_prune_unknown_id_changes_nothing() {
    let (temp_dir, mut conn) = setup_store();
    let source = source_dir(temp_dir.path(), "source", &[("a.txt", b"a")]);
    let report = create_snapshot(&mut conn, &source, SnapshotOptions::default()).unwrap();

    let outcome = prune_snapshot(&mut conn, report.snapshot_id + 1).unwrap();

    assert_eq!(
        outcome,
        PruneOutcome::NotFound {
            snapshot_id: report.snapshot_id + 1
        }
    );
    assert_eq!(list_snapshots(&conn).unwrap().len(), 1);
    assert_eq!(store_stats(&conn).unwrap().blobs, 1);
}

#[test]
fn test_prune_twice_reports_not_found() {
    let (temp_dir, mut conn) = setup_store();
    let source = source_dir(temp_dir.path(), "source", &[("a.txt", b"a")]);
    let report = create_snapshot(&mut conn, &source, SnapshotOptions::default()).unwrap();

    assert!(matches!(
        prune_snapshot(&mut conn, report.snapshot_id).unwrap(),
        PruneOutcome::Pruned(_)
    ));
    assert!(matches!(
        prune_snapshot(&mut conn, report.snapshot_id).unwrap(),
        PruneOutcome::NotFound { .. }
    ));
}

#[test]
fn test_sweep_collects_blobs_orphaned_between_detach_and_reclaim() {
    let (temp_dir, mut conn) = setup_store();
    let source = source_dir(
        temp_dir.path(),
        "source",
        &[("a.txt", b"orphan-a"), ("b.txt", b"orphan-b")],
    );
    let report = create_snapshot(&mut conn, &source, SnapshotOptions::default()).unwrap();
    let kept = source_dir(temp_dir.path(), "kept", &[("k.txt", b"kept")]);
    create_snapshot(&mut conn, &kept, SnapshotOptions::default()).unwrap();

    // Simulate a crash after the detach step
    detach_snapshot(&mut conn, report.snapshot_id).unwrap().unwrap();
    assert_eq!(store_stats(&conn).unwrap().blobs, 3);

    let sweep = sweep_unreferenced_blobs(&mut conn).unwrap();

    assert_eq!(
        sweep,
        SweepReport {
            blobs_reclaimed: 2,
            bytes_reclaimed: 16,
        }
    );
    assert_eq!(store_stats(&conn).unwrap().blobs, 1);
    assert!(verify_store(&mut conn).unwrap().is_healthy());

    // Nothing left to sweep
    assert_eq!(
        sweep_unreferenced_blobs(&mut conn).unwrap(),
        SweepReport::default()
    );
}

#[test]
fn test_verify_reports_corrupt_blob() {
    let (temp_dir, mut conn) = setup_store();
    let source = source_dir(
        temp_dir.path(),
        "source",
        &[("a.txt", b"intact"), ("b.txt", b"soon bad")],
    );
    create_snapshot(&mut conn, &source, SnapshotOptions::default()).unwrap();

    let bad = ContentDigest::of(b"soon bad");
    conn.execute(
        "UPDATE blobs SET content = x'0000' WHERE digest = ?1",
        [bad.as_str()],
    )
    .unwrap();

    let report = verify_store(&mut conn).unwrap();

    assert_eq!(report.blobs_checked, 2);
    assert_eq!(report.corrupt_blobs.len(), 1);
    assert_eq!(report.corrupt_blobs[0].digest, bad.as_str());
    assert!(report.dangling_entries.is_empty());
    assert!(!report.is_healthy());
}

#[test]
fn test_verify_reports_malformed_blob_key_and_checks_the_rest() {
    let (temp_dir, mut conn) = setup_store();
    let source = source_dir(temp_dir.path(), "source", &[("a.txt", b"intact")]);
    create_snapshot(&mut conn, &source, SnapshotOptions::default()).unwrap();

    let bad_key = "not-a-digest-".repeat(5);
    let bad_key = &bad_key[..64];
    conn.execute(
        "INSERT INTO blobs (digest, content, size) VALUES (?1, x'00', 1)",
        [bad_key],
    )
    .unwrap();

    let report = verify_store(&mut conn).unwrap();

    assert_eq!(report.blobs_checked, 2);
    assert_eq!(report.corrupt_blobs.len(), 1);
    assert_eq!(report.corrupt_blobs[0].digest, bad_key);
    assert_eq!(
        report.corrupt_blobs[0].error.kind(),
        snapvault_core::ExErrorKind::InvalidInput
    );
    assert!(!report.is_healthy());

    // The sweep leaves the malformed row alone instead of failing
    assert_eq!(
        sweep_unreferenced_blobs(&mut conn).unwrap(),
        SweepReport::default()
    );
}
