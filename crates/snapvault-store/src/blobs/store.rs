//! SQLite-backed content-addressable blob store
//!
//! Every function takes a `&Connection`; passing a `Transaction` (which
//! derefs to one) makes the call part of that transaction.

use crate::errors::{sqlite_op, Result};
use rusqlite::{Connection, OptionalExtension};
use snapvault_core::digest::ContentDigest;
use snapvault_core::errors::VaultError;
use snapvault_core::model::BlobRef;

/// Largest content a single blob may hold.
///
/// Stays under SQLite's default one billion byte limit on a value, leaving
/// room for the rest of the row.
pub const MAX_BLOB_BYTES: u64 = 999_000_000;

/// Rows whose key parses as a `ContentDigest`
const WELL_FORMED_DIGEST: &str = "length(digest) = 64 AND digest NOT GLOB '*[^0-9a-f]*'";

/// Size and digest of a stored blob, without its content
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobStat {
    pub digest: ContentDigest,
    pub size: u64,
}

/// Blob store operations over the `blobs` table
pub struct BlobStore;

impl BlobStore {
    /// Store `content` under `digest` unless a blob with that digest exists
    ///
    /// - Recomputes the digest over `content` first; content is never filed
    ///   under a digest it does not hash to
    /// - The insert is a single `ON CONFLICT DO NOTHING` statement, so
    ///   concurrent callers with the same digest produce exactly one row and
    ///   every caller sees a stored blob afterwards
    ///
    /// # Errors
    ///
    /// - `InvalidInput`: `content` is larger than `MAX_BLOB_BYTES`
    /// - `DigestMismatch`: `content` does not hash to `digest`
    /// - `Persistence` / `Timeout`: database failure
    pub fn put_if_absent(
        conn: &Connection,
        digest: &ContentDigest,
        content: &[u8],
    ) -> Result<BlobRef> {
        let size = content.len() as u64;
        if size > MAX_BLOB_BYTES {
            return Err(VaultError::BlobTooLarge {
                size,
                limit: MAX_BLOB_BYTES,
            }
            .into());
        }
        digest.verify(content)?;

        let changed = conn
            .execute(
                "INSERT INTO blobs (digest, content, size) VALUES (?1, ?2, ?3)
                 ON CONFLICT(digest) DO NOTHING",
                rusqlite::params![digest.as_str(), content, size as i64],
            )
            .map_err(sqlite_op("blob_put_if_absent"))?;

        let inserted = changed == 1;
        tracing::debug!(
            digest = %digest,
            size_bytes = size,
            inserted = inserted,
            "Blob put_if_absent"
        );

        Ok(BlobRef {
            digest: digest.clone(),
            size,
            inserted,
        })
    }

    /// Fetch the exact bytes stored under `digest`
    ///
    /// The content is checked against its recorded size and digest before it
    /// is returned.
    ///
    /// # Errors
    ///
    /// - `MissingBlob`: no blob is stored under `digest`
    /// - `DigestMismatch`: stored content is corrupt
    pub fn get(conn: &Connection, digest: &ContentDigest) -> Result<Vec<u8>> {
        let row: Option<(Vec<u8>, i64)> = conn
            .query_row(
                "SELECT content, size FROM blobs WHERE digest = ?1",
                [digest.as_str()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
            .map_err(sqlite_op("blob_get"))?;

        let (content, size) = row.ok_or_else(|| VaultError::MissingBlob {
            digest: digest.to_string(),
        })?;

        check_blob(digest, &content, size)?;
        Ok(content)
    }

    /// Whether a blob is stored under `digest`
    pub fn exists(conn: &Connection, digest: &ContentDigest) -> Result<bool> {
        conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM blobs WHERE digest = ?1)",
            [digest.as_str()],
            |row| row.get(0),
        )
        .map_err(sqlite_op("blob_exists"))
    }

    /// Recorded size of a blob, without loading its content
    pub fn stat(conn: &Connection, digest: &ContentDigest) -> Result<Option<BlobStat>> {
        let size: Option<i64> = conn
            .query_row(
                "SELECT size FROM blobs WHERE digest = ?1",
                [digest.as_str()],
                |row| row.get(0),
            )
            .optional()
            .map_err(sqlite_op("blob_stat"))?;

        Ok(size.map(|size| BlobStat {
            digest: digest.clone(),
            size: size as u64,
        }))
    }

    /// Delete the blob under `digest` if no snapshot entry references it
    ///
    /// The reference check and the delete are one statement, so they cannot
    /// interleave with another writer. Returns the reclaimed size, or `None`
    /// when the blob is still referenced or already gone.
    pub fn delete_if_unreferenced(
        conn: &Connection,
        digest: &ContentDigest,
    ) -> Result<Option<u64>> {
        let reclaimed: Option<i64> = conn
            .query_row(
                "DELETE FROM blobs
                 WHERE digest = ?1
                   AND NOT EXISTS (SELECT 1 FROM snapshot_entries WHERE digest = ?1)
                 RETURNING size",
                [digest.as_str()],
                |row| row.get(0),
            )
            .optional()
            .map_err(sqlite_op("blob_delete_if_unreferenced"))?;

        if let Some(size) = reclaimed {
            tracing::debug!(digest = %digest, size_bytes = size, "Reclaimed blob");
        }

        Ok(reclaimed.map(|size| size as u64))
    }

    /// Digests of all blobs that no snapshot entry references
    pub fn list_unreferenced(conn: &Connection) -> Result<Vec<ContentDigest>> {
        let mut stmt = conn
            .prepare(&format!(
                "SELECT b.digest FROM blobs b
                 WHERE {WELL_FORMED_DIGEST}
                   AND NOT EXISTS (SELECT 1 FROM snapshot_entries e WHERE e.digest = b.digest)
                 ORDER BY b.digest"
            ))
            .map_err(sqlite_op("blob_list_unreferenced"))?;

        let digests = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(sqlite_op("blob_list_unreferenced"))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(sqlite_op("blob_list_unreferenced"))?;

        digests.iter().map(|d| ContentDigest::parse(d)).collect()
    }

    /// All stored digests with their recorded sizes, ordered by digest
    ///
    /// Rows keyed by something that is not a digest are left out; see
    /// `list_malformed`.
    pub fn list(conn: &Connection) -> Result<Vec<BlobStat>> {
        let mut stmt = conn
            .prepare(&format!(
                "SELECT digest, size FROM blobs WHERE {WELL_FORMED_DIGEST} ORDER BY digest"
            ))
            .map_err(sqlite_op("blob_list"))?;

        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))
            .map_err(sqlite_op("blob_list"))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(sqlite_op("blob_list"))?;

        rows.into_iter()
            .map(|(digest, size)| {
                Ok(BlobStat {
                    digest: ContentDigest::parse(&digest)?,
                    size: size as u64,
                })
            })
            .collect()
    }

    /// Raw keys of blob rows that do not parse as a digest
    ///
    /// Such rows can only come from outside tampering; they are never
    /// returned by `list` or reclaimed by a sweep.
    pub fn list_malformed(conn: &Connection) -> Result<Vec<String>> {
        let mut stmt = conn
            .prepare(&format!(
                "SELECT digest FROM blobs WHERE NOT ({WELL_FORMED_DIGEST}) ORDER BY digest"
            ))
            .map_err(sqlite_op("blob_list_malformed"))?;

        let keys = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(sqlite_op("blob_list_malformed"))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(sqlite_op("blob_list_malformed"))?;
        Ok(keys)
    }

    /// Number of stored blobs
    pub fn count(conn: &Connection) -> Result<u64> {
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM blobs", [], |row| row.get(0))
            .map_err(sqlite_op("blob_count"))?;
        Ok(count as u64)
    }

    /// Sum of stored blob sizes
    pub fn total_bytes(conn: &Connection) -> Result<u64> {
        let total: i64 = conn
            .query_row("SELECT COALESCE(SUM(size), 0) FROM blobs", [], |row| {
                row.get(0)
            })
            .map_err(sqlite_op("blob_total_bytes"))?;
        Ok(total as u64)
    }
}

/// Check stored content against its recorded size and digest
fn check_blob(digest: &ContentDigest, content: &[u8], recorded_size: i64) -> Result<()> {
    if content.len() as i64 != recorded_size {
        return Err(VaultError::SizeMismatch {
            digest: digest.to_string(),
            recorded: recorded_size,
            actual: content.len() as i64,
        }
        .into());
    }
    digest.verify(content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_in_memory;
    use snapvault_core::errors::ExErrorKind;

    #[test]
    fn test_put_then_get() {
        let conn = open_in_memory().unwrap();
        let digest = ContentDigest::of(b"hello world");

        let blob = BlobStore::put_if_absent(&conn, &digest, b"hello world").unwrap();

        assert!(blob.inserted);
        assert_eq!(blob.size, 11);
        assert_eq!(BlobStore::get(&conn, &digest).unwrap(), b"hello world");
    }

    #[test]
    fn test_second_put_does_not_write() {
        let conn = open_in_memory().unwrap();
        let digest = ContentDigest::of(b"same");

        assert!(BlobStore::put_if_absent(&conn, &digest, b"same").unwrap().inserted);
        assert!(!BlobStore::put_if_absent(&conn, &digest, b"same").unwrap().inserted);
        assert_eq!(BlobStore::count(&conn).unwrap(), 1);
    }

    #[test]
    fn test_put_rejects_wrong_digest() {
        let conn = open_in_memory().unwrap();
        let digest = ContentDigest::of(b"expected");

        let err = BlobStore::put_if_absent(&conn, &digest, b"other").unwrap_err();

        assert_eq!(err.kind(), ExErrorKind::DigestMismatch);
        assert_eq!(BlobStore::count(&conn).unwrap(), 0);
    }

    #[test]
    fn test_get_missing_is_integrity_error() {
        let conn = open_in_memory().unwrap();
        let err = BlobStore::get(&conn, &ContentDigest::of(b"nope")).unwrap_err();

        assert_eq!(err.kind(), ExErrorKind::MissingBlob);
        assert!(err.is_integrity());
    }

    #[test]
    fn test_get_detects_corrupted_content() {
        let conn = open_in_memory().unwrap();
        let digest = ContentDigest::of(b"12345");
        BlobStore::put_if_absent(&conn, &digest, b"12345").unwrap();
        conn.execute(
            "UPDATE blobs SET content = x'3132333435' WHERE digest = ?1",
            [digest.as_str()],
        )
        .unwrap();
        // Same bytes: still fine
        assert!(BlobStore::get(&conn, &digest).is_ok());

        conn.execute(
            "UPDATE blobs SET content = x'3132333436' WHERE digest = ?1",
            [digest.as_str()],
        )
        .unwrap();
        let err = BlobStore::get(&conn, &digest).unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::DigestMismatch);
    }

    #[test]
    fn test_get_detects_size_mismatch() {
        let conn = open_in_memory().unwrap();
        let digest = ContentDigest::of(b"abc");
        BlobStore::put_if_absent(&conn, &digest, b"abc").unwrap();
        conn.execute("UPDATE blobs SET size = 99", []).unwrap();

        let err = BlobStore::get(&conn, &digest).unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::DigestMismatch);
    }

    #[test]
    fn test_delete_if_unreferenced_respects_references() {
        let conn = open_in_memory().unwrap();
        let kept = ContentDigest::of(b"kept");
        let orphan = ContentDigest::of(b"orphan");
        BlobStore::put_if_absent(&conn, &kept, b"kept").unwrap();
        BlobStore::put_if_absent(&conn, &orphan, b"orphan").unwrap();
        conn.execute("INSERT INTO snapshots (created_at) VALUES (0)", [])
            .unwrap();
        conn.execute(
            "INSERT INTO snapshot_entries (snapshot_id, relative_path, digest) VALUES (1, 'k', ?1)",
            [kept.as_str()],
        )
        .unwrap();

        assert_eq!(BlobStore::list_unreferenced(&conn).unwrap(), vec![orphan.clone()]);
        assert_eq!(BlobStore::delete_if_unreferenced(&conn, &kept).unwrap(), None);
        assert_eq!(
            BlobStore::delete_if_unreferenced(&conn, &orphan).unwrap(),
            Some(6)
        );
        assert!(BlobStore::exists(&conn, &kept).unwrap());
        assert!(!BlobStore::exists(&conn, &orphan).unwrap());
    }

    #[test]
    fn test_stat_and_totals() {
        let conn = open_in_memory().unwrap();
        let a = ContentDigest::of(b"aaaa");
        let b = ContentDigest::of(b"bb");
        BlobStore::put_if_absent(&conn, &a, b"aaaa").unwrap();
        BlobStore::put_if_absent(&conn, &b, b"bb").unwrap();

        assert_eq!(BlobStore::stat(&conn, &a).unwrap().map(|s| s.size), Some(4));
        assert_eq!(BlobStore::total_bytes(&conn).unwrap(), 6);
        assert_eq!(BlobStore::list(&conn).unwrap().len(), 2);
    }

    #[test]
    fn test_malformed_rows_are_listed_separately() {
        let conn = open_in_memory().unwrap();
        let good = ContentDigest::of(b"good");
        BlobStore::put_if_absent(&conn, &good, b"good").unwrap();
        let bad_key = "Z".repeat(64);
        conn.execute(
            "INSERT INTO blobs (digest, content, size) VALUES (?1, x'00', 1)",
            [bad_key.as_str()],
        )
        .unwrap();

        let listed: Vec<_> = BlobStore::list(&conn)
            .unwrap()
            .into_iter()
            .map(|s| s.digest)
            .collect();
        assert_eq!(listed, vec![good.clone()]);
        assert_eq!(BlobStore::list_malformed(&conn).unwrap(), vec![bad_key]);
        assert_eq!(BlobStore::list_unreferenced(&conn).unwrap(), vec![good]);
    }
}
