//! Database connection management
//!
//! The connection is the explicit store handle: callers open one with
//! `open_store`, pass it to every operation, and release it by dropping it.

use crate::errors::{from_rusqlite, store_unavailable, Result};
use crate::migrations::apply_migrations;
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default location of the catalog database, relative to the working directory
pub const DEFAULT_DB_PATH: &str = ".snapvault/store.db";

/// Default time a writer waits for a competing writer before giving up
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Backing store connection parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Path of the SQLite database file
    pub db_path: PathBuf,
    /// How long a statement waits on a locked database
    pub busy_timeout: Duration,
}

impl StoreConfig {
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
        }
    }

    pub fn with_busy_timeout(mut self, busy_timeout: Duration) -> Self {
        self.busy_timeout = busy_timeout;
        self
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::new(DEFAULT_DB_PATH)
    }
}

/// Open, configure and migrate the store described by `config`
///
/// Creates the database's parent directory if needed.
///
/// # Errors
///
/// - `StoreUnavailable`: directory or database cannot be created/opened
/// - `Migration`: schema could not be brought up to date
pub fn open_store(config: &StoreConfig) -> Result<Connection> {
    if let Some(parent) = config.db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| store_unavailable(parent, e))?;
        }
    }

    let mut conn = open(&config.db_path)?;
    configure(&conn, config.busy_timeout)?;
    apply_migrations(&mut conn)?;

    tracing::debug!(
        db_path = %config.db_path.display(),
        busy_timeout_ms = config.busy_timeout.as_millis() as u64,
        "Opened snapshot store"
    );

    Ok(conn)
}

/// Open a SQLite database at the given path
pub fn open<P: AsRef<Path>>(path: P) -> Result<Connection> {
    let path = path.as_ref();
    Connection::open(path).map_err(|e| store_unavailable(path, e))
}

/// Open a configured, migrated in-memory database (for testing)
pub fn open_in_memory() -> Result<Connection> {
    let mut conn = Connection::open_in_memory().map_err(from_rusqlite)?;
    configure(&conn, DEFAULT_BUSY_TIMEOUT)?;
    apply_migrations(&mut conn)?;
    Ok(conn)
}

/// Configure a connection
///
/// Enables foreign keys, WAL journaling (readers proceed alongside one
/// writer) and a bounded busy timeout.
pub fn configure(conn: &Connection, busy_timeout: Duration) -> Result<()> {
    conn.busy_timeout(busy_timeout).map_err(from_rusqlite)?;

    conn.execute_batch("PRAGMA foreign_keys = ON;")
        .map_err(from_rusqlite)?;

    conn.pragma_update(None, "journal_mode", "WAL")
        .map_err(from_rusqlite)?;

    Ok(())
}

/// Begin a write transaction that takes the database write lock immediately
///
/// All invariant-preserving mutations go through one of these so they are
/// serialized against each other. Dropping the transaction without
/// committing rolls it back.
pub fn begin_write(conn: &mut Connection) -> Result<Transaction<'_>> {
    conn.transaction_with_behavior(TransactionBehavior::Immediate)
        .map_err(from_rusqlite)
}

/// Begin a read transaction giving a consistent view across several queries
pub fn begin_read(conn: &mut Connection) -> Result<Transaction<'_>> {
    conn.transaction_with_behavior(TransactionBehavior::Deferred)
        .map_err(from_rusqlite)
}
