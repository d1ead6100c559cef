//! snapvault store - persistence layer on SQLite
//!
//! Provides:
//! - SQLite schema with migrations framework
//! - Content-addressable blob store keyed by SHA256 digest
//! - Snapshot catalog (snapshots and their path → digest entries)
//! - Atomic file materialization for restores

#![allow(clippy::result_large_err)]

pub mod blobs;
pub mod catalog;
pub mod db;
pub mod errors;
pub mod files;
pub mod migrations;

// Re-export key types
pub use blobs::{BlobStat, BlobStore};
pub use db::{open_store, StoreConfig};
pub use errors::Result;
