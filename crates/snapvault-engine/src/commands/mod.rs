//! Command orchestration layer.
//!
//! ## Logging Ownership
//!
//! Each public command owns lifecycle logging for its operation:
//! - `log_op_start!` at entry
//! - `log_op_end!` on success
//! - `log_op_error!` on failure
//!
//! Lower layers (store, core) use only `tracing::debug!()` for internal details.

pub mod listing;
pub mod prune;
pub mod restore;
pub mod scan;
pub mod snapshot;
pub mod verify;
