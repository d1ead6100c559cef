//! Filesystem write primitives used when materializing snapshots

mod atomic;

pub use atomic::{atomic_write, TEMP_SUFFIX};
