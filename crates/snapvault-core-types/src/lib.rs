//! Core types shared across snapvault facilities
//!
//! This crate holds the canonical field keys and event names used by the
//! logging facility and by the error facility when reporting failures.

pub mod schema;
