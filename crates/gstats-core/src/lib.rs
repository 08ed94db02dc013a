//! Domain model and shared infrastructure for Gerrit review statistics.
//!
//! Holds the normalized change/event records, the per-user counters, the
//! error taxonomy, CLI settings and timestamp handling used by the data and
//! binary crates.

pub mod error;
pub mod formatting;
pub mod models;
pub mod settings;
pub mod time_utils;

pub use error::{Result, StatsError};
