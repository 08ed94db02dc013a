//! Ingestion layer for Gerrit review statistics.
//!
//! Reads Gerrit change dumps, normalizes them into changesets and events,
//! keeps them in a store and turns the stored records into per-user
//! statistics and a CSV report.

pub mod aggregator;
pub mod extractor;
pub mod reader;
pub mod report;
pub mod store;

pub use gstats_core as core;
