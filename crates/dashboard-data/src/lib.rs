//! Data layer for the Prodepa contract dashboard.
//!
//! Reads the published CSV export, normalizes it into a typed dataset,
//! applies user filters and computes the aggregates behind every dashboard
//! section.

pub mod aggregator;
pub mod filter;
pub mod normalizer;
pub mod reader;
pub mod report;

pub use dashboard_core as core;
