//! Runtime layer for the Prodepa contract dashboard.
//!
//! Fetches the published sheet, keeps a TTL-cached snapshot of it, and turns
//! that snapshot into filtered dashboard views for a presenter.

pub mod data_manager;
pub mod fetcher;
pub mod orchestrator;
pub mod view;

pub use dashboard_core as core;
pub use dashboard_data as data;
