//! Core types for the Prodepa dashboard pipeline.
//!
//! Text normalization, cell coercion, the typed column schema, the
//! [`models::Dataset`] container, Brazilian number formatting, error types
//! and CLI settings shared by the data and runtime crates.

pub mod coercion;
pub mod error;
pub mod formatting;
pub mod models;
pub mod schema;
pub mod settings;
pub mod text;

pub use error::{CoercionError, DashboardError, Result};
