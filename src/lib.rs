//! Himalayan expedition dashboard: loading, cleaning and aggregation of the
//! expedition, peak and coordinate tables behind the interactive charts.

pub mod data;
pub mod error;
pub mod pipeline;
pub mod report;
pub mod views;

pub use error::{DashError, Result};
pub use pipeline::{Dataset, Pipeline};
