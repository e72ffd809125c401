//! Data layer: raw tables, cleaning, and filtering.
//!
//! Architecture:
//! ```text
//!  exped_tidy.csv  peaks_tidy.csv  unique_peaks_coords.csv
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  loader   │  parse files → RawInputs
//!   └──────────┘
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  clean    │  coerce, join → MergedData (records + top peaks)
//!   └──────────┘
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  filter   │  year range / season → record indices
//!   └──────────┘
//! ```

pub mod clean;
pub mod filter;
pub mod loader;
pub mod model;
