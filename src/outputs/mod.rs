//! Output generation for finished reports.
//!
//! # Submodules
//!
//! - [`json`]: Serializes a [`Report`](crate::models::Report) to stdout or
//!   to a file for API consumption
//!
//! # Output Structure
//!
//! ```text
//! output_dir/
//! └── report.json
//! ```

pub mod json;
