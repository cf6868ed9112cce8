//! JSON output for the report.
//!
//! The serialized shape is the public contract with clients:
//!
//! ```text
//! { "items": [ { "id", "createtime", "text", "mediaurl", "mediadata", "storyurl" } ],
//!   "version": "..." }
//! ```

use crate::models::Report;
use crate::utils::ensure_writable_dir;
use std::error::Error;
use std::path::PathBuf;
use tokio::fs;
use tracing::{info, instrument};

pub const REPORT_FILE_NAME: &str = "report.json";

pub fn to_json(report: &Report) -> Result<String, serde_json::Error> {
    serde_json::to_string(report)
}

/// Write a [`Report`] to `{output_dir}/report.json`, creating the directory
/// if needed.
///
/// # Returns
///
/// The path written, or an error if the directory is not writable or the
/// file cannot be written.
#[instrument(level = "info", skip_all, fields(output_dir = %output_dir))]
pub async fn write_report(report: &Report, output_dir: &str) -> Result<PathBuf, Box<dyn Error>> {
    let json = to_json(report)?;
    ensure_writable_dir(output_dir).await?;

    let path = PathBuf::from(output_dir).join(REPORT_FILE_NAME);
    info!(path = %path.display(), "Writing JSON");
    fs::write(&path, json).await?;
    info!(path = %path.display(), items = report.items.len(), "Wrote JSON report");

    Ok(path)
}
