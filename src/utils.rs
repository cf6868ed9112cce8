//! Utility functions for text cleanup, logging and file system checks.
//!
//! This module provides helper functions used throughout the crate:
//! - Link token removal for item display text
//! - String truncation for logging response bodies
//! - File system validation for output directories

use std::error::Error;
use std::fs as stdfs;
use tokio::fs;
use tracing::{info, instrument};

/// Remove the first literal occurrence of `token` from `text` and trim the
/// surrounding whitespace.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(strip_link_token("Storm hits https://t.co/x ", "https://t.co/x"), "Storm hits");
/// ```
pub fn strip_link_token(text: &str, token: &str) -> String {
    if token.is_empty() {
        return text.trim().to_string();
    }
    text.replacen(token, "", 1).trim().to_string()
}

/// Truncate a string for logging purposes.
///
/// Long strings are cut to at most `max` bytes (on a character boundary)
/// with an ellipsis and the number of dropped bytes appended.
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut cut = max;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}…(+{} bytes)", &s[..cut], s.len() - cut)
}

/// Ensure a directory exists and is writable.
///
/// This function creates the directory if it doesn't exist, then performs
/// a write test by creating and immediately deleting a probe file.
///
/// # Errors
///
/// Returns an error if:
/// - The directory cannot be created
/// - The directory is not writable (permission denied, read-only filesystem, etc.)
#[instrument(level = "info", skip_all, fields(path = %path))]
pub async fn ensure_writable_dir(path: &str) -> Result<(), Box<dyn Error>> {
    fs::create_dir_all(path).await?;
    let probe_path = format!("{}/..__probe_write__", path.trim_end_matches('/'));
    match stdfs::File::create(&probe_path) {
        Ok(_) => {
            let _ = stdfs::remove_file(&probe_path);
            info!("Output directory is writable");
            Ok(())
        }
        Err(e) => Err(Box::new(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_link_token_removes_first_occurrence_only() {
        assert_eq!(
            strip_link_token("Breaking: vote passes https://t.co/AbC", "https://t.co/AbC"),
            "Breaking: vote passes"
        );
        assert_eq!(strip_link_token("a x b x", "x"), "a  b x");
    }

    #[test]
    fn test_strip_link_token_absent_or_empty() {
        assert_eq!(strip_link_token("  nothing here ", "https://t.co/zz"), "nothing here");
        assert_eq!(strip_link_token(" keep ", ""), "keep");
    }

    #[test]
    fn test_truncate_for_log_short_string() {
        let s = "Hello, world!";
        assert_eq!(truncate_for_log(s, 100), "Hello, world!");
    }

    #[test]
    fn test_truncate_for_log_long_string() {
        let s = "a".repeat(500);
        let result = truncate_for_log(&s, 100);
        assert!(result.starts_with(&"a".repeat(100)));
        assert!(result.contains("…(+400 bytes)"));
    }

    #[test]
    fn test_truncate_for_log_respects_char_boundaries() {
        let s = "ééé";
        assert_eq!(truncate_for_log(s, 3), "é…(+4 bytes)");
    }

    #[tokio::test]
    async fn test_ensure_writable_dir_creates_directory() {
        let dir = std::env::temp_dir().join(format!("breaking_news_utils_{}", std::process::id()));
        let path = dir.to_string_lossy().to_string();
        ensure_writable_dir(&path).await.unwrap();
        assert!(dir.is_dir());
        let _ = std::fs::remove_dir_all(&dir);
    }
}
