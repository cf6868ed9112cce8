//! Error types for each seam of the pipeline.
//!
//! Failures are layered so a caller can tell them apart:
//! - [`FetchError`]: a single HTTP exchange failed
//! - [`MediaError`]: preview image enrichment failed; absorbed inside the
//!   enrichment task and never surfaced past it
//! - [`SourceError`]: one source could not produce a report
//! - [`AggregateError`]: no source could produce a report
//! - [`ConfigError`]: the configuration could not be loaded or is invalid

use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {message}")]
    Request { url: String, message: String },

    #[error("reading body from {url} failed: {message}")]
    Body { url: String, message: String },
}

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("fetching image failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("expected http 200 status code but got {0} instead")]
    Status(u16),

    #[error("error reading source image: {0}")]
    Decode(String),

    #[error("source image has no pixels")]
    EmptyImage,

    #[error("invalid target size {width}x{height}")]
    InvalidTarget { width: u32, height: u32 },

    #[error("error encoding image: {0}")]
    Encode(String),

    #[error("image worker failed: {0}")]
    Worker(String),
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("{0} is blank but shouldn't be")]
    MissingCredential(&'static str),

    #[error("{source_name}: {error}")]
    Fetch {
        source_name: String,
        #[source]
        error: FetchError,
    },

    #[error("{source_name}: unexpected http status {status}")]
    Status { source_name: String, status: u16 },

    #[error("{source_name}: problem decoding the response: {message}")]
    Decode {
        source_name: String,
        message: String,
    },

    #[error("{source_name}: all {attempted} feeds failed")]
    AllFeedsFailed {
        source_name: String,
        attempted: usize,
    },
}

#[derive(Debug, Error)]
pub enum AggregateError {
    #[error("no sources were configured")]
    NoSources,

    #[error("no source available: all {attempted} sources failed")]
    Exhausted { attempted: usize },

    #[error("no source available: no report within {deadline:?}")]
    Timeout { deadline: Duration },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {error}")]
    Read {
        path: String,
        #[source]
        error: std::io::Error,
    },

    #[error("cannot parse config file {path}: {error}")]
    Parse {
        path: String,
        #[source]
        error: serde_yaml::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}
