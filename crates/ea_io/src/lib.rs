//! crates/ea_io/src/lib.rs
//! Local I/O for the engine: JSON config loading, canonical JSON, SHA-256 digests.
//!
//! No network access. Everything the algorithms need arrives as typed values from
//! `ea_core`; this crate only turns files into those values and back into bytes.

#![forbid(unsafe_code)]

use thiserror::Error;

use ea_core::EngineError;

/// Unified error for ea_io (loader, canonical_json, hasher).
#[derive(Debug, Error)]
pub enum IoError {
    /// Filesystem / path errors (open, read).
    #[error("io/path error: {0}")]
    Path(String),

    /// JSON decode/encode errors with a JSON Pointer hint.
    #[error("json error at {pointer}: {msg}")]
    Json { pointer: String, msg: String },

    /// Input exceeded a loader limit.
    #[error("limit exceeded: {0}")]
    Limit(String),

    /// Parsed fine but violates a parameter domain.
    #[error("invalid: {0}")]
    Invalid(#[from] EngineError),
}

pub type IoResult<T> = Result<T, IoError>;

impl From<std::io::Error> for IoError {
    fn from(e: std::io::Error) -> Self {
        IoError::Path(e.to_string())
    }
}

impl From<serde_json::Error> for IoError {
    fn from(e: serde_json::Error) -> Self {
        // serde_json reports line/column, not a pointer; callers may enrich this.
        IoError::Json { pointer: "/".to_string(), msg: e.to_string() }
    }
}

pub mod canonical_json;
pub mod hasher;
pub mod loader;

pub mod prelude {
    pub use crate::{IoError, IoResult};

    pub use crate::canonical_json::{to_canonical_bytes, to_canonical_json_bytes};
    pub use crate::hasher::{sha256_canonical, sha256_hex};
    pub use crate::loader::{load_params, load_vote_records, parse_params, parse_vote_records};
}
