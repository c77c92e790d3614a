//! Loader: read local JSON config (simulation params, vote records) into typed
//! `ea_core` values. Size-limited reads, no network I/O.
//!
//! Params are domain-checked on load; ranking-dependent checks (such as the
//! fragmentation unit being present) happen later in the pipeline.

#![forbid(unsafe_code)]

use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Deserialize;

use ea_core::{entities::VoteRecord, variables::SimulationParams};

use crate::{IoError, IoResult};

/// Largest config file accepted (64 MiB).
pub const MAX_FILE_BYTES: u64 = 64 * 1024 * 1024;

/// Largest vote-record list accepted.
pub const MAX_RECORDS: usize = 1_000_000;

/// Vote records arrive either as a bare array or wrapped as `{"records": [...]}`.
#[derive(Deserialize)]
#[serde(untagged)]
enum RecordsDoc {
    Bare(Vec<VoteRecord>),
    Wrapped { records: Vec<VoteRecord> },
}

/// Load and domain-check `SimulationParams` from a camelCase JSON file.
pub fn load_params(path: &Path) -> IoResult<SimulationParams> {
    let bytes = read_with_limit(path)?;
    parse_params(&bytes)
}

/// Load vote records from a JSON file.
pub fn load_vote_records(path: &Path) -> IoResult<Vec<VoteRecord>> {
    let bytes = read_with_limit(path)?;
    parse_vote_records(&bytes)
}

pub fn parse_params(bytes: &[u8]) -> IoResult<SimulationParams> {
    let params: SimulationParams = from_slice(bytes)?;
    params.validate()?;
    tracing::debug!(
        iterations = params.monte_carlo_iterations,
        threshold = params.threshold,
        "params loaded"
    );
    Ok(params)
}

pub fn parse_vote_records(bytes: &[u8]) -> IoResult<Vec<VoteRecord>> {
    let records = match from_slice::<RecordsDoc>(bytes)? {
        RecordsDoc::Bare(r) | RecordsDoc::Wrapped { records: r } => r,
    };
    if records.len() > MAX_RECORDS {
        return Err(IoError::Limit(format!(
            "{} vote records (max {MAX_RECORDS})",
            records.len()
        )));
    }
    tracing::debug!(records = records.len(), "vote records loaded");
    Ok(records)
}

// ----------------------------- Helpers -----------------------------

fn from_slice<T: DeserializeOwned>(bytes: &[u8]) -> IoResult<T> {
    serde_json::from_slice(bytes).map_err(|e| IoError::Json {
        pointer: "/".into(),
        msg: format!("line {} column {}: {e}", e.line(), e.column()),
    })
}

fn read_with_limit(path: &Path) -> IoResult<Vec<u8>> {
    let f = File::open(path).map_err(|e| IoError::Path(format!("{}: {e}", path.display())))?;
    let len = f.metadata()?.len();
    if len > MAX_FILE_BYTES {
        return Err(IoError::Limit(format!(
            "{} is {len} bytes (max {MAX_FILE_BYTES})",
            path.display()
        )));
    }
    let mut buf = Vec::with_capacity(len as usize);
    f.take(MAX_FILE_BYTES + 1).read_to_end(&mut buf)?;
    if buf.len() as u64 > MAX_FILE_BYTES {
        return Err(IoError::Limit(format!("{} grew past {MAX_FILE_BYTES} bytes", path.display())));
    }
    Ok(buf)
}
