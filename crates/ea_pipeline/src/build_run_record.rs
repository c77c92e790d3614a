// crates/ea_pipeline/src/build_run_record.rs
//
// Reproducibility record for one analysis.
//
// Every digest is SHA-256 over canonical JSON (sorted keys, compact) from
// `ea_io`, so two runs with the same request produce byte-identical records.
// - params_sha256  : the validated `SimulationParams` (includes scenario_seed)
// - records_sha256 : the vote records exactly as submitted
// - outputs_sha256 : the `Analysis` payload (rankings, factors, D'Hondt, probabilities)
// The simulation seed is echoed in clear; it is not part of any digest input.

use serde::{Deserialize, Serialize};

use ea_core::{entities::VoteRecord, variables::SimulationParams};
use ea_io::hasher::sha256_canonical;

use crate::{Analysis, EngineMeta, PipelineError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunRecord {
    /// "RUN:<hex64>" over the rest of this record.
    pub id: String,
    pub engine: EngineMeta,
    pub seed: u64,
    pub params_sha256: String,
    pub records_sha256: String,
    pub outputs_sha256: String,
}

/// The hashed part of the record (everything except `id`).
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RunRecordBody<'a> {
    engine: &'a EngineMeta,
    seed: u64,
    params_sha256: &'a str,
    records_sha256: &'a str,
    outputs_sha256: &'a str,
}

pub fn build_run_record(
    engine: &EngineMeta,
    seed: u64,
    params: &SimulationParams,
    records: &[VoteRecord],
    analysis: &Analysis,
) -> Result<RunRecord, PipelineError> {
    let params_sha256 = sha256_canonical(params)?;
    let records_sha256 = sha256_canonical(records)?;
    let outputs_sha256 = sha256_canonical(analysis)?;

    let body = RunRecordBody {
        engine,
        seed,
        params_sha256: &params_sha256,
        records_sha256: &records_sha256,
        outputs_sha256: &outputs_sha256,
    };
    let id = format!("RUN:{}", sha256_canonical(&body)?);

    Ok(RunRecord {
        id,
        engine: engine.clone(),
        seed,
        params_sha256,
        records_sha256,
        outputs_sha256,
    })
}
