//! LOAD stage: assemble an `AnalysisRequest` from local JSON files.

use std::path::Path;

use ea_io::loader::{load_params, load_vote_records};

use crate::{AnalysisRequest, PipelineError};

/// Read params and vote records from disk. Params are domain-checked here;
/// ranking-dependent checks run in `validate`.
pub fn load_request(
    params_path: &Path,
    records_path: &Path,
    total_seats: u32,
    simulation_seed: u64,
) -> Result<AnalysisRequest, PipelineError> {
    let params = load_params(params_path)?;
    let records = load_vote_records(records_path)?;
    tracing::info!(
        params = %params_path.display(),
        records = records.len(),
        "inputs loaded"
    );
    Ok(AnalysisRequest { records, params, total_seats, simulation_seed })
}
