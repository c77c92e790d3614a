//! ea_pipeline: deterministic analysis surface
//! (validate → rank → adjust → allocate → simulate → run record).
//!
//! This crate owns no math: ranking, scenario factors, D'Hondt and Monte Carlo
//! live in `ea_algo`; canonical JSON and hashing live in `ea_io`. Stages run in a
//! fixed order and the whole request is validated before the first one starts.

#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};
use thiserror::Error;

use ea_algo::{
    allocation::dhondt_allocate,
    ranking::{aggregate_by_party, build_ranking},
    scenario::{adjust, factor_table},
    simulation::{simulate_with_cancel, CancelToken},
};
use ea_core::{
    entities::{CandidateRanking, DHondtAnalysis, SimulationResults, VoteRecord},
    tokens::UnitId,
    variables::SimulationParams,
    EngineError,
};
use ea_io::IoError;

pub mod build_run_record;
pub mod load;
pub mod validate;

pub use build_run_record::{build_run_record, RunRecord};
pub use load::load_request;
pub use validate::{validate, Severity, ValidationIssue, ValidationReport};

/// Engine identifiers recorded in every run record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineMeta {
    pub name: String,
    pub version: String,
}

impl EngineMeta {
    /// Identity of this build of the pipeline crate.
    pub fn current() -> Self {
        Self {
            name: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// One analysis: tallies, scenario, house size, and the Monte Carlo seed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRequest {
    pub records: Vec<VoteRecord>,
    #[serde(default)]
    pub params: SimulationParams,
    pub total_seats: u32,
    #[serde(default)]
    pub simulation_seed: u64,
}

/// Per-unit scenario multipliers as shown in reports.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitFactors {
    pub unit: UnitId,
    pub incumbency: f64,
    pub coattail: f64,
    pub local_support: f64,
    pub campaign_strength: f64,
    pub combined: f64,
}

/// Everything the analysis computes; hashed as `outputs_sha256`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Analysis {
    pub base_ranking: Vec<CandidateRanking>,
    pub factors: Vec<UnitFactors>,
    pub results: SimulationResults,
    pub dhondt: DHondtAnalysis,
}

/// Top-level pipeline outputs.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisOutputs {
    pub analysis: Analysis,
    pub validation: ValidationReport,
    pub run_record: RunRecord,
}

/// Single error surface for the pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Io(#[from] IoError),
}

impl PipelineError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, PipelineError::Engine(e) if e.is_cancelled())
    }
}

/// Run the full analysis for `req`.
pub fn run_analysis(req: &AnalysisRequest) -> Result<AnalysisOutputs, PipelineError> {
    run_analysis_with_cancel(req, &EngineMeta::current(), &CancelToken::new())
}

/// Same as [`run_analysis`], with explicit engine identity and a cancel token
/// polled by the Monte Carlo stage.
pub fn run_analysis_with_cancel(
    req: &AnalysisRequest,
    engine: &EngineMeta,
    cancel: &CancelToken,
) -> Result<AnalysisOutputs, PipelineError> {
    // VALIDATE
    let validation = validate(req)?;
    for issue in &validation.issues {
        match issue.severity {
            Severity::Warning => tracing::warn!(code = issue.code, unit = %issue.unit, "{}", issue.message),
            Severity::Info => tracing::debug!(code = issue.code, unit = %issue.unit, "{}", issue.message),
        }
    }
    let params = &req.params;

    // RANK
    let base_ranking = build_ranking(&req.records)?;
    tracing::info!(records = req.records.len(), entries = base_ranking.len(), "ranking stage done");

    // ADJUST
    let scenario = adjust(&base_ranking, params)?;
    let factors = factor_table(&scenario.fragmented, params)
        .into_iter()
        .map(|(unit, f)| UnitFactors {
            unit,
            incumbency: f.incumbency,
            coattail: f.coattail,
            local_support: f.local_support,
            campaign_strength: f.campaign_strength,
            combined: f.combined(),
        })
        .collect();
    tracing::info!(entries = scenario.factored.len(), "scenario stage done");

    // ALLOCATE
    let parties = aggregate_by_party(&scenario.factored);
    let dhondt = dhondt_allocate(&parties, req.total_seats)?;
    tracing::info!(
        parties = parties.len(),
        total_seats = req.total_seats,
        last_seat = %dhondt.last_seat_winner.party,
        "allocation stage done"
    );

    // SIMULATE
    let probabilities = simulate_with_cancel(&scenario.factored, params, req.simulation_seed, cancel)?;
    tracing::info!(
        candidates = probabilities.len(),
        iterations = params.monte_carlo_iterations,
        seed = req.simulation_seed,
        "simulation stage done"
    );

    let analysis = Analysis {
        base_ranking,
        factors,
        results: SimulationResults {
            fragmented_ranking: scenario.fragmented,
            factored_ranking: scenario.factored,
            probabilities,
        },
        dhondt,
    };

    // RUN RECORD
    let run_record = build_run_record(engine, req.simulation_seed, params, &req.records, &analysis)?;
    tracing::info!(id = %run_record.id, "run record built");

    Ok(AnalysisOutputs { analysis, validation, run_record })
}
