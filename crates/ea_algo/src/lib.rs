// crates/ea_algo/src/lib.rs
#![forbid(unsafe_code)]

//! Algorithm layer. Every entry point is a pure function from inputs to a new
//! value; the only randomness comes from seeds carried in the inputs.
//!
//! Stage order used by the pipeline:
//! records → [`ranking::build_ranking`] → [`scenario::adjust`] →
//! [`ranking::aggregate_by_party`] → [`allocation::dhondt::allocate`];
//! adjusted ranking → [`simulation::simulate`].

pub use ea_core::{
    entities::{CandidateRanking, DHondtAnalysis, PartyVotes, ProbabilityResult, VoteRecord},
    tokens::{CandidateRef, UnitId},
    EngineError, EngineResult,
};

// ----------------------------- Ranking --------------------------------------------

pub mod ranking;

pub use ranking::{aggregate_by_party, build_ranking, total_power};

// ----------------------------- Scenario adjustment --------------------------------

pub mod scenario;

pub use scenario::{adjust, factor_table, fragment, FactorBreakdown, ScenarioRankings};

// ----------------------------- Allocation (public surface) ------------------------

pub mod allocation {
    // File modules (actual implementations)
    pub mod dhondt;

    pub use dhondt::{allocate as dhondt_allocate, seat_counts as dhondt_seat_counts};
}

// ----------------------------- Monte Carlo ----------------------------------------

pub mod simulation;

pub use simulation::{simulate, simulate_with_cancel, CancelToken, TRIAL_BATCH};
