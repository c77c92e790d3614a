//! crates/ea_core/src/entities.rs
//! Per-run value types: inputs (vote records), rankings, the D'Hondt audit trail,
//! and Monte Carlo results. Everything here is created per analysis and handed
//! to export/charting collaborators as-is; nothing is mutated in place.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::tokens::{CandidateRef, UnitId};

/// One tally row as delivered by the ingestion collaborator.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct VoteRecord {
    pub unit: UnitId,
    pub candidate: CandidateRef,
    pub votes: u64,
    #[cfg_attr(feature = "serde", serde(default))]
    pub head_of_list: bool,
}

impl VoteRecord {
    pub fn new(unit: UnitId, candidate: CandidateRef, votes: u64) -> Self {
        Self { unit, candidate, votes, head_of_list: false }
    }

    pub fn head_of_list(mut self) -> Self {
        self.head_of_list = true;
        self
    }
}

/// One ranking row: a candidate (or a list-only entry) and its electoral power.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct CandidateRanking {
    pub candidate: CandidateRef,
    pub political_unit: UnitId,
    pub base_electoral_power: u64,
    #[cfg_attr(feature = "serde", serde(default))]
    pub head_of_list: bool,
}

impl CandidateRanking {
    /// Display/sort label: the candidate name, or the unit name for list-only entries.
    pub fn label(&self) -> &str {
        match &self.candidate {
            CandidateRef::Named(id) => id.as_str(),
            CandidateRef::ListOnly => self.political_unit.as_str(),
        }
    }

    /// Same row with a different vote total.
    pub fn with_power(&self, base_electoral_power: u64) -> Self {
        Self { base_electoral_power, ..self.clone() }
    }
}

/// Raw vote total of one party, the allocator's input.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PartyVotes {
    pub party: UnitId,
    pub votes: u64,
}

impl PartyVotes {
    pub fn new(party: UnitId, votes: u64) -> Self {
        Self { party, votes }
    }
}

/// One row of the D'Hondt audit trail.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct DHondtStep {
    /// 1-based, strictly increasing.
    pub seat: u32,
    pub party: UnitId,
    /// `votes / divisor`, for display; comparisons use exact integers.
    pub quotient: f64,
    /// Seats held before this step plus one.
    pub divisor: u32,
    pub votes: u64,
    pub seats_after: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SeatAllocation {
    pub party: UnitId,
    pub seats: u32,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct VotesPerSeat {
    pub party: UnitId,
    pub votes: f64,
}

/// Best losing quotient at the final step ("closest miss").
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct RunnerUp {
    pub party: UnitId,
    pub quotient: f64,
    pub divisor: u32,
    pub votes: u64,
    /// Additional votes that would have taken the last seat, other parties unchanged.
    pub votes_to_flip: u64,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct DHondtAnalysis {
    pub seats: Vec<SeatAllocation>,
    pub steps: Vec<DHondtStep>,
    pub total_votes: u64,
    pub votes_per_seat: Vec<VotesPerSeat>,
    pub last_seat_winner: DHondtStep,
    pub runner_up: Option<RunnerUp>,
    pub total_seats: u32,
}

impl DHondtAnalysis {
    /// Seats won by `party` (0 if it did not compete).
    pub fn seats_of(&self, party: &UnitId) -> u32 {
        self.seats
            .iter()
            .find(|s| &s.party == party)
            .map(|s| s.seats)
            .unwrap_or(0)
    }
}

/// Monte Carlo outcome for one candidate. Wire names follow the dashboard contract.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ProbabilityResult {
    pub candidate: CandidateRef,
    #[cfg_attr(feature = "serde", serde(rename = "politicalUnit"))]
    pub political_unit: UnitId,
    /// Percentage in `[0, 100]`.
    #[cfg_attr(feature = "serde", serde(rename = "probabilidad_curul"))]
    pub seat_probability: f64,
    #[cfg_attr(feature = "serde", serde(rename = "votos_proyectados"))]
    pub projected_votes: u64,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct SimulationResults {
    pub fragmented_ranking: Vec<CandidateRanking>,
    pub factored_ranking: Vec<CandidateRanking>,
    pub probabilities: Vec<ProbabilityResult>,
}
