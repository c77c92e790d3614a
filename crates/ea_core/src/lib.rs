//! ea_core: Core value types, parameter domains, ordering helpers, and seedable RNG.
//!
//! This crate is **I/O-free**. It defines the stable types shared across the
//! engine (`ea_algo`, `ea_io`, `ea_pipeline`):
//!
//! - Tokens: `UnitId`, `CandidateId`, `CandidateRef`
//! - Entities: vote records, rankings, D'Hondt trace, probability rows
//! - Variables: `SimulationParams` and the qualitative multiplier bands
//! - Deterministic ordering and integer rounding helpers
//! - Seedable RNG (ChaCha20), never OS entropy
//!
//! Serialization derives are gated behind the `serde` feature.

#![forbid(unsafe_code)]

pub mod determinism;
pub mod entities;
pub mod rng;
pub mod tokens;
pub mod variables;

pub use errors::{EngineError, EngineResult};

pub mod errors {
    use thiserror::Error;

    /// Input-validation and data-sufficiency failures. None of these are transient:
    /// callers get the offending field and observed value, never a retry.
    #[derive(Debug, Clone, PartialEq, Error)]
    pub enum EngineError {
        #[error("dataset is empty: {records} record(s) and none with positive votes")]
        EmptyDataset { records: usize },

        #[error("invalid seat count: totalSeats = {observed} (allowed 1..={})", crate::variables::MAX_TOTAL_SEATS)]
        InvalidSeatCount { observed: u32 },

        #[error("no votes to allocate across {parties} party(ies)")]
        NoVotes { parties: usize },

        #[error("invalid iteration count: monteCarloIterations = {observed} (allowed {min}..={max})")]
        InvalidIterationCount { observed: u32, min: u32, max: u32 },

        #[error("fragmentation unit '{unit}' is not present in the ranking")]
        UnknownFragmentationUnit { unit: String },

        #[error("invalid candidate count: numCandidates = {observed} (allowed 1..={})", crate::variables::MAX_NUM_CANDIDATES)]
        InvalidCandidateCount { observed: u32 },

        #[error("invalid threshold: threshold = {observed} (must be finite and >= 0)")]
        InvalidThreshold { observed: f64 },

        #[error("invalid noise model: {field} = {observed} (must be finite, >= 0 and <= 1)")]
        InvalidNoise { field: &'static str, observed: f64 },

        #[error("invalid {kind}: {value:?}")]
        InvalidToken { kind: &'static str, value: String },

        #[error("simulation cancelled before completion")]
        Cancelled,
    }

    impl EngineError {
        /// True for cooperative cancellation; every other variant is an input problem.
        pub fn is_cancelled(&self) -> bool {
            matches!(self, EngineError::Cancelled)
        }
    }

    pub type EngineResult<T> = Result<T, EngineError>;
}

pub mod rounding {
    //! Integer vote rounding.

    /// Round a non-negative scaled vote to the nearest integer, halves away from zero.
    /// Negative and NaN inputs collapse to 0; values past `u64::MAX` saturate.
    #[inline]
    pub fn round_votes(x: f64) -> u64 {
        if !(x > 0.0) {
            return 0;
        }
        // `as` saturates for floats out of range.
        x.round() as u64
    }

    /// Scale an integer vote total by a multiplier and round once.
    #[inline]
    pub fn scale_votes(votes: u64, multiplier: f64) -> u64 {
        round_votes(votes as f64 * multiplier)
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn halves_round_up() {
            assert_eq!(round_votes(2.5), 3);
            assert_eq!(round_votes(2.4999), 2);
            assert_eq!(scale_votes(1000, 1.15), 1150);
        }

        #[test]
        fn negatives_and_nan_are_zero() {
            assert_eq!(round_votes(-3.0), 0);
            assert_eq!(round_votes(f64::NAN), 0);
        }
    }
}
