//! Monte Carlo seat-probability engine.
//!
//! Trials are grouped in batches of [`TRIAL_BATCH`]. Batch `b` draws from
//! `SimRng::from_seed_stream(seed, b)`, and inside a trial candidates draw in
//! ranking order, so the noise a candidate sees never depends on vote totals
//! or on which thread ran the batch. Per-batch partials are reduced in batch
//! order, which keeps the float sums reproducible.
//!
//! Cancellation is polled once per batch. A cancelled run yields
//! `EngineError::Cancelled`, never partial probabilities.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rand::distributions::Uniform;
use rand_distr::Normal;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use ea_core::{
    entities::{CandidateRanking, ProbabilityResult},
    rng::SimRng,
    rounding::round_votes,
    variables::{NoiseModel, SimulationParams, WinCriterion},
    EngineError, EngineResult,
};

use crate::allocation::dhondt::seat_counts;

/// Trials per batch (and per RNG stream).
pub const TRIAL_BATCH: u32 = 1_000;

/// Shared flag a caller flips to abort a running simulation.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Estimate each candidate's probability of winning a seat.
///
/// Output rows follow the order of `ranking`.
pub fn simulate(
    ranking: &[CandidateRanking],
    params: &SimulationParams,
    seed: u64,
) -> EngineResult<Vec<ProbabilityResult>> {
    simulate_with_cancel(ranking, params, seed, &CancelToken::new())
}

/// Same as [`simulate`], aborting between batches once `cancel` is set.
pub fn simulate_with_cancel(
    ranking: &[CandidateRanking],
    params: &SimulationParams,
    seed: u64,
    cancel: &CancelToken,
) -> EngineResult<Vec<ProbabilityResult>> {
    params.validate()?;
    if ranking.is_empty() {
        return Err(EngineError::EmptyDataset { records: 0 });
    }

    let ctx = TrialContext::new(ranking, params)?;
    let iterations = params.monte_carlo_iterations;
    let total = tally_batches(&ctx, seed, iterations, cancel, |_| {})?;

    let n = f64::from(iterations);
    let out = ranking
        .iter()
        .enumerate()
        .map(|(i, r)| ProbabilityResult {
            candidate: r.candidate.clone(),
            political_unit: r.political_unit.clone(),
            seat_probability: total.wins[i] as f64 / n * 100.0,
            projected_votes: round_votes(total.sums[i] / n),
        })
        .collect();

    tracing::debug!(candidates = ranking.len(), iterations, seed, "monte carlo run complete");
    Ok(out)
}

/// Run every batch and reduce the partials in batch order.
///
/// `after_batch` fires once per finished batch, from whichever thread ran it.
fn tally_batches<F>(
    ctx: &TrialContext<'_>,
    seed: u64,
    iterations: u32,
    cancel: &CancelToken,
    after_batch: F,
) -> EngineResult<BatchTally>
where
    F: Fn(u32) + Sync,
{
    let batches = iterations.div_ceil(TRIAL_BATCH);

    let run = |b: u32| -> Option<BatchTally> {
        if cancel.is_cancelled() {
            return None;
        }
        let start = b * TRIAL_BATCH;
        let tally = ctx.run_batch(seed, b, TRIAL_BATCH.min(iterations - start));
        after_batch(b);
        Some(tally)
    };

    #[cfg(feature = "parallel")]
    let partials: Vec<Option<BatchTally>> = (0..batches).into_par_iter().map(run).collect();
    #[cfg(not(feature = "parallel"))]
    let partials: Vec<Option<BatchTally>> = (0..batches).map(run).collect();

    // Any skipped batch, or a cancel that landed after the last batch started,
    // discards the whole run.
    if cancel.is_cancelled() || partials.iter().any(Option::is_none) {
        tracing::warn!(batches, "monte carlo run cancelled");
        return Err(EngineError::Cancelled);
    }

    let mut total = BatchTally::zeroed(ctx.ranking.len());
    for p in partials.into_iter().flatten() {
        total.merge(&p);
    }
    Ok(total)
}

// ----------------------------------------------------------------------------------

/// Noise sampler built once per run from the validated model.
#[derive(Clone, Debug)]
enum Noise {
    Exact,
    Normal(Normal<f64>),
    Uniform(Uniform<f64>),
}

impl Noise {
    fn from_model(m: &NoiseModel) -> EngineResult<Self> {
        match *m {
            NoiseModel::Normal { sigma } if sigma == 0.0 => Ok(Noise::Exact),
            NoiseModel::Uniform { magnitude } if magnitude == 0.0 => Ok(Noise::Exact),
            NoiseModel::Normal { sigma } => Normal::new(1.0, sigma)
                .map(Noise::Normal)
                .map_err(|_| EngineError::InvalidNoise { field: "noise.sigma", observed: sigma }),
            NoiseModel::Uniform { magnitude } => {
                Ok(Noise::Uniform(Uniform::new_inclusive(1.0 - magnitude, 1.0 + magnitude)))
            }
        }
    }

    /// Multiplicative factor, clamped at 0.
    #[inline]
    fn factor(&self, rng: &mut SimRng) -> f64 {
        let f = match self {
            Noise::Exact => 1.0,
            Noise::Normal(d) => rng.sample(d),
            Noise::Uniform(d) => rng.sample(d),
        };
        f.max(0.0)
    }
}

/// Per-batch counters: wins and summed perturbed votes per candidate.
#[derive(Clone, Debug, PartialEq)]
struct BatchTally {
    wins: Vec<u64>,
    sums: Vec<f64>,
}

impl BatchTally {
    fn zeroed(n: usize) -> Self {
        Self { wins: vec![0; n], sums: vec![0.0; n] }
    }

    fn merge(&mut self, other: &BatchTally) {
        for (a, b) in self.wins.iter_mut().zip(&other.wins) {
            *a += b;
        }
        for (a, b) in self.sums.iter_mut().zip(&other.sums) {
            *a += b;
        }
    }
}

/// Seat-mode lookup tables: party index per candidate and members per party.
#[derive(Debug)]
struct SeatLayout {
    total_seats: u32,
    party_of: Vec<usize>,
    members: Vec<Vec<usize>>,
}

#[derive(Debug)]
struct TrialContext<'a> {
    ranking: &'a [CandidateRanking],
    threshold: f64,
    noise: Noise,
    seats: Option<SeatLayout>,
}

impl<'a> TrialContext<'a> {
    fn new(ranking: &'a [CandidateRanking], params: &SimulationParams) -> EngineResult<Self> {
        let seats = match params.win_criterion {
            WinCriterion::Threshold => None,
            WinCriterion::Seats { total_seats } => {
                // BTreeMap keeps party indices in lexical order (the allocator's tie-break).
                let mut index: BTreeMap<&ea_core::tokens::UnitId, usize> = BTreeMap::new();
                for r in ranking {
                    index.entry(&r.political_unit).or_insert(0);
                }
                for (i, slot) in index.values_mut().enumerate() {
                    *slot = i;
                }
                let party_of: Vec<usize> = ranking.iter().map(|r| index[&r.political_unit]).collect();
                let mut members = vec![Vec::new(); index.len()];
                for (c, &p) in party_of.iter().enumerate() {
                    members[p].push(c);
                }
                Some(SeatLayout { total_seats, party_of, members })
            }
        };
        Ok(Self {
            ranking,
            threshold: params.threshold,
            noise: Noise::from_model(&params.noise)?,
            seats,
        })
    }

    fn run_batch(&self, seed: u64, batch: u32, trials: u32) -> BatchTally {
        let n = self.ranking.len();
        let mut rng = SimRng::from_seed_stream(seed, u64::from(batch));
        let mut tally = BatchTally::zeroed(n);
        let mut perturbed = vec![0.0f64; n];
        let mut won = vec![false; n];

        for _ in 0..trials {
            for (i, r) in self.ranking.iter().enumerate() {
                perturbed[i] = r.base_electoral_power as f64 * self.noise.factor(&mut rng);
            }
            self.evaluate(&perturbed, &mut won);
            for i in 0..n {
                tally.sums[i] += perturbed[i];
                if won[i] {
                    tally.wins[i] += 1;
                }
            }
        }
        tally
    }

    fn evaluate(&self, perturbed: &[f64], won: &mut [bool]) {
        for (w, &v) in won.iter_mut().zip(perturbed) {
            *w = v >= self.threshold;
        }
        let Some(layout) = &self.seats else {
            return;
        };

        let mut party_votes = vec![0.0f64; layout.members.len()];
        for (c, &p) in layout.party_of.iter().enumerate() {
            party_votes[p] += perturbed[c];
        }
        let party_votes: Vec<u64> = party_votes.into_iter().map(round_votes).collect();
        let seats = seat_counts(&party_votes, layout.total_seats);

        for (p, members) in layout.members.iter().enumerate() {
            let mut order = members.clone();
            order.sort_by(|&a, &b| {
                perturbed[b]
                    .total_cmp(&perturbed[a])
                    .then_with(|| self.ranking[a].label().cmp(self.ranking[b].label()))
            });
            for (rank, &c) in order.iter().enumerate() {
                if rank >= seats[p] as usize {
                    won[c] = false;
                }
            }
        }
    }
}
