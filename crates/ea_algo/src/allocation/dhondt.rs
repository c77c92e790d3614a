//! D'Hondt (highest averages) allocation with a full step trace.
//!
//! Contract:
//! - Allocate `total_seats` sequentially by picking the max of v/(s+1).
//! - Ties on the quotient go to the larger raw vote total, then to the
//!   lexically smaller party name.
//! - Pure integers in comparisons (cross-multiply in u128); the float quotient
//!   in each step is for display only.
//!
//! Determinism:
//! - Parties are scanned in lexical name order, so "keep the first best" is
//!   the name tie-break.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use ea_core::{
    entities::{DHondtAnalysis, DHondtStep, PartyVotes, RunnerUp, SeatAllocation, VotesPerSeat},
    tokens::UnitId,
    variables::check_total_seats,
    EngineError, EngineResult,
};

/// Allocate seats and return the full analysis (seats, trace, closest miss).
///
/// Duplicate party rows are summed. Parties with zero votes are listed with
/// zero seats. `total_seats` must be in `1..=MAX_TOTAL_SEATS`.
pub fn allocate(parties: &[PartyVotes], total_seats: u32) -> EngineResult<DHondtAnalysis> {
    check_total_seats(total_seats)?;

    // 1) Merge in lexical order.
    let mut merged: BTreeMap<&UnitId, u64> = BTreeMap::new();
    for p in parties {
        let v = merged.entry(&p.party).or_insert(0);
        *v = v.saturating_add(p.votes);
    }
    let names: Vec<UnitId> = merged.keys().map(|k| (*k).clone()).collect();
    let votes: Vec<u64> = merged.values().copied().collect();
    let total_votes = votes.iter().fold(0u64, |a, v| a.saturating_add(*v));
    if total_votes == 0 {
        return Err(EngineError::NoVotes { parties: names.len() });
    }

    // 2) Sequential awards.
    let mut seats = vec![0u32; names.len()];
    let mut steps: Vec<DHondtStep> = Vec::with_capacity(total_seats as usize);
    let mut runner_up: Option<RunnerUp> = None;

    for seat in 1..=total_seats {
        let w = next_award(&votes, &seats, None);
        if seat == total_seats {
            runner_up = next_award_excluding(&votes, &seats, w)
                .map(|r| closest_miss(&names, &votes, &seats, w, r));
        }
        let divisor = seats[w] + 1;
        seats[w] += 1;
        steps.push(DHondtStep {
            seat,
            party: names[w].clone(),
            quotient: votes[w] as f64 / f64::from(divisor),
            divisor,
            votes: votes[w],
            seats_after: seats[w],
        });
    }
    debug_assert_eq!(seats.iter().map(|&s| u64::from(s)).sum::<u64>(), u64::from(total_seats));

    let last_seat_winner = steps
        .last()
        .cloned()
        .ok_or(EngineError::InvalidSeatCount { observed: total_seats })?;

    // 3) Summary rows: seats desc, votes desc, name asc.
    let mut order: Vec<usize> = (0..names.len()).collect();
    order.sort_by(|&a, &b| {
        seats[b]
            .cmp(&seats[a])
            .then_with(|| votes[b].cmp(&votes[a]))
            .then_with(|| names[a].cmp(&names[b]))
    });

    let seat_rows: Vec<SeatAllocation> = order
        .iter()
        .map(|&i| SeatAllocation { party: names[i].clone(), seats: seats[i] })
        .collect();
    let votes_per_seat: Vec<VotesPerSeat> = order
        .iter()
        .filter(|&&i| seats[i] > 0)
        .map(|&i| VotesPerSeat {
            party: names[i].clone(),
            votes: votes[i] as f64 / f64::from(seats[i]),
        })
        .collect();

    tracing::debug!(
        parties = names.len(),
        total_seats,
        total_votes,
        last = %last_seat_winner.party,
        "d'hondt allocation complete"
    );

    Ok(DHondtAnalysis {
        seats: seat_rows,
        steps,
        total_votes,
        votes_per_seat,
        last_seat_winner,
        runner_up,
        total_seats,
    })
}

/// Trace-free seat counts, same rule as [`allocate`].
///
/// Index order is the final tie-break, so pass parties in lexical name order.
/// All-zero votes yield all-zero seats.
pub fn seat_counts(votes: &[u64], total_seats: u32) -> Vec<u32> {
    let mut seats = vec![0u32; votes.len()];
    if votes.iter().all(|&v| v == 0) {
        return seats;
    }
    for _ in 0..total_seats {
        let w = next_award(votes, &seats, None);
        seats[w] += 1;
    }
    seats
}

/// Index of the next award. `votes` must be non-empty.
fn next_award(votes: &[u64], seats: &[u32], exclude: Option<usize>) -> usize {
    let mut best: Option<usize> = None;
    for i in 0..votes.len() {
        if Some(i) == exclude {
            continue;
        }
        match best {
            None => best = Some(i),
            Some(b) => {
                if beats(votes[i], seats[i], votes[b], seats[b]) {
                    best = Some(i);
                }
            }
        }
    }
    best.unwrap_or(0)
}

fn next_award_excluding(votes: &[u64], seats: &[u32], winner: usize) -> Option<usize> {
    if votes.len() < 2 {
        return None;
    }
    Some(next_award(votes, seats, Some(winner)))
}

/// True if `a` strictly outranks the current best `b`, which was seen earlier
/// in lexical order (so a full tie keeps `b`).
#[inline]
fn beats(v_a: u64, s_a: u32, v_b: u64, s_b: u32) -> bool {
    match cmp_quotients(v_a, s_a, v_b, s_b) {
        Ordering::Greater => true,
        Ordering::Equal => v_a > v_b,
        Ordering::Less => false,
    }
}

/// Compare D'Hondt quotients v_a/(s_a+1) vs v_b/(s_b+1) without floats.
#[inline]
fn cmp_quotients(v_a: u64, s_a: u32, v_b: u64, s_b: u32) -> Ordering {
    let da = u128::from(s_a) + 1;
    let db = u128::from(s_b) + 1;
    (u128::from(v_a) * db).cmp(&(u128::from(v_b) * da))
}

/// Runner-up row at the final step, with the vote gain that would have made
/// its quotient win the last seat under the tie rule.
fn closest_miss(names: &[UnitId], votes: &[u64], seats: &[u32], w: usize, r: usize) -> RunnerUp {
    let d_w = u128::from(seats[w]) + 1;
    let d_r = u128::from(seats[r]) + 1;
    let target = u128::from(votes[w]) * d_r;

    // Smallest v with v * d_w >= target, then step past a losing exact tie.
    let mut needed = (target + d_w - 1) / d_w;
    if needed * d_w == target {
        let wins_tie = needed > u128::from(votes[w])
            || (needed == u128::from(votes[w]) && names[r] < names[w]);
        if !wins_tie {
            needed += 1;
        }
    }
    let gap = needed.saturating_sub(u128::from(votes[r]));

    RunnerUp {
        party: names[r].clone(),
        quotient: votes[r] as f64 / d_r as f64,
        divisor: seats[r] + 1,
        votes: votes[r],
        votes_to_flip: u64::try_from(gap).unwrap_or(u64::MAX),
    }
}
