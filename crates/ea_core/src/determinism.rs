//! Determinism utilities: the one canonical ranking order.
//!
//! Every ranking the engine emits is sorted with `cmp_ranking`, so equal
//! inputs always produce equal (byte-identical once serialized) outputs.

use core::cmp::Ordering;

use crate::entities::CandidateRanking;

/// Power descending, then label ascending, then unit ascending.
///
/// The unit key only matters when two units field a candidate with the same
/// name and vote total; it makes the order total.
#[inline]
pub fn cmp_ranking(a: &CandidateRanking, b: &CandidateRanking) -> Ordering {
    b.base_electoral_power
        .cmp(&a.base_electoral_power)
        .then_with(|| a.label().cmp(b.label()))
        .then_with(|| a.political_unit.cmp(&b.political_unit))
}

/// Sort a ranking **in place** into canonical order.
#[inline]
pub fn sort_ranking(xs: &mut [CandidateRanking]) {
    xs.sort_by(cmp_ranking);
}
