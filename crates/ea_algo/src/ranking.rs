//! Base Electoral Power ranking.
//!
//! Aggregation key is `(candidate, unit)`; list-only tallies aggregate per unit.
//! Zero totals are dropped. Output is in canonical ranking order.

use std::collections::BTreeMap;

use ea_core::{
    determinism::sort_ranking,
    entities::{CandidateRanking, PartyVotes, VoteRecord},
    tokens::{CandidateRef, UnitId},
    EngineError, EngineResult,
};

/// Reduce vote records into a ranking sorted by power desc, label asc.
pub fn build_ranking(records: &[VoteRecord]) -> EngineResult<Vec<CandidateRanking>> {
    if records.is_empty() {
        return Err(EngineError::EmptyDataset { records: 0 });
    }

    let mut acc: BTreeMap<(UnitId, CandidateRef), (u64, bool)> = BTreeMap::new();
    for r in records {
        let slot = acc
            .entry((r.unit.clone(), r.candidate.clone()))
            .or_insert((0, false));
        slot.0 = slot.0.saturating_add(r.votes);
        slot.1 |= r.head_of_list;
    }

    let mut out: Vec<CandidateRanking> = acc
        .into_iter()
        .filter(|(_, (votes, _))| *votes > 0)
        .map(|((unit, candidate), (votes, head))| CandidateRanking {
            candidate,
            political_unit: unit,
            base_electoral_power: votes,
            head_of_list: head,
        })
        .collect();

    if out.is_empty() {
        return Err(EngineError::EmptyDataset { records: records.len() });
    }

    sort_ranking(&mut out);
    tracing::debug!(records = records.len(), entries = out.len(), "ranking built");
    Ok(out)
}

/// Sum a ranking per political unit, in lexical unit order.
pub fn aggregate_by_party(ranking: &[CandidateRanking]) -> Vec<PartyVotes> {
    let mut acc: BTreeMap<&UnitId, u64> = BTreeMap::new();
    for r in ranking {
        let v = acc.entry(&r.political_unit).or_insert(0);
        *v = v.saturating_add(r.base_electoral_power);
    }
    acc.into_iter()
        .map(|(party, votes)| PartyVotes::new(party.clone(), votes))
        .collect()
}

/// Total votes across a ranking.
pub fn total_power(ranking: &[CandidateRanking]) -> u64 {
    ranking
        .iter()
        .fold(0u64, |a, r| a.saturating_add(r.base_electoral_power))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn u(s: &str) -> UnitId {
        UnitId::new(s).unwrap()
    }

    fn rec(unit: &str, cand: Option<&str>, votes: u64) -> VoteRecord {
        let c = match cand {
            Some(n) => CandidateRef::named(n).unwrap(),
            None => CandidateRef::ListOnly,
        };
        VoteRecord::new(u(unit), c, votes)
    }

    #[test]
    fn sums_per_candidate_and_sorts() {
        let records = vec![
            rec("P1", Some("Ana"), 100),
            rec("P2", Some("Beto"), 300),
            rec("P1", Some("Ana"), 250),
            rec("P1", None, 40),
            rec("P2", Some("Caro"), 0),
        ];
        let r = build_ranking(&records).unwrap();
        let got: Vec<(&str, u64)> = r.iter().map(|e| (e.label(), e.base_electoral_power)).collect();
        assert_eq!(got, vec![("Ana", 350), ("Beto", 300), ("P1", 40)]);
        assert!(r[2].candidate.is_list_only());
    }

    #[test]
    fn same_name_in_two_units_stays_separate() {
        let records = vec![rec("P1", Some("Ana"), 10), rec("P2", Some("Ana"), 10)];
        let r = build_ranking(&records).unwrap();
        assert_eq!(r.len(), 2);
        assert_eq!(r[0].political_unit, u("P1"));
    }

    #[test]
    fn ties_break_by_name() {
        let records = vec![rec("P", Some("Zoe"), 5), rec("P", Some("Abel"), 5)];
        let r = build_ranking(&records).unwrap();
        assert_eq!(r[0].label(), "Abel");
    }

    #[test]
    fn head_of_list_flag_survives_aggregation() {
        let records = vec![rec("P", Some("Ana"), 5), rec("P", Some("Ana"), 5).head_of_list()];
        assert!(build_ranking(&records).unwrap()[0].head_of_list);
    }

    #[test]
    fn empty_and_all_zero_are_errors() {
        assert_eq!(build_ranking(&[]), Err(EngineError::EmptyDataset { records: 0 }));
        let zeros = vec![rec("P", Some("A"), 0), rec("Q", None, 0)];
        assert_eq!(build_ranking(&zeros), Err(EngineError::EmptyDataset { records: 2 }));
    }

    #[test]
    fn party_totals_are_lexical() {
        let records = vec![rec("B", Some("x"), 5), rec("A", Some("y"), 2), rec("B", None, 1)];
        let r = build_ranking(&records).unwrap();
        let p = aggregate_by_party(&r);
        assert_eq!(p, vec![PartyVotes::new(u("A"), 2), PartyVotes::new(u("B"), 6)]);
        assert_eq!(total_power(&r), 8);
    }
}
