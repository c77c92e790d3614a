//! Scenario adjustment: fragmentation, then per-unit multipliers.
//!
//! Fixed order (results depend on it):
//! 1. Fragmentation of `fragmentation_unit` into `num_candidates` contenders
//!    (floor split, remainder to the first piece, sum preserved exactly).
//! 2. Incumbency penalty, one draw per government unit from
//!    `INCUMBENCY_MULTIPLIER_RANGE`, units visited in lexical order on a
//!    ChaCha20 stream seeded with `scenario_seed`.
//! 3. Coattail bonus on the designated unit.
//! 4. Local support, then campaign strength.
//!
//! Steps 2–4 multiply together into one factor per unit, applied to the
//! fragmented integer votes and rounded once. Override entries naming units
//! absent from the ranking are ignored.

use std::collections::{BTreeMap, BTreeSet};

use ea_core::{
    determinism::sort_ranking,
    entities::CandidateRanking,
    rng::SimRng,
    rounding::scale_votes,
    tokens::{CandidateRef, UnitId, TOKEN_MAX_CHARS},
    variables::{
        campaign_strength_multiplier, check_num_candidates, coattail_multiplier,
        local_support_multiplier, SimulationParams, INCUMBENCY_MULTIPLIER_RANGE,
    },
    EngineError, EngineResult,
};

/// The two derived views the dashboard shows side by side.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScenarioRankings {
    /// After fragmentation only.
    pub fragmented: Vec<CandidateRanking>,
    /// After fragmentation and every multiplier.
    pub factored: Vec<CandidateRanking>,
}

/// Per-unit multipliers, kept apart so reports can explain each one.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FactorBreakdown {
    pub incumbency: f64,
    pub coattail: f64,
    pub local_support: f64,
    pub campaign_strength: f64,
}

impl FactorBreakdown {
    pub const NEUTRAL: FactorBreakdown = FactorBreakdown {
        incumbency: 1.0,
        coattail: 1.0,
        local_support: 1.0,
        campaign_strength: 1.0,
    };

    /// Factors compose multiplicatively.
    #[inline]
    pub fn combined(&self) -> f64 {
        self.incumbency * self.coattail * self.local_support * self.campaign_strength
    }
}

/// Apply every scenario factor to `ranking`.
pub fn adjust(ranking: &[CandidateRanking], params: &SimulationParams) -> EngineResult<ScenarioRankings> {
    let fragmented = fragment(ranking, params)?;
    let table = factor_table(&fragmented, params);

    let mut factored: Vec<CandidateRanking> = fragmented
        .iter()
        .map(|r| {
            let m = table
                .get(&r.political_unit)
                .map(FactorBreakdown::combined)
                .unwrap_or(1.0);
            r.with_power(scale_votes(r.base_electoral_power, m))
        })
        .collect();
    sort_ranking(&mut factored);

    Ok(ScenarioRankings { fragmented, factored })
}

/// Step 1 only. Errors if the fragmentation unit is missing from `ranking`.
pub fn fragment(ranking: &[CandidateRanking], params: &SimulationParams) -> EngineResult<Vec<CandidateRanking>> {
    let Some(unit) = params.fragmentation_unit.as_ref() else {
        return Ok(ranking.to_vec());
    };
    let n = params.num_candidates;
    check_num_candidates(n)?;
    if !ranking.iter().any(|r| &r.political_unit == unit) {
        return Err(EngineError::UnknownFragmentationUnit { unit: unit.to_string() });
    }
    if n == 1 {
        return Ok(ranking.to_vec());
    }

    let mut out = Vec::with_capacity(ranking.len() + (n as usize - 1));
    for r in ranking {
        if &r.political_unit != unit {
            out.push(r.clone());
            continue;
        }
        let share = r.base_electoral_power / u64::from(n);
        let remainder = r.base_electoral_power % u64::from(n);
        for i in 1..=n {
            let votes = if i == 1 { share + remainder } else { share };
            out.push(CandidateRanking {
                candidate: CandidateRef::named(fragment_name(r.label(), i, n))?,
                political_unit: r.political_unit.clone(),
                base_electoral_power: votes,
                head_of_list: r.head_of_list && i == 1,
            });
        }
    }
    sort_ranking(&mut out);
    tracing::debug!(unit = %unit, pieces = n, "fragmentation applied");
    Ok(out)
}

/// `"<label> (i/N)"`, cutting the label short so the whole name stays a
/// valid token.
fn fragment_name(label: &str, i: u32, n: u32) -> String {
    let suffix = format!(" ({i}/{n})");
    let room = TOKEN_MAX_CHARS.saturating_sub(suffix.chars().count());
    let base: String = label.chars().take(room).collect();
    format!("{}{suffix}", base.trim_end())
}

/// Multipliers for every unit present in `ranking` (neutral units included).
pub fn factor_table(
    ranking: &[CandidateRanking],
    params: &SimulationParams,
) -> BTreeMap<UnitId, FactorBreakdown> {
    let present: BTreeSet<&UnitId> = ranking.iter().map(|r| &r.political_unit).collect();
    let mut table: BTreeMap<UnitId, FactorBreakdown> = present
        .iter()
        .map(|u| ((*u).clone(), FactorBreakdown::NEUTRAL))
        .collect();

    // Draws happen for every listed unit, present or not, so adding a stale
    // entry never shifts the draws of the others.
    let mut rng = SimRng::from_seed_u64(params.scenario_seed);
    let (lo, hi) = INCUMBENCY_MULTIPLIER_RANGE;
    for unit in &params.government_parties {
        let m = rng.uniform(lo, hi);
        match table.get_mut(unit) {
            Some(f) => {
                f.incumbency = m;
                tracing::debug!(unit = %unit, multiplier = m, "incumbency penalty");
            }
            None => tracing::debug!(unit = %unit, "incumbency entry ignored: unit not in ranking"),
        }
    }

    if let Some(c) = &params.coattail {
        match table.get_mut(&c.unit) {
            Some(f) => f.coattail = coattail_multiplier(c.strength),
            None => tracing::debug!(unit = %c.unit, "coattail entry ignored: unit not in ranking"),
        }
    }

    for (unit, level) in &params.local_support {
        match table.get_mut(unit) {
            Some(f) => f.local_support = local_support_multiplier(*level),
            None => tracing::debug!(unit = %unit, "local support entry ignored: unit not in ranking"),
        }
    }

    for (unit, level) in &params.campaign_strength {
        match table.get_mut(unit) {
            Some(f) => f.campaign_strength = campaign_strength_multiplier(*level),
            None => tracing::debug!(unit = %unit, "campaign strength entry ignored: unit not in ranking"),
        }
    }

    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use ea_core::variables::{CoattailStrength, Level};
    use proptest::prelude::*;

    fn u(s: &str) -> UnitId {
        UnitId::new(s).unwrap()
    }

    fn row(c: &str, unit: &str, v: u64) -> CandidateRanking {
        CandidateRanking {
            candidate: CandidateRef::named(c).unwrap(),
            political_unit: u(unit),
            base_electoral_power: v,
            head_of_list: false,
        }
    }

    fn power_of(r: &[CandidateRanking], label: &str) -> u64 {
        r.iter().find(|e| e.label() == label).unwrap().base_electoral_power
    }

    #[test]
    fn fragmentation_of_1000_into_3() {
        let ranking = vec![row("Ana", "A", 1000), row("Beto", "B", 900)];
        let p = SimulationParams::default().with_fragmentation(u("A"), 3);
        let out = fragment(&ranking, &p).unwrap();
        assert_eq!(out.len(), 4);
        assert_eq!(power_of(&out, "Ana (1/3)"), 334);
        assert_eq!(power_of(&out, "Ana (2/3)"), 333);
        assert_eq!(power_of(&out, "Ana (3/3)"), 333);
        assert_eq!(power_of(&out, "Beto"), 900);
    }

    #[test]
    fn fragmentation_of_list_only_entry_uses_unit_label() {
        let ranking = vec![CandidateRanking {
            candidate: CandidateRef::ListOnly,
            political_unit: u("Lista X"),
            base_electoral_power: 10,
            head_of_list: true,
        }];
        let p = SimulationParams::default().with_fragmentation(u("Lista X"), 2);
        let out = fragment(&ranking, &p).unwrap();
        assert_eq!(power_of(&out, "Lista X (1/2)"), 5);
        assert!(out.iter().filter(|r| r.head_of_list).count() == 1);
    }

    #[test]
    fn unknown_fragmentation_unit_is_an_error() {
        let ranking = vec![row("Ana", "A", 1000)];
        let p = SimulationParams::default().with_fragmentation(u("Z"), 2);
        assert_eq!(
            adjust(&ranking, &p),
            Err(EngineError::UnknownFragmentationUnit { unit: "Z".into() })
        );
    }

    #[test]
    fn long_names_are_cut_to_fit_fragment_suffix() {
        let long = "x".repeat(TOKEN_MAX_CHARS);
        let ranking = vec![row(&long, "A", 10), row("Beto", "B", 3)];
        let p = SimulationParams::default().with_fragmentation(u("A"), 3);
        let out = adjust(&ranking, &p).unwrap();
        let names: Vec<&str> = out
            .fragmented
            .iter()
            .filter(|r| r.political_unit == u("A"))
            .map(|r| r.label())
            .collect();
        assert_eq!(names.len(), 3);
        for (i, name) in names.iter().enumerate() {
            assert_eq!(name.chars().count(), TOKEN_MAX_CHARS);
            assert!(name.ends_with(&format!(" ({}/3)", i + 1)), "got {name}");
        }
        assert_eq!(fragment_name("Ana", 2, 3), "Ana (2/3)");
    }

    #[test]
    fn oversized_fragmentation_is_rejected() {
        let ranking = vec![row("Ana", "A", 1000)];
        let p = SimulationParams::default().with_fragmentation(u("A"), u32::MAX);
        assert_eq!(
            fragment(&ranking, &p),
            Err(EngineError::InvalidCandidateCount { observed: u32::MAX })
        );
    }

    #[test]
    fn single_piece_fragmentation_is_identity() {
        let ranking = vec![row("Ana", "A", 1000)];
        let p = SimulationParams::default().with_fragmentation(u("A"), 1);
        assert_eq!(fragment(&ranking, &p).unwrap(), ranking);
    }

    #[test]
    fn incumbency_penalty_is_shared_and_in_band() {
        let ranking = vec![row("Ana", "Gov", 10_000), row("Beto", "Gov", 10_000), row("Caro", "Opp", 10_000)];
        let p = SimulationParams::default().with_government_party(u("Gov")).with_scenario_seed(99);
        let out = adjust(&ranking, &p).unwrap().factored;
        let ana = power_of(&out, "Ana");
        assert_eq!(ana, power_of(&out, "Beto"));
        assert!((8_000..=8_500).contains(&ana), "got {ana}");
        assert_eq!(power_of(&out, "Caro"), 10_000);
    }

    #[test]
    fn incumbency_draw_is_reproducible_and_seed_dependent() {
        let ranking = vec![row("Ana", "Gov", 1_000_000)];
        let p = SimulationParams::default().with_government_party(u("Gov"));
        let a = adjust(&ranking, &p.clone().with_scenario_seed(1)).unwrap();
        let b = adjust(&ranking, &p.clone().with_scenario_seed(1)).unwrap();
        let c = adjust(&ranking, &p.with_scenario_seed(2)).unwrap();
        assert_eq!(a, b);
        assert_ne!(a.factored[0].base_electoral_power, c.factored[0].base_electoral_power);
    }

    #[test]
    fn multipliers_compose_multiplicatively() {
        let ranking = vec![row("Ana", "A", 1000), row("Beto", "B", 1000)];
        let p = SimulationParams::default()
            .with_coattail(u("A"), CoattailStrength::Strong)
            .with_local_support(u("A"), Level::Low)
            .with_campaign_strength(u("B"), Level::Low);
        let out = adjust(&ranking, &p).unwrap().factored;
        // 1000 * 1.25 * 0.90
        assert_eq!(power_of(&out, "Ana"), 1125);
        assert_eq!(power_of(&out, "Beto"), 920);
        assert_eq!(out[0].label(), "Ana");
    }

    #[test]
    fn stale_override_units_are_ignored() {
        let ranking = vec![row("Ana", "A", 1000)];
        let p = SimulationParams::default()
            .with_local_support(u("Gone"), Level::High)
            .with_campaign_strength(u("Gone"), Level::Low)
            .with_coattail(u("Gone"), CoattailStrength::Strong)
            .with_government_party(u("Gone"));
        let out = adjust(&ranking, &p).unwrap();
        assert_eq!(out.factored, ranking);
        assert_eq!(out.fragmented, ranking);
    }

    #[test]
    fn fragmented_view_ignores_multipliers() {
        let ranking = vec![row("Ana", "A", 900)];
        let p = SimulationParams::default()
            .with_fragmentation(u("A"), 3)
            .with_coattail(u("A"), CoattailStrength::Moderate);
        let out = adjust(&ranking, &p).unwrap();
        assert!(out.fragmented.iter().all(|r| r.base_electoral_power == 300));
        assert!(out.factored.iter().all(|r| r.base_electoral_power == 345));
    }

    #[test]
    fn factor_table_reports_neutral_units() {
        let ranking = vec![row("Ana", "A", 1), row("Beto", "B", 1)];
        let p = SimulationParams::default().with_local_support(u("A"), Level::Low);
        let t = factor_table(&ranking, &p);
        assert_eq!(t[&u("B")], FactorBreakdown::NEUTRAL);
        assert_eq!(t[&u("A")].combined(), 0.90);
    }

    proptest! {
        #[test]
        fn fragmentation_conserves_votes(votes in 0u64..10_000_000, n in 1u32..50) {
            let ranking = vec![row("Ana", "A", votes), row("Beto", "B", 7)];
            let p = SimulationParams::default().with_fragmentation(u("A"), n);
            let out = fragment(&ranking, &p).unwrap();
            let sum_a: u64 = out.iter().filter(|r| r.political_unit == u("A")).map(|r| r.base_electoral_power).sum();
            prop_assert_eq!(sum_a, votes);
            prop_assert_eq!(out.iter().filter(|r| r.political_unit == u("A")).count(), n as usize);
        }
    }
}
