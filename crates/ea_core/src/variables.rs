//! variables.rs
//! Scenario parameter domains, the fixed multiplier bands, and `SimulationParams`.
//!
//! The numeric bands below are part of the public contract: test fixtures and
//! saved scenarios depend on them. Change them only with a version bump.

use std::collections::{BTreeMap, BTreeSet};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::errors::{EngineError, EngineResult};
use crate::tokens::UnitId;

/// ------------ Macros ------------

/// Define a unit-only enum with explicit wire tokens (plus accepted aliases).
macro_rules! wire_enum {
    ($(#[$m:meta])* $name:ident => { $($variant:ident = $token:literal $(| $alias:literal)*),+ $(,)? }) => {
        $(#[$m])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        #[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
        pub enum $name {
            $(
                #[cfg_attr(feature = "serde", serde(rename = $token $(, alias = $alias)*))]
                $variant,
            )+
        }
    };
}

/// ------------ Qualitative levels ------------

wire_enum!(
    /// Three-step qualitative level used by local support and campaign strength.
    Level => {
        Low    = "Bajo"  | "bajo"  | "low",
        Medium = "Medio" | "medio" | "Media" | "media" | "medium",
        High   = "Alto"  | "alto"  | "high"
    }
);

wire_enum!(
    /// Coattail ("arrastre") strength of the designated unit.
    CoattailStrength => {
        Nil      = "Nulo"     | "nulo"     | "none",
        Moderate = "Moderado" | "moderado" | "moderate",
        Strong   = "Fuerte"   | "fuerte"   | "strong"
    }
);

/// ------------ Multiplier bands ------------

/// Incumbency penalty multiplier is drawn uniformly from this closed interval
/// (a 15–20 % loss).
pub const INCUMBENCY_MULTIPLIER_RANGE: (f64, f64) = (0.80, 0.85);

pub fn coattail_multiplier(s: CoattailStrength) -> f64 {
    match s {
        CoattailStrength::Nil => 1.00,
        CoattailStrength::Moderate => 1.15,
        CoattailStrength::Strong => 1.25,
    }
}

pub fn local_support_multiplier(l: Level) -> f64 {
    match l {
        Level::Low => 0.90,
        Level::Medium => 1.00,
        Level::High => 1.15,
    }
}

pub fn campaign_strength_multiplier(l: Level) -> f64 {
    match l {
        Level::Low => 0.92,
        Level::Medium => 1.00,
        Level::High => 1.10,
    }
}

/// ------------ Monte Carlo knobs ------------

pub const MIN_ITERATIONS: u32 = 1;
pub const MAX_ITERATIONS: u32 = 100_000;
pub const DEFAULT_ITERATIONS: u32 = 1_000;
pub const DEFAULT_NOISE_SIGMA: f64 = 0.10;
/// Upper bound for `Normal { sigma }`.
pub const MAX_NOISE_SIGMA: f64 = 1.0;
/// Upper bound for `Uniform { magnitude }`; past 1 the lower half of the band
/// clamps to 0 anyway.
pub const MAX_NOISE_MAGNITUDE: f64 = 1.0;

/// ------------ Size bounds ------------

/// Largest house size the allocator accepts.
pub const MAX_TOTAL_SEATS: u32 = 10_000;
/// Largest number of contenders one unit can be fragmented into.
pub const MAX_NUM_CANDIDATES: u32 = 1_000;

/// `1..=MAX_TOTAL_SEATS`, else `InvalidSeatCount`.
pub fn check_total_seats(total_seats: u32) -> EngineResult<()> {
    if (1..=MAX_TOTAL_SEATS).contains(&total_seats) {
        Ok(())
    } else {
        Err(EngineError::InvalidSeatCount { observed: total_seats })
    }
}

/// `1..=MAX_NUM_CANDIDATES`, else `InvalidCandidateCount`.
pub fn check_num_candidates(num_candidates: u32) -> EngineResult<()> {
    if (1..=MAX_NUM_CANDIDATES).contains(&num_candidates) {
        Ok(())
    } else {
        Err(EngineError::InvalidCandidateCount { observed: num_candidates })
    }
}

/// Multiplicative noise applied to every candidate in every trial.
/// Factors are clamped at 0 so perturbed totals never go negative.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", rename_all = "camelCase"))]
pub enum NoiseModel {
    /// factor ~ N(1, sigma)
    Normal { sigma: f64 },
    /// factor ~ U[1 - magnitude, 1 + magnitude]
    Uniform { magnitude: f64 },
}

impl Default for NoiseModel {
    fn default() -> Self {
        NoiseModel::Normal { sigma: DEFAULT_NOISE_SIGMA }
    }
}

impl NoiseModel {
    fn validate(&self) -> EngineResult<()> {
        let (field, v, max) = match *self {
            NoiseModel::Normal { sigma } => ("noise.sigma", sigma, MAX_NOISE_SIGMA),
            NoiseModel::Uniform { magnitude } => ("noise.magnitude", magnitude, MAX_NOISE_MAGNITUDE),
        };
        if v.is_finite() && (0.0..=max).contains(&v) {
            Ok(())
        } else {
            Err(EngineError::InvalidNoise { field, observed: v })
        }
    }
}

/// What counts as "winning a seat" in one trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", rename_all = "camelCase"))]
pub enum WinCriterion {
    /// Perturbed votes >= threshold.
    #[default]
    Threshold,
    /// Threshold, and the candidate ranks inside its party's D'Hondt seats
    /// computed on that trial's perturbed party totals.
    ///
    /// Seats are allocated over party totals, not candidates: a party can win
    /// more seats than it has ranked candidates. Those extra seats go unused
    /// (every candidate of the party is inside its quota) and are not moved
    /// to another party.
    #[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
    Seats { total_seats: u32 },
}

/// ------------ Complex shapes ------------

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Coattail {
    pub unit: UnitId,
    pub strength: CoattailStrength,
}

/// Immutable scenario configuration, built by the UI form and passed by value
/// between the adjuster and the simulator.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase", default))]
pub struct SimulationParams {
    pub fragmentation_unit: Option<UnitId>,
    pub num_candidates: u32,
    pub government_parties: BTreeSet<UnitId>,
    pub threshold: f64,
    pub monte_carlo_iterations: u32,
    #[cfg_attr(feature = "serde", serde(with = "unit_levels"))]
    pub local_support: BTreeMap<UnitId, Level>,
    #[cfg_attr(feature = "serde", serde(with = "unit_levels"))]
    pub campaign_strength: BTreeMap<UnitId, Level>,
    #[cfg_attr(feature = "serde", serde(rename = "coattailEffect"))]
    pub coattail: Option<Coattail>,
    /// Seed for the incumbency penalty draws.
    pub scenario_seed: u64,
    pub noise: NoiseModel,
    pub win_criterion: WinCriterion,
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            fragmentation_unit: None,
            num_candidates: 1,
            government_parties: BTreeSet::new(),
            threshold: 0.0,
            monte_carlo_iterations: DEFAULT_ITERATIONS,
            local_support: BTreeMap::new(),
            campaign_strength: BTreeMap::new(),
            coattail: None,
            scenario_seed: 0,
            noise: NoiseModel::default(),
            win_criterion: WinCriterion::Threshold,
        }
    }
}

impl SimulationParams {
    /// Domain checks that do not need the ranking. The fragmentation unit's
    /// presence is checked by the adjuster against the actual ranking.
    pub fn validate(&self) -> EngineResult<()> {
        check_num_candidates(self.num_candidates)?;
        if !(self.threshold.is_finite() && self.threshold >= 0.0) {
            return Err(EngineError::InvalidThreshold { observed: self.threshold });
        }
        if !(MIN_ITERATIONS..=MAX_ITERATIONS).contains(&self.monte_carlo_iterations) {
            return Err(EngineError::InvalidIterationCount {
                observed: self.monte_carlo_iterations,
                min: MIN_ITERATIONS,
                max: MAX_ITERATIONS,
            });
        }
        if let WinCriterion::Seats { total_seats } = self.win_criterion {
            check_total_seats(total_seats)?;
        }
        self.noise.validate()
    }

    pub fn with_fragmentation(mut self, unit: UnitId, num_candidates: u32) -> Self {
        self.fragmentation_unit = Some(unit);
        self.num_candidates = num_candidates;
        self
    }

    pub fn with_government_party(mut self, unit: UnitId) -> Self {
        self.government_parties.insert(unit);
        self
    }

    pub fn with_coattail(mut self, unit: UnitId, strength: CoattailStrength) -> Self {
        self.coattail = Some(Coattail { unit, strength });
        self
    }

    /// Last write wins.
    pub fn with_local_support(mut self, unit: UnitId, level: Level) -> Self {
        self.local_support.insert(unit, level);
        self
    }

    /// Last write wins.
    pub fn with_campaign_strength(mut self, unit: UnitId, level: Level) -> Self {
        self.campaign_strength.insert(unit, level);
        self
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_iterations(mut self, n: u32) -> Self {
        self.monte_carlo_iterations = n;
        self
    }

    pub fn with_noise(mut self, noise: NoiseModel) -> Self {
        self.noise = noise;
        self
    }

    pub fn with_win_criterion(mut self, c: WinCriterion) -> Self {
        self.win_criterion = c;
        self
    }

    pub fn with_scenario_seed(mut self, seed: u64) -> Self {
        self.scenario_seed = seed;
        self
    }
}

/// `[{unit, level}, ...]` on the wire, `BTreeMap<UnitId, Level>` in memory.
/// Duplicate units collapse with the later entry winning.
#[cfg(feature = "serde")]
mod unit_levels {
    use std::collections::BTreeMap;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use super::Level;
    use crate::tokens::UnitId;

    #[derive(Serialize, Deserialize)]
    struct UnitLevel {
        unit: UnitId,
        level: Level,
    }

    pub fn serialize<S: Serializer>(m: &BTreeMap<UnitId, Level>, s: S) -> Result<S::Ok, S::Error> {
        let rows: Vec<UnitLevel> = m
            .iter()
            .map(|(unit, level)| UnitLevel { unit: unit.clone(), level: *level })
            .collect();
        rows.serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<BTreeMap<UnitId, Level>, D::Error> {
        let rows = Vec::<UnitLevel>::deserialize(d)?;
        let mut out = BTreeMap::new();
        for r in rows {
            out.insert(r.unit, r.level);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn u(s: &str) -> UnitId {
        UnitId::new(s).unwrap()
    }

    #[test]
    fn defaults_are_valid() {
        assert!(SimulationParams::default().validate().is_ok());
    }

    #[test]
    fn zero_iterations_rejected() {
        let p = SimulationParams::default().with_iterations(0);
        assert_eq!(
            p.validate(),
            Err(EngineError::InvalidIterationCount { observed: 0, min: 1, max: 100_000 })
        );
        assert!(SimulationParams::default().with_iterations(100_001).validate().is_err());
    }

    #[test]
    fn bad_threshold_and_noise_rejected() {
        assert!(SimulationParams::default().with_threshold(-1.0).validate().is_err());
        assert!(SimulationParams::default().with_threshold(f64::NAN).validate().is_err());
        let p = SimulationParams::default().with_noise(NoiseModel::Uniform { magnitude: -0.1 });
        assert_eq!(
            p.validate(),
            Err(EngineError::InvalidNoise { field: "noise.magnitude", observed: -0.1 })
        );
    }

    #[test]
    fn noise_spread_is_bounded() {
        let huge = SimulationParams::default().with_noise(NoiseModel::Uniform { magnitude: 1e308 });
        assert_eq!(
            huge.validate(),
            Err(EngineError::InvalidNoise { field: "noise.magnitude", observed: 1e308 })
        );
        let wide = SimulationParams::default().with_noise(NoiseModel::Normal { sigma: 1.5 });
        assert_eq!(
            wide.validate(),
            Err(EngineError::InvalidNoise { field: "noise.sigma", observed: 1.5 })
        );
        let edge = SimulationParams::default().with_noise(NoiseModel::Uniform { magnitude: 1.0 });
        assert!(edge.validate().is_ok());
    }

    #[test]
    fn size_bounds_rejected() {
        let p = SimulationParams::default().with_fragmentation(u("A"), u32::MAX);
        assert_eq!(p.validate(), Err(EngineError::InvalidCandidateCount { observed: u32::MAX }));
        assert!(SimulationParams::default()
            .with_fragmentation(u("A"), MAX_NUM_CANDIDATES)
            .validate()
            .is_ok());

        let seats = SimulationParams::default()
            .with_win_criterion(WinCriterion::Seats { total_seats: MAX_TOTAL_SEATS + 1 });
        assert_eq!(
            seats.validate(),
            Err(EngineError::InvalidSeatCount { observed: MAX_TOTAL_SEATS + 1 })
        );
        assert_eq!(check_total_seats(0), Err(EngineError::InvalidSeatCount { observed: 0 }));
        assert!(check_total_seats(MAX_TOTAL_SEATS).is_ok());
    }

    #[test]
    fn zero_candidates_rejected() {
        let p = SimulationParams::default().with_fragmentation(u("A"), 0);
        assert_eq!(p.validate(), Err(EngineError::InvalidCandidateCount { observed: 0 }));
    }

    #[test]
    fn overrides_last_write_wins() {
        let p = SimulationParams::default()
            .with_local_support(u("A"), Level::Low)
            .with_local_support(u("A"), Level::High);
        assert_eq!(p.local_support.len(), 1);
        assert_eq!(p.local_support[&u("A")], Level::High);
    }

    #[test]
    fn bands_are_ordered() {
        assert!(local_support_multiplier(Level::Low) < local_support_multiplier(Level::High));
        assert!(campaign_strength_multiplier(Level::Low) < campaign_strength_multiplier(Level::High));
        assert_eq!(coattail_multiplier(CoattailStrength::Nil), 1.0);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn ui_json_deserializes_with_duplicates_collapsed() {
        let json = r#"{
            "fragmentationUnit": "Partido A",
            "numCandidates": 3,
            "governmentParties": ["Partido B"],
            "threshold": 500,
            "monteCarloIterations": 2000,
            "localSupport": [
                {"unit": "Partido A", "level": "Bajo"},
                {"unit": "Partido A", "level": "Alto"}
            ],
            "campaignStrength": [{"unit": "Partido C", "level": "medio"}],
            "coattailEffect": {"unit": "Partido C", "strength": "Fuerte"},
            "noise": {"kind": "uniform", "magnitude": 0.05},
            "winCriterion": {"kind": "seats", "totalSeats": 5}
        }"#;
        let p: SimulationParams = serde_json::from_str(json).unwrap();
        assert_eq!(p.num_candidates, 3);
        assert_eq!(p.local_support[&u("Partido A")], Level::High);
        assert_eq!(p.campaign_strength[&u("Partido C")], Level::Medium);
        assert_eq!(p.coattail.as_ref().unwrap().strength, CoattailStrength::Strong);
        assert_eq!(p.noise, NoiseModel::Uniform { magnitude: 0.05 });
        assert_eq!(p.win_criterion, WinCriterion::Seats { total_seats: 5 });
        assert_eq!(p.scenario_seed, 0);
        assert!(p.validate().is_ok());
    }
}
