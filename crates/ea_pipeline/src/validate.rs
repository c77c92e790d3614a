//! crates/ea_pipeline/src/validate.rs
//! Up-front validation before any computation.
//!
//! Hard failures come back as the first `EngineError` in check order, so a
//! rejected request never produces partial rankings. Soft findings (override
//! entries that will be ignored) are collected in a `ValidationReport`.

use std::collections::BTreeSet;

use serde::Serialize;

use ea_core::{tokens::UnitId, variables::check_total_seats, EngineError, EngineResult};

use crate::AnalysisRequest;

/// Issue severity. Errors short-circuit and never reach the report.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Info,
}

/// One validation finding.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationIssue {
    pub severity: Severity,
    pub code: &'static str,
    pub param: &'static str,
    pub unit: UnitId,
    pub message: String,
}

/// Soft findings in stable order (code, param, unit).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Check `req` and report ignorable findings.
pub fn validate(req: &AnalysisRequest) -> EngineResult<ValidationReport> {
    let params = &req.params;
    params.validate()?;

    check_total_seats(req.total_seats)?;

    let present: BTreeSet<&UnitId> = req
        .records
        .iter()
        .filter(|r| r.votes > 0)
        .map(|r| &r.unit)
        .collect();
    if present.is_empty() {
        return Err(EngineError::EmptyDataset { records: req.records.len() });
    }

    if let Some(unit) = &params.fragmentation_unit {
        if !present.contains(unit) {
            return Err(EngineError::UnknownFragmentationUnit { unit: unit.to_string() });
        }
    }

    let mut issues = Vec::new();
    let mut stale = |param: &'static str, unit: &UnitId| {
        if !present.contains(unit) {
            issues.push(ValidationIssue {
                severity: Severity::Warning,
                code: "stale_override",
                param,
                unit: unit.clone(),
                message: format!("{param} names '{unit}', which has no votes; entry ignored"),
            });
        }
    };
    for u in &params.government_parties {
        stale("governmentParties", u);
    }
    if let Some(c) = &params.coattail {
        stale("coattailEffect", &c.unit);
    }
    for u in params.local_support.keys() {
        stale("localSupport", u);
    }
    for u in params.campaign_strength.keys() {
        stale("campaignStrength", u);
    }

    if let (Some(unit), 1) = (&params.fragmentation_unit, params.num_candidates) {
        issues.push(ValidationIssue {
            severity: Severity::Info,
            code: "noop_fragmentation",
            param: "numCandidates",
            unit: unit.clone(),
            message: format!("'{unit}' split into 1 candidate leaves the ranking unchanged"),
        });
    }

    issues.sort_by(|a, b| (a.code, a.param, &a.unit).cmp(&(b.code, b.param, &b.unit)));
    Ok(ValidationReport { issues })
}
