//! Post-solve active-constraint detection (§4.2): for each step, which
//! declared bounds are tight at the returned MILP solution.

use std::collections::BTreeSet;

use crate::domain::problem::DispatchProblem;
use crate::domain::solution::ActiveConstraintTag;

fn ratio_tight(value: f64, limit: f64, tolerance: f64) -> bool {
    if limit <= 0.0 {
        value.abs() <= tolerance
    } else {
        value >= limit * (1.0 - tolerance)
    }
}

fn absolute_tight(value: f64, bound: f64, tolerance: f64) -> bool {
    (value - bound).abs() <= tolerance
}

/// Compute the active-constraint set for every step of a MILP solution.
/// `soc_at(t)` is `soc[t]` (the state entering step `t`), `p_charge`/
/// `p_discharge`/`grid_imp`/`grid_exp` are the corresponding flow values at
/// step `t`.
pub fn detect(
    problem: &DispatchProblem,
    soc: &[f64],
    batt_ch: &[f64],
    batt_dis: &[f64],
    grid_imp: &[f64],
    grid_exp: &[f64],
    tolerance: f64,
) -> Vec<BTreeSet<ActiveConstraintTag>> {
    let bess = &problem.bess;
    let limits = &problem.limits;
    (0..problem.t)
        .map(|i| {
            let mut tags = BTreeSet::new();
            if absolute_tight(soc[i], bess.soc_min, tolerance) {
                tags.insert(ActiveConstraintTag::SocMin);
            }
            if absolute_tight(soc[i], bess.soc_max, tolerance) {
                tags.insert(ActiveConstraintTag::SocMax);
            }
            if ratio_tight(batt_ch[i], bess.p_charge_max, tolerance) {
                tags.insert(ActiveConstraintTag::PChargeMax);
            }
            if ratio_tight(batt_dis[i], bess.p_discharge_max, tolerance) {
                tags.insert(ActiveConstraintTag::PDischargeMax);
            }
            if ratio_tight(grid_imp[i], limits.grid_import_max, tolerance) {
                tags.insert(ActiveConstraintTag::GridImportMax);
            }
            if ratio_tight(grid_exp[i], limits.grid_export_max, tolerance) {
                tags.insert(ActiveConstraintTag::GridExportMax);
            }
            tags
        })
        .collect()
}
