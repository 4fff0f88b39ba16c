//! The output of either solver: a full per-step power schedule plus SOC
//! trajectory, independent of how it was produced.

use std::collections::BTreeSet;

/// Which solver produced a [`Solution`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumString, serde::Serialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SolverKind {
    Milp,
    Fallback,
}

/// A bound that was tight (within tolerance) at the returned solution for a
/// given timestep. Ordered so active-constraint sets compare and serialize
/// deterministically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, strum::Display, strum::EnumString, serde::Serialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ActiveConstraintTag {
    SocMin,
    SocMax,
    PChargeMax,
    PDischargeMax,
    GridImportMax,
    GridExportMax,
}

/// Solver output: one value per timestep for every flow variable, and
/// `T + 1` SOC values (`soc[0] == soc0`).
#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    pub pv_set: Vec<f64>,
    pub batt_ch: Vec<f64>,
    pub batt_dis: Vec<f64>,
    pub grid_imp: Vec<f64>,
    pub grid_exp: Vec<f64>,
    pub curtail: Vec<f64>,
    pub soc: Vec<f64>,
    pub solver_kind: SolverKind,
    pub objective_value: Option<f64>,
    pub active_constraints: Vec<BTreeSet<ActiveConstraintTag>>,
    /// Set when the fallback could not fully restore balance at some step
    /// (§7 `FallbackInfeasibility`); carries no step index, only presence.
    pub residual_imbalance: bool,
}

impl Solution {
    pub fn t(&self) -> usize {
        self.pv_set.len()
    }
}
