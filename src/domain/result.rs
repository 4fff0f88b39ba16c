//! The wire-level result shape returned by [`crate::solve`].

use serde::{Deserialize, Serialize};

use crate::domain::solution::Solution;
use crate::kpi::Kpis;

/// Outcome category. Mirrors §6's `status` field exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ResultStatus {
    Ok,
    Fallback,
    InvalidInput,
}

/// Which solver produced the returned schedule, as surfaced on the wire.
/// Distinct from [`crate::domain::solution::SolverKind`]: this also
/// distinguishes a MILP-failure fallback from an explicit
/// `use_milp=false` request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SolverLabel {
    Milp,
    FallbackRule,
    RuleBased,
}

/// One row of the returned schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleStepDto {
    pub pv_set_kw: f64,
    pub batt_ch_kw: f64,
    pub batt_dis_kw: f64,
    pub grid_imp_kw: f64,
    pub grid_exp_kw: f64,
    pub curtail_kw: f64,
    pub soc: f64,
    pub reason: String,
}

/// The full result returned by [`crate::solve`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchResult {
    pub status: ResultStatus,
    pub solver: Option<SolverLabel>,
    pub fallback_used: bool,
    pub objective_value: Option<f64>,
    pub schedule: Vec<ScheduleStepDto>,
    pub kpis: Option<Kpis>,
    pub error: Option<String>,
}

/// Build the schedule rows from a solved [`Solution`] and its per-step
/// explanations. `soc` reported per step is `soc[t]`, the state entering
/// step `t` (the final `soc[T]` is not part of the per-step schedule; it is
/// implicitly the entry SOC a continuation run would use).
pub fn build_schedule(solution: &Solution, reasons: &[String]) -> Vec<ScheduleStepDto> {
    (0..solution.t())
        .map(|i| ScheduleStepDto {
            pv_set_kw: solution.pv_set[i],
            batt_ch_kw: solution.batt_ch[i],
            batt_dis_kw: solution.batt_dis[i],
            grid_imp_kw: solution.grid_imp[i],
            grid_exp_kw: solution.grid_exp[i],
            curtail_kw: solution.curtail[i],
            soc: solution.soc[i],
            reason: reasons[i].clone(),
        })
        .collect()
}

impl DispatchResult {
    /// The request could not be normalized, or the PV forecast could not be
    /// fetched; no solver ran.
    pub fn invalid_input(error: String) -> Self {
        Self {
            status: ResultStatus::InvalidInput,
            solver: None,
            fallback_used: false,
            objective_value: None,
            schedule: Vec::new(),
            kpis: None,
            error: Some(error),
        }
    }

    /// Build the final result from a produced solution.
    pub fn from_solution(
        solution: &Solution,
        kpis: &Kpis,
        reasons: &[String],
        solver_label: SolverLabel,
        fallback_used: bool,
        error: Option<String>,
    ) -> Self {
        let status = if fallback_used {
            ResultStatus::Fallback
        } else {
            ResultStatus::Ok
        };
        let error = error.or_else(|| {
            if solution.residual_imbalance {
                Some("residual_imbalance".to_string())
            } else {
                None
            }
        });
        Self {
            status,
            solver: Some(solver_label),
            fallback_used,
            objective_value: solution.objective_value,
            schedule: build_schedule(solution, reasons),
            kpis: Some(kpis.clone()),
            error,
        }
    }
}
