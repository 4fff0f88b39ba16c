//! Solver configuration: the one ambient, process-wide knob set this crate
//! owns. Everything else (PV forecast, load, tariffs, BESS, limits) arrives
//! per-request in a [`crate::domain::request::DispatchRequest`].
//!
//! Unlike the teacher's `AppConfig`, this does not read TOML files or
//! environment variables itself — loading configuration from the process
//! environment is a surrounding-service concern (the "logging configuration"
//! / "container packaging" collaborators named out of scope), so callers
//! either use [`SolverSettings::default`] or construct one programmatically.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Tunables for the MILP optimizer, the fallback scheduler, and the
/// explainer. Values are the defaults named throughout the specification;
/// none of them are exposed per-request because changing them changes the
/// meaning of the scenarios that validate this crate (see `spec.md` §9,
/// "Median-based thresholds... are part of the specification").
#[derive(Debug, Clone, Copy, Deserialize, Serialize, Validate)]
#[validate(schema(function = "validate_solver_settings"))]
pub struct SolverSettings {
    /// Wall-clock budget for the MILP solve, in milliseconds.
    #[serde(default = "default_deadline_ms")]
    #[validate(range(min = 1))]
    pub deadline_ms: u64,

    /// Relative optimality gap target passed to the MILP backend.
    #[serde(default = "default_optimality_gap")]
    #[validate(range(min = 0.0, max = 1.0))]
    pub optimality_gap: f64,

    /// Big-M constant used to linearize the charge/import indicator
    /// constraints (C4, C5). Must exceed every declared power limit.
    #[serde(default = "default_big_m")]
    #[validate(range(min = 1.0))]
    pub big_m: f64,

    /// Multiplier above the median `tariff_buy` that marks a step "peak".
    #[serde(default = "default_peak_multiplier")]
    pub peak_multiplier: f64,

    /// Multiplier below the median `tariff_buy` that marks a step "off-peak".
    #[serde(default = "default_off_peak_multiplier")]
    pub off_peak_multiplier: f64,

    /// Multiplier above median load that the explainer treats as a "demand
    /// peak" (rank 2 of the explanation table).
    #[serde(default = "default_demand_peak_multiplier")]
    pub demand_peak_multiplier: f64,

    /// Fraction of a grid limit considered "binding" by the explainer.
    #[serde(default = "default_near_limit_ratio")]
    pub near_limit_ratio: f64,

    /// SOC margin from `soc_min`/`soc_max` considered "at the edge" by the
    /// explainer.
    #[serde(default = "default_soc_margin")]
    pub soc_margin: f64,

    /// Tolerance (kW / fraction) used when checking solution invariants and
    /// active-constraint bounds.
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
}

fn validate_solver_settings(s: &SolverSettings) -> Result<(), validator::ValidationError> {
    if s.off_peak_multiplier >= s.peak_multiplier {
        return Err(validator::ValidationError::new(
            "off_peak_multiplier must be less than peak_multiplier",
        ));
    }
    Ok(())
}

fn default_deadline_ms() -> u64 {
    3_000
}
fn default_optimality_gap() -> f64 {
    0.01
}
fn default_big_m() -> f64 {
    1.0e6
}
fn default_peak_multiplier() -> f64 {
    1.2
}
fn default_off_peak_multiplier() -> f64 {
    0.8
}
fn default_demand_peak_multiplier() -> f64 {
    1.5
}
fn default_near_limit_ratio() -> f64 {
    0.95
}
fn default_soc_margin() -> f64 {
    0.05
}
fn default_tolerance() -> f64 {
    1.0e-3
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            deadline_ms: default_deadline_ms(),
            optimality_gap: default_optimality_gap(),
            big_m: default_big_m(),
            peak_multiplier: default_peak_multiplier(),
            off_peak_multiplier: default_off_peak_multiplier(),
            demand_peak_multiplier: default_demand_peak_multiplier(),
            near_limit_ratio: default_near_limit_ratio(),
            soc_margin: default_soc_margin(),
            tolerance: default_tolerance(),
        }
    }
}
