//! The normalized, immutable input to both solvers.

/// Battery energy storage system parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BessParams {
    pub capacity_kwh: f64,
    pub p_charge_max: f64,
    pub p_discharge_max: f64,
    pub soc0: f64,
    pub soc_min: f64,
    pub soc_max: f64,
    pub eta_charge: f64,
    pub eta_discharge: f64,
}

impl Default for BessParams {
    fn default() -> Self {
        Self {
            capacity_kwh: 100.0,
            p_charge_max: 50.0,
            p_discharge_max: 50.0,
            soc0: 0.5,
            soc_min: 0.2,
            soc_max: 0.9,
            eta_charge: 0.95,
            eta_discharge: 0.95,
        }
    }
}

/// Grid and transformer power limits.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridLimits {
    pub grid_import_max: f64,
    pub grid_export_max: f64,
    pub transformer_max: f64,
}

impl Default for GridLimits {
    fn default() -> Self {
        Self {
            grid_import_max: 200.0,
            grid_export_max: 200.0,
            transformer_max: 250.0,
        }
    }
}

/// Objective weights.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Weights {
    pub w_cost: f64,
    pub w_curtail: f64,
    pub w_violation: f64,
}

impl Default for Weights {
    fn default() -> Self {
        Self {
            w_cost: 1.0,
            w_curtail: 0.2,
            w_violation: 1000.0,
        }
    }
}

/// A validated, solver-ready dispatch problem. Built once per request by
/// [`crate::domain::request::normalize`] and never mutated afterward.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchProblem {
    pub t: usize,
    pub dt_hours: f64,
    pub pv_forecast: Vec<f64>,
    pub load: Vec<f64>,
    pub tariff_buy: Vec<f64>,
    pub tariff_sell: Vec<f64>,
    pub bess: BessParams,
    pub limits: GridLimits,
    pub weights: Weights,
}

impl DispatchProblem {
    /// The all-grid, no-PV, no-battery schedule used to prove feasibility
    /// at construction time (§3: "the trivial all-grid schedule... must
    /// respect soc_min <= soc0 <= soc_max").
    pub fn trivial_schedule_is_feasible(&self) -> bool {
        self.bess.soc_min - 1e-6 <= self.bess.soc0 && self.bess.soc0 <= self.bess.soc_max + 1e-6
    }
}
