//! The wire-level request shape and its normalization into a
//! [`DispatchProblem`](crate::domain::problem::DispatchProblem).
//!
//! Every DTO here rejects unknown fields. Normalization is a single
//! sequential pass (not `validator`'s aggregate derive) because the
//! contract names the *first* failing field in a specific order.

use serde::{Deserialize, Serialize};

use crate::domain::problem::{BessParams, DispatchProblem, GridLimits, Weights};
use crate::error::InvalidInputError;

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct TariffRequest {
    pub buy: Vec<f64>,
    pub sell: Vec<f64>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct BessRequest {
    #[serde(default = "default_capacity_kwh")]
    pub capacity_kwh: f64,
    #[serde(default = "default_p_charge_max_kw")]
    pub p_charge_max_kw: f64,
    #[serde(default = "default_p_discharge_max_kw")]
    pub p_discharge_max_kw: f64,
    #[serde(default = "default_soc0")]
    pub soc0: f64,
    #[serde(default = "default_soc_min")]
    pub soc_min: f64,
    #[serde(default = "default_soc_max")]
    pub soc_max: f64,
    #[serde(default = "default_eta_charge")]
    pub eta_charge: f64,
    #[serde(default = "default_eta_discharge")]
    pub eta_discharge: f64,
}

impl Default for BessRequest {
    fn default() -> Self {
        Self {
            capacity_kwh: default_capacity_kwh(),
            p_charge_max_kw: default_p_charge_max_kw(),
            p_discharge_max_kw: default_p_discharge_max_kw(),
            soc0: default_soc0(),
            soc_min: default_soc_min(),
            soc_max: default_soc_max(),
            eta_charge: default_eta_charge(),
            eta_discharge: default_eta_discharge(),
        }
    }
}

fn default_capacity_kwh() -> f64 {
    100.0
}
fn default_p_charge_max_kw() -> f64 {
    50.0
}
fn default_p_discharge_max_kw() -> f64 {
    50.0
}
fn default_soc0() -> f64 {
    0.5
}
fn default_soc_min() -> f64 {
    0.2
}
fn default_soc_max() -> f64 {
    0.9
}
fn default_eta_charge() -> f64 {
    0.95
}
fn default_eta_discharge() -> f64 {
    0.95
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct LimitsRequest {
    #[serde(default = "default_grid_import_max_kw")]
    pub grid_import_max_kw: f64,
    #[serde(default = "default_grid_export_max_kw")]
    pub grid_export_max_kw: f64,
    #[serde(default = "default_transformer_max_kw")]
    pub transformer_max_kw: f64,
}

impl Default for LimitsRequest {
    fn default() -> Self {
        Self {
            grid_import_max_kw: default_grid_import_max_kw(),
            grid_export_max_kw: default_grid_export_max_kw(),
            transformer_max_kw: default_transformer_max_kw(),
        }
    }
}

fn default_grid_import_max_kw() -> f64 {
    200.0
}
fn default_grid_export_max_kw() -> f64 {
    200.0
}
fn default_transformer_max_kw() -> f64 {
    250.0
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct WeightsRequest {
    #[serde(default = "default_w_cost")]
    pub cost: f64,
    #[serde(default = "default_w_curtail")]
    pub curtail: f64,
    #[serde(default = "default_w_violation")]
    pub violation: f64,
}

impl Default for WeightsRequest {
    fn default() -> Self {
        Self {
            cost: default_w_cost(),
            curtail: default_w_curtail(),
            violation: default_w_violation(),
        }
    }
}

fn default_w_cost() -> f64 {
    1.0
}
fn default_w_curtail() -> f64 {
    0.2
}
fn default_w_violation() -> f64 {
    1000.0
}

fn default_use_milp() -> bool {
    true
}
fn default_solver_timeout_ms() -> u64 {
    3000
}

/// The authoritative wire request. Unknown top-level fields are rejected.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct DispatchRequest {
    pub site_id: String,
    pub resolution_minutes: u32,
    pub load_kw: Vec<f64>,
    pub tariff: TariffRequest,
    /// Absent means "fetch it through the forecast collaborator".
    #[serde(default)]
    pub pv_forecast_kw: Option<Vec<f64>>,
    #[serde(default)]
    pub bess: Option<BessRequest>,
    #[serde(default)]
    pub limits: Option<LimitsRequest>,
    #[serde(default)]
    pub weights: Option<WeightsRequest>,
    #[serde(default = "default_use_milp")]
    pub use_milp: bool,
    #[serde(default = "default_solver_timeout_ms")]
    pub solver_timeout_ms: u64,
}

fn check_non_negative_array(field: &'static str, values: &[f64]) -> Result<(), InvalidInputError> {
    for &v in values {
        if !v.is_finite() {
            return Err(InvalidInputError::NotFinite { field, value: v });
        }
        if v < 0.0 {
            return Err(InvalidInputError::Negative { field, value: v });
        }
    }
    Ok(())
}

fn check_length(field: &'static str, expected: usize, values: &[f64]) -> Result<(), InvalidInputError> {
    if values.len() != expected {
        return Err(InvalidInputError::LengthMismatch {
            field,
            expected,
            actual: values.len(),
        });
    }
    Ok(())
}

/// Validate and normalize a raw request into a solver-ready
/// [`DispatchProblem`]. `pv_forecast` is the already-resolved PV array
/// (either taken from the request or fetched through the forecast
/// collaborator before this call) — the field is not re-read from
/// `request.pv_forecast_kw`.
///
/// Fields are checked in the order the request schema lists them; the
/// first violation found is the one reported, matching "a typed
/// `InvalidInput` error naming the first failing field".
pub fn normalize(
    request: DispatchRequest,
    pv_forecast: Vec<f64>,
) -> Result<DispatchProblem, InvalidInputError> {
    if request.resolution_minutes == 0 {
        return Err(InvalidInputError::ZeroResolution(request.resolution_minutes));
    }
    let t = request.load_kw.len();
    if t == 0 {
        return Err(InvalidInputError::EmptyHorizon);
    }
    check_non_negative_array("load_kw", &request.load_kw)?;

    check_length("tariff.buy", t, &request.tariff.buy)?;
    check_non_negative_array("tariff.buy", &request.tariff.buy)?;

    check_length("tariff.sell", t, &request.tariff.sell)?;
    check_non_negative_array("tariff.sell", &request.tariff.sell)?;

    check_length("pv_forecast_kw", t, &pv_forecast)?;
    check_non_negative_array("pv_forecast_kw", &pv_forecast)?;

    let bess_req = request.bess.unwrap_or_default();
    if bess_req.capacity_kwh <= 0.0 {
        return Err(InvalidInputError::NotPositive {
            field: "bess.capacity_kwh",
            value: bess_req.capacity_kwh,
        });
    }
    if bess_req.p_charge_max_kw < 0.0 {
        return Err(InvalidInputError::Negative {
            field: "bess.p_charge_max_kw",
            value: bess_req.p_charge_max_kw,
        });
    }
    if bess_req.p_discharge_max_kw < 0.0 {
        return Err(InvalidInputError::Negative {
            field: "bess.p_discharge_max_kw",
            value: bess_req.p_discharge_max_kw,
        });
    }
    for (field, value) in [
        ("bess.soc0", bess_req.soc0),
        ("bess.soc_min", bess_req.soc_min),
        ("bess.soc_max", bess_req.soc_max),
    ] {
        if !(0.0..=1.0).contains(&value) {
            return Err(InvalidInputError::OutOfRange {
                field,
                value,
                lo: 0.0,
                hi: 1.0,
            });
        }
    }
    if bess_req.soc_min > bess_req.soc_max {
        return Err(InvalidInputError::SocBoundsInverted {
            soc_min: bess_req.soc_min,
            soc_max: bess_req.soc_max,
        });
    }
    if bess_req.soc0 < bess_req.soc_min || bess_req.soc0 > bess_req.soc_max {
        return Err(InvalidInputError::Soc0OutOfBounds {
            soc0: bess_req.soc0,
            soc_min: bess_req.soc_min,
            soc_max: bess_req.soc_max,
        });
    }
    for (field, value) in [
        ("bess.eta_charge", bess_req.eta_charge),
        ("bess.eta_discharge", bess_req.eta_discharge),
    ] {
        if !(value > 0.0 && value <= 1.0) {
            return Err(InvalidInputError::OutOfRange {
                field,
                value,
                lo: f64::EPSILON,
                hi: 1.0,
            });
        }
    }

    let limits_req = request.limits.unwrap_or_default();
    for (field, value) in [
        ("limits.grid_import_max_kw", limits_req.grid_import_max_kw),
        ("limits.grid_export_max_kw", limits_req.grid_export_max_kw),
        ("limits.transformer_max_kw", limits_req.transformer_max_kw),
    ] {
        if value < 0.0 {
            return Err(InvalidInputError::Negative { field, value });
        }
    }

    let weights_req = request.weights.unwrap_or_default();
    for (field, value) in [
        ("weights.cost", weights_req.cost),
        ("weights.curtail", weights_req.curtail),
        ("weights.violation", weights_req.violation),
    ] {
        if value < 0.0 {
            return Err(InvalidInputError::Negative { field, value });
        }
    }

    if request.solver_timeout_ms == 0 {
        return Err(InvalidInputError::NotPositive {
            field: "solver_timeout_ms",
            value: 0.0,
        });
    }

    let bess = BessParams {
        capacity_kwh: bess_req.capacity_kwh,
        p_charge_max: bess_req.p_charge_max_kw,
        p_discharge_max: bess_req.p_discharge_max_kw,
        soc0: bess_req.soc0,
        soc_min: bess_req.soc_min,
        soc_max: bess_req.soc_max,
        eta_charge: bess_req.eta_charge,
        eta_discharge: bess_req.eta_discharge,
    };

    let problem = DispatchProblem {
        t,
        dt_hours: request.resolution_minutes as f64 / 60.0,
        pv_forecast,
        load: request.load_kw,
        tariff_buy: request.tariff.buy,
        tariff_sell: request.tariff.sell,
        bess,
        limits: GridLimits {
            grid_import_max: limits_req.grid_import_max_kw,
            grid_export_max: limits_req.grid_export_max_kw,
            transformer_max: limits_req.transformer_max_kw,
        },
        weights: Weights {
            w_cost: weights_req.cost,
            w_curtail: weights_req.curtail,
            w_violation: weights_req.violation,
        },
    };

    if !problem.trivial_schedule_is_feasible() {
        return Err(InvalidInputError::TrivialScheduleInfeasible {
            soc0: problem.bess.soc0,
            soc_min: problem.bess.soc_min,
            soc_max: problem.bess.soc_max,
        });
    }

    Ok(problem)
}
