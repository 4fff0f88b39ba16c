//! Aggregate metrics computed from a [`Solution`] and its originating
//! [`DispatchProblem`], using the same `Δt` arithmetic the solver used.

use itertools::izip;
use serde::{Deserialize, Serialize};

use crate::domain::problem::DispatchProblem;
use crate::domain::solution::Solution;

const EPS: f64 = 1e-9;

/// KPIs for one solved dispatch. The first four fields are the wire
/// contract named in §6; the rest are extended reporting metrics (§4.5)
/// available to callers that want more than the minimum.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Kpis {
    pub total_cost: f64,
    pub total_curtail_kwh: f64,
    pub peak_grid_import_kw: f64,
    pub avg_soc: f64,

    pub grid_import_kwh: f64,
    pub grid_export_kwh: f64,
    pub batt_charge_kwh: f64,
    pub batt_discharge_kwh: f64,
    pub soc_min_reached: f64,
    pub soc_max_reached: f64,
    pub total_buy_cost: f64,
    pub total_sell_revenue: f64,
    pub net_energy_kwh: f64,
    pub self_consumption_rate: f64,
}

/// Compute every KPI named in §4.5 from a solved schedule. No rounding is
/// applied to intermediate values.
pub fn compute(solution: &Solution, problem: &DispatchProblem) -> Kpis {
    let dt = problem.dt_hours;

    let mut total_buy_cost = 0.0;
    let mut total_sell_revenue = 0.0;
    let mut total_curtail_kwh = 0.0;
    let mut grid_import_kwh = 0.0;
    let mut grid_export_kwh = 0.0;
    let mut batt_charge_kwh = 0.0;
    let mut batt_discharge_kwh = 0.0;
    let mut peak_grid_import_kw = 0.0_f64;
    let mut sum_pv_set = 0.0;
    let mut sum_pv_forecast = 0.0;

    let rows = izip!(
        &problem.tariff_buy,
        &problem.tariff_sell,
        &problem.pv_forecast,
        &solution.pv_set,
        &solution.batt_ch,
        &solution.batt_dis,
        &solution.grid_imp,
        &solution.grid_exp,
        &solution.curtail,
    );
    for (tariff_buy, tariff_sell, pv_forecast, pv_set, batt_ch, batt_dis, grid_imp, grid_exp, curtail) in rows {
        total_buy_cost += tariff_buy * grid_imp * dt;
        total_sell_revenue += tariff_sell * grid_exp * dt;
        total_curtail_kwh += curtail * dt;
        grid_import_kwh += grid_imp * dt;
        grid_export_kwh += grid_exp * dt;
        batt_charge_kwh += batt_ch * dt;
        batt_discharge_kwh += batt_dis * dt;
        peak_grid_import_kw = peak_grid_import_kw.max(*grid_imp);
        sum_pv_set += pv_set;
        sum_pv_forecast += pv_forecast;
    }

    let total_cost = total_buy_cost - total_sell_revenue;
    let avg_soc = solution.soc.iter().copied().sum::<f64>() / solution.soc.len() as f64;
    let soc_min_reached = solution.soc.iter().copied().fold(f64::INFINITY, f64::min);
    let soc_max_reached = solution.soc.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let net_energy_kwh = grid_export_kwh - grid_import_kwh;
    let self_consumption_rate = sum_pv_set / sum_pv_forecast.max(EPS);

    Kpis {
        total_cost,
        total_curtail_kwh,
        peak_grid_import_kw,
        avg_soc,
        grid_import_kwh,
        grid_export_kwh,
        batt_charge_kwh,
        batt_discharge_kwh,
        soc_min_reached,
        soc_max_reached,
        total_buy_cost,
        total_sell_revenue,
        net_energy_kwh,
        self_consumption_rate,
    }
}
