//! Per-timestep human-readable explanations (§4.4): a ranked rule cascade,
//! the first matching rule wins, with active constraints appended when the
//! solution came from the MILP path.

use ordered_float::OrderedFloat;

use crate::config::SolverSettings;
use crate::domain::problem::DispatchProblem;
use crate::domain::solution::Solution;

const EPS: f64 = 0.01;

fn median(values: &[f64]) -> f64 {
    let mut sorted: Vec<OrderedFloat<f64>> = values.iter().copied().map(OrderedFloat).collect();
    sorted.sort();
    let n = sorted.len();
    if n == 0 {
        return 0.0;
    }
    if n % 2 == 1 {
        sorted[n / 2].into_inner()
    } else {
        (sorted[n / 2 - 1].into_inner() + sorted[n / 2].into_inner()) / 2.0
    }
}

fn base_reason(i: usize, solution: &Solution, problem: &DispatchProblem, settings: &SolverSettings, med_tariff: f64, med_load: f64) -> &'static str {
    let bess = &problem.bess;
    let limits = &problem.limits;

    let discharging = solution.batt_dis[i] > EPS;
    let charging = solution.batt_ch[i] > EPS;
    let curtailing = solution.curtail[i] > EPS;

    if discharging && problem.tariff_buy[i] > settings.peak_multiplier * med_tariff {
        return "Discharge battery during peak tariff hours";
    }
    if discharging && problem.load[i] > settings.demand_peak_multiplier * med_load {
        return "Discharge battery to meet demand peak";
    }
    if discharging && solution.grid_imp[i] >= settings.near_limit_ratio * limits.grid_import_max {
        return "Discharge battery due to grid import limit";
    }
    if charging && curtailing {
        return "Charge battery using curtailed PV";
    }
    if charging && problem.tariff_buy[i] < settings.off_peak_multiplier * med_tariff {
        return "Charge battery during low tariff hours";
    }
    if charging && problem.pv_forecast[i] > problem.load[i] {
        return "Charge battery with excess PV after load met";
    }
    if curtailing && solution.soc[i] >= bess.soc_max - settings.soc_margin {
        return "Curtail PV due to battery at max SOC";
    }
    if curtailing && solution.grid_exp[i] >= settings.near_limit_ratio * limits.grid_export_max {
        return "Curtail PV due to grid export limit";
    }
    if curtailing {
        return "Curtail PV for economic optimization";
    }
    if solution.soc[i] <= bess.soc_min + settings.soc_margin {
        return "SOC protected at minimum threshold";
    }
    if solution.soc[i] >= bess.soc_max - settings.soc_margin {
        return "SOC approaching maximum limit";
    }
    "Grid import to meet demand"
}

/// Derive one reason string per timestep. Deterministic: a function of
/// `solution` and `problem` only.
pub fn explain(solution: &Solution, problem: &DispatchProblem, settings: &SolverSettings) -> Vec<String> {
    let med_tariff = median(&problem.tariff_buy);
    let med_load = median(&problem.load);

    (0..problem.t)
        .map(|i| {
            let base = base_reason(i, solution, problem, settings, med_tariff, med_load);
            match solution.active_constraints.get(i) {
                Some(tags) if !tags.is_empty() => {
                    let joined = tags
                        .iter()
                        .map(|t| t.to_string())
                        .collect::<Vec<_>>()
                        .join(", ");
                    format!("{base}; active: [{joined}]")
                }
                _ => base.to_string(),
            }
        })
        .collect()
}
