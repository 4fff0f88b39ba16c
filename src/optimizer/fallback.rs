//! The deterministic rule-based scheduler (§4.3). Guaranteed to return a
//! feasible [`Solution`] for any valid [`DispatchProblem`]; never fails.
//!
//! Grounded in the priority-ordered allocator shape of a load-first,
//! PV-second, battery-third, grid-last power flow model, with
//! median/percentile tariff tiering driving the battery's charge/discharge
//! decision the way a percentile-based price-tier optimizer would.

use ordered_float::OrderedFloat;

use crate::config::SolverSettings;
use crate::domain::problem::DispatchProblem;
use crate::domain::solution::{Solution, SolverKind};

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

fn available_charge_energy(problem: &DispatchProblem, soc_t: f64) -> f64 {
    let bess = &problem.bess;
    (bess.soc_max - soc_t) * bess.capacity_kwh / (bess.eta_charge * problem.dt_hours)
}

fn available_discharge_energy(problem: &DispatchProblem, soc_t: f64) -> f64 {
    let bess = &problem.bess;
    (soc_t - bess.soc_min) * bess.capacity_kwh * bess.eta_discharge / problem.dt_hours
}

/// Run the deterministic fallback scheduler over the full horizon.
pub fn run_fallback(problem: &DispatchProblem, settings: &SolverSettings) -> Solution {
    let t = problem.t;
    let med_tariff = median(&problem.tariff_buy);

    let mut pv_set = vec![0.0; t];
    let mut batt_ch = vec![0.0; t];
    let mut batt_dis = vec![0.0; t];
    let mut grid_imp = vec![0.0; t];
    let mut grid_exp = vec![0.0; t];
    let mut curtail = vec![0.0; t];
    let mut soc = vec![0.0; t + 1];
    soc[0] = problem.bess.soc0;

    let mut residual_imbalance = false;

    for i in 0..t {
        let soc_t = soc[i];
        let bess = &problem.bess;
        let limits = &problem.limits;

        let is_peak = problem.tariff_buy[i] > settings.peak_multiplier * med_tariff;
        let is_off_peak = problem.tariff_buy[i] < settings.off_peak_multiplier * med_tariff;

        pv_set[i] = problem.pv_forecast[i].min(problem.load[i]);
        let mut pv_surplus = problem.pv_forecast[i] - pv_set[i];

        let mut ch = 0.0;
        let mut dis = 0.0;
        let mut charge_from_pv = 0.0;

        if is_peak && soc_t > bess.soc_min {
            let available = available_discharge_energy(problem, soc_t).max(0.0);
            dis = bess
                .p_discharge_max
                .min((problem.load[i] - pv_set[i]).max(0.0))
                .min(available);
        } else if pv_surplus > 0.0 && soc_t < bess.soc_max {
            let available = available_charge_energy(problem, soc_t).max(0.0);
            ch = bess.p_charge_max.min(pv_surplus).min(available);
            charge_from_pv = ch;
            pv_surplus -= ch;
        } else if is_off_peak && soc_t < bess.soc_max {
            let available = available_charge_energy(problem, soc_t).max(0.0);
            ch = bess.p_charge_max.min(available);
        }

        batt_ch[i] = ch;
        batt_dis[i] = dis;

        // Remaining surplus after any PV-sourced charge is either exported
        // or curtailed; charging from the grid (off-peak branch) doesn't
        // touch this pool.
        let export_from_pv = pv_surplus.min(limits.grid_export_max);
        grid_exp[i] = export_from_pv;
        curtail[i] = (pv_surplus - export_from_pv).max(0.0);

        // Total PV actually put to use (load + PV-sourced charge + PV-sourced
        // export) — distinct from the reported `pv_set`, which stays the
        // load-serving fraction per the worked examples.
        let pv_supplied = pv_set[i] + charge_from_pv + export_from_pv;

        let r = problem.load[i] + batt_ch[i] + grid_exp[i] - pv_supplied - batt_dis[i];
        if r > EPS {
            grid_imp[i] = r.min(limits.grid_import_max);
            let mut deficit = r - grid_imp[i];
            if deficit > EPS {
                let reduce = batt_ch[i].min(deficit);
                batt_ch[i] -= reduce;
                deficit -= reduce;
            }
            if deficit > EPS {
                let reduce = pv_set[i].min(deficit);
                pv_set[i] -= reduce;
                curtail[i] += reduce;
                deficit -= reduce;
            }
            if deficit > EPS {
                residual_imbalance = true;
            }
        } else if r < -EPS {
            let extra = -r;
            let headroom = (limits.grid_export_max - grid_exp[i]).max(0.0);
            let additional_export = extra.min(headroom);
            grid_exp[i] += additional_export;
            let spill = extra - additional_export;
            if spill > 0.0 {
                curtail[i] += spill;
            }
        }

        let delta = (bess.eta_charge * batt_ch[i] - batt_dis[i] / bess.eta_discharge)
            * problem.dt_hours
            / bess.capacity_kwh;
        soc[i + 1] = (soc_t + delta).clamp(bess.soc_min, bess.soc_max);
    }

    Solution {
        pv_set,
        batt_ch,
        batt_dis,
        grid_imp,
        grid_exp,
        curtail,
        soc,
        solver_kind: SolverKind::Fallback,
        objective_value: None,
        active_constraints: vec![Default::default(); t],
        residual_imbalance,
    }
}
