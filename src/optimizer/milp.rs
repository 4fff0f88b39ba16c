//! The exact MILP formulation (§4.2), built with `good_lp` against the
//! HiGHS backend — the only bundled `good_lp` backend that supports binary
//! variables and a configurable time limit.

use std::sync::mpsc;
use std::time::Duration;

use good_lp::{constraint, variable, Expression, ProblemVariables, Solution as LpSolution, SolverModel, Variable};

use crate::config::SolverSettings;
use crate::domain::problem::DispatchProblem;
use crate::domain::solution::Solution;
use crate::error::SolverFailureKind;
use crate::optimizer::active_set;
use crate::optimizer::types::MilpSolver;

/// `good_lp` + HiGHS driver. Holds no state, so one instance can be shared
/// across concurrent callers; each `build_and_solve` call builds an
/// independent model.
#[derive(Debug, Default, Clone, Copy)]
pub struct GoodLpMilpSolver;

struct StepVars {
    pv_set: Variable,
    batt_ch: Variable,
    batt_dis: Variable,
    grid_imp: Variable,
    grid_exp: Variable,
    curtail: Variable,
    b_charge: Variable,
    b_import: Variable,
}

fn build_model(
    vars: &mut ProblemVariables,
    problem: &DispatchProblem,
) -> (Vec<StepVars>, Vec<Variable>, Variable) {
    let t = problem.t;
    let mut steps = Vec::with_capacity(t);
    for i in 0..t {
        let pv_cap = problem.pv_forecast[i].max(0.0);
        steps.push(StepVars {
            pv_set: vars.add(variable().min(0.0).max(pv_cap)),
            batt_ch: vars.add(variable().min(0.0).max(problem.bess.p_charge_max)),
            batt_dis: vars.add(variable().min(0.0).max(problem.bess.p_discharge_max)),
            grid_imp: vars.add(variable().min(0.0).max(problem.limits.grid_import_max)),
            grid_exp: vars.add(variable().min(0.0).max(problem.limits.grid_export_max)),
            curtail: vars.add(variable().min(0.0).max(pv_cap)),
            b_charge: vars.add(variable().binary()),
            b_import: vars.add(variable().binary()),
        });
    }
    let mut soc = Vec::with_capacity(t + 1);
    for _ in 0..=t {
        soc.push(vars.add(variable().min(problem.bess.soc_min).max(problem.bess.soc_max)));
    }
    let slack_transformer = vars.add(variable().min(0.0));
    (steps, soc, slack_transformer)
}

impl MilpSolver for GoodLpMilpSolver {
    fn build_and_solve(
        &self,
        problem: &DispatchProblem,
        deadline: Duration,
        settings: &SolverSettings,
    ) -> Result<Solution, SolverFailureKind> {
        let problem = problem.clone();
        let settings = *settings;

        let (tx, rx) = mpsc::channel();
        let handle = std::thread::spawn(move || {
            let outcome = solve_sync(&problem, &settings);
            let _ = tx.send(outcome);
        });

        match rx.recv_timeout(deadline) {
            Ok(outcome) => {
                let _ = handle.join();
                outcome
            }
            Err(mpsc::RecvTimeoutError::Timeout) => Err(SolverFailureKind::Timeout),
            Err(mpsc::RecvTimeoutError::Disconnected) => Err(SolverFailureKind::SolverError),
        }
    }
}

fn solve_sync(problem: &DispatchProblem, settings: &SolverSettings) -> Result<Solution, SolverFailureKind> {
    let t = problem.t;
    let dt = problem.dt_hours;
    let m = settings.big_m;

    let mut vars = ProblemVariables::new();
    let (steps, soc, slack_transformer) = build_model(&mut vars, problem);

    let objective: Expression = steps
        .iter()
        .enumerate()
        .map(|(i, s)| {
            problem.weights.w_cost * (problem.tariff_buy[i] * s.grid_imp - problem.tariff_sell[i] * s.grid_exp) * dt
                + problem.weights.w_curtail * s.curtail * dt
        })
        .sum::<Expression>()
        + problem.weights.w_violation * slack_transformer;

    let mut model = vars.minimise(objective).using(good_lp::highs);
    // Best-effort: ask HiGHS to stop itself at the same deadline the
    // watchdog thread enforces, and to accept the configured gap.
    model.set_time_limit(deadline_secs(settings));
    model.set_option("mip_rel_gap", settings.optimality_gap);

    model = model.with(constraint!(soc[0] == problem.bess.soc0));

    for (i, s) in steps.iter().enumerate() {
        model = model.with(constraint!(
            s.pv_set + s.batt_dis + s.grid_imp == problem.load[i] + s.batt_ch + s.grid_exp
        ));
        model = model.with(constraint!(s.pv_set + s.curtail == problem.pv_forecast[i]));
        model = model.with(constraint!(
            soc[i + 1]
                == soc[i]
                    + (problem.bess.eta_charge * s.batt_ch - s.batt_dis / problem.bess.eta_discharge) * dt
                        / problem.bess.capacity_kwh
        ));
        model = model.with(constraint!(s.batt_ch <= m * s.b_charge));
        model = model.with(constraint!(s.batt_dis <= m * (1.0 - s.b_charge)));
        model = model.with(constraint!(s.grid_imp <= m * s.b_import));
        model = model.with(constraint!(s.grid_exp <= m * (1.0 - s.b_import)));
        model = model.with(constraint!(
            s.grid_imp + s.grid_exp <= problem.limits.transformer_max + slack_transformer
        ));
    }

    let solution = model.solve().map_err(classify_solver_error)?;

    let pv_set: Vec<f64> = steps.iter().map(|s| solution.value(s.pv_set)).collect();
    let batt_ch: Vec<f64> = steps.iter().map(|s| solution.value(s.batt_ch)).collect();
    let batt_dis: Vec<f64> = steps.iter().map(|s| solution.value(s.batt_dis)).collect();
    let grid_imp: Vec<f64> = steps.iter().map(|s| solution.value(s.grid_imp)).collect();
    let grid_exp: Vec<f64> = steps.iter().map(|s| solution.value(s.grid_exp)).collect();
    let curtail: Vec<f64> = steps.iter().map(|s| solution.value(s.curtail)).collect();
    let soc_values: Vec<f64> = soc.iter().map(|&v| solution.value(v)).collect();

    let objective_value = problem
        .weights
        .w_cost
        * (0..t)
            .map(|i| (problem.tariff_buy[i] * grid_imp[i] - problem.tariff_sell[i] * grid_exp[i]) * dt)
            .sum::<f64>()
        + problem.weights.w_curtail * curtail.iter().map(|c| c * dt).sum::<f64>()
        + problem.weights.w_violation * solution.value(slack_transformer);

    let active_constraints = active_set::detect(
        problem,
        &soc_values,
        &batt_ch,
        &batt_dis,
        &grid_imp,
        &grid_exp,
        settings.tolerance,
    );

    Ok(Solution {
        pv_set,
        batt_ch,
        batt_dis,
        grid_imp,
        grid_exp,
        curtail,
        soc: soc_values,
        solver_kind: crate::domain::solution::SolverKind::Milp,
        objective_value: Some(objective_value),
        active_constraints,
        residual_imbalance: false,
    })
}

fn deadline_secs(settings: &SolverSettings) -> f64 {
    (settings.deadline_ms as f64 / 1000.0).max(0.01)
}

fn classify_solver_error(err: good_lp::ResolutionError) -> SolverFailureKind {
    match err {
        good_lp::ResolutionError::Infeasible => SolverFailureKind::Infeasible,
        good_lp::ResolutionError::Unbounded => SolverFailureKind::Unbounded,
        _ => SolverFailureKind::SolverError,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::problem::{BessParams, GridLimits, Weights};

    fn generous_deadline() -> Duration {
        Duration::from_secs(5)
    }

    fn problem_with_tariff(tariff_buy: Vec<f64>) -> DispatchProblem {
        let t = tariff_buy.len();
        DispatchProblem {
            t,
            dt_hours: 0.25,
            pv_forecast: vec![10.0; t],
            load: vec![20.0; t],
            tariff_buy,
            tariff_sell: vec![0.05; t],
            bess: BessParams {
                capacity_kwh: 50.0,
                p_charge_max: 20.0,
                p_discharge_max: 20.0,
                soc0: 0.5,
                soc_min: 0.2,
                soc_max: 0.9,
                eta_charge: 0.95,
                eta_discharge: 0.95,
            },
            limits: GridLimits::default(),
            weights: Weights::default(),
        }
    }

    fn assert_solution_invariants(problem: &DispatchProblem, solution: &Solution) {
        let bess = &problem.bess;
        assert!((solution.soc[0] - bess.soc0).abs() < 1e-6);
        assert_eq!(solution.soc.len(), problem.t + 1);

        for i in 0..problem.t {
            let balance = solution.pv_set[i] + solution.batt_dis[i] + solution.grid_imp[i]
                - problem.load[i]
                - solution.batt_ch[i]
                - solution.grid_exp[i];
            assert!(balance.abs() <= 0.01, "power balance violated at step {i}: {balance}");

            let decomposition = solution.pv_set[i] + solution.curtail[i] - problem.pv_forecast[i];
            assert!(
                decomposition.abs() <= 0.01,
                "PV decomposition violated at step {i}: {decomposition}"
            );

            assert!(solution.batt_ch[i] * solution.batt_dis[i] <= 0.01 + 1e-9);
            assert!(solution.grid_imp[i] * solution.grid_exp[i] <= 0.01 + 1e-9);

            assert!(solution.soc[i] >= bess.soc_min - 1e-6);
            assert!(solution.soc[i] <= bess.soc_max + 1e-6);

            assert!(solution.pv_set[i] >= -1e-6);
            assert!(solution.batt_ch[i] >= -1e-6);
            assert!(solution.batt_dis[i] >= -1e-6);
            assert!(solution.grid_imp[i] >= -1e-6);
            assert!(solution.grid_exp[i] >= -1e-6);
            assert!(solution.curtail[i] >= -1e-6);

            assert!(solution.batt_ch[i] <= bess.p_charge_max + 1e-6);
            assert!(solution.batt_dis[i] <= bess.p_discharge_max + 1e-6);
            assert!(solution.grid_imp[i] <= problem.limits.grid_import_max + 1e-6);
            assert!(solution.grid_exp[i] <= problem.limits.grid_export_max + 1e-6);

            let expected_delta = (bess.eta_charge * solution.batt_ch[i] - solution.batt_dis[i] / bess.eta_discharge)
                * problem.dt_hours
                / bess.capacity_kwh;
            let actual_delta = solution.soc[i + 1] - solution.soc[i];
            assert!(
                (expected_delta - actual_delta).abs() < 1e-4,
                "soc dynamics violated at step {i}"
            );
        }
    }

    #[test]
    fn milp_basic_solve_respects_invariants() {
        let problem = problem_with_tariff(vec![0.3, 0.3, 1.0, 0.3]);
        let settings = SolverSettings::default();
        let solution = GoodLpMilpSolver
            .build_and_solve(&problem, generous_deadline(), &settings)
            .expect("small problem should solve");
        assert_eq!(solution.solver_kind, crate::domain::solution::SolverKind::Milp);
        assert!(solution.objective_value.is_some());
        assert_solution_invariants(&problem, &solution);
    }

    #[test]
    fn milp_respects_soc_constraints() {
        // Peak tariff at step 2 gives the battery every incentive to drain
        // below soc_min there; the solver must still respect the bound.
        let mut problem = problem_with_tariff(vec![0.3, 0.3, 5.0, 0.3]);
        problem.bess.soc0 = 0.21;
        problem.bess.soc_min = 0.2;
        let settings = SolverSettings::default();
        let solution = GoodLpMilpSolver
            .build_and_solve(&problem, generous_deadline(), &settings)
            .expect("small problem should solve");
        assert_solution_invariants(&problem, &solution);
        for &s in &solution.soc {
            assert!(s >= problem.bess.soc_min - 1e-6);
        }
    }

    #[test]
    fn milp_monotonicity_doubling_tariff_never_increases_grid_import() {
        let settings = SolverSettings::default();

        let baseline = problem_with_tariff(vec![0.3, 0.3, 1.0, 0.3]);
        let doubled = problem_with_tariff(vec![0.6, 0.6, 2.0, 0.6]);

        let solution_baseline = GoodLpMilpSolver
            .build_and_solve(&baseline, generous_deadline(), &settings)
            .expect("baseline problem should solve");
        let solution_doubled = GoodLpMilpSolver
            .build_and_solve(&doubled, generous_deadline(), &settings)
            .expect("doubled-tariff problem should solve");

        let grid_import_kwh = |p: &DispatchProblem, s: &Solution| {
            s.grid_imp.iter().map(|v| v * p.dt_hours).sum::<f64>()
        };
        let baseline_kwh = grid_import_kwh(&baseline, &solution_baseline);
        let doubled_kwh = grid_import_kwh(&doubled, &solution_doubled);
        assert!(
            doubled_kwh <= baseline_kwh + 1e-6,
            "doubling tariff_buy increased grid import: {baseline_kwh} -> {doubled_kwh}"
        );
    }

    #[test]
    fn boundary_t_equals_one_solves() {
        let problem = problem_with_tariff(vec![0.3]);
        let settings = SolverSettings::default();
        let solution = GoodLpMilpSolver
            .build_and_solve(&problem, generous_deadline(), &settings)
            .expect("single-step problem should solve");
        assert_solution_invariants(&problem, &solution);
    }

    #[test]
    fn boundary_zero_grid_limits_infeasible_when_supply_cannot_cover_load() {
        let mut problem = problem_with_tariff(vec![0.3]);
        problem.pv_forecast = vec![0.0];
        problem.load = vec![10.0];
        problem.bess.soc0 = 0.5;
        problem.bess.soc_min = 0.5;
        problem.bess.soc_max = 0.5;
        problem.limits = GridLimits {
            grid_import_max: 0.0,
            grid_export_max: 0.0,
            transformer_max: 0.0,
        };
        let settings = SolverSettings::default();
        let result = GoodLpMilpSolver.build_and_solve(&problem, generous_deadline(), &settings);
        assert_eq!(result, Err(SolverFailureKind::Infeasible));
    }
}
