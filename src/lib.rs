//! Deterministic day-ahead dispatch optimization core.
//!
//! Given a PV forecast, a load forecast, a buy/sell tariff schedule, BESS
//! parameters and grid/transformer limits, [`solve`] computes a power
//! schedule over a discrete time horizon that minimizes cost + curtailment
//! + constraint-violation penalties while respecting every operating
//! constraint, falling back to a deterministic rule-based scheduler when the
//! MILP solver cannot return a solution within its deadline.
//!
//! The HTTP surface, persistence layer, and PV forecast retrieval are not
//! part of this crate — they are external collaborators reached through the
//! [`collaborators`] trait boundary.

pub mod collaborators;
pub mod config;
pub mod domain;
pub mod error;
pub mod explain;
pub mod kpi;
pub mod optimizer;

use chrono::Utc;
use tracing::{info, warn};

pub use collaborators::{ForecastProvider, NoopPersistenceSink, PersistenceSink};
pub use config::SolverSettings;
pub use domain::problem::DispatchProblem;
pub use domain::request::DispatchRequest;
pub use domain::result::{DispatchResult, ResultStatus, ScheduleStepDto, SolverLabel};
pub use domain::solution::{ActiveConstraintTag, Solution, SolverKind};
pub use error::{DispatchError, InvalidInputError, SolverFailureKind};
pub use kpi::Kpis;
pub use optimizer::fallback::run_fallback;
pub use optimizer::types::MilpSolver;

#[cfg(feature = "milp")]
pub use optimizer::milp::GoodLpMilpSolver;

/// Solve one dispatch request end to end.
///
/// This is the crate's single entry point: it normalizes the request into a
/// [`DispatchProblem`], resolves the PV forecast (fetching it through
/// `forecast` if the request omitted it), runs the MILP optimizer (unless
/// `use_milp` is false), falls back to the deterministic rule-based
/// scheduler on any MILP failure, derives per-step explanations, computes
/// KPIs, and persists the run best-effort through `persist`. It never
/// panics and never returns an `Err` — every outcome, including invalid
/// input, is represented in the returned [`DispatchResult`].
pub fn solve(
    request: DispatchRequest,
    forecast: &dyn ForecastProvider,
    persist: &dyn PersistenceSink,
    solver: &dyn MilpSolver,
    settings: &SolverSettings,
) -> DispatchResult {
    let site_id = request.site_id.clone();
    let t = request.load_kw.len();

    let pv_forecast = match &request.pv_forecast_kw {
        Some(pv) => pv.clone(),
        None => {
            let now = Utc::now();
            let step = chrono::Duration::minutes(request.resolution_minutes as i64);
            let end = now + step * (t.max(1) as i32);
            match forecast.fetch_pv(&site_id, now, end, request.resolution_minutes, 0.5) {
                Ok(pv) => pv,
                Err(e) => {
                    warn!(site_id = %site_id, error = %e.0, "pv forecast unavailable");
                    return DispatchResult::invalid_input("pv_forecast_unavailable".to_string());
                }
            }
        }
    };

    let use_milp = request.use_milp;
    let timeout_ms = request.solver_timeout_ms;

    let problem = match domain::request::normalize(request, pv_forecast) {
        Ok(p) => p,
        Err(e) => {
            info!(site_id = %site_id, error = %e, "invalid dispatch request");
            return DispatchResult::invalid_input(e.to_string());
        }
    };

    let deadline = std::time::Duration::from_millis(timeout_ms);

    let (solution, solver_label, fallback_used, error) = if use_milp {
        match solver.build_and_solve(&problem, deadline, settings) {
            Ok(solution) => (solution, SolverLabel::Milp, false, None),
            Err(kind) => {
                warn!(site_id = %site_id, kind = %kind, "milp solve failed, invoking fallback");
                let solution = run_fallback(&problem, settings);
                (solution, SolverLabel::FallbackRule, true, Some(kind.to_string()))
            }
        }
    } else {
        let solution = run_fallback(&problem, settings);
        (solution, SolverLabel::RuleBased, true, None)
    };

    let reasons = explain::explain(&solution, &problem, settings);
    let kpis = kpi::compute(&solution, &problem);

    let run_id = persist.write_run(&collaborators::RunMetadata {
        site_id: site_id.clone(),
        t: problem.t,
        solver_kind: solution.solver_kind,
    });
    if let Some(run_id) = run_id {
        let steps: Vec<ScheduleStepDto> = domain::result::build_schedule(&solution, &reasons);
        persist.write_schedule(run_id, &steps);
        persist.write_kpis(run_id, &kpis);
    } else {
        warn!(site_id = %site_id, "persistence write_run failed; schedule/kpis not persisted");
    }

    DispatchResult::from_solution(&solution, &kpis, &reasons, solver_label, fallback_used, error)
}
