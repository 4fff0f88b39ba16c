//! The capability boundary between the core and any specific MILP solver
//! library (§9 "Solver integration": "treat the MILP solver as a capability
//! boundary").

use std::time::Duration;

use crate::config::SolverSettings;
use crate::domain::problem::DispatchProblem;
use crate::domain::solution::Solution;
use crate::error::SolverFailureKind;

/// Builds and solves the MILP model for a [`DispatchProblem`] within a
/// wall-clock deadline. Implementations are not required to be
/// thread-safe; each concurrent caller constructs its own instance.
pub trait MilpSolver: Send + Sync {
    fn build_and_solve(
        &self,
        problem: &DispatchProblem,
        deadline: Duration,
        settings: &SolverSettings,
    ) -> Result<Solution, SolverFailureKind>;
}
