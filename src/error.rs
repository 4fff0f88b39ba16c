//! Error taxonomy for the dispatch core.
//!
//! Each outcome named in the specification's error handling design is a
//! distinct typed value. `InvalidInputError` and `SolverFailureKind` are
//! surfaced to callers through [`crate::domain::result::DispatchResult`];
//! `DispatchError` is the internal umbrella used where a `Result` is still
//! convenient (e.g. building a `DispatchProblem`).

use thiserror::Error;

/// Why a raw [`crate::domain::request::DispatchRequest`] could not be
/// normalized into a [`crate::domain::problem::DispatchProblem`]. Each
/// variant names the offending field so the caller can report it verbatim.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum InvalidInputError {
    #[error("'{field}' must have length {expected}, got {actual}")]
    LengthMismatch {
        field: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("'{field}' must be non-negative, got {value}")]
    Negative { field: &'static str, value: f64 },

    #[error("'{field}' must be positive, got {value}")]
    NotPositive { field: &'static str, value: f64 },

    #[error("'{field}' must be finite, got {value}")]
    NotFinite { field: &'static str, value: f64 },

    #[error("'{field}' must lie in [{lo}, {hi}], got {value}")]
    OutOfRange {
        field: &'static str,
        value: f64,
        lo: f64,
        hi: f64,
    },

    #[error("'resolution_minutes' must be > 0, got {0}")]
    ZeroResolution(u32),

    #[error("the request has zero timesteps")]
    EmptyHorizon,

    #[error("'bess.soc_min' ({soc_min}) must be <= 'bess.soc_max' ({soc_max})")]
    SocBoundsInverted { soc_min: f64, soc_max: f64 },

    #[error(
        "'bess.soc0' ({soc0}) must lie within ['bess.soc_min', 'bess.soc_max'] = [{soc_min}, {soc_max}]"
    )]
    Soc0OutOfBounds {
        soc0: f64,
        soc_min: f64,
        soc_max: f64,
    },

    #[error(
        "the trivial all-grid schedule violates soc bounds at step 0 (soc0={soc0}, soc_min={soc_min}, soc_max={soc_max})"
    )]
    TrivialScheduleInfeasible {
        soc0: f64,
        soc_min: f64,
        soc_max: f64,
    },
}

/// Why the MILP solver did not return a usable solution. Maps 1:1 to the
/// solver termination statuses named in the specification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum SolverFailureKind {
    Timeout,
    Infeasible,
    Unbounded,
    SolverError,
}

/// Umbrella error used internally where a `Result` is convenient. Not part
/// of the public `solve` contract — `solve` never returns `Err`.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("invalid input: {0}")]
    InvalidInput(#[from] InvalidInputError),

    #[error("pv_forecast_unavailable")]
    ForecastUnavailable,

    #[error("solver failure: {0}")]
    SolverFailure(SolverFailureKind),
}
