//! Trait boundaries to the components this crate deliberately does not
//! implement: PV forecast retrieval and run persistence. A surrounding
//! service (the HTTP surface, the database, the forecast provider) plugs
//! into [`crate::solve`] through these.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::result::ScheduleStepDto;
use crate::domain::solution::SolverKind;
use crate::kpi::Kpis;

/// The forecast collaborator returned no usable data.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{0}")]
pub struct ForecastError(pub String);

/// Fetches a PV generation forecast for a site and window. Synchronous per
/// the external interface contract — the core blocks on this call before
/// it can normalize a request that omitted `pv_forecast_kw`.
pub trait ForecastProvider {
    fn fetch_pv(
        &self,
        site_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        resolution_minutes: u32,
        quantile: f64,
    ) -> Result<Vec<f64>, ForecastError>;
}

/// Metadata describing a single dispatch run, handed to
/// [`PersistenceSink::write_run`] before the schedule and KPIs are known.
#[derive(Debug, Clone)]
pub struct RunMetadata {
    pub site_id: String,
    pub t: usize,
    pub solver_kind: SolverKind,
}

/// Stores runs, schedules and KPIs. Every method is best-effort: a failure
/// to persist never changes the result returned to the caller, it is only
/// the implementor's job to log it (§7 `PersistenceFailure`).
pub trait PersistenceSink {
    /// Returns `None` if the run could not be recorded, in which case the
    /// schedule and KPIs are not written either.
    fn write_run(&self, meta: &RunMetadata) -> Option<Uuid>;
    fn write_schedule(&self, run_id: Uuid, schedule: &[ScheduleStepDto]);
    fn write_kpis(&self, run_id: Uuid, kpis: &Kpis);
}

/// A persistence sink that records nothing. Used by callers that don't
/// need durability, and as the default in tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopPersistenceSink;

impl PersistenceSink for NoopPersistenceSink {
    fn write_run(&self, _meta: &RunMetadata) -> Option<Uuid> {
        None
    }

    fn write_schedule(&self, _run_id: Uuid, _schedule: &[ScheduleStepDto]) {}

    fn write_kpis(&self, _run_id: Uuid, _kpis: &Kpis) {}
}

/// A forecast provider backed by a fixed array, useful for tests and for
/// callers that already resolved a forecast through some other channel.
#[derive(Debug, Clone)]
pub struct InMemoryForecastProvider {
    pub forecast: Vec<f64>,
}

impl InMemoryForecastProvider {
    pub fn new(forecast: Vec<f64>) -> Self {
        Self { forecast }
    }
}

impl ForecastProvider for InMemoryForecastProvider {
    fn fetch_pv(
        &self,
        _site_id: &str,
        _start: DateTime<Utc>,
        _end: DateTime<Utc>,
        _resolution_minutes: u32,
        _quantile: f64,
    ) -> Result<Vec<f64>, ForecastError> {
        Ok(self.forecast.clone())
    }
}
