//! Request, problem, solution and result types, in the order data flows
//! through the core: `request` (wire shape) → `problem` (normalized,
//! immutable input) → `solution` (solver output) → `result` (wire shape
//! again, enriched with explanations and KPIs).

pub mod problem;
pub mod request;
pub mod result;
pub mod solution;
