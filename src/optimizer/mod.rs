//! The MILP model builder/driver, its active-constraint post-processing,
//! and the deterministic fallback scheduler.

pub mod active_set;
pub mod fallback;
pub mod types;

#[cfg(feature = "milp")]
pub mod milp;
