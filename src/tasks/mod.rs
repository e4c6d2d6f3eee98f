//! Background Tasks Module
//!
//! Periodic maintenance that runs alongside request handling.
//!
//! # Tasks
//! - Refresh: runs every registered [`Warmer`]
//! - Health monitor: forwards health snapshots to every [`HealthSink`]
//! - Cleanup: removes keys stored without an expiry and watches memory

mod scheduler;
mod sink;
mod warmer;

pub use scheduler::{MaintenanceScheduler, Schedule};
pub use sink::{HealthSink, LogSink, SharedSink};
pub use warmer::{run_warmers, ComputedWarmer, SharedWarmer, Warmer};
