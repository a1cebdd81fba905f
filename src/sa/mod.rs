//! Simulated Annealing (SA).
//!
//! A trajectory search over the items of a
//! [`Solution`](crate::solution::Solution). Each temperature phase runs
//! trials that perturb one random item; improving trials are kept, equal
//! ones are kept half of the time, and worsening ones are kept with the
//! Metropolis probability `exp(-delta / T)`. The temperature is reduced
//! geometrically between phases.
//!
//! # References
//!
//! - Kirkpatrick, Gelatt & Vecchi (1983), "Optimization by Simulated Annealing"
//! - Cerny (1985), "Thermodynamical Approach to the Travelling Salesman Problem"

mod config;
pub mod monitor;
mod runner;
mod types;

pub use config::SaConfig;
pub use monitor::{AnnealingMonitor, LogMonitor, NoOpMonitor, RecordingMonitor};
pub use runner::{acceptance_probability, SaReport, SimulatedAnnealing, StopReason};
pub use types::{PhaseStart, PhaseSummary, RunSummary, TrialClass, TrialEvent, Verdict};
