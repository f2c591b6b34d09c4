//! Multi-trial optimization.
//!
//! # Submodules
//!
//! - [`orchestrator`]: the [`Optimizer`] worker pool and run lifecycle
//! - [`progress`]: thread-safe progress and ETA for observers
//! - [`report`]: run summary

pub mod orchestrator;
pub mod progress;
pub mod report;

pub use orchestrator::{trial_seed, Optimizer, StrategyFactory};
pub use progress::{Progress, ProgressTracker, RunGuard};
pub use report::{OptimizationReport, TrialFailure};
