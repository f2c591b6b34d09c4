//! Single optimization trial.
//!
//! A trial clones the snapshot into a [`TrialState`], lets a
//! [`PlacementStrategy`] drive the greedy [`TrialRunner`] loop, and
//! returns the scored result.
//!
//! # Submodules
//!
//! - [`state`]: working slots and open pool with incremental mutation
//! - [`strategy`]: topic order and candidate selection
//! - [`runner`]: the per-trial greedy loop

pub mod runner;
pub mod state;
pub mod strategy;

pub use runner::{TrialOutcome, TrialRunner};
pub use state::{OpenSlot, TrialState};
pub use strategy::{PlacementStrategy, RotationStrategy, MAX_ROTATION_OFFSET};
