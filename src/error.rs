//! Error types for snapshot loading, trial runs, persistence, and configuration.

use thiserror::Error;

use crate::models::{ApplicationId, SlotId, TopicId};
use crate::validation::ValidationError;

/// Result type alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Result type alias for a single trial.
pub type TrialResult<T> = Result<T, TrialError>;

/// Result type alias for optimizer runs.
pub type OptimizerResult<T> = Result<T, OptimizerError>;

/// Errors raised by an [`AssignmentStore`](crate::store::AssignmentStore).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("no active term")]
    NoActiveTerm,

    #[error("not found: {0}")]
    NotFound(String),

    #[error("application {application_id} is already assigned to topic {topic_id} slot {slot_id}")]
    Conflict {
        application_id: ApplicationId,
        topic_id: TopicId,
        slot_id: SlotId,
    },

    #[error("slot {slot_id} of topic {topic_id} is locked")]
    LockedSlot { topic_id: TopicId, slot_id: SlotId },

    #[error("store backend error: {0}")]
    Backend(String),
}

/// Errors raised inside one optimization trial.
///
/// Any of these means the trial's isolation or bookkeeping broke; the
/// orchestrator drops the trial and keeps going.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TrialError {
    #[error("application {0} is not in the open pool")]
    NotOpen(ApplicationId),

    #[error("slot {slot_id} of topic {topic_id} is locked")]
    SlotLocked { topic_id: TopicId, slot_id: SlotId },

    #[error("unknown topic {0}")]
    UnknownTopic(TopicId),

    #[error("trial produced an inconsistent state: {}", summarize(.0))]
    Invalid(Vec<ValidationError>),

    #[error("trial panicked: {0}")]
    Panicked(String),
}

/// Errors that abort a whole optimization run.
#[derive(Debug, Error)]
pub enum OptimizerError {
    #[error("snapshot unavailable: {0}")]
    SnapshotUnavailable(#[source] StoreError),

    #[error("invalid snapshot: {}", summarize(.0))]
    InvalidSnapshot(Vec<ValidationError>),

    #[error("term '{0}' is finalized")]
    TermFinalized(String),

    #[error("an optimization run is already in progress")]
    AlreadyRunning,

    #[error("persisting the best assignment failed: {0}")]
    PersistenceConflict(#[source] StoreError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Errors from loading or validating an [`OptimizerConfig`](crate::config::OptimizerConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value for {field}: {message}")]
    Invalid {
        field: &'static str,
        message: String,
    },
}

fn summarize(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}
