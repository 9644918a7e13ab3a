//! Scheduler errors

use itinera_core::TimelineError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchedulerError {
    /// A transport command that needs a timeline was issued before `load`
    #[error("no timeline loaded")]
    NotLoaded,

    /// `load` was called on a scheduler that still holds a timeline; call `dispose` first
    #[error("a timeline is already loaded; dispose the scheduler before loading another")]
    AlreadyLoaded,

    #[error(transparent)]
    Timeline(#[from] TimelineError),
}

/// Result type for scheduler operations
pub type Result<T> = std::result::Result<T, SchedulerError>;
