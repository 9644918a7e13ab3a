//! Error types for itinera_app

use itinera_animation::SchedulerError;
use itinera_core::TimelineError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while composing or driving the engine
#[derive(Error, Debug)]
pub enum EngineError {
    /// Route input could not be built into a timeline
    #[error(transparent)]
    Timeline(#[from] TimelineError),

    /// A scheduler command failed
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),

    /// Invalid or unparsable configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Reading a configuration file failed
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A comparison command that does not fit the current overlay mode
    #[error("Overlay error: {0}")]
    Overlay(String),
}

/// Result type for itinera_app operations
pub type Result<T> = std::result::Result<T, EngineError>;
