//! Error types for office worker lifecycle management

use std::io;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Office worker process errors
#[derive(Debug, Error)]
pub enum ProcessError {
    /// A process-table query matched more than one process
    #[error("Found {count} processes matching query '{query}'")]
    AmbiguousMatch { query: String, count: usize },

    /// The endpoint is already bound by another worker
    #[error("{0}")]
    IllegalState(String),

    /// Profile directory could not be prepared
    #[error("Failed to create profile dir {path}: {source}")]
    ProfileSetup {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A bounded poll did not observe the expected condition in time
    #[error("Retry timed out after {}ms", .elapsed.as_millis())]
    RetryTimeout { elapsed: Duration },

    /// Unexpected failure while obtaining the process exit status
    #[error("Could not get process exit code: {0}")]
    OfficeProcess(String),

    /// Failed to spawn process
    #[error("Failed to spawn process: {0}")]
    SpawnFailed(#[from] io::Error),

    /// Failed to deliver a signal
    #[error("Failed to kill process (PID: {pid}): {reason}")]
    KillFailed { pid: u32, reason: String },

    /// Operation requires a resolved pid but none was found after launch
    #[error("No pid resolved for process with accept string '{accept}'")]
    PidUnresolved { accept: String },

    /// More than one match for the query immediately after launching
    #[error("Found multiple processes with the query '{query}' after launch")]
    LaunchRace { query: String },

    /// Invalid configuration
    #[error("Invalid worker configuration: {0}")]
    InvalidConfig(String),

    /// Configuration source could not be loaded
    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),
}

impl ProcessError {
    /// Whether this error came from a poll running out of time
    pub fn is_timeout(&self) -> bool {
        matches!(self, ProcessError::RetryTimeout { .. })
    }
}

/// Result type for worker process operations
pub type Result<T> = std::result::Result<T, ProcessError>;
