//! Error handling for the job orchestrator.
//!
//! Job-level failures (a command exiting non-zero, a submission that the
//! scheduler rejected, an output file that could not be fetched) are not
//! errors: they surface as a terminal job status carrying a negative or
//! non-zero exit code. The variants below cover everything else.

use thiserror::Error;

/// Result type for orchestrator operations.
pub type SchedResult<T> = Result<T, SchedError>;

/// Errors that can occur during orchestrator operations.
#[derive(Error, Debug)]
pub enum SchedError {
    /// The running-job query did not end with the expected sentinel line.
    #[error("Scheduler query failed: {0}")]
    TransientQuery(String),

    /// The scheduler accepted the call but its reply carried no job id.
    #[error("Submission failed: {0}")]
    Submission(String),

    /// Copying files to or from the remote side failed.
    #[error("File transfer failed: {0}")]
    Transfer(String),

    /// Invalid or unsatisfiable configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The orchestrator was killed or has finished its teardown.
    #[error("Orchestrator is dead: {0}")]
    DeadOrchestrator(String),

    /// The orchestrator no longer accepts new work.
    #[error("Orchestrator is shutting down")]
    ShuttingDown,

    /// A remote or local command could not be launched at all.
    #[error("Command failed: {command} - {message}")]
    Transport { command: String, message: String },

    /// Checkpoint persistence error.
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// SQLite database error.
    #[error("Database error: {0}")]
    Database(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML configuration parse error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),

    /// Internal orchestrator error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl SchedError {
    /// Whether the monitor loop may swallow this error and retry next cycle.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            SchedError::TransientQuery(_)
                | SchedError::Submission(_)
                | SchedError::Transfer(_)
                | SchedError::Transport { .. }
        )
    }
}

impl From<rusqlite::Error> for SchedError {
    fn from(e: rusqlite::Error) -> Self {
        SchedError::Database(e.to_string())
    }
}
