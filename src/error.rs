//! Error types for kogura
//!
//! Exit codes:
//! - 0: Success
//! - 2: User error (bad args, unknown task, bad config)
//! - 3: Blocked (unconfirmed delete, submission already in flight)
//! - 4: Operation failed (interpreter, I/O, corrupt store)

use std::path::PathBuf;
use thiserror::Error;

use crate::interpret::InterpretError;

/// Exit codes for the kogura CLI
pub mod exit_codes {
    pub const USER_ERROR: i32 = 2;
    pub const BLOCKED: i32 = 3;
    pub const OPERATION_FAILED: i32 = 4;
}

/// Main error type for kogura operations
#[derive(Error, Debug)]
pub enum Error {
    // User errors (exit code 2)
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Input is empty; describe the activity in one sentence")]
    EmptyInput,

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Ambiguous task id '{input}': {candidates}")]
    AmbiguousTaskId { input: String, candidates: String },

    // Blocked (exit code 3)
    #[error("Deleting task {0} requires confirmation")]
    ConfirmationRequired(String),

    #[error("A submission is already being interpreted")]
    SubmissionInFlight,

    // Operation failures (exit code 4)
    /// Deliberately generic: the cause is logged, not shown.
    #[error("Could not turn that into a task. Please try again.")]
    Interpret(#[from] InterpretError),

    #[error("Stored task {id} is invalid: {reason}")]
    InvalidStoredTask { id: String, reason: String },

    #[error("Data directory unavailable: {0}")]
    DataDir(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl Error {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::InvalidConfig(_)
            | Error::InvalidArgument(_)
            | Error::EmptyInput
            | Error::TaskNotFound(_)
            | Error::AmbiguousTaskId { .. } => exit_codes::USER_ERROR,

            Error::ConfirmationRequired(_) | Error::SubmissionInFlight => exit_codes::BLOCKED,

            Error::Interpret(_)
            | Error::InvalidStoredTask { .. }
            | Error::DataDir(_)
            | Error::Io(_)
            | Error::Json(_)
            | Error::TomlParse(_)
            | Error::TomlSerialize(_) => exit_codes::OPERATION_FAILED,
        }
    }

    /// Structured details for JSON error output.
    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            Error::InvalidConfig(message) | Error::InvalidArgument(message) => {
                Some(serde_json::json!({ "message": message }))
            }
            Error::TaskNotFound(id) | Error::ConfirmationRequired(id) => {
                Some(serde_json::json!({ "task_id": id }))
            }
            Error::AmbiguousTaskId { input, candidates } => Some(serde_json::json!({
                "input": input,
                "candidates": candidates.split(", ").collect::<Vec<_>>(),
            })),
            Error::Interpret(err) => Some(serde_json::json!({ "reason": err.kind() })),
            Error::InvalidStoredTask { id, .. } => Some(serde_json::json!({ "task_id": id })),
            _ => None,
        }
    }
}

/// Result type alias for kogura operations
pub type Result<T> = std::result::Result<T, Error>;
