//! Error types for opgate-hosting

use thiserror::Error;

/// Errors raised by hosting-platform actions
#[derive(Error, Debug)]
pub enum HostingError {
    /// The command could not be started
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The command ran and exited non-zero
    #[error("command {command:?} failed with exit code {code:?}: {stderr}")]
    CommandFailed {
        command: Vec<String>,
        code: Option<i32>,
        stderr: String,
    },

    /// Injected failure (fakes only)
    #[error("hosting action rejected: {0}")]
    Rejected(String),
}

/// Result type for hosting actions
pub type HostingResult<T> = std::result::Result<T, HostingError>;
