//! Error types for the sandycode assistant.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for generation, sandbox and workflow operations.
///
/// Execution diagnostics from user code are not errors; they are reported as
/// [`crate::sandbox::ExecutionOutcome::Failure`]. Anything surfacing here is a
/// fault in the environment, the generation service, or user input.
#[derive(Error, Debug)]
pub enum Error {
    /// The generation service call failed or returned an unusable response.
    #[error("generation failed: {0}")]
    Generation(String),

    /// A language tag or file extension with no known interpreter.
    #[error("unsupported language '{0}' (expected one of js, py, sh)")]
    UnsupportedLanguage(String),

    /// The requested workflow mode does not exist.
    #[error("invalid mode '{0}' (expected \"new\" or \"modify\")")]
    InvalidMode(String),

    /// Failed to prepare the sandbox or launch the interpreter inside it.
    #[error("failed to create sandbox: {0}")]
    SandboxCreation(String),

    /// Failed to remove the sandbox after an execution.
    #[error("failed to clean up sandbox at {path}: {reason}")]
    SandboxCleanup { path: PathBuf, reason: String },

    /// The generator's multi-file response did not follow the delimiter format.
    #[error("malformed patch response: {0}")]
    MalformedPatchResponse(String),

    /// A patch targets a path outside the project tree.
    #[error("invalid patch path: {0}")]
    InvalidPatchPath(PathBuf),

    /// The credential for the generation service is not set.
    #[error("missing credential: environment variable {0} is not set")]
    MissingCredential(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for sandycode operations.
pub type Result<T> = std::result::Result<T, Error>;
