//! Sandbox provider trait and types.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::Result;
use crate::language::Language;

/// Result of running one source file inside a sandbox.
///
/// A non-zero exit is an expected outcome, not an error: the diagnostic is
/// fed back to the generator as corrective context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionOutcome {
    /// The interpreter exited with status zero.
    Success,
    /// The interpreter exited non-zero; carries the trimmed standard error.
    Failure(String),
}

impl ExecutionOutcome {
    /// Returns true if the program ran cleanly.
    pub fn is_success(&self) -> bool {
        matches!(self, ExecutionOutcome::Success)
    }

    /// Returns the diagnostic text for a failed run.
    pub fn diagnostic(&self) -> Option<&str> {
        match self {
            ExecutionOutcome::Success => None,
            ExecutionOutcome::Failure(text) => Some(text),
        }
    }
}

/// Capability for running untrusted source text exactly once.
///
/// Implementations own the whole lifecycle of their execution context:
/// it is created before the file is written and destroyed after the result
/// is read back, on every exit path. `Err` is reserved for faults in the
/// sandbox itself (could not create, launch, or tear down) and must never
/// be used for a program that merely failed.
#[async_trait]
pub trait SandboxProvider: Send + Sync {
    /// Writes `source` to `relative_path` inside a fresh sandbox and runs it
    /// with the interpreter mapped from the path's extension.
    async fn execute(&self, source: &str, relative_path: &Path) -> Result<ExecutionOutcome>;

    /// Runs `source` as the default file for `language` (`code.<ext>`).
    async fn run_isolated(&self, source: &str, language: Language) -> Result<ExecutionOutcome> {
        let path = PathBuf::from(language.output_filename());
        self.execute(source, &path).await
    }

    /// Returns the name of this backend.
    fn name(&self) -> &str;
}
