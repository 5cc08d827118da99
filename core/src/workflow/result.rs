//! Workflow outcome types.

use std::path::PathBuf;

/// How a new-code session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NewCodeOutcome {
    /// The user typed "done"; the code was written to `path`.
    Accepted {
        path: PathBuf,
        /// Rounds used to get the first working version.
        attempts: u32,
        /// Feedback requests processed after that.
        feedback_rounds: u32,
    },
    /// No working code within the attempt budget. Nothing was written.
    Aborted { attempts: u32 },
    /// The user typed "exit" or input ended. Nothing was written.
    Exited,
}

/// How a modify session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModifyOutcome {
    /// Every patch of a round ran cleanly and was written to disk.
    Applied { files: Vec<PathBuf>, attempts: u32 },
    /// The generator answered with no file blocks. Nothing was written.
    NoChangesProposed { attempts: u32 },
    /// No clean round within the attempt budget. Nothing was written.
    Aborted { attempts: u32 },
    /// Input ended before a request was given. Nothing was written.
    Exited,
}

impl NewCodeOutcome {
    /// Returns true unless the attempt budget ran out.
    pub fn is_success(&self) -> bool {
        !matches!(self, NewCodeOutcome::Aborted { .. })
    }
}

impl ModifyOutcome {
    /// Returns true unless the attempt budget ran out.
    pub fn is_success(&self) -> bool {
        !matches!(self, ModifyOutcome::Aborted { .. })
    }
}
