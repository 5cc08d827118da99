//! Interactive workflows.
//!
//! Two modes drive the generator and the sandbox:
//! - New: generate one script, retry until it runs, then refine on feedback
//! - Modify: patch several files of an existing project in one pass

mod modify;
mod new_code;
mod result;
mod terminal;

pub use modify::ModifyWorkflow;
pub use new_code::NewCodeWorkflow;
pub use result::{ModifyOutcome, NewCodeOutcome};
pub use terminal::{StdTerminal, Terminal};

use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Top-level workflow selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    New,
    Modify,
}

impl FromStr for Mode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "new" => Ok(Mode::New),
            "modify" => Ok(Mode::Modify),
            _ => Err(Error::InvalidMode(s.to_string())),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::New => f.write_str("new"),
            Mode::Modify => f.write_str("modify"),
        }
    }
}
