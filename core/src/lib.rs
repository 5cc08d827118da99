//! Sandycode - generate code, run it in a disposable sandbox, iterate
//!
//! This library provides the generate → execute → retry/feedback loops behind
//! the `sandycode` CLI, the sandbox that runs generated code in isolation, and
//! the multi-file patch format used to modify existing projects.

pub mod config;
pub mod error;
pub mod generator;
pub mod language;
pub mod patch;
pub mod project;
pub mod prompt;
pub mod sandbox;
pub mod workflow;

pub use config::{Config, Validate, ValidationResult, MAX_ATTEMPTS};
pub use error::{Error, Result};
pub use generator::{AnthropicClient, CodeGenerator, GenerationRequest};
pub use language::Language;
pub use patch::{FilePatch, PatchSet};
pub use project::{ProjectSnapshot, ProjectWalker, SnapshotEntry};
pub use sandbox::{ExecutionOutcome, Isolation, NamespaceSandbox, SandboxProvider};
pub use workflow::{
    Mode, ModifyOutcome, ModifyWorkflow, NewCodeOutcome, NewCodeWorkflow, StdTerminal, Terminal,
};
