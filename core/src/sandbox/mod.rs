//! Sandbox module for running generated code in a disposable context.
//!
//! This module provides the [`SandboxProvider`] trait for executing a single
//! source file in isolation and the [`NamespaceSandbox`] implementation that
//! uses an unprivileged user/mount namespace rooted at a throwaway directory.

mod namespace;
mod provider;

pub use namespace::{Isolation, NamespaceSandbox, SandboxRoot};
pub use provider::{ExecutionOutcome, SandboxProvider};
