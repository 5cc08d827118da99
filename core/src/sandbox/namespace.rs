//! Namespace-based sandbox implementation.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::process::Command;

use crate::error::{Error, Result};
use crate::language::Language;
use crate::patch::validate_relative_path;

use super::provider::{ExecutionOutcome, SandboxProvider};

/// Binary used to enter a fresh user and mount namespace.
const UNSHARE: &str = "unshare";

/// How the interpreter is isolated from the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Isolation {
    /// Run under `unshare --user --map-root-user --mount`.
    #[default]
    Namespace,
    /// Run the interpreter as a plain child process in the sandbox root.
    None,
}

/// A disposable directory that holds one execution.
///
/// Removal happens in [`SandboxRoot::cleanup`]; if that is never reached
/// the directory is removed on drop.
pub struct SandboxRoot {
    path: PathBuf,
    cleaned_up: bool,
}

impl SandboxRoot {
    /// Creates the root directory if it does not exist yet.
    pub fn create(path: &Path) -> Result<Self> {
        std::fs::create_dir_all(path).map_err(|e| {
            Error::SandboxCreation(format!("cannot create {}: {}", path.display(), e))
        })?;

        tracing::debug!(path = ?path, "created sandbox root");

        Ok(Self {
            path: path.to_path_buf(),
            cleaned_up: false,
        })
    }

    /// Returns the root directory.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Removes the root and everything under it.
    pub fn cleanup(&mut self) -> Result<()> {
        if self.cleaned_up {
            return Ok(());
        }

        match std::fs::remove_dir_all(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(Error::SandboxCleanup {
                    path: self.path.clone(),
                    reason: e.to_string(),
                });
            }
        }

        tracing::debug!(path = ?self.path, "removed sandbox root");
        self.cleaned_up = true;
        Ok(())
    }
}

impl Drop for SandboxRoot {
    fn drop(&mut self) {
        if !self.cleaned_up {
            if let Err(e) = self.cleanup() {
                tracing::error!(error = %e, path = ?self.path, "failed to cleanup sandbox on drop");
            }
        }
    }
}

/// Sandbox that runs each file in a throwaway directory, optionally inside
/// an unprivileged user/mount namespace.
#[derive(Debug, Clone)]
pub struct NamespaceSandbox {
    /// Disposable root, created per execution and removed afterwards.
    root: PathBuf,
    isolation: Isolation,
    /// Upper bound on a single run. `None` waits for the interpreter indefinitely.
    timeout: Option<Duration>,
}

impl NamespaceSandbox {
    /// Creates a namespace sandbox rooted at `root`.
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            isolation: Isolation::Namespace,
            timeout: None,
        }
    }

    /// Returns the default disposable root under the system temp directory.
    pub fn default_root() -> PathBuf {
        std::env::temp_dir().join("chroot-sandycode")
    }

    /// Sets the isolation mode.
    pub fn with_isolation(mut self, isolation: Isolation) -> Self {
        self.isolation = isolation;
        self
    }

    /// Sets a timeout for each execution.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns the disposable root path.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Builds the command that runs `relative_path` from inside the root.
    fn build_command(&self, language: Language, relative_path: &Path, root: &Path) -> Command {
        let mut command = match self.isolation {
            Isolation::Namespace => {
                let mut command = Command::new(UNSHARE);
                command
                    .args(["--user", "--map-root-user", "--mount", "--"])
                    .arg(language.interpreter());
                command
            }
            Isolation::None => Command::new(language.interpreter()),
        };

        command
            .arg(relative_path)
            .current_dir(root)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        command
    }

    async fn run(
        &self,
        root: &SandboxRoot,
        source: &str,
        relative_path: &Path,
        language: Language,
    ) -> Result<ExecutionOutcome> {
        let file_path = root.path().join(relative_path);
        if let Some(parent) = file_path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                Error::SandboxCreation(format!("cannot create {}: {}", parent.display(), e))
            })?;
        }
        tokio::fs::write(&file_path, source).await.map_err(|e| {
            Error::SandboxCreation(format!("cannot write {}: {}", file_path.display(), e))
        })?;

        let mut command = self.build_command(language, relative_path, root.path());

        tracing::info!(
            path = ?relative_path,
            interpreter = language.interpreter(),
            isolation = ?self.isolation,
            "executing in sandbox"
        );

        let child = command.spawn().map_err(|e| {
            Error::SandboxCreation(format!(
                "failed to launch {}: {}",
                self.launcher(language),
                e
            ))
        })?;

        let output = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, child.wait_with_output()).await {
                Ok(output) => output,
                Err(_) => {
                    tracing::warn!(path = ?relative_path, ?limit, "sandbox execution timed out");
                    return Ok(ExecutionOutcome::Failure(format!(
                        "execution timed out after {:.1}s",
                        limit.as_secs_f64()
                    )));
                }
            },
            None => child.wait_with_output().await,
        }
        .map_err(|e| Error::SandboxCreation(format!("failed to wait for interpreter: {}", e)))?;

        if output.status.success() {
            return Ok(ExecutionOutcome::Success);
        }

        // A non-zero exit is either the program failing or the namespace
        // wrapper never getting as far as the interpreter. Tell them apart
        // by running the bare interpreter under the same wrapper.
        if self.isolation == Isolation::Namespace {
            self.preflight(language, root.path()).await?;
        }

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        if stderr.is_empty() {
            return Ok(ExecutionOutcome::Failure(format!(
                "process exited with {}",
                output.status
            )));
        }

        Ok(ExecutionOutcome::Failure(stderr))
    }

    /// Builds `unshare ... -- <interp> --version`, which exercises the
    /// namespace setup and the interpreter without any user code.
    fn build_preflight(&self, language: Language, root: &Path) -> Command {
        let mut command = Command::new(UNSHARE);
        command
            .args(["--user", "--map-root-user", "--mount", "--"])
            .arg(language.interpreter())
            .arg("--version")
            .current_dir(root)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        command
    }

    /// Checks that the namespace wrapper can launch the interpreter.
    ///
    /// Only a failure here is a sandbox fault; the user program's exit
    /// status and output never are.
    async fn preflight(&self, language: Language, root: &Path) -> Result<()> {
        let output = self
            .build_preflight(language, root)
            .output()
            .await
            .map_err(|e| Error::SandboxCreation(format!("failed to launch {}: {}", UNSHARE, e)))?;

        if output.status.success() {
            tracing::debug!(interpreter = language.interpreter(), "namespace preflight passed");
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        tracing::warn!(interpreter = language.interpreter(), %stderr, "namespace preflight failed");
        Err(Error::SandboxCreation(if stderr.is_empty() {
            format!(
                "{} {} exited with {}",
                UNSHARE,
                language.interpreter(),
                output.status
            )
        } else {
            stderr
        }))
    }

    fn launcher(&self, language: Language) -> &'static str {
        match self.isolation {
            Isolation::Namespace => UNSHARE,
            Isolation::None => language.interpreter(),
        }
    }
}

#[async_trait]
impl SandboxProvider for NamespaceSandbox {
    async fn execute(&self, source: &str, relative_path: &Path) -> Result<ExecutionOutcome> {
        let language = Language::from_path(relative_path)?;
        validate_relative_path(relative_path)?;

        let mut root = SandboxRoot::create(&self.root)?;
        let result = self.run(&root, source, relative_path, language).await;
        let cleanup = root.cleanup();

        match (result, cleanup) {
            (Ok(outcome), Ok(())) => Ok(outcome),
            (Ok(_), Err(e)) => Err(e),
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(cleanup_err)) => {
                tracing::error!(error = %cleanup_err, "sandbox cleanup failed after execution error");
                Err(e)
            }
        }
    }

    fn name(&self) -> &str {
        match self.isolation {
            Isolation::Namespace => "namespace",
            Isolation::None => "process",
        }
    }
}
