//! Multi-file patch loop for existing projects.

use std::path::PathBuf;

use crate::config::MAX_ATTEMPTS;
use crate::error::{Error, Result};
use crate::generator::{CodeGenerator, GenerationRequest};
use crate::patch::PatchSet;
use crate::project::ProjectWalker;
use crate::prompt::ModifyPromptBuilder;
use crate::sandbox::{ExecutionOutcome, SandboxProvider};

use super::result::ModifyOutcome;
use super::terminal::Terminal;

/// A file that failed to run in a round, with its diagnostic.
type RoundFailure = (PathBuf, String);

/// Drives the "modify project" workflow.
///
/// Each round sends the whole project snapshot and the user's request in a
/// single generation call, runs every returned file in the sandbox, and
/// stops at the first failure. Files are only written after a round in
/// which every patch ran cleanly.
pub struct ModifyWorkflow<G: CodeGenerator, S: SandboxProvider> {
    generator: G,
    sandbox: S,
    project: ProjectWalker,
    max_attempts: u32,
}

impl<G: CodeGenerator, S: SandboxProvider> ModifyWorkflow<G, S> {
    /// Creates a workflow over the project walked by `project`.
    pub fn new(generator: G, sandbox: S, project: ProjectWalker) -> Self {
        Self {
            generator,
            sandbox,
            project,
            max_attempts: MAX_ATTEMPTS,
        }
    }

    /// Sets the number of rounds allowed.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Runs the workflow to completion.
    pub async fn run<T: Terminal>(&self, terminal: &mut T) -> Result<ModifyOutcome> {
        let root = self.project.root().to_path_buf();
        terminal.say(&format!(
            "📂 Using current directory as the project directory: {}",
            root.display()
        ));

        let snapshot = self.project.snapshot()?;
        if snapshot.is_empty() {
            terminal.say("⚠️ No .js, .py or .sh files found in the project.");
        }
        let rendered = snapshot.render();

        let Some(request) = terminal
            .ask("Please describe the modifications you want to make to the existing codebase using plain English")
            .await?
        else {
            return Ok(ModifyOutcome::Exited);
        };

        tracing::info!(
            files = snapshot.entries().len(),
            max_attempts = self.max_attempts,
            "starting modify workflow"
        );

        let mut previous_failure: Option<RoundFailure> = None;

        for attempt in 1..=self.max_attempts {
            let mut builder = ModifyPromptBuilder::new(request.as_str(), rendered.as_str());
            if let Some((path, error)) = &previous_failure {
                builder = builder.with_previous_failure(path, error.as_str());
            }

            let response = match self
                .generator
                .generate(&GenerationRequest::new(builder.build()))
                .await
            {
                Ok(response) => response,
                Err(e) => {
                    tracing::warn!(attempt, error = %e, "generation failed");
                    terminal.say(&format!("❌ Generation failed\nError details: {}", e));
                    continue;
                }
            };

            let patches = match PatchSet::parse(&response) {
                Ok(patches) => patches,
                Err(e @ (Error::MalformedPatchResponse(_) | Error::InvalidPatchPath(_))) => {
                    tracing::warn!(attempt, error = %e, "unusable patch response");
                    terminal.say(&format!(
                        "❌ Could not read the modified files (attempt {})\nError details: {}",
                        attempt, e
                    ));
                    continue;
                }
                Err(e) => return Err(e),
            };

            if patches.is_empty() {
                terminal.say("ℹ️ No changes were proposed; nothing was modified.");
                return Ok(ModifyOutcome::NoChangesProposed { attempts: attempt });
            }

            match self.execute_round(terminal, &patches).await? {
                None => {
                    let files = patches.apply(&root)?;
                    tracing::info!(attempt, files = files.len(), "applied patches");
                    terminal.say("✅ Modified files updated successfully!");
                    return Ok(ModifyOutcome::Applied {
                        files,
                        attempts: attempt,
                    });
                }
                Some(failure) => previous_failure = Some(failure),
            }
        }

        terminal.say("❌ Failed to generate working modified code after maximum attempts.");
        Ok(ModifyOutcome::Aborted {
            attempts: self.max_attempts,
        })
    }

    /// Runs each patch in order, stopping at the first failure.
    ///
    /// Patches for files with no known interpreter are not run.
    async fn execute_round<T: Terminal>(
        &self,
        terminal: &mut T,
        patches: &PatchSet,
    ) -> Result<Option<RoundFailure>> {
        for patch in patches {
            terminal.say(&format!(
                "✨ Modified code for {}:\n{}",
                patch.path.display(),
                patch.content
            ));

            let outcome = match self.sandbox.execute(&patch.content, &patch.path).await {
                Ok(outcome) => outcome,
                Err(Error::UnsupportedLanguage(_)) => {
                    tracing::info!(path = ?patch.path, "no interpreter for patched file, not executed");
                    terminal.say(&format!(
                        "⚠️ {} has no supported interpreter; it was not executed",
                        patch.path.display()
                    ));
                    continue;
                }
                Err(e) => return Err(e),
            };

            if let ExecutionOutcome::Failure(diagnostic) = outcome {
                tracing::warn!(path = ?patch.path, "patched file failed to run");
                terminal.say(&format!(
                    "❌ Execution failed for {}\nError details: {}",
                    patch.path.display(),
                    diagnostic
                ));
                return Ok(Some((patch.path.clone(), diagnostic)));
            }
        }

        Ok(None)
    }
}
