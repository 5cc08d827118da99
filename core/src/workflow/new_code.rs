//! Single-file generate, execute and feedback loop.

use std::path::PathBuf;

use crate::config::MAX_ATTEMPTS;
use crate::error::Result;
use crate::generator::{CodeGenerator, GenerationRequest};
use crate::language::Language;
use crate::prompt;
use crate::sandbox::{ExecutionOutcome, SandboxProvider};

use super::result::NewCodeOutcome;
use super::terminal::Terminal;

/// Drives the "new code" workflow.
///
/// Phase A asks for code until one version runs cleanly or the attempt
/// budget is spent. Phase B refines that code on user feedback until the
/// user types "done", then writes it to `code.<ext>` in the output directory.
pub struct NewCodeWorkflow<G: CodeGenerator, S: SandboxProvider> {
    generator: G,
    sandbox: S,
    output_dir: PathBuf,
    max_attempts: u32,
}

impl<G: CodeGenerator, S: SandboxProvider> NewCodeWorkflow<G, S> {
    /// Creates a workflow that writes its result into `output_dir`.
    pub fn new(generator: G, sandbox: S, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            generator,
            sandbox,
            output_dir: output_dir.into(),
            max_attempts: MAX_ATTEMPTS,
        }
    }

    /// Sets the number of rounds allowed in phase A.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Runs the workflow to completion.
    ///
    /// Returns `Err` for an unsupported language tag (before any generation
    /// request) and for sandbox faults. Failing code is never an error.
    pub async fn run<T: Terminal>(&self, terminal: &mut T) -> Result<NewCodeOutcome> {
        let Some(task) = terminal
            .ask("Please enter a programming task or type \"exit\" to quit")
            .await?
        else {
            return Ok(NewCodeOutcome::Exited);
        };
        if task.eq_ignore_ascii_case("exit") {
            terminal.say("👋 Goodbye!");
            return Ok(NewCodeOutcome::Exited);
        }

        let Some(tag) = terminal
            .ask("Please specify the programming language (js/py/sh)")
            .await?
        else {
            return Ok(NewCodeOutcome::Exited);
        };
        let language = Language::from_tag(&tag)?;

        tracing::info!(%language, max_attempts = self.max_attempts, "starting new-code workflow");

        let Some((mut code, attempts)) = self.converge(terminal, &task, language).await? else {
            terminal.say("❌ Failed to generate working code after maximum attempts.");
            return Ok(NewCodeOutcome::Aborted {
                attempts: self.max_attempts,
            });
        };

        let mut feedback_rounds = 0;
        loop {
            let Some(feedback) = terminal
                .ask("Please provide feedback on the code or type \"done\" if satisfied")
                .await?
            else {
                return Ok(NewCodeOutcome::Exited);
            };
            if feedback.eq_ignore_ascii_case("done") {
                terminal.say("✅ Code accepted.");
                break;
            }
            if feedback.is_empty() {
                continue;
            }

            feedback_rounds += 1;
            code = self
                .refine(terminal, language, &feedback, code, feedback_rounds)
                .await?;
        }

        let path = self.output_dir.join(language.output_filename());
        tokio::fs::write(&path, &code).await?;
        tracing::info!(path = ?path, attempts, feedback_rounds, "saved accepted code");
        terminal.say(&format!("📝 Code saved to {}", path.display()));

        Ok(NewCodeOutcome::Accepted {
            path,
            attempts,
            feedback_rounds,
        })
    }

    /// Phase A: returns the first code that runs cleanly and the round it
    /// took, or `None` once the budget is spent.
    async fn converge<T: Terminal>(
        &self,
        terminal: &mut T,
        task: &str,
        language: Language,
    ) -> Result<Option<(String, u32)>> {
        let mut last_error: Option<String> = None;

        for attempt in 1..=self.max_attempts {
            let instruction = match &last_error {
                Some(error) => prompt::new_code_retry(language, task, error),
                None => prompt::new_code(language, task),
            };
            let request = GenerationRequest::new(instruction).with_language(language);

            let code = match self.generator.generate(&request).await {
                Ok(code) => code,
                Err(e) => {
                    tracing::warn!(attempt, error = %e, "generation failed");
                    terminal.say(&format!("❌ Generation failed\nError details: {}", e));
                    continue;
                }
            };
            terminal.say(&format!("✨ Generated code (attempt {}):\n{}", attempt, code));

            match self.sandbox.run_isolated(&code, language).await? {
                ExecutionOutcome::Success => {
                    terminal.say("✅ Code executed successfully!");
                    return Ok(Some((code, attempt)));
                }
                ExecutionOutcome::Failure(diagnostic) => {
                    tracing::warn!(attempt, "generated code failed to run");
                    terminal.say(&format!(
                        "❌ Execution failed (attempt {})\nError details: {}",
                        attempt, diagnostic
                    ));
                    last_error = Some(diagnostic);
                }
            }
        }

        Ok(None)
    }

    /// Phase B, one round: refine on feedback, and if the result fails to
    /// run, ask once for a fix. Returns the newest code either way.
    async fn refine<T: Terminal>(
        &self,
        terminal: &mut T,
        language: Language,
        feedback: &str,
        code: String,
        round: u32,
    ) -> Result<String> {
        let request =
            GenerationRequest::new(prompt::refine(language, feedback, &code)).with_language(language);
        let refined = match self.generator.generate(&request).await {
            Ok(refined) => refined,
            Err(e) => {
                tracing::warn!(round, error = %e, "refinement failed");
                terminal.say(&format!(
                    "❌ Generation failed, keeping the current code\nError details: {}",
                    e
                ));
                return Ok(code);
            }
        };
        terminal.say(&format!(
            "✨ Updated code (feedback attempt {}):\n{}",
            round, refined
        ));

        let diagnostic = match self.sandbox.run_isolated(&refined, language).await? {
            ExecutionOutcome::Success => {
                terminal.say("✅ Code executed successfully!");
                return Ok(refined);
            }
            ExecutionOutcome::Failure(diagnostic) => diagnostic,
        };
        terminal.say(&format!(
            "❌ Execution failed (feedback attempt {})\nError details: {}",
            round, diagnostic
        ));

        let request = GenerationRequest::new(prompt::fix(&diagnostic, feedback, &refined))
            .with_language(language);
        let fixed = match self.generator.generate(&request).await {
            Ok(fixed) => fixed,
            Err(e) => {
                tracing::warn!(round, error = %e, "fix request failed");
                terminal.say(&format!("❌ Generation failed\nError details: {}", e));
                return Ok(refined);
            }
        };
        terminal.say(&format!(
            "✨ Updated code (feedback attempt {} - fix):\n{}",
            round, fixed
        ));

        match self.sandbox.run_isolated(&fixed, language).await? {
            ExecutionOutcome::Success => terminal.say("✅ Code executed successfully!"),
            ExecutionOutcome::Failure(diagnostic) => terminal.say(&format!(
                "❌ Execution failed (feedback attempt {} - fix)\nError details: {}",
                round, diagnostic
            )),
        }

        Ok(fixed)
    }
}
