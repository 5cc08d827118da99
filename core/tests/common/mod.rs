//! Scripted doubles for workflow tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use sandycode::generator::{CodeGenerator, GenerationRequest};
use sandycode::sandbox::{ExecutionOutcome, SandboxProvider};
use sandycode::workflow::Terminal;
use sandycode::{Error, Result};

/// Generator that replays canned responses and records every request.
#[derive(Clone, Default)]
pub struct ScriptedGenerator {
    responses: Arc<Mutex<VecDeque<std::result::Result<String, String>>>>,
    requests: Arc<Mutex<Vec<GenerationRequest>>>,
}

impl ScriptedGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a successful response.
    pub fn respond(self, text: &str) -> Self {
        self.responses.lock().unwrap().push_back(Ok(text.to_string()));
        self
    }

    /// Queues a generation failure.
    pub fn fail(self, reason: &str) -> Self {
        self.responses
            .lock()
            .unwrap()
            .push_back(Err(reason.to_string()));
        self
    }

    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl CodeGenerator for ScriptedGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        self.requests.lock().unwrap().push(request.clone());
        match self.responses.lock().unwrap().pop_front() {
            Some(Ok(text)) => Ok(text),
            Some(Err(reason)) => Err(Error::Generation(reason)),
            None => Err(Error::Generation("no scripted response left".to_string())),
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// One recorded sandbox execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Execution {
    pub path: PathBuf,
    pub source: String,
}

/// Sandbox that replays canned outcomes and records every execution.
#[derive(Clone, Default)]
pub struct ScriptedSandbox {
    outcomes: Arc<Mutex<VecDeque<std::result::Result<ExecutionOutcome, String>>>>,
    executions: Arc<Mutex<Vec<Execution>>>,
}

impl ScriptedSandbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn succeed(self) -> Self {
        self.outcomes
            .lock()
            .unwrap()
            .push_back(Ok(ExecutionOutcome::Success));
        self
    }

    pub fn fail(self, diagnostic: &str) -> Self {
        self.outcomes
            .lock()
            .unwrap()
            .push_back(Ok(ExecutionOutcome::Failure(diagnostic.to_string())));
        self
    }

    /// Queues a fault in the sandbox itself.
    pub fn fault(self, reason: &str) -> Self {
        self.outcomes
            .lock()
            .unwrap()
            .push_back(Err(reason.to_string()));
        self
    }

    pub fn executions(&self) -> Vec<Execution> {
        self.executions.lock().unwrap().clone()
    }
}

#[async_trait]
impl SandboxProvider for ScriptedSandbox {
    async fn execute(&self, source: &str, relative_path: &Path) -> Result<ExecutionOutcome> {
        // Mirror the real sandbox's contract for unknown extensions.
        sandycode::Language::from_path(relative_path)?;

        self.executions.lock().unwrap().push(Execution {
            path: relative_path.to_path_buf(),
            source: source.to_string(),
        });
        match self.outcomes.lock().unwrap().pop_front() {
            Some(Ok(outcome)) => Ok(outcome),
            Some(Err(reason)) => Err(Error::SandboxCreation(reason)),
            None => Err(Error::SandboxCreation("no scripted outcome left".to_string())),
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Terminal fed from a fixed list of answers. Runs out like a closed stdin.
#[derive(Default)]
pub struct ScriptedTerminal {
    answers: VecDeque<String>,
    pub questions: Vec<String>,
    pub transcript: Vec<String>,
}

impl ScriptedTerminal {
    pub fn new(answers: &[&str]) -> Self {
        Self {
            answers: answers.iter().map(|a| a.to_string()).collect(),
            ..Default::default()
        }
    }

    pub fn said(&self, needle: &str) -> bool {
        self.transcript.iter().any(|line| line.contains(needle))
    }
}

#[async_trait]
impl Terminal for ScriptedTerminal {
    async fn ask(&mut self, question: &str) -> Result<Option<String>> {
        self.questions.push(question.to_string());
        Ok(self.answers.pop_front())
    }

    fn say(&mut self, message: &str) {
        self.transcript.push(message.to_string());
    }
}

/// Lists every file under `root`, relative, sorted.
pub fn list_files(root: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.path().strip_prefix(root).unwrap().to_path_buf())
        .collect();
    files.sort();
    files
}
