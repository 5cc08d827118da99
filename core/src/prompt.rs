//! Instruction text for generation requests.

use std::path::{Path, PathBuf};

use crate::language::Language;
use crate::patch::delimiter_line;

/// Appended to every single-file instruction after the first.
const CODE_ONLY: &str =
    "Only return the updated code without any explanations or introductory sentences.";

/// Instruction for a brand new script.
pub fn new_code(language: Language, task: &str) -> String {
    format!(
        "Write a {} script to {}. Return only the code without any formatting or explanations.",
        language, task
    )
}

/// Instruction for a new script after the previous round failed to run.
pub fn new_code_retry(language: Language, task: &str, previous_error: &str) -> String {
    format!(
        "{}\n\nA previous attempt failed with the following error:\n{}\n\nMake sure the new code avoids it.",
        new_code(language, task),
        previous_error
    )
}

/// Instruction to refine working code according to user feedback.
pub fn refine(language: Language, feedback: &str, code: &str) -> String {
    format!(
        "Refine the following {} code based on this feedback: {}\n\n{}\n\n{}",
        language, feedback, code, CODE_ONLY
    )
}

/// Instruction to repair refined code that failed to run.
pub fn fix(error: &str, feedback: &str, code: &str) -> String {
    format!(
        "The previous code attempt failed with the following error:\n{}\n\nPlease fix the code based on the error and the original feedback: {}\n\n{}\n\n{}",
        error, feedback, code, CODE_ONLY
    )
}

/// Builder for project modification instructions.
pub struct ModifyPromptBuilder {
    request: String,
    snapshot: String,
    previous_failure: Option<(PathBuf, String)>,
}

impl ModifyPromptBuilder {
    /// Creates a builder for `request` against a rendered project snapshot.
    pub fn new(request: impl Into<String>, snapshot: impl Into<String>) -> Self {
        Self {
            request: request.into(),
            snapshot: snapshot.into(),
            previous_failure: None,
        }
    }

    /// Records the file and diagnostic that failed in the previous round.
    pub fn with_previous_failure(mut self, path: &Path, error: impl Into<String>) -> Self {
        self.previous_failure = Some((path.to_path_buf(), error.into()));
        self
    }

    /// Builds the prompt.
    pub fn build(&self) -> String {
        let mut prompt = String::new();

        prompt.push_str(
            "Analyze the following codebase and make the necessary modifications based on this request: ",
        );
        prompt.push_str(&self.request);
        prompt.push_str("\n\n");
        prompt.push_str(&self.snapshot);
        prompt.push_str("\n\n");

        if let Some((path, error)) = &self.previous_failure {
            prompt.push_str("A previous attempt changed ");
            prompt.push_str(&path.display().to_string());
            prompt.push_str(" but running it failed with the following error:\n");
            prompt.push_str(error);
            prompt.push_str("\n\n");
        }

        prompt.push_str(
            "Determine the files and code sections that need to be modified to fulfill the request. \
             Only modify the code in the affected files and sections. \
             For each modified file, return the updated code wrapped in a code block with the file path as follows:\n\n",
        );
        prompt.push_str(&delimiter_line(Path::new("path/to/file.js")));
        prompt.push_str("\nmodified code here\n\n");
        prompt.push_str(
            "Do not include any explanations, comments, or statements other than the modified code. \
             If no changes are needed in a file, do not include it in the response. \
             Preserve the original code structure and only make the necessary modifications.",
        );

        prompt
    }
}
