//! Configuration for the assistant.
//!
//! Settings come from an optional TOML file; every field has a default so an
//! empty or missing file yields a working configuration. The only value read
//! from the environment is the generation service credential.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::sandbox::{Isolation, NamespaceSandbox};

/// Config file picked up from the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "sandycode.toml";

/// Fixed number of generate-and-execute rounds per workflow phase.
pub const MAX_ATTEMPTS: u32 = 5;

/// Settings for the generation service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Model identifier sent with each request.
    #[serde(default = "default_model")]
    pub model: String,
    /// Upper bound on output tokens per request.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Messages endpoint.
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Value of the `anthropic-version` header.
    #[serde(default = "default_api_version")]
    pub api_version: String,
    /// Environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
}

fn default_model() -> String {
    "claude-3-opus-20240229".to_string()
}

fn default_max_tokens() -> u32 {
    1024
}

fn default_api_url() -> String {
    "https://api.anthropic.com/v1/messages".to_string()
}

fn default_api_version() -> String {
    "2023-06-01".to_string()
}

fn default_api_key_env() -> String {
    "ANTHROPIC_API_KEY".to_string()
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            max_tokens: default_max_tokens(),
            api_url: default_api_url(),
            api_version: default_api_version(),
            api_key_env: default_api_key_env(),
        }
    }
}

/// Settings for the retry loops.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowConfig {
    /// Rounds allowed before a phase aborts.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

fn default_max_attempts() -> u32 {
    MAX_ATTEMPTS
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
        }
    }
}

/// Settings for the execution sandbox.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SandboxConfig {
    /// Disposable root directory, created and removed per execution.
    #[serde(default = "NamespaceSandbox::default_root")]
    pub root: PathBuf,
    /// Isolation mode.
    #[serde(default)]
    pub isolation: Isolation,
    /// Per-execution timeout in seconds. Unset means no limit.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            root: NamespaceSandbox::default_root(),
            isolation: Isolation::default(),
            timeout_secs: None,
        }
    }
}

impl SandboxConfig {
    /// Returns the execution timeout as a Duration.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    /// Builds the sandbox these settings describe.
    pub fn build(&self) -> NamespaceSandbox {
        NamespaceSandbox::new(self.root.clone())
            .with_isolation(self.isolation)
            .with_timeout(self.timeout())
    }
}

/// Settings for the project snapshot used in modify mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Directory names skipped during the walk.
    #[serde(default = "default_excluded_dirs")]
    pub excluded_dirs: Vec<String>,
    /// File names skipped during the walk.
    #[serde(default = "default_excluded_files")]
    pub excluded_files: Vec<String>,
}

fn default_excluded_dirs() -> Vec<String> {
    ["node_modules", ".git", "__pycache__", ".venv", "venv"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_excluded_files() -> Vec<String> {
    [
        "package.json",
        "package-lock.json",
        "npm-shrinkwrap.json",
        "yarn.lock",
        "pnpm-lock.yaml",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            excluded_dirs: default_excluded_dirs(),
            excluded_files: default_excluded_files(),
        }
    }
}

/// Complete assistant configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub generator: GeneratorConfig,
    #[serde(default)]
    pub workflow: WorkflowConfig,
    #[serde(default)]
    pub sandbox: SandboxConfig,
    #[serde(default)]
    pub project: ProjectConfig,
}

impl Config {
    /// Parses a configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| Error::Config(format!("invalid config: {}", e)))
    }

    /// Loads configuration.
    ///
    /// An explicit `path` must exist. Without one, [`DEFAULT_CONFIG_FILE`] in
    /// `dir` is used if present, otherwise defaults.
    pub fn load(path: Option<&Path>, dir: &Path) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => {
                let candidate = dir.join(DEFAULT_CONFIG_FILE);
                if !candidate.is_file() {
                    tracing::debug!("no config file found, using defaults");
                    return Ok(Self::default());
                }
                candidate
            }
        };

        let text = std::fs::read_to_string(&path).map_err(|e| {
            Error::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        tracing::info!(path = ?path, "loaded config file");
        Self::from_toml_str(&text)
    }

    /// Reads the API key from the configured environment variable.
    pub fn api_key(&self) -> Result<String> {
        let name = &self.generator.api_key_env;
        match std::env::var(name) {
            Ok(value) if !value.trim().is_empty() => Ok(value),
            _ => Err(Error::MissingCredential(name.clone())),
        }
    }
}

/// Validation result containing all found issues.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    /// List of validation errors (fatal).
    pub errors: Vec<String>,
    /// List of validation warnings (non-fatal).
    pub warnings: Vec<String>,
}

impl ValidationResult {
    /// Returns true if validation passed (no errors).
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Adds an error to the result.
    pub fn add_error(&mut self, msg: impl Into<String>) {
        self.errors.push(msg.into());
    }

    /// Adds a warning to the result.
    pub fn add_warning(&mut self, msg: impl Into<String>) {
        self.warnings.push(msg.into());
    }

    /// Merges another validation result into this one.
    pub fn merge(&mut self, other: ValidationResult) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }

    /// Converts to a Result, failing if there are errors.
    pub fn into_result(self) -> Result<Vec<String>> {
        if self.is_valid() {
            Ok(self.warnings)
        } else {
            Err(Error::Config(self.errors.join("; ")))
        }
    }
}

/// Trait for validatable configuration types.
pub trait Validate {
    /// Validates the configuration and returns any issues found.
    fn validate(&self) -> ValidationResult;
}

impl Validate for GeneratorConfig {
    fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        if self.model.trim().is_empty() {
            result.add_error("generator.model cannot be empty");
        }
        if self.max_tokens == 0 {
            result.add_error("generator.max_tokens must be greater than 0");
        }
        if !self.api_url.starts_with("https://") && !self.api_url.starts_with("http://") {
            result.add_error(format!("generator.api_url '{}' is not an HTTP URL", self.api_url));
        } else if self.api_url.starts_with("http://") {
            result.add_warning("generator.api_url uses plain HTTP; the API key is sent in clear text");
        }
        if self.api_key_env.trim().is_empty() {
            result.add_error("generator.api_key_env cannot be empty");
        }

        result
    }
}

impl Validate for WorkflowConfig {
    fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        if self.max_attempts == 0 {
            result.add_error("workflow.max_attempts must be at least 1");
        }
        if self.max_attempts > 20 {
            result.add_warning(format!(
                "workflow.max_attempts of {} may spend many generation requests",
                self.max_attempts
            ));
        }

        result
    }
}

impl Validate for SandboxConfig {
    fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        if !self.root.is_absolute() {
            result.add_error(format!(
                "sandbox.root '{}' must be an absolute path",
                self.root.display()
            ));
        } else if let Some(reason) = unsafe_root_reason(&self.root, &protected_dirs()) {
            result.add_error(format!(
                "sandbox.root '{}' is removed after every run and {}",
                self.root.display(),
                reason
            ));
        }
        if self.timeout_secs == Some(0) {
            result.add_error("sandbox.timeout_secs must be greater than 0 when set");
        }
        if self.isolation == Isolation::None {
            result.add_warning("sandbox.isolation is 'none'; generated code runs unisolated");
        }

        result
    }
}

/// Directories the sandbox root must never contain or equal.
fn protected_dirs() -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    if let Ok(cwd) = std::env::current_dir() {
        dirs.push(cwd);
    }
    if let Some(home) = std::env::var_os("HOME") {
        dirs.push(PathBuf::from(home));
    }
    dirs
}

/// Explains why removing `root` would destroy data the user cares about.
fn unsafe_root_reason(root: &Path, protected: &[PathBuf]) -> Option<String> {
    if root.parent().is_none() {
        return Some("must not be the filesystem root".to_string());
    }
    if root == std::env::temp_dir() {
        return Some("must not be the system temp directory itself".to_string());
    }
    protected
        .iter()
        .find(|dir| dir.starts_with(root))
        .map(|dir| format!("would delete {}", dir.display()))
}

impl Validate for Config {
    fn validate(&self) -> ValidationResult {
        let mut result = self.generator.validate();
        result.merge(self.workflow.validate());
        result.merge(self.sandbox.validate());
        result
    }
}
