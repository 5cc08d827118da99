//! Code generation clients.
//!
//! A [`CodeGenerator`] turns one instruction into generated text with a
//! single request. Retrying is the caller's job.

mod anthropic;

pub use anthropic::AnthropicClient;

use async_trait::async_trait;

use crate::error::Result;
use crate::language::Language;

/// One instruction for the generation service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    /// Full instruction text sent as the single user message.
    pub instruction: String,
    /// Language the output is expected to be in, if any.
    pub language: Option<Language>,
    /// Upper bound on output tokens. `None` uses the client's default.
    pub max_tokens: Option<u32>,
}

impl GenerationRequest {
    /// Creates a request with the given instruction.
    pub fn new(instruction: impl Into<String>) -> Self {
        Self {
            instruction: instruction.into(),
            language: None,
            max_tokens: None,
        }
    }

    /// Tags the request with a target language.
    pub fn with_language(mut self, language: Language) -> Self {
        self.language = Some(language);
        self
    }

    /// Overrides the output size bound.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// Trait for text-generation backends.
#[async_trait]
pub trait CodeGenerator: Send + Sync {
    /// Sends exactly one request and returns the generated text.
    ///
    /// Fails with [`crate::Error::Generation`] on transport errors,
    /// unexpected response shapes, or non-text content.
    async fn generate(&self, request: &GenerationRequest) -> Result<String>;

    /// Returns the name of this generator.
    fn name(&self) -> &str;
}
