//! Error types for the language-model runner.
//!
//! Uses `thiserror` for typed errors that surface through the provider
//! pipeline: environment configuration, prompt rendering, and LLM calls.

/// Errors that can occur while configuring or calling a language model.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// Failed to render a prompt template.
    #[error("template render error: {0}")]
    Template(String),

    /// An LLM backend returned an error or was unreachable.
    #[error("LLM backend error: {0}")]
    LlmBackend(String),

    /// The call did not finish before its deadline.
    #[error("timeout: decision call exceeded {0}ms")]
    Timeout(u64),

    /// Configuration is invalid or missing.
    #[error("config error: {0}")]
    Config(String),

    /// Serialization or deserialization failure.
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),
}
