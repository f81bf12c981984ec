//! Configuration types for the language-model runner.
//!
//! All configuration is loaded from environment variables; nothing about the
//! model lives in `skeld-config.yaml`. When `LLM_BACKEND` is unset the runner
//! is simply not configured and the game plays offline.

use std::time::Duration;

use crate::error::RunnerError;

/// Parallel calls allowed when `LLM_MAX_CONCURRENT_CALLS` is unset.
const DEFAULT_MAX_CONCURRENT_CALLS: usize = 4;

/// Complete runner configuration loaded from the environment.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// LLM backend configuration.
    pub backend: LlmBackendConfig,
    /// Deadline for one call, queueing included.
    pub decision_timeout: Duration,
    /// Maximum number of concurrent LLM calls.
    pub max_concurrent_calls: usize,
    /// Directory with template overrides; built-in templates when `None`.
    pub templates_dir: Option<String>,
    /// Play style appended to every system prompt.
    pub personality: Personality,
}

/// Configuration for a single LLM backend.
#[derive(Debug, Clone)]
pub struct LlmBackendConfig {
    /// The backend type.
    pub backend_type: BackendType,
    /// Base API URL (e.g. `https://api.openai.com/v1`).
    pub api_url: String,
    /// API key for authentication.
    pub api_key: String,
    /// Model identifier.
    pub model: String,
}

/// Supported LLM backend types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendType {
    /// `OpenAI`-compatible chat completions (`OpenAI`, `OpenRouter`, Groq,
    /// `DeepSeek`, Ollama).
    OpenAi,
    /// Anthropic Messages API (different request format).
    Anthropic,
}

/// Play-style preset for every agent the model speaks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Personality {
    /// Tactical and efficient.
    Pro,
    /// Sound but basic reasoning.
    #[default]
    Average,
    /// Dramatic, chaotic, full of theories.
    Interesting,
}

impl Personality {
    /// Parse a preset name.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "pro" => Some(Self::Pro),
            "average" => Some(Self::Average),
            "interesting" => Some(Self::Interesting),
            _ => None,
        }
    }

    /// Lowercase label.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pro => "pro",
            Self::Average => "average",
            Self::Interesting => "interesting",
        }
    }

    /// Paragraph appended to the system prompt.
    pub const fn instructions(self) -> &'static str {
        match self {
            Self::Pro => {
                "PERSONALITY: You are a professional, high-level Among Us player. You are \
                 tactical, track movement patterns, remember where people were, and deduce \
                 carefully. You stay objective and efficient."
            }
            Self::Average => {
                "PERSONALITY: You are an average Among Us player. Your logic is sound but \
                 basic. You don't overthink things."
            }
            Self::Interesting => {
                "PERSONALITY: You are a colorful, slightly chaotic Among Us player. Be \
                 dramatic, float odd theories, and bring up personal lore about the other \
                 crewmates. Make the game feel like a soap opera."
            }
        }
    }
}

impl RunnerConfig {
    /// Load configuration from environment variables.
    ///
    /// Returns `Ok(None)` when `LLM_BACKEND` is unset.
    ///
    /// Variables:
    /// - `LLM_BACKEND` -- `openai`, `openrouter`, `groq`, `deepseek`,
    ///   `ollama`, or `anthropic`
    /// - `LLM_API_URL` -- API base URL (defaults per backend)
    /// - `LLM_API_KEY` -- API key (optional for `ollama`)
    /// - `LLM_MODEL` -- model name
    /// - `LLM_TIMEOUT_MS` -- per-call deadline (default `default_timeout`)
    /// - `LLM_MAX_CONCURRENT_CALLS` -- max parallel calls (default 4)
    /// - `LLM_PERSONALITY` -- `pro`, `average` (default), or `interesting`
    /// - `TEMPLATES_DIR` -- directory with template overrides
    pub fn from_env(default_timeout: Duration) -> Result<Option<Self>, RunnerError> {
        Self::from_lookup(|name| std::env::var(name).ok(), default_timeout)
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
        default_timeout: Duration,
    ) -> Result<Option<Self>, RunnerError> {
        let Some(backend_str) = lookup("LLM_BACKEND").filter(|s| !s.trim().is_empty()) else {
            return Ok(None);
        };
        let backend_name = backend_str.trim().to_lowercase();
        let (backend_type, default_url) = match backend_name.as_str() {
            "openai" => (BackendType::OpenAi, "https://api.openai.com/v1"),
            "openrouter" => (BackendType::OpenAi, "https://openrouter.ai/api/v1"),
            "groq" => (BackendType::OpenAi, "https://api.groq.com/openai/v1"),
            "deepseek" => (BackendType::OpenAi, "https://api.deepseek.com/v1"),
            "ollama" => (BackendType::OpenAi, "http://localhost:11434/v1"),
            "anthropic" | "claude" => (BackendType::Anthropic, "https://api.anthropic.com/v1"),
            other => {
                return Err(RunnerError::Config(format!("unknown backend type: {other}")));
            }
        };

        let api_url = lookup("LLM_API_URL").unwrap_or_else(|| default_url.to_owned());
        let api_key = match lookup("LLM_API_KEY") {
            Some(key) => key,
            None if backend_name == "ollama" => String::new(),
            None => {
                return Err(RunnerError::Config(
                    "missing required env var LLM_API_KEY".to_owned(),
                ));
            }
        };
        let model = lookup("LLM_MODEL")
            .ok_or_else(|| RunnerError::Config("missing required env var LLM_MODEL".to_owned()))?;

        let decision_timeout = match lookup("LLM_TIMEOUT_MS") {
            Some(raw) => Duration::from_millis(
                raw.parse()
                    .map_err(|e| RunnerError::Config(format!("invalid LLM_TIMEOUT_MS: {e}")))?,
            ),
            None => default_timeout,
        };

        let max_concurrent_calls: usize = match lookup("LLM_MAX_CONCURRENT_CALLS") {
            Some(raw) => raw.parse().map_err(|e| {
                RunnerError::Config(format!("invalid LLM_MAX_CONCURRENT_CALLS: {e}"))
            })?,
            None => DEFAULT_MAX_CONCURRENT_CALLS,
        };
        if max_concurrent_calls == 0 {
            return Err(RunnerError::Config(
                "LLM_MAX_CONCURRENT_CALLS must be positive".to_owned(),
            ));
        }

        let personality = match lookup("LLM_PERSONALITY") {
            Some(raw) => Personality::parse(&raw)
                .ok_or_else(|| RunnerError::Config(format!("unknown personality preset: {raw}")))?,
            None => Personality::default(),
        };

        Ok(Some(Self {
            backend: LlmBackendConfig {
                backend_type,
                api_url,
                api_key,
                model,
            },
            decision_timeout,
            max_concurrent_calls,
            templates_dir: lookup("TEMPLATES_DIR").filter(|d| !d.is_empty()),
            personality,
        }))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<Option<RunnerConfig>, RunnerError> {
        let map: BTreeMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        RunnerConfig::from_lookup(|name| map.get(name).cloned(), Duration::from_millis(8000))
    }

    #[test]
    fn unset_backend_means_offline() {
        assert!(load(&[]).unwrap().is_none());
        assert!(load(&[("LLM_BACKEND", " ")]).unwrap().is_none());
    }

    #[test]
    fn openrouter_gets_its_default_url() {
        let config = load(&[
            ("LLM_BACKEND", "openrouter"),
            ("LLM_API_KEY", "k"),
            ("LLM_MODEL", "m"),
        ])
        .unwrap()
        .unwrap();
        assert_eq!(config.backend.backend_type, BackendType::OpenAi);
        assert_eq!(config.backend.api_url, "https://openrouter.ai/api/v1");
        assert_eq!(config.decision_timeout, Duration::from_millis(8000));
        assert_eq!(config.max_concurrent_calls, 4);
        assert_eq!(config.personality, Personality::Average);
        assert!(config.templates_dir.is_none());
    }

    #[test]
    fn overrides_are_applied() {
        let config = load(&[
            ("LLM_BACKEND", "Anthropic"),
            ("LLM_API_URL", "http://proxy/v1"),
            ("LLM_API_KEY", "k"),
            ("LLM_MODEL", "m"),
            ("LLM_TIMEOUT_MS", "2500"),
            ("LLM_MAX_CONCURRENT_CALLS", "8"),
            ("LLM_PERSONALITY", "interesting"),
            ("TEMPLATES_DIR", "prompts"),
        ])
        .unwrap()
        .unwrap();
        assert_eq!(config.backend.backend_type, BackendType::Anthropic);
        assert_eq!(config.backend.api_url, "http://proxy/v1");
        assert_eq!(config.decision_timeout, Duration::from_millis(2500));
        assert_eq!(config.max_concurrent_calls, 8);
        assert_eq!(config.personality, Personality::Interesting);
        assert_eq!(config.templates_dir.as_deref(), Some("prompts"));
    }

    #[test]
    fn ollama_needs_no_key() {
        let config = load(&[("LLM_BACKEND", "ollama"), ("LLM_MODEL", "llama3")])
            .unwrap()
            .unwrap();
        assert!(config.backend.api_key.is_empty());
    }

    #[test]
    fn bad_values_are_rejected() {
        assert!(load(&[("LLM_BACKEND", "gemini")]).is_err());
        assert!(load(&[("LLM_BACKEND", "openai"), ("LLM_MODEL", "m")]).is_err());
        assert!(
            load(&[
                ("LLM_BACKEND", "openai"),
                ("LLM_API_KEY", "k"),
                ("LLM_MODEL", "m"),
                ("LLM_MAX_CONCURRENT_CALLS", "0"),
            ])
            .is_err()
        );
        assert!(
            load(&[
                ("LLM_BACKEND", "openai"),
                ("LLM_API_KEY", "k"),
                ("LLM_MODEL", "m"),
                ("LLM_PERSONALITY", "grumpy"),
            ])
            .is_err()
        );
    }
}
