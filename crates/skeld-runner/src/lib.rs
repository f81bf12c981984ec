//! Language-model decision provider for the Skeld simulation.
//!
//! Turns the game's decision requests into chat-completion calls and hands
//! the reply text back without ever blocking a tick.
//!
//! # Architecture
//!
//! ```text
//! DecisionRequest --> Prompt Engine --> LLM Backend --> PendingReply
//! ```
//!
//! # Modules
//!
//! - [`config`] -- Environment configuration (`LLM_*`, `TEMPLATES_DIR`).
//! - [`error`] -- Runner error type.
//! - [`llm`] -- OpenAI-compatible and Anthropic HTTP backends.
//! - [`prompt`] -- `minijinja` prompt templates.
//! - [`provider`] -- [`LlmDecisionProvider`], the spawned, deadline-bound
//!   call pipeline.
//!
//! [`LlmDecisionProvider`]: provider::LlmDecisionProvider

pub mod config;
pub mod error;
pub mod llm;
pub mod prompt;
pub mod provider;
