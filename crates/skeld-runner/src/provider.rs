//! The language-model [`DecisionProvider`].
//!
//! Each request runs as its own task on the tokio runtime:
//! 1. Render the prompt for the decision point
//! 2. Wait for a concurrency permit
//! 3. Call the LLM backend
//! 4. Send the reply text (or the failure) back to the game
//!
//! Steps 2 and 3 share one deadline, so a call stuck in the queue times out
//! the same way as a slow backend. The game never waits: it polls the
//! [`PendingReply`] and falls back to its own rules on any error.

use std::sync::Arc;
use std::time::Duration;

use skeld_core::decision::{DecisionError, DecisionProvider, DecisionRequest, PendingReply};
use tokio::runtime::Handle;
use tokio::sync::Semaphore;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::config::RunnerConfig;
use crate::error::RunnerError;
use crate::llm::{LlmBackend, create_backend};
use crate::prompt::{PromptEngine, RenderedPrompt};

/// Decision provider backed by an HTTP language model.
pub struct LlmDecisionProvider {
    backend: Arc<LlmBackend>,
    prompts: PromptEngine,
    permits: Arc<Semaphore>,
    decision_timeout: Duration,
    handle: Handle,
}

impl LlmDecisionProvider {
    /// Build the provider from runner configuration.
    ///
    /// Must be called from inside a tokio runtime; calls are spawned onto it.
    pub fn new(config: &RunnerConfig) -> Result<Self, RunnerError> {
        let handle = Handle::try_current()
            .map_err(|e| RunnerError::Config(format!("no tokio runtime available: {e}")))?;
        let prompts = PromptEngine::new(config.templates_dir.as_deref(), config.personality)?;
        Ok(Self {
            backend: Arc::new(create_backend(&config.backend)),
            prompts,
            permits: Arc::new(Semaphore::new(config.max_concurrent_calls)),
            decision_timeout: config.decision_timeout,
            handle,
        })
    }

    /// Per-call deadline.
    pub const fn decision_timeout(&self) -> Duration {
        self.decision_timeout
    }
}

impl DecisionProvider for LlmDecisionProvider {
    fn name(&self) -> &str {
        self.backend.name()
    }

    fn is_connected(&self) -> bool {
        true
    }

    fn request(&self, request: DecisionRequest) -> PendingReply {
        let kind = request.kind();
        let prompt = match self.prompts.render(&request) {
            Ok(prompt) => prompt,
            Err(e) => {
                warn!(kind = kind.as_str(), error = %e, "prompt render failed");
                return PendingReply::ready(Err(DecisionError::Backend {
                    message: e.to_string(),
                }));
            }
        };

        let (tx, reply) = PendingReply::channel();
        let backend = Arc::clone(&self.backend);
        let permits = Arc::clone(&self.permits);
        let deadline = self.decision_timeout;

        self.handle.spawn(async move {
            let result = match timeout(deadline, call(&backend, &permits, &prompt)).await {
                Ok(Ok(text)) => {
                    debug!(kind = kind.as_str(), reply = %text, "decision reply");
                    Ok(text)
                }
                Ok(Err(e)) => {
                    warn!(kind = kind.as_str(), error = %e, "decision call failed");
                    Err(DecisionError::Backend {
                        message: e.to_string(),
                    })
                }
                Err(_) => {
                    let timeout_ms = u64::try_from(deadline.as_millis()).unwrap_or(u64::MAX);
                    warn!(
                        kind = kind.as_str(),
                        error = %RunnerError::Timeout(timeout_ms),
                        "decision deadline exceeded"
                    );
                    Err(DecisionError::Timeout { timeout_ms })
                }
            };
            // The game drops stale replies; a closed receiver is expected.
            let _ = tx.send(result);
        });

        reply
    }
}

async fn call(
    backend: &LlmBackend,
    permits: &Semaphore,
    prompt: &RenderedPrompt,
) -> Result<String, RunnerError> {
    let _permit = permits
        .acquire()
        .await
        .map_err(|e| RunnerError::LlmBackend(format!("call queue closed: {e}")))?;
    let text = backend.complete(prompt).await?;
    Ok(text.trim().to_owned())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use skeld_core::decision::{KillContext, ReplyPoll};
    use tokio::net::TcpListener;

    use super::*;
    use crate::config::{BackendType, LlmBackendConfig, Personality};

    fn make_config(api_url: String, timeout_ms: u64) -> RunnerConfig {
        RunnerConfig {
            backend: LlmBackendConfig {
                backend_type: BackendType::OpenAi,
                api_url,
                api_key: String::new(),
                model: "test-model".to_owned(),
            },
            decision_timeout: Duration::from_millis(timeout_ms),
            max_concurrent_calls: 2,
            templates_dir: None,
            personality: Personality::Average,
        }
    }

    fn make_request() -> DecisionRequest {
        DecisionRequest::Kill(KillContext {
            agent: "Black".to_owned(),
            target: "Lime".to_owned(),
            score: 0.4,
            room: "Reactor".to_owned(),
            witnesses: 0,
            alive_crew: 6,
            alive_impostors: 2,
        })
    }

    async fn settle(mut reply: PendingReply) -> ReplyPoll {
        for _ in 0..200 {
            match reply.poll_reply() {
                ReplyPoll::Pending => tokio::time::sleep(Duration::from_millis(10)).await,
                other => return other,
            }
        }
        ReplyPoll::Pending
    }

    #[tokio::test]
    async fn provider_reports_backend_name() {
        let provider =
            LlmDecisionProvider::new(&make_config("http://127.0.0.1:9/v1".to_owned(), 500))
                .unwrap();
        assert_eq!(provider.name(), "openai-compatible");
        assert!(provider.is_connected());
        assert_eq!(provider.decision_timeout(), Duration::from_millis(500));
    }

    #[test]
    fn provider_needs_a_runtime() {
        let result = LlmDecisionProvider::new(&make_config("http://127.0.0.1:9/v1".to_owned(), 500));
        assert!(matches!(result, Err(RunnerError::Config(_))));
    }

    #[tokio::test]
    async fn unreachable_backend_is_a_backend_error() {
        // Bind then drop so the port refuses connections.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let provider =
            LlmDecisionProvider::new(&make_config(format!("http://{addr}/v1"), 1000)).unwrap();
        let poll = settle(provider.request(make_request())).await;
        assert!(matches!(
            poll,
            ReplyPoll::Ready(Err(DecisionError::Backend { .. }))
        ));
    }

    #[tokio::test]
    async fn silent_backend_times_out() {
        // Accepts connections and never answers.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let provider =
            LlmDecisionProvider::new(&make_config(format!("http://{addr}/v1"), 50)).unwrap();
        let poll = settle(provider.request(make_request())).await;
        assert_eq!(
            poll,
            ReplyPoll::Ready(Err(DecisionError::Timeout { timeout_ms: 50 }))
        );

        server.abort();
    }
}
