//! Prompt template loading and rendering via `minijinja`.
//!
//! One template per decision point (`room`, `kill`, `dialogue`, `vote`,
//! `speaker`) renders the user message, and `system` renders the matching
//! system instruction. The templates ship inside the binary; operators can
//! point `TEMPLATES_DIR` at a directory of replacements to tune agents
//! without recompiling.

use minijinja::Environment;
use skeld_core::decision::{DecisionKind, DecisionRequest};

use crate::config::Personality;
use crate::error::RunnerError;
use crate::llm::Sampling;

/// Template files, in the order they are loaded.
const TEMPLATE_NAMES: [&str; 6] = ["system", "room", "kill", "dialogue", "vote", "speaker"];

const BUILTIN: [(&str, &str); 6] = [
    ("system", include_str!("../templates/system.j2")),
    ("room", include_str!("../templates/room.j2")),
    ("kill", include_str!("../templates/kill.j2")),
    ("dialogue", include_str!("../templates/dialogue.j2")),
    ("vote", include_str!("../templates/vote.j2")),
    ("speaker", include_str!("../templates/speaker.j2")),
];

/// Manages prompt template loading and rendering.
pub struct PromptEngine {
    env: Environment<'static>,
    personality: Personality,
}

/// The complete rendered prompt ready to send to an LLM backend.
#[derive(Debug, Clone)]
pub struct RenderedPrompt {
    /// System message: the answer format plus the personality preset.
    pub system: String,
    /// User message: the game situation.
    pub user: String,
    /// Generation limits for this kind of call.
    pub sampling: Sampling,
}

impl PromptEngine {
    /// Create a prompt engine from the built-in templates, or from
    /// `templates_dir` when given.
    ///
    /// A directory must contain every template: `system.j2`, `room.j2`,
    /// `kill.j2`, `dialogue.j2`, `vote.j2`, `speaker.j2`.
    pub fn new(templates_dir: Option<&str>, personality: Personality) -> Result<Self, RunnerError> {
        let mut env = Environment::new();
        match templates_dir {
            None => {
                for (name, source) in BUILTIN {
                    env.add_template(name, source).map_err(|e| {
                        RunnerError::Template(format!("failed to add {name} template: {e}"))
                    })?;
                }
            }
            Some(dir) => {
                for name in TEMPLATE_NAMES {
                    let source = load_template(dir, &format!("{name}.j2"))?;
                    env.add_template_owned(name, source).map_err(|e| {
                        RunnerError::Template(format!("failed to add {name} template: {e}"))
                    })?;
                }
            }
        }
        Ok(Self { env, personality })
    }

    /// Active personality preset.
    pub const fn personality(&self) -> Personality {
        self.personality
    }

    /// Render the prompt for one decision call.
    pub fn render(&self, request: &DecisionRequest) -> Result<RenderedPrompt, RunnerError> {
        let kind = request.kind();
        let serialized = serde_json::to_value(request)?;
        let data = serde_json::json!({
            "kind": kind.as_str(),
            "context": serialized.get("context").cloned().unwrap_or_default(),
        });

        let instruction = self.render_template("system", &data)?;
        let user = self.render_template(kind.as_str(), &data)?;
        let sampling = match kind {
            DecisionKind::Dialogue => Sampling::FREE_TEXT,
            DecisionKind::Room | DecisionKind::Kill | DecisionKind::Vote | DecisionKind::NextSpeaker => {
                Sampling::STRUCTURED
            }
        };

        Ok(RenderedPrompt {
            system: format!("{}\n{}", instruction.trim(), self.personality.instructions()),
            user: user.trim().to_owned(),
            sampling,
        })
    }

    fn render_template(&self, name: &str, data: &serde_json::Value) -> Result<String, RunnerError> {
        self.env
            .get_template(name)
            .map_err(|e| RunnerError::Template(format!("missing {name} template: {e}")))?
            .render(data)
            .map_err(|e| RunnerError::Template(format!("{name} render failed: {e}")))
    }
}

/// Read a template file from disk.
fn load_template(dir: &str, filename: &str) -> Result<String, RunnerError> {
    let path = format!("{dir}/{filename}");
    std::fs::read_to_string(&path)
        .map_err(|e| RunnerError::Template(format!("failed to read {path}: {e}")))
}
