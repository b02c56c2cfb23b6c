//! Text → `StructuredAction`.
//!
//! Resolution is two explicit stages: the model stage (`model`) returns an
//! `Option`, and the heuristic rules (`heuristic`) fill in when it is `None`.
//! Both stages go through the sanitizer, so callers always receive a
//! well-formed action.

pub mod heuristic;
pub mod model;
pub mod sanitize;

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use crate::action::StructuredAction;
use crate::llm::{HttpTextModel, ModelError, TextModel};
use crate::settings::LlmProviderConfig;

use self::model::ModelInterpreter;
use self::sanitize::sanitize_action;

/// Which stage produced an interpretation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InterpretationSource {
    Model,
    Heuristic,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Interpretation {
    pub action: StructuredAction,
    pub source: InterpretationSource,
}

/// `resolve(text) = model(text) orElse heuristic(text)`.
#[derive(Clone, Default)]
pub struct Interpreter {
    primary: ModelInterpreter,
}

impl Interpreter {
    /// No model stage: every command goes straight to the heuristic rules.
    pub fn heuristic_only() -> Self {
        Self::default()
    }

    pub fn with_model(model: Arc<dyn TextModel>) -> Self {
        Self {
            primary: ModelInterpreter::new(Some(model)),
        }
    }

    /// Build from settings. A missing API key disables the model stage.
    pub fn from_config(config: &LlmProviderConfig) -> Self {
        match HttpTextModel::new(config) {
            Ok(model) => {
                info!(provider = ?model.provider(), "model interpretation enabled");
                Self::with_model(Arc::new(model))
            }
            Err(ModelError::NotConfigured) => {
                info!("no model API key configured, using heuristic interpretation only");
                Self::heuristic_only()
            }
            Err(e) => {
                info!(error = %e, "model unavailable, using heuristic interpretation only");
                Self::heuristic_only()
            }
        }
    }

    pub fn has_model(&self) -> bool {
        self.primary.is_configured()
    }

    pub async fn resolve(&self, text: &str) -> Interpretation {
        if let Some(action) = self.primary.try_interpret(text).await {
            debug!(action = %action.description(), "model interpretation");
            return Interpretation {
                action,
                source: InterpretationSource::Model,
            };
        }
        let action = sanitize_action(&heuristic::interpret(text));
        debug!(action = %action.description(), "heuristic interpretation");
        Interpretation {
            action,
            source: InterpretationSource::Heuristic,
        }
    }

    pub async fn interpret(&self, text: &str) -> StructuredAction {
        self.resolve(text).await.action
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
pub(crate) mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::action::SearchType;

    /// Scripted model: returns a fixed reply and counts calls.
    pub(crate) struct FakeModel {
        reply: Result<String, ModelError>,
        pub calls: AtomicUsize,
    }

    impl FakeModel {
        pub(crate) fn replying(text: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(text.to_string()),
                calls: AtomicUsize::new(0),
            })
        }

        pub(crate) fn failing(err: ModelError) -> Arc<Self> {
            Arc::new(Self {
                reply: Err(err),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl TextModel for FakeModel {
        async fn complete(&self, _prompt: &str) -> Result<String, ModelError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.reply.clone()
        }
    }

    #[tokio::test]
    async fn test_fenced_model_reply() {
        let model = FakeModel::replying("```json\n{\"action\":\"next\",\"parameters\":{}}\n```");
        let interpreter = Interpreter::with_model(model.clone());

        let result = interpreter.resolve("whatever the user said").await;
        assert_eq!(result.action, StructuredAction::Next);
        assert_eq!(result.source, InterpretationSource::Model);
        assert_eq!(model.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_network_error_equals_heuristic() {
        let interpreter =
            Interpreter::with_model(FakeModel::failing(ModelError::Transport("connection reset".into())));

        for text in [
            "Pause the current song",
            "play my Sunday Morning playlist",
            "top tracks by Nina Simone",
            "play the Girl from Ipanema",
            "hello there",
        ] {
            let result = interpreter.resolve(text).await;
            assert_eq!(result.action, heuristic::interpret(text), "{text}");
            assert_eq!(result.source, InterpretationSource::Heuristic);
        }
    }

    #[tokio::test]
    async fn test_rate_limit_falls_back_without_retry() {
        let model = FakeModel::failing(ModelError::RateLimited("HTTP 429".into()));
        let interpreter = Interpreter::with_model(model.clone());

        let action = interpreter.interpret("skip").await;
        assert_eq!(action, StructuredAction::Next);
        assert_eq!(model.calls.load(Ordering::SeqCst), 1);

        // No circuit breaker: the next command tries the model again.
        interpreter.interpret("skip").await;
        assert_eq!(model.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_garbage_reply_falls_back() {
        let interpreter = Interpreter::with_model(FakeModel::replying("I'm not sure what you mean"));
        assert_eq!(
            interpreter.interpret("play Clair de Lune").await,
            StructuredAction::SearchAndPlay {
                query: "Clair de Lune".into(),
                search_type: SearchType::Track,
            }
        );
    }

    #[tokio::test]
    async fn test_disallowed_model_action_falls_back() {
        let interpreter =
            Interpreter::with_model(FakeModel::replying(r#"{"action":"delete_playlist","parameters":{}}"#));
        let result = interpreter.resolve("stop").await;
        assert_eq!(result.action, StructuredAction::Pause);
        assert_eq!(result.source, InterpretationSource::Heuristic);
    }

    #[tokio::test]
    async fn test_heuristic_only_never_calls_model() {
        let interpreter = Interpreter::heuristic_only();
        assert!(!interpreter.has_model());
        assert_eq!(interpreter.interpret("next please").await, StructuredAction::Next);
    }

    #[test]
    fn test_from_config_without_key_is_heuristic_only() {
        let interpreter = Interpreter::from_config(&LlmProviderConfig::default());
        assert!(!interpreter.has_model());
    }
}
