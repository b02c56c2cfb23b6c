//! One command in, one response out: validate, interpret, execute, audit.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tracing::{info, warn};
use ts_rs::TS;

use crate::action::{ActionRecord, StructuredAction};
use crate::audit::{self, CommandAuditEntry};
use crate::error::AppError;
use crate::executor::ActionExecutor;
use crate::interpret::Interpreter;
use crate::media::spotify::SpotifyClient;
use crate::session::Session;
use crate::settings::AppSettings;

pub const SUCCESS_MESSAGE: &str = "Command executed successfully";

/// Payload returned to the inbound command surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
pub struct CommandResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<ActionRecord>,
    /// Stable error code, see `AppError::code`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl CommandResponse {
    pub fn ok(action: &StructuredAction) -> Self {
        Self {
            success: true,
            message: Some(SUCCESS_MESSAGE.to_string()),
            action: Some(action.to_record()),
            error: None,
            details: None,
        }
    }

    pub fn failed(err: &AppError) -> Self {
        Self {
            success: false,
            message: None,
            action: None,
            error: Some(err.code().to_string()),
            details: Some(err.to_string()),
        }
    }
}

#[derive(Clone)]
pub struct CommandOrchestrator {
    interpreter: Interpreter,
    executor: ActionExecutor,
    audit_dir: Option<PathBuf>,
}

impl CommandOrchestrator {
    pub fn new(interpreter: Interpreter, executor: ActionExecutor) -> Self {
        Self {
            interpreter,
            executor,
            audit_dir: None,
        }
    }

    /// Production wiring: model from `settings.llm`, Spotify client from
    /// `settings.media`.
    pub fn from_settings(settings: &AppSettings) -> Self {
        let media = Arc::new(SpotifyClient::new(&settings.media));
        Self::new(
            Interpreter::from_config(&settings.llm),
            ActionExecutor::new(media, settings.media.market.clone()),
        )
    }

    /// Append an audit line per command under `dir`.
    pub fn with_audit_dir(mut self, dir: PathBuf) -> Self {
        self.audit_dir = Some(dir);
        self
    }

    pub fn interpreter(&self) -> &Interpreter {
        &self.interpreter
    }

    /// Handle one command and return the executed action.
    ///
    /// Input and credential checks happen before interpretation, in that
    /// order, so a rejected command never reaches the model.
    pub async fn run(&self, command: Option<&str>, session: &Session) -> Result<StructuredAction, AppError> {
        let started = Instant::now();
        let text = command.map(str::trim).unwrap_or_default();

        let (action, result) = self.process(text, session).await;

        match &result {
            Ok(()) => info!(command = text, "command succeeded"),
            Err(e) => warn!(command = text, code = e.code(), error = %e, "command failed"),
        }
        if let Some(dir) = &self.audit_dir {
            let failure = result.as_ref().err().map(ToString::to_string);
            let outcome = match &failure {
                Some(details) => Err(details.as_str()),
                None => Ok(SUCCESS_MESSAGE),
            };
            let entry = CommandAuditEntry::new(
                text,
                action.as_ref().map(StructuredAction::to_record),
                outcome,
                started.elapsed(),
            );
            audit::log_command(dir, &entry);
        }

        result.and(action.ok_or(AppError::InvalidInput))
    }

    async fn process(&self, text: &str, session: &Session) -> (Option<StructuredAction>, Result<(), AppError>) {
        if text.is_empty() {
            return (None, Err(AppError::InvalidInput));
        }
        let Some(credential) = session.credential() else {
            return (None, Err(AppError::Unauthenticated));
        };

        let action = self.interpreter.interpret(text).await;
        let result = self.executor.execute(&action, credential).await;
        (Some(action), result)
    }

    /// `run` folded into the wire payload. Never fails.
    pub async fn handle(&self, command: Option<&str>, session: &Session) -> CommandResponse {
        match self.run(command, session).await {
            Ok(action) => CommandResponse::ok(&action),
            Err(e) => CommandResponse::failed(&e),
        }
    }
}
