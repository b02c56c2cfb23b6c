//! Per-request session context carrying the media access credential.

use std::fmt;

/// Environment variable read by the binaries for the startup credential.
pub const ACCESS_TOKEN_ENV: &str = "TUNECUE_ACCESS_TOKEN";

/// Opaque bearer token for the media API. Never refreshed or validated here.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessCredential(String);

impl AccessCredential {
    /// `None` for empty or whitespace-only tokens.
    pub fn new(token: impl Into<String>) -> Option<Self> {
        let token = token.into();
        let trimmed = token.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessCredential(***)")
    }
}

/// Who a command runs as. Passed explicitly into the orchestrator.
#[derive(Debug, Clone, Default)]
pub struct Session {
    credential: Option<AccessCredential>,
}

impl Session {
    pub fn new(credential: AccessCredential) -> Self {
        Self {
            credential: Some(credential),
        }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn from_token(token: Option<String>) -> Self {
        Self {
            credential: token.and_then(AccessCredential::new),
        }
    }

    pub fn from_env() -> Self {
        Self::from_token(std::env::var(ACCESS_TOKEN_ENV).ok())
    }

    pub fn credential(&self) -> Option<&AccessCredential> {
        self.credential.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.credential.is_some()
    }
}
