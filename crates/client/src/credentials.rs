//! Per-request credentials.
//!
//! Credentials travel with each call instead of living on the shared HTTP
//! client, so two backends built from the same `reqwest::Client` never see
//! each other's token.

use reqwest::header::AUTHORIZATION;
use reqwest::RequestBuilder;

/// Token credentials sent as `Authorization: Token <token>`.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    token: Option<String>,
}

impl Credentials {
    /// No `Authorization` header at all.
    pub fn anonymous() -> Self {
        Self { token: None }
    }

    pub fn token(token: impl Into<String>) -> Self {
        let token = token.into();
        let token = token.trim();
        if token.is_empty() {
            return Self::anonymous();
        }
        Self {
            token: Some(token.to_string()),
        }
    }

    pub fn is_anonymous(&self) -> bool {
        self.token.is_none()
    }

    pub fn header_value(&self) -> Option<String> {
        self.token.as_ref().map(|token| format!("Token {token}"))
    }

    pub(crate) fn apply(&self, request: RequestBuilder) -> RequestBuilder {
        match self.header_value() {
            Some(value) => request.header(AUTHORIZATION, value),
            None => request,
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let token = if self.token.is_some() { "<redacted>" } else { "<none>" };
        f.debug_struct("Credentials").field("token", &token).finish()
    }
}
