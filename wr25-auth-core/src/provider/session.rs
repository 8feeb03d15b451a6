use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::user::Token;
use crate::Result;

/// State of one login attempt
///
/// Created by `begin_auth` with only `auth_url` set, then filled in once by
/// `authorize`. The framework parks it between redirect and callback, so it
/// round-trips through [`marshal`](Self::marshal).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
    pub auth_url: String,
    #[serde(default)]
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: String,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl AuthSession {
    #[must_use]
    pub fn new(auth_url: impl Into<String>) -> Self {
        Self {
            auth_url: auth_url.into(),
            ..Self::default()
        }
    }

    /// URL to send the browser to
    #[must_use]
    pub fn auth_url(&self) -> &str {
        &self.auth_url
    }

    #[must_use]
    pub fn is_authorized(&self) -> bool {
        !self.access_token.is_empty()
    }

    pub fn marshal(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn unmarshal(data: &str) -> Result<Self> {
        Ok(serde_json::from_str(data)?)
    }

    pub(crate) fn apply_token(&mut self, token: &Token) {
        self.access_token.clone_from(&token.access_token);
        if let Some(refresh_token) = &token.refresh_token {
            self.refresh_token.clone_from(refresh_token);
        }
        self.expires_at = token.expires_at;
    }
}
