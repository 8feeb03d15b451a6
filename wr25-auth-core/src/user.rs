//! Records produced by a successful login or token refresh

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Generic user record handed to the enclosing login framework
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Name of the provider instance that authenticated the user
    pub provider: String,
    /// Character id, base 10
    pub user_id: String,
    /// Character name
    pub nick_name: String,
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: Option<DateTime<Utc>>,
    /// Full verify payload, unknown fields included
    #[serde(default)]
    pub raw_data: serde_json::Map<String, serde_json::Value>,
}

/// Tokens returned by the token endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    pub token_type: String,
    /// Present when the provider issued (or rotated) a refresh token
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Token {
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| at <= Utc::now())
    }
}
