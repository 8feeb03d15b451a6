//! Cookie-backed session storage
//!
//! The login framework stores the authenticated [`User`] under
//! [`USER_KEY`] in a session whose id travels in the [`SESSION_COOKIE`]
//! cookie. Values carry their type tag, so reading a user back fails with a
//! named error when something else was stored under the key.

pub mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::user::User;
use crate::{Error, Result};

/// Cookie holding the session id
pub const SESSION_COOKIE: &str = "user";

/// Session key under which the authenticated user is stored
pub const USER_KEY: &str = "user";

/// Generate a new random session id
#[must_use]
pub fn new_session_id() -> String {
    nanoid::nanoid!(32)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum SessionValue {
    User(User),
    Text(String),
    Json(serde_json::Value),
}

impl SessionValue {
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::User(_) => "user",
            Self::Text(_) => "text",
            Self::Json(_) => "json",
        }
    }
}

impl From<User> for SessionValue {
    fn from(user: User) -> Self {
        Self::User(user)
    }
}

impl From<String> for SessionValue {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<serde_json::Value> for SessionValue {
    fn from(value: serde_json::Value) -> Self {
        Self::Json(value)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    values: HashMap<String, SessionValue>,
}

impl SessionRecord {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&SessionValue> {
        self.values.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<SessionValue>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<SessionValue> {
        self.values.remove(key)
    }

    /// The user stored under [`USER_KEY`].
    pub fn user(&self) -> Result<&User> {
        match self.values.get(USER_KEY) {
            Some(SessionValue::User(user)) => Ok(user),
            Some(other) => Err(Error::UnexpectedSessionValue {
                key: USER_KEY.to_string(),
                found: other.kind(),
            }),
            None => Err(Error::NoUserInSession),
        }
    }

    pub fn set_user(&mut self, user: User) {
        self.insert(USER_KEY, user);
    }
}

/// Session storage backend
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn load(&self, id: &str) -> Result<Option<SessionRecord>>;

    async fn save(&self, id: &str, record: SessionRecord) -> Result<()>;

    async fn remove(&self, id: &str) -> Result<Option<SessionRecord>>;
}

/// Find the session id in a request's `Cookie` headers.
#[must_use]
pub fn session_id_from_headers(headers: &http::HeaderMap) -> Option<String> {
    headers
        .get_all(http::header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(cookie::Cookie::split_parse)
        .filter_map(std::result::Result::ok)
        .find(|c| c.name() == SESSION_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|id| !id.is_empty())
}
