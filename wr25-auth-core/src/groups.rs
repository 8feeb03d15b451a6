//! Group membership of an authenticated user
//!
//! Groups come from the same verify endpoint as the profile and are fetched
//! on every call; nothing is cached.

use reqwest::{StatusCode, Url};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::provider::Wr25Provider;
use crate::session::{session_id_from_headers, SessionStore};
use crate::user::User;
use crate::{Error, Result};

#[derive(Deserialize)]
struct VerifyGroups {
    #[serde(default)]
    groups: Vec<String>,
}

/// A logged-in user plus what is needed to ask the provider about them
#[derive(Debug, Clone)]
pub struct UserData {
    user: User,
    verify_url: Url,
    http_client: reqwest::Client,
}

impl UserData {
    #[must_use]
    pub fn new(provider: &Wr25Provider, user: User) -> Self {
        Self {
            user,
            verify_url: provider.verify_url().clone(),
            http_client: provider.http_client().clone(),
        }
    }

    /// Look up the user stored in the session referenced by the request's
    /// session cookie.
    pub async fn load<S>(provider: &Wr25Provider, store: &S, headers: &http::HeaderMap) -> Result<Self>
    where
        S: SessionStore + ?Sized,
    {
        let session_id = session_id_from_headers(headers).ok_or(Error::NoSession)?;
        let record = store.load(&session_id).await?.ok_or(Error::NoSession)?;
        let user = record.user()?.clone();
        Ok(Self::new(provider, user))
    }

    #[must_use]
    pub fn user(&self) -> &User {
        &self.user
    }

    /// Current group names of the user, straight from the provider.
    ///
    /// A 401 yields [`Error::Unauthorized`], for which
    /// [`Error::is_token_expired`] is true.
    pub async fn groups(&self) -> Result<Vec<String>> {
        debug!(provider = %self.user.provider, user_id = %self.user.user_id, "Fetching groups");
        let response = self
            .http_client
            .get(self.verify_url.clone())
            .bearer_auth(&self.user.access_token)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            let _ = response.bytes().await;
            warn!(provider = %self.user.provider, user_id = %self.user.user_id, "Verify endpoint rejected the access token");
            return Err(Error::Unauthorized {
                provider: self.user.provider.clone(),
            });
        }
        if !status.is_success() {
            let _ = response.bytes().await;
            return Err(Error::UnexpectedStatus {
                provider: self.user.provider.clone(),
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await?;
        let payload: VerifyGroups = serde_json::from_slice(&body)?;
        Ok(payload.groups)
    }

    /// Whether the user currently belongs to `group` (exact match).
    pub async fn user_in(&self, group: &str) -> Result<bool> {
        let groups = self.groups().await?;
        Ok(groups.iter().any(|g| g == group))
    }
}
