//! OAuth2 provider adapter
//!
//! The enclosing login framework drives a provider through four steps:
//!
//! 1. [`Provider::begin_auth`] builds the authorization URL for a state token
//! 2. [`Provider::authorize`] exchanges the callback code for tokens
//! 3. [`Provider::fetch_user`] maps the verify payload onto a [`User`]
//! 4. [`Provider::refresh_token`] renews an access token later on
//!
//! Token requests go through the `oauth2` crate; only the verify endpoint
//! is called by hand.

pub mod session;
pub mod wr25;

pub use session::AuthSession;
pub use wr25::Wr25Provider;

use async_trait::async_trait;
use std::time::Duration;

use crate::config::HttpConfig;
use crate::user::{Token, User};
use crate::{Error, Result};

pub const AUTH_URL: &str = "https://auth.wr25.org/oauth/authorize/";
pub const TOKEN_URL: &str = "https://auth.wr25.org/oauth/token";
pub const VERIFY_URL: &str = "https://auth.wr25.org/oauth/verify";

pub const DEFAULT_PROVIDER_NAME: &str = "authwr25";

/// Social login provider
#[async_trait]
pub trait Provider: Send + Sync {
    /// Name the framework uses to look this instance up
    fn name(&self) -> &str;

    /// Rename the instance, for running several providers of one type
    fn set_name(&mut self, name: String);

    /// Start a login attempt. `state` is opaque and echoed back by the
    /// provider on the callback.
    fn begin_auth(&self, state: &str) -> AuthSession;

    /// Restore a session previously produced by [`AuthSession::marshal`].
    fn unmarshal_session(&self, data: &str) -> Result<AuthSession> {
        AuthSession::unmarshal(data)
    }

    /// Exchange the callback `code` for tokens and store them on the session.
    /// Returns the new access token.
    async fn authorize(&self, session: &mut AuthSession, code: &str) -> Result<String>;

    /// Fetch the authenticated user's profile.
    async fn fetch_user(&self, session: &AuthSession) -> Result<User>;

    fn refresh_token_available(&self) -> bool;

    /// Obtain a new access token from a refresh token. Rejection is final:
    /// the caller must restart the authorization flow.
    async fn refresh_token(&self, refresh_token: &str) -> Result<Token>;
}

/// Build the HTTP client shared by providers.
///
/// Redirects are disabled: token and verify endpoints never redirect, and
/// following one would leak the bearer token to another host.
pub fn http_client(config: &HttpConfig) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_seconds))
        .user_agent(config.user_agent.clone())
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .map_err(Error::Http)
}
