//! wr25 OAuth2 provider

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use oauth2::{
    basic::{BasicClient, BasicErrorResponse, BasicTokenResponse, BasicTokenType},
    AsyncHttpClient, AuthType, AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, EndpointNotSet,
    EndpointSet, HttpRequest, HttpResponse, RedirectUrl, RefreshToken, RequestTokenError, Scope,
    TokenResponse, TokenUrl,
};
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::{AuthStyle, ProviderConfig};
use crate::provider::{AuthSession, Provider};
use crate::user::{Token, User};
use crate::{Error, Result};

type OAuthClient =
    BasicClient<EndpointSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

type TokenError = RequestTokenError<TokenHttpError, BasicErrorResponse>;

type TokenFuture<'a> = std::pin::Pin<
    Box<dyn std::future::Future<Output = std::result::Result<HttpResponse, TokenHttpError>> + Send + 'a>,
>;

/// Routes `oauth2` token requests through [`Wr25Provider::send_token_request`]
struct TokenClient<'p>(&'p Wr25Provider);

impl<'c> AsyncHttpClient<'c> for TokenClient<'_> {
    type Error = TokenHttpError;
    type Future = TokenFuture<'c>;

    fn call(&'c self, request: HttpRequest) -> Self::Future {
        Box::pin(self.0.send_token_request(request))
    }
}

/// Failure of the HTTP round trip to the token endpoint
#[derive(Debug, thiserror::Error)]
enum TokenHttpError {
    #[error(transparent)]
    Transport(#[from] reqwest::Error),

    /// 4xx whose body is not an OAuth2 error document
    #[error("token endpoint answered {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// Profile fields of the verify payload
#[derive(Deserialize)]
struct VerifyProfile {
    #[serde(rename = "CharacterID")]
    character_id: i64,
    #[serde(rename = "CharacterName")]
    character_name: String,
    #[serde(rename = "ExpiresOn", default)]
    expires_on: Option<String>,
}

/// wr25 OAuth2 provider
#[derive(Clone)]
pub struct Wr25Provider {
    name: String,
    scopes: Vec<Scope>,
    oauth: OAuthClient,
    verify_url: Url,
    http_client: reqwest::Client,
}

impl std::fmt::Debug for Wr25Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Wr25Provider")
            .field("name", &self.name)
            .field("client_id", self.oauth.client_id())
            .field("verify_url", &self.verify_url.as_str())
            .finish_non_exhaustive()
    }
}

impl Wr25Provider {
    /// Create a provider from configuration.
    ///
    /// `http_client` is used for every outbound call, token requests included.
    /// It must not follow redirects; see [`crate::provider::http_client`].
    pub fn new(http_client: reqwest::Client, config: ProviderConfig) -> Result<Self> {
        config
            .validate()
            .map_err(|errors| Error::InvalidConfig(errors.join("; ")))?;

        let invalid = |field: &str, e: url::ParseError| Error::InvalidConfig(format!("{field}: {e}"));

        let auth_url =
            AuthUrl::new(config.endpoints.auth_url).map_err(|e| invalid("auth_url", e))?;
        let token_url =
            TokenUrl::new(config.endpoints.token_url).map_err(|e| invalid("token_url", e))?;
        let redirect_url =
            RedirectUrl::new(config.callback_url).map_err(|e| invalid("callback_url", e))?;
        let verify_url =
            Url::parse(&config.endpoints.verify_url).map_err(|e| invalid("verify_url", e))?;

        let auth_type = match config.auth_style {
            AuthStyle::Basic => AuthType::BasicAuth,
            AuthStyle::RequestBody => AuthType::RequestBody,
        };

        let oauth = BasicClient::new(ClientId::new(config.client_id))
            .set_client_secret(ClientSecret::new(config.client_secret))
            .set_auth_uri(auth_url)
            .set_token_uri(token_url)
            .set_redirect_uri(redirect_url)
            .set_auth_type(auth_type);

        Ok(Self {
            name: config.name,
            scopes: config.scopes.into_iter().map(Scope::new).collect(),
            oauth,
            verify_url,
            http_client,
        })
    }

    #[must_use]
    pub fn http_client(&self) -> &reqwest::Client {
        &self.http_client
    }

    #[must_use]
    pub fn verify_url(&self) -> &Url {
        &self.verify_url
    }

    /// Send a token request. A 4xx the `oauth2` crate could not parse would
    /// lose its status, so it is turned into [`TokenHttpError::Rejected`] here.
    async fn send_token_request(
        &self,
        request: HttpRequest,
    ) -> std::result::Result<HttpResponse, TokenHttpError> {
        let response = self
            .http_client
            .execute(reqwest::Request::try_from(request)?)
            .await?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?.to_vec();

        if status.is_client_error() && serde_json::from_slice::<BasicErrorResponse>(&body).is_err() {
            return Err(TokenHttpError::Rejected {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body).trim().to_string(),
            });
        }

        let mut http_response = HttpResponse::new(body);
        *http_response.status_mut() = status;
        *http_response.headers_mut() = headers;
        Ok(http_response)
    }

    fn token_error(&self, err: TokenError) -> Error {
        let reason = match err {
            RequestTokenError::ServerResponse(response) => response.to_string(),
            RequestTokenError::Request(rejected @ TokenHttpError::Rejected { .. }) => {
                rejected.to_string()
            }
            other => return Error::TokenRequest(other.to_string()),
        };
        warn!(provider = %self.name, error = %reason, "Token request rejected");
        Error::TokenRejected {
            provider: self.name.clone(),
            reason,
        }
    }
}

#[async_trait]
impl Provider for Wr25Provider {
    fn name(&self) -> &str {
        &self.name
    }

    fn set_name(&mut self, name: String) {
        self.name = name;
    }

    fn begin_auth(&self, state: &str) -> AuthSession {
        let (auth_url, _state) = self
            .oauth
            .authorize_url(|| CsrfToken::new(state.to_string()))
            .add_scopes(self.scopes.iter().cloned())
            .url();
        AuthSession::new(auth_url.to_string())
    }

    async fn authorize(&self, session: &mut AuthSession, code: &str) -> Result<String> {
        debug!(provider = %self.name, "Exchanging authorization code");
        let send = TokenClient(self);
        let response = self
            .oauth
            .exchange_code(AuthorizationCode::new(code.to_string()))
            .request_async(&send)
            .await
            .map_err(|e| self.token_error(e))?;

        let token = token_from_response(&response);
        session.apply_token(&token);
        Ok(token.access_token)
    }

    async fn fetch_user(&self, session: &AuthSession) -> Result<User> {
        let mut user = User {
            provider: self.name.clone(),
            access_token: session.access_token.clone(),
            refresh_token: session.refresh_token.clone(),
            expires_at: session.expires_at,
            ..User::default()
        };

        if user.access_token.is_empty() {
            return Err(Error::MissingAccessToken {
                provider: self.name.clone(),
            });
        }

        debug!(provider = %self.name, url = %self.verify_url, "Fetching user profile");
        let response = self
            .http_client
            .get(self.verify_url.clone())
            .bearer_auth(&user.access_token)
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            // Drain so the pooled connection can be reused.
            let _ = response.bytes().await;
            return Err(Error::UnexpectedStatus {
                provider: self.name.clone(),
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await?;
        let profile: VerifyProfile = serde_json::from_slice(&body)?;
        user.raw_data = serde_json::from_slice(&body)?;

        user.user_id = profile.character_id.to_string();
        user.nick_name = profile.character_name;
        if user.expires_at.is_none() {
            user.expires_at = profile.expires_on.as_deref().and_then(parse_expires_on);
        }

        Ok(user)
    }

    fn refresh_token_available(&self) -> bool {
        true
    }

    async fn refresh_token(&self, refresh_token: &str) -> Result<Token> {
        debug!(provider = %self.name, "Refreshing access token");
        let send = TokenClient(self);
        let response = self
            .oauth
            .exchange_refresh_token(&RefreshToken::new(refresh_token.to_string()))
            .request_async(&send)
            .await
            .map_err(|e| self.token_error(e))?;

        // An unrotated refresh token stays valid.
        let mut token = token_from_response(&response);
        if token.refresh_token.is_none() {
            token.refresh_token = Some(refresh_token.to_string());
        }
        Ok(token)
    }
}

fn token_from_response(response: &BasicTokenResponse) -> Token {
    let token_type = match response.token_type() {
        BasicTokenType::Bearer => "bearer".to_string(),
        BasicTokenType::Mac => "mac".to_string(),
        BasicTokenType::Extension(ext) => ext.clone(),
    };

    Token {
        access_token: response.access_token().secret().clone(),
        token_type,
        refresh_token: response.refresh_token().map(|t| t.secret().clone()),
        expires_at: response
            .expires_in()
            .and_then(|d| chrono::Duration::from_std(d).ok())
            .map(|d| Utc::now() + d),
    }
}

/// `ExpiresOn` comes without an offset (e.g. `2017-07-05T14:34:16.5857101`)
/// and is UTC. RFC 3339 is accepted too.
fn parse_expires_on(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(at) = DateTime::parse_from_rfc3339(value) {
        return Some(at.with_timezone(&Utc));
    }
    match NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f") {
        Ok(at) => Some(at.and_utc()),
        Err(e) => {
            debug!(value, error = %e, "Ignoring unparsable ExpiresOn");
            None
        }
    }
}
