use config::{Config as ConfigBuilder, ConfigError, Environment, File};
use serde::{Deserialize, Deserializer, Serialize};

use crate::provider::{AUTH_URL, DEFAULT_PROVIDER_NAME, TOKEN_URL, VERIFY_URL};

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub provider: ProviderConfig,
    pub http: HttpConfig,
    pub logging: LoggingConfig,
}

/// wr25 provider configuration
///
/// `name` is only a lookup key for the enclosing framework; running two
/// instances against the same endpoints under different names is supported.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub name: String,
    pub client_id: String,
    pub client_secret: String,
    pub callback_url: String,
    /// A list in files; `WR25_PROVIDER__SCOPES=a,b` from the environment.
    #[serde(deserialize_with = "scope_list")]
    pub scopes: Vec<String>,
    pub auth_style: AuthStyle,
    pub endpoints: Endpoints,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_PROVIDER_NAME.to_string(),
            client_id: String::new(),
            client_secret: String::new(),
            callback_url: String::new(),
            scopes: Vec::new(),
            auth_style: AuthStyle::default(),
            endpoints: Endpoints::default(),
        }
    }
}

impl ProviderConfig {
    pub fn new<I, S>(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        callback_url: impl Into<String>,
        scopes: I,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            callback_url: callback_url.into(),
            scopes: scopes.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    #[must_use]
    pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    #[must_use]
    pub const fn with_auth_style(mut self, auth_style: AuthStyle) -> Self {
        self.auth_style = auth_style;
        self
    }

    /// Collect every configuration problem instead of stopping at the first.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.name.trim().is_empty() {
            errors.push("provider.name must not be empty".to_string());
        }
        if self.client_id.is_empty() {
            errors.push("provider.client_id is required".to_string());
        }
        if self.client_secret.is_empty() {
            errors.push("provider.client_secret is required".to_string());
        }
        if let Err(e) = url::Url::parse(&self.callback_url) {
            errors.push(format!("provider.callback_url is not a valid URL: {e}"));
        }
        for (key, value) in [
            ("auth_url", &self.endpoints.auth_url),
            ("token_url", &self.endpoints.token_url),
            ("verify_url", &self.endpoints.verify_url),
        ] {
            if let Err(e) = url::Url::parse(value) {
                errors.push(format!("provider.endpoints.{key} is not a valid URL: {e}"));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

fn scope_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Scopes {
        List(Vec<String>),
        Csv(String),
    }

    Ok(match Scopes::deserialize(deserializer)? {
        Scopes::List(scopes) => scopes,
        Scopes::Csv(scopes) => scopes
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
    })
}

/// How the client credentials reach the token endpoint
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthStyle {
    /// HTTP basic `Authorization` header
    #[default]
    Basic,
    /// `client_id` / `client_secret` form fields
    RequestBody,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    pub auth_url: String,
    pub token_url: String,
    pub verify_url: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            auth_url: AUTH_URL.to_string(),
            token_url: TOKEN_URL.to_string(),
            verify_url: VERIFY_URL.to_string(),
        }
    }
}

impl Endpoints {
    /// Endpoints rooted at `base`, using the provider's path layout.
    #[must_use]
    pub fn with_base(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            auth_url: format!("{base}/oauth/authorize/"),
            token_url: format!("{base}/oauth/token"),
            verify_url: format!("{base}/oauth/verify"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_seconds: u64,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 30,
            user_agent: concat!("wr25-auth/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String, // "json" or "pretty"
    pub file_path: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            file_path: None,
        }
    }
}

impl Config {
    /// Load configuration from multiple sources with priority:
    /// 1. Environment variables (highest priority)
    /// 2. Config file (if provided)
    /// 3. Defaults (lowest priority)
    ///
    /// A `config_file` that does not exist is an error.
    pub fn load(config_file: Option<&str>) -> Result<Self, ConfigError> {
        Self::load_from(config_file, environment())
    }

    fn load_from(config_file: Option<&str>, env: Environment) -> Result<Self, ConfigError> {
        let mut builder = ConfigBuilder::builder();

        if let Some(path) = config_file {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        let config = builder.add_source(env).build()?;
        config.try_deserialize()
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(None)
    }

    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        Self::load(Some(path))
    }

    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = match self.provider.validate() {
            Ok(()) => Vec::new(),
            Err(errors) => errors,
        };

        if self.http.timeout_seconds == 0 {
            errors.push("http.timeout_seconds must be greater than zero".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

// WR25_PROVIDER__CLIENT_ID, WR25_HTTP__TIMEOUT_SECONDS, ...
// Values stay strings so numeric-looking secrets keep their leading zeros.
fn environment() -> Environment {
    Environment::with_prefix("WR25")
        .prefix_separator("_")
        .separator("__")
}
