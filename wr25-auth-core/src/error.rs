use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("{provider} cannot get user information without access token")]
    MissingAccessToken { provider: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{provider} responded with a {status} trying to fetch user information")]
    UnexpectedStatus { provider: String, status: u16 },

    #[error("{provider}: not authorized, most likely the token has timed out")]
    Unauthorized { provider: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{provider} rejected the token request: {reason}")]
    TokenRejected { provider: String, reason: String },

    #[error("Token request failed: {0}")]
    TokenRequest(String),

    #[error("No sessions found")]
    NoSession,

    #[error("Session hasn't any user stored")]
    NoUserInSession,

    #[error("Session value '{key}' holds {found}, expected a user")]
    UnexpectedSessionValue { key: String, found: &'static str },

    /// Raised by fallible `SessionStore` backends (database, cache server).
    #[error("Session store error: {0}")]
    Store(String),
}

impl Error {
    /// True when the verify endpoint answered 401, which for this provider
    /// means the access token expired. Callers may refresh and retry.
    #[must_use]
    pub const fn is_token_expired(&self) -> bool {
        matches!(self, Self::Unauthorized { .. })
    }

    /// True when the token endpoint refused the grant outright; the caller has
    /// to restart the authorization flow.
    #[must_use]
    pub const fn requires_reauthentication(&self) -> bool {
        matches!(self, Self::TokenRejected { .. })
    }

    /// HTTP status reported by the provider, if the error carries one.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::UnexpectedStatus { status, .. } => Some(*status),
            Self::Unauthorized { .. } => Some(401),
            Self::Http(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_messages_name_the_provider() {
        let err = Error::UnexpectedStatus {
            provider: "authwr25".to_string(),
            status: 403,
        };
        let msg = err.to_string();
        assert!(msg.contains("authwr25"));
        assert!(msg.contains("403"));
        assert_eq!(err.status(), Some(403));
        assert!(!err.is_token_expired());
    }

    #[test]
    fn test_unauthorized_is_distinct() {
        let err = Error::Unauthorized {
            provider: "authwr25".to_string(),
        };
        assert!(err.is_token_expired());
        assert!(!err.requires_reauthentication());
        assert_eq!(err.status(), Some(401));
        assert!(err.to_string().contains("timed out"));
    }

    #[test]
    fn test_session_errors_are_distinct() {
        assert_ne!(Error::NoSession.to_string(), Error::NoUserInSession.to_string());
    }
}
