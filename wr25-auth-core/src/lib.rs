//! wr25 social login adapter
//!
//! Builds authorization URLs, exchanges and refreshes tokens against the
//! wr25 identity provider, maps its verify payload onto a generic [`User`]
//! and answers group membership questions for logged-in users.

pub mod config;
pub mod error;
pub mod groups;
pub mod logging;
pub mod provider;
pub mod session;
pub mod user;

pub use config::{Config, ProviderConfig};
pub use error::{Error, Result};
pub use groups::UserData;
pub use provider::{AuthSession, Provider, Wr25Provider};
pub use session::{MemoryStore, SessionRecord, SessionStore, SessionValue};
pub use user::{Token, User};
