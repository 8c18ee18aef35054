//! Provider Authentication
//!
//! Resolves the `authentication` block of a provider into credentials that are
//! attached to the catalog request. Secrets can be written inline or pulled
//! from the environment at request time, so the registry file itself never has
//! to carry them:
//!
//! ```yaml
//! authentication:
//!   type: BasicAuth
//!   user: ump
//!   password: { env: MODELSERVER_PASSWORD }
//! ```

use reqwest::RequestBuilder;
use serde::Deserialize;
use std::env;
use std::fmt;

use crate::types::FetchError;

/// Authentication block as written in the provider registry
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type")]
pub enum AuthConfig {
    /// HTTP basic authentication
    #[serde(alias = "basic")]
    BasicAuth { user: String, password: SecretValue },

    /// `Authorization: Bearer <token>`
    #[serde(alias = "bearer")]
    BearerAuth { token: SecretValue },

    /// Explicitly unauthenticated
    #[serde(rename = "None", alias = "none")]
    Anonymous,
}

/// A secret given inline or by environment variable name
#[derive(Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum SecretValue {
    Plain(String),
    Env { env: String },
}

impl SecretValue {
    /// Read the secret; env-backed values are looked up on every call
    pub fn resolve(&self) -> Result<String, FetchError> {
        match self {
            SecretValue::Plain(value) => Ok(value.clone()),
            SecretValue::Env { env: name } => env::var(name).map_err(|_| {
                FetchError::Auth(format!("environment variable {} is not set", name))
            }),
        }
    }
}

impl fmt::Debug for SecretValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SecretValue::Plain(_) => write!(f, "Plain(***)"),
            SecretValue::Env { env } => f.debug_struct("Env").field("env", env).finish(),
        }
    }
}

/// Credentials ready to attach to a request
#[derive(Clone, PartialEq)]
pub enum ProviderAuth {
    Anonymous,
    Basic { user: String, password: String },
    Bearer(String),
}

impl ProviderAuth {
    /// Resolve a provider's authentication block. An absent block means anonymous.
    pub fn resolve(config: Option<&AuthConfig>) -> Result<Self, FetchError> {
        match config {
            None | Some(AuthConfig::Anonymous) => Ok(ProviderAuth::Anonymous),
            Some(AuthConfig::BasicAuth { user, password }) => Ok(ProviderAuth::Basic {
                user: user.clone(),
                password: password.resolve()?,
            }),
            Some(AuthConfig::BearerAuth { token }) => Ok(ProviderAuth::Bearer(token.resolve()?)),
        }
    }

    pub fn apply(&self, request: RequestBuilder) -> RequestBuilder {
        match self {
            ProviderAuth::Anonymous => request,
            ProviderAuth::Basic { user, password } => request.basic_auth(user, Some(password)),
            ProviderAuth::Bearer(token) => request.bearer_auth(token),
        }
    }
}

impl fmt::Debug for ProviderAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderAuth::Anonymous => write!(f, "Anonymous"),
            ProviderAuth::Basic { user, .. } => write!(f, "Basic({}:***)", user),
            ProviderAuth::Bearer(_) => write!(f, "Bearer(***)"),
        }
    }
}
