//! Process configuration.
//!
//! Credentials and the target property come from the environment and are read exactly once at
//! startup. The resulting [`ServerConfig`] is immutable and handed to whatever needs it.

use ga4_data_api::auth::DEFAULT_TOKEN_URI;
use ga4_data_api::client::DEFAULT_API_BASE_URL;
use std::fmt;
use thiserror::Error;

pub const CLIENT_EMAIL_VAR: &str = "GOOGLE_CLIENT_EMAIL";
pub const PRIVATE_KEY_VAR: &str = "GOOGLE_PRIVATE_KEY";
pub const PROPERTY_ID_VAR: &str = "GA_PROPERTY_ID";

/// Required variables, in the order they are checked and reported.
pub const REQUIRED_VARS: [&str; 3] = [CLIENT_EMAIL_VAR, PRIVATE_KEY_VAR, PROPERTY_ID_VAR];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required environment variables: {}", .0.join(", "))]
    MissingVariables(Vec<&'static str>),
}

#[derive(Clone)]
pub struct ServerConfig {
    pub client_email: String,
    pub private_key: String,
    pub property_id: String,
    pub api_base_url: String,
    pub token_uri: String,
}

impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConfig")
            .field("client_email", &self.client_email)
            .field("private_key", &"<redacted>")
            .field("property_id", &self.property_id)
            .field("api_base_url", &self.api_base_url)
            .field("token_uri", &self.token_uri)
            .finish()
    }
}

impl ServerConfig {
    /// Load from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingVariables`] naming every required variable that is unset or
    /// empty.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load using `lookup` to resolve variable names.
    ///
    /// Empty values count as missing. The endpoints start at their Google defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingVariables`] listing all missing names in checked order.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut missing = Vec::new();
        let values = REQUIRED_VARS.map(|name| {
            let value = lookup(name).filter(|v| !v.is_empty());
            if value.is_none() {
                missing.push(name);
            }
            value.unwrap_or_default()
        });

        if !missing.is_empty() {
            return Err(ConfigError::MissingVariables(missing));
        }

        let [client_email, private_key, property_id] = values;
        Ok(Self {
            client_email,
            private_key: normalize_private_key(&private_key),
            property_id,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            token_uri: DEFAULT_TOKEN_URI.to_string(),
        })
    }
}

/// Turn literal `\n` sequences into line breaks.
///
/// PEM keys are commonly stored in env files on a single line with escaped newlines.
#[must_use]
pub fn normalize_private_key(raw: &str) -> String {
    raw.replace("\\n", "\n")
}
