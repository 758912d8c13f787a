//! Error types for the Analytics Data API client.

use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum AnalyticsDataError {
    /// Client construction failed (bad base URL, unusable private key, ...).
    #[error("config error: {0}")]
    Config(String),

    /// The OAuth2 token endpoint rejected the service-account assertion.
    #[error("auth error: {0}")]
    Auth(String),

    /// The reporting API answered with a non-2xx status.
    #[error("API returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("http transport error: {0}")]
    Transport(String),

    /// A 2xx response whose body was not the expected JSON.
    #[error("decode error: {0}")]
    Decode(String),
}

pub type Result<T> = std::result::Result<T, AnalyticsDataError>;

impl AnalyticsDataError {
    /// Message text produced by Google itself, if this error came from a Google endpoint.
    ///
    /// Transport, decode and config failures return `None`: their text is local detail and
    /// should not be shown to callers.
    #[must_use]
    pub fn upstream_message(&self) -> Option<&str> {
        match self {
            Self::Api { message, .. } | Self::Auth(message) => Some(message),
            Self::Config(_) | Self::Transport(_) | Self::Decode(_) => None,
        }
    }
}

impl From<reqwest::Error> for AnalyticsDataError {
    fn from(value: reqwest::Error) -> Self {
        let decode = value.is_decode();
        let url = value.url().map(log_safe_url);
        let value = value.without_url();
        let message = match url {
            Some(url) => format!("{value} ({url})"),
            None => value.to_string(),
        };
        if decode {
            Self::Decode(message)
        } else {
            Self::Transport(message)
        }
    }
}

/// Longest slice of a non-JSON error body that is passed on to callers.
pub const MAX_UPSTREAM_TEXT_CHARS: usize = 512;

/// Scheme, host and path of `url`. Query strings may carry API keys.
#[must_use]
pub fn log_safe_url(url: &Url) -> String {
    format!("{}{}", url.origin().ascii_serialization(), url.path())
}

/// Trim `text` and cut it to [`MAX_UPSTREAM_TEXT_CHARS`] characters, marking the cut.
#[must_use]
pub fn bounded_upstream_text(text: &str) -> String {
    let text = text.trim();
    match text.char_indices().nth(MAX_UPSTREAM_TEXT_CHARS) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
