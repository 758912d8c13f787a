//! Per-request error taxonomy surfaced to MCP callers.

use ga4_data_api::AnalyticsDataError;
use rmcp::ErrorData;
use rmcp::model::ErrorCode;
use thiserror::Error;

/// Message returned for failures whose detail must not reach the caller.
pub const GENERIC_INTERNAL_MESSAGE: &str = "An unexpected error occurred";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ToolError {
    /// Bad or missing arguments. The message names the field.
    #[error("{0}")]
    InvalidParams(String),

    #[error("Unknown tool: {0}")]
    MethodNotFound(String),

    /// Google rejected the call; its message is forwarded.
    #[error("upstream API error: {0}")]
    Upstream(String),

    #[error("An unexpected error occurred")]
    Internal,
}

pub type Result<T> = std::result::Result<T, ToolError>;

impl ToolError {
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidParams(_) => ErrorCode::INVALID_PARAMS,
            Self::MethodNotFound(_) => ErrorCode::METHOD_NOT_FOUND,
            Self::Upstream(_) | Self::Internal => ErrorCode::INTERNAL_ERROR,
        }
    }
}

impl From<AnalyticsDataError> for ToolError {
    fn from(value: AnalyticsDataError) -> Self {
        match value.upstream_message() {
            Some(message) => Self::Upstream(message.to_string()),
            None => Self::Internal,
        }
    }
}

impl From<ToolError> for ErrorData {
    fn from(value: ToolError) -> Self {
        ErrorData::new(value.code(), value.to_string(), None)
    }
}
