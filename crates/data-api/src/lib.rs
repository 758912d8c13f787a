//! Minimal Google Analytics Data API (v1beta) client.
//!
//! Covers exactly what the MCP server needs:
//! - service-account authentication ([`auth`])
//! - a single `runReport` call-through ([`client`])
//!
//! No retries, no pagination, no response caching. Report responses are returned as opaque JSON.

pub mod auth;
pub mod client;
pub mod error;
pub mod model;

pub use auth::{ServiceAccountCredentials, ServiceAccountTokenSource, TokenSource};
pub use client::{ReportClient, ReportRunner};
pub use error::{AnalyticsDataError, Result};
pub use model::{DateRange, Dimension, DimensionFilter, Metric, ReportRequest};
