//! `runReport` call-through.

use crate::auth::TokenSource;
use crate::error::{AnalyticsDataError, Result, bounded_upstream_text, log_safe_url};
use crate::model::ReportRequest;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use url::Url;

pub const DEFAULT_API_BASE_URL: &str = "https://analyticsdata.googleapis.com";

/// Runs a single report against a fixed property.
#[async_trait]
pub trait ReportRunner: Send + Sync {
    /// Issue one `runReport` call and return the response body as-is.
    async fn run_report(&self, request: &ReportRequest) -> Result<Value>;
}

#[derive(Clone)]
pub struct ReportClient {
    inner: Arc<ReportClientInner>,
}

struct ReportClientInner {
    http: Client,
    report_url: Url,
    tokens: Arc<dyn TokenSource>,
}

impl ReportClient {
    /// Build a client for one property.
    ///
    /// `property_id` may be bare (`123456`) or in resource form (`properties/123456`).
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticsDataError::Config`] if the base URL is invalid or the property id is
    /// empty or malformed.
    pub fn new(
        http: Client,
        api_base_url: &str,
        property_id: &str,
        tokens: Arc<dyn TokenSource>,
    ) -> Result<Self> {
        let report_url = run_report_url(api_base_url, property_id)?;
        Ok(Self {
            inner: Arc::new(ReportClientInner {
                http,
                report_url,
                tokens,
            }),
        })
    }

    #[must_use]
    pub fn report_url(&self) -> &Url {
        &self.inner.report_url
    }
}

#[async_trait]
impl ReportRunner for ReportClient {
    async fn run_report(&self, request: &ReportRequest) -> Result<Value> {
        let inner = &self.inner;
        let token = inner.tokens.access_token().await?;

        let response = inner
            .http
            .post(inner.report_url.clone())
            .bearer_auth(token)
            .json(request)
            .send()
            .await?;
        let status = response.status();
        let bytes = response.bytes().await?;

        if !status.is_success() {
            let message = upstream_error_message(status, &bytes);
            tracing::debug!(
                url = %log_safe_url(&inner.report_url),
                status = status.as_u16(),
                "runReport rejected"
            );
            return Err(AnalyticsDataError::Api {
                status: status.as_u16(),
                message,
            });
        }

        serde_json::from_slice(&bytes)
            .map_err(|e| AnalyticsDataError::Decode(format!("parse runReport response: {e}")))
    }
}

fn run_report_url(api_base_url: &str, property_id: &str) -> Result<Url> {
    let property_id = property_id.trim();
    let property_id = property_id
        .strip_prefix("properties/")
        .unwrap_or(property_id);
    if property_id.is_empty() || property_id.contains('/') {
        return Err(AnalyticsDataError::Config(format!(
            "Invalid property id '{property_id}'"
        )));
    }

    let base = api_base_url.trim_end_matches('/');
    let raw = format!("{base}/v1beta/properties/{property_id}:runReport");
    Url::parse(&raw).map_err(|e| {
        AnalyticsDataError::Config(format!("Invalid API base URL '{api_base_url}': {e}"))
    })
}

/// Google APIs wrap failures as `{"error": {"code", "message", "status"}}`.
#[derive(Debug, Deserialize)]
struct GoogleErrorEnvelope {
    error: GoogleErrorBody,
}

#[derive(Debug, Deserialize)]
struct GoogleErrorBody {
    message: String,
}

fn upstream_error_message(status: StatusCode, body: &[u8]) -> String {
    if let Ok(envelope) = serde_json::from_slice::<GoogleErrorEnvelope>(body)
        && !envelope.error.message.is_empty()
    {
        return envelope.error.message;
    }

    let reason = status.canonical_reason().unwrap_or("Unknown");
    let text = bounded_upstream_text(&String::from_utf8_lossy(body));
    if text.is_empty() {
        format!("{} {reason}", status.as_u16())
    } else {
        format!("{} {reason}: {text}", status.as_u16())
    }
}
