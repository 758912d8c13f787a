//! Routes a tool call through validation, the registry and the report runner.

use crate::dates::validate_date_range;
use crate::error::{Result, ToolError};
use crate::tools::{DateArgs, find_tool, parse_args};
use ga4_data_api::{ReportRequest, ReportRunner};
use rmcp::model::{CallToolResult, Content, JsonObject};
use std::sync::Arc;

#[derive(Clone)]
pub struct Dispatcher {
    runner: Arc<dyn ReportRunner>,
}

impl Dispatcher {
    pub fn new(runner: Arc<dyn ReportRunner>) -> Self {
        Self { runner }
    }

    /// Resolve `name` and turn `args` into the upstream request without any I/O.
    ///
    /// # Errors
    ///
    /// - [`ToolError::MethodNotFound`] if no tool has that name
    /// - [`ToolError::InvalidParams`] if the arguments or dates are malformed
    pub fn prepare(name: &str, args: &JsonObject) -> Result<ReportRequest> {
        let tool = find_tool(name).ok_or_else(|| ToolError::MethodNotFound(name.to_string()))?;
        let dates: DateArgs = parse_args(name, args)?;
        let range = validate_date_range(&dates.start_date, &dates.end_date)?;
        (tool.build)(range, args)
    }

    /// Execute one tool call and render the report as pretty-printed JSON text.
    ///
    /// # Errors
    ///
    /// Validation errors as in [`Dispatcher::prepare`]. Upstream failures become
    /// [`ToolError::Upstream`] when Google supplied a message and [`ToolError::Internal`]
    /// otherwise; the full cause is only logged.
    pub async fn dispatch(&self, name: &str, args: Option<JsonObject>) -> Result<CallToolResult> {
        let args = args.unwrap_or_default();
        let request = Self::prepare(name, &args).inspect_err(|e| {
            tracing::debug!(tool = %name, error = %e, "rejected tool call");
        })?;

        let started = std::time::Instant::now();
        let report = self.runner.run_report(&request).await.map_err(|e| {
            tracing::warn!(tool = %name, error = %e, "runReport failed");
            ToolError::from(e)
        })?;
        tracing::debug!(
            tool = %name,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "runReport succeeded"
        );

        let text = serde_json::to_string_pretty(&report).map_err(|e| {
            tracing::error!(tool = %name, error = %e, "failed to render report");
            ToolError::Internal
        })?;
        Ok(CallToolResult::success(vec![Content::text(text)]))
    }
}
