//! MCP surface: `initialize`, `tools/list` and `tools/call`.

use crate::dispatcher::Dispatcher;
use crate::tools;
use rmcp::model::{
    CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam,
    ServerCapabilities, ServerInfo,
};
use rmcp::service::RequestContext;
use rmcp::{ErrorData, RoleServer, ServerHandler};

pub const SERVER_NAME: &str = "ga4-mcp-server";

const INSTRUCTIONS: &str = "Google Analytics 4 reports for a single configured property. \
Every tool takes startDate and endDate as YYYY-MM-DD (inclusive, startDate not after endDate). \
Use runReport for arbitrary metric/dimension combinations; the other tools are fixed reports.";

#[derive(Clone)]
pub struct AnalyticsServer {
    dispatcher: Dispatcher,
}

impl AnalyticsServer {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self { dispatcher }
    }
}

impl ServerHandler for AnalyticsServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: SERVER_NAME.to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                ..Default::default()
            },
            instructions: Some(INSTRUCTIONS.to_string()),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, ErrorData> {
        Ok(ListToolsResult::with_all_items(tools::list_tools()))
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, ErrorData> {
        tracing::info!(tool = %request.name, "tools/call");
        self.dispatcher
            .dispatch(&request.name, request.arguments)
            .await
            .map_err(ErrorData::from)
    }
}
