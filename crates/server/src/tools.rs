//! The fixed tool catalog.
//!
//! Every tool is a row in [`TOOLS`]: a name, a description, an input schema and a pure builder that
//! turns the caller's arguments into a [`ReportRequest`]. Dates are validated by the dispatcher
//! before a builder runs, so builders only shape the request.

use crate::error::{Result, ToolError};
use ga4_data_api::{DateRange, Dimension, DimensionFilter, Metric, ReportRequest};
use rmcp::model::{JsonObject, Tool, ToolAnnotations};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::sync::Arc;

pub struct ToolDescriptor {
    pub name: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub input_schema: fn() -> Value,
    pub build: fn(DateRange, &JsonObject) -> Result<ReportRequest>,
}

pub static TOOLS: [ToolDescriptor; 5] = [
    ToolDescriptor {
        name: "runReport",
        title: "Run report",
        description: "Run a report to get analytics data",
        input_schema: run_report_schema,
        build: build_run_report,
    },
    ToolDescriptor {
        name: "getPageViews",
        title: "Page views",
        description: "Get page view metrics for a specific date range",
        input_schema: page_views_schema,
        build: build_page_views,
    },
    ToolDescriptor {
        name: "getActiveUsers",
        title: "Active users",
        description: "Get active users metrics for a specific date range",
        input_schema: date_only_schema,
        build: build_active_users,
    },
    ToolDescriptor {
        name: "getEvents",
        title: "Events",
        description: "Get event metrics for a specific date range",
        input_schema: events_schema,
        build: build_events,
    },
    ToolDescriptor {
        name: "getUserBehavior",
        title: "User behavior",
        description: "Get user behavior metrics like session duration and bounce rate",
        input_schema: date_only_schema,
        build: build_user_behavior,
    },
];

#[must_use]
pub fn find_tool(name: &str) -> Option<&'static ToolDescriptor> {
    TOOLS.iter().find(|t| t.name == name)
}

/// The catalog as advertised by `tools/list`, in registry order.
#[must_use]
pub fn list_tools() -> Vec<Tool> {
    TOOLS.iter().map(ToolDescriptor::to_tool).collect()
}

impl ToolDescriptor {
    fn to_tool(&self) -> Tool {
        let schema = match (self.input_schema)() {
            Value::Object(obj) => obj,
            _ => JsonObject::new(),
        };
        let mut tool = Tool::new(self.name, self.description, Arc::new(schema));
        // Every tool issues a single read against the reporting API.
        tool.annotations = Some(ToolAnnotations {
            title: Some(self.title.to_string()),
            read_only_hint: Some(true),
            destructive_hint: Some(false),
            idempotent_hint: Some(true),
            open_world_hint: Some(true),
        });
        tool
    }
}

/// The date pair every tool requires.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateArgs {
    pub start_date: String,
    pub end_date: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RunReportArgs {
    metrics: Vec<Metric>,
    dimensions: Vec<Dimension>,
    #[serde(default)]
    dimension_filter: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct PageViewsArgs {
    #[serde(default)]
    dimensions: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventsArgs {
    #[serde(default)]
    event_name: Option<String>,
}

/// Deserialize `args` into the argument shape of `tool`.
///
/// # Errors
///
/// Returns [`ToolError::InvalidParams`] naming the tool and the serde failure.
pub fn parse_args<T: DeserializeOwned>(tool: &str, args: &JsonObject) -> Result<T> {
    serde_json::from_value(Value::Object(args.clone()))
        .map_err(|e| ToolError::InvalidParams(format!("Invalid arguments for {tool}: {e}")))
}

fn build_run_report(range: DateRange, args: &JsonObject) -> Result<ReportRequest> {
    let args: RunReportArgs = parse_args("runReport", args)?;
    let request = ReportRequest::new(range, args.dimensions, args.metrics);
    Ok(match args.dimension_filter {
        Some(Value::Null) | None => request,
        Some(expr) => request.with_dimension_filter(DimensionFilter::Expression(expr)),
    })
}

fn build_page_views(range: DateRange, args: &JsonObject) -> Result<ReportRequest> {
    let args: PageViewsArgs = parse_args("getPageViews", args)?;
    let dimensions = args
        .dimensions
        .unwrap_or_else(|| vec!["page".to_string()])
        .into_iter()
        .map(Dimension::new)
        .collect();
    Ok(ReportRequest::new(
        range,
        dimensions,
        vec![Metric::new("screenPageViews")],
    ))
}

fn build_active_users(range: DateRange, _args: &JsonObject) -> Result<ReportRequest> {
    Ok(ReportRequest::new(
        range,
        vec![Dimension::new("date")],
        vec![Metric::new("activeUsers"), Metric::new("newUsers")],
    ))
}

fn build_events(range: DateRange, args: &JsonObject) -> Result<ReportRequest> {
    let args: EventsArgs = parse_args("getEvents", args)?;
    let request = ReportRequest::new(
        range,
        vec![Dimension::new("eventName"), Dimension::new("date")],
        vec![Metric::new("eventCount")],
    );
    Ok(match args.event_name {
        Some(name) if !name.is_empty() => {
            request.with_dimension_filter(DimensionFilter::string_match("eventName", name))
        }
        _ => request,
    })
}

fn build_user_behavior(range: DateRange, _args: &JsonObject) -> Result<ReportRequest> {
    Ok(ReportRequest::new(
        range,
        vec![Dimension::new("date")],
        vec![
            Metric::new("averageSessionDuration"),
            Metric::new("bounceRate"),
            Metric::new("sessionsPerUser"),
        ],
    ))
}

fn date_properties() -> JsonObject {
    let mut props = JsonObject::new();
    props.insert(
        "startDate".to_string(),
        json!({ "type": "string", "description": "Start date in YYYY-MM-DD format" }),
    );
    props.insert(
        "endDate".to_string(),
        json!({ "type": "string", "description": "End date in YYYY-MM-DD format" }),
    );
    props
}

fn object_schema(mut props: JsonObject, extra: Value, required: &[&str]) -> Value {
    if let Value::Object(extra) = extra {
        props.extend(extra);
    }
    json!({
        "type": "object",
        "properties": props,
        "required": required,
    })
}

fn date_only_schema() -> Value {
    object_schema(date_properties(), Value::Null, &["startDate", "endDate"])
}

fn run_report_schema() -> Value {
    let named = json!({
        "type": "object",
        "properties": { "name": { "type": "string" } },
        "required": ["name"],
    });
    object_schema(
        date_properties(),
        json!({
            "dimensions": {
                "type": "array",
                "items": named,
                "description": "Dimensions to group by (e.g., page, country)",
            },
            "metrics": {
                "type": "array",
                "items": named,
                "description": "Metrics to include in the report",
            },
            "dimensionFilter": {
                "type": "object",
                "description": "Filter for dimensions",
            },
        }),
        &["startDate", "endDate", "metrics", "dimensions"],
    )
}

fn page_views_schema() -> Value {
    object_schema(
        date_properties(),
        json!({
            "dimensions": {
                "type": "array",
                "items": { "type": "string" },
                "description": "Dimensions to group by (e.g., page, country)",
            },
        }),
        &["startDate", "endDate"],
    )
}

fn events_schema() -> Value {
    object_schema(
        date_properties(),
        json!({
            "eventName": {
                "type": "string",
                "description": "Specific event name to filter by (optional)",
            },
        }),
        &["startDate", "endDate"],
    )
}
