//! Wire types for `properties/{id}:runReport`.
//!
//! Only the request side is typed. Responses are handed back as opaque JSON.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// An inclusive `YYYY-MM-DD` date range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRange {
    pub start_date: String,
    pub end_date: String,
}

impl DateRange {
    pub fn new(start_date: impl Into<String>, end_date: impl Into<String>) -> Self {
        Self {
            start_date: start_date.into(),
            end_date: end_date.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimension {
    pub name: String,
}

impl Dimension {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metric {
    pub name: String,
}

impl Metric {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// `dimensionFilter` of a report request.
///
/// `Field` is the single string-match filter used by the built-in templates. `Expression` carries
/// an arbitrary `FilterExpression` supplied by a caller; it is forwarded without inspection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DimensionFilter {
    Field { filter: FieldFilter },
    Expression(Value),
}

impl DimensionFilter {
    /// Match rows whose `field_name` dimension equals `value`.
    pub fn string_match(field_name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Field {
            filter: FieldFilter {
                field_name: field_name.into(),
                string_filter: StringFilter {
                    value: value.into(),
                },
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldFilter {
    pub field_name: String,
    pub string_filter: StringFilter,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StringFilter {
    pub value: String,
}

/// Body of a `runReport` call. The property is part of the URL, not the body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRequest {
    pub date_ranges: Vec<DateRange>,
    #[serde(default)]
    pub dimensions: Vec<Dimension>,
    #[serde(default)]
    pub metrics: Vec<Metric>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimension_filter: Option<DimensionFilter>,
}

impl ReportRequest {
    /// A request over a single date range with no filter.
    #[must_use]
    pub fn new(date_range: DateRange, dimensions: Vec<Dimension>, metrics: Vec<Metric>) -> Self {
        Self {
            date_ranges: vec![date_range],
            dimensions,
            metrics,
            dimension_filter: None,
        }
    }

    #[must_use]
    pub fn with_dimension_filter(mut self, filter: DimensionFilter) -> Self {
        self.dimension_filter = Some(filter);
        self
    }
}
