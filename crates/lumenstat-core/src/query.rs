//! Mapping from a resolved [`AnalyticsQuery`] to the payloads consumed by
//! the columnar-store repositories.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::RangeError;
use crate::granularity::Granularity;
use crate::period::Period;

/// Datetime layout the analytics store expects, always in UTC.
pub const WIRE_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub const MAX_FILTER_VALUE_LEN: usize = 256;

pub const FILTER_COLUMNS: &[&str] = &[
    "page",
    "referrer",
    "country",
    "region",
    "city",
    "browser",
    "os",
    "device",
    "language",
    "screen",
    "event_name",
    "utm_source",
    "utm_medium",
    "utm_campaign",
    "hostname",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterOperator {
    #[serde(rename = "=")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryFilter {
    pub column: String,
    pub operator: FilterOperator,
    pub value: String,
}

impl QueryFilter {
    pub fn new(column: impl Into<String>, operator: FilterOperator, value: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            operator,
            value: value.into(),
        }
    }

    pub fn validate(&self) -> Result<(), RangeError> {
        if !FILTER_COLUMNS.contains(&self.column.as_str()) {
            return Err(RangeError::InvalidFilter(format!(
                "unknown column {:?}",
                self.column
            )));
        }
        let value = self.value.trim();
        if value.is_empty() {
            return Err(RangeError::InvalidFilter(format!(
                "{} value cannot be empty",
                self.column
            )));
        }
        if value.len() > MAX_FILTER_VALUE_LEN {
            return Err(RangeError::InvalidFilter(format!(
                "{} value is too long (max {MAX_FILTER_VALUE_LEN} characters)",
                self.column
            )));
        }
        Ok(())
    }
}

/// Parameters that ride along to the store untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuxParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub journey_steps: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub journey_paths: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalyticsQuery {
    pub main: Period,
    pub compare: Option<Period>,
    pub granularity: Granularity,
    pub filters: Vec<QueryFilter>,
    pub timezone: String,
    pub aux: AuxParams,
}

/// One outbound store query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteQuery {
    pub site_id: String,
    pub start_date: String,
    pub end_date: String,
    pub granularity: Granularity,
    pub query_filters: Vec<QueryFilter>,
    pub timezone: String,
    #[serde(flatten)]
    pub aux: AuxParams,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SiteQueries {
    pub main: SiteQuery,
    pub compare: Option<SiteQuery>,
}

pub fn format_wire(instant: DateTime<Utc>) -> String {
    instant.format(WIRE_DATETIME_FORMAT).to_string()
}

/// Build the main and (when a compare period exists) compare payloads.
pub fn build(site_id: &str, query: &AnalyticsQuery) -> SiteQueries {
    let to_site_query = |period: &Period| SiteQuery {
        site_id: site_id.to_string(),
        start_date: format_wire(period.start),
        end_date: format_wire(period.end),
        granularity: query.granularity,
        query_filters: query.filters.clone(),
        timezone: query.timezone.clone(),
        aux: query.aux.clone(),
    };

    SiteQueries {
        main: to_site_query(&query.main),
        compare: query.compare.as_ref().map(to_site_query),
    }
}
