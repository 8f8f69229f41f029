use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Deserialize;
use serde_json::json;

use lumenstat_core::{
    auto_granularity, AuxParams, BucketSequence, CompareMode, Granularity, QueryFilter, Selection,
};

use crate::{
    error::AppError,
    routes::query::{
        local_date_span, parse_defaulted_selection, parse_optional_bound, validate_website_id,
        Bound,
    },
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct QueryPlanRequest {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub granularity: Option<String>,
    pub timezone: Option<String>,
    pub compare_mode: Option<String>,
    pub compare_start_date: Option<String>,
    pub compare_end_date: Option<String>,
    #[serde(default)]
    pub filters: Vec<QueryFilter>,
    pub journey_steps: Option<u32>,
    pub journey_paths: Option<u32>,
}

/// `POST /api/websites/{id}/query-plan` - Resolve a date selection into
/// store queries and bucket sequences.
#[tracing::instrument(skip(state, request))]
pub async fn query_plan(
    State(state): State<Arc<AppState>>,
    Path(website_id): Path<String>,
    request: Result<Json<QueryPlanRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    validate_website_id(&website_id)?;
    let Json(request) = request?;

    let calendar = state.calendar(request.timezone.as_deref())?;
    let (start, end) = parse_defaulted_selection(
        &calendar,
        request.start_date.as_deref(),
        request.end_date.as_deref(),
        state.config.default_lookback_days,
    )?;

    let granularity = match request.granularity.as_deref() {
        Some(raw) => Granularity::parse(raw)?,
        None => {
            let (first, last) = local_date_span(&calendar, start, end);
            auto_granularity(first, last)
        }
    };

    let compare = CompareMode::parse(
        request.compare_mode.as_deref(),
        parse_optional_bound(
            &calendar,
            request.compare_start_date.as_deref(),
            "compare_start_date",
            Bound::Start,
        )?,
        parse_optional_bound(
            &calendar,
            request.compare_end_date.as_deref(),
            "compare_end_date",
            Bound::End,
        )?,
    )?;

    let selection = Selection {
        start,
        end,
        granularity,
        compare,
        filters: request.filters,
        aux: AuxParams {
            journey_steps: request.journey_steps,
            journey_paths: request.journey_paths,
        },
    };

    let plan = calendar.plan(&website_id, selection)?;
    tracing::debug!(
        timezone = calendar.timezone(),
        granularity = %granularity,
        buckets = plan.main_buckets.len(),
        compare = plan.comparison.as_ref().map(|meta| meta.mode),
        "Resolved query plan"
    );

    let main_labels = calendar.labels(&plan.main_buckets);
    let compare_labels = plan
        .compare_buckets
        .as_ref()
        .map(|seq| calendar.labels(seq));

    let data = json!({
        "main": plan.queries.main,
        "compare": plan.queries.compare,
        "granularity": granularity,
        "timezone": calendar.timezone(),
        "buckets": {
            "main": bucket_starts(&plan.main_buckets),
            "compare": plan.compare_buckets.as_ref().map(bucket_starts),
        },
        "labels": {
            "main": main_labels,
            "compare": compare_labels,
        },
    });

    if let Some(comparison) = plan.comparison {
        return Ok(Json(json!({ "data": data, "compare": comparison })));
    }

    Ok(Json(json!({ "data": data })))
}

fn bucket_starts(sequence: &BucketSequence) -> Vec<String> {
    sequence.starts.iter().map(rfc3339).collect()
}

fn rfc3339(instant: &DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Secs, true)
}
