use axum::{response::IntoResponse, Json};
use serde_json::{json, Value};

use lumenstat_core::Granularity;

/// `GET /api/granularities` - Catalog backing the dashboard's bucket picker.
pub async fn list_granularities() -> impl IntoResponse {
    let rows: Vec<Value> = Granularity::ALL
        .iter()
        .map(|granularity| {
            let bounds = granularity.bounds();
            json!({
                "name": granularity,
                "label_key": granularity.label_key(),
                "min_buckets": bounds.min_buckets,
                "max_buckets": bounds.max_buckets,
                "calendar": granularity.is_calendar(),
            })
        })
        .collect();

    Json(json!({ "data": rows }))
}
