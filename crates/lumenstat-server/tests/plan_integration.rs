use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::Weekday;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use lumenstat_core::config::Config;
use lumenstat_server::app::build_app;
use lumenstat_server::state::AppState;

fn test_config() -> Config {
    Config {
        port: 0,
        ..Config::default()
    }
}

fn app_with(config: Config) -> axum::Router {
    let state = Arc::new(AppState::new(config).expect("state"));
    build_app(state)
}

async fn json_body(response: axum::http::Response<Body>) -> Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("read body")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("parse JSON")
}

async fn post_plan(app: axum::Router, website_id: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(format!("/api/websites/{website_id}/query-plan"))
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("build request");

    let response = app.oneshot(request).await.expect("request");
    let status = response.status();
    (status, json_body(response).await)
}

// ============================================================
// Successful plans
// ============================================================

#[tokio::test]
async fn test_previous_period_plan_has_matching_buckets() {
    let (status, json) = post_plan(
        app_with(test_config()),
        "site_1",
        json!({
            "start_date": "2024-03-01",
            "end_date": "2024-03-07",
            "granularity": "day",
            "timezone": "UTC",
            "compare_mode": "previous_period"
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK, "{json}");
    let data = &json["data"];
    assert_eq!(data["granularity"], "day");
    assert_eq!(data["timezone"], "UTC");

    assert_eq!(data["main"]["siteId"], "site_1");
    assert_eq!(data["main"]["startDate"], "2024-03-01 00:00:00");
    assert_eq!(data["main"]["endDate"], "2024-03-08 00:00:00");
    assert_eq!(data["compare"]["startDate"], "2024-02-23 00:00:00");
    assert_eq!(data["compare"]["endDate"], "2024-03-01 00:00:00");

    let main = data["buckets"]["main"].as_array().expect("main buckets");
    let compare = data["buckets"]["compare"].as_array().expect("compare buckets");
    assert_eq!(main.len(), 7);
    assert_eq!(compare.len(), 7);
    assert_eq!(main[0], "2024-03-01T00:00:00Z");
    assert_eq!(compare[0], "2024-02-23T00:00:00Z");
    assert_eq!(data["labels"]["main"][6], "2024-03-07");

    assert_eq!(json["compare"]["mode"], "previous_period");
    assert_eq!(json["compare"]["primary_range"], json!(["2024-03-01", "2024-03-07"]));
    assert_eq!(json["compare"]["comparison_range"], json!(["2024-02-23", "2024-02-29"]));
}

#[tokio::test]
async fn test_no_compare_omits_metadata() {
    let (status, json) = post_plan(
        app_with(test_config()),
        "site_1",
        json!({
            "start_date": "2024-03-01",
            "end_date": "2024-03-01",
            "granularity": "hour",
            "timezone": "Europe/Berlin"
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK, "{json}");
    assert!(json.get("compare").is_none());
    assert!(json["data"]["compare"].is_null());
    assert!(json["data"]["buckets"]["compare"].is_null());

    // Berlin is UTC+1 in March before the switch.
    assert_eq!(json["data"]["main"]["startDate"], "2024-02-29 23:00:00");
    assert_eq!(json["data"]["main"]["timezone"], "Europe/Berlin");
    assert_eq!(
        json["data"]["buckets"]["main"].as_array().map(Vec::len),
        Some(24)
    );
    assert_eq!(json["data"]["labels"]["main"][0], "2024-03-01 00:00");
}

#[tokio::test]
async fn test_missing_granularity_is_chosen_from_span() {
    let (status, json) = post_plan(
        app_with(test_config()),
        "site_1",
        json!({
            "start_date": "2024-01-01",
            "end_date": "2024-03-31",
            "timezone": "UTC"
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK, "{json}");
    assert_eq!(json["data"]["granularity"], "month");
    assert_eq!(
        json["data"]["labels"]["main"],
        json!(["2024-01", "2024-02", "2024-03"])
    );
}

#[tokio::test]
async fn test_filters_and_journey_params_are_forwarded() {
    let (status, json) = post_plan(
        app_with(test_config()),
        "site_1",
        json!({
            "start_date": "2024-03-01",
            "end_date": "2024-03-02",
            "granularity": "day",
            "timezone": "UTC",
            "filters": [{ "column": "country", "operator": "=", "value": "DE" }],
            "journey_steps": 4
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK, "{json}");
    let main = &json["data"]["main"];
    assert_eq!(
        main["queryFilters"],
        json!([{ "column": "country", "operator": "=", "value": "DE" }])
    );
    assert_eq!(main["journeySteps"], 4);
    assert!(main.get("journeyPaths").is_none());
}

#[tokio::test]
async fn test_configured_week_start_shapes_week_buckets() {
    let config = Config {
        week_start: Weekday::Sun,
        ..test_config()
    };
    let (status, json) = post_plan(
        app_with(config),
        "site_1",
        json!({
            "start_date": "2024-03-06",
            "end_date": "2024-03-20",
            "granularity": "week",
            "timezone": "UTC"
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK, "{json}");
    assert_eq!(
        json["data"]["labels"]["main"],
        json!(["2024-03-03", "2024-03-10", "2024-03-17"])
    );
}

// ============================================================
// Rejected selections
// ============================================================

async fn assert_rejected(body: Value, code: &str) -> Value {
    let (status, json) = post_plan(app_with(test_config()), "site_1", body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{json}");
    assert_eq!(json["error"]["code"], code);
    json
}

#[tokio::test]
async fn test_custom_compare_with_fewer_buckets_is_rejected() {
    assert_rejected(
        json!({
            "start_date": "2024-03-01",
            "end_date": "2024-03-05",
            "granularity": "day",
            "timezone": "UTC",
            "compare_mode": "custom",
            "compare_start_date": "2024-02-01",
            "compare_end_date": "2024-02-04"
        }),
        "compare_bucket_mismatch",
    )
    .await;
}

#[tokio::test]
async fn test_custom_compare_without_range_is_rejected() {
    assert_rejected(
        json!({
            "start_date": "2024-03-01",
            "end_date": "2024-03-05",
            "granularity": "day",
            "timezone": "UTC",
            "compare_mode": "custom"
        }),
        "missing_custom_range",
    )
    .await;
}

#[tokio::test]
async fn test_unknown_granularity_is_rejected() {
    assert_rejected(
        json!({
            "start_date": "2024-03-01",
            "end_date": "2024-03-05",
            "granularity": "fortnight",
            "timezone": "UTC"
        }),
        "invalid_granularity",
    )
    .await;
}

#[tokio::test]
async fn test_unknown_timezone_is_rejected() {
    assert_rejected(
        json!({
            "start_date": "2024-03-01",
            "end_date": "2024-03-05",
            "granularity": "day",
            "timezone": "Mars/Olympus_Mons"
        }),
        "invalid_timezone",
    )
    .await;
}

#[tokio::test]
async fn test_malformed_date_names_the_field() {
    let json = assert_rejected(
        json!({
            "start_date": "2024-13-01",
            "end_date": "2024-03-05",
            "granularity": "day",
            "timezone": "UTC"
        }),
        "invalid_date",
    )
    .await;
    assert_eq!(json["error"]["field"], "start_date");
}

#[tokio::test]
async fn test_reversed_range_is_rejected() {
    assert_rejected(
        json!({
            "start_date": "2024-03-05",
            "end_date": "2024-03-01",
            "granularity": "day",
            "timezone": "UTC"
        }),
        "invalid_period",
    )
    .await;
}

#[tokio::test]
async fn test_too_many_minute_buckets_is_rejected() {
    assert_rejected(
        json!({
            "start_date": "2024-03-01",
            "end_date": "2024-03-03",
            "granularity": "minute",
            "timezone": "UTC"
        }),
        "period_out_of_bounds",
    )
    .await;
}

#[tokio::test]
async fn test_unknown_filter_column_is_rejected() {
    assert_rejected(
        json!({
            "start_date": "2024-03-01",
            "end_date": "2024-03-02",
            "granularity": "day",
            "timezone": "UTC",
            "filters": [{ "column": "password", "operator": "=", "value": "x" }]
        }),
        "invalid_filter",
    )
    .await;
}

#[tokio::test]
async fn test_oversized_website_id_returns_404() {
    let website_id = "a".repeat(65);
    let (status, json) = post_plan(
        app_with(test_config()),
        &website_id,
        json!({ "granularity": "day" }),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"]["code"], "not_found");
}

async fn post_raw(content_type: Option<&str>, body: &str) -> (StatusCode, Value) {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/api/websites/site_1/query-plan");
    if let Some(content_type) = content_type {
        builder = builder.header("content-type", content_type);
    }
    let request = builder
        .body(Body::from(body.to_string()))
        .expect("build request");

    let response = app_with(test_config())
        .oneshot(request)
        .await
        .expect("request");
    let status = response.status();
    (status, json_body(response).await)
}

#[tokio::test]
async fn test_malformed_json_body_returns_error_envelope() {
    let (status, json) = post_raw(Some("application/json"), "{\"start_date\": ").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "invalid_body");
    assert_eq!(json["error"]["message"], "Invalid JSON syntax");
    assert!(json["error"]["field"].is_null());
}

#[tokio::test]
async fn test_mistyped_body_field_returns_error_envelope() {
    let (status, json) = post_raw(Some("application/json"), r#"{"journey_steps": "four"}"#).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "invalid_body");
}

#[tokio::test]
async fn test_missing_content_type_returns_error_envelope() {
    let (status, json) = post_raw(None, "{}").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "invalid_body");
    assert_eq!(
        json["error"]["message"],
        "Missing Content-Type: application/json header"
    );
}

// ============================================================
// Catalog
// ============================================================

#[tokio::test]
async fn test_granularities_lists_bounds() {
    let request = Request::builder()
        .method("GET")
        .uri("/api/granularities")
        .body(Body::empty())
        .expect("build request");

    let response = app_with(test_config())
        .oneshot(request)
        .await
        .expect("request");
    assert_eq!(response.status(), StatusCode::OK);

    let json = json_body(response).await;
    let rows = json["data"].as_array().expect("rows");
    assert_eq!(rows.len(), 5);
    assert_eq!(rows[0]["name"], "minute");
    assert_eq!(rows[0]["max_buckets"], 2880);
    assert_eq!(rows[0]["calendar"], false);
    assert_eq!(rows[4]["name"], "month");
    assert_eq!(rows[4]["calendar"], true);
}
