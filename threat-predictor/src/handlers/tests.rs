use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    routing::get,
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use crate::config::{Config, ForecastConfig};
use crate::error::INVALID_REQUEST_MESSAGE;
use crate::{create_router, with_middleware, AppState};

fn test_state() -> AppState {
    AppState {
        config: Config {
            host: "127.0.0.1".to_string(),
            port: 0,
            environment: "test".to_string(),
            log_format: "pretty".to_string(),
            max_body_bytes: 64 * 1024,
            forecast: ForecastConfig::default(),
        },
    }
}

fn test_app() -> Router {
    create_router(test_state())
}

async fn post_predict(body: impl Into<Body>) -> (StatusCode, Value) {
    let response = test_app()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/predict")
                .header(header::CONTENT_TYPE, "application/json")
                .body(body.into())
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_health() {
    let response = test_app()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "threat-predictor");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(body["environment"], "test");
    assert!(body["timestamp"].is_i64());
}

#[tokio::test]
async fn test_single_record_forecast() {
    let (status, body) = post_predict(
        json!({
            "data": [{ "type": "phishing", "count": 10, "date": "2024-01-01" }],
            "forecastDays": 5
        })
        .to_string(),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([{ "type": "phishing", "forecast": 50 }]));
}

#[tokio::test]
async fn test_mixed_types_sorted() {
    let (status, body) = post_predict(
        json!({
            "data": [
                { "type": "ddos", "count": 4, "date": "2024-01-01" },
                { "type": "ddos", "count": 6, "date": "2024-01-02" },
                { "type": "malware", "count": 100, "date": "2024-01-01" }
            ],
            "forecastDays": 3
        })
        .to_string(),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let list = body.as_array().unwrap();
    assert_eq!(list.len(), 2);
    assert_eq!(list[0], json!({ "type": "malware", "forecast": 300 }));
    assert_eq!(list[1]["type"], "ddos");
    assert!(list[1]["forecast"].is_u64());
}

#[tokio::test]
async fn test_empty_data() {
    let (status, body) = post_predict(json!({ "data": [], "forecastDays": 5 }).to_string()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "error": INVALID_REQUEST_MESSAGE }));
}

#[tokio::test]
async fn test_invalid_horizon() {
    for days in [0, -3] {
        let (status, body) = post_predict(
            json!({
                "data": [{ "type": "ddos", "count": 1, "date": "2024-01-01" }],
                "forecastDays": days
            })
            .to_string(),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "error": INVALID_REQUEST_MESSAGE }));
    }
}

#[tokio::test]
async fn test_malformed_payloads_return_error_body() {
    let cases = [
        json!({ "data": [] }).to_string(),
        json!({ "data": [{ "type": "ddos", "count": -1, "date": "2024-01-01" }], "forecastDays": 2 }).to_string(),
        json!({ "data": [{ "type": "ddos", "date": "2024-01-01" }], "forecastDays": 2 }).to_string(),
        "{not json".to_string(),
    ];

    for raw in cases {
        let (status, body) = post_predict(raw.clone()).await;
        assert_eq!(status, StatusCode::OK, "payload: {}", raw);
        assert!(body["error"].is_string(), "payload: {}", raw);
    }
}

#[tokio::test]
async fn test_unparseable_dates_still_forecast() {
    let (_, body) = post_predict(
        json!({
            "data": [
                { "type": "insider", "count": 2, "date": "last tuesday" },
                { "type": "insider", "count": 4, "date": "??" },
                { "type": "spam", "count": 1, "date": "also bad" }
            ],
            "forecastDays": 2
        })
        .to_string(),
    )
    .await;

    let list = body.as_array().unwrap();
    assert_eq!(list.len(), 2);

    let find = |kind: &str| list.iter().find(|r| r["type"] == kind).cloned().unwrap();
    assert!(find("insider")["forecast"].is_u64());
    assert_eq!(find("spam"), json!({ "type": "spam", "forecast": 2 }));
}

#[tokio::test]
async fn test_oversized_body_returns_error_body() {
    let record = json!({ "type": "ddos", "count": 1, "date": "2024-01-01" });
    let data: Vec<Value> = std::iter::repeat(record).take(5_000).collect();
    let (status, body) = post_predict(json!({ "data": data, "forecastDays": 1 }).to_string()).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["error"].is_string());
}

#[test]
fn test_health_outside_async_test() {
    let app = test_app();
    let response = tokio_test::block_on(
        app.oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap()),
    )
    .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_panicking_route_returns_error_body() {
    async fn explode() -> &'static str {
        panic!("forecast worker exploded")
    }

    let routes = Router::new().route("/explode", get(explode));
    let app = with_middleware(routes, 1024).with_state(test_state());

    let response = app
        .oneshot(Request::builder().uri("/explode").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body, json!({ "error": "forecast worker exploded" }));
}
