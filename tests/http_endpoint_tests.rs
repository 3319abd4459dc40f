use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use fieldgate::config::{DEFAULT_STATISTICS_PATH, load_protocols};
use fieldgate::{ServerConfig, StatisticsTree, build_router};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use std::path::Path;
use std::sync::Arc;
use tower::ServiceExt;

fn setup() -> (Router, Arc<StatisticsTree>) {
    let fixture = concat!(env!("CARGO_MANIFEST_DIR"), "/fixtures/protocols.json");
    let protocols = load_protocols(Path::new(fixture)).expect("fixture loads");
    let config = ServerConfig {
        listen_addr: "127.0.0.1:0".parse().unwrap(),
        statistics_path: DEFAULT_STATISTICS_PATH.to_string(),
        protocols,
    };
    config.validate().expect("fixture is valid");
    let statistics = Arc::new(StatisticsTree::new());
    (build_router(&config, statistics.clone()), statistics)
}

async fn send(router: &Router, method: &str, uri: &str, body: &str) -> (StatusCode, Value) {
    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .map(|v| v.to_str().unwrap().to_string());
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    if status == StatusCode::OK {
        assert_eq!(content_type.as_deref(), Some("application/json"));
    }
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

#[tokio::test]
async fn valid_and_invalid_fields_are_partitioned() {
    let (router, _) = setup();

    let (status, json) = send(
        &router,
        "POST",
        "/user",
        r#"{"name": "abc", "age": 11, "vip": "yes", "ignored": 1}"#,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        json,
        json!({
            "code": 0,
            "valid": {"name": "abc"},
            "invalid": {
                "age": "<err: max: 10, current: 11>",
                "vip": "<err: not bool>"
            }
        })
    );
}

#[tokio::test]
async fn missing_field_is_reported_as_missed() {
    let (router, statistics) = setup();

    let (_, json) = send(&router, "POST", "/user", r#"{"name": "abc", "age": 3}"#).await;

    assert_eq!(json["invalid"]["vip"], "<missed>");
    assert!(json["valid"].get("vip").is_none());
    assert_eq!(json["valid"]["age"], 3);
    assert_eq!(statistics.counter("/user.args.missed"), Some(1));
    assert_eq!(statistics.counter("/user.args.valid"), Some(2));
}

#[tokio::test]
async fn wrong_method_gets_request_error() {
    let (router, statistics) = setup();

    let (status, json) = send(&router, "GET", "/user", "").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, json!({"code": 10000, "msg": "method 'GET' is not supported"}));
    assert_eq!(statistics.counter("/user.request"), Some(1));
}

#[tokio::test]
async fn malformed_body_gets_request_error() {
    let (router, _) = setup();

    let (_, json) = send(&router, "POST", "/user", r#"{"name": "#).await;
    assert_eq!(json["code"], 10000);
    assert!(json["msg"].as_str().unwrap().contains("EOF"));

    let (_, json) = send(&router, "POST", "/user", "42").await;
    assert_eq!(json["code"], 10000);
    assert_eq!(json["msg"], "request body must be a JSON object, got integer");
}

#[tokio::test]
async fn statistics_endpoint_reports_hits() {
    let (router, _) = setup();

    let body = r#"{"name": "abc", "age": 3, "vip": true}"#;
    send(&router, "POST", "/user", body).await;
    send(&router, "POST", "/user", r#"{"name": "a"}"#).await;
    send(&router, "PUT", "/order", "{}").await;

    let (status, json) = send(&router, "GET", "/statistics", "").await;
    assert_eq!(status, StatusCode::OK);

    let first_len = body.len() as i64;
    assert_eq!(json["/statistics"]["request"], 1);
    assert_eq!(json["/user"]["request"], 2);
    assert_eq!(json["/user"]["total_size"], first_len + 13);
    assert_eq!(json["/user"]["args"], json!({"valid": 3, "invalid": 1, "missed": 2}));
    assert_eq!(json["/order"]["request"], 1);

    let (_, json) = send(&router, "POST", "/statistics", "").await;
    assert_eq!(json["/statistics"]["request"], 2);
}

#[tokio::test]
async fn unchecked_field_types_pass_through() {
    let (router, _) = setup();

    let (_, json) = send(
        &router,
        "PUT",
        "/order",
        r#"{"id": 7, "note": {"free": "form"}, "express": false}"#,
    )
    .await;

    assert_eq!(
        json,
        json!({
            "code": 0,
            "valid": {"id": 7, "note": {"free": "form"}, "express": false},
            "invalid": {}
        })
    );
}

#[tokio::test]
async fn unknown_route_is_not_found() {
    let (router, statistics) = setup();
    let (status, _) = send(&router, "POST", "/nope", "{}").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(statistics.is_empty());
}
