//! End-to-end executor behavior against a mock Kyrazo API.

use std::time::{Duration, Instant};

use kyrazo::{
    CancellationToken, ClientConfig, ErrorKind, EventTarget, HttpClient, HttpMethod, Kyrazo,
    PublishEventPayload, PublishOptions, QueryParams, RequestOptions, RequestSpec,
};
use serde_json::{json, Value};
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_for(server: &MockServer, max_retries: u32, timeout: Duration) -> ClientConfig {
    ClientConfig::builder("kz_test_key")
        .base_url(server.uri())
        .max_retries(max_retries)
        .timeout(timeout)
        .build()
        .unwrap()
}

fn client_for(server: &MockServer, max_retries: u32) -> HttpClient {
    HttpClient::new(config_for(server, max_retries, Duration::from_secs(5))).unwrap()
}

fn error_body(code: &str, message: &str) -> Value {
    json!({ "success": false, "error": { "code": code, "message": message } })
}

// ===========================================
// Retry policy
// ===========================================

#[tokio::test]
async fn test_server_errors_use_every_attempt_with_backoff() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/sources/p1"))
        .respond_with(
            ResponseTemplate::new(500).set_body_json(error_body("INTERNAL_ERROR", "boom")),
        )
        .expect(3)
        .mount(&server)
        .await;

    let http = client_for(&server, 2);
    let started = Instant::now();
    let err = http
        .get::<Value>("/v1/sources/p1", QueryParams::new(), RequestOptions::new())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Server);
    assert_eq!(err.message(), "boom");
    assert_eq!(err.status(), Some(500));
    // 100ms + 200ms of backoff between the three attempts
    assert!(started.elapsed() >= Duration::from_millis(300));
}

#[tokio::test]
async fn test_zero_retries_means_one_attempt() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let http = client_for(&server, 0);
    let err = http
        .get::<Value>("/v1/sources/p1", QueryParams::new(), RequestOptions::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Server);
    assert_eq!(err.message(), "An unexpected error occurred");
}

#[tokio::test]
async fn test_recovers_after_transient_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/targets/p1"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/targets/p1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
        .expect(1)
        .mount(&server)
        .await;

    let http = client_for(&server, 3);
    let response = http
        .get::<Value>("/v1/targets/p1", QueryParams::new(), RequestOptions::new())
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(response.data()["ok"], true);
}

#[tokio::test]
async fn test_connection_failures_use_every_attempt_with_backoff() {
    // Bind and release an ephemeral port so nothing is listening on it.
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let config = ClientConfig::builder("kz_test_key")
        .base_url(format!("http://127.0.0.1:{port}"))
        .max_retries(2)
        .build()
        .unwrap();
    let http = HttpClient::new(config).unwrap();

    let started = Instant::now();
    let err = http
        .get::<Value>("/v1/sources/p1", QueryParams::new(), RequestOptions::new())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Network);
    assert!(err.is_retryable());
    assert!(!err.is_timeout());
    assert!(err.message().starts_with("Network request failed"));
    // 100ms + 200ms of backoff between the three attempts
    assert!(started.elapsed() >= Duration::from_millis(300));
}

#[tokio::test]
async fn test_client_errors_are_not_retried() {
    for (status, code, kind) in [
        (400, "INVALID_PAYLOAD", ErrorKind::Validation),
        (401, "UNAUTHORIZED", ErrorKind::Authentication),
        (403, "LIMIT_EXCEEDED", ErrorKind::QuotaExceeded),
        (404, "NOT_FOUND", ErrorKind::NotFound),
    ] {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(status).set_body_json(error_body(code, "nope")))
            .expect(1)
            .mount(&server)
            .await;

        let http = client_for(&server, 3);
        let err = http
            .post::<Value, _>("/v1/events/p1/publish", Some(&json!({})), RequestOptions::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), kind, "status {status}");
        assert_eq!(err.code(), code);
        assert_eq!(err.status(), Some(status));
    }
}

#[tokio::test]
async fn test_rate_limit_is_terminal_and_carries_hints() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "success": false,
            "error": {
                "code": "RATE_LIMIT_EXCEEDED",
                "message": "Slow down",
                "retryAfter": 5,
                "remainingRequests": 0,
                "requestId": "req_body"
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let http = client_for(&server, 3);
    let err = http
        .post::<Value, _>("/v1/events/p1/publish", Some(&json!({})), RequestOptions::new())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::RateLimit);
    assert_eq!(err.retry_after(), Some(5));
    assert_eq!(err.remaining_requests(), Some(0));
    assert_eq!(err.request_id(), Some("req_body"));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_rate_limit_falls_back_to_headers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(429)
                .insert_header("Retry-After", "30")
                .insert_header("X-RateLimit-Remaining", "0")
                .insert_header("X-Request-Id", "req_header"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let http = client_for(&server, 2);
    let err = http
        .get::<Value>("/v1/sources/p1", QueryParams::new(), RequestOptions::new())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::RateLimit);
    assert_eq!(err.message(), "An unexpected error occurred");
    assert_eq!(err.retry_after(), Some(30));
    assert_eq!(err.remaining_requests(), Some(0));
    assert_eq!(err.request_id(), Some("req_header"));
}

#[tokio::test]
async fn test_unrecognized_status_is_unknown() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(418).set_body_json(error_body("TEAPOT", "short and stout")))
        .expect(1)
        .mount(&server)
        .await;

    let http = client_for(&server, 3);
    let err = http
        .delete::<Value>("/v1/targets/p1/t1", RequestOptions::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unknown);
    assert_eq!(err.code(), "TEAPOT");
    assert_eq!(err.to_string(), "short and stout (HTTP 418, code TEAPOT)");
}

// ===========================================
// Timeout and cancellation
// ===========================================

#[tokio::test]
async fn test_timeout_is_reported_and_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .expect(1)
        .mount(&server)
        .await;

    let http = HttpClient::new(config_for(&server, 3, Duration::from_millis(100))).unwrap();
    let err = http
        .get::<Value>("/v1/sources/p1", QueryParams::new(), RequestOptions::new())
        .await
        .unwrap_err();

    assert!(err.is_timeout());
    assert_eq!(err.kind(), ErrorKind::Network);
    assert_eq!(err.message(), "Request timed out after 100ms");
}

#[tokio::test]
async fn test_per_call_timeout_overrides_config() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&server)
        .await;

    let http = client_for(&server, 0);
    let options = RequestOptions::new().timeout(Duration::from_millis(50));
    let err = http
        .get::<Value>("/v1/sources/p1", QueryParams::new(), options)
        .await
        .unwrap_err();
    assert_eq!(err.message(), "Request timed out after 50ms");
}

#[tokio::test]
async fn test_external_cancellation_aborts_in_flight_call() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .expect(1)
        .mount(&server)
        .await;

    let http = client_for(&server, 3);
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let started = Instant::now();
    let err = http
        .get::<Value>(
            "/v1/sources/p1",
            QueryParams::new(),
            RequestOptions::new().cancel_token(token),
        )
        .await
        .unwrap_err();

    assert!(err.is_cancelled());
    assert!(!err.is_timeout());
    assert_eq!(err.message(), "Request was cancelled");
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn test_pre_cancelled_token_sends_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let http = client_for(&server, 3);
    let token = CancellationToken::new();
    token.cancel();
    let err = http
        .get::<Value>(
            "/v1/sources/p1",
            QueryParams::new(),
            RequestOptions::new().cancel_token(token),
        )
        .await
        .unwrap_err();
    assert!(err.is_cancelled());
}

#[tokio::test]
async fn test_cancellation_during_backoff_stops_retrying() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    // The first attempt fails at once; the token fires inside the 100ms backoff.
    let http = client_for(&server, 1);
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(30)).await;
        trigger.cancel();
    });

    let err = http
        .get::<Value>(
            "/v1/sources/p1",
            QueryParams::new(),
            RequestOptions::new().cancel_token(token),
        )
        .await
        .unwrap_err();
    assert!(err.is_cancelled());
}

// ===========================================
// Request shaping
// ===========================================

#[tokio::test]
async fn test_query_skips_absent_values() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/targets/p1"))
        .and(query_param("a", "1"))
        .and(query_param("c", "x"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let http = client_for(&server, 0);
    let query = QueryParams::new()
        .with("a", 1)
        .with_opt("b", None::<String>)
        .with("c", "x");
    http.get::<Vec<Value>>("/v1/targets/p1", query, RequestOptions::new())
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests[0].url.query(), Some("a=1&c=x"));
}

#[tokio::test]
async fn test_identical_calls_give_identical_results() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "id": "src_1" }))
                .insert_header("x-request-id", "req_1"),
        )
        .expect(2)
        .mount(&server)
        .await;

    let http = client_for(&server, 0);
    let spec = RequestSpec::new(HttpMethod::Get, "/v1/sources/p1/src_1");
    let first = http.execute::<Value>(spec.clone()).await.unwrap();
    let second = http.execute::<Value>(spec).await.unwrap();

    assert_eq!(first.data(), second.data());
    assert_eq!(first.status(), second.status());
    assert_eq!(first.header("x-request-id"), Some("req_1"));
}

#[tokio::test]
async fn test_default_headers_and_user_agent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(header("x-team", "edge"))
        .and(header("x-api-key", "kz_test_key"))
        .and(header("user-agent", kyrazo::http::SDK_USER_AGENT))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let config = ClientConfig::builder("kz_test_key")
        .base_url(server.uri())
        .default_header("X-Team", "core")
        .build()
        .unwrap();
    let http = HttpClient::new(config).unwrap();
    let response = http
        .get::<Value>(
            "/v1/sources/p1",
            QueryParams::new(),
            RequestOptions::new().header("X-Team", "edge"),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), 204);
    assert_eq!(response.data(), &Value::String(String::new()));
}

// ===========================================
// Events resource
// ===========================================

#[tokio::test]
async fn test_publish_event_with_idempotency_key() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/events/proj_1/publish"))
        .and(header("Idempotency-Key", "order-42"))
        .and(body_json(json!({
            "webhookId": "wh_1",
            "eventType": "order.paid",
            "payload": { "orderId": 42 },
            "targets": [{ "targetUrl": "https://example.com/hook" }]
        })))
        .respond_with(ResponseTemplate::new(202).set_body_json(json!({
            "status": "queued",
            "eventId": "evt_1",
            "targetsCount": 1,
            "queued_at": "2026-10-18T00:00:00Z"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let kyrazo = Kyrazo::new(config_for(&server, 0, Duration::from_secs(5))).unwrap();
    let payload = PublishEventPayload {
        webhook_id: "wh_1".to_string(),
        event_type: "order.paid".to_string(),
        payload: json!({ "orderId": 42 }),
        targets: vec![EventTarget::url("https://example.com/hook")],
        meta: None,
    };
    let queued = kyrazo
        .events()
        .publish("proj_1", &payload, PublishOptions::idempotency_key("order-42"))
        .await
        .unwrap();

    assert_eq!(queued.status, "queued");
    assert_eq!(queued.event_id, "evt_1");
    assert_eq!(queued.targets_count, Some(1));
}

#[tokio::test]
async fn test_publish_escapes_project_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/events/..%2F..%2Fadmin%3Fx%3D/publish"))
        .respond_with(
            ResponseTemplate::new(202).set_body_json(json!({ "status": "queued", "eventId": "evt_1" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let kyrazo = Kyrazo::new(config_for(&server, 0, Duration::from_secs(5))).unwrap();
    let payload = PublishEventPayload {
        webhook_id: "wh_1".to_string(),
        event_type: "user.created".to_string(),
        payload: json!({}),
        targets: vec![EventTarget::id("tgt_1")],
        meta: None,
    };
    kyrazo
        .events()
        .publish("../../admin?x=", &payload, PublishOptions::default())
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].url.query(), None);
}

#[tokio::test]
async fn test_publish_batch() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/events/proj_1/publish/batch"))
        .respond_with(ResponseTemplate::new(202).set_body_json(json!([
            { "status": "queued", "eventId": "evt_1" },
            { "status": "queued", "eventId": "evt_2" }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let kyrazo = Kyrazo::new(config_for(&server, 0, Duration::from_secs(5))).unwrap();
    let event = |n: u32| PublishEventPayload {
        webhook_id: "wh_1".to_string(),
        event_type: "user.created".to_string(),
        payload: json!({ "n": n }),
        targets: vec![EventTarget::id("tgt_1")],
        meta: None,
    };
    let items = kyrazo
        .events()
        .publish_batch("proj_1", &[event(1), event(2)], PublishOptions::default())
        .await
        .unwrap();

    assert_eq!(items.len(), 2);
    assert_eq!(items[1].event_id, "evt_2");
}

#[tokio::test]
async fn test_publish_rejects_empty_project_without_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(202))
        .expect(0)
        .mount(&server)
        .await;

    let kyrazo = Kyrazo::new(config_for(&server, 0, Duration::from_secs(5))).unwrap();
    let payload = PublishEventPayload {
        webhook_id: "wh_1".to_string(),
        event_type: "user.created".to_string(),
        payload: json!({}),
        targets: vec![],
        meta: None,
    };
    let err = kyrazo
        .events()
        .publish("", &payload, PublishOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}
