mod common;

use axum::http::{header, StatusCode};
use std::sync::Arc;

use patient_registry_api::api::{create_app, AppState};
use patient_registry_domain::health::ComponentStatus;
use patient_registry_domain::testing::MockHealthService;

use common::{get, initialize, send, test_app, test_config};

#[tokio::test]
async fn test_health_reports_components() {
    let app = test_app();

    let response = send(&app, get("/health", None)).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "ok");
    assert_eq!(response.body["environment"], "test");
    assert_eq!(response.body["version"], env!("CARGO_PKG_VERSION"));
    for component in ["api", "patient_store", "user_store"] {
        assert_eq!(response.body["components"][component]["status"], "healthy");
    }
    assert_eq!(
        response.body["services"],
        serde_json::json!(["auth-service", "patient-service", "search-service"])
    );
    assert!(response.body["uptime"].as_u64().is_some());
    assert!(response.body["timestamp"].as_str().is_some());
}

#[tokio::test]
async fn test_degraded_health_is_503() {
    initialize();
    let health = MockHealthService::new().with_component(
        "patient_store",
        ComponentStatus::Degraded,
        Some("slow".to_string()),
    );
    let app = create_app(AppState::new(test_config(true)).with_health(Arc::new(health)));

    let response = send(&app, get("/health", None)).await;

    assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(response.body["status"], "degraded");
    assert_eq!(response.body["components"]["patient_store"]["details"], "slow");
}

#[tokio::test]
async fn test_root_banner() {
    let app = test_app();

    let response = send(&app, get("/", None)).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["docs"], "/docs");
    assert_eq!(response.body["health"], "/health");
}

#[tokio::test]
async fn test_security_headers_and_docs() {
    let app = test_app();

    let response = send(&app, get("/health", None)).await;
    assert_eq!(
        response.headers.get("x-content-type-options").and_then(|v| v.to_str().ok()),
        Some("nosniff")
    );
    assert_eq!(
        response.headers.get("x-frame-options").and_then(|v| v.to_str().ok()),
        Some("DENY")
    );

    let openapi = send(&app, get("/api-docs/openapi.json", None)).await;
    assert_eq!(openapi.status, StatusCode::OK);
    assert_eq!(openapi.body["info"]["title"], "Patient Registry API");

    let cors = send(
        &app,
        axum::http::Request::builder()
            .uri("/health")
            .header(header::ORIGIN, "http://localhost:3000")
            .body(axum::body::Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(
        cors.headers
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .and_then(|v| v.to_str().ok()),
        Some("*")
    );
}
