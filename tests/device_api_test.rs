mod common;

use axum::http::{Method, StatusCode};
use common::TestApp;
use rust_decimal::Decimal;
use serde_json::{json, Value};
use stock_ledger_api::auth::consts as perm;

const WRITER_CAPS: &[&str] = &[perm::ORG_DEVICE_WRITE, perm::OWN_DEVICE_LOG_WRITE];

async fn create_device(app: &TestApp, token: &str, qty: i64) -> Value {
    let (status, body) = app
        .request_json(
            Method::POST,
            "/api/v1/stock/device",
            Some(json!({ "name": "Router", "type": "network", "qty": qty, "vendor": "Acme" })),
            Some(token),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "unexpected body: {body}");
    body["data"].clone()
}

fn price_of(log: &Value) -> Option<Decimal> {
    match &log["price"] {
        Value::String(s) => s.parse().ok(),
        Value::Number(n) => n.to_string().parse().ok(),
        _ => None,
    }
}

#[tokio::test]
async fn health_endpoint_reports_database() {
    let app = TestApp::new().await;
    let (status, body) = app
        .request_json(Method::GET, "/api/v1/health", None, None)
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["checks"]["database"], "healthy");
}

#[tokio::test]
async fn device_reads_are_public() {
    let app = TestApp::new().await;
    let token = app.token_for("writer", WRITER_CAPS);
    let created = create_device(&app, &token, 3).await;
    let device_id = created["device_id"].as_str().unwrap();

    let (status, body) = app
        .request_json(Method::GET, "/api/v1/stock/device", None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"], 1);
    assert_eq!(body["data"]["items"][0]["type"], "network");

    let (status, body) = app
        .request_json(
            Method::GET,
            &format!("/api/v1/stock/device/{device_id}"),
            None,
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["qty_available"], 3);
    assert_eq!(body["data"]["device_logs"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn recording_requires_token_and_both_capabilities() {
    let app = TestApp::new().await;
    let body = json!({ "name": "Router", "type": "network", "qty": 1 });

    let response = app
        .request(Method::POST, "/api/v1/stock/device", Some(body.clone()), None)
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let partial = app.token_for("writer", &[perm::ORG_DEVICE_WRITE]);
    let response = app
        .request(
            Method::POST,
            "/api/v1/stock/device",
            Some(body.clone()),
            Some(&partial),
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .request(
            Method::POST,
            "/api/v1/stock/device",
            Some(body),
            Some("not-a-jwt"),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn movement_response_carries_composite_messages() {
    let app = TestApp::new().await;
    let token = app.token_for("writer", WRITER_CAPS);
    let created = create_device(&app, &token, 10).await;
    let device_id = created["device_id"].as_str().unwrap();

    assert_eq!(created["log"]["author_id"], "writer");
    assert_eq!(created["log"]["mode"], "insert");

    let (status, body) = app
        .request_json(
            Method::POST,
            "/api/v1/stock/device",
            Some(json!({ "device_id": device_id, "qty": 4, "mode": "remove", "name": "" })),
            Some(&token),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["device"]["qty_available"], 6);
    assert_eq!(body["data"]["device"]["qty_purchased"], 10);
    assert_eq!(
        body["messages"],
        json!(["Device updated successfully", "Device log created successfully"])
    );
}

#[tokio::test]
async fn invalid_movements_are_bad_requests() {
    let app = TestApp::new().await;
    let token = app.token_for("writer", WRITER_CAPS);

    let (status, body) = app
        .request_json(
            Method::POST,
            "/api/v1/stock/device",
            Some(json!({ "qty": 2, "mode": "stock_remove" })),
            Some(&token),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("Device ID is required for stock removal"));

    let (status, _) = app
        .request_json(
            Method::POST,
            "/api/v1/stock/device",
            Some(json!({ "name": "Router", "type": "network", "qty": 0 })),
            Some(&token),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .request_json(
            Method::POST,
            "/api/v1/stock/device",
            Some(json!({ "device_id": uuid::Uuid::new_v4(), "qty": 2 })),
            Some(&token),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn reversing_last_movement_deletes_device() {
    let app = TestApp::new().await;
    let writer = app.token_for("writer", WRITER_CAPS);
    let created = create_device(&app, &writer, 5).await;
    let devicelog_id = created["devicelog_id"].as_str().unwrap();
    let device_id = created["device_id"].as_str().unwrap();

    let uri = format!("/api/v1/stock/device_log/{devicelog_id}");
    let response = app.request(Method::DELETE, &uri, None, Some(&writer)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let destroyer = app.token_for("ops", &[perm::ORG_DEVICE_LOG_DESTROY]);
    let (status, body) = app
        .request_json(Method::DELETE, &uri, None, Some(&destroyer))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["device_deleted"], true);
    assert_eq!(
        body["messages"],
        json!([
            "Device log deleted successfully",
            "Device updated successfully",
            "Device deleted successfully"
        ])
    );

    let (status, _) = app
        .request_json(
            Method::GET,
            &format!("/api/v1/stock/device/{device_id}"),
            None,
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn log_reads_need_read_capability() {
    let app = TestApp::new().await;
    let writer = app.token_for("writer", WRITER_CAPS);
    let created = create_device(&app, &writer, 2).await;
    let devicelog_id = created["devicelog_id"].as_str().unwrap();

    let response = app
        .request(Method::GET, "/api/v1/stock/device_log", None, Some(&writer))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let reader = app.token_for("auditor", &[perm::ORG_DEVICE_LOG_READ]);
    let (status, body) = app
        .request_json(
            Method::GET,
            "/api/v1/stock/device_log?page=1&limit=5",
            None,
            Some(&reader),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"], 1);
    assert_eq!(body["data"]["limit"], 5);

    let (status, body) = app
        .request_json(
            Method::GET,
            &format!("/api/v1/stock/device_log/{devicelog_id}"),
            None,
            Some(&reader),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["device"]["name"], "Router");
}

#[tokio::test]
async fn only_author_or_org_writer_may_edit_provenance() {
    let app = TestApp::new().await;
    let author = app.token_for("author", WRITER_CAPS);
    let created = create_device(&app, &author, 2).await;
    let uri = format!(
        "/api/v1/stock/device_log/{}",
        created["devicelog_id"].as_str().unwrap()
    );

    let stranger = app.token_for("stranger", &[perm::OWN_DEVICE_LOG_WRITE]);
    let response = app
        .request(
            Method::PATCH,
            &uri,
            Some(json!({ "vendor": "Other" })),
            Some(&stranger),
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let (status, body) = app
        .request_json(
            Method::PATCH,
            &uri,
            Some(json!({ "remarks": "boxed" })),
            Some(&author),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["remarks"], "boxed");
    assert_eq!(body["data"]["vendor"], "Acme");

    let supervisor = app.token_for("supervisor", &[perm::ORG_DEVICE_LOG_WRITE]);
    let (status, body) = app
        .request_json(
            Method::PATCH,
            &uri,
            Some(json!({ "vendor": "Globex", "price": "9.99" })),
            Some(&supervisor),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["vendor"], "Globex");
    assert_eq!(body["data"]["author_id"], "author");
    assert_eq!(price_of(&body["data"]), Some(Decimal::new(999, 2)));

    let reader = app.token_for("auditor", &[perm::ORG_DEVICE_LOG_READ]);
    let (status, body) = app.request_json(Method::GET, &uri, None, Some(&reader)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(price_of(&body["data"]), Some(Decimal::new(999, 2)));
}

#[tokio::test]
async fn device_edit_and_retire() {
    let app = TestApp::new().await;
    let admin = app.admin_token("admin");
    let created = create_device(&app, &admin, 7).await;
    let uri = format!(
        "/api/v1/stock/device/{}",
        created["device_id"].as_str().unwrap()
    );

    let (status, body) = app
        .request_json(
            Method::PATCH,
            &uri,
            Some(json!({ "description": "rack mounted" })),
            Some(&admin),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["description"], "rack mounted");
    assert_eq!(body["data"]["qty_available"], 7);

    let partial = app.token_for("ops", &[perm::ORG_DEVICE_DESTROY]);
    let response = app.request(Method::DELETE, &uri, None, Some(&partial)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let (status, body) = app
        .request_json(Method::DELETE, &uri, None, Some(&admin))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["deleted"], true);

    let (status, _) = app
        .request_json(Method::DELETE, &uri, None, Some(&admin))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
