//! End-to-end API tests against PostgreSQL and a mocked Microsoft Graph.
//!
//! Each test gets a fresh database from `#[sqlx::test]`, which reads
//! `DATABASE_URL`.

mod common;

use std::sync::Arc;

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use common::{body_json, get, mount_token, post_empty, post_json, RecordingNotifier};
use serde_json::json;
use spn_db::models::tracked_application::CreateTrackedApplication;
use spn_db::repositories::TrackedApplicationRepo;
use sqlx::PgPool;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_no_existing_application(server: &MockServer, name: &str) {
    Mock::given(method("GET"))
        .and(path("/v1.0/applications"))
        .and(query_param("$filter", format!("displayName eq '{name}'")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "value": [] })))
        .mount(server)
        .await;
}

async fn mount_existing_application(server: &MockServer, name: &str, expiry: &str) {
    Mock::given(method("GET"))
        .and(path("/v1.0/applications"))
        .and(query_param("$filter", format!("displayName eq '{name}'")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [{
                "id": "obj-1",
                "appId": "client-1",
                "displayName": name,
                "passwordCredentials": [{ "keyId": "k1", "endDateTime": expiry }]
            }]
        })))
        .mount(server)
        .await;
}

async fn mount_add_password(server: &MockServer, end: &str) {
    Mock::given(method("POST"))
        .and(path("/v1.0/applications/obj-1/addPassword"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "keyId": "k2",
            "endDateTime": end,
            "secretText": "fresh-secret"
        })))
        .mount(server)
        .await;
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn health_reports_database_and_request_id(pool: PgPool) {
    let graph = MockServer::start().await;
    let app = common::build_test_app(pool, &graph, Arc::new(RecordingNotifier::default()));

    let response = get(app, "/health").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get("x-request-id").is_some());
    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["db_healthy"], true);
}

// ---------------------------------------------------------------------------
// Create
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn create_provisions_tracks_and_emails_credentials(pool: PgPool) {
    let graph = MockServer::start().await;
    mount_token(&graph).await;
    mount_no_existing_application(&graph, "billing").await;
    Mock::given(method("POST"))
        .and(path("/v1.0/applications"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": "obj-1",
            "appId": "client-1",
            "displayName": "billing"
        })))
        .expect(1)
        .mount(&graph)
        .await;
    mount_add_password(&graph, "2027-06-01T00:00:00Z").await;
    Mock::given(method("GET"))
        .and(path("/v1.0/users/jane@example.com"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "user-1" })))
        .mount(&graph)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1.0/applications/obj-1/owners/$ref"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&graph)
        .await;

    let notifier = Arc::new(RecordingNotifier::default());
    let app = common::build_test_app(pool.clone(), &graph, notifier.clone());

    let response = post_json(
        app,
        "/api/v1/applications",
        json!({ "user_name": "Jane", "user_email": "Jane@Example.com", "app_name": "billing" }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(json["data"]["client_id"], "client-1");
    assert_eq!(json["data"]["tenant_id"], common::TENANT);
    assert_eq!(json["data"]["owner_assigned"], true);
    assert!(json["data"].get("client_secret").is_none());

    let row = TrackedApplicationRepo::find_by_display_name(&pool, "billing")
        .await
        .unwrap()
        .expect("row tracked");
    assert_eq!(row.owner_email, "jane@example.com");
    assert_eq!(
        row.cached_expiry.unwrap().to_rfc3339(),
        "2027-06-01T00:00:00+00:00"
    );

    let sent = notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "jane@example.com");
    assert!(sent[0].body.contains("fresh-secret"));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn create_rejects_existing_application(pool: PgPool) {
    let graph = MockServer::start().await;
    mount_token(&graph).await;
    mount_existing_application(&graph, "billing", "2027-01-01T00:00:00Z").await;

    let app = common::build_test_app(pool, &graph, Arc::new(RecordingNotifier::default()));
    let response = post_json(
        app,
        "/api/v1/applications",
        json!({ "user_name": "Jane", "user_email": "jane@example.com", "app_name": "billing" }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(response).await["code"], "CONFLICT");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn create_rejects_invalid_email_without_calling_graph(pool: PgPool) {
    let graph = MockServer::start().await;
    let app = common::build_test_app(pool, &graph, Arc::new(RecordingNotifier::default()));

    let response = post_json(
        app,
        "/api/v1/applications",
        json!({ "user_name": "Jane", "user_email": "not-an-email", "app_name": "billing" }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");
    assert!(graph.received_requests().await.unwrap_or_default().is_empty());
}

// ---------------------------------------------------------------------------
// Renew
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn renew_resets_tracking_and_emails_owner(pool: PgPool) {
    let row = TrackedApplicationRepo::create(
        &pool,
        &CreateTrackedApplication {
            display_name: "billing".into(),
            client_id: Some("client-1".into()),
            owner_name: "Jane".into(),
            owner_email: "jane@example.com".into(),
            planned_expiry: Utc::now() - Duration::days(1),
        },
    )
    .await
    .unwrap();
    sqlx::query("UPDATE tracked_applications SET notified_expired = true WHERE id = $1")
        .bind(row.id)
        .execute(&pool)
        .await
        .unwrap();

    let graph = MockServer::start().await;
    mount_token(&graph).await;
    mount_existing_application(&graph, "billing", "2025-01-01T00:00:00Z").await;
    mount_add_password(&graph, "2027-06-01T00:00:00Z").await;

    let notifier = Arc::new(RecordingNotifier::default());
    let app = common::build_test_app(pool.clone(), &graph, notifier.clone());

    let response = post_json(app, "/api/v1/applications/renew", json!({ "app_name": "billing" })).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["credentials_emailed"], true);

    let row = TrackedApplicationRepo::find_by_id(&pool, row.id).await.unwrap().unwrap();
    assert!(!row.notified_expired);
    assert_eq!(
        row.cached_expiry.unwrap().to_rfc3339(),
        "2027-06-01T00:00:00+00:00"
    );
    assert_eq!(notifier.sent()[0].subject, "Secret Renewed: Service Principal 'billing'");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn renew_unknown_application_returns_404(pool: PgPool) {
    let graph = MockServer::start().await;
    let app = common::build_test_app(pool, &graph, Arc::new(RecordingNotifier::default()));

    let response = post_json(app, "/api/v1/applications/renew", json!({ "app_name": "ghost" })).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Reconciliation and reports
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn run_notifies_expiring_application_and_lists_state(pool: PgPool) {
    let expiry = (Utc::now() + Duration::days(5))
        .format("%Y-%m-%dT%H:%M:%SZ")
        .to_string();
    let expiry_ts = chrono::DateTime::parse_from_rfc3339(&expiry)
        .unwrap()
        .with_timezone(&Utc);
    TrackedApplicationRepo::create(
        &pool,
        &CreateTrackedApplication {
            display_name: "billing".into(),
            client_id: None,
            owner_name: "Jane".into(),
            owner_email: "jane@example.com".into(),
            planned_expiry: expiry_ts,
        },
    )
    .await
    .unwrap();

    let graph = MockServer::start().await;
    mount_token(&graph).await;
    mount_existing_application(&graph, "billing", &expiry).await;

    let notifier = Arc::new(RecordingNotifier::default());
    let app = common::build_test_app(pool.clone(), &graph, notifier.clone());

    let response = post_empty(app.clone(), "/api/v1/notifications/run?resend_interval_days=2").await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["processed"], 1);
    assert_eq!(json["data"]["notified"], 1);
    assert_eq!(notifier.sent()[0].subject, "[Upcoming Expiry] SP Secret for 'billing'");

    let list = body_json(get(app, "/api/v1/applications").await).await;
    assert_eq!(list["data"][0]["display_name"], "billing");
    assert_eq!(list["data"][0]["flags"]["upcoming"], true);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn run_rejects_negative_override(pool: PgPool) {
    let graph = MockServer::start().await;
    let app = common::build_test_app(pool, &graph, Arc::new(RecordingNotifier::default()));

    let response = post_empty(app, "/api/v1/notifications/run?expiry_threshold_days=-1").await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn run_rejects_oversized_override(pool: PgPool) {
    let graph = MockServer::start().await;
    let app = common::build_test_app(pool, &graph, Arc::new(RecordingNotifier::default()));

    let response = post_empty(
        app,
        "/api/v1/notifications/run?expiry_threshold_days=100000000000",
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn monthly_report_counts_applications_created_in_month(pool: PgPool) {
    for (name, email) in [("a", "x@example.com"), ("b", "X@example.com"), ("c", "y@example.com")] {
        let row = TrackedApplicationRepo::create(
            &pool,
            &CreateTrackedApplication {
                display_name: name.into(),
                client_id: None,
                owner_name: "Owner".into(),
                owner_email: email.into(),
                planned_expiry: Utc::now(),
            },
        )
        .await
        .unwrap();
        sqlx::query("UPDATE tracked_applications SET created_at = '2025-03-10T12:00:00Z' WHERE id = $1")
            .bind(row.id)
            .execute(&pool)
            .await
            .unwrap();
    }

    let graph = MockServer::start().await;
    let app = common::build_test_app(pool, &graph, Arc::new(RecordingNotifier::default()));

    let json = body_json(get(app, "/api/v1/reports/monthly?year=2025&month=3").await).await;

    assert_eq!(json["data"]["total_created"], 3);
    assert_eq!(json["data"]["unique_owners"], 1);
    assert_eq!(json["data"]["unique_emails"], 2);
}
