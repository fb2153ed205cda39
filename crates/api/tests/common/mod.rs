#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::json;
use spn_api::config::ServerConfig;
use spn_api::router::build_app_router;
use spn_api::state::AppState;
use spn_core::expiry::ExpiryPolicy;
use spn_core::provisioning::SecretLifetime;
use spn_core::tracking::Notifier;
use spn_graph::{GraphClient, GraphConfig};
use spn_worker::Reconciler;
use sqlx::PgPool;
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const TENANT: &str = "contoso";

/// Records every email instead of sending it.
#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<SentEmail>>,
}

#[derive(Debug, Clone)]
pub struct SentEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<SentEmail> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, recipient: &str, subject: &str, html_body: &str) -> bool {
        self.sent.lock().unwrap().push(SentEmail {
            to: recipient.to_string(),
            subject: subject.to_string(),
            body: html_body.to_string(),
        });
        true
    }
}

pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        policy: ExpiryPolicy::default(),
        secret_lifetime: SecretLifetime::Standard,
    }
}

/// Build the full application router against `pool` and a mocked Graph at
/// `graph`, recording outbound email in `notifier`.
pub fn build_test_app(
    pool: PgPool,
    graph: &MockServer,
    notifier: Arc<RecordingNotifier>,
) -> Router {
    let config = test_config();

    let mut graph_config = GraphConfig::new(TENANT, "automation-client", "automation-secret");
    graph_config.authority_host = graph.uri();
    graph_config.graph_endpoint = format!("{}/v1.0", graph.uri());
    graph_config.request_timeout = Duration::from_secs(5);
    let graph_client = Arc::new(GraphClient::new(graph_config).unwrap());

    let reconciler = Reconciler::new(
        graph_client.clone(),
        Arc::new(spn_db::PgStateStore::new(pool.clone())),
        notifier.clone(),
        config.policy,
    );

    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        graph: graph_client,
        notifier,
        email_enabled: true,
        reconciler,
        run_lock: Arc::new(tokio::sync::Mutex::new(())),
    };

    build_app_router(state, &config)
}

/// Mount a token endpoint that always succeeds.
pub async fn mount_token(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path(format!("/{TENANT}/oauth2/v2.0/token")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "test-token",
            "expires_in": 3599
        })))
        .mount(server)
        .await;
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    app.oneshot(
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
    )
    .await
    .unwrap()
}

pub async fn post_empty(app: Router, uri: &str) -> Response<Body> {
    app.oneshot(
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .body(Body::empty())
            .unwrap(),
    )
    .await
    .unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
