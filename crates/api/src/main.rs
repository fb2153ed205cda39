use std::net::SocketAddr;
use std::sync::Arc;

use spn_core::tracking::Notifier;
use spn_events::{EmailConfig, EmailDelivery, EmailNotifier};
use spn_graph::{GraphClient, GraphConfig};
use spn_worker::Reconciler;
use tokio::sync::Mutex;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use spn_api::config::ServerConfig;
use spn_api::router::build_app_router;
use spn_api::state::AppState;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "spn_api=debug,spn_worker=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env().expect("Invalid server configuration");
    tracing::info!(
        host = %config.host,
        port = config.port,
        secret_lifetime = config.secret_lifetime.describe(),
        "Loaded server configuration"
    );

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = spn_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    spn_db::health_check(&pool)
        .await
        .expect("Database health check failed");

    spn_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    // --- Graph ---
    let graph_config = GraphConfig::from_env().expect("Invalid Graph configuration");
    let graph = Arc::new(GraphClient::new(graph_config).expect("Failed to build Graph client"));
    tracing::info!(tenant_id = graph.tenant_id(), "Graph client ready");

    // --- Email ---
    let email_notifier = match EmailConfig::from_env() {
        Some(email) => EmailNotifier::new(EmailDelivery::new(email)),
        None => {
            tracing::warn!("SMTP_HOST not set, emails will not be delivered");
            EmailNotifier::disabled()
        }
    };
    let email_enabled = email_notifier.is_enabled();
    let notifier: Arc<dyn Notifier> = Arc::new(email_notifier);

    // --- Reconciler ---
    let reconciler = Reconciler::new(
        graph.clone(),
        Arc::new(spn_db::PgStateStore::new(pool.clone())),
        notifier.clone(),
        config.policy,
    );

    // --- App state ---
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        graph,
        notifier,
        email_enabled,
        reconciler,
        run_lock: Arc::new(Mutex::new(())),
    };

    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    tracing::info!("Graceful shutdown complete");
}

/// Wait for SIGINT (Ctrl-C) or SIGTERM on Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
