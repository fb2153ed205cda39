use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use spn_events::{EmailConfig, EmailDelivery, EmailNotifier};
use spn_graph::{GraphClient, GraphConfig};
use spn_worker::{scheduler, Reconciler, WorkerConfig};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "spn_worker=debug,spn_graph=info,spn_events=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = WorkerConfig::from_env().expect("Invalid worker configuration");
    let graph_config = GraphConfig::from_env().expect("Invalid Graph configuration");
    tracing::info!(
        tenant_id = %graph_config.tenant_id,
        threshold_days = config.policy.expiry_threshold.num_days(),
        resend_days = config.policy.resend_interval.num_days(),
        interval_secs = config.interval.map(|d| d.as_secs()),
        "Loaded worker configuration"
    );

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = spn_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    spn_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database ready");

    // --- Collaborators ---
    let graph = GraphClient::new(graph_config).expect("Failed to build Graph client");
    let notifier = match EmailConfig::from_env() {
        Some(email) => EmailNotifier::new(EmailDelivery::new(email)),
        None => {
            tracing::warn!("SMTP_HOST not set, notifications will be reported as failed");
            EmailNotifier::disabled()
        }
    };

    let reconciler = Reconciler::new(
        Arc::new(graph),
        Arc::new(spn_db::PgStateStore::new(pool)),
        Arc::new(notifier),
        config.policy,
    );

    match config.interval {
        None => run_once(&reconciler).await,
        Some(period) => {
            let cancel = CancellationToken::new();
            let handle = tokio::spawn(scheduler::run(reconciler, period, cancel.clone()));

            shutdown_signal().await;
            tracing::info!("Shutdown requested, waiting for the current run");
            cancel.cancel();
            let _ = tokio::time::timeout(Duration::from_secs(60), handle).await;
            tracing::info!("Worker stopped");
        }
    }
}

/// Single cron-style run. Exits non-zero only when the run could not start.
async fn run_once(reconciler: &Reconciler) {
    match reconciler.run(Utc::now()).await {
        Ok(summary) => match serde_json::to_string(&summary) {
            Ok(json) => tracing::info!(summary = %json, "Reconciliation complete"),
            Err(e) => tracing::warn!(error = %e, "Could not serialize run summary"),
        },
        Err(e) => {
            tracing::error!(error = %e, "Reconciliation run failed");
            std::process::exit(1);
        }
    }
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
}
