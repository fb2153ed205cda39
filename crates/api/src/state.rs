use std::sync::Arc;

use spn_core::tracking::Notifier;
use spn_graph::GraphClient;
use spn_worker::Reconciler;
use tokio::sync::Mutex;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable; inner data is behind `Arc` or already `Clone`.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: spn_db::DbPool,
    pub config: Arc<ServerConfig>,
    /// Graph client used for provisioning; the reconciler holds its own handle.
    pub graph: Arc<GraphClient>,
    /// Outbound email for credential messages.
    pub notifier: Arc<dyn Notifier>,
    /// Whether SMTP is configured; reported by `/health`.
    pub email_enabled: bool,
    pub reconciler: Reconciler,
    /// Held for the duration of a reconciliation run so runs never overlap.
    pub run_lock: Arc<Mutex<()>>,
}
