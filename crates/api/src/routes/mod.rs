pub mod applications;
pub mod health;
pub mod notifications;
pub mod reports;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// GET    /applications                 -> list_applications
/// POST   /applications                 -> create_application
/// POST   /applications/renew           -> renew_secret
/// POST   /notifications/run            -> run_reconciliation
/// GET    /reports/monthly              -> monthly_report
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/applications", applications::router())
        .nest("/notifications", notifications::router())
        .nest("/reports", reports::router())
}
