pub mod handlers;

pub use handlers::*;

use crate::db::RecordStore;
use crate::service::ReconciliationService;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

/// 构建路由
pub fn router<S: RecordStore>(service: Arc<ReconciliationService<S>>) -> Router {
    let matching_routes = Router::new()
        .route("/api/run-matching", post(run_matching::<S>))
        .route("/api/confirm-match", post(confirm_match::<S>))
        .route("/api/matching-stats", get(matching_stats::<S>))
        .with_state(service);

    Router::new()
        .route("/health", get(health_check))
        .merge(matching_routes)
}
