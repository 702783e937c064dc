// libs/calendar-sync-cell/src/router.rs
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers::{self, SyncState};

pub fn sync_routes(state: Arc<SyncState>) -> Router {
    Router::new()
        .route("/{booking_id}", get(handlers::get_sync_status))
        .route("/run", post(handlers::run_retry_pass))
        .with_state(state)
}
