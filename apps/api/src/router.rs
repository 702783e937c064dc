use std::sync::Arc;

use axum::{routing::get, Router};

use calendar_sync_cell::handlers::SyncState;
use calendar_sync_cell::router::sync_routes;
use scheduling_cell::handlers::SchedulingState;
use scheduling_cell::router::{booking_routes, slot_routes};

pub fn create_router(scheduling: Arc<SchedulingState>, sync: Arc<SyncState>) -> Router {
    Router::new()
        .route("/", get(|| async { "Clinic scheduler API is running!" }))
        .route("/health", get(|| async { "ok" }))
        .nest("/api/v1/slots", slot_routes(scheduling.clone()))
        .nest("/api/v1/bookings", booking_routes(scheduling))
        .nest("/api/v1/sync", sync_routes(sync))
}
