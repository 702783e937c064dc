// libs/scheduling-cell/src/router.rs
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers::{self, SchedulingState};

pub fn slot_routes(state: Arc<SchedulingState>) -> Router {
    Router::new()
        .route("/", get(handlers::list_slots))
        .with_state(state)
}

pub fn booking_routes(state: Arc<SchedulingState>) -> Router {
    Router::new()
        .route("/", post(handlers::confirm_booking))
        .route("/{booking_id}/status", get(handlers::get_booking_status))
        .route("/{booking_id}/cancel", post(handlers::cancel_booking))
        .route("/turns/stats", get(handlers::turn_stats))
        .with_state(state)
}
