// libs/scheduling-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use shared_models::error::AppError;

use crate::models::{ConfirmBookingRequest, SchedulingError};
use crate::services::booking::BookingService;
use crate::services::slots::{group_by_day, public_slots, SlotGenerator};
use crate::services::turns::TurnAllocator;

pub struct SchedulingState {
    pub slots: Arc<SlotGenerator>,
    pub bookings: Arc<BookingService>,
    pub allocator: Arc<TurnAllocator>,
}

impl From<SchedulingError> for AppError {
    fn from(e: SchedulingError) -> Self {
        let code = e.reason_code();
        match e {
            SchedulingError::Validation(_) => AppError::ValidationError(e.to_string()),
            SchedulingError::ClosedDay | SchedulingError::OutsideHours => {
                AppError::Unprocessable(format!("{} ({})", e, code))
            }
            SchedulingError::Conflict { .. } => AppError::Conflict(e.to_string()),
            SchedulingError::PractitionerNotFound | SchedulingError::BookingNotFound => {
                AppError::NotFound(e.to_string())
            }
            SchedulingError::NoPractitioners => AppError::Unprocessable(e.to_string()),
            SchedulingError::System(msg) => AppError::Internal(msg),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SlotQueryParams {
    pub horizon_days: Option<i64>,
    pub grouped: Option<bool>,
}

/// Public slot listing. Practitioner identity never appears in the response;
/// callers hold a slot id until they confirm.
#[axum::debug_handler]
pub async fn list_slots(
    State(state): State<Arc<SchedulingState>>,
    Query(params): Query<SlotQueryParams>,
) -> Result<Json<Value>, AppError> {
    let internal = state.slots.generate(params.horizon_days).await?;
    let slots = public_slots(&internal);

    if params.grouped.unwrap_or(false) {
        let grouped = group_by_day(slots);
        return Ok(Json(json!({ "days": grouped })));
    }

    Ok(Json(json!({ "slots": slots })))
}

#[axum::debug_handler]
pub async fn confirm_booking(
    State(state): State<Arc<SchedulingState>>,
    Json(request): Json<ConfirmBookingRequest>,
) -> Result<Json<Value>, AppError> {
    let booking = state
        .bookings
        .confirm_booking(&request.slot_id, request.patient_id)
        .await?;

    Ok(Json(json!({
        "booking": booking,
        "message": "Booking confirmed",
    })))
}

#[axum::debug_handler]
pub async fn get_booking_status(
    State(state): State<Arc<SchedulingState>>,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let status = state.bookings.get_booking_status(booking_id).await?;
    Ok(Json(json!(status)))
}

#[axum::debug_handler]
pub async fn cancel_booking(
    State(state): State<Arc<SchedulingState>>,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let booking = state.bookings.cancel_booking(booking_id).await?;
    Ok(Json(json!({
        "booking": booking,
        "message": "Booking cancelled",
    })))
}

/// Rotation fairness snapshot, for operations dashboards.
#[axum::debug_handler]
pub async fn turn_stats(
    State(state): State<Arc<SchedulingState>>,
) -> Result<Json<Value>, AppError> {
    let stats = state.allocator.get_stats().await?;
    Ok(Json(json!(stats)))
}
