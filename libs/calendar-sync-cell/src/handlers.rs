// libs/calendar-sync-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;
use serde_json::{json, Value};
use uuid::Uuid;

use shared_models::error::AppError;

use crate::models::SyncError;
use crate::services::retry::RetryWorker;
use crate::services::synchronizer::HybridSynchronizer;

pub struct SyncState {
    pub synchronizer: Arc<HybridSynchronizer>,
    pub retry_worker: Arc<RetryWorker>,
}

impl From<SyncError> for AppError {
    fn from(e: SyncError) -> Self {
        match e {
            SyncError::RecordNotFound => AppError::NotFound(e.to_string()),
            SyncError::Storage(msg) => AppError::Internal(msg),
            SyncError::Provider(_) | SyncError::Timeout { .. } => {
                AppError::ExternalService(e.to_string())
            }
            SyncError::ContextUnavailable(msg) => AppError::Internal(msg),
        }
    }
}

#[axum::debug_handler]
pub async fn get_sync_status(
    State(state): State<Arc<SyncState>>,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let record = state
        .synchronizer
        .record_for(booking_id)
        .await?
        .ok_or_else(|| AppError::NotFound("No sync record for booking".to_string()))?;

    Ok(Json(json!(record)))
}

/// Manual trigger for the retry pass. Lets cron or any external scheduler
/// drive reconciliation instead of the in-process loop.
#[axum::debug_handler]
pub async fn run_retry_pass(
    State(state): State<Arc<SyncState>>,
) -> Result<Json<Value>, AppError> {
    let report = state.retry_worker.run_once(Utc::now()).await?;
    Ok(Json(json!(report)))
}
