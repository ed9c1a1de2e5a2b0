use axum::{
    extract::{Json, Path, State},
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::common::{map_service_error, success_response, validate_input};
use crate::errors::ApiError;
use crate::handlers::AppState;
use crate::services::BarcodeService;

fn default_priority() -> i32 {
    1
}

#[derive(Debug, Deserialize, Validate)]
pub struct PrintLabelRequest {
    pub packaging_type_id: i64,
    #[serde(default = "default_priority")]
    pub priority: i32,
}

#[derive(Debug, Serialize)]
pub struct PrintLabelResponse {
    pub message: String,
    pub queue_position: usize,
    pub barcode_number: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateLabelStatusRequest {
    pub packaging_type_id: i64,
    #[validate(length(min = 1, max = 64))]
    pub status: String,
}

/// Queue a label for printing. The label carries a freshly generated barcode
/// and enters the queue at its priority position.
pub async fn print_label(
    State(state): State<AppState>,
    Json(payload): Json<PrintLabelRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let packaging_type = state
        .services
        .packaging_types
        .get(payload.packaging_type_id)
        .await
        .map_err(map_service_error)?
        .ok_or_else(|| {
            ApiError::NotFound(format!(
                "Packaging type {} not found",
                payload.packaging_type_id
            ))
        })?;

    let barcode_number = BarcodeService::barcode_number(packaging_type.id);
    let name = format!("{} - {}", packaging_type.name, packaging_type.id);

    let outcome = state
        .services
        .label_queue
        .enqueue(
            packaging_type.id,
            name,
            payload.priority,
            barcode_number.clone(),
        )
        .await;

    let message = if outcome.duplicate {
        "Label already in the queue"
    } else {
        "Label added to printing queue"
    };

    Ok(success_response(PrintLabelResponse {
        message: message.to_string(),
        queue_position: outcome.position,
        barcode_number,
    }))
}

/// Current print queue, in priority order
pub async fn get_label_queue(State(state): State<AppState>) -> impl IntoResponse {
    success_response(state.services.label_queue.list().await)
}

/// Remove every queued label for a packaging type
pub async fn remove_label(
    State(state): State<AppState>,
    Path(packaging_type_id): Path<i64>,
) -> impl IntoResponse {
    let removed = state.services.label_queue.remove(packaging_type_id).await;

    success_response(serde_json::json!({
        "message": "Label removed from the queue",
        "removed": removed,
    }))
}

/// Update the status of the first queued label for a packaging type
pub async fn update_label_status(
    State(state): State<AppState>,
    Json(payload): Json<UpdateLabelStatusRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let updated = state
        .services
        .label_queue
        .update_status(payload.packaging_type_id, &payload.status)
        .await;

    let message = if updated {
        "Label status updated"
    } else {
        "Label not found in the queue"
    };

    Ok(success_response(serde_json::json!({ "message": message })))
}
