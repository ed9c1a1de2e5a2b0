use axum::{
    extract::{Json, State},
    response::IntoResponse,
};
use serde::Deserialize;
use validator::Validate;

use super::common::{map_service_error, success_response, validate_input};
use crate::errors::ApiError;
use crate::handlers::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct GenerateBarcodeRequest {
    pub packaging_type_id: i64,
}

#[derive(Debug, Deserialize, Validate)]
pub struct BatchBarcodeRequest {
    #[validate(length(min = 1))]
    pub packaging_type_ids: Vec<i64>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ValidateBarcodeRequest {
    #[validate(length(min = 1, max = 64))]
    pub barcode_number: String,
}

/// Generate a barcode and printable label for a packaging type
pub async fn generate_barcode(
    State(state): State<AppState>,
    Json(payload): Json<GenerateBarcodeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let generated = state
        .services
        .barcodes
        .generate(payload.packaging_type_id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(generated))
}

/// Generate barcodes for a batch of packaging types
pub async fn generate_batch_barcodes(
    State(state): State<AppState>,
    Json(payload): Json<BatchBarcodeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let generated = state
        .services
        .barcodes
        .generate_batch(payload.packaging_type_ids)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(generated))
}

/// Check a barcode against known packaging types
pub async fn validate_barcode(
    State(state): State<AppState>,
    Json(payload): Json<ValidateBarcodeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let validation = state
        .services
        .barcodes
        .validate(&payload.barcode_number)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(validation))
}
