use axum::{
    extract::{Json, Path, State},
    response::IntoResponse,
};

use super::common::{
    created_response, map_service_error, no_content_response, success_response, validate_input,
};
use crate::errors::ApiError;
use crate::handlers::AppState;
use crate::services::units::{CreateUnitInput, UpdateUnitInput};

/// Create a unit of measurement
pub async fn create_unit(
    State(state): State<AppState>,
    Json(payload): Json<CreateUnitInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let created = state
        .services
        .units
        .create(payload)
        .await
        .map_err(map_service_error)?;

    Ok(created_response(created))
}

/// List units of measurement
pub async fn list_units(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let units = state
        .services
        .units
        .list()
        .await
        .map_err(map_service_error)?;

    Ok(success_response(units))
}

/// Get a unit of measurement by id
pub async fn get_unit(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let model = state
        .services
        .units
        .get(id)
        .await
        .map_err(map_service_error)?
        .ok_or_else(|| ApiError::NotFound(format!("Unit of measurement {} not found", id)))?;

    Ok(success_response(model))
}

/// Update a unit of measurement
pub async fn update_unit(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateUnitInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let updated = state
        .services
        .units
        .update(id, payload)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(updated))
}

/// Delete a unit of measurement
pub async fn delete_unit(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .services
        .units
        .delete(id)
        .await
        .map_err(map_service_error)?;

    Ok(no_content_response())
}
