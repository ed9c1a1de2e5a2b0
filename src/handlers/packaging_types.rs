use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use validator::Validate;

use super::common::{
    created_response, map_service_error, no_content_response, success_response, validate_input,
    PaginatedResponse, PaginationParams,
};
use crate::errors::ApiError;
use crate::handlers::AppState;
use crate::services::packaging_types::{CreatePackagingTypeInput, UpdatePackagingTypeInput};

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(flatten)]
    pub pagination: PaginationParams,
    pub name: Option<String>,
    pub level: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AssignParentRequest {
    pub parent_id: i64,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateQuantityRequest {
    pub quantity: Decimal,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateCostRequest {
    pub cost: Decimal,
}

/// Create a new packaging type
pub async fn create_packaging_type(
    State(state): State<AppState>,
    Json(payload): Json<CreatePackagingTypeInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let created = state
        .services
        .packaging_types
        .create(payload)
        .await
        .map_err(map_service_error)?;

    Ok(created_response(created))
}

/// List packaging types, optionally filtered by name and level. Also serves
/// the search route.
pub async fn list_packaging_types(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let (models, total) = state
        .services
        .packaging_types
        .list(
            query.pagination.page,
            query.pagination.per_page,
            query.name,
            query.level,
        )
        .await
        .map_err(map_service_error)?;

    Ok(success_response(PaginatedResponse::new(
        models,
        query.pagination.page,
        query.pagination.per_page,
        total,
    )))
}

/// Get a packaging type by id
pub async fn get_packaging_type(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let model = state
        .services
        .packaging_types
        .get(id)
        .await
        .map_err(map_service_error)?
        .ok_or_else(|| ApiError::NotFound(format!("Packaging type {} not found", id)))?;

    Ok(success_response(model))
}

/// Update a packaging type
pub async fn update_packaging_type(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdatePackagingTypeInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let updated = state
        .services
        .packaging_types
        .update(id, payload)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(updated))
}

/// Delete a packaging type
pub async fn delete_packaging_type(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .services
        .packaging_types
        .delete(id)
        .await
        .map_err(map_service_error)?;

    Ok(no_content_response())
}

/// Link a packaging type under a parent
pub async fn assign_parent(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<AssignParentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let updated = state
        .services
        .packaging_types
        .assign_parent(id, payload.parent_id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(updated))
}

/// Set the absolute on-hand quantity
pub async fn update_quantity(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateQuantityRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let updated = state
        .services
        .packaging_types
        .update_quantity(id, payload.quantity)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(updated))
}

/// Reprice a packaging type
pub async fn update_cost(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateCostRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let updated = state
        .services
        .packaging_types
        .update_cost(id, payload.cost)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(updated))
}

/// Rolled-up cost of the packaging type and its whole subtree
pub async fn get_total_cost(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let total = state
        .services
        .hierarchy
        .get_total_cost(id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(total))
}

/// Pre-order bill of the packaging type's subtree
pub async fn get_package_details(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let bill = state
        .services
        .hierarchy
        .get_package_details(id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(bill))
}

/// Direct children of a packaging type
pub async fn get_children(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let children = state
        .services
        .hierarchy
        .get_children(id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(children))
}

/// Direct-child count of a packaging type
pub async fn count_children(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let children_count = state
        .services
        .hierarchy
        .count_children(id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(serde_json::json!({
        "parent_id": id,
        "children_count": children_count,
    })))
}

/// Full nested tree snapshot rooted at a packaging type
pub async fn get_hierarchy(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let tree = state
        .services
        .hierarchy
        .get_hierarchy(id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(tree))
}
