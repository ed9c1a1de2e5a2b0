use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
};

use super::common::{
    created_response, map_service_error, success_response, validate_input, PaginatedResponse,
    PaginationParams,
};
use crate::errors::ApiError;
use crate::handlers::AppState;
use crate::services::customers::CreateCustomerInput;

/// Create a customer
pub async fn create_customer(
    State(state): State<AppState>,
    Json(payload): Json<CreateCustomerInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let created = state
        .services
        .customers
        .create(payload)
        .await
        .map_err(map_service_error)?;

    Ok(created_response(created))
}

/// List customers
pub async fn list_customers(
    State(state): State<AppState>,
    Query(pagination): Query<PaginationParams>,
) -> Result<impl IntoResponse, ApiError> {
    let (models, total) = state
        .services
        .customers
        .list(pagination.page, pagination.per_page)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(PaginatedResponse::new(
        models,
        pagination.page,
        pagination.per_page,
        total,
    )))
}

/// Get a customer by id
pub async fn get_customer(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let model = state
        .services
        .customers
        .get(id)
        .await
        .map_err(map_service_error)?
        .ok_or_else(|| ApiError::NotFound(format!("Customer {} not found", id)))?;

    Ok(success_response(model))
}

/// Bill covering everything the customer has purchased
pub async fn get_customer_bill(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let bill = state
        .services
        .customers
        .generate_bill(id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(bill))
}
