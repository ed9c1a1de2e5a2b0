use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
};
use serde::Deserialize;

use super::common::{
    created_response, map_service_error, success_response, validate_input, PaginatedResponse,
    PaginationParams,
};
use crate::errors::ApiError;
use crate::handlers::AppState;
use crate::services::sales::CreateSaleInput;

#[derive(Debug, Deserialize)]
pub struct SalesListQuery {
    #[serde(flatten)]
    pub pagination: PaginationParams,
    pub status: Option<String>,
    pub customer_id: Option<i64>,
}

/// Record a sale: persists the record and decrements on-hand quantities
/// down the package's subtree
pub async fn create_sales_record(
    State(state): State<AppState>,
    Json(payload): Json<CreateSaleInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let record = state
        .services
        .sales
        .record_sale(payload)
        .await
        .map_err(map_service_error)?;

    Ok(created_response(record))
}

/// List sales records, optionally filtered by status and customer
pub async fn list_sales_records(
    State(state): State<AppState>,
    Query(query): Query<SalesListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let (models, total) = state
        .services
        .sales
        .list(
            query.pagination.page,
            query.pagination.per_page,
            query.status,
            query.customer_id,
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

/// Status view for one order
pub async fn get_order_status(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let status = state
        .services
        .sales
        .order_status(id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(status))
}

/// Mark an order delivered
pub async fn deliver_package(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let record = state
        .services
        .sales
        .deliver_package(id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(serde_json::json!({
        "message": "Package delivered successfully",
        "order_id": record.id,
    })))
}

/// Fulfillment dashboard counts
pub async fn get_fulfillment_dashboard(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let dashboard = state
        .services
        .sales
        .fulfillment_dashboard()
        .await
        .map_err(map_service_error)?;

    Ok(success_response(dashboard))
}
