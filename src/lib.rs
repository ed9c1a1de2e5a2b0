//! Packhouse API Library
//!
//! Inventory and packaging backend: packaging type hierarchies with cost
//! rollups and quantity propagation, an in-process label print queue,
//! warehouses, items, suppliers, customers, and sales.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod services;

use axum::{extract::State, response::Json, routing::get, Router};
use chrono::Utc;
use sea_orm::DatabaseConnection;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::auth::consts as perm;
use crate::auth::AuthRouterExt;

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub event_sender: events::EventSender,
    pub services: handlers::AppServices,
}

// Common response wrappers
#[derive(Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResponseMeta>,
}

#[derive(Serialize)]
pub struct ResponseMeta {
    pub timestamp: String,
}

impl ResponseMeta {
    fn capture() -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            meta: Some(ResponseMeta::capture()),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message),
            meta: Some(ResponseMeta::capture()),
        }
    }
}

/// Standard API result type for JSON responses
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, errors::ServiceError>;

/// Full v1 API surface, grouped by permission.
pub fn api_v1_routes() -> Router<AppState> {
    // Packaging type routes with permission gating
    let packaging_read = Router::new()
        .route(
            "/packaging-types",
            get(handlers::packaging_types::list_packaging_types),
        )
        .route(
            "/packaging-types/search",
            get(handlers::packaging_types::list_packaging_types),
        )
        .route(
            "/packaging-types/:id",
            get(handlers::packaging_types::get_packaging_type),
        )
        .route(
            "/packaging-types/:id/total-cost",
            get(handlers::packaging_types::get_total_cost),
        )
        .route(
            "/packaging-types/:id/package-details",
            get(handlers::packaging_types::get_package_details),
        )
        .route(
            "/packaging-types/:id/children",
            get(handlers::packaging_types::get_children),
        )
        .route(
            "/packaging-types/:id/children-count",
            get(handlers::packaging_types::count_children),
        )
        .route(
            "/packaging-types/:id/hierarchy",
            get(handlers::packaging_types::get_hierarchy),
        )
        .with_permission(perm::PACKAGING_READ);

    let packaging_manage = Router::new()
        .route(
            "/packaging-types",
            axum::routing::post(handlers::packaging_types::create_packaging_type),
        )
        .route(
            "/packaging-types/:id",
            axum::routing::put(handlers::packaging_types::update_packaging_type),
        )
        .route(
            "/packaging-types/:id",
            axum::routing::delete(handlers::packaging_types::delete_packaging_type),
        )
        .route(
            "/packaging-types/:id/assign-parent",
            axum::routing::put(handlers::packaging_types::assign_parent),
        )
        .route(
            "/packaging-types/:id/quantity",
            axum::routing::put(handlers::packaging_types::update_quantity),
        )
        .route(
            "/packaging-types/:id/cost",
            axum::routing::patch(handlers::packaging_types::update_cost),
        )
        .with_permission(perm::PACKAGING_MANAGE);

    // Barcode operations read packaging data only
    let barcodes = Router::new()
        .route(
            "/barcodes/generate",
            axum::routing::post(handlers::barcodes::generate_barcode),
        )
        .route(
            "/barcodes/batch",
            axum::routing::post(handlers::barcodes::generate_batch_barcodes),
        )
        .route(
            "/barcodes/validate",
            axum::routing::post(handlers::barcodes::validate_barcode),
        )
        .with_permission(perm::PACKAGING_READ);

    // Material routes with permission gating
    let materials_read = Router::new()
        .route(
            "/packaging-materials",
            get(handlers::packaging_materials::list_materials),
        )
        .route(
            "/packaging-materials/filter-by-cost",
            get(handlers::packaging_materials::filter_by_cost),
        )
        .route(
            "/packaging-materials/statistics",
            get(handlers::packaging_materials::get_statistics),
        )
        .route(
            "/packaging-materials/usage-report",
            get(handlers::packaging_materials::get_usage_report),
        )
        .route(
            "/packaging-materials/:id",
            get(handlers::packaging_materials::get_material),
        )
        .with_permission(perm::MATERIALS_READ);

    let materials_manage = Router::new()
        .route(
            "/packaging-materials",
            axum::routing::post(handlers::packaging_materials::create_material),
        )
        .route(
            "/packaging-materials/:id",
            axum::routing::put(handlers::packaging_materials::update_material),
        )
        .route(
            "/packaging-materials/:id",
            axum::routing::delete(handlers::packaging_materials::delete_material),
        )
        .with_permission(perm::MATERIALS_MANAGE);

    // Warehouse routes with permission gating
    let warehouses_read = Router::new()
        .route("/warehouses", get(handlers::warehouses::list_warehouses))
        .route(
            "/warehouses/overview",
            get(handlers::warehouses::get_overview),
        )
        .route("/warehouses/:id", get(handlers::warehouses::get_warehouse))
        .with_permission(perm::WAREHOUSES_READ);

    let warehouses_manage = Router::new()
        .route(
            "/warehouses",
            axum::routing::post(handlers::warehouses::create_warehouse),
        )
        .route(
            "/warehouses/:id",
            axum::routing::put(handlers::warehouses::update_warehouse),
        )
        .route(
            "/warehouses/:id",
            axum::routing::delete(handlers::warehouses::delete_warehouse),
        )
        .route(
            "/warehouses/allocate",
            axum::routing::post(handlers::warehouses::allocate_materials),
        )
        .with_permission(perm::WAREHOUSES_MANAGE);

    // Item routes with permission gating
    let items_read = Router::new()
        .route("/items", get(handlers::items::list_items))
        .route("/items/reorder-alerts", get(handlers::items::get_reorder_alerts))
        .route("/items/:id", get(handlers::items::get_item))
        .route(
            "/items/:id/suggest-packaging",
            get(handlers::items::suggest_packaging),
        )
        .with_permission(perm::ITEMS_READ);

    let items_manage = Router::new()
        .route("/items", axum::routing::post(handlers::items::create_item))
        .route("/items/:id", axum::routing::put(handlers::items::update_item))
        .route(
            "/items/:id",
            axum::routing::delete(handlers::items::delete_item),
        )
        .with_permission(perm::ITEMS_MANAGE);

    // Units of measurement
    let units = Router::new()
        .route("/units", get(handlers::units::list_units))
        .route("/units", axum::routing::post(handlers::units::create_unit))
        .route("/units/:id", get(handlers::units::get_unit))
        .route("/units/:id", axum::routing::put(handlers::units::update_unit))
        .route(
            "/units/:id",
            axum::routing::delete(handlers::units::delete_unit),
        )
        .with_permission(perm::UNITS_MANAGE);

    // Label queue routes with permission gating
    let labels_read = Router::new()
        .route("/labels/queue", get(handlers::labels::get_label_queue))
        .with_permission(perm::LABELS_READ);

    let labels_print = Router::new()
        .route(
            "/labels/print",
            axum::routing::post(handlers::labels::print_label),
        )
        .with_permission(perm::LABELS_PRINT);

    let labels_manage = Router::new()
        .route(
            "/labels/:packaging_type_id",
            axum::routing::delete(handlers::labels::remove_label),
        )
        .route(
            "/labels/status",
            axum::routing::patch(handlers::labels::update_label_status),
        )
        .with_permission(perm::LABELS_MANAGE);

    // Sales routes with permission gating
    let sales_read = Router::new()
        .route("/sales", get(handlers::sales::list_sales_records))
        .route(
            "/sales/fulfillment-dashboard",
            get(handlers::sales::get_fulfillment_dashboard),
        )
        .route("/sales/:id/status", get(handlers::sales::get_order_status))
        .with_permission(perm::SALES_READ);

    let sales_create = Router::new()
        .route(
            "/sales",
            axum::routing::post(handlers::sales::create_sales_record),
        )
        .route(
            "/sales/:id/deliver",
            axum::routing::post(handlers::sales::deliver_package),
        )
        .with_permission(perm::SALES_CREATE);

    // Customers and suppliers
    let customers = Router::new()
        .route(
            "/customers",
            axum::routing::post(handlers::customers::create_customer),
        )
        .route("/customers", get(handlers::customers::list_customers))
        .route("/customers/:id", get(handlers::customers::get_customer))
        .route(
            "/customers/:id/bill",
            get(handlers::customers::get_customer_bill),
        )
        .with_permission(perm::CUSTOMERS_MANAGE);

    let suppliers = Router::new()
        .route(
            "/suppliers",
            axum::routing::post(handlers::suppliers::create_supplier),
        )
        .route("/suppliers", get(handlers::suppliers::list_suppliers))
        .route("/suppliers/:id", get(handlers::suppliers::get_supplier))
        .route(
            "/suppliers/:id/materials",
            axum::routing::post(handlers::suppliers::attach_materials),
        )
        .route(
            "/suppliers/:id/material-requests",
            axum::routing::post(handlers::suppliers::request_materials),
        )
        .with_permission(perm::SUPPLIERS_MANAGE);

    Router::new()
        .route("/status", get(api_status))
        .route("/health", get(health_check))
        .merge(packaging_read)
        .merge(packaging_manage)
        .merge(barcodes)
        .merge(materials_read)
        .merge(materials_manage)
        .merge(warehouses_read)
        .merge(warehouses_manage)
        .merge(items_read)
        .merge(items_manage)
        .merge(units)
        .merge(labels_read)
        .merge(labels_print)
        .merge(labels_manage)
        .merge(sales_read)
        .merge(sales_create)
        .merge(customers)
        .merge(suppliers)
}

async fn api_status() -> Result<Json<ApiResponse<Value>>, errors::ServiceError> {
    let status_data = json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "packhouse-api",
        "timestamp": Utc::now().to_rfc3339(),
    });

    Ok(Json(ApiResponse::success(status_data)))
}

async fn health_check(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Value>>, errors::ServiceError> {
    let db_status = match state.db.ping().await {
        Ok(_) => "healthy",
        Err(_) => "unhealthy",
    };

    let health_data = json!({
        "status": db_status,
        "checks": {
            "database": db_status,
        },
        "timestamp": Utc::now().to_rfc3339(),
    });

    Ok(Json(ApiResponse::success(health_data)))
}
