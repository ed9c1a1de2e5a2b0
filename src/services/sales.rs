use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::ActiveValue::Set;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel,
    PaginatorTrait, QueryFilter, QueryOrder,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use validator::Validate;

use crate::db::DbPool;
use crate::entities::{
    customer::Entity as CustomerEntity, sales_record, sales_record::Entity as SalesRecordEntity,
};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::hierarchy::HierarchyService;

pub const STATUS_PENDING: &str = "pending";
pub const STATUS_DELIVERED: &str = "delivered";

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateSaleInput {
    #[validate(length(min = 1, max = 64))]
    pub order_number: String,
    pub package_id: i64,
    #[validate(range(min = 1))]
    pub quantity: i32,
    pub customer_id: i64,
}

/// Status view for one order.
#[derive(Debug, Clone, Serialize)]
pub struct OrderStatus {
    pub order_id: i64,
    pub order_number: String,
    pub customer_name: String,
    pub order_date: chrono::DateTime<chrono::FixedOffset>,
    pub status: String,
    pub delivery_date: Option<chrono::DateTime<chrono::FixedOffset>>,
}

/// Counts shown on the fulfillment dashboard. Delayed orders are currently
/// approximated by the pending count.
#[derive(Debug, Clone, Serialize)]
pub struct FulfillmentDashboard {
    pub pending_orders: u64,
    pub completed_orders: u64,
    pub delayed_orders: u64,
}

/// Service for recording sales and tracking order fulfillment. Recording a
/// sale prices the package from its full hierarchy and pushes the quantity
/// decrement down the subtree.
#[derive(Clone)]
pub struct SalesService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    hierarchy: HierarchyService,
}

impl SalesService {
    pub fn new(
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
        hierarchy: HierarchyService,
    ) -> Self {
        Self {
            db_pool,
            event_sender,
            hierarchy,
        }
    }

    fn connection(&self) -> &DatabaseConnection {
        &self.db_pool
    }

    async fn find_required(&self, id: i64) -> Result<sales_record::Model, ServiceError> {
        SalesRecordEntity::find_by_id(id)
            .one(self.connection())
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Sales record {} not found", id)))
    }

    /// Records a sale: prices the package as its rolled-up hierarchy cost
    /// times the quantity sold, persists the record, then decrements on-hand
    /// quantities down the package's subtree. The decrement walk runs after
    /// the insert and is not transactional with it.
    #[instrument(skip(self, input))]
    pub async fn record_sale(
        &self,
        input: CreateSaleInput,
    ) -> Result<sales_record::Model, ServiceError> {
        let db = self.connection();

        CustomerEntity::find_by_id(input.customer_id)
            .one(db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Customer {} not found", input.customer_id))
            })?;

        // Also fails with NotFound when the package id is absent.
        let unit_cost = self.hierarchy.get_total_cost(input.package_id).await?;
        let total_cost = unit_cost.total_cost * Decimal::from(input.quantity);

        let model = sales_record::ActiveModel {
            id: Default::default(),
            order_number: Set(input.order_number),
            package_id: Set(input.package_id),
            quantity: Set(input.quantity),
            total_cost: Set(total_cost),
            customer_id: Set(input.customer_id),
            status: Set(STATUS_PENDING.to_string()),
            delivery_date: Set(None),
            created_at: Set(Utc::now().into()),
        };
        let record = model.insert(db).await?;

        self.hierarchy
            .propagate_quantity_decrement(input.package_id, Decimal::from(input.quantity))
            .await?;

        self.event_sender
            .send_or_log(Event::SaleRecorded {
                sales_record_id: record.id,
                package_id: record.package_id,
                quantity: record.quantity,
                total_cost: record.total_cost,
            })
            .await;

        Ok(record)
    }

    #[instrument(skip(self))]
    pub async fn list(
        &self,
        page: u64,
        limit: u64,
        status: Option<String>,
        customer_id: Option<i64>,
    ) -> Result<(Vec<sales_record::Model>, u64), ServiceError> {
        let limit = limit.max(1);
        let page = page.max(1) - 1;

        let mut query = SalesRecordEntity::find().order_by_asc(sales_record::Column::Id);
        if let Some(status) = status.filter(|s| !s.is_empty()) {
            query = query.filter(sales_record::Column::Status.eq(status));
        }
        if let Some(customer_id) = customer_id {
            query = query.filter(sales_record::Column::CustomerId.eq(customer_id));
        }

        let paginator = query.paginate(self.connection(), limit);
        let total = paginator.num_items().await?;
        let models = paginator.fetch_page(page).await?;

        Ok((models, total))
    }

    #[instrument(skip(self))]
    pub async fn order_status(&self, order_id: i64) -> Result<OrderStatus, ServiceError> {
        let record = self.find_required(order_id).await?;

        let customer = CustomerEntity::find_by_id(record.customer_id)
            .one(self.connection())
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Customer {} not found", record.customer_id))
            })?;

        Ok(OrderStatus {
            order_id: record.id,
            order_number: record.order_number,
            customer_name: customer.name,
            order_date: record.created_at,
            status: record.status,
            delivery_date: record.delivery_date,
        })
    }

    /// Marks an order delivered and stamps the delivery time.
    #[instrument(skip(self))]
    pub async fn deliver_package(&self, order_id: i64) -> Result<sales_record::Model, ServiceError> {
        let record = self.find_required(order_id).await?;

        let mut active = record.into_active_model();
        active.status = Set(STATUS_DELIVERED.to_string());
        active.delivery_date = Set(Some(Utc::now().into()));
        let updated = active.update(self.connection()).await?;

        self.event_sender
            .send_or_log(Event::PackageDelivered(order_id))
            .await;

        Ok(updated)
    }

    #[instrument(skip(self))]
    pub async fn fulfillment_dashboard(&self) -> Result<FulfillmentDashboard, ServiceError> {
        let records = SalesRecordEntity::find().all(self.connection()).await?;

        let pending_orders = records.iter().filter(|r| r.status == STATUS_PENDING).count() as u64;
        let completed_orders = records
            .iter()
            .filter(|r| r.status == STATUS_DELIVERED)
            .count() as u64;

        Ok(FulfillmentDashboard {
            pending_orders,
            completed_orders,
            delayed_orders: pending_orders,
        })
    }
}
