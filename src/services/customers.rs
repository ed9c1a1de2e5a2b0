use std::sync::Arc;

use rust_decimal::Decimal;
use sea_orm::ActiveValue::Set;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use validator::Validate;

use crate::db::DbPool;
use crate::entities::{
    customer, customer::Entity as CustomerEntity, packaging_type,
    packaging_type::Entity as PackagingTypeEntity, sales_record,
    sales_record::Entity as SalesRecordEntity,
};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateCustomerInput {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
}

/// One purchase line on a customer bill.
#[derive(Debug, Clone, Serialize)]
pub struct CustomerBillLine {
    pub order_number: String,
    pub package_name: String,
    pub quantity: i32,
    pub total_cost: Decimal,
}

/// Everything a customer has purchased, with the grand total.
#[derive(Debug, Clone, Serialize)]
pub struct CustomerBill {
    pub customer_name: String,
    pub total_amount: Decimal,
    pub details: Vec<CustomerBillLine>,
}

/// Service for customer records and customer billing.
#[derive(Clone)]
pub struct CustomerService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl CustomerService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    fn connection(&self) -> &DatabaseConnection {
        &self.db_pool
    }

    async fn find_required(&self, id: i64) -> Result<customer::Model, ServiceError> {
        CustomerEntity::find_by_id(id)
            .one(self.connection())
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Customer {} not found", id)))
    }

    #[instrument(skip(self, input))]
    pub async fn create(&self, input: CreateCustomerInput) -> Result<customer::Model, ServiceError> {
        let model = customer::ActiveModel {
            id: Default::default(),
            name: Set(input.name),
            email: Set(input.email),
            phone: Set(input.phone),
            address: Set(input.address),
        };

        let created = model.insert(self.connection()).await?;

        self.event_sender
            .send_or_log(Event::CustomerCreated(created.id))
            .await;

        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: i64) -> Result<Option<customer::Model>, ServiceError> {
        Ok(CustomerEntity::find_by_id(id)
            .one(self.connection())
            .await?)
    }

    #[instrument(skip(self))]
    pub async fn list(
        &self,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<customer::Model>, u64), ServiceError> {
        let limit = limit.max(1);
        let page = page.max(1) - 1;

        let paginator = CustomerEntity::find()
            .order_by_asc(customer::Column::Id)
            .paginate(self.connection(), limit);
        let total = paginator.num_items().await?;
        let models = paginator.fetch_page(page).await?;

        Ok((models, total))
    }

    /// Bill for everything the customer has bought: one line per sales
    /// record, package names resolved, totals summed.
    #[instrument(skip(self))]
    pub async fn generate_bill(&self, customer_id: i64) -> Result<CustomerBill, ServiceError> {
        let db = self.connection();
        let customer = self.find_required(customer_id).await?;

        let records = SalesRecordEntity::find()
            .filter(sales_record::Column::CustomerId.eq(customer_id))
            .order_by_asc(sales_record::Column::Id)
            .find_also_related(PackagingTypeEntity)
            .all(db)
            .await?;

        let mut total_amount = Decimal::ZERO;
        let details = records
            .into_iter()
            .map(|(record, package): (sales_record::Model, Option<packaging_type::Model>)| {
                total_amount += record.total_cost;
                CustomerBillLine {
                    order_number: record.order_number,
                    package_name: package.map(|p| p.name).unwrap_or_default(),
                    quantity: record.quantity,
                    total_cost: record.total_cost,
                }
            })
            .collect();

        Ok(CustomerBill {
            customer_name: customer.name,
            total_amount,
            details,
        })
    }
}
