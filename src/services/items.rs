use std::sync::Arc;

use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::ActiveValue::Set;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, ModelTrait,
    PaginatorTrait, QueryFilter, QueryOrder,
};
use serde::Deserialize;
use tracing::instrument;
use validator::Validate;

use crate::db::DbPool;
use crate::entities::{
    item, item::Entity as ItemEntity, packaging_type,
    packaging_type::Entity as PackagingTypeEntity, unit_of_measurement::Entity as UomEntity,
    warehouse::Entity as WarehouseEntity,
};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateItemInput {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    pub description: String,
    pub item_type: String,
    pub uom_id: i64,
    pub cost: Decimal,
    pub weight: f64,
    pub volume: f64,
    pub length: f64,
    pub width: f64,
    pub height: f64,
    pub packaging_type_id: i64,
    #[validate(range(min = 0))]
    pub stock_quantity: i32,
    #[validate(range(min = 0))]
    pub reorder_level: i32,
    pub warehouse_id: i64,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateItemInput {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    pub description: Option<String>,
    pub item_type: Option<String>,
    pub uom_id: Option<i64>,
    pub cost: Option<Decimal>,
    pub weight: Option<f64>,
    pub volume: Option<f64>,
    pub length: Option<f64>,
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub packaging_type_id: Option<i64>,
    pub stock_quantity: Option<i32>,
    pub reorder_level: Option<i32>,
    pub warehouse_id: Option<i64>,
}

/// Service for stocked items: CRUD, low-stock alerts, and packaging
/// suggestions.
#[derive(Clone)]
pub struct ItemService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl ItemService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    fn connection(&self) -> &DatabaseConnection {
        &self.db_pool
    }

    async fn find_required(&self, id: i64) -> Result<item::Model, ServiceError> {
        ItemEntity::find_by_id(id)
            .one(self.connection())
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Item {} not found", id)))
    }

    /// Rejects items referencing a unit, packaging type, or warehouse that
    /// does not exist.
    async fn check_references(
        &self,
        uom_id: i64,
        packaging_type_id: i64,
        warehouse_id: i64,
    ) -> Result<(), ServiceError> {
        let db = self.connection();

        UomEntity::find_by_id(uom_id).one(db).await?.ok_or_else(|| {
            ServiceError::InvalidOperation(format!("Unit of measurement {} does not exist", uom_id))
        })?;
        PackagingTypeEntity::find_by_id(packaging_type_id)
            .one(db)
            .await?
            .ok_or_else(|| {
                ServiceError::InvalidOperation(format!(
                    "Packaging type {} does not exist",
                    packaging_type_id
                ))
            })?;
        WarehouseEntity::find_by_id(warehouse_id)
            .one(db)
            .await?
            .ok_or_else(|| {
                ServiceError::InvalidOperation(format!(
                    "Warehouse {} does not exist",
                    warehouse_id
                ))
            })?;

        Ok(())
    }

    #[instrument(skip(self, input))]
    pub async fn create(&self, input: CreateItemInput) -> Result<item::Model, ServiceError> {
        self.check_references(input.uom_id, input.packaging_type_id, input.warehouse_id)
            .await?;

        let model = item::ActiveModel {
            id: Default::default(),
            name: Set(input.name),
            description: Set(input.description),
            item_type: Set(input.item_type),
            uom_id: Set(input.uom_id),
            cost: Set(input.cost),
            weight: Set(input.weight),
            volume: Set(input.volume),
            length: Set(input.length),
            width: Set(input.width),
            height: Set(input.height),
            packaging_type_id: Set(input.packaging_type_id),
            stock_quantity: Set(input.stock_quantity),
            reorder_level: Set(input.reorder_level),
            warehouse_id: Set(input.warehouse_id),
        };

        let created = model.insert(self.connection()).await?;

        self.event_sender
            .send_or_log(Event::ItemCreated(created.id))
            .await;

        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: i64) -> Result<Option<item::Model>, ServiceError> {
        Ok(ItemEntity::find_by_id(id).one(self.connection()).await?)
    }

    #[instrument(skip(self))]
    pub async fn list(
        &self,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<item::Model>, u64), ServiceError> {
        let limit = limit.max(1);
        let page = page.max(1) - 1;

        let paginator = ItemEntity::find()
            .order_by_asc(item::Column::Id)
            .paginate(self.connection(), limit);
        let total = paginator.num_items().await?;
        let models = paginator.fetch_page(page).await?;

        Ok((models, total))
    }

    #[instrument(skip(self, input))]
    pub async fn update(&self, id: i64, input: UpdateItemInput) -> Result<item::Model, ServiceError> {
        let mut model = self.find_required(id).await?;

        let uom_id = input.uom_id.unwrap_or(model.uom_id);
        let packaging_type_id = input.packaging_type_id.unwrap_or(model.packaging_type_id);
        let warehouse_id = input.warehouse_id.unwrap_or(model.warehouse_id);
        self.check_references(uom_id, packaging_type_id, warehouse_id)
            .await?;

        if let Some(name) = input.name {
            model.name = name;
        }
        if let Some(description) = input.description {
            model.description = description;
        }
        if let Some(item_type) = input.item_type {
            model.item_type = item_type;
        }
        if let Some(cost) = input.cost {
            model.cost = cost;
        }
        if let Some(weight) = input.weight {
            model.weight = weight;
        }
        if let Some(volume) = input.volume {
            model.volume = volume;
        }
        if let Some(length) = input.length {
            model.length = length;
        }
        if let Some(width) = input.width {
            model.width = width;
        }
        if let Some(height) = input.height {
            model.height = height;
        }
        if let Some(stock_quantity) = input.stock_quantity {
            model.stock_quantity = stock_quantity;
        }
        if let Some(reorder_level) = input.reorder_level {
            model.reorder_level = reorder_level;
        }
        model.uom_id = uom_id;
        model.packaging_type_id = packaging_type_id;
        model.warehouse_id = warehouse_id;

        let active = model.into_active_model().reset_all();
        Ok(active.update(self.connection()).await?)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: i64) -> Result<(), ServiceError> {
        let model = self.find_required(id).await?;
        model.delete(self.connection()).await?;
        Ok(())
    }

    /// Items at or below their reorder level.
    #[instrument(skip(self))]
    pub async fn reorder_alerts(&self) -> Result<Vec<item::Model>, ServiceError> {
        Ok(ItemEntity::find()
            .filter(
                Expr::col(item::Column::StockQuantity).lte(Expr::col(item::Column::ReorderLevel)),
            )
            .order_by_asc(item::Column::Id)
            .all(self.connection())
            .await?)
    }

    /// The cheapest packaging type whose dimensions and weight rating cover
    /// the item. Fails with `NotFound` when nothing fits.
    #[instrument(skip(self))]
    pub async fn suggest_packaging(
        &self,
        item_id: i64,
    ) -> Result<packaging_type::Model, ServiceError> {
        let item = self.find_required(item_id).await?;

        PackagingTypeEntity::find()
            .filter(packaging_type::Column::Length.gte(item.length))
            .filter(packaging_type::Column::Width.gte(item.width))
            .filter(packaging_type::Column::Height.gte(item.height))
            .filter(packaging_type::Column::Weight.gte(item.weight))
            .order_by_asc(packaging_type::Column::Cost)
            .one(self.connection())
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound("No suitable packaging type found".to_string())
            })
    }
}
