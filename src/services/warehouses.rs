use std::sync::Arc;

use rust_decimal::Decimal;
use sea_orm::ActiveValue::Set;
use sea_orm::{
    ActiveModelTrait, DatabaseConnection, EntityTrait, IntoActiveModel, ModelTrait,
    PaginatorTrait, QueryOrder, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use validator::Validate;

use crate::db::DbPool;
use crate::entities::{
    packaging_material::Entity as MaterialEntity, warehouse, warehouse::Entity as WarehouseEntity,
};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateWarehouseInput {
    #[validate(length(min = 1, max = 32))]
    pub code: String,
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    pub warehouse_type: i32,
    pub description: String,
    pub total_capacity: Decimal,
    pub available_capacity: Decimal,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateWarehouseInput {
    #[validate(length(min = 1, max = 32))]
    pub code: Option<String>,
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    pub warehouse_type: Option<i32>,
    pub description: Option<String>,
    pub total_capacity: Option<Decimal>,
    pub available_capacity: Option<Decimal>,
}

/// Capacity snapshot for one warehouse.
#[derive(Debug, Clone, Serialize)]
pub struct WarehouseCapacity {
    pub warehouse_id: i64,
    pub total_capacity: Decimal,
    pub used_capacity: Decimal,
    pub available_capacity: Decimal,
}

/// Result of allocating material stock into a warehouse.
#[derive(Debug, Clone, Serialize)]
pub struct AllocationOutcome {
    pub remaining_material_quantity: Decimal,
    pub remaining_warehouse_capacity: Decimal,
}

/// Service for warehouse records, capacity overviews, and material
/// allocation.
#[derive(Clone)]
pub struct WarehouseService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl WarehouseService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    fn connection(&self) -> &DatabaseConnection {
        &self.db_pool
    }

    async fn find_required(&self, id: i64) -> Result<warehouse::Model, ServiceError> {
        WarehouseEntity::find_by_id(id)
            .one(self.connection())
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Warehouse {} not found", id)))
    }

    #[instrument(skip(self, input))]
    pub async fn create(&self, input: CreateWarehouseInput) -> Result<warehouse::Model, ServiceError> {
        if input.available_capacity > input.total_capacity {
            return Err(ServiceError::ValidationError(
                "Available capacity cannot exceed total capacity".to_string(),
            ));
        }

        let model = warehouse::ActiveModel {
            id: Default::default(),
            code: Set(input.code),
            name: Set(input.name),
            warehouse_type: Set(input.warehouse_type),
            description: Set(input.description),
            total_capacity: Set(input.total_capacity),
            available_capacity: Set(input.available_capacity),
        };

        let created = model.insert(self.connection()).await?;

        self.event_sender
            .send_or_log(Event::WarehouseCreated(created.id))
            .await;

        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: i64) -> Result<Option<warehouse::Model>, ServiceError> {
        Ok(WarehouseEntity::find_by_id(id)
            .one(self.connection())
            .await?)
    }

    #[instrument(skip(self))]
    pub async fn list(
        &self,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<warehouse::Model>, u64), ServiceError> {
        let limit = limit.max(1);
        let page = page.max(1) - 1;

        let paginator = WarehouseEntity::find()
            .order_by_asc(warehouse::Column::Id)
            .paginate(self.connection(), limit);
        let total = paginator.num_items().await?;
        let models = paginator.fetch_page(page).await?;

        Ok((models, total))
    }

    #[instrument(skip(self, input))]
    pub async fn update(
        &self,
        id: i64,
        input: UpdateWarehouseInput,
    ) -> Result<warehouse::Model, ServiceError> {
        let mut model = self.find_required(id).await?;

        if let Some(code) = input.code {
            model.code = code;
        }
        if let Some(name) = input.name {
            model.name = name;
        }
        if let Some(warehouse_type) = input.warehouse_type {
            model.warehouse_type = warehouse_type;
        }
        if let Some(description) = input.description {
            model.description = description;
        }
        if let Some(total_capacity) = input.total_capacity {
            model.total_capacity = total_capacity;
        }
        if let Some(available_capacity) = input.available_capacity {
            model.available_capacity = available_capacity;
        }

        if model.available_capacity > model.total_capacity {
            return Err(ServiceError::ValidationError(
                "Available capacity cannot exceed total capacity".to_string(),
            ));
        }

        let active = model.into_active_model().reset_all();
        Ok(active.update(self.connection()).await?)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: i64) -> Result<(), ServiceError> {
        let model = self.find_required(id).await?;
        model.delete(self.connection()).await?;
        Ok(())
    }

    /// Capacity overview across all warehouses.
    #[instrument(skip(self))]
    pub async fn overview(&self) -> Result<Vec<WarehouseCapacity>, ServiceError> {
        let warehouses = WarehouseEntity::find()
            .order_by_asc(warehouse::Column::Id)
            .all(self.connection())
            .await?;

        Ok(warehouses
            .into_iter()
            .map(|w| WarehouseCapacity {
                warehouse_id: w.id,
                total_capacity: w.total_capacity,
                used_capacity: w.total_capacity - w.available_capacity,
                available_capacity: w.available_capacity,
            })
            .collect())
    }

    /// Moves `quantity` units of a material into a warehouse, decrementing
    /// material stock and warehouse capacity together. Both preconditions
    /// are checked before either write; the two writes share a transaction.
    #[instrument(skip(self))]
    pub async fn allocate_materials(
        &self,
        warehouse_id: i64,
        material_id: i64,
        quantity: Decimal,
    ) -> Result<AllocationOutcome, ServiceError> {
        if quantity <= Decimal::ZERO {
            return Err(ServiceError::InvalidInput(
                "Allocation quantity must be positive".to_string(),
            ));
        }

        let db = self.connection();
        let warehouse = self.find_required(warehouse_id).await?;
        let material = MaterialEntity::find_by_id(material_id)
            .one(db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Packaging material {} not found", material_id))
            })?;

        if warehouse.available_capacity < quantity {
            return Err(ServiceError::InsufficientCapacity(warehouse.name.clone()));
        }
        if material.available_quantity < quantity {
            return Err(ServiceError::InsufficientStock(material.name.clone()));
        }

        let remaining_material_quantity = material.available_quantity - quantity;
        let remaining_warehouse_capacity = warehouse.available_capacity - quantity;

        let txn = db.begin().await?;

        let mut material_active = material.into_active_model();
        material_active.available_quantity = Set(remaining_material_quantity);
        material_active.updated_at = Set(chrono::Utc::now().into());
        material_active.update(&txn).await?;

        let mut warehouse_active = warehouse.into_active_model();
        warehouse_active.available_capacity = Set(remaining_warehouse_capacity);
        warehouse_active.update(&txn).await?;

        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::MaterialAllocated {
                warehouse_id,
                material_id,
                quantity,
            })
            .await;

        Ok(AllocationOutcome {
            remaining_material_quantity,
            remaining_warehouse_capacity,
        })
    }
}
