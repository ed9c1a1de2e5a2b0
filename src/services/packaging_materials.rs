use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::ActiveValue::Set;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, ModelTrait,
    PaginatorTrait, QueryFilter, QueryOrder,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use validator::Validate;

use crate::db::DbPool;
use crate::entities::{
    packaging_material, packaging_material::Entity as MaterialEntity, packaging_type,
    packaging_type::Entity as PackagingTypeEntity,
};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateMaterialInput {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    pub description: String,
    pub cost: Decimal,
    pub available_quantity: Decimal,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateMaterialInput {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    pub description: Option<String>,
    pub cost: Option<Decimal>,
    pub available_quantity: Option<Decimal>,
}

/// A material row annotated with the value of its remaining stock.
#[derive(Debug, Clone, Serialize)]
pub struct MaterialCostView {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub cost: Decimal,
    pub available_quantity: Decimal,
    pub remaining_value: Decimal,
}

/// Aggregate statistics over materials and the packaging types built from
/// them. Averages are `None` when the underlying set is empty.
#[derive(Debug, Clone, Serialize)]
pub struct MaterialStatistics {
    pub total_cost: Decimal,
    pub average_weight: Option<f64>,
    pub average_volume: Option<f64>,
    pub total_available_quantity: Decimal,
    pub average_cost_per_quantity: Option<Decimal>,
    pub most_used_material: Option<String>,
    pub inventory_value: Decimal,
    pub out_of_stock_count: u64,
}

/// Per-material usage line in the usage report.
#[derive(Debug, Clone, Serialize)]
pub struct MaterialUsage {
    pub id: i64,
    pub name: String,
    pub usage_count: u64,
    pub total_cost: Decimal,
    pub last_used: Option<chrono::DateTime<chrono::FixedOffset>>,
    pub usage_percentage: f64,
}

/// Service for packaging material records and material-level reporting.
#[derive(Clone)]
pub struct PackagingMaterialService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl PackagingMaterialService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    fn connection(&self) -> &DatabaseConnection {
        &self.db_pool
    }

    async fn find_required(&self, id: i64) -> Result<packaging_material::Model, ServiceError> {
        MaterialEntity::find_by_id(id)
            .one(self.connection())
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Packaging material {} not found", id)))
    }

    #[instrument(skip(self, input))]
    pub async fn create(
        &self,
        input: CreateMaterialInput,
    ) -> Result<packaging_material::Model, ServiceError> {
        let now = Utc::now();
        let model = packaging_material::ActiveModel {
            id: Default::default(),
            name: Set(input.name),
            description: Set(input.description),
            cost: Set(input.cost),
            available_quantity: Set(input.available_quantity),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        let created = model.insert(self.connection()).await?;

        self.event_sender
            .send_or_log(Event::MaterialCreated(created.id))
            .await;

        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: i64) -> Result<Option<packaging_material::Model>, ServiceError> {
        Ok(MaterialEntity::find_by_id(id)
            .one(self.connection())
            .await?)
    }

    #[instrument(skip(self))]
    pub async fn list(
        &self,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<packaging_material::Model>, u64), ServiceError> {
        let limit = limit.max(1);
        let page = page.max(1) - 1;

        let paginator = MaterialEntity::find()
            .order_by_asc(packaging_material::Column::Id)
            .paginate(self.connection(), limit);
        let total = paginator.num_items().await?;
        let models = paginator.fetch_page(page).await?;

        Ok((models, total))
    }

    #[instrument(skip(self, input))]
    pub async fn update(
        &self,
        id: i64,
        input: UpdateMaterialInput,
    ) -> Result<packaging_material::Model, ServiceError> {
        let mut model = self.find_required(id).await?;

        if let Some(name) = input.name {
            model.name = name;
        }
        if let Some(description) = input.description {
            model.description = description;
        }
        if let Some(cost) = input.cost {
            model.cost = cost;
        }
        if let Some(available_quantity) = input.available_quantity {
            model.available_quantity = available_quantity;
        }
        model.updated_at = Utc::now().into();

        let active = model.into_active_model().reset_all();
        let updated = active.update(self.connection()).await?;

        self.event_sender
            .send_or_log(Event::MaterialUpdated(id))
            .await;

        Ok(updated)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: i64) -> Result<(), ServiceError> {
        let model = self.find_required(id).await?;
        model.delete(self.connection()).await?;

        self.event_sender
            .send_or_log(Event::MaterialDeleted(id))
            .await;

        Ok(())
    }

    /// Materials within an optional cost band, each annotated with the value
    /// of its remaining stock.
    #[instrument(skip(self))]
    pub async fn filter_by_cost(
        &self,
        min_cost: Option<Decimal>,
        max_cost: Option<Decimal>,
    ) -> Result<Vec<MaterialCostView>, ServiceError> {
        let mut query = MaterialEntity::find().order_by_asc(packaging_material::Column::Id);
        if let Some(min) = min_cost {
            query = query.filter(packaging_material::Column::Cost.gte(min));
        }
        if let Some(max) = max_cost {
            query = query.filter(packaging_material::Column::Cost.lte(max));
        }

        let materials = query.all(self.connection()).await?;
        Ok(materials
            .into_iter()
            .map(|m| MaterialCostView {
                remaining_value: m.cost * m.available_quantity,
                id: m.id,
                name: m.name,
                description: m.description,
                cost: m.cost,
                available_quantity: m.available_quantity,
            })
            .collect())
    }

    /// Inventory-wide statistics, computed over the full material and
    /// packaging type sets.
    #[instrument(skip(self))]
    pub async fn statistics(&self) -> Result<MaterialStatistics, ServiceError> {
        let db = self.connection();
        let materials = MaterialEntity::find().all(db).await?;
        let types = PackagingTypeEntity::find().all(db).await?;

        let total_cost: Decimal = materials.iter().map(|m| m.cost).sum();
        let total_available_quantity: Decimal =
            materials.iter().map(|m| m.available_quantity).sum();
        let inventory_value: Decimal = materials
            .iter()
            .map(|m| m.cost * m.available_quantity)
            .sum();
        let out_of_stock_count = materials
            .iter()
            .filter(|m| m.available_quantity == Decimal::ZERO)
            .count() as u64;

        let (average_weight, average_volume) = if types.is_empty() {
            (None, None)
        } else {
            let n = types.len() as f64;
            (
                Some(types.iter().map(|t| t.weight).sum::<f64>() / n),
                Some(types.iter().map(|t| t.volume).sum::<f64>() / n),
            )
        };

        let average_cost_per_quantity = if materials.is_empty() {
            None
        } else {
            let n = Decimal::from(materials.len());
            (total_cost / n).checked_div(total_available_quantity / n)
        };

        let mut usage_counts: HashMap<i64, u64> = HashMap::new();
        for t in &types {
            *usage_counts.entry(t.material_id).or_insert(0) += 1;
        }
        let most_used_material = materials
            .iter()
            .max_by_key(|m| usage_counts.get(&m.id).copied().unwrap_or(0))
            .filter(|_| !types.is_empty())
            .map(|m| m.name.clone());

        Ok(MaterialStatistics {
            total_cost,
            average_weight,
            average_volume,
            total_available_quantity,
            average_cost_per_quantity,
            most_used_material,
            inventory_value,
            out_of_stock_count,
        })
    }

    /// Per-material usage report: how many packaging types use each
    /// material, the cost tied up in them, and the share of overall usage.
    #[instrument(skip(self))]
    pub async fn usage_report(&self) -> Result<Vec<MaterialUsage>, ServiceError> {
        let db = self.connection();
        let materials = MaterialEntity::find()
            .order_by_asc(packaging_material::Column::Id)
            .all(db)
            .await?;
        let types = PackagingTypeEntity::find().all(db).await?;

        let mut by_material: HashMap<i64, Vec<&packaging_type::Model>> = HashMap::new();
        for t in &types {
            by_material.entry(t.material_id).or_default().push(t);
        }
        let total_usage = types.len() as f64;

        Ok(materials
            .into_iter()
            .map(|m| {
                let used_by = by_material.get(&m.id).map(Vec::as_slice).unwrap_or(&[]);
                let usage_count = used_by.len() as u64;
                let total_cost: Decimal = used_by.iter().map(|t| m.cost * t.quantity).sum();
                let last_used = used_by.iter().map(|t| t.updated_at).max();
                let usage_percentage = if total_usage > 0.0 {
                    usage_count as f64 / total_usage * 100.0
                } else {
                    0.0
                };

                MaterialUsage {
                    id: m.id,
                    name: m.name,
                    usage_count,
                    total_cost,
                    last_used,
                    usage_percentage,
                }
            })
            .collect())
    }
}
