use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
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
    packaging_material, packaging_material::Entity as MaterialEntity, packaging_type,
    packaging_type::Entity as PackagingTypeEntity,
};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};

/// Input payload for creating a packaging type
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreatePackagingTypeInput {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    pub description: String,
    pub weight: f64,
    pub volume: f64,
    pub length: f64,
    pub width: f64,
    pub height: f64,
    pub material_id: i64,
    pub cost: Decimal,
    pub quantity: Decimal,
    #[validate(length(min = 1, max = 64))]
    pub level: String,
    pub parent_id: Option<i64>,
}

/// Input payload for updating a packaging type. Absent fields keep their
/// current value; `detach_parent` clears the parent link.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdatePackagingTypeInput {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    pub description: Option<String>,
    pub weight: Option<f64>,
    pub volume: Option<f64>,
    pub length: Option<f64>,
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub material_id: Option<i64>,
    pub cost: Option<Decimal>,
    pub quantity: Option<Decimal>,
    pub level: Option<String>,
    pub parent_id: Option<i64>,
    #[serde(default)]
    pub detach_parent: bool,
}

/// Service for managing packaging type records and their parent links.
#[derive(Clone)]
pub struct PackagingTypeService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl PackagingTypeService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    fn connection(&self) -> &DatabaseConnection {
        &self.db_pool
    }

    /// Rejects creation or growth beyond what the backing material can cover.
    async fn check_material_availability(
        &self,
        material_id: i64,
        quantity: Decimal,
    ) -> Result<packaging_material::Model, ServiceError> {
        let material = MaterialEntity::find_by_id(material_id)
            .one(self.connection())
            .await?
            .ok_or_else(|| {
                ServiceError::InvalidOperation(format!(
                    "Packaging material {} does not exist",
                    material_id
                ))
            })?;

        if material.available_quantity < quantity {
            return Err(ServiceError::InsufficientStock(material.name.clone()));
        }

        Ok(material)
    }

    async fn find_required(&self, id: i64) -> Result<packaging_type::Model, ServiceError> {
        PackagingTypeEntity::find_by_id(id)
            .one(self.connection())
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Packaging type {} not found", id)))
    }

    /// Walks the parent chain upward from `parent_id` and refuses the link
    /// when `id` is already an ancestor, which would close a cycle.
    async fn ensure_no_cycle(&self, id: i64, parent_id: i64) -> Result<(), ServiceError> {
        if id == parent_id {
            return Err(ServiceError::InvalidOperation(
                "A packaging type cannot be its own parent".to_string(),
            ));
        }

        let mut seen = std::collections::HashSet::from([parent_id]);
        let mut cursor = self.find_required(parent_id).await?;
        while let Some(ancestor_id) = cursor.parent_id {
            if ancestor_id == id || !seen.insert(ancestor_id) {
                return Err(ServiceError::CycleDetected(id));
            }
            cursor = self.find_required(ancestor_id).await?;
        }

        Ok(())
    }

    #[instrument(skip(self, input))]
    pub async fn create(
        &self,
        input: CreatePackagingTypeInput,
    ) -> Result<packaging_type::Model, ServiceError> {
        self.check_material_availability(input.material_id, input.quantity)
            .await?;

        if let Some(parent_id) = input.parent_id {
            self.find_required(parent_id).await?;
        }

        let now = Utc::now();
        let model = packaging_type::ActiveModel {
            id: Default::default(),
            name: Set(input.name),
            description: Set(input.description),
            weight: Set(input.weight),
            volume: Set(input.volume),
            length: Set(input.length),
            width: Set(input.width),
            height: Set(input.height),
            material_id: Set(input.material_id),
            cost: Set(input.cost),
            quantity: Set(input.quantity),
            level: Set(input.level),
            parent_id: Set(input.parent_id),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        let created = model.insert(self.connection()).await?;

        self.event_sender
            .send_or_log(Event::PackagingTypeCreated(created.id))
            .await;

        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: i64) -> Result<Option<packaging_type::Model>, ServiceError> {
        Ok(PackagingTypeEntity::find_by_id(id)
            .one(self.connection())
            .await?)
    }

    /// Paginated listing, optionally narrowed to names containing `name`.
    #[instrument(skip(self))]
    pub async fn list(
        &self,
        page: u64,
        limit: u64,
        name: Option<String>,
        level: Option<String>,
    ) -> Result<(Vec<packaging_type::Model>, u64), ServiceError> {
        let limit = limit.max(1);
        let page = page.max(1) - 1;

        let mut query = PackagingTypeEntity::find().order_by_asc(packaging_type::Column::Id);
        if let Some(name) = name.filter(|n| !n.is_empty()) {
            query = query.filter(packaging_type::Column::Name.contains(&name));
        }
        if let Some(level) = level.filter(|l| !l.is_empty()) {
            query = query.filter(packaging_type::Column::Level.eq(level));
        }

        let paginator = query.paginate(self.connection(), limit);
        let total = paginator.num_items().await?;
        let models = paginator.fetch_page(page).await?;

        Ok((models, total))
    }

    #[instrument(skip(self, input))]
    pub async fn update(
        &self,
        id: i64,
        input: UpdatePackagingTypeInput,
    ) -> Result<packaging_type::Model, ServiceError> {
        let mut model = self.find_required(id).await?;

        let quantity = input.quantity.unwrap_or(model.quantity);
        let material_id = input.material_id.unwrap_or(model.material_id);
        self.check_material_availability(material_id, quantity)
            .await?;

        if input.detach_parent {
            model.parent_id = None;
        } else if let Some(parent_id) = input.parent_id {
            self.ensure_no_cycle(id, parent_id).await?;
            model.parent_id = Some(parent_id);
        }

        if let Some(name) = input.name {
            model.name = name;
        }
        if let Some(description) = input.description {
            model.description = description;
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
        if let Some(level) = input.level {
            model.level = level;
        }
        model.material_id = material_id;
        model.cost = input.cost.unwrap_or(model.cost);
        model.quantity = quantity;
        model.updated_at = Utc::now().into();

        let active = model.into_active_model().reset_all();
        let updated = active.update(self.connection()).await?;

        self.event_sender
            .send_or_log(Event::PackagingTypeUpdated(updated.id))
            .await;

        Ok(updated)
    }

    /// Links `id` under `parent_id`. Both ends must exist; a node cannot be
    /// its own parent or the ancestor of its new parent.
    #[instrument(skip(self))]
    pub async fn assign_parent(
        &self,
        id: i64,
        parent_id: i64,
    ) -> Result<packaging_type::Model, ServiceError> {
        let model = self.find_required(id).await?;
        self.ensure_no_cycle(id, parent_id).await?;

        let mut active = model.into_active_model();
        active.parent_id = Set(Some(parent_id));
        active.updated_at = Set(Utc::now().into());
        let updated = active.update(self.connection()).await?;

        self.event_sender
            .send_or_log(Event::ParentAssigned {
                packaging_type_id: id,
                parent_id,
            })
            .await;

        Ok(updated)
    }

    /// Sets the absolute on-hand quantity, bypassing propagation.
    #[instrument(skip(self))]
    pub async fn update_quantity(
        &self,
        id: i64,
        quantity: Decimal,
    ) -> Result<packaging_type::Model, ServiceError> {
        let model = self.find_required(id).await?;

        let mut active = model.into_active_model();
        active.quantity = Set(quantity);
        active.updated_at = Set(Utc::now().into());
        let updated = active.update(self.connection()).await?;

        self.event_sender
            .send_or_log(Event::PackagingTypeUpdated(id))
            .await;

        Ok(updated)
    }

    /// Repricing hook for the finance integration.
    #[instrument(skip(self))]
    pub async fn update_cost(
        &self,
        id: i64,
        cost: Decimal,
    ) -> Result<packaging_type::Model, ServiceError> {
        let model = self.find_required(id).await?;

        let mut active = model.into_active_model();
        active.cost = Set(cost);
        active.updated_at = Set(Utc::now().into());
        let updated = active.update(self.connection()).await?;

        self.event_sender
            .send_or_log(Event::PackagingTypeUpdated(id))
            .await;

        Ok(updated)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: i64) -> Result<(), ServiceError> {
        let model = self.find_required(id).await?;
        model.delete(self.connection()).await?;

        self.event_sender
            .send_or_log(Event::PackagingTypeDeleted(id))
            .await;

        Ok(())
    }
}
