use std::sync::Arc;

use sea_orm::ActiveValue::Set;
use sea_orm::{
    ActiveModelTrait, DatabaseConnection, EntityTrait, IntoActiveModel, ModelTrait, QueryOrder,
};
use serde::Deserialize;
use tracing::instrument;
use validator::Validate;

use crate::db::DbPool;
use crate::entities::{unit_of_measurement, unit_of_measurement::Entity as UomEntity};
use crate::errors::ServiceError;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateUnitInput {
    #[validate(length(min = 1, max = 64))]
    pub name: String,
    #[validate(length(min = 1, max = 16))]
    pub abbreviation: String,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateUnitInput {
    #[validate(length(min = 1, max = 64))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 16))]
    pub abbreviation: Option<String>,
}

/// Service for units of measurement.
#[derive(Clone)]
pub struct UnitService {
    db_pool: Arc<DbPool>,
}

impl UnitService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    fn connection(&self) -> &DatabaseConnection {
        &self.db_pool
    }

    async fn find_required(&self, id: i64) -> Result<unit_of_measurement::Model, ServiceError> {
        UomEntity::find_by_id(id)
            .one(self.connection())
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Unit of measurement {} not found", id)))
    }

    #[instrument(skip(self, input))]
    pub async fn create(
        &self,
        input: CreateUnitInput,
    ) -> Result<unit_of_measurement::Model, ServiceError> {
        let model = unit_of_measurement::ActiveModel {
            id: Default::default(),
            name: Set(input.name),
            abbreviation: Set(input.abbreviation),
        };
        Ok(model.insert(self.connection()).await?)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: i64) -> Result<Option<unit_of_measurement::Model>, ServiceError> {
        Ok(UomEntity::find_by_id(id).one(self.connection()).await?)
    }

    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<unit_of_measurement::Model>, ServiceError> {
        Ok(UomEntity::find()
            .order_by_asc(unit_of_measurement::Column::Id)
            .all(self.connection())
            .await?)
    }

    #[instrument(skip(self, input))]
    pub async fn update(
        &self,
        id: i64,
        input: UpdateUnitInput,
    ) -> Result<unit_of_measurement::Model, ServiceError> {
        let mut model = self.find_required(id).await?;

        if let Some(name) = input.name {
            model.name = name;
        }
        if let Some(abbreviation) = input.abbreviation {
            model.abbreviation = abbreviation;
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
}
