use std::sync::Arc;

use rust_decimal::Decimal;
use sea_orm::ActiveValue::Set;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use validator::Validate;

use crate::db::DbPool;
use crate::entities::{
    packaging_material::Entity as MaterialEntity, supplier, supplier::Entity as SupplierEntity,
    supplier_material, supplier_material::Entity as SupplierMaterialEntity,
};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateSupplierInput {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    pub contact_person: String,
    pub phone: String,
    #[validate(email)]
    pub email: String,
    #[serde(default)]
    pub packaging_material_ids: Vec<i64>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct MaterialRequestLine {
    pub material_id: i64,
    pub quantity: Decimal,
}

/// Availability answer for one requested material.
#[derive(Debug, Clone, Serialize)]
pub struct MaterialRequestOutcome {
    pub material_id: i64,
    pub material_name: String,
    pub requested_quantity: Decimal,
    pub available_quantity: Decimal,
    pub supplier_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Service for suppliers and the materials they can provide.
#[derive(Clone)]
pub struct SupplierService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl SupplierService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    fn connection(&self) -> &DatabaseConnection {
        &self.db_pool
    }

    async fn find_required(&self, id: i64) -> Result<supplier::Model, ServiceError> {
        SupplierEntity::find_by_id(id)
            .one(self.connection())
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Supplier {} not found", id)))
    }

    /// Creates a supplier and links it to the materials it can provide, in
    /// one transaction.
    #[instrument(skip(self, input))]
    pub async fn create(&self, input: CreateSupplierInput) -> Result<supplier::Model, ServiceError> {
        let db = self.connection();

        for material_id in &input.packaging_material_ids {
            MaterialEntity::find_by_id(*material_id)
                .one(db)
                .await?
                .ok_or_else(|| {
                    ServiceError::InvalidOperation(format!(
                        "Packaging material {} does not exist",
                        material_id
                    ))
                })?;
        }

        let txn = db.begin().await?;

        let model = supplier::ActiveModel {
            id: Default::default(),
            name: Set(input.name),
            contact_person: Set(input.contact_person),
            phone: Set(input.phone),
            email: Set(input.email),
        };
        let created = model.insert(&txn).await?;

        for material_id in input.packaging_material_ids {
            let link = supplier_material::ActiveModel {
                id: Default::default(),
                supplier_id: Set(created.id),
                material_id: Set(material_id),
            };
            link.insert(&txn).await?;
        }

        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::SupplierCreated(created.id))
            .await;

        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: i64) -> Result<Option<supplier::Model>, ServiceError> {
        Ok(SupplierEntity::find_by_id(id)
            .one(self.connection())
            .await?)
    }

    #[instrument(skip(self))]
    pub async fn list(
        &self,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<supplier::Model>, u64), ServiceError> {
        let limit = limit.max(1);
        let page = page.max(1) - 1;

        let paginator = SupplierEntity::find()
            .order_by_asc(supplier::Column::Id)
            .paginate(self.connection(), limit);
        let total = paginator.num_items().await?;
        let models = paginator.fetch_page(page).await?;

        Ok((models, total))
    }

    /// Links additional materials to an existing supplier. Already-linked
    /// materials are skipped.
    #[instrument(skip(self))]
    pub async fn attach_materials(
        &self,
        supplier_id: i64,
        material_ids: Vec<i64>,
    ) -> Result<(), ServiceError> {
        let db = self.connection();
        self.find_required(supplier_id).await?;

        let existing: Vec<i64> = SupplierMaterialEntity::find()
            .filter(supplier_material::Column::SupplierId.eq(supplier_id))
            .all(db)
            .await?
            .into_iter()
            .map(|link| link.material_id)
            .collect();

        for material_id in material_ids {
            if existing.contains(&material_id) {
                continue;
            }
            MaterialEntity::find_by_id(material_id)
                .one(db)
                .await?
                .ok_or_else(|| {
                    ServiceError::InvalidOperation(format!(
                        "Packaging material {} does not exist",
                        material_id
                    ))
                })?;

            let link = supplier_material::ActiveModel {
                id: Default::default(),
                supplier_id: Set(supplier_id),
                material_id: Set(material_id),
            };
            link.insert(db).await?;
        }

        Ok(())
    }

    /// Answers, line by line, whether the supplier carries each requested
    /// material and how much stock is on record.
    #[instrument(skip(self, requests))]
    pub async fn request_materials(
        &self,
        supplier_id: i64,
        requests: Vec<MaterialRequestLine>,
    ) -> Result<Vec<MaterialRequestOutcome>, ServiceError> {
        let db = self.connection();
        let supplier = self.find_required(supplier_id).await?;

        let carried: Vec<i64> = SupplierMaterialEntity::find()
            .filter(supplier_material::Column::SupplierId.eq(supplier_id))
            .all(db)
            .await?
            .into_iter()
            .map(|link| link.material_id)
            .collect();

        let mut outcomes = Vec::with_capacity(requests.len());
        for request in requests {
            let material = MaterialEntity::find_by_id(request.material_id)
                .one(db)
                .await?
                .ok_or_else(|| {
                    ServiceError::NotFound(format!(
                        "Packaging material {} not found",
                        request.material_id
                    ))
                })?;

            if carried.contains(&material.id) {
                outcomes.push(MaterialRequestOutcome {
                    material_id: material.id,
                    material_name: material.name,
                    requested_quantity: request.quantity,
                    available_quantity: material.available_quantity,
                    supplier_name: supplier.name.clone(),
                    message: None,
                });
            } else {
                outcomes.push(MaterialRequestOutcome {
                    material_id: material.id,
                    material_name: material.name,
                    requested_quantity: request.quantity,
                    available_quantity: Decimal::ZERO,
                    supplier_name: supplier.name.clone(),
                    message: Some("Supplier does not have the requested material".to_string()),
                });
            }
        }

        Ok(outcomes)
    }
}
