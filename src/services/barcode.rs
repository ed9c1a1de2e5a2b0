use std::sync::Arc;

use chrono::Utc;
use rand::Rng;
use sea_orm::{DatabaseConnection, EntityTrait};
use serde::Serialize;
use tracing::instrument;

use crate::db::DbPool;
use crate::entities::{packaging_type, packaging_type::Entity as PackagingTypeEntity};
use crate::errors::ServiceError;

/// The packaging type id may be up to this many digits when parsing it back
/// out of a barcode prefix.
const MAX_ID_DIGITS: usize = 6;

#[derive(Debug, Clone, Serialize)]
pub struct BarcodeAndLabel {
    pub barcode_number: String,
    pub label: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchBarcode {
    pub packaging_type_id: i64,
    pub barcode_number: String,
    pub packaging_type_name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct BarcodeValidation {
    pub valid: bool,
    pub packaging_type_info: Option<packaging_type::Model>,
}

/// Service generating and validating packaging type barcodes. Barcodes are
/// `{id}{millis}{rand4}`: the type id, a millisecond timestamp, and a
/// 4-digit random salt.
#[derive(Clone)]
pub struct BarcodeService {
    db_pool: Arc<DbPool>,
}

impl BarcodeService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    fn connection(&self) -> &DatabaseConnection {
        &self.db_pool
    }

    async fn find_required(&self, id: i64) -> Result<packaging_type::Model, ServiceError> {
        PackagingTypeEntity::find_by_id(id)
            .one(self.connection())
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Packaging type {} not found", id)))
    }

    /// Builds a time-and-random-salted barcode for the packaging type.
    pub fn barcode_number(packaging_type_id: i64) -> String {
        let millis = Utc::now().timestamp_millis();
        let salt: u16 = rand::thread_rng().gen_range(1000..=9999);
        format!("{}{}{}", packaging_type_id, millis, salt)
    }

    #[instrument(skip(self))]
    pub async fn generate(&self, packaging_type_id: i64) -> Result<BarcodeAndLabel, ServiceError> {
        let packaging_type = self.find_required(packaging_type_id).await?;
        let barcode_number = Self::barcode_number(packaging_type.id);
        let label = format!("{} - {}", packaging_type.name, barcode_number);

        Ok(BarcodeAndLabel {
            barcode_number,
            label,
        })
    }

    /// One barcode per requested packaging type; batch barcodes use a wider
    /// random salt in place of the timestamp.
    #[instrument(skip(self))]
    pub async fn generate_batch(
        &self,
        packaging_type_ids: Vec<i64>,
    ) -> Result<Vec<BatchBarcode>, ServiceError> {
        let mut out = Vec::with_capacity(packaging_type_ids.len());
        for id in packaging_type_ids {
            let packaging_type = self.find_required(id).await?;
            let salt: u64 = rand::thread_rng().gen_range(1_000_000_000..=9_999_999_999);
            out.push(BatchBarcode {
                packaging_type_id: packaging_type.id,
                barcode_number: format!("{}{}", packaging_type.id, salt),
                packaging_type_name: packaging_type.name,
            });
        }
        Ok(out)
    }

    /// Recovers the packaging type id from a barcode by probing prefixes of
    /// increasing length against the store. An unknown or malformed barcode,
    /// non-ASCII input included, is reported as invalid rather than an error.
    #[instrument(skip(self))]
    pub async fn validate(&self, barcode_number: &str) -> Result<BarcodeValidation, ServiceError> {
        for length in 1..=MAX_ID_DIGITS.min(barcode_number.len()) {
            // get() refuses prefixes that split a multi-byte character.
            let Some(prefix) = barcode_number.get(..length) else {
                continue;
            };
            let Ok(candidate) = prefix.parse::<i64>() else {
                continue;
            };

            if let Some(packaging_type) = PackagingTypeEntity::find_by_id(candidate)
                .one(self.connection())
                .await?
            {
                return Ok(BarcodeValidation {
                    valid: true,
                    packaging_type_info: Some(packaging_type),
                });
            }
        }

        Ok(BarcodeValidation {
            valid: false,
            packaging_type_info: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    #[test]
    fn barcode_starts_with_type_id() {
        let barcode = BarcodeService::barcode_number(42);
        assert!(barcode.starts_with("42"));
        // id + 13-digit millis + 4-digit salt
        assert_eq!(barcode.len(), 2 + 13 + 4);
    }

    #[tokio::test]
    async fn non_ascii_barcode_is_invalid_not_a_panic() {
        // No digit prefix parses, so the store is never queried.
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let svc = BarcodeService::new(Arc::new(db));

        let validation = svc.validate("é12345").await.unwrap();

        assert!(!validation.valid);
        assert!(validation.packaging_type_info.is_none());
    }

    #[tokio::test]
    async fn unknown_numeric_barcode_is_invalid() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([
                Vec::<packaging_type::Model>::new(),
                Vec::<packaging_type::Model>::new(),
                Vec::<packaging_type::Model>::new(),
            ])
            .into_connection();
        let svc = BarcodeService::new(Arc::new(db));

        let validation = svc.validate("999").await.unwrap();

        assert!(!validation.valid);
    }
}
