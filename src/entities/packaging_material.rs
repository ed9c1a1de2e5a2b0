use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "packaging_materials")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub name: String,
    pub description: String,
    pub cost: Decimal,
    pub available_quantity: Decimal,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::packaging_type::Entity")]
    PackagingTypes,
}

impl Related<super::packaging_type::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PackagingTypes.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
