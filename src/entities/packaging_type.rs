use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A packaging type with cost, on-hand quantity, and an optional parent
/// packaging type. The `parent_id` self-reference forms a forest; children
/// are derived by filtering on `parent_id`.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "packaging_types")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
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
    pub level: String,
    pub parent_id: Option<i64>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::packaging_material::Entity",
        from = "Column::MaterialId",
        to = "super::packaging_material::Column::Id"
    )]
    Material,
    #[sea_orm(
        belongs_to = "Entity",
        from = "Column::ParentId",
        to = "Column::Id"
    )]
    Parent,
    #[sea_orm(has_many = "super::item::Entity")]
    Items,
    #[sea_orm(has_many = "super::sales_record::Entity")]
    SalesRecords,
}

impl Related<super::packaging_material::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Material.def()
    }
}

impl Related<super::item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Items.def()
    }
}

impl Related<super::sales_record::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SalesRecords.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
