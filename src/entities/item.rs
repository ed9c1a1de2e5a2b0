use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "items")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
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
    pub stock_quantity: i32,
    pub reorder_level: i32,
    pub warehouse_id: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::unit_of_measurement::Entity",
        from = "Column::UomId",
        to = "super::unit_of_measurement::Column::Id"
    )]
    UnitOfMeasurement,
    #[sea_orm(
        belongs_to = "super::packaging_type::Entity",
        from = "Column::PackagingTypeId",
        to = "super::packaging_type::Column::Id"
    )]
    PackagingType,
    #[sea_orm(
        belongs_to = "super::warehouse::Entity",
        from = "Column::WarehouseId",
        to = "super::warehouse::Column::Id"
    )]
    Warehouse,
}

impl Related<super::unit_of_measurement::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::UnitOfMeasurement.def()
    }
}

impl Related<super::packaging_type::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PackagingType.def()
    }
}

impl Related<super::warehouse::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Warehouse.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
