use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "suppliers")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub name: String,
    pub contact_person: String,
    pub phone: String,
    #[sea_orm(unique)]
    pub email: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::supplier_material::Entity")]
    SupplierMaterials,
}

impl Related<super::supplier_material::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SupplierMaterials.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
