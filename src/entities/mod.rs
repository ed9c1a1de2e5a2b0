pub mod customer;
pub mod item;
pub mod packaging_material;
pub mod packaging_type;
pub mod sales_record;
pub mod supplier;
pub mod supplier_material;
pub mod unit_of_measurement;
pub mod warehouse;
