pub mod barcode;
pub mod customers;
pub mod hierarchy;
pub mod items;
pub mod labels;
pub mod packaging_materials;
pub mod packaging_types;
pub mod sales;
pub mod suppliers;
pub mod units;
pub mod warehouses;

pub use barcode::BarcodeService;
pub use customers::CustomerService;
pub use hierarchy::HierarchyService;
pub use items::ItemService;
pub use labels::LabelQueue;
pub use packaging_materials::PackagingMaterialService;
pub use packaging_types::PackagingTypeService;
pub use sales::SalesService;
pub use suppliers::SupplierService;
pub use units::UnitService;
pub use warehouses::WarehouseService;
