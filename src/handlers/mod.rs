pub mod barcodes;
pub mod common;
pub mod customers;
pub mod items;
pub mod labels;
pub mod packaging_materials;
pub mod packaging_types;
pub mod sales;
pub mod suppliers;
pub mod units;
pub mod warehouses;

use std::sync::Arc;

use crate::db::DbPool;
use crate::events::EventSender;
use crate::services::{
    BarcodeService, CustomerService, HierarchyService, ItemService, LabelQueue,
    PackagingMaterialService, PackagingTypeService, SalesService, SupplierService, UnitService,
    WarehouseService,
};

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub hierarchy: Arc<HierarchyService>,
    pub label_queue: Arc<LabelQueue>,
    pub packaging_types: Arc<PackagingTypeService>,
    pub materials: Arc<PackagingMaterialService>,
    pub warehouses: Arc<WarehouseService>,
    pub items: Arc<ItemService>,
    pub units: Arc<UnitService>,
    pub customers: Arc<CustomerService>,
    pub suppliers: Arc<SupplierService>,
    pub sales: Arc<SalesService>,
    pub barcodes: Arc<BarcodeService>,
}

impl AppServices {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        let hierarchy = HierarchyService::new(db_pool.clone(), event_sender.clone());
        let sales = SalesService::new(db_pool.clone(), event_sender.clone(), hierarchy.clone());

        Self {
            hierarchy: Arc::new(hierarchy),
            label_queue: Arc::new(LabelQueue::new(event_sender.clone())),
            packaging_types: Arc::new(PackagingTypeService::new(
                db_pool.clone(),
                event_sender.clone(),
            )),
            materials: Arc::new(PackagingMaterialService::new(
                db_pool.clone(),
                event_sender.clone(),
            )),
            warehouses: Arc::new(WarehouseService::new(db_pool.clone(), event_sender.clone())),
            items: Arc::new(ItemService::new(db_pool.clone(), event_sender.clone())),
            units: Arc::new(UnitService::new(db_pool.clone())),
            customers: Arc::new(CustomerService::new(db_pool.clone(), event_sender.clone())),
            suppliers: Arc::new(SupplierService::new(db_pool.clone(), event_sender.clone())),
            sales: Arc::new(sales),
            barcodes: Arc::new(BarcodeService::new(db_pool)),
        }
    }
}
