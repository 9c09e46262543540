pub mod admin_repo;
pub use admin_repo::{AdminStore, PgAdminRepository};
pub mod customer_repo;
pub use customer_repo::{CustomerStore, PgCustomerRepository};
pub mod promotion_repo;
pub use promotion_repo::{PgPromotionRepository, PromotionStore};
pub mod custom_field_repo;
pub use custom_field_repo::{CustomFieldStore, PgCustomFieldRepository};
pub mod store_repo;
pub use store_repo::{PgStoreRepository, StoreDirectory};
pub mod memory;
pub use memory::MemoryStore;

use std::sync::Arc;

use sqlx::PgPool;

/// Os stores que os serviços recebem, já como trait objects.
#[derive(Clone)]
pub struct Stores {
    pub admins: Arc<dyn AdminStore>,
    pub customers: Arc<dyn CustomerStore>,
    pub promotions: Arc<dyn PromotionStore>,
    pub custom_fields: Arc<dyn CustomFieldStore>,
    pub directory: Arc<dyn StoreDirectory>,
}

impl Stores {
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            admins: Arc::new(PgAdminRepository::new(pool.clone())),
            customers: Arc::new(PgCustomerRepository::new(pool.clone())),
            promotions: Arc::new(PgPromotionRepository::new(pool.clone())),
            custom_fields: Arc::new(PgCustomFieldRepository::new(pool.clone())),
            directory: Arc::new(PgStoreRepository::new(pool)),
        }
    }

    pub fn memory() -> Self {
        let store = Arc::new(MemoryStore::new());
        Self {
            admins: store.clone(),
            customers: store.clone(),
            promotions: store.clone(),
            custom_fields: store.clone(),
            directory: store,
        }
    }
}
