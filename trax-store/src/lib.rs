pub mod app_config;
pub mod database;
pub mod inventory_repo;
pub mod lock_repo;
pub mod memory;
pub mod order_repo;

pub use app_config::{BusinessRules, Config};
pub use database::DbClient;
pub use inventory_repo::PgInventoryRepository;
pub use lock_repo::PgLockRepository;
pub use memory::MemoryStore;
pub use order_repo::PgOrderRepository;

pub(crate) fn storage_err(e: sqlx::Error) -> trax_core::BookingError {
    trax_core::BookingError::Storage(e.to_string())
}

