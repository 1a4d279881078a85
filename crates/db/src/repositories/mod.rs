use async_trait::async_trait;
use thiserror::Error;

use carlot_core::domain::filters::FilterSet;
use carlot_core::domain::vehicle::Vehicle;

pub mod memory;
pub mod vehicle;

pub use memory::InMemoryInventoryRepository;
pub use vehicle::SqlInventoryRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

/// Query capability over the dealership inventory.
///
/// Text filters match case-insensitive substrings, year/price/mileage bounds
/// are inclusive, doors match exactly and `new_only = Some(true)` keeps new
/// vehicles only. Results come back in insertion order.
#[async_trait]
pub trait InventoryRepository: Send + Sync {
    async fn all(&self) -> Result<Vec<Vehicle>, RepositoryError>;
    async fn filtered(&self, filters: &FilterSet) -> Result<Vec<Vehicle>, RepositoryError>;
    /// Distinct brands, sorted.
    async fn brands(&self) -> Result<Vec<String>, RepositoryError>;
    /// Inserts a vehicle unless one with the same chassis exists. Returns
    /// whether a row was written.
    async fn insert(&self, vehicle: Vehicle) -> Result<bool, RepositoryError>;
    async fn count(&self) -> Result<u64, RepositoryError>;
}
