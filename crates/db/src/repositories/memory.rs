use std::collections::BTreeSet;

use tokio::sync::RwLock;

use carlot_core::domain::filters::FilterSet;
use carlot_core::domain::vehicle::Vehicle;

use super::{InventoryRepository, RepositoryError};

/// Inventory kept in insertion order, with the same matching rules as the SQL
/// repository.
#[derive(Default)]
pub struct InMemoryInventoryRepository {
    vehicles: RwLock<Vec<Vehicle>>,
}

impl InMemoryInventoryRepository {
    pub fn with_vehicles(vehicles: Vec<Vehicle>) -> Self {
        Self { vehicles: RwLock::new(vehicles) }
    }
}

fn contains_text(haystack: &str, needle: &Option<String>) -> bool {
    match needle.as_deref().map(str::trim).filter(|needle| !needle.is_empty()) {
        Some(needle) => haystack.to_ascii_lowercase().contains(&needle.to_ascii_lowercase()),
        None => true,
    }
}

fn matches(vehicle: &Vehicle, filters: &FilterSet) -> bool {
    contains_text(&vehicle.brand, &filters.brand)
        && contains_text(&vehicle.model, &filters.model)
        && filters.year_min.map_or(true, |min| vehicle.year >= min)
        && filters.year_max.map_or(true, |max| vehicle.year <= max)
        && filters.price_min.map_or(true, |min| vehicle.price >= min)
        && filters.price_max.map_or(true, |max| vehicle.price <= max)
        && contains_text(&vehicle.fuel_type, &filters.fuel_type)
        && contains_text(&vehicle.color, &filters.color)
        && contains_text(&vehicle.transmission, &filters.transmission)
        && filters.door_count.map_or(true, |doors| vehicle.doors == doors)
        && filters.max_mileage.map_or(true, |max| vehicle.mileage <= u64::from(max))
        && (filters.new_only != Some(true) || vehicle.is_new)
}

#[async_trait::async_trait]
impl InventoryRepository for InMemoryInventoryRepository {
    async fn all(&self) -> Result<Vec<Vehicle>, RepositoryError> {
        Ok(self.vehicles.read().await.clone())
    }

    async fn filtered(&self, filters: &FilterSet) -> Result<Vec<Vehicle>, RepositoryError> {
        let vehicles = self.vehicles.read().await;
        Ok(vehicles.iter().filter(|vehicle| matches(vehicle, filters)).cloned().collect())
    }

    async fn brands(&self) -> Result<Vec<String>, RepositoryError> {
        let vehicles = self.vehicles.read().await;
        let brands = vehicles.iter().map(|vehicle| vehicle.brand.clone()).collect::<BTreeSet<_>>();
        Ok(brands.into_iter().collect())
    }

    async fn insert(&self, vehicle: Vehicle) -> Result<bool, RepositoryError> {
        let mut vehicles = self.vehicles.write().await;
        if vehicles.iter().any(|existing| existing.chassis == vehicle.chassis) {
            return Ok(false);
        }
        vehicles.push(vehicle);
        Ok(true)
    }

    async fn count(&self) -> Result<u64, RepositoryError> {
        Ok(self.vehicles.read().await.len() as u64)
    }
}
