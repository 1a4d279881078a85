//! Tool vocabulary shared by the inventory tool server and its clients.
//!
//! Payload structs mirror the JSON documents the server returns so both sides
//! agree on field names without string matching.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::filters::FilterSet;
use crate::domain::vehicle::Vehicle;

pub const TOOL_GET_VEHICLES: &str = "get_vehicles";
pub const TOOL_GET_VEHICLES_BY_FILTERS: &str = "get_vehicles_by_filters";
pub const TOOL_GET_AVAILABLE_BRANDS: &str = "get_available_brands";
pub const TOOL_GET_VEHICLES_BY_BRAND: &str = "get_vehicles_by_brand";
pub const TOOL_GET_VEHICLES_BY_PRICE: &str = "get_vehicles_by_price";

pub const ALL_TOOL_NAMES: &[&str] = &[
    TOOL_GET_VEHICLES,
    TOOL_GET_VEHICLES_BY_FILTERS,
    TOOL_GET_AVAILABLE_BRANDS,
    TOOL_GET_VEHICLES_BY_BRAND,
    TOOL_GET_VEHICLES_BY_PRICE,
];

/// Read-only resource holding every vehicle as a bare JSON array.
pub const RESOURCE_ALL_VEHICLES: &str = "vehicles://all";
/// Read-only resource holding the distinct brands as a bare JSON array.
pub const RESOURCE_BRANDS: &str = "vehicles://brands";

/// Key of the records collection present in every vehicle listing payload.
pub const RECORDS_KEY: &str = "veiculos";
/// Key of the brand collection in the brand listing payload.
pub const BRANDS_KEY: &str = "marcas";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VehicleListPayload {
    pub total_veiculos: usize,
    pub veiculos: Vec<Vehicle>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilteredVehiclesPayload {
    pub filtros_aplicados: FilterSet,
    pub veiculos_encontrados: usize,
    pub veiculos: Vec<Vehicle>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrandListPayload {
    pub total_marcas: usize,
    pub marcas: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrandVehiclesPayload {
    pub marca_pesquisada: String,
    pub veiculos_encontrados: usize,
    pub veiculos: Vec<Vehicle>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceRange {
    #[serde(with = "rust_decimal::serde::float")]
    pub minimo: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub maximo: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceVehiclesPayload {
    pub faixa_preco: PriceRange,
    pub veiculos_encontrados: usize,
    pub veiculos: Vec<Vehicle>,
}

impl VehicleListPayload {
    pub fn new(veiculos: Vec<Vehicle>) -> Self {
        Self { total_veiculos: veiculos.len(), veiculos }
    }
}

impl FilteredVehiclesPayload {
    pub fn new(filtros_aplicados: FilterSet, veiculos: Vec<Vehicle>) -> Self {
        Self { filtros_aplicados, veiculos_encontrados: veiculos.len(), veiculos }
    }
}

impl BrandListPayload {
    pub fn new(marcas: Vec<String>) -> Self {
        Self { total_marcas: marcas.len(), marcas }
    }
}

impl BrandVehiclesPayload {
    pub fn new(marca_pesquisada: impl Into<String>, veiculos: Vec<Vehicle>) -> Self {
        Self {
            marca_pesquisada: marca_pesquisada.into(),
            veiculos_encontrados: veiculos.len(),
            veiculos,
        }
    }
}

impl PriceVehiclesPayload {
    pub fn new(faixa_preco: PriceRange, veiculos: Vec<Vehicle>) -> Self {
        Self { faixa_preco, veiculos_encontrados: veiculos.len(), veiculos }
    }
}
