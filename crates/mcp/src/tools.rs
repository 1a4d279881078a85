//! Tool bodies for the inventory server.
//!
//! Parameters follow the loose conventions LLM-driven callers produce: empty
//! strings and zero or negative numbers mean "not specified".

use rmcp::schemars;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use carlot_core::domain::filters::FilterSet;
use carlot_core::inventory::{
    BrandListPayload, BrandVehiclesPayload, FilteredVehiclesPayload, PriceRange,
    PriceVehiclesPayload, VehicleListPayload, RESOURCE_ALL_VEHICLES, RESOURCE_BRANDS,
};
use carlot_db::InventoryRepository;

use crate::{McpError, McpResult};

#[derive(Debug, Default, Deserialize, schemars::JsonSchema)]
#[serde(default)]
pub struct FilterParams {
    #[schemars(description = "Marca do veículo (busca parcial, sem diferenciar maiúsculas)")]
    pub marca: String,
    #[schemars(description = "Modelo do veículo (busca parcial)")]
    pub modelo: String,
    #[schemars(description = "Ano mínimo de fabricação")]
    pub ano_minimo: i64,
    #[schemars(description = "Ano máximo de fabricação")]
    pub ano_maximo: i64,
    #[schemars(description = "Preço mínimo em reais")]
    pub preco_minimo: f64,
    #[schemars(description = "Preço máximo em reais")]
    pub preco_maximo: f64,
    #[schemars(description = "Tipo de combustível (Flex, Gasolina, Diesel, ...)")]
    pub combustivel: String,
    #[schemars(description = "Cor do veículo")]
    pub cor: String,
    #[schemars(description = "Tipo de câmbio (Manual ou Automático)")]
    pub cambio: String,
    #[schemars(description = "Número exato de portas")]
    pub portas: i64,
    #[schemars(description = "Quilometragem máxima")]
    pub quilometragem_maxima: i64,
    #[schemars(description = "Somente veículos zero quilômetro")]
    pub apenas_veiculos_novos: bool,
}

#[derive(Debug, Deserialize, Serialize, schemars::JsonSchema)]
pub struct BrandParams {
    #[schemars(description = "Marca a pesquisar")]
    pub marca: String,
}

#[derive(Debug, Deserialize, Serialize, schemars::JsonSchema)]
pub struct PriceParams {
    #[schemars(description = "Preço mínimo em reais")]
    pub preco_minimo: f64,
    #[schemars(description = "Preço máximo em reais")]
    pub preco_maximo: f64,
}

fn text(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn positive<T: TryFrom<i64>>(field: &str, value: i64) -> McpResult<Option<T>> {
    if value <= 0 {
        return Ok(None);
    }
    T::try_from(value)
        .map(Some)
        .map_err(|_| McpError::Validation(format!("`{field}` value {value} is out of range")))
}

fn price(field: &str, value: f64) -> McpResult<Option<Decimal>> {
    if !value.is_finite() {
        return Err(McpError::Validation(format!("`{field}` must be a finite number")));
    }
    if value <= 0.0 {
        return Ok(None);
    }
    Decimal::from_f64(value)
        .map(Some)
        .ok_or_else(|| McpError::Validation(format!("`{field}` value {value} is out of range")))
}

impl FilterParams {
    pub fn into_filter_set(self) -> McpResult<FilterSet> {
        Ok(FilterSet {
            brand: text(self.marca),
            model: text(self.modelo),
            year_min: positive("ano_minimo", self.ano_minimo)?,
            year_max: positive("ano_maximo", self.ano_maximo)?,
            price_min: price("preco_minimo", self.preco_minimo)?,
            price_max: price("preco_maximo", self.preco_maximo)?,
            fuel_type: text(self.combustivel),
            color: text(self.cor),
            transmission: text(self.cambio),
            door_count: positive("portas", self.portas)?,
            max_mileage: positive("quilometragem_maxima", self.quilometragem_maxima)?,
            new_only: self.apenas_veiculos_novos.then_some(true),
        })
    }
}

fn render<T: Serialize>(payload: &T) -> McpResult<String> {
    serde_json::to_string_pretty(payload).map_err(|e| McpError::Internal(e.to_string()))
}

pub async fn get_vehicles<R>(repository: &R) -> McpResult<String>
where
    R: InventoryRepository + ?Sized,
{
    let vehicles = repository.all().await?;
    render(&VehicleListPayload::new(vehicles))
}

pub async fn get_vehicles_by_filters<R>(repository: &R, params: FilterParams) -> McpResult<String>
where
    R: InventoryRepository + ?Sized,
{
    let filters = params.into_filter_set()?;
    debug!(filter_count = filters.len(), "querying inventory with filters");
    let vehicles = repository.filtered(&filters).await?;
    render(&FilteredVehiclesPayload::new(filters, vehicles))
}

pub async fn get_available_brands<R>(repository: &R) -> McpResult<String>
where
    R: InventoryRepository + ?Sized,
{
    let brands = repository.brands().await?;
    render(&BrandListPayload::new(brands))
}

pub async fn get_vehicles_by_brand<R>(repository: &R, params: BrandParams) -> McpResult<String>
where
    R: InventoryRepository + ?Sized,
{
    let brand = text(params.marca)
        .ok_or_else(|| McpError::Validation("`marca` must not be empty".to_string()))?;
    let filters = FilterSet { brand: Some(brand.clone()), ..FilterSet::default() };
    let vehicles = repository.filtered(&filters).await?;
    render(&BrandVehiclesPayload::new(brand, vehicles))
}

pub async fn get_vehicles_by_price<R>(repository: &R, params: PriceParams) -> McpResult<String>
where
    R: InventoryRepository + ?Sized,
{
    let minimum = price("preco_minimo", params.preco_minimo)?.unwrap_or(Decimal::ZERO);
    let maximum = price("preco_maximo", params.preco_maximo)?
        .ok_or_else(|| McpError::Validation("`preco_maximo` must be positive".to_string()))?;
    if minimum > maximum {
        return Err(McpError::Validation(format!(
            "`preco_minimo` ({minimum}) is greater than `preco_maximo` ({maximum})"
        )));
    }

    let filters = FilterSet {
        price_min: (minimum > Decimal::ZERO).then_some(minimum),
        price_max: Some(maximum),
        ..FilterSet::default()
    };
    let vehicles = repository.filtered(&filters).await?;
    render(&PriceVehiclesPayload::new(PriceRange { minimo: minimum, maximo: maximum }, vehicles))
}

/// Body of a read-only resource: the bare JSON array behind `uri`, or `None`
/// when no resource has that uri.
pub async fn read_resource<R>(repository: &R, uri: &str) -> McpResult<Option<String>>
where
    R: InventoryRepository + ?Sized,
{
    let body = match uri {
        RESOURCE_ALL_VEHICLES => render(&repository.all().await?)?,
        RESOURCE_BRANDS => render(&repository.brands().await?)?,
        _ => return Ok(None),
    };
    debug!(uri, "rendered inventory resource");
    Ok(Some(body))
}
