use std::collections::BTreeSet;

use rust_decimal::Decimal;

use carlot_core::domain::filters::FilterSet;
use carlot_core::domain::vehicle::Vehicle;

use crate::repositories::{InventoryRepository, RepositoryError};

/// (marca, modelo, ano, cor, preço em reais, km, novo, doc_ok, batida, chassi, combustível,
/// portas, câmbio)
type DemoRow = (
    &'static str,
    &'static str,
    i32,
    &'static str,
    i64,
    u64,
    bool,
    bool,
    bool,
    &'static str,
    &'static str,
    u32,
    &'static str,
);

#[rustfmt::skip]
const DEMO_ROWS: &[DemoRow] = &[
    ("Toyota", "Corolla", 2022, "Preto", 125_000, 18_000, false, true, false, "9BRBL3HE0N0100001", "Flex", 4, "Automático"),
    ("Toyota", "Yaris", 2024, "Branco", 98_500, 0, true, true, false, "9BRKB3F30R0100002", "Flex", 4, "Automático"),
    ("Toyota", "Hilux", 2019, "Prata", 189_900, 74_000, false, true, false, "8AJHA8CD0K0100003", "Diesel", 4, "Manual"),
    ("Honda", "Civic", 2021, "Cinza", 118_000, 32_000, false, true, false, "93HFC2630M0100004", "Flex", 4, "Automático"),
    ("Honda", "Fit", 2018, "Vermelho", 69_900, 61_500, false, true, true, "93HGK5870J0100005", "Flex", 4, "Manual"),
    ("Volkswagen", "Gol", 2020, "Branco", 52_000, 45_000, false, true, false, "9BWAB45U0L0100006", "Flex", 2, "Manual"),
    ("Volkswagen", "T-Cross", 2024, "Azul", 149_990, 0, true, true, false, "9BWBH6BF0R0100007", "Flex", 4, "Automático"),
    ("Fiat", "Argo", 2023, "Vermelho", 79_900, 9_800, false, true, false, "9BD358A10P0100008", "Flex", 4, "Manual"),
    ("Fiat", "Toro", 2022, "Preto", 139_000, 27_300, false, false, false, "9BD226A40N0100009", "Diesel", 4, "Automático"),
    ("Chevrolet", "Onix", 2024, "Prata", 89_990, 0, true, true, false, "9BGEB48A0R0100010", "Flex", 4, "Automático"),
    ("Chevrolet", "S10", 2017, "Branco", 132_000, 98_000, false, true, true, "9BG148HH0H0100011", "Diesel", 4, "Manual"),
    ("Hyundai", "HB20", 2021, "Azul", 67_500, 38_200, false, true, false, "9BHBG51D0M0100012", "Flex", 4, "Manual"),
    ("Nissan", "Kicks", 2023, "Laranja", 112_400, 12_600, false, true, false, "94DFCAP10P0100013", "Flex", 4, "Automático"),
    ("Ford", "Ranger", 2020, "Cinza", 175_000, 56_000, false, true, false, "8AFAR22L0L0100014", "Diesel", 4, "Automático"),
];

/// The deterministic demo inventory used by the `seed` command and tests.
pub fn demo_vehicles() -> Vec<Vehicle> {
    DEMO_ROWS
        .iter()
        .map(
            |&(
                brand,
                model,
                year,
                color,
                price,
                mileage,
                is_new,
                doc_ok,
                crashed,
                chassis,
                fuel_type,
                doors,
                transmission,
            )| Vehicle {
                brand: brand.to_string(),
                model: model.to_string(),
                year,
                color: color.to_string(),
                price: Decimal::new(price, 0),
                mileage,
                is_new,
                doc_ok,
                crashed,
                chassis: chassis.to_string(),
                fuel_type: fuel_type.to_string(),
                doors,
                transmission: transmission.to_string(),
            },
        )
        .collect()
}

pub struct DemoInventory;

impl DemoInventory {
    /// Inserts the demo inventory. Vehicles already present (by chassis) are
    /// skipped, so loading twice leaves the store unchanged.
    pub async fn load<R>(repository: &R) -> Result<SeedResult, RepositoryError>
    where
        R: InventoryRepository + ?Sized,
    {
        let mut result = SeedResult::default();
        for vehicle in demo_vehicles() {
            if repository.insert(vehicle).await? {
                result.inserted += 1;
            } else {
                result.skipped += 1;
            }
        }
        Ok(result)
    }

    pub async fn verify<R>(repository: &R) -> Result<VerificationResult, RepositoryError>
    where
        R: InventoryRepository + ?Sized,
    {
        let expected = demo_vehicles();
        let mut checks = Vec::new();

        let stored = repository.all().await?;
        let stored_chassis =
            stored.iter().map(|vehicle| vehicle.chassis.as_str()).collect::<BTreeSet<_>>();
        checks.push((
            "demo-chassis-present",
            expected.iter().all(|vehicle| stored_chassis.contains(vehicle.chassis.as_str())),
        ));
        let intact = expected.iter().all(|vehicle| stored.contains(vehicle));
        checks.push(("demo-records-intact", intact));

        let count = repository.count().await?;
        checks.push(("vehicle-count", count >= expected.len() as u64));

        let brands = repository.brands().await?;
        let expected_brands =
            expected.iter().map(|vehicle| vehicle.brand.clone()).collect::<BTreeSet<_>>();
        checks.push(("brands-listed", expected_brands.iter().all(|brand| brands.contains(brand))));

        let new_only = FilterSet { new_only: Some(true), ..FilterSet::default() };
        let new_vehicles = repository.filtered(&new_only).await?;
        checks.push((
            "new-vehicles-queryable",
            expected
                .iter()
                .filter(|vehicle| vehicle.is_new)
                .all(|vehicle| new_vehicles.contains(vehicle)),
        ));

        let all_present = checks.iter().all(|(_, passed)| *passed);
        Ok(VerificationResult { all_present, checks })
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct SeedResult {
    pub inserted: usize,
    pub skipped: usize,
}

#[derive(Debug)]
pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<(&'static str, bool)>,
}
