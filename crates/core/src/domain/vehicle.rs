use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A vehicle row as stored in the dealership inventory.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vehicle {
    #[serde(rename = "marca")]
    pub brand: String,
    #[serde(rename = "modelo")]
    pub model: String,
    #[serde(rename = "ano")]
    pub year: i32,
    #[serde(rename = "cor")]
    pub color: String,
    #[serde(rename = "preco", with = "rust_decimal::serde::float")]
    pub price: Decimal,
    #[serde(rename = "kilometragem")]
    pub mileage: u64,
    #[serde(rename = "novo")]
    pub is_new: bool,
    pub doc_ok: bool,
    #[serde(rename = "batida")]
    pub crashed: bool,
    #[serde(rename = "chassi")]
    pub chassis: String,
    #[serde(rename = "combustivel")]
    pub fuel_type: String,
    #[serde(rename = "portas")]
    pub doors: u32,
    #[serde(rename = "cambio")]
    pub transmission: String,
}

/// The subset of a vehicle the conversation renders. Extra fields in a
/// payload are ignored and the price may arrive as a number or a string.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VehicleRecord {
    #[serde(rename = "marca")]
    pub brand: String,
    #[serde(rename = "modelo")]
    pub model: String,
    #[serde(rename = "ano")]
    pub year: i32,
    #[serde(rename = "cor")]
    pub color: String,
    #[serde(rename = "preco")]
    pub price: Decimal,
    #[serde(rename = "kilometragem")]
    pub mileage: u64,
    #[serde(rename = "combustivel")]
    pub fuel_type: String,
    #[serde(rename = "cambio")]
    pub transmission: String,
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use serde_json::json;

    use super::{Vehicle, VehicleRecord};

    fn corolla() -> Vehicle {
        Vehicle {
            brand: "Toyota".to_string(),
            model: "Corolla".to_string(),
            year: 2022,
            color: "Preto".to_string(),
            price: Decimal::new(8_500_000, 2),
            mileage: 10_000,
            is_new: false,
            doc_ok: true,
            crashed: false,
            chassis: "ABC123456789".to_string(),
            fuel_type: "Flex".to_string(),
            doors: 4,
            transmission: "Automático".to_string(),
        }
    }

    #[test]
    fn vehicle_serializes_with_inventory_field_names() {
        let value = serde_json::to_value(corolla()).expect("serialize vehicle");
        for key in [
            "marca",
            "modelo",
            "ano",
            "cor",
            "preco",
            "kilometragem",
            "novo",
            "doc_ok",
            "batida",
            "chassi",
            "combustivel",
            "portas",
            "cambio",
        ] {
            assert!(value.get(key).is_some(), "missing `{key}`");
        }
    }

    #[test]
    fn record_accepts_numeric_price_and_ignores_extra_fields() {
        let record: VehicleRecord = serde_json::from_value(json!({
            "marca": "Honda",
            "modelo": "Civic",
            "ano": 2021,
            "cor": "Branco",
            "preco": 92000.0,
            "kilometragem": 15000,
            "combustivel": "Flex",
            "cambio": "Manual",
            "chassi": "XYZ"
        }))
        .expect("record should decode");

        assert_eq!(record.price, Decimal::new(92_000, 0));
        assert_eq!(record.mileage, 15_000);
    }
}
