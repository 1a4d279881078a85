use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Compiled, typed query parameters. Field names on the wire are the
/// parameter names of the `get_vehicles_by_filters` tool.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSet {
    #[serde(rename = "marca", skip_serializing_if = "Option::is_none", default)]
    pub brand: Option<String>,
    #[serde(rename = "modelo", skip_serializing_if = "Option::is_none", default)]
    pub model: Option<String>,
    #[serde(rename = "ano_minimo", skip_serializing_if = "Option::is_none", default)]
    pub year_min: Option<i32>,
    #[serde(rename = "ano_maximo", skip_serializing_if = "Option::is_none", default)]
    pub year_max: Option<i32>,
    #[serde(
        rename = "preco_minimo",
        skip_serializing_if = "Option::is_none",
        default,
        with = "rust_decimal::serde::float_option"
    )]
    pub price_min: Option<Decimal>,
    #[serde(
        rename = "preco_maximo",
        skip_serializing_if = "Option::is_none",
        default,
        with = "rust_decimal::serde::float_option"
    )]
    pub price_max: Option<Decimal>,
    #[serde(rename = "combustivel", skip_serializing_if = "Option::is_none", default)]
    pub fuel_type: Option<String>,
    #[serde(rename = "cor", skip_serializing_if = "Option::is_none", default)]
    pub color: Option<String>,
    #[serde(rename = "cambio", skip_serializing_if = "Option::is_none", default)]
    pub transmission: Option<String>,
    #[serde(rename = "portas", skip_serializing_if = "Option::is_none", default)]
    pub door_count: Option<u32>,
    #[serde(rename = "quilometragem_maxima", skip_serializing_if = "Option::is_none", default)]
    pub max_mileage: Option<u32>,
    #[serde(rename = "apenas_veiculos_novos", skip_serializing_if = "Option::is_none", default)]
    pub new_only: Option<bool>,
}

impl FilterSet {
    /// `true` when no constraint was specified. This is not the same as a
    /// query that matched nothing.
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    pub fn len(&self) -> usize {
        self.to_arguments().len()
    }

    /// Tool-call arguments. Only present keys are emitted and prices are sent
    /// as JSON numbers.
    pub fn to_arguments(&self) -> Map<String, Value> {
        let mut arguments = match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        };
        for (key, price) in [("preco_minimo", self.price_min), ("preco_maximo", self.price_max)] {
            if let Some(number) = price.and_then(decimal_to_number) {
                arguments.insert(key.to_string(), Value::Number(number));
            }
        }
        arguments
    }
}

fn decimal_to_number(value: Decimal) -> Option<serde_json::Number> {
    let normalized = value.normalize();
    if normalized.scale() == 0 {
        return i64::try_from(normalized.mantissa()).ok().map(serde_json::Number::from);
    }
    normalized.to_string().parse::<f64>().ok().and_then(serde_json::Number::from_f64)
}
