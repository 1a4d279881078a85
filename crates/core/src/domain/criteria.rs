use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Number, Value};

/// A raw value extracted by the classification engine before it is coerced to
/// the type the filter schema declares. The engine is free to send `"2022"`,
/// `2022` or `2022.0` for the same year, so coercion happens in the compiler.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Bool(bool),
    Number(Number),
    Text(String),
    Other(Value),
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Self::Number(Number::from(value))
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// Sparse search dimensions identified in one utterance. Every field is
/// independently optional; absence means "unconstrained".
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Criteria {
    #[serde(rename = "marca", deserialize_with = "lenient_text")]
    pub brand: Option<String>,
    #[serde(rename = "modelo", deserialize_with = "lenient_text")]
    pub model: Option<String>,
    #[serde(rename = "ano_especifico", deserialize_with = "lenient_scalar")]
    pub year_exact: Option<Scalar>,
    #[serde(rename = "ano_minimo", deserialize_with = "lenient_scalar")]
    pub year_min: Option<Scalar>,
    #[serde(rename = "ano_maximo", deserialize_with = "lenient_scalar")]
    pub year_max: Option<Scalar>,
    #[serde(rename = "preco_minimo", deserialize_with = "lenient_scalar")]
    pub price_min: Option<Scalar>,
    #[serde(rename = "preco_maximo", deserialize_with = "lenient_scalar")]
    pub price_max: Option<Scalar>,
    #[serde(rename = "combustivel", deserialize_with = "lenient_text")]
    pub fuel_type: Option<String>,
    #[serde(rename = "cor", deserialize_with = "lenient_text")]
    pub color: Option<String>,
    #[serde(rename = "cambio", deserialize_with = "lenient_text")]
    pub transmission: Option<String>,
    #[serde(rename = "portas", deserialize_with = "lenient_scalar")]
    pub door_count: Option<Scalar>,
    #[serde(rename = "quilometragem_maxima", deserialize_with = "lenient_scalar")]
    pub max_mileage: Option<Scalar>,
    #[serde(rename = "apenas_novos", deserialize_with = "lenient_scalar")]
    pub new_only: Option<Scalar>,
}

impl Criteria {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    pub fn with_brand(mut self, brand: impl Into<String>) -> Self {
        self.brand = Some(brand.into());
        self
    }
}

/// Text markers engines emit instead of a JSON `null`.
const NULL_MARKERS: &[&str] = &["null", "none", "nil", "n/a"];

pub fn is_blank_marker(value: &str) -> bool {
    let trimmed = value.trim();
    trimmed.is_empty() || NULL_MARKERS.iter().any(|marker| trimmed.eq_ignore_ascii_case(marker))
}

fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(text)) if !is_blank_marker(&text) => Some(text.trim().to_string()),
        Some(Value::Number(number)) => Some(number.to_string()),
        _ => None,
    })
}

fn lenient_scalar<'de, D>(deserializer: D) -> Result<Option<Scalar>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Scalar>::deserialize(deserializer)?;
    Ok(match value {
        Some(Scalar::Text(text)) if is_blank_marker(&text) => None,
        Some(Scalar::Other(Value::Null)) => None,
        other => other,
    })
}
