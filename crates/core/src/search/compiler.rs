use std::str::FromStr;

use rust_decimal::Decimal;

use crate::domain::criteria::{Criteria, Scalar};
use crate::domain::filters::FilterSet;
use crate::errors::CoercionError;

/// Result of compiling criteria: the usable filters plus every criterion that
/// was dropped because it could not be coerced.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Compilation {
    pub filters: FilterSet,
    pub dropped: Vec<CoercionError>,
}

pub trait FilterCompiler: Send + Sync {
    fn compile(&self, criteria: &Criteria) -> Compilation;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct DeterministicFilterCompiler;

impl FilterCompiler for DeterministicFilterCompiler {
    fn compile(&self, criteria: &Criteria) -> Compilation {
        compile_with_report(criteria)
    }
}

pub fn compile(criteria: &Criteria) -> FilterSet {
    compile_with_report(criteria).filters
}

/// Zero and negative numbers mean "unconstrained", matching the tool
/// server's parameter defaults. A `false` new-only flag constrains nothing and
/// is dropped as well.
pub fn compile_with_report(criteria: &Criteria) -> Compilation {
    let mut dropped = Vec::new();
    let mut filters = FilterSet {
        brand: text(&criteria.brand),
        model: text(&criteria.model),
        fuel_type: text(&criteria.fuel_type),
        color: text(&criteria.color),
        transmission: text(&criteria.transmission),
        ..FilterSet::default()
    };

    filters.door_count = keep(&mut dropped, "portas", criteria.door_count.as_ref(), positive_u32);
    filters.max_mileage = keep(
        &mut dropped,
        "quilometragem_maxima",
        criteria.max_mileage.as_ref(),
        positive_u32,
    );
    filters.new_only =
        keep(&mut dropped, "apenas_novos", criteria.new_only.as_ref(), flag).filter(|only| *only);

    match keep(&mut dropped, "ano_especifico", criteria.year_exact.as_ref(), positive_i32) {
        Some(year) => {
            filters.year_min = Some(year);
            filters.year_max = Some(year);
        }
        None => {
            filters.year_min =
                keep(&mut dropped, "ano_minimo", criteria.year_min.as_ref(), positive_i32);
            filters.year_max =
                keep(&mut dropped, "ano_maximo", criteria.year_max.as_ref(), positive_i32);
        }
    }

    filters.price_min = keep(&mut dropped, "preco_minimo", criteria.price_min.as_ref(), price);
    filters.price_max = keep(&mut dropped, "preco_maximo", criteria.price_max.as_ref(), price);

    Compilation { filters, dropped }
}

type Coerce<T> = fn(&Scalar) -> Result<Option<T>, &'static str>;

fn keep<T>(
    dropped: &mut Vec<CoercionError>,
    field: &'static str,
    value: Option<&Scalar>,
    coerce: Coerce<T>,
) -> Option<T> {
    let value = value?;
    match coerce(value) {
        Ok(coerced) => coerced,
        Err(expected) => {
            dropped.push(CoercionError { field, value: describe(value), expected });
            None
        }
    }
}

fn text(value: &Option<String>) -> Option<String> {
    value.as_deref().map(str::trim).filter(|text| !text.is_empty()).map(str::to_owned)
}

fn describe(value: &Scalar) -> String {
    match value {
        Scalar::Bool(flag) => flag.to_string(),
        Scalar::Number(number) => number.to_string(),
        Scalar::Text(text) => text.clone(),
        Scalar::Other(other) => other.to_string(),
    }
}

fn integer(value: &Scalar) -> Option<i64> {
    match value {
        Scalar::Number(number) => number.as_i64().or_else(|| {
            number.as_f64().filter(|float| float.fract() == 0.0).map(|float| float as i64)
        }),
        Scalar::Text(text) => {
            let trimmed = text.trim();
            trimmed.parse::<i64>().ok().or_else(|| {
                trimmed
                    .parse::<f64>()
                    .ok()
                    .filter(|float| float.is_finite() && float.fract() == 0.0)
                    .map(|float| float as i64)
            })
        }
        Scalar::Bool(_) | Scalar::Other(_) => None,
    }
}

fn positive_i32(value: &Scalar) -> Result<Option<i32>, &'static str> {
    let number = integer(value).ok_or("integer")?;
    if number <= 0 {
        return Ok(None);
    }
    i32::try_from(number).map(Some).map_err(|_| "integer")
}

fn positive_u32(value: &Scalar) -> Result<Option<u32>, &'static str> {
    let number = integer(value).ok_or("integer")?;
    if number <= 0 {
        return Ok(None);
    }
    u32::try_from(number).map(Some).map_err(|_| "integer")
}

fn price(value: &Scalar) -> Result<Option<Decimal>, &'static str> {
    let raw = match value {
        Scalar::Number(number) => number.to_string(),
        Scalar::Text(text) => text.trim().to_owned(),
        Scalar::Bool(_) | Scalar::Other(_) => return Err("decimal"),
    };
    let parsed = Decimal::from_str(&raw)
        .or_else(|_| Decimal::from_scientific(&raw))
        .map_err(|_| "decimal")?;
    Ok((parsed > Decimal::ZERO).then_some(parsed))
}

fn flag(value: &Scalar) -> Result<Option<bool>, &'static str> {
    match value {
        Scalar::Bool(flag) => Ok(Some(*flag)),
        Scalar::Number(number) => match number.as_i64() {
            Some(0) => Ok(Some(false)),
            Some(1) => Ok(Some(true)),
            _ => Err("boolean"),
        },
        Scalar::Text(text) => match text.trim().to_lowercase().as_str() {
            "true" | "sim" | "yes" => Ok(Some(true)),
            "false" | "não" | "nao" | "no" => Ok(Some(false)),
            _ => Err("boolean"),
        },
        Scalar::Other(_) => Err("boolean"),
    }
}
