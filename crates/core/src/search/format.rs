use rust_decimal::Decimal;
use serde_json::Value;

use crate::domain::vehicle::VehicleRecord;
use crate::errors::FormatError;
use crate::inventory::RECORDS_KEY;

pub const MAX_LISTED_VEHICLES: usize = 5;

pub const NO_MATCHES_MESSAGE: &str =
    "Não encontrei veículos com esses critérios. Quer tentar outros filtros?";
pub const CLOSING_PROMPT: &str = "Algum desses te interessou? Posso ajudar com mais detalhes!";

/// Renders a tool payload for the conversation. Payloads without a records
/// collection, or with records that cannot be decoded, are returned unchanged.
pub fn format_results(payload: &str) -> String {
    try_format_results(payload).unwrap_or_else(|_| payload.to_owned())
}

pub fn try_format_results(payload: &str) -> Result<String, FormatError> {
    let document: Value =
        serde_json::from_str(payload).map_err(|error| FormatError::InvalidJson(error.to_string()))?;
    let records = document
        .get(RECORDS_KEY)
        .and_then(Value::as_array)
        .ok_or(FormatError::MissingRecords)?;

    if records.is_empty() {
        return Ok(NO_MATCHES_MESSAGE.to_owned());
    }

    let total = records.len();
    let shown = total.min(MAX_LISTED_VEHICLES);
    let vehicles = records
        .iter()
        .take(shown)
        .enumerate()
        .map(|(index, record)| {
            serde_json::from_value::<VehicleRecord>(record.clone()).map_err(|error| {
                FormatError::InvalidRecord { index, reason: error.to_string() }
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut output = format!("Encontrei {total} veículo(s) que atendem seus critérios:\n\n");
    for (position, vehicle) in vehicles.iter().enumerate() {
        output.push_str(&render_vehicle(position + 1, vehicle));
    }
    if total > shown {
        let remaining = total - shown;
        output.push_str(&format!("... e mais {remaining} opções disponíveis! (+{remaining})\n\n"));
    }
    output.push_str(CLOSING_PROMPT);
    Ok(output)
}

fn render_vehicle(position: usize, vehicle: &VehicleRecord) -> String {
    format!(
        "{position}. **{} {} {}**\n   R$ {}\n   {} | {} km\n   {} | {}\n\n",
        vehicle.brand,
        vehicle.model,
        vehicle.year,
        format_price(vehicle.price),
        vehicle.color,
        group_thousands(&vehicle.mileage.to_string()),
        vehicle.fuel_type,
        vehicle.transmission,
    )
}

/// Two decimal places with comma-grouped thousands, e.g. `85,000.00`.
pub fn format_price(price: Decimal) -> String {
    let fixed = format!("{:.2}", price.round_dp(2));
    let (sign, unsigned) = match fixed.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", fixed.as_str()),
    };
    let (integer, fraction) = unsigned.split_once('.').unwrap_or((unsigned, "00"));
    format!("{sign}{}.{fraction}", group_thousands(integer))
}

fn group_thousands(digits: &str) -> String {
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, digit) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    grouped
}
