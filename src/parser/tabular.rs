//! ERDDAP `.json` tables: `{"table": {"columnNames": [...], "rows": [[...], ...]}}`.

use super::{
    build_measurement, collect_records, epoch_seconds, parse_number, parse_optional_number,
    parse_timestamp, ParseContext, RowError, RowFields,
};
use crate::error::{AppError, Result};
use crate::models::{Biogeochemistry, ObservationRecord};
use serde::Deserialize;
use serde_json::Value;

/// Variables requested from `.json` endpoints. Columns are matched by name,
/// so the optional biogeochemistry columns can ride along.
pub const VARIABLES: [&str; 10] = [
    "platform_number",
    "time",
    "latitude",
    "longitude",
    "pres",
    "temp",
    "psal",
    "doxy",
    "chla",
    "nitrate",
];

#[derive(Debug, Deserialize)]
struct TablePayload {
    table: Table,
}

#[derive(Debug, Deserialize)]
struct Table {
    #[serde(rename = "columnNames")]
    column_names: Vec<String>,
    rows: Vec<Vec<Value>>,
}

/// Positions of the columns this parser understands.
#[derive(Debug)]
struct Columns {
    time: usize,
    latitude: usize,
    longitude: usize,
    temperature: usize,
    salinity: usize,
    pressure: usize,
    platform: Option<usize>,
    depth: Option<usize>,
    oxygen: Option<usize>,
    chlorophyll: Option<usize>,
    nitrate: Option<usize>,
}

impl Columns {
    fn locate(names: &[String]) -> Result<Self> {
        let find = |aliases: &[&str]| {
            names
                .iter()
                .position(|n| aliases.iter().any(|a| n.eq_ignore_ascii_case(a)))
        };
        let require = |aliases: &[&str]| {
            find(aliases).ok_or_else(|| {
                AppError::Structural(format!(
                    "required column '{}' not found in [{}]",
                    aliases[0],
                    names.join(", ")
                ))
            })
        };

        Ok(Self {
            time: require(&["time"])?,
            latitude: require(&["latitude", "lat"])?,
            longitude: require(&["longitude", "lon"])?,
            temperature: require(&["temp", "temperature"])?,
            salinity: require(&["psal", "salinity"])?,
            pressure: require(&["pres", "pressure"])?,
            // Platform ids fall back to placeholders when absent
            platform: find(&["platform_number", "float_id"]),
            depth: find(&["depth"]),
            oxygen: find(&["doxy", "oxygen"]),
            chlorophyll: find(&["chla", "chlorophyll"]),
            nitrate: find(&["nitrate"]),
        })
    }
}

pub fn parse(payload: &str, ctx: &ParseContext) -> Result<Vec<ObservationRecord>> {
    let payload: TablePayload = serde_json::from_str(payload)
        .map_err(|e| AppError::Structural(format!("not an ERDDAP JSON table: {}", e)))?;
    let columns = Columns::locate(&payload.table.column_names)?;

    let rows = payload
        .table
        .rows
        .iter()
        .enumerate()
        .map(|(i, row)| (i, decode_row(row, &columns).and_then(|f| build_measurement(f, i))));

    Ok(collect_records(rows, ctx, "tabular"))
}

fn decode_row(row: &[Value], columns: &Columns) -> std::result::Result<RowFields, RowError> {
    let cell = |idx: usize| row.get(idx).and_then(cell_text);
    let number = |field: &'static str, idx: usize| -> std::result::Result<f64, RowError> {
        let text = cell(idx).ok_or(RowError::MissingField(field))?;
        parse_number(field, &text)
    };

    let timestamp = match row.get(columns.time) {
        Some(Value::Number(n)) => n
            .as_f64()
            .and_then(epoch_seconds)
            .ok_or_else(|| RowError::InvalidTimestamp(n.to_string()))?,
        Some(Value::String(s)) => parse_timestamp(s)?,
        _ => return Err(RowError::MissingField("time")),
    };

    let optional = |idx: Option<usize>| idx.and_then(|i| parse_optional_number(cell(i).as_deref()));

    Ok(RowFields {
        float_id: columns.platform.and_then(cell).map(|s| s.trim().to_string()),
        timestamp,
        latitude: number("latitude", columns.latitude)?,
        longitude: number("longitude", columns.longitude)?,
        pressure: Some(number("pres", columns.pressure)?),
        depth: optional(columns.depth),
        temperature: number("temp", columns.temperature)?,
        salinity: number("psal", columns.salinity)?,
        bgc: Biogeochemistry {
            oxygen: optional(columns.oxygen),
            chlorophyll: optional(columns.chlorophyll),
            nitrate: optional(columns.nitrate),
            ..Default::default()
        },
    })
}

fn cell_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
