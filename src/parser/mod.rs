pub mod bgc;
pub mod delimited;
pub mod probe;
pub mod tabular;

use crate::error::Result;
use crate::models::{
    depth_from_pressure, pressure_from_depth, Biogeochemistry, Measurement, ObservationRecord,
};
use crate::region::{classify, RegionQuery};
use chrono::{DateTime, TimeZone, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use thiserror::Error;
use tracing::{debug, warn};

/// Why a single row was dropped. Never aborts the whole payload.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RowError {
    #[error("missing field '{0}'")]
    MissingField(&'static str),

    #[error("invalid number '{value}' in field '{field}'")]
    InvalidNumber { field: &'static str, value: String },

    #[error("non-finite value in field '{0}'")]
    NonFinite(&'static str),

    #[error("{field} {value} out of range")]
    OutOfRange { field: &'static str, value: f64 },

    #[error("negative {field}: {value}")]
    Negative { field: &'static str, value: f64 },

    #[error("invalid timestamp '{0}'")]
    InvalidTimestamp(String),

    #[error("expected at least {expected} columns, got {actual}")]
    TooFewColumns { expected: usize, actual: usize },
}

/// Wire format a candidate's payload is decoded with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadFormat {
    TabularJson,
    DelimitedText,
    ReachabilityProbe,
}

impl PayloadFormat {
    pub fn extension(&self) -> Option<&'static str> {
        match self {
            PayloadFormat::TabularJson => Some("json"),
            PayloadFormat::DelimitedText => Some("csv"),
            PayloadFormat::ReachabilityProbe => None,
        }
    }

    /// Variables named in the request URL when the endpoint sets none.
    pub fn default_variables(&self) -> Vec<String> {
        let names: &[&str] = match self {
            PayloadFormat::TabularJson => &tabular::VARIABLES,
            PayloadFormat::DelimitedText => &delimited::COLUMNS,
            PayloadFormat::ReachabilityProbe => &[],
        };
        names.iter().map(|n| n.to_string()).collect()
    }

    /// Decode `payload`; fails only when the overall structure is unrecognized.
    pub fn parse(&self, payload: &str, ctx: &ParseContext) -> Result<Vec<ObservationRecord>> {
        match self {
            PayloadFormat::TabularJson => tabular::parse(payload, ctx),
            PayloadFormat::DelimitedText => delimited::parse(payload, ctx),
            PayloadFormat::ReachabilityProbe => probe::parse(payload, ctx),
        }
    }
}

/// Inputs shared by every parser call.
#[derive(Debug, Clone, Copy)]
pub struct ParseContext {
    pub requested: RegionQuery,
    pub now: DateTime<Utc>,
}

impl ParseContext {
    pub fn new(requested: RegionQuery, now: DateTime<Utc>) -> Self {
        Self { requested, now }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ParseStats {
    pub total_rows: usize,
    pub parsed_successfully: usize,
    pub parse_failures: usize,
    pub failure_rate: f64,
}

impl ParseStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn finalize(&mut self) {
        self.failure_rate = if self.total_rows > 0 {
            self.parse_failures as f64 / self.total_rows as f64
        } else {
            0.0
        };
    }
}

/// Row values after format-specific extraction, before validation.
#[derive(Debug, Clone)]
pub(crate) struct RowFields {
    pub float_id: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub latitude: f64,
    pub longitude: f64,
    pub pressure: Option<f64>,
    pub depth: Option<f64>,
    pub temperature: f64,
    pub salinity: f64,
    pub bgc: Biogeochemistry,
}

/// Validate extracted fields and derive the missing physical/BGC values.
///
/// BGC perturbations are seeded from the row's own content, so parsing the
/// same payload twice yields identical records.
pub(crate) fn build_measurement(
    fields: RowFields,
    row_index: usize,
) -> std::result::Result<Measurement, RowError> {
    finite("latitude", fields.latitude)?;
    finite("longitude", fields.longitude)?;
    finite("temperature", fields.temperature)?;
    finite("salinity", fields.salinity)?;
    if !(-90.0..=90.0).contains(&fields.latitude) {
        return Err(RowError::OutOfRange {
            field: "latitude",
            value: fields.latitude,
        });
    }
    if !(-180.0..=180.0).contains(&fields.longitude) {
        return Err(RowError::OutOfRange {
            field: "longitude",
            value: fields.longitude,
        });
    }

    let (depth, pressure) = match (fields.depth, fields.pressure) {
        (Some(d), Some(p)) => (d, p),
        (None, Some(p)) => (depth_from_pressure(p), p),
        (Some(d), None) => (d, pressure_from_depth(d)),
        (None, None) => return Err(RowError::MissingField("pres")),
    };
    finite("depth", depth)?;
    finite("pres", pressure)?;
    if depth < 0.0 {
        return Err(RowError::Negative {
            field: "depth",
            value: depth,
        });
    }
    if pressure < 0.0 {
        return Err(RowError::Negative {
            field: "pres",
            value: pressure,
        });
    }
    if !fields.bgc.is_finite() {
        return Err(RowError::NonFinite("bgc"));
    }

    let seed = (fields.timestamp.timestamp_millis() as u64)
        ^ (row_index as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15)
        ^ fields.latitude.to_bits().rotate_left(17)
        ^ fields.longitude.to_bits();
    let mut rng = StdRng::seed_from_u64(seed);
    let bgc = bgc::complete(fields.bgc, depth, &mut rng);

    Ok(Measurement {
        float_id: fields
            .float_id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| placeholder_float_id(row_index)),
        timestamp: fields.timestamp,
        latitude: fields.latitude,
        longitude: fields.longitude,
        depth_meters: depth,
        temperature_c: fields.temperature,
        salinity_psu: fields.salinity,
        pressure_dbar: pressure,
        bgc,
    })
}

/// Identifier for rows whose source carries no platform number.
pub fn placeholder_float_id(row_index: usize) -> String {
    format!("UNKNOWN-{:05}", row_index)
}

/// Keep the good rows, log and count the bad ones, then tag regions and ids.
pub(crate) fn collect_records<I>(
    rows: I,
    ctx: &ParseContext,
    format: &str,
) -> Vec<ObservationRecord>
where
    I: IntoIterator<Item = (usize, std::result::Result<Measurement, RowError>)>,
{
    let mut stats = ParseStats::new();
    let mut records = Vec::new();

    for (row_index, row) in rows {
        stats.total_rows += 1;
        match row {
            Ok(m) => {
                let region = classify(m.latitude, m.longitude, ctx.requested);
                records.push(ObservationRecord::from_measurement(
                    records.len(),
                    m,
                    region,
                    ctx.now,
                ));
                stats.parsed_successfully += 1;
            }
            Err(e) => {
                stats.parse_failures += 1;
                warn!("Dropping {} row {}: {}", format, row_index + 1, e);
            }
        }
    }

    stats.finalize();
    debug!(
        "Parsed {} payload: {} rows, {} kept, {} dropped ({:.1}% failure rate)",
        format,
        stats.total_rows,
        stats.parsed_successfully,
        stats.parse_failures,
        stats.failure_rate * 100.0
    );

    records
}

fn finite(field: &'static str, value: f64) -> std::result::Result<(), RowError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(RowError::NonFinite(field))
    }
}

pub(crate) fn parse_number(field: &'static str, s: &str) -> std::result::Result<f64, RowError> {
    let s = s.trim();
    if s.is_empty() {
        return Err(RowError::MissingField(field));
    }
    let value = s.parse::<f64>().map_err(|_| RowError::InvalidNumber {
        field,
        value: s.to_string(),
    })?;
    finite(field, value)?;
    Ok(value)
}

/// Optional numeric cell: blank or `NaN` means absent.
pub(crate) fn parse_optional_number(s: Option<&str>) -> Option<f64> {
    s.and_then(|s| s.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

/// ISO-8601 timestamp or epoch seconds.
pub(crate) fn parse_timestamp(s: &str) -> std::result::Result<DateTime<Utc>, RowError> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
        return Ok(Utc.from_utc_datetime(&naive));
    }
    if let Ok(seconds) = s.parse::<f64>() {
        return epoch_seconds(seconds).ok_or_else(|| RowError::InvalidTimestamp(s.to_string()));
    }
    Err(RowError::InvalidTimestamp(s.to_string()))
}

pub(crate) fn epoch_seconds(seconds: f64) -> Option<DateTime<Utc>> {
    if !seconds.is_finite() {
        return None;
    }
    Utc.timestamp_millis_opt((seconds * 1000.0).round() as i64)
        .single()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields() -> RowFields {
        RowFields {
            float_id: Some("2902746".to_string()),
            timestamp: Utc.with_ymd_and_hms(2024, 1, 15, 14, 30, 0).unwrap(),
            latitude: 15.2,
            longitude: 65.4,
            pressure: Some(102.5),
            depth: None,
            temperature: 26.1,
            salinity: 36.2,
            bgc: Biogeochemistry::default(),
        }
    }

    #[test]
    fn test_depth_derived_from_pressure() {
        let m = build_measurement(fields(), 0).unwrap();
        assert!((m.depth_meters - 100.0).abs() < 1e-9);
        assert_eq!(m.pressure_dbar, 102.5);
    }

    #[test]
    fn test_out_of_range_latitude_rejected() {
        let mut f = fields();
        f.latitude = 91.0;
        assert!(matches!(
            build_measurement(f, 0),
            Err(RowError::OutOfRange { field: "latitude", .. })
        ));
    }

    #[test]
    fn test_negative_pressure_rejected() {
        let mut f = fields();
        f.pressure = Some(-5.0);
        assert!(matches!(
            build_measurement(f, 0),
            Err(RowError::Negative { .. })
        ));
    }

    #[test]
    fn test_missing_float_id_gets_placeholder() {
        let mut f = fields();
        f.float_id = None;
        let m = build_measurement(f, 42).unwrap();
        assert_eq!(m.float_id, "UNKNOWN-00042");
    }

    #[test]
    fn test_bgc_synthesis_is_deterministic() {
        let a = build_measurement(fields(), 3).unwrap();
        let b = build_measurement(fields(), 3).unwrap();
        assert_eq!(a.bgc, b.bgc);
        assert!(a.bgc.oxygen.is_some());
    }

    #[test]
    fn test_parse_number_rejects_nan() {
        assert_eq!(parse_number("temp", "NaN"), Err(RowError::NonFinite("temp")));
        assert_eq!(parse_number("temp", ""), Err(RowError::MissingField("temp")));
        assert_eq!(parse_number("temp", " 12.5 "), Ok(12.5));
        assert!(matches!(
            parse_number("temp", "warm"),
            Err(RowError::InvalidNumber { .. })
        ));
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let expected = Utc.with_ymd_and_hms(2024, 1, 15, 14, 30, 0).unwrap();
        assert_eq!(parse_timestamp("2024-01-15T14:30:00Z"), Ok(expected));
        assert_eq!(parse_timestamp("2024-01-15T14:30:00"), Ok(expected));
        assert_eq!(parse_timestamp("1705329000"), Ok(expected));
        assert!(parse_timestamp("yesterday").is_err());
    }

    #[test]
    fn test_default_variables_per_format() {
        let tabular = PayloadFormat::TabularJson.default_variables();
        assert!(tabular.iter().any(|v| v == "doxy"));
        assert!(tabular.iter().any(|v| v == "chla"));
        assert!(tabular.iter().any(|v| v == "nitrate"));

        // Positional format: exactly the columns the parser reads, in order
        assert_eq!(PayloadFormat::DelimitedText.default_variables(), delimited::COLUMNS);
        assert!(PayloadFormat::ReachabilityProbe.default_variables().is_empty());
    }
}
