use crate::region::Region;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// Age under which an observation is flagged for UI emphasis.
pub const RECENT_WINDOW_HOURS: i64 = 6;

/// Seawater pressure-to-depth conversion: `depth = pressure / 1.025`.
pub const PRESSURE_PER_METER: f64 = 1.025;

pub fn depth_from_pressure(pressure_dbar: f64) -> f64 {
    pressure_dbar / PRESSURE_PER_METER
}

pub fn pressure_from_depth(depth_m: f64) -> f64 {
    depth_m * PRESSURE_PER_METER
}

/// Optional biogeochemical readings. `None` means not supplied, never zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Biogeochemistry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oxygen: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chlorophyll: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ph: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nitrate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phosphate: Option<f64>,
}

impl Biogeochemistry {
    pub fn is_finite(&self) -> bool {
        [
            self.oxygen,
            self.chlorophyll,
            self.ph,
            self.nitrate,
            self.phosphate,
        ]
        .iter()
        .flatten()
        .all(|v| v.is_finite())
    }
}

/// Canonical observation produced by every parser and by the generator.
/// Immutable once built; consumers derive new values instead of writing back.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ObservationRecord {
    pub id: usize,
    pub float_id: String,
    pub timestamp_millis: i64,
    pub date: String,
    pub time: String,
    pub latitude: f64,
    pub longitude: f64,
    pub region: Region,
    pub depth_meters: f64,
    pub temperature_c: f64,
    pub salinity_psu: f64,
    pub pressure_dbar: f64,
    #[serde(flatten)]
    pub bgc: Biogeochemistry,
    pub is_recent: bool,
}

/// Fields shared by every producer before display strings and flags are derived.
#[derive(Debug, Clone)]
pub struct Measurement {
    pub float_id: String,
    pub timestamp: DateTime<Utc>,
    pub latitude: f64,
    pub longitude: f64,
    pub depth_meters: f64,
    pub temperature_c: f64,
    pub salinity_psu: f64,
    pub pressure_dbar: f64,
    pub bgc: Biogeochemistry,
}

impl ObservationRecord {
    pub fn from_measurement(
        id: usize,
        m: Measurement,
        region: Region,
        now: DateTime<Utc>,
    ) -> Self {
        let age = now.signed_duration_since(m.timestamp);
        Self {
            id,
            float_id: m.float_id,
            timestamp_millis: m.timestamp.timestamp_millis(),
            date: m.timestamp.format("%Y-%m-%d").to_string(),
            time: m.timestamp.format("%H:%M:%S").to_string(),
            latitude: m.latitude,
            longitude: m.longitude,
            region,
            depth_meters: m.depth_meters,
            temperature_c: m.temperature_c,
            salinity_psu: m.salinity_psu,
            pressure_dbar: m.pressure_dbar,
            bgc: m.bgc,
            is_recent: age < Duration::hours(RECENT_WINDOW_HOURS),
        }
    }

    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.timestamp_millis).single()
    }

    /// All numeric fields finite, coordinates in range, depth/pressure non-negative.
    pub fn is_valid(&self) -> bool {
        let numeric = [
            self.latitude,
            self.longitude,
            self.depth_meters,
            self.temperature_c,
            self.salinity_psu,
            self.pressure_dbar,
        ];
        numeric.iter().all(|v| v.is_finite())
            && self.bgc.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
            && self.depth_meters >= 0.0
            && self.pressure_dbar >= 0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    Real,
    Synthetic,
}

/// Response envelope handed to consumers.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSourceResult {
    pub records: Vec<ObservationRecord>,
    pub total_floats: usize,
    pub regions_present: Vec<Region>,
    pub last_updated: DateTime<Utc>,
    pub provenance: Provenance,
    pub source: String,
}

impl DataSourceResult {
    pub fn new(
        records: Vec<ObservationRecord>,
        provenance: Provenance,
        source: impl Into<String>,
        last_updated: DateTime<Utc>,
    ) -> Self {
        let total_floats = records
            .iter()
            .map(|r| r.float_id.as_str())
            .collect::<HashSet<_>>()
            .len();

        let mut regions_present = Vec::new();
        for record in &records {
            if !regions_present.contains(&record.region) {
                regions_present.push(record.region);
            }
        }

        Self {
            records,
            total_floats,
            regions_present,
            last_updated,
            provenance,
            source: source.into(),
        }
    }
}

/// Dashboard time window selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(try_from = "String")]
pub enum TimeRange {
    #[default]
    LastWeek,
    LastMonth,
    LastThreeMonths,
    AllTime,
}

impl TimeRange {
    pub const ALL: [TimeRange; 4] = [
        TimeRange::LastWeek,
        TimeRange::LastMonth,
        TimeRange::LastThreeMonths,
        TimeRange::AllTime,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            TimeRange::LastWeek => "Last Week",
            TimeRange::LastMonth => "Last Month",
            TimeRange::LastThreeMonths => "Last 3 Months",
            TimeRange::AllTime => "All Time",
        }
    }

    pub fn max_days_back(&self) -> i64 {
        match self {
            TimeRange::LastWeek => 7,
            TimeRange::LastMonth => 30,
            TimeRange::LastThreeMonths => 90,
            TimeRange::AllTime => 365,
        }
    }

    /// Synthetic point count for a global request over this window.
    pub fn target_point_count(&self) -> usize {
        match self {
            TimeRange::LastWeek => 200,
            TimeRange::LastMonth => 400,
            TimeRange::LastThreeMonths => 700,
            TimeRange::AllTime => 1200,
        }
    }

    pub fn start(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - Duration::days(self.max_days_back())
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for TimeRange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TimeRange::ALL
            .iter()
            .find(|t| t.label().eq_ignore_ascii_case(s.trim()))
            .copied()
            .ok_or_else(|| {
                format!(
                    "Unknown time range '{}' (expected one of: Last Week, Last Month, Last 3 Months, All Time)",
                    s
                )
            })
    }
}

impl TryFrom<String> for TimeRange {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Parameter a map layer is coloured by. Unrecognized names are kept, not rejected.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(from = "String")]
pub enum Parameter {
    #[default]
    Temperature,
    Salinity,
    Depth,
    Other(String),
}

impl From<String> for Parameter {
    fn from(value: String) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "temperature" => Parameter::Temperature,
            "salinity" => Parameter::Salinity,
            "depth" => Parameter::Depth,
            _ => Parameter::Other(value),
        }
    }
}

impl From<&str> for Parameter {
    fn from(value: &str) -> Self {
        Parameter::from(value.to_string())
    }
}
