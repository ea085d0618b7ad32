//! ERDDAP `.csv` responses: a column-name line, a units line, then data rows.
//!
//! Columns are read by position in the order the request URL names them:
//! `platform_number,time,latitude,longitude,pres,temp,psal`.

use super::{
    build_measurement, collect_records, parse_number, parse_timestamp, ParseContext, RowError,
    RowFields,
};
use crate::error::{AppError, Result};
use crate::models::{Biogeochemistry, ObservationRecord};

pub const COLUMNS: [&str; 7] = [
    "platform_number",
    "time",
    "latitude",
    "longitude",
    "pres",
    "temp",
    "psal",
];

const HEADER_LINES: usize = 2;
const MIN_LINES: usize = HEADER_LINES + 1;

pub fn parse(payload: &str, ctx: &ParseContext) -> Result<Vec<ObservationRecord>> {
    let lines: Vec<&str> = payload
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();

    if lines.len() < MIN_LINES {
        return Err(AppError::Structural(format!(
            "expected at least {} lines (2 header lines plus data), got {}",
            MIN_LINES,
            lines.len()
        )));
    }

    let header_width = split_fields(lines[0]).len();
    if header_width < COLUMNS.len() {
        return Err(AppError::Structural(format!(
            "expected at least {} columns, header has {}",
            COLUMNS.len(),
            header_width
        )));
    }

    let rows = lines[HEADER_LINES..]
        .iter()
        .enumerate()
        .map(|(i, line)| (i, decode_row(line).and_then(|f| build_measurement(f, i))));

    Ok(collect_records(rows, ctx, "delimited"))
}

fn split_fields(line: &str) -> Vec<&str> {
    line.split(',').map(|f| f.trim().trim_matches('"')).collect()
}

fn decode_row(line: &str) -> std::result::Result<RowFields, RowError> {
    let fields = split_fields(line);
    if fields.len() < COLUMNS.len() {
        return Err(RowError::TooFewColumns {
            expected: COLUMNS.len(),
            actual: fields.len(),
        });
    }

    Ok(RowFields {
        float_id: Some(fields[0].to_string()),
        timestamp: parse_timestamp(fields[1])?,
        latitude: parse_number("latitude", fields[2])?,
        longitude: parse_number("longitude", fields[3])?,
        pressure: Some(parse_number("pres", fields[4])?),
        depth: None,
        temperature: parse_number("temp", fields[5])?,
        salinity: parse_number("psal", fields[6])?,
        bgc: Biogeochemistry::default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::region::{Region, RegionQuery};
    use chrono::{TimeZone, Utc};

    fn ctx(requested: RegionQuery) -> ParseContext {
        ParseContext::new(requested, Utc.with_ymd_and_hms(2024, 1, 16, 0, 0, 0).unwrap())
    }

    const PAYLOAD: &str = "\
platform_number,time,latitude,longitude,pres,temp,psal
,UTC,degrees_north,degrees_east,decibar,degree_Celsius,PSU
2902746,2024-01-15T14:30:00Z,15.2,65.4,205.0,22.1,36.1
2902746,2024-01-15T14:30:00Z,15.2,65.4,1025.0,8.4,35.0
";

    #[test]
    fn test_parse_valid_csv() {
        let records = parse(PAYLOAD, &ctx(RegionQuery::All)).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].float_id, "2902746");
        assert!((records[0].depth_meters - 200.0).abs() < 1e-9);
        assert!((records[1].depth_meters - 1000.0).abs() < 1e-9);
        assert_eq!(records[1].region, Region::ArabianSea);
        assert_eq!(records[1].id, 1);
    }

    #[test]
    fn test_requested_region_is_applied() {
        let records = parse(PAYLOAD, &ctx(RegionQuery::Named(Region::BayOfBengal))).unwrap();
        assert!(records.iter().all(|r| r.region == Region::BayOfBengal));
    }

    #[test]
    fn test_too_few_lines_is_structural() {
        let payload = "platform_number,time,latitude,longitude,pres,temp,psal\n,UTC,,,,,\n";
        assert!(matches!(
            parse(payload, &ctx(RegionQuery::All)),
            Err(AppError::Structural(_))
        ));
    }

    #[test]
    fn test_narrow_header_is_structural() {
        let payload = "a,b,c\nx,y,z\n1,2,3\n";
        assert!(matches!(
            parse(payload, &ctx(RegionQuery::All)),
            Err(AppError::Structural(_))
        ));
    }

    #[test]
    fn test_bad_rows_are_skipped() {
        let payload = "\
platform_number,time,latitude,longitude,pres,temp,psal
,UTC,degrees_north,degrees_east,decibar,degree_Celsius,PSU
2902746,2024-01-15T14:30:00Z,15.2,65.4
2902746,2024-01-15T14:30:00Z,15.2,250.0,10.0,22.1,36.1
2902746,2024-01-15T14:30:00Z,15.2,65.4,NaN,22.1,36.1
2902747,2024-01-15T14:30:00Z,15.2,65.4,10.0,22.1,36.1
";
        let records = parse(payload, &ctx(RegionQuery::All)).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].float_id, "2902747");
    }

    #[test]
    fn test_reparse_is_identical() {
        let a = parse(PAYLOAD, &ctx(RegionQuery::All)).unwrap();
        let b = parse(PAYLOAD, &ctx(RegionQuery::All)).unwrap();
        assert_eq!(a, b);
    }
}
