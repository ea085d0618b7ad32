//! Last-chance reachability source.
//!
//! The payload is any JSON list of objects carrying a numeric `id`. Its
//! contents are unrelated to oceanography; each id is mapped onto a point
//! inside a region's sampling box so the dashboard still has something to
//! draw. Results from this tier are always reported as synthetic.

use super::{build_measurement, collect_records, ParseContext, RowError, RowFields};
use crate::error::{AppError, Result};
use crate::models::{Biogeochemistry, ObservationRecord};
use crate::region::Region;
use crate::synthetic::profile;
use chrono::Duration;
use serde_json::Value;

const MAX_ITEMS: usize = 100;

pub fn parse(payload: &str, ctx: &ParseContext) -> Result<Vec<ObservationRecord>> {
    let value: Value = serde_json::from_str(payload)
        .map_err(|e| AppError::Structural(format!("probe payload is not JSON: {}", e)))?;
    let items = value
        .as_array()
        .ok_or_else(|| AppError::Structural("probe payload is not a JSON array".to_string()))?;

    let ids: Vec<u64> = items
        .iter()
        .filter_map(|item| item.get("id").and_then(Value::as_u64))
        .take(MAX_ITEMS)
        .collect();

    if ids.is_empty() {
        return Err(AppError::Structural(
            "probe payload has no items with a numeric id".to_string(),
        ));
    }

    let rows = ids
        .iter()
        .enumerate()
        .map(|(i, &id)| (i, reinterpret(id, ctx).and_then(|f| build_measurement(f, i))));

    Ok(collect_records(rows, ctx, "probe"))
}

/// Fraction in [0, 1) spread deterministically from `id`.
fn spread(id: u64, stride: u64) -> f64 {
    (id.wrapping_mul(stride) % 1000) as f64 / 1000.0
}

fn reinterpret(id: u64, ctx: &ParseContext) -> std::result::Result<RowFields, RowError> {
    let region = ctx
        .requested
        .region()
        .unwrap_or(Region::NAMED[(id as usize) % Region::NAMED.len()]);
    let p = profile(region);
    let bounds = p.sampling_box;

    let depth = spread(id, 53) * p.max_depth;
    let temperature = (p.temperature.0 + spread(id, 71) * (p.temperature.1 - p.temperature.0)
        - depth / 200.0)
        .max(-2.0);
    let salinity =
        p.salinity.0 + spread(id, 89) * (p.salinity.1 - p.salinity.0) + depth / 1000.0;

    Ok(RowFields {
        float_id: Some(format!("{}{:03}", p.float_prefix, id % 1000)),
        timestamp: ctx.now - Duration::hours((id % 168) as i64),
        latitude: bounds.lat_min + spread(id, 37) * (bounds.lat_max - bounds.lat_min),
        longitude: bounds.lon_min + spread(id, 61) * (bounds.lon_max - bounds.lon_min),
        pressure: None,
        depth: Some(depth),
        temperature,
        salinity,
        bgc: Biogeochemistry::default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::region::RegionQuery;
    use chrono::Utc;

    #[test]
    fn test_probe_payload_reinterpreted() {
        let ctx = ParseContext::new(RegionQuery::Named(Region::ArabianSea), Utc::now());
        let payload = r#"[{"id": 1, "title": "a"}, {"id": 2, "title": "b"}, {"title": "no id"}]"#;

        let records = parse(payload, &ctx).unwrap();
        assert_eq!(records.len(), 2);
        let bounds = profile(Region::ArabianSea).sampling_box;
        for r in &records {
            assert_eq!(r.region, Region::ArabianSea);
            assert!(bounds.contains(r.latitude, r.longitude));
            assert!(r.is_valid());
        }
    }

    #[test]
    fn test_wildcard_probe_points_classify_back_to_their_region() {
        let ctx = ParseContext::new(RegionQuery::All, Utc::now());
        let payload: String = format!(
            "[{}]",
            (1..=28)
                .map(|i| format!(r#"{{"id": {}}}"#, i))
                .collect::<Vec<_>>()
                .join(",")
        );

        let records = parse(&payload, &ctx).unwrap();
        assert_eq!(records.len(), 28);
        for (id, r) in (1..=28usize).zip(&records) {
            let expected = Region::NAMED[id % Region::NAMED.len()];
            assert_eq!(r.region, expected, "id {}", id);
            assert!(profile(expected).sampling_box.contains(r.latitude, r.longitude));
        }
    }

    #[test]
    fn test_probe_rejects_unrelated_shapes() {
        let ctx = ParseContext::new(RegionQuery::All, Utc::now());
        assert!(matches!(parse(r#"{"id": 1}"#, &ctx), Err(AppError::Structural(_))));
        assert!(matches!(parse(r#"[{"name": "x"}]"#, &ctx), Err(AppError::Structural(_))));
    }
}
