//! Map-layer preparation: per-parameter intensity and point-count capping.

use crate::models::{ObservationRecord, Parameter};
use crate::region::is_water_location;
use rand::seq::index;
use rand::Rng;
use serde::Serialize;
use tracing::debug;

const RECENT_WEIGHT: f64 = 0.8;
const STALE_WEIGHT: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RenderPoint {
    pub lat: f64,
    pub lng: f64,
    /// Intensity in [0, 1]
    pub weight: f64,
}

/// Map the record's value for `parameter` onto [0, 1].
///
/// The record is only read; the weight is a separate derived value.
pub fn weight(record: &ObservationRecord, parameter: &Parameter) -> f64 {
    let raw = match parameter {
        Parameter::Temperature => (record.temperature_c + 2.0) / 37.0,
        Parameter::Salinity => (record.salinity_psu - 30.0) / 10.0,
        Parameter::Depth => record.depth_meters.abs() / 6000.0,
        Parameter::Other(_) => {
            if record.is_recent {
                RECENT_WEIGHT
            } else {
                STALE_WEIGHT
            }
        }
    };

    if raw.is_nan() {
        0.0
    } else {
        raw.clamp(0.0, 1.0)
    }
}

/// Drop land points, weight the rest, and cap the result at `point_budget`.
///
/// Over-budget sets are thinned by uniform random rejection at rate
/// `budget / count`, never by truncation, so no part of the ordering is
/// favoured. Any overshoot left by the rejection pass is removed by a second
/// uniform draw.
pub fn to_render_points<R: Rng>(
    records: &[ObservationRecord],
    parameter: &Parameter,
    point_budget: usize,
    rng: &mut R,
) -> Vec<RenderPoint> {
    let points: Vec<RenderPoint> = records
        .iter()
        .filter(|r| is_water_location(r.latitude, r.longitude))
        .map(|r| RenderPoint {
            lat: r.latitude,
            lng: r.longitude,
            weight: weight(r, parameter),
        })
        .collect();

    let count = points.len();
    if count <= point_budget {
        return points;
    }

    let keep_rate = point_budget as f64 / count as f64;
    let mut sampled: Vec<RenderPoint> = points
        .into_iter()
        .filter(|_| rng.gen_bool(keep_rate))
        .collect();

    if sampled.len() > point_budget {
        let mut keep = index::sample(rng, sampled.len(), point_budget).into_vec();
        keep.sort_unstable();
        sampled = keep.into_iter().map(|i| sampled[i]).collect();
    }

    debug!(
        "Sampled {} of {} render points (budget {})",
        sampled.len(),
        count,
        point_budget
    );
    sampled
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Biogeochemistry, Measurement, TimeRange};
    use crate::region::{Region, RegionQuery};
    use crate::synthetic;
    use chrono::Utc;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn record(
        lat: f64,
        lon: f64,
        temperature: f64,
        salinity: f64,
        depth: f64,
    ) -> ObservationRecord {
        let now = Utc::now();
        ObservationRecord::from_measurement(
            0,
            Measurement {
                float_id: "2902001".to_string(),
                timestamp: now,
                latitude: lat,
                longitude: lon,
                depth_meters: depth,
                temperature_c: temperature,
                salinity_psu: salinity,
                pressure_dbar: depth * 1.025,
                bgc: Biogeochemistry::default(),
            },
            Region::ArabianSea,
            now,
        )
    }

    #[test]
    fn test_weight_affine_maps() {
        let r = record(15.0, 65.0, 16.5, 35.0, 3000.0);
        assert!((weight(&r, &Parameter::Temperature) - 0.5).abs() < 1e-9);
        assert!((weight(&r, &Parameter::Salinity) - 0.5).abs() < 1e-9);
        assert!((weight(&r, &Parameter::Depth) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_weight_clamps_out_of_range_values() {
        let hot_salty_deep = record(15.0, 65.0, 60.0, 50.0, 11000.0);
        let cold_fresh = record(15.0, 65.0, -10.0, 5.0, 0.0);

        for parameter in [Parameter::Temperature, Parameter::Salinity, Parameter::Depth] {
            let high = weight(&hot_salty_deep, &parameter);
            let low = weight(&cold_fresh, &parameter);
            assert!((0.0..=1.0).contains(&high));
            assert!((0.0..=1.0).contains(&low));
        }
        assert_eq!(weight(&hot_salty_deep, &Parameter::Salinity), 1.0);
        assert_eq!(weight(&cold_fresh, &Parameter::Temperature), 0.0);
    }

    #[test]
    fn test_unknown_parameter_uses_recency() {
        let mut r = record(15.0, 65.0, 20.0, 35.0, 10.0);
        let other = Parameter::from("oxygen");
        assert_eq!(weight(&r, &other), RECENT_WEIGHT);
        r.is_recent = false;
        assert_eq!(weight(&r, &other), STALE_WEIGHT);
    }

    #[test]
    fn test_land_points_dropped() {
        let records = vec![
            record(15.0, 65.0, 20.0, 35.0, 10.0),
            record(45.0, -100.0, 20.0, 35.0, 10.0),
        ];
        let mut rng = StdRng::seed_from_u64(1);
        let points = to_render_points(&records, &Parameter::Temperature, 10, &mut rng);
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].lat, 15.0);
    }

    #[test]
    fn test_under_budget_keeps_everything() {
        let mut rng = StdRng::seed_from_u64(2);
        let records =
            synthetic::generate(TimeRange::LastWeek, RegionQuery::All, Utc::now(), &mut rng);
        let points = to_render_points(&records, &Parameter::Depth, records.len(), &mut rng);
        assert_eq!(points.len(), records.len());
    }

    #[test]
    fn test_sampling_never_exceeds_budget() {
        let mut rng = StdRng::seed_from_u64(3);
        let records =
            synthetic::generate(TimeRange::AllTime, RegionQuery::All, Utc::now(), &mut rng);

        for budget in [0, 1, 10, 100, 600, 1199] {
            for seed in 0..5 {
                let mut rng = StdRng::seed_from_u64(seed);
                let points = to_render_points(&records, &Parameter::Salinity, budget, &mut rng);
                assert!(points.len() <= budget, "budget {} got {}", budget, points.len());
                assert!(points.iter().all(|p| (0.0..=1.0).contains(&p.weight)));
            }
        }
    }
}
