//! Statistically plausible stand-in observations.
//!
//! The envelope (counts, per-region ranges, depth gradients) is fixed by the
//! region profile and time window; only individual sample values vary, drawn
//! from the caller's RNG. Nothing here touches the network, so generation
//! cannot fail.

use crate::models::{
    pressure_from_depth, Biogeochemistry, Measurement, ObservationRecord, TimeRange,
};
use crate::parser::bgc;
use crate::region::{BoundingBox, Region, RegionQuery};
use chrono::{DateTime, Datelike, Duration, Utc};
use rand::Rng;
use std::f64::consts::PI;
use tracing::debug;

/// Lowest temperature the generator emits (seawater freezing point).
pub const MIN_TEMPERATURE_C: f64 = -2.0;

const SEASONAL_AMPLITUDE_C: f64 = 1.5;
const MAX_DRIFT_C: f64 = 0.5;

/// Characteristic ranges used to generate a region's observations.
#[derive(Debug, Clone)]
pub struct RegionProfile {
    pub region: Region,
    /// (min, max) surface temperature in °C
    pub temperature: (f64, f64),
    /// (min, max) surface salinity in PSU
    pub salinity: (f64, f64),
    pub max_depth: f64,
    pub float_prefix: &'static str,
    /// Open-water box points are drawn from; lies inside the region's classification box.
    pub sampling_box: BoundingBox,
    /// Share of the window's target count produced when this region is requested alone.
    pub coverage: f64,
}

static PROFILES: [RegionProfile; 14] = [
    RegionProfile {
        region: Region::ArabianSea,
        temperature: (24.0, 30.0),
        salinity: (35.5, 36.8),
        max_depth: 2000.0,
        float_prefix: "2902",
        sampling_box: BoundingBox::new(8.0, 20.0, 58.0, 70.0),
        coverage: 0.3,
    },
    RegionProfile {
        region: Region::BayOfBengal,
        temperature: (26.0, 30.0),
        salinity: (31.0, 34.5),
        max_depth: 2000.0,
        float_prefix: "2903",
        sampling_box: BoundingBox::new(8.0, 19.0, 84.0, 92.0),
        coverage: 0.25,
    },
    RegionProfile {
        region: Region::IndianOcean,
        temperature: (18.0, 28.0),
        salinity: (34.5, 35.5),
        max_depth: 2000.0,
        float_prefix: "5904",
        sampling_box: BoundingBox::new(-35.0, -5.0, 60.0, 100.0),
        coverage: 0.5,
    },
    RegionProfile {
        region: Region::NorthPacific,
        temperature: (10.0, 26.0),
        salinity: (33.5, 35.0),
        max_depth: 2000.0,
        float_prefix: "5905",
        sampling_box: BoundingBox::new(15.0, 45.0, -175.0, -135.0),
        coverage: 0.6,
    },
    RegionProfile {
        region: Region::SouthPacific,
        temperature: (14.0, 26.0),
        salinity: (34.5, 36.0),
        max_depth: 2000.0,
        float_prefix: "5906",
        sampling_box: BoundingBox::new(-40.0, -10.0, -150.0, -100.0),
        coverage: 0.5,
    },
    RegionProfile {
        region: Region::NorthAtlantic,
        temperature: (12.0, 24.0),
        salinity: (35.0, 36.5),
        max_depth: 2000.0,
        float_prefix: "4902",
        sampling_box: BoundingBox::new(25.0, 50.0, -60.0, -25.0),
        coverage: 0.5,
    },
    RegionProfile {
        region: Region::SouthAtlantic,
        temperature: (12.0, 24.0),
        salinity: (34.5, 36.5),
        max_depth: 2000.0,
        float_prefix: "3901",
        sampling_box: BoundingBox::new(-40.0, -10.0, -30.0, 0.0),
        coverage: 0.4,
    },
    RegionProfile {
        region: Region::SouthernOcean,
        temperature: (-1.0, 6.0),
        salinity: (33.8, 34.6),
        max_depth: 2000.0,
        float_prefix: "5907",
        sampling_box: BoundingBox::new(-62.0, -52.0, -180.0, 180.0),
        coverage: 0.4,
    },
    RegionProfile {
        region: Region::ArcticOcean,
        temperature: (-1.8, 2.0),
        salinity: (30.0, 34.5),
        max_depth: 1000.0,
        float_prefix: "6901",
        sampling_box: BoundingBox::new(82.0, 89.0, -180.0, 180.0),
        coverage: 0.15,
    },
    RegionProfile {
        region: Region::Mediterranean,
        temperature: (14.0, 26.0),
        salinity: (37.5, 39.0),
        max_depth: 1500.0,
        float_prefix: "6903",
        sampling_box: BoundingBox::new(33.0, 40.0, 15.0, 25.0),
        coverage: 0.2,
    },
    RegionProfile {
        region: Region::SouthChinaSea,
        temperature: (24.0, 30.0),
        salinity: (33.0, 34.5),
        max_depth: 1500.0,
        float_prefix: "2901",
        sampling_box: BoundingBox::new(8.0, 18.0, 110.0, 118.0),
        coverage: 0.2,
    },
    RegionProfile {
        region: Region::Caribbean,
        temperature: (25.0, 29.0),
        salinity: (35.5, 36.5),
        max_depth: 1500.0,
        float_prefix: "4903",
        sampling_box: BoundingBox::new(13.0, 17.0, -80.0, -65.0),
        coverage: 0.15,
    },
    RegionProfile {
        region: Region::RedSea,
        temperature: (22.0, 30.0),
        salinity: (39.0, 41.0),
        max_depth: 1000.0,
        float_prefix: "2904",
        sampling_box: BoundingBox::new(17.0, 22.0, 37.5, 39.5),
        coverage: 0.1,
    },
    RegionProfile {
        region: Region::PersianGulf,
        temperature: (20.0, 33.0),
        salinity: (38.0, 42.0),
        max_depth: 100.0,
        float_prefix: "2905",
        sampling_box: BoundingBox::new(25.0, 28.0, 50.0, 54.0),
        coverage: 0.1,
    },
];

static UNKNOWN_PROFILE: RegionProfile = RegionProfile {
    region: Region::Unknown,
    temperature: (15.0, 25.0),
    salinity: (34.0, 36.0),
    max_depth: 2000.0,
    float_prefix: "1900",
    sampling_box: BoundingBox::new(-10.0, 10.0, -30.0, -15.0),
    coverage: 0.1,
};

pub fn profile(region: Region) -> &'static RegionProfile {
    PROFILES
        .iter()
        .find(|p| p.region == region)
        .unwrap_or(&UNKNOWN_PROFILE)
}

/// Number of points each region receives for a request.
///
/// A wildcard request splits the window's target evenly across every named
/// region, with the remainder going to the last one so the total is exact.
pub fn allocation(range: TimeRange, requested: RegionQuery) -> Vec<(Region, usize)> {
    let target = range.target_point_count();
    match requested {
        RegionQuery::Named(region) => {
            let count = (target as f64 * profile(region).coverage).round() as usize;
            vec![(region, count.max(1))]
        }
        RegionQuery::All => {
            let regions = Region::NAMED;
            let share = target / regions.len();
            let remainder = target % regions.len();
            regions
                .iter()
                .enumerate()
                .map(|(i, r)| {
                    let extra = if i == regions.len() - 1 { remainder } else { 0 };
                    (*r, share + extra)
                })
                .collect()
        }
    }
}

/// Generate observations for `range` ending at `now`.
pub fn generate<R: Rng>(
    range: TimeRange,
    requested: RegionQuery,
    now: DateTime<Utc>,
    rng: &mut R,
) -> Vec<ObservationRecord> {
    let plan = allocation(range, requested);
    let window_ms = range.max_days_back() * 24 * 60 * 60 * 1000;

    let mut records = Vec::with_capacity(plan.iter().map(|(_, n)| n).sum());
    for (region, count) in plan {
        let profile = profile(region);
        for _ in 0..count {
            let m = sample(profile, now, window_ms, rng);
            records.push(ObservationRecord::from_measurement(
                records.len(),
                m,
                region,
                now,
            ));
        }
    }

    debug!(
        "Generated {} synthetic observations for {} / {}",
        records.len(),
        range,
        requested
    );
    records
}

fn sample<R: Rng>(
    profile: &RegionProfile,
    now: DateTime<Utc>,
    window_ms: i64,
    rng: &mut R,
) -> Measurement {
    let age_fraction: f64 = rng.gen();
    let timestamp = now - Duration::milliseconds((age_fraction * window_ms as f64) as i64);

    let bounds = &profile.sampling_box;
    let latitude = rng.gen_range(bounds.lat_min..=bounds.lat_max);
    let longitude = rng.gen_range(bounds.lon_min..=bounds.lon_max);
    let depth = rng.gen_range(0.0..=profile.max_depth);

    // Sum of uniforms approximates a normal distribution
    let jitter: f64 = (0..3).map(|_| rng.gen_range(-0.5..0.5)).sum::<f64>() * 0.6;

    let hemisphere = if bounds.center().0 < 0.0 { -1.0 } else { 1.0 };
    let month = timestamp.month0() as f64;
    let seasonal = hemisphere * SEASONAL_AMPLITUDE_C * (2.0 * PI * (month - 3.0) / 12.0).sin();

    // Older samples wander further; natural variability, not a trend
    let drift = age_fraction * rng.gen_range(-MAX_DRIFT_C..MAX_DRIFT_C);

    let base_temperature = rng.gen_range(profile.temperature.0..=profile.temperature.1);
    let temperature =
        (base_temperature - depth / 200.0 + jitter + seasonal + drift).max(MIN_TEMPERATURE_C);

    let base_salinity = rng.gen_range(profile.salinity.0..=profile.salinity.1);
    let salinity = base_salinity + depth / 1000.0 + jitter * 0.1;

    let bgc = bgc::complete(Biogeochemistry::default(), depth, rng);

    Measurement {
        float_id: format!("{}{:03}", profile.float_prefix, rng.gen_range(0..1000)),
        timestamp,
        latitude,
        longitude,
        depth_meters: depth,
        temperature_c: temperature,
        salinity_psu: salinity,
        pressure_dbar: pressure_from_depth(depth),
        bgc,
    }
}
