//! Depth-driven biogeochemical profiles.
//!
//! Most physical-only feeds carry no BGC variables. Rather than leave the BGC
//! charts empty, missing values are filled from smooth depth curves plus a
//! small bounded perturbation. Values a source does supply are never replaced.

use crate::models::Biogeochemistry;
use rand::Rng;

/// Dissolved oxygen in µmol/kg.
fn oxygen(depth: f64) -> f64 {
    // Surface saturation decaying towards a minimum around 800 m, then slowly recovering
    let decay = 230.0 * (-depth / 400.0).exp();
    let recovery = 40.0 * (depth / 2000.0).min(1.0);
    (decay + 20.0 + recovery).max(0.0)
}

/// Chlorophyll-a in mg/m³, confined to the euphotic zone.
fn chlorophyll(depth: f64) -> f64 {
    0.05 + 1.5 * (-depth / 40.0).exp()
}

fn ph(depth: f64) -> f64 {
    8.1 - 0.25 * (1.0 - (-depth / 600.0).exp())
}

/// Nitrate in µmol/kg, depleted at the surface.
fn nitrate(depth: f64) -> f64 {
    40.0 * (1.0 - (-depth / 500.0).exp())
}

/// Phosphate follows nitrate at roughly the Redfield ratio.
fn phosphate(nitrate: f64) -> f64 {
    nitrate / 16.0
}

/// Fill every `None` field of `supplied` with a plausible value for `depth`.
pub fn complete<R: Rng>(supplied: Biogeochemistry, depth: f64, rng: &mut R) -> Biogeochemistry {
    let depth = depth.max(0.0);

    let nitrate_value = supplied
        .nitrate
        .unwrap_or_else(|| (nitrate(depth) + rng.gen_range(-1.0..1.0)).max(0.0));

    Biogeochemistry {
        oxygen: supplied
            .oxygen
            .or_else(|| Some((oxygen(depth) + rng.gen_range(-8.0..8.0)).max(0.0))),
        chlorophyll: supplied
            .chlorophyll
            .or_else(|| Some((chlorophyll(depth) * rng.gen_range(0.8..1.2)).max(0.0))),
        ph: supplied
            .ph
            .or_else(|| Some(ph(depth) + rng.gen_range(-0.02..0.02))),
        nitrate: Some(nitrate_value),
        phosphate: supplied
            .phosphate
            .or_else(|| Some((phosphate(nitrate_value) + rng.gen_range(-0.05..0.05)).max(0.0))),
    }
}
