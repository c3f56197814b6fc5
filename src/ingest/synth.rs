//! Synthetic readings for running without a board attached

use std::ops::RangeInclusive;
use rand::Rng;
use rand::seq::IndexedRandom;
use crate::sensor::SensorReading;

pub const TEMPERATURE_RANGE: RangeInclusive<f64> = 20.0..=30.0;
pub const HUMIDITY_RANGE: RangeInclusive<f64> = 40.0..=70.0;
pub const MOISTURE_RANGE: RangeInclusive<i64> = 300..=800;
pub const SOIL_PH_RANGE: RangeInclusive<f64> = 5.5..=7.5;

pub const SOIL_TYPES: [&str; 3] = ["Sandy", "Clay", "Loamy"];
pub const RAINFALL: [&str; 4] = ["None", "Light", "Moderate", "Heavy"];
pub const SEASONS: [&str; 4] = ["Spring", "Summer", "Autumn", "Winter"];

/// Generate a plausible reading; decimals are rounded to one place like the
/// board reports them.
pub fn synthesize<R: Rng>(rng: &mut R) -> SensorReading {
    SensorReading {
        temperature: round1(rng.random_range(TEMPERATURE_RANGE)),
        humidity: round1(rng.random_range(HUMIDITY_RANGE)),
        moisture: rng.random_range(MOISTURE_RANGE),
        soil_type: pick(rng, &SOIL_TYPES),
        soil_ph: round1(rng.random_range(SOIL_PH_RANGE)),
        rainfall: pick(rng, &RAINFALL),
        season: pick(rng, &SEASONS),
    }
}

fn pick<R: Rng>(rng: &mut R, choices: &[&str]) -> String {
    choices.choose(rng).copied().unwrap_or_default().to_string()
}

// Rounding stays inside the ranges since every bound has one decimal.
fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
