//! Synthetic reading generation.
//!
//! Readings are drawn from an injected random source so that a seeded
//! session replays the exact same sequence of readings and abnormal draws.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::ranges::{ABNORMAL_BANDS, NORMAL_RANGES};
use super::reading::{BloodPressure, Reading};

/// Chance that a scheduled tick runs in forced-abnormal mode.
pub const ABNORMAL_TICK_PROBABILITY: f64 = 0.3;

/// Draw one reading from `rng`.
///
/// Normal mode stays inside every clinical range; abnormal mode draws every
/// parameter from its out-of-range band.
pub fn generate_reading<R: Rng + ?Sized>(rng: &mut R, force_abnormal: bool) -> Reading {
    if force_abnormal {
        let bands = &ABNORMAL_BANDS;
        Reading::new(
            rng.gen_range(bands.heart_rate.clone()),
            rng.gen_range(bands.spo2.clone()),
            rng.gen_range(bands.pulse_rate.clone()),
            rng.gen_range(bands.temperature.clone()),
            BloodPressure::new(
                rng.gen_range(bands.systolic.clone()),
                rng.gen_range(bands.diastolic.clone()),
            ),
        )
    } else {
        let normal = &NORMAL_RANGES;
        let bp = &normal.blood_pressure;
        Reading::new(
            rng.gen_range(normal.heart_rate.min..=normal.heart_rate.max),
            rng.gen_range(normal.spo2.min..=normal.spo2.max),
            rng.gen_range(normal.pulse_rate.min..=normal.pulse_rate.max),
            // Continuous draw, upper bound excluded.
            rng.gen_range(normal.temperature.min..normal.temperature.max),
            BloodPressure::new(
                rng.gen_range(bp.systolic.min..=bp.systolic.max),
                rng.gen_range(bp.diastolic.min..=bp.diastolic.max),
            ),
        )
    }
}

/// Reading generator owning its random source.
#[derive(Debug, Clone)]
pub struct ReadingGenerator {
    rng: StdRng,
}

impl ReadingGenerator {
    /// Generator seeded from OS entropy.
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Deterministic generator for tests and replays.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Produce one reading.
    pub fn generate(&mut self, force_abnormal: bool) -> Reading {
        generate_reading(&mut self.rng, force_abnormal)
    }

    /// Independent per-tick coin flip for forced-abnormal mode.
    ///
    /// `probability` must lie in `[0, 1]`; the engine config validates it.
    pub fn draw_abnormal(&mut self, probability: f64) -> bool {
        self.rng.gen_bool(probability)
    }
}

impl Default for ReadingGenerator {
    fn default() -> Self {
        Self::from_entropy()
    }
}
