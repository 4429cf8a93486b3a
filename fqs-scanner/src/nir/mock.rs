//! Mock NIR sensor
//!
//! Spectra are synthesized around a flat baseline with two absorption
//! features:
//! - water, bands 20-29, depth encodes moisture (70-90 %)
//! - sugar, bands 50-59, depth encodes the latent ripeness score (0.3-0.9)
//!
//! Analysis recovers both from the band depths relative to the neighbouring
//! shoulders, so a reading is consistent with the spectrum it came from.

use async_trait::async_trait;
use chrono::Utc;
use fqs_common::models::BoundingBox;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::ops::Range;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info};

use super::{
    band_wavelengths, classify_score, NirReading, NirSensor, NirSpectrum, SensorError, BAND_COUNT,
};

const WATER_BANDS: Range<usize> = 20..30;
const WATER_SHOULDERS: [Range<usize>; 2] = [10..20, 30..40];
const SUGAR_BANDS: Range<usize> = 50..60;
const SUGAR_SHOULDERS: [Range<usize>; 2] = [40..50, 60..70];

const SCORE_RANGE: Range<f64> = 0.3..0.9;
const MOISTURE_RANGE: Range<f64> = 70.0..90.0;
const CONFIDENCE_RANGE: Range<f64> = 0.7..0.95;

const SUGAR_DEPTH_MIN: f64 = 0.05;
const SUGAR_DEPTH_SPAN: f64 = 0.20;
const WATER_DEPTH_MIN: f64 = 0.05;
const WATER_DEPTH_SPAN: f64 = 0.10;
const BAND_NOISE: f64 = 0.005;

/// Simulated sensor; readings are reproducible per region when seeded
pub struct MockNirSensor {
    seed: Option<u64>,
    connected: AtomicBool,
}

impl MockNirSensor {
    pub fn new(seed: Option<u64>) -> Self {
        Self {
            seed,
            connected: AtomicBool::new(false),
        }
    }

    fn rng_for(&self, region: &BoundingBox) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(region_seed(seed, region)),
            None => StdRng::from_entropy(),
        }
    }
}

/// SplitMix64 step over `state ^ value`
fn mix(state: u64, value: u64) -> u64 {
    let mut z = (state ^ value).wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

fn fold_bits(state: u64, values: impl IntoIterator<Item = f64>) -> u64 {
    values.into_iter().fold(state, |acc, v| mix(acc, v.to_bits()))
}

/// RNG seed for one region, fixed across builds and toolchains
fn region_seed(seed: u64, region: &BoundingBox) -> u64 {
    fold_bits(mix(0, seed), [region.x1, region.y1, region.x2, region.y2])
}

fn span_fraction(value: f64, range: &Range<f64>) -> f64 {
    (value - range.start) / (range.end - range.start)
}

/// Reflectance values plus the latent score and moisture they encode
fn synthesize(rng: &mut StdRng) -> (Vec<f64>, f64, f64) {
    let score = rng.gen_range(SCORE_RANGE);
    let moisture = rng.gen_range(MOISTURE_RANGE);
    let baseline = rng.gen_range(0.45..0.65);

    let sugar_depth = SUGAR_DEPTH_MIN + SUGAR_DEPTH_SPAN * span_fraction(score, &SCORE_RANGE);
    let water_depth = WATER_DEPTH_MIN + WATER_DEPTH_SPAN * span_fraction(moisture, &MOISTURE_RANGE);

    let reflectance = (0..BAND_COUNT)
        .map(|band| {
            let mut value = baseline + rng.gen_range(-BAND_NOISE..BAND_NOISE);
            if WATER_BANDS.contains(&band) {
                value -= water_depth;
            }
            if SUGAR_BANDS.contains(&band) {
                value -= sugar_depth;
            }
            value.clamp(0.0, 1.0)
        })
        .collect();

    (reflectance, score, moisture)
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

fn std_dev(values: &[f64]) -> f64 {
    let m = mean(values);
    mean(&values.iter().map(|v| (v - m).powi(2)).collect::<Vec<_>>()).sqrt()
}

/// Depth of an absorption feature below the mean of its shoulders
fn band_depth(reflectance: &[f64], feature: Range<usize>, shoulders: &[Range<usize>; 2]) -> f64 {
    let shoulder: Vec<f64> = shoulders
        .iter()
        .flat_map(|r| reflectance[r.clone()].iter().copied())
        .collect();
    mean(&shoulder) - mean(&reflectance[feature])
}

#[async_trait]
impl NirSensor for MockNirSensor {
    async fn connect(&self) -> Result<(), SensorError> {
        self.connected.store(true, Ordering::SeqCst);
        info!("Mock NIR sensor connected");
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), SensorError> {
        if self.connected.swap(false, Ordering::SeqCst) {
            info!("Mock NIR sensor disconnected");
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn scan_region(&self, image_path: &Path, region: &BoundingBox) -> Result<NirSpectrum, SensorError> {
        if !self.is_connected() {
            return Err(SensorError::SensorUnavailable("sensor not connected".to_string()));
        }

        let mut rng = self.rng_for(region);
        let (reflectance, score, _) = synthesize(&mut rng);
        debug!(
            "Mock NIR scan of {} region {:?} (latent score {:.3})",
            image_path.display(),
            <[f64; 4]>::from(*region),
            score
        );

        Ok(NirSpectrum {
            wavelengths: band_wavelengths(),
            reflectance,
            region: *region,
            captured_at: Utc::now(),
        })
    }

    fn analyze_ripeness(&self, spectrum: &NirSpectrum) -> Result<NirReading, SensorError> {
        let reflectance = &spectrum.reflectance;
        if reflectance.len() != BAND_COUNT {
            return Err(SensorError::InvalidSpectrum(format!(
                "expected {} bands, got {}",
                BAND_COUNT,
                reflectance.len()
            )));
        }

        let sugar_depth = band_depth(reflectance, SUGAR_BANDS, &SUGAR_SHOULDERS);
        let ripeness_score = (SCORE_RANGE.start
            + (sugar_depth - SUGAR_DEPTH_MIN) / SUGAR_DEPTH_SPAN * (SCORE_RANGE.end - SCORE_RANGE.start))
            .clamp(SCORE_RANGE.start, SCORE_RANGE.end);

        let water_depth = band_depth(reflectance, WATER_BANDS, &WATER_SHOULDERS);
        let moisture_content = (MOISTURE_RANGE.start
            + (water_depth - WATER_DEPTH_MIN) / WATER_DEPTH_SPAN
                * (MOISTURE_RANGE.end - MOISTURE_RANGE.start))
            .clamp(MOISTURE_RANGE.start, MOISTURE_RANGE.end);

        // Confidence is a pure function of the spectrum
        let confidence =
            StdRng::seed_from_u64(fold_bits(0, reflectance.iter().copied())).gen_range(CONFIDENCE_RANGE);

        let (ripeness, quality_score) = classify_score(ripeness_score);

        Ok(NirReading {
            ripeness_score,
            ripeness,
            quality_score,
            sugar_content: ripeness_score * 20.0,
            moisture_content,
            mean_reflectance: mean(reflectance),
            std_reflectance: std_dev(reflectance),
            confidence,
        })
    }

    fn kind(&self) -> &'static str {
        "mock"
    }
}
