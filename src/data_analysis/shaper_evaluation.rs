// src/data_analysis/shaper_evaluation.rs

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info};

use crate::data_analysis::shaper_bank::{ShaperCandidate, ShaperType, SHAPER_COUNT};
use crate::data_analysis::spectral_analysis::PsdCurve;
use crate::error::ConfigError;

/// Scan range and limits for one evaluation pass.
#[derive(Debug, Clone)]
pub struct EvaluationSettings {
    pub freq_start_hz: f64,
    pub freq_end_hz: f64,
    pub scan_step_hz: f64,
    pub damping_ratio: f64,
    pub accel_min: f64,
    pub accel_max: f64,
}

/// Best tuning found for one shaper type.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EvaluationResult {
    pub shaper_type: ShaperType,
    pub center_freq_hz: f64,
    pub residual_vibration: f64,
    pub achievable_accel: f64,
}

/// One result per shaper type, indexed by [`ShaperType::index`].
pub type ShaperTable = [EvaluationResult; SHAPER_COUNT];

impl EvaluationResult {
    fn unscored(shaper_type: ShaperType) -> Self {
        Self {
            shaper_type,
            center_freq_hz: 0.0,
            residual_vibration: f64::INFINITY,
            achievable_accel: 0.0,
        }
    }

    pub fn candidate(&self, damping_ratio: f64) -> ShaperCandidate {
        ShaperCandidate::new(self.shaper_type, self.center_freq_hz, damping_ratio)
    }
}

/// Center frequencies visited by the scan, `freq_end_hz` included.
pub fn scan_frequencies(settings: &EvaluationSettings) -> Result<Vec<f64>, ConfigError> {
    let step = settings.scan_step_hz;
    if !step.is_finite() || step <= 0.0 {
        return Err(ConfigError::Invalid(format!(
            "scan step must be positive and finite, got {step}"
        )));
    }
    let span = settings.freq_end_hz - settings.freq_start_hz;
    let steps = (span / settings.scan_step_hz + 1e-9).floor() as usize;
    let mut freqs: Vec<f64> = (0..=steps)
        .map(|k| settings.freq_start_hz + k as f64 * settings.scan_step_hz)
        .collect();
    if let Some(&last) = freqs.last() {
        if settings.freq_end_hz - last > 1e-9 {
            freqs.push(settings.freq_end_hz);
        }
    }
    Ok(freqs)
}

/// Trapezoid integral of `PSD(f)·|H(f)|²` over `band`.
pub fn residual_vibration(band: &PsdCurve, candidate: &ShaperCandidate) -> f64 {
    band.integrate_weighted(|f| candidate.magnitude_squared(f))
}

/// `PSD(f)·|H(f)|²` per bin, for plotting.
pub fn shaped_psd(psd: &PsdCurve, candidate: &ShaperCandidate) -> Vec<(f64, f64)> {
    psd.frequencies_hz
        .iter()
        .zip(psd.density.iter())
        .map(|(&f, &d)| (f, d * candidate.magnitude_squared(f)))
        .collect()
}

/// Acceleration usable with `shaper_type`, clipped into the configured range.
pub fn achievable_accel(shaper_type: ShaperType, accel_min: f64, accel_max: f64) -> f64 {
    (accel_max * shaper_type.max_accel_factor()).clamp(accel_min, accel_max)
}

/// Scans every shaper type over the configured range against `psd` restricted
/// to [0, freq_end]. The five scans run in parallel, each writing its own slot.
pub fn evaluate_shapers(
    psd: &PsdCurve,
    settings: &EvaluationSettings,
) -> Result<ShaperTable, ConfigError> {
    let freqs = scan_frequencies(settings)?;
    let band = psd.restricted(settings.freq_end_hz);

    let mut table: ShaperTable = ShaperType::ALL.map(EvaluationResult::unscored);
    table.par_iter_mut().for_each(|slot| {
        *slot = evaluate_one(slot.shaper_type, &band, &freqs, settings);
    });

    for r in &table {
        info!(
            shaper = %r.shaper_type,
            center_freq_hz = r.center_freq_hz,
            residual = r.residual_vibration,
            accel = r.achievable_accel,
            "Shaper evaluated"
        );
    }
    Ok(table)
}

fn evaluate_one(
    shaper_type: ShaperType,
    band: &PsdCurve,
    freqs: &[f64],
    settings: &EvaluationSettings,
) -> EvaluationResult {
    let mut best = EvaluationResult::unscored(shaper_type);
    best.achievable_accel = achievable_accel(shaper_type, settings.accel_min, settings.accel_max);

    for &fc in freqs {
        let candidate = ShaperCandidate::new(shaper_type, fc, settings.damping_ratio);
        let residual = residual_vibration(band, &candidate);
        // Strict comparison keeps the first minimum on ties.
        if residual < best.residual_vibration {
            best.residual_vibration = residual;
            best.center_freq_hz = fc;
        }
    }

    if !best.residual_vibration.is_finite() {
        // Empty scan: report the start of the range with zero residual.
        best.residual_vibration = 0.0;
        best.center_freq_hz = settings.freq_start_hz;
    }
    debug!(shaper = %shaper_type, scanned = freqs.len(), "Scan finished");
    best
}
