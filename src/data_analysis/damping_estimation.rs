// src/data_analysis/damping_estimation.rs

use tracing::debug;

use crate::constants::{MAX_ESTIMATED_DAMPING, MIN_ESTIMATED_DAMPING};
use crate::data_analysis::spectral_analysis::PsdCurve;

/// Half-power bandwidth estimate of the damping ratio of the dominant
/// resonance between `lo_hz` and `hi_hz`.
///
/// Finds the PSD peak in the band, walks outwards to where the density drops
/// below half the peak (linearly interpolating the crossing), and returns
/// `(f2 - f1) / (2 * f_peak)` clamped to [0.01, 0.5]. `None` when the band
/// has no peak or a crossing is missing on either side.
pub fn estimate_damping_ratio(psd: &PsdCurve, lo_hz: f64, hi_hz: f64) -> Option<f64> {
    let (peak_idx, peak_freq, peak_density) = psd.peak_in_band(lo_hz, hi_hz)?;
    if peak_density <= 0.0 || peak_freq <= 0.0 {
        return None;
    }
    let half = peak_density / 2.0;
    let f = &psd.frequencies_hz;
    let d = &psd.density;

    let f_low = (1..=peak_idx).rev().find_map(|i| {
        (d[i - 1] < half).then(|| interpolate_crossing(f[i - 1], d[i - 1], f[i], d[i], half))
    })?;
    let f_high = (peak_idx..d.len() - 1).find_map(|i| {
        (d[i + 1] < half).then(|| interpolate_crossing(f[i], d[i], f[i + 1], d[i + 1], half))
    })?;

    let zeta = ((f_high - f_low) / (2.0 * peak_freq)).clamp(MIN_ESTIMATED_DAMPING, MAX_ESTIMATED_DAMPING);
    debug!(peak_freq, f_low, f_high, zeta, "Half-power damping estimate");
    Some(zeta)
}

fn interpolate_crossing(f0: f64, d0: f64, f1: f64, d1: f64, level: f64) -> f64 {
    if (d1 - d0).abs() < f64::EPSILON {
        return 0.5 * (f0 + f1);
    }
    f0 + (level - d0) * (f1 - f0) / (d1 - d0)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Lorentzian-like resonance line shape of a second-order system.
    fn resonance_psd(fn_hz: f64, zeta: f64, df: f64, max_hz: f64) -> PsdCurve {
        let n = (max_hz / df) as usize + 1;
        let frequencies_hz: Vec<f64> = (0..n).map(|i| i as f64 * df).collect();
        let density = frequencies_hz
            .iter()
            .map(|&f| {
                let r = f / fn_hz;
                1.0 / ((1.0 - r * r).powi(2) + (2.0 * zeta * r).powi(2))
            })
            .collect();
        PsdCurve { frequencies_hz, density }
    }

    #[test]
    fn test_recovers_damping_of_resonance() {
        let psd = resonance_psd(50.0, 0.08, 0.1, 200.0);
        let zeta = estimate_damping_ratio(&psd, 20.0, 100.0).unwrap();
        assert!((zeta - 0.08).abs() < 0.01, "zeta {zeta}");
    }

    #[test]
    fn test_clamped_to_minimum() {
        let psd = resonance_psd(50.0, 0.001, 0.5, 200.0);
        let zeta = estimate_damping_ratio(&psd, 20.0, 100.0).unwrap();
        assert_eq!(zeta, MIN_ESTIMATED_DAMPING);
    }

    #[test]
    fn test_flat_spectrum_has_no_estimate() {
        let psd = PsdCurve {
            frequencies_hz: (0..100).map(|i| i as f64).collect(),
            density: vec![1.0; 100],
        };
        assert!(estimate_damping_ratio(&psd, 10.0, 90.0).is_none());
    }

    #[test]
    fn test_empty_band() {
        let psd = resonance_psd(50.0, 0.05, 1.0, 100.0);
        assert!(estimate_damping_ratio(&psd, 300.0, 400.0).is_none());
    }
}
