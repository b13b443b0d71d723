// src/data_analysis/spectral_analysis.rs

use ndarray::Array1;
use ndarray_stats::QuantileExt;
use serde::Serialize;
use tracing::{debug, warn};

use crate::constants::{
    MIN_SEGMENT_LENGTH, WELCH_AUTO_SEGMENT_DIVISOR, WELCH_MAX_AUTO_SEGMENT, WELCH_MIN_AUTO_SEGMENT,
    WELCH_OVERLAP,
};
use crate::data_analysis::fft_utils::{self, ForwardFft};
use crate::error::AnalysisError;

/// Configuration for Welch's method spectral analysis
#[derive(Debug, Clone)]
pub struct WelchConfig {
    /// Segment length in samples (`None`: data_length / 8 within [256, 4096])
    pub segment_length: Option<usize>,
    /// Overlap fraction (default: 50%)
    pub overlap_fraction: f64,
}

impl Default for WelchConfig {
    fn default() -> Self {
        Self {
            segment_length: None,
            overlap_fraction: WELCH_OVERLAP,
        }
    }
}

/// One-sided power spectral density on uniform bins starting at 0 Hz.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PsdCurve {
    pub frequencies_hz: Vec<f64>,
    pub density: Vec<f64>,
}

impl PsdCurve {
    pub fn len(&self) -> usize {
        self.frequencies_hz.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frequencies_hz.is_empty()
    }

    pub fn bin_width_hz(&self) -> f64 {
        if self.frequencies_hz.len() < 2 {
            return 0.0;
        }
        self.frequencies_hz[1] - self.frequencies_hz[0]
    }

    /// Bins at or below `max_hz`.
    pub fn restricted(&self, max_hz: f64) -> PsdCurve {
        let tolerance = self.bin_width_hz() * 1e-9;
        let keep = self
            .frequencies_hz
            .iter()
            .take_while(|&&f| f <= max_hz + tolerance)
            .count();
        PsdCurve {
            frequencies_hz: self.frequencies_hz[..keep].to_vec(),
            density: self.density[..keep].to_vec(),
        }
    }

    /// Highest bin as `(frequency_hz, density)`.
    pub fn peak(&self) -> Option<(f64, f64)> {
        let density = Array1::from(self.density.clone());
        let idx = density.argmax().ok()?;
        Some((self.frequencies_hz[idx], self.density[idx]))
    }

    /// Highest bin with `lo_hz <= f <= hi_hz`, as `(index, frequency_hz, density)`.
    pub fn peak_in_band(&self, lo_hz: f64, hi_hz: f64) -> Option<(usize, f64, f64)> {
        self.frequencies_hz
            .iter()
            .zip(self.density.iter())
            .enumerate()
            .filter(|(_, (f, _))| **f >= lo_hz && **f <= hi_hz)
            .max_by(|a, b| a.1 .1.total_cmp(b.1 .1))
            .map(|(i, (&f, &d))| (i, f, d))
    }

    /// Trapezoid integral of the density over all bins.
    pub fn integrate(&self) -> f64 {
        self.integrate_weighted(|_| 1.0)
    }

    /// Trapezoid integral of `density(f) * weight(f)`.
    pub fn integrate_weighted<F>(&self, weight: F) -> f64
    where
        F: Fn(f64) -> f64,
    {
        let weighted: Vec<f64> = self
            .frequencies_hz
            .iter()
            .zip(self.density.iter())
            .map(|(&f, &d)| d * weight(f))
            .collect();
        trapezoid(&self.frequencies_hz, &weighted)
    }

    pub fn as_pairs(&self) -> Vec<(f64, f64)> {
        self.frequencies_hz
            .iter()
            .copied()
            .zip(self.density.iter().copied())
            .collect()
    }
}

/// Trapezoid rule over paired samples. Zero with fewer than two points.
pub fn trapezoid(x: &[f64], y: &[f64]) -> f64 {
    x.windows(2)
        .zip(y.windows(2))
        .map(|(xs, ys)| 0.5 * (xs[1] - xs[0]) * (ys[0] + ys[1]))
        .sum()
}

/// Welch estimate plus how it was obtained.
#[derive(Debug, Clone)]
pub struct PsdEstimate {
    pub psd: PsdCurve,
    pub segment_length: usize,
    pub segments: usize,
    /// Requested segment was longer than the signal and got shortened.
    pub degraded_resolution: bool,
}

/// Periodic Hann window of the given length.
pub fn hann_window(length: usize) -> Array1<f64> {
    Array1::from_iter(
        (0..length)
            .map(|i| 0.5 * (1.0 - (2.0 * std::f64::consts::PI * i as f64 / length as f64).cos())),
    )
}

/// Default segment length for a signal of `n` samples.
pub fn default_segment_length(n: usize) -> usize {
    (n / WELCH_AUTO_SEGMENT_DIVISOR).clamp(WELCH_MIN_AUTO_SEGMENT, WELCH_MAX_AUTO_SEGMENT)
}

/// Computes Power Spectral Density using Welch's method
///
/// Segments the signal with overlap, removes each segment's mean, applies a
/// Hann window, and averages the one-sided density `2|X_k|^2 / (fs * sum(w^2))`
/// (DC and Nyquist not doubled) across segments. Units are signal units
/// squared per Hz, so the integral over all bins is the signal variance.
pub fn welch_psd(
    signal: &[f64],
    sample_rate: f64,
    config: &WelchConfig,
) -> Result<PsdEstimate, AnalysisError> {
    let n = signal.len();
    if n < MIN_SEGMENT_LENGTH {
        return Err(AnalysisError::InsufficientData {
            available: n,
            required: MIN_SEGMENT_LENGTH,
        });
    }
    if !(sample_rate.is_finite() && sample_rate > 0.0) {
        return Err(AnalysisError::AcquisitionFailure(format!(
            "invalid sample rate {sample_rate}"
        )));
    }

    let requested = config
        .segment_length
        .unwrap_or_else(|| default_segment_length(n))
        .max(2);
    let degraded_resolution = requested > n;
    let segment_length = if degraded_resolution {
        warn!(
            requested,
            available = n,
            "Welch segment longer than signal, reducing resolution"
        );
        n
    } else {
        requested
    };

    let overlap = config.overlap_fraction.clamp(0.0, 0.95);
    let hop_size = (((1.0 - overlap) * segment_length as f64).round() as usize).max(1);
    let num_segments = (n - segment_length) / hop_size + 1;

    let window = hann_window(segment_length);
    let window_power: f64 = window.iter().map(|w| w * w).sum();
    let scale = 1.0 / (sample_rate * window_power);

    let mut fft = ForwardFft::new(segment_length);
    let num_freqs = fft.num_bins();
    let has_nyquist_bin = segment_length % 2 == 0;

    let mut psd_sum = vec![0.0f64; num_freqs];
    let mut segment_count = 0usize;
    let mut buffer = vec![0.0f64; segment_length];

    for seg_idx in 0..num_segments {
        let start = seg_idx * hop_size;
        let segment = &signal[start..start + segment_length];
        let mean = segment.iter().sum::<f64>() / segment_length as f64;
        for ((b, &x), &w) in buffer.iter_mut().zip(segment.iter()).zip(window.iter()) {
            *b = (x - mean) * w;
        }

        let Some(spectrum) = fft.process(&buffer) else {
            continue;
        };

        for (i, (acc, bin)) in psd_sum.iter_mut().zip(spectrum.iter()).enumerate() {
            let mut psd = bin.norm_sqr() * scale;
            let is_nyquist = has_nyquist_bin && i == num_freqs - 1;
            if i > 0 && !is_nyquist {
                psd *= 2.0;
            }
            *acc += psd;
        }
        segment_count += 1;
    }

    if segment_count == 0 {
        return Err(AnalysisError::InsufficientData {
            available: n,
            required: segment_length,
        });
    }

    let frequencies_hz = fft_utils::fft_rfftfreq(segment_length, sample_rate).to_vec();
    let density = psd_sum
        .into_iter()
        .map(|p| p / segment_count as f64)
        .collect();

    debug!(
        segment_length,
        hop_size,
        segments = segment_count,
        bin_width_hz = sample_rate / segment_length as f64,
        "Welch PSD computed"
    );

    Ok(PsdEstimate {
        psd: PsdCurve {
            frequencies_hz,
            density,
        },
        segment_length,
        segments: segment_count,
        degraded_resolution,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn sinusoid(freq: f64, amplitude: f64, fs: f64, n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| amplitude * (2.0 * PI * freq * i as f64 / fs).sin())
            .collect()
    }

    fn variance(x: &[f64]) -> f64 {
        let mean = x.iter().sum::<f64>() / x.len() as f64;
        x.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / x.len() as f64
    }

    #[test]
    fn test_hann_window_is_periodic() {
        let w = hann_window(8);
        assert_eq!(w[0], 0.0);
        assert!((w[4] - 1.0).abs() < 1e-12);
        assert!((w[1] - w[7]).abs() < 1e-12);
    }

    #[test]
    fn test_default_segment_length_clamped() {
        assert_eq!(default_segment_length(100), 256);
        assert_eq!(default_segment_length(3200), 400);
        assert_eq!(default_segment_length(1_000_000), 4096);
    }

    #[test]
    fn test_sinusoid_peak_within_one_bin() {
        let fs = 1600.0;
        let estimate = welch_psd(&sinusoid(73.0, 1.0, fs, 3200), fs, &WelchConfig::default()).unwrap();
        let (peak_freq, _) = estimate.psd.peak().unwrap();
        let bin = estimate.psd.bin_width_hz();
        assert!((peak_freq - 73.0).abs() <= bin, "peak {peak_freq}, bin {bin}");
        assert!(!estimate.degraded_resolution);
    }

    #[test]
    fn test_psd_non_negative_and_uniform() {
        let fs = 1000.0;
        let noise: Vec<f64> = (0..2000u64)
            .map(|i| {
                let h = i.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
                ((h >> 33) as f64 / (1u64 << 31) as f64) - 0.5
            })
            .collect();
        let estimate = welch_psd(&noise, fs, &WelchConfig::default()).unwrap();
        let psd = &estimate.psd;
        assert!(psd.density.iter().all(|&d| d >= 0.0 && d.is_finite()));
        assert_eq!(psd.frequencies_hz[0], 0.0);
        let df = psd.bin_width_hz();
        for w in psd.frequencies_hz.windows(2) {
            assert!((w[1] - w[0] - df).abs() < 1e-9);
        }
        assert!((psd.frequencies_hz[psd.len() - 1] - fs / 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_parseval_for_stationary_sinusoid() {
        let fs = 1600.0;
        let signal = sinusoid(50.0, 2.0, fs, 3200);
        let estimate = welch_psd(&signal, fs, &WelchConfig::default()).unwrap();
        let integral = estimate.psd.integrate();
        let var = variance(&signal);
        assert!((integral - var).abs() / var < 0.05, "integral {integral}, variance {var}");
    }

    #[test]
    fn test_oversized_segment_degrades() {
        let fs = 1000.0;
        let config = WelchConfig {
            segment_length: Some(4096),
            overlap_fraction: 0.5,
        };
        let estimate = welch_psd(&sinusoid(100.0, 1.0, fs, 500), fs, &config).unwrap();
        assert!(estimate.degraded_resolution);
        assert_eq!(estimate.segment_length, 500);
        assert_eq!(estimate.segments, 1);
        assert!(estimate.psd.density.iter().all(|d| d.is_finite()));
    }

    #[test]
    fn test_short_signal_rejected() {
        let err = welch_psd(&[0.0; 8], 1600.0, &WelchConfig::default()).unwrap_err();
        assert!(matches!(err, AnalysisError::InsufficientData { available: 8, .. }));
    }

    #[test]
    fn test_restricted_and_integrate() {
        let psd = PsdCurve {
            frequencies_hz: vec![0.0, 1.0, 2.0, 3.0],
            density: vec![1.0, 1.0, 3.0, 5.0],
        };
        let r = psd.restricted(2.0);
        assert_eq!(r.len(), 3);
        assert!((r.integrate() - 3.0).abs() < 1e-12);
        assert_eq!(psd.peak(), Some((3.0, 5.0)));
        assert_eq!(psd.peak_in_band(0.5, 2.5), Some((2, 2.0, 3.0)));
    }
}
