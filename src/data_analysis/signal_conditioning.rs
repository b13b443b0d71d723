// src/data_analysis/signal_conditioning.rs

//! Turns one raw accelerometer channel into a uniformly sampled, zero-mean,
//! band-limited signal ready for spectral estimation.

use std::f64::consts::PI;

use ndarray::Array1;
use tracing::{debug, info, warn};

use crate::axis_names::TestAxis;
use crate::constants::{LOWPASS_MAX_NYQUIST_FRACTION, MIN_SEGMENT_LENGTH};
use crate::data_input::sample_data::SampleSeries;
use crate::error::AnalysisError;

#[derive(Debug, Clone)]
pub struct ConditioningConfig {
    /// Relative timestamp jitter above which the series is resampled.
    pub jitter_tolerance: f64,
    /// Butterworth order; must be even.
    pub lowpass_order: usize,
    /// Requested low-pass cutoff. Capped just below Nyquist.
    pub cutoff_hz: f64,
}

/// Conditioned single-axis signal on a uniform time grid.
#[derive(Debug, Clone)]
pub struct ConditionedSignal {
    pub time_s: Array1<f64>,
    /// Axis values before detrending and filtering (resampled when `resampled`).
    pub raw: Array1<f64>,
    pub conditioned: Array1<f64>,
    pub sample_rate_hz: f64,
    pub resampled: bool,
    /// Cutoff actually applied.
    pub cutoff_hz: f64,
}

impl ConditionedSignal {
    pub fn len(&self) -> usize {
        self.conditioned.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conditioned.is_empty()
    }
}

/// Extracts `axis` from `series`, resamples on excessive jitter, removes the
/// mean and applies a zero-phase Butterworth low-pass.
pub fn condition_signal(
    series: &SampleSeries,
    axis: TestAxis,
    config: &ConditioningConfig,
) -> Result<ConditionedSignal, AnalysisError> {
    let n = series.len();
    if n < MIN_SEGMENT_LENGTH {
        return Err(AnalysisError::InsufficientData {
            available: n,
            required: MIN_SEGMENT_LENGTH,
        });
    }
    let sample_rate_hz = series.sample_rate_hz().ok_or(AnalysisError::InsufficientData {
        available: n,
        required: MIN_SEGMENT_LENGTH,
    })?;

    let mut time_s = series.times();
    let mut raw = series.axis(axis);
    if raw.iter().any(|v| !v.is_finite()) {
        return Err(AnalysisError::AcquisitionFailure(format!(
            "non-finite acceleration values on axis {axis}"
        )));
    }

    let jitter = timestamp_jitter(&time_s);
    let resampled = jitter > config.jitter_tolerance;
    if resampled {
        warn!(
            jitter,
            tolerance = config.jitter_tolerance,
            "Timestamp jitter above tolerance, resampling to uniform grid"
        );
        let (t, v) = resample_uniform(&time_s, &raw, 1.0 / sample_rate_hz);
        time_s = t;
        raw = v;
    }

    let mean = raw.mean().unwrap_or(0.0);
    let detrended = raw.mapv(|v| v - mean);

    let nyquist = 0.5 * sample_rate_hz;
    let cutoff_hz = config.cutoff_hz.min(nyquist * LOWPASS_MAX_NYQUIST_FRACTION);
    let sections = butterworth_lowpass(config.lowpass_order, cutoff_hz, sample_rate_hz);
    let conditioned = filtfilt(&sections, &detrended);

    info!(
        %axis,
        samples = n,
        sample_rate_hz,
        cutoff_hz,
        resampled,
        "Signal conditioned"
    );

    Ok(ConditionedSignal {
        time_s,
        raw,
        conditioned,
        sample_rate_hz,
        resampled,
        cutoff_hz,
    })
}

/// `max |dt_i - mean_dt| / mean_dt` over consecutive timestamps.
pub fn timestamp_jitter(time_s: &Array1<f64>) -> f64 {
    let n = time_s.len();
    if n < 3 {
        return 0.0;
    }
    let mean_dt = (time_s[n - 1] - time_s[0]) / (n - 1) as f64;
    if mean_dt <= 0.0 {
        return 0.0;
    }
    time_s
        .windows(2)
        .into_iter()
        .map(|w| ((w[1] - w[0]) - mean_dt).abs())
        .fold(0.0, f64::max)
        / mean_dt
}

/// Linear interpolation of `(time_s, values)` onto `t0 + k * dt`, same sample count.
pub fn resample_uniform(time_s: &Array1<f64>, values: &Array1<f64>, dt: f64) -> (Array1<f64>, Array1<f64>) {
    let n = time_s.len();
    if n == 0 {
        return (Array1::zeros(0), Array1::zeros(0));
    }
    let t0 = time_s[0];
    let grid = Array1::from_iter((0..n).map(|k| t0 + k as f64 * dt));
    let mut out = Array1::zeros(n);
    let mut j = 0usize;
    for (k, &t) in grid.iter().enumerate() {
        while j + 2 < n && time_s[j + 1] < t {
            j += 1;
        }
        let (ta, tb) = (time_s[j], time_s[(j + 1).min(n - 1)]);
        let (va, vb) = (values[j], values[(j + 1).min(n - 1)]);
        out[k] = if tb > ta {
            let frac = ((t - ta) / (tb - ta)).clamp(0.0, 1.0);
            va + frac * (vb - va)
        } else {
            va
        };
    }
    (grid, out)
}

/// One second-order section in transposed direct form II.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Biquad {
    pub b0: f64,
    pub b1: f64,
    pub b2: f64,
    pub a1: f64,
    pub a2: f64,
}

impl Biquad {
    /// Filters `x` in place, starting from the steady state for a constant `x[0]` input.
    fn process_in_place(&self, x: &mut [f64]) {
        let Some(&x0) = x.first() else {
            return;
        };
        let mut z1 = x0 * (1.0 - self.b0);
        let mut z2 = x0 * (self.b2 - self.a2);
        for v in x.iter_mut() {
            let input = *v;
            let y = self.b0 * input + z1;
            z1 = self.b1 * input - self.a1 * y + z2;
            z2 = self.b2 * input - self.a2 * y;
            *v = y;
        }
    }

    /// Gain at DC.
    pub fn dc_gain(&self) -> f64 {
        (self.b0 + self.b1 + self.b2) / (1.0 + self.a1 + self.a2)
    }
}

/// Even-order Butterworth low-pass as cascaded biquads (bilinear transform, prewarped).
pub fn butterworth_lowpass(order: usize, cutoff_hz: f64, sample_rate_hz: f64) -> Vec<Biquad> {
    let k = (PI * cutoff_hz / sample_rate_hz).tan();
    let k2 = k * k;
    (0..order / 2)
        .map(|i| {
            let q = 1.0 / (2.0 * (PI * (2 * i + 1) as f64 / (2 * order) as f64).cos());
            let norm = 1.0 / (1.0 + k / q + k2);
            let b0 = k2 * norm;
            Biquad {
                b0,
                b1: 2.0 * b0,
                b2: b0,
                a1: 2.0 * (k2 - 1.0) * norm,
                a2: (1.0 - k / q + k2) * norm,
            }
        })
        .collect()
}

/// Zero-phase forward-backward filtering with odd-extension edge padding.
pub fn filtfilt(sections: &[Biquad], signal: &Array1<f64>) -> Array1<f64> {
    let n = signal.len();
    if n < 2 || sections.is_empty() {
        return signal.clone();
    }
    let padlen = (3 * (2 * sections.len() + 1)).min(n - 1);
    let first = signal[0];
    let last = signal[n - 1];

    let mut ext = Vec::with_capacity(n + 2 * padlen);
    ext.extend((1..=padlen).rev().map(|i| 2.0 * first - signal[i]));
    ext.extend(signal.iter().copied());
    ext.extend((1..=padlen).map(|i| 2.0 * last - signal[n - 1 - i]));

    for section in sections {
        section.process_in_place(&mut ext);
    }
    ext.reverse();
    for section in sections {
        section.process_in_place(&mut ext);
    }
    ext.reverse();

    debug!(samples = n, padlen, sections = sections.len(), "filtfilt applied");
    Array1::from(ext[padlen..padlen + n].to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_input::sample_data::Sample;

    fn config(cutoff_hz: f64) -> ConditioningConfig {
        ConditioningConfig {
            jitter_tolerance: 0.05,
            lowpass_order: 4,
            cutoff_hz,
        }
    }

    fn tone(freq: f64, fs: f64, n: usize) -> Vec<f64> {
        (0..n).map(|i| (2.0 * PI * freq * i as f64 / fs).sin()).collect()
    }

    fn rms(x: &[f64]) -> f64 {
        (x.iter().map(|v| v * v).sum::<f64>() / x.len() as f64).sqrt()
    }

    #[test]
    fn test_butterworth_sections_have_unity_dc_gain() {
        let sections = butterworth_lowpass(4, 100.0, 1600.0);
        assert_eq!(sections.len(), 2);
        for s in &sections {
            assert!((s.dc_gain() - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_filtfilt_preserves_constant() {
        let sections = butterworth_lowpass(4, 50.0, 1000.0);
        let signal = Array1::from_elem(200, 3.5);
        let out = filtfilt(&sections, &signal);
        for v in out.iter() {
            assert!((v - 3.5).abs() < 1e-9);
        }
    }

    #[test]
    fn test_filtfilt_passes_low_and_rejects_high() {
        let fs = 1600.0;
        let sections = butterworth_lowpass(4, 100.0, fs);
        let low = filtfilt(&sections, &Array1::from(tone(20.0, fs, 3200)));
        let high = filtfilt(&sections, &Array1::from(tone(400.0, fs, 3200)));
        let mid = 1600;
        let low_rms = rms(&low.as_slice().unwrap()[mid - 400..mid + 400]);
        let high_rms = rms(&high.as_slice().unwrap()[mid - 400..mid + 400]);
        // Input RMS is 1/sqrt(2).
        assert!((low_rms - std::f64::consts::FRAC_1_SQRT_2).abs() < 0.01, "low {low_rms}");
        assert!(high_rms < 0.01, "high {high_rms}");
    }

    #[test]
    fn test_jitter_measure() {
        let uniform = Array1::from_iter((0..10).map(|i| i as f64 * 0.01));
        assert!(timestamp_jitter(&uniform) < 1e-9);
        let mut jittery = uniform.clone();
        jittery[4] += 0.002;
        assert!(timestamp_jitter(&jittery) > 0.15);
    }

    #[test]
    fn test_resample_linear() {
        let t = Array1::from(vec![0.0, 0.1, 0.3, 0.4]);
        let v = Array1::from(vec![0.0, 1.0, 3.0, 4.0]);
        let (grid, out) = resample_uniform(&t, &v, 0.4 / 3.0);
        assert_eq!(grid.len(), 4);
        for (g, o) in grid.iter().zip(out.iter()) {
            assert!((g * 10.0 - o).abs() < 1e-9, "{g} -> {o}");
        }
    }

    #[test]
    fn test_too_few_samples() {
        let series = SampleSeries::from_uniform(TestAxis::X, &[1.0; 8], 1600.0).unwrap();
        let err = condition_signal(&series, TestAxis::X, &config(100.0)).unwrap_err();
        assert!(matches!(
            err,
            AnalysisError::InsufficientData { available: 8, required: MIN_SEGMENT_LENGTH }
        ));
    }

    #[test]
    fn test_conditioning_removes_mean() {
        let values: Vec<f64> = tone(30.0, 1600.0, 1600).iter().map(|v| v + 5.0).collect();
        let series = SampleSeries::from_uniform(TestAxis::Y, &values, 1600.0).unwrap();
        let out = condition_signal(&series, TestAxis::Y, &config(100.0)).unwrap();
        assert!(!out.resampled);
        assert!(out.conditioned.mean().unwrap().abs() < 0.05);
        assert_eq!(out.raw[0], 5.0);
    }

    #[test]
    fn test_jittery_series_is_resampled() {
        let samples: Vec<Sample> = (0..200)
            .map(|i| {
                let wobble = if i % 2 == 0 { 0.0 } else { 0.0003 };
                Sample::new(i as f64 * 0.001 + wobble, (i as f64 * 0.05).sin(), 0.0, 0.0)
            })
            .collect();
        let series = SampleSeries::new(samples).unwrap();
        let out = condition_signal(&series, TestAxis::X, &config(100.0)).unwrap();
        assert!(out.resampled);
        let dt = out.time_s[1] - out.time_s[0];
        assert!((out.time_s[150] - out.time_s[149] - dt).abs() < 1e-12);
    }

    #[test]
    fn test_cutoff_capped_below_nyquist() {
        let series = SampleSeries::from_uniform(TestAxis::X, &tone(10.0, 200.0, 400), 200.0).unwrap();
        let out = condition_signal(&series, TestAxis::X, &config(500.0)).unwrap();
        assert!((out.cutoff_hz - 99.0).abs() < 1e-6);
        assert!(out.conditioned.iter().all(|v| v.is_finite()));
    }
}
