// src/data_analysis/fft_utils.rs

use std::sync::Arc;

use ndarray::Array1;
use realfft::num_complex::Complex64;
use realfft::{RealFftPlanner, RealToComplex};
use tracing::warn;

/// Forward real FFT of a fixed length, planned once and reused for every
/// segment of a Welch estimate.
pub struct ForwardFft {
    plan: Arc<dyn RealToComplex<f64>>,
    input: Vec<f64>,
    output: Vec<Complex64>,
}

impl ForwardFft {
    pub fn new(len: usize) -> Self {
        let plan = RealFftPlanner::<f64>::new().plan_fft_forward(len);
        let input = plan.make_input_vec();
        let output = plan.make_output_vec();
        Self { plan, input, output }
    }

    pub fn len(&self) -> usize {
        self.input.len()
    }

    pub fn is_empty(&self) -> bool {
        self.input.is_empty()
    }

    /// Number of one-sided bins (`len / 2 + 1`).
    pub fn num_bins(&self) -> usize {
        self.output.len()
    }

    /// Transforms `data` (must be `len()` long) and returns the one-sided spectrum.
    /// Returns `None` on a length mismatch or planner failure.
    pub fn process(&mut self, data: &[f64]) -> Option<&[Complex64]> {
        if data.len() != self.input.len() {
            warn!(
                expected = self.input.len(),
                got = data.len(),
                "FFT input length mismatch"
            );
            return None;
        }
        self.input.copy_from_slice(data);
        if self.plan.process(&mut self.input, &mut self.output).is_err() {
            warn!("FFT forward processing failed");
            return None;
        }
        Some(&self.output)
    }
}

/// Bin center frequencies of a length-`n` real FFT sampled at `sample_rate` Hz.
pub fn fft_rfftfreq(n: usize, sample_rate: f64) -> Array1<f64> {
    if n == 0 || sample_rate <= 0.0 {
        return Array1::zeros(0);
    }
    let num_freqs = n / 2 + 1;
    Array1::from_iter((0..num_freqs).map(|i| i as f64 * sample_rate / n as f64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn test_rfftfreq_spacing() {
        let freqs = fft_rfftfreq(8, 800.0);
        assert_eq!(freqs.len(), 5);
        assert_eq!(freqs[1], 100.0);
        assert_eq!(freqs[4], 400.0);
    }

    #[test]
    fn test_forward_of_cosine_hits_expected_bin() {
        let n = 64;
        let data: Vec<f64> = (0..n).map(|i| (2.0 * PI * 4.0 * i as f64 / n as f64).cos()).collect();
        let mut fft = ForwardFft::new(n);
        assert_eq!(fft.num_bins(), n / 2 + 1);
        let spectrum = fft.process(&data).unwrap();
        let peak = spectrum
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.norm().total_cmp(&b.1.norm()))
            .map(|(i, _)| i)
            .unwrap();
        assert_eq!(peak, 4);
        assert!((spectrum[4].norm() - n as f64 / 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_length_mismatch_is_none() {
        let mut fft = ForwardFft::new(16);
        assert!(fft.process(&[0.0; 8]).is_none());
        assert!(fft.process(&[0.0; 16]).is_some());
    }
}
