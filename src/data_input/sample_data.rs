// src/data_input/sample_data.rs

use ndarray::Array1;

use crate::axis_names::TestAxis;
use crate::error::AnalysisError;

/// One accelerometer reading.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Sample {
    pub time_s: f64, // Timestamp (in seconds).
    pub ax: f64,     // Acceleration along X.
    pub ay: f64,     // Acceleration along Y.
    pub az: f64,     // Acceleration along Z.
}

impl Sample {
    pub fn new(time_s: f64, ax: f64, ay: f64, az: f64) -> Self {
        Self { time_s, ax, ay, az }
    }

    /// Value of the channel at `index` (0 = X, 1 = Y, 2 = Z).
    pub fn channel(&self, index: usize) -> f64 {
        match index {
            0 => self.ax,
            1 => self.ay,
            _ => self.az,
        }
    }
}

/// Ordered accelerometer capture. Timestamps are finite and strictly ascending.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct SampleSeries {
    samples: Vec<Sample>,
}

impl SampleSeries {
    /// Wraps `samples`, rejecting non-finite or non-ascending timestamps.
    pub fn new(samples: Vec<Sample>) -> Result<Self, AnalysisError> {
        for (i, s) in samples.iter().enumerate() {
            if !s.time_s.is_finite() {
                return Err(AnalysisError::AcquisitionFailure(format!(
                    "sample {i} has a non-finite timestamp"
                )));
            }
            if i > 0 && s.time_s <= samples[i - 1].time_s {
                return Err(AnalysisError::AcquisitionFailure(format!(
                    "timestamps not strictly ascending at sample {i} ({} <= {})",
                    s.time_s,
                    samples[i - 1].time_s
                )));
            }
        }
        Ok(Self { samples })
    }

    /// Builds a series from a uniformly sampled single-axis signal, starting at t = 0.
    /// The other channels are zero.
    pub fn from_uniform(axis: TestAxis, values: &[f64], sample_rate_hz: f64) -> Result<Self, AnalysisError> {
        if !(sample_rate_hz.is_finite() && sample_rate_hz > 0.0) {
            return Err(AnalysisError::AcquisitionFailure(format!(
                "invalid sample rate {sample_rate_hz}"
            )));
        }
        let dt = 1.0 / sample_rate_hz;
        let samples = values
            .iter()
            .enumerate()
            .map(|(i, &v)| {
                let t = i as f64 * dt;
                match axis {
                    TestAxis::X => Sample::new(t, v, 0.0, 0.0),
                    TestAxis::Y => Sample::new(t, 0.0, v, 0.0),
                }
            })
            .collect();
        Self::new(samples)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn times(&self) -> Array1<f64> {
        self.samples.iter().map(|s| s.time_s).collect()
    }

    /// Column of the given accelerometer channel.
    pub fn channel(&self, index: usize) -> Array1<f64> {
        self.samples.iter().map(|s| s.channel(index)).collect()
    }

    pub fn axis(&self, axis: TestAxis) -> Array1<f64> {
        self.channel(axis.channel_index())
    }

    pub fn duration_s(&self) -> f64 {
        match (self.samples.first(), self.samples.last()) {
            (Some(first), Some(last)) => last.time_s - first.time_s,
            _ => 0.0,
        }
    }

    /// Rate derived from the mean timestamp spacing. `None` with fewer than two samples.
    pub fn sample_rate_hz(&self) -> Option<f64> {
        if self.samples.len() < 2 {
            return None;
        }
        let mean_dt = self.duration_s() / (self.samples.len() - 1) as f64;
        if mean_dt > 0.0 {
            Some(1.0 / mean_dt)
        } else {
            None
        }
    }
}


// src/data_input/sample_data.rs
