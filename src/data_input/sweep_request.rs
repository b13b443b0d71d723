// src/data_input/sweep_request.rs

use serde::{Deserialize, Serialize};

use crate::axis_names::TestAxis;
use crate::config::{validate_test_ranges, AnalyzerConfig};
use crate::error::ConfigError;

const ADXL_MAX_RATE_HZ: f64 = 3200.0;
const LIS2DW_MIN_RATE_HZ: f64 = 200.0;
const LIS2DW_MAX_RATE_HZ: f64 = 1600.0;

/// Accelerometer used for the capture.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SensorType {
    /// ADXL345 on SPI.
    #[default]
    AdxlSpi,
    Lis2dw,
}

impl SensorType {
    /// Capture rate actually used for `requested`, clamped into what the part supports.
    /// With no request the fastest supported rate is used.
    pub fn capture_rate_hz(self, requested: Option<f64>) -> f64 {
        match self {
            SensorType::AdxlSpi => requested.map_or(ADXL_MAX_RATE_HZ, |r| r.min(ADXL_MAX_RATE_HZ)),
            SensorType::Lis2dw => requested.map_or(LIS2DW_MAX_RATE_HZ, |r| {
                r.clamp(LIS2DW_MIN_RATE_HZ, LIS2DW_MAX_RATE_HZ)
            }),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SensorType::AdxlSpi => "adxlspi",
            SensorType::Lis2dw => "lis2dw",
        }
    }
}

/// Toolhead position the sweep oscillates around.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProbePoint {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Parameters of one single-axis resonance test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AxisSweepRequest {
    pub axis: TestAxis,
    pub probe: ProbePoint,
    pub accel_min: f64,
    pub accel_max: f64,
    pub freq_start_hz: f64,
    pub freq_end_hz: f64,
    /// Damping used when estimation is disabled.
    pub damping_ratio: f64,
    pub sensor_type: SensorType,
}

impl AxisSweepRequest {
    /// Request for `axis` at `probe` using the `[test]` section of `config`.
    pub fn from_config(config: &AnalyzerConfig, axis: TestAxis, probe: ProbePoint) -> Self {
        let t = &config.test;
        Self {
            axis,
            probe,
            accel_min: t.accel_min,
            accel_max: t.accel_max,
            freq_start_hz: t.freq_start,
            freq_end_hz: t.freq_end,
            damping_ratio: t.damping_ratio,
            sensor_type: t.sensor_type,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_test_ranges(
            self.accel_min,
            self.accel_max,
            self.freq_start_hz,
            self.freq_end_hz,
            self.damping_ratio,
        )?;
        let p = &self.probe;
        if !(p.x.is_finite() && p.y.is_finite() && p.z.is_finite()) {
            return Err(ConfigError::Invalid(format!("probe point must be finite, got {p:?}")));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> AxisSweepRequest {
        AxisSweepRequest {
            axis: TestAxis::X,
            probe: ProbePoint { x: 110.0, y: 110.0, z: 20.0 },
            accel_min: 1000.0,
            accel_max: 8000.0,
            freq_start_hz: 20.0,
            freq_end_hz: 100.0,
            damping_ratio: 0.05,
            sensor_type: SensorType::AdxlSpi,
        }
    }

    #[test]
    fn test_capture_rate_windows() {
        assert_eq!(SensorType::AdxlSpi.capture_rate_hz(None), 3200.0);
        assert_eq!(SensorType::AdxlSpi.capture_rate_hz(Some(6400.0)), 3200.0);
        assert_eq!(SensorType::AdxlSpi.capture_rate_hz(Some(800.0)), 800.0);
        assert_eq!(SensorType::Lis2dw.capture_rate_hz(Some(100.0)), 200.0);
        assert_eq!(SensorType::Lis2dw.capture_rate_hz(Some(3200.0)), 1600.0);
    }

    #[test]
    fn test_valid_request() {
        assert!(request().validate().is_ok());
    }

    #[test]
    fn test_inverted_accel_rejected() {
        let mut r = request();
        r.accel_max = 500.0;
        assert!(r.validate().is_err());
    }

    #[test]
    fn test_non_finite_probe_rejected() {
        let mut r = request();
        r.probe.y = f64::NAN;
        assert!(r.validate().is_err());
    }

    #[test]
    fn test_from_config_copies_test_section() {
        let cfg = AnalyzerConfig::default();
        let r = AxisSweepRequest::from_config(&cfg, TestAxis::Y, ProbePoint { x: 1.0, y: 2.0, z: 3.0 });
        assert_eq!(r.axis, TestAxis::Y);
        assert_eq!(r.freq_end_hz, cfg.test.freq_end);
        assert_eq!(r.damping_ratio, cfg.test.damping_ratio);
    }
}

// src/data_input/sweep_request.rs
