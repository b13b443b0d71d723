// src/config.rs

//! Analyzer configuration loaded from TOML.
//!
//! Every section is optional; missing keys fall back to the defaults in
//! [`crate::constants`]. [`AnalyzerConfig::validate`] runs once per
//! invocation before any signal is touched.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::constants::{
    DEFAULT_ACCEL_MAX, DEFAULT_ACCEL_MIN, DEFAULT_BED_HEIGHT_MM, DEFAULT_BED_SIZE_MM,
    DEFAULT_DAMPING_RATIO, DEFAULT_FREQ_END_HZ, DEFAULT_FREQ_START_HZ, LOWPASS_ORDER,
    RANKING_EPSILON, RESAMPLE_JITTER_TOLERANCE, SHAPER_SCAN_STEP_HZ, WELCH_OVERLAP,
};
use crate::data_input::sweep_request::SensorType;
use crate::error::ConfigError;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AnalyzerConfig {
    #[serde(default)]
    pub printer: PrinterConfig,
    #[serde(default)]
    pub test: TestConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Printable volume, used to keep the sweep envelope on the bed.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PrinterConfig {
    #[serde(default = "default_bed_size")]
    pub bed_size_x: f64,
    #[serde(default = "default_bed_size")]
    pub bed_size_y: f64,
    #[serde(default = "default_bed_height")]
    pub bed_size_z: f64,
}

impl Default for PrinterConfig {
    fn default() -> Self {
        Self {
            bed_size_x: default_bed_size(),
            bed_size_y: default_bed_size(),
            bed_size_z: default_bed_height(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TestConfig {
    #[serde(default = "default_accel_min")]
    pub accel_min: f64,
    #[serde(default = "default_accel_max")]
    pub accel_max: f64,
    #[serde(default = "default_freq_start")]
    pub freq_start: f64,
    #[serde(default = "default_freq_end")]
    pub freq_end: f64,
    #[serde(default = "default_damping_ratio")]
    pub damping_ratio: f64,
    #[serde(default)]
    pub sensor_type: SensorType,
    /// Requested capture rate; clamped into the sensor's supported window.
    #[serde(default)]
    pub capture_rate_hz: Option<f64>,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            accel_min: default_accel_min(),
            accel_max: default_accel_max(),
            freq_start: default_freq_start(),
            freq_end: default_freq_end(),
            damping_ratio: default_damping_ratio(),
            sensor_type: SensorType::default(),
            capture_rate_hz: None,
        }
    }
}

/// Knobs for the conditioning / Welch / scan / ranking stages.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AnalysisConfig {
    /// Welch segment length in samples. `None` picks one from the signal length.
    #[serde(default)]
    pub segment_length: Option<usize>,
    #[serde(default = "default_overlap")]
    pub overlap: f64,
    #[serde(default = "default_scan_step")]
    pub scan_step_hz: f64,
    #[serde(default = "default_ranking_epsilon")]
    pub ranking_epsilon: f64,
    #[serde(default = "default_jitter_tolerance")]
    pub resample_jitter_tolerance: f64,
    #[serde(default = "default_lowpass_order")]
    pub lowpass_order: usize,
    #[serde(default)]
    pub estimate_damping: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            segment_length: None,
            overlap: default_overlap(),
            scan_step_hz: default_scan_step(),
            ranking_epsilon: default_ranking_epsilon(),
            resample_jitter_tolerance: default_jitter_tolerance(),
            lowpass_order: default_lowpass_order(),
            estimate_damping: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutputConfig {
    /// Serving root; artifact paths in results are relative to it.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default = "default_true")]
    pub write_artifacts: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            write_artifacts: true,
        }
    }
}

fn default_bed_size() -> f64 {
    DEFAULT_BED_SIZE_MM
}
fn default_bed_height() -> f64 {
    DEFAULT_BED_HEIGHT_MM
}
fn default_accel_min() -> f64 {
    DEFAULT_ACCEL_MIN
}
fn default_accel_max() -> f64 {
    DEFAULT_ACCEL_MAX
}
fn default_freq_start() -> f64 {
    DEFAULT_FREQ_START_HZ
}
fn default_freq_end() -> f64 {
    DEFAULT_FREQ_END_HZ
}
fn default_damping_ratio() -> f64 {
    DEFAULT_DAMPING_RATIO
}
fn default_overlap() -> f64 {
    WELCH_OVERLAP
}
fn default_scan_step() -> f64 {
    SHAPER_SCAN_STEP_HZ
}
fn default_ranking_epsilon() -> f64 {
    RANKING_EPSILON
}
fn default_jitter_tolerance() -> f64 {
    RESAMPLE_JITTER_TOLERANCE
}
fn default_lowpass_order() -> usize {
    LOWPASS_ORDER
}
fn default_output_dir() -> PathBuf {
    PathBuf::from("shaper_results")
}
fn default_true() -> bool {
    true
}

impl AnalyzerConfig {
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&contents)?;
        info!(path = %path.display(), "Loaded analyzer config");
        Ok(config)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects values no run could use.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let p = &self.printer;
        for (name, value) in [
            ("printer.bed_size_x", p.bed_size_x),
            ("printer.bed_size_y", p.bed_size_y),
            ("printer.bed_size_z", p.bed_size_z),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(invalid(format!("{name} must be positive, got {value}")));
            }
        }

        validate_test_ranges(
            self.test.accel_min,
            self.test.accel_max,
            self.test.freq_start,
            self.test.freq_end,
            self.test.damping_ratio,
        )?;
        if let Some(rate) = self.test.capture_rate_hz {
            if !rate.is_finite() || rate <= 0.0 {
                return Err(invalid(format!("test.capture_rate_hz must be positive, got {rate}")));
            }
        }

        let a = &self.analysis;
        if !(0.0..1.0).contains(&a.overlap) {
            return Err(invalid(format!("analysis.overlap must be in [0, 1), got {}", a.overlap)));
        }
        if !a.scan_step_hz.is_finite() || a.scan_step_hz <= 0.0 {
            return Err(invalid(format!(
                "analysis.scan_step_hz must be positive, got {}",
                a.scan_step_hz
            )));
        }
        if !a.ranking_epsilon.is_finite() || a.ranking_epsilon < 0.0 {
            return Err(invalid(format!(
                "analysis.ranking_epsilon must be non-negative, got {}",
                a.ranking_epsilon
            )));
        }
        if !a.resample_jitter_tolerance.is_finite() || a.resample_jitter_tolerance < 0.0 {
            return Err(invalid(format!(
                "analysis.resample_jitter_tolerance must be non-negative, got {}",
                a.resample_jitter_tolerance
            )));
        }
        if a.lowpass_order == 0 || a.lowpass_order % 2 != 0 || a.lowpass_order > 8 {
            return Err(invalid(format!(
                "analysis.lowpass_order must be an even number between 2 and 8, got {}",
                a.lowpass_order
            )));
        }
        if let Some(len) = a.segment_length {
            if len < 2 {
                return Err(invalid(format!("analysis.segment_length must be at least 2, got {len}")));
            }
        }

        debug!(?self, "Configuration validated");
        Ok(())
    }
}

/// Shared range checks for the per-test numbers, used by both the config file
/// and directly constructed sweep requests.
pub fn validate_test_ranges(
    accel_min: f64,
    accel_max: f64,
    freq_start: f64,
    freq_end: f64,
    damping_ratio: f64,
) -> Result<(), ConfigError> {
    if !accel_min.is_finite() || !accel_max.is_finite() || accel_min <= 0.0 {
        return Err(invalid(format!(
            "accel range must be positive and finite, got [{accel_min}, {accel_max}]"
        )));
    }
    if accel_max < accel_min {
        return Err(invalid(format!(
            "accel_max ({accel_max}) must not be below accel_min ({accel_min})"
        )));
    }
    if !freq_start.is_finite() || !freq_end.is_finite() || freq_start <= 0.0 {
        return Err(invalid(format!(
            "frequency range must be positive and finite, got [{freq_start}, {freq_end}]"
        )));
    }
    if freq_end <= freq_start {
        return Err(invalid(format!(
            "freq_end ({freq_end}) must be above freq_start ({freq_start})"
        )));
    }
    if !(damping_ratio > 0.0 && damping_ratio < 1.0) {
        return Err(invalid(format!(
            "damping_ratio must be in (0, 1), got {damping_ratio}"
        )));
    }
    Ok(())
}

fn invalid(msg: String) -> ConfigError {
    ConfigError::Invalid(msg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let cfg = AnalyzerConfig::from_toml_str("").unwrap();
        assert_eq!(cfg.test.accel_min, DEFAULT_ACCEL_MIN);
        assert_eq!(cfg.analysis.lowpass_order, LOWPASS_ORDER);
        assert_eq!(cfg.test.sensor_type, SensorType::AdxlSpi);
        assert!(cfg.output.write_artifacts);
        assert!(!cfg.analysis.estimate_damping);
    }

    #[test]
    fn test_sections_override_defaults() {
        let toml_str = r#"
            [printer]
            bed_size_x = 300.0

            [test]
            accel_min = 1000
            accel_max = 8000
            freq_start = 20
            freq_end = 100
            sensor_type = "lis2dw"

            [analysis]
            ranking_epsilon = 0.05
            estimate_damping = true
        "#;
        let cfg = AnalyzerConfig::from_toml_str(toml_str).unwrap();
        assert_eq!(cfg.printer.bed_size_x, 300.0);
        assert_eq!(cfg.printer.bed_size_y, DEFAULT_BED_SIZE_MM);
        assert_eq!(cfg.test.accel_max, 8000.0);
        assert_eq!(cfg.test.sensor_type, SensorType::Lis2dw);
        assert_eq!(cfg.analysis.ranking_epsilon, 0.05);
        assert!(cfg.analysis.estimate_damping);
    }

    #[test]
    fn test_inverted_frequency_range_rejected() {
        let toml_str = "[test]\nfreq_start = 100\nfreq_end = 20\n";
        let err = AnalyzerConfig::from_toml_str(toml_str).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_damping_out_of_range_rejected() {
        assert!(AnalyzerConfig::from_toml_str("[test]\ndamping_ratio = 1.0\n").is_err());
        assert!(AnalyzerConfig::from_toml_str("[test]\ndamping_ratio = 0.0\n").is_err());
    }

    #[test]
    fn test_odd_lowpass_order_rejected() {
        assert!(AnalyzerConfig::from_toml_str("[analysis]\nlowpass_order = 3\n").is_err());
    }

    #[test]
    fn test_unknown_sensor_is_parse_error() {
        let err = AnalyzerConfig::from_toml_str("[test]\nsensor_type = \"mpu6050\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Toml(_)));
    }

    #[test]
    fn test_negative_bed_size_rejected() {
        assert!(AnalyzerConfig::from_toml_str("[printer]\nbed_size_y = -1.0\n").is_err());
    }
}
