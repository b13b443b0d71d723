// src/constants.rs

use plotters::style::RGBColor;

// Plot dimensions.
pub const PLOT_WIDTH: u32 = 1920;
pub const PLOT_HEIGHT: u32 = 1080;

// Font sizes used across plot rendering.
pub const FONT_SIZE_CHART_TITLE: i32 = 24;
pub const FONT_SIZE_AXIS_LABEL: i32 = 14;
pub const FONT_SIZE_LEGEND: i32 = 14;
pub const FONT_SIZE_MESSAGE: i32 = 18;

// --- Signal conditioning ---
// Minimum number of samples the Welch estimator accepts as one segment.
pub const MIN_SEGMENT_LENGTH: usize = 64;
// Relative timestamp jitter above which the series is resampled to a uniform grid.
pub const RESAMPLE_JITTER_TOLERANCE: f64 = 0.05;
pub const LOWPASS_ORDER: usize = 4;
// Cutoff never exceeds this fraction of Nyquist.
pub const LOWPASS_MAX_NYQUIST_FRACTION: f64 = 0.99;

// --- Welch PSD ---
pub const WELCH_OVERLAP: f64 = 0.5;
pub const WELCH_MIN_AUTO_SEGMENT: usize = 256;
pub const WELCH_MAX_AUTO_SEGMENT: usize = 4096;
pub const WELCH_AUTO_SEGMENT_DIVISOR: usize = 8; // aim for ~8 averages

// --- Shaper evaluation / ranking ---
pub const SHAPER_SCAN_STEP_HZ: f64 = 0.5;
pub const RANKING_EPSILON: f64 = 0.10;

// --- Damping estimation ---
pub const MIN_ESTIMATED_DAMPING: f64 = 0.01;
pub const MAX_ESTIMATED_DAMPING: f64 = 0.5;

// --- Test defaults ---
pub const DEFAULT_ACCEL_MIN: f64 = 300.0;
pub const DEFAULT_ACCEL_MAX: f64 = 2500.0;
pub const DEFAULT_FREQ_START_HZ: f64 = 5.0;
pub const DEFAULT_FREQ_END_HZ: f64 = 132.0;
pub const DEFAULT_DAMPING_RATIO: f64 = 0.05;
pub const DEFAULT_BED_SIZE_MM: f64 = 220.0;
pub const DEFAULT_BED_HEIGHT_MM: f64 = 250.0;
// Probe height when none is given; X/Y default to the bed center.
pub const DEFAULT_PROBE_Z_MM: f64 = 20.0;

// --- Resonance sweep program ---
pub const SWEEP_CYCLES: usize = 800;
pub const SWEEP_STEPS_PER_CYCLE: usize = 4;
pub const SWEEP_START_AMPLITUDE_MM: f64 = 5.0;
pub const SWEEP_END_AMPLITUDE_MM: f64 = 1.0;
pub const SWEEP_FEED_MIN: f64 = 2000.0;
pub const SWEEP_FEED_MAX: f64 = 15000.0;
pub const SWEEP_FEED_PER_ACCEL: f64 = 100.0;
pub const SWEEP_ACCEL_REISSUE_THRESHOLD: i64 = 100;
pub const PARK_FEEDRATE: u32 = 1500;

// --- Test sweep (chirp) program ---
pub const TEST_SWEEP_POINTS: usize = 2000;
pub const TEST_SWEEP_DURATION_S: f64 = 20.0;
pub const TEST_SWEEP_AMPLITUDE_MM: f64 = 1.0;
// mm/min per mm/s² of the configured maximum acceleration.
pub const TEST_SWEEP_FEED_PER_ACCEL: f64 = 60.0;

// --- Artifacts ---
// Every Nth sample is kept in the serialized time-domain plot data.
pub const PLOT_DATA_DECIMATION: usize = 5;
// Every Nth sample is drawn in the time-domain PNG.
pub const SIGNAL_PLOT_DECIMATION: usize = 10;
pub const PSD_PLOT_HEADROOM_FACTOR: f64 = 1.1;

// --- Plot Color Assignments ---
pub const COLOR_SIGNAL_RAW: RGBColor = RGBColor(0, 123, 255);
pub const COLOR_SIGNAL_CONDITIONED: RGBColor = RGBColor(255, 127, 14);
pub const COLOR_PSD_ORIGINAL: RGBColor = RGBColor(0, 0, 0);
pub const COLOR_SHAPERS: [RGBColor; 5] = [
    RGBColor(31, 119, 180),
    RGBColor(44, 160, 44),
    RGBColor(214, 39, 40),
    RGBColor(148, 103, 189),
    RGBColor(140, 86, 75),
];

// Stroke widths for lines
pub const LINE_WIDTH_PLOT: u32 = 1;
pub const LINE_WIDTH_EMPHASIS: u32 = 2;
pub const LINE_WIDTH_LEGEND: u32 = 2;

// src/constants.rs
