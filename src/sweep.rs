// src/sweep.rs

//! G-code program for a single-axis resonance test.
//!
//! The toolhead oscillates around the probe point along the tested axis
//! while the acceleration ramps up and the amplitude tapers off. A shorter
//! chirp program ([`test_sweep`]) exercises the axis without capturing.
//! Sending either program is up to the host.

use std::f64::consts::PI;

use tracing::{debug, info};

use crate::axis_names::TestAxis;
use crate::config::PrinterConfig;
use crate::constants::{
    PARK_FEEDRATE, SWEEP_ACCEL_REISSUE_THRESHOLD, SWEEP_CYCLES, SWEEP_END_AMPLITUDE_MM,
    SWEEP_FEED_MAX, SWEEP_FEED_MIN, SWEEP_FEED_PER_ACCEL, SWEEP_START_AMPLITUDE_MM,
    SWEEP_STEPS_PER_CYCLE, TEST_SWEEP_AMPLITUDE_MM, TEST_SWEEP_DURATION_S,
    TEST_SWEEP_FEED_PER_ACCEL, TEST_SWEEP_POINTS,
};
use crate::data_input::sweep_request::{AxisSweepRequest, ProbePoint};
use crate::error::{AnalysisError, ConfigError};

/// Value `i` of `count` evenly spaced points from `start` to `end` inclusive.
fn linspace_at(start: f64, end: f64, count: usize, i: usize) -> f64 {
    if count < 2 {
        return start;
    }
    start + (end - start) * i as f64 / (count - 1) as f64
}

/// Home, move to the probe point and dwell.
pub fn park_commands(probe: &ProbePoint) -> Vec<String> {
    vec![
        "G28".to_string(),
        format!(
            "G0 X{:.3} Y{:.3} Z{:.3} F{}",
            probe.x, probe.y, probe.z, PARK_FEEDRATE
        ),
        "G4 P1000".to_string(),
    ]
}

/// Checks that the probe point and the whole oscillation envelope are on the bed.
pub fn check_bed_bounds(request: &AxisSweepRequest, bed: &PrinterConfig) -> Result<(), ConfigError> {
    check_envelope(request, SWEEP_START_AMPLITUDE_MM, bed)
}

fn check_envelope(
    request: &AxisSweepRequest,
    amplitude: f64,
    bed: &PrinterConfig,
) -> Result<(), ConfigError> {
    let p = &request.probe;
    let (lo, hi, bed_len, name) = match request.axis {
        TestAxis::X => (p.x - amplitude, p.x + amplitude, bed.bed_size_x, "X"),
        TestAxis::Y => (p.y - amplitude, p.y + amplitude, bed.bed_size_y, "Y"),
    };
    let on_bed = |v: f64, max: f64| (0.0..=max).contains(&v);
    if !(on_bed(p.x, bed.bed_size_x) && on_bed(p.y, bed.bed_size_y) && on_bed(p.z, bed.bed_size_z)) {
        return Err(ConfigError::Invalid(format!(
            "probe point ({}, {}, {}) is outside the bed ({} x {} x {})",
            p.x, p.y, p.z, bed.bed_size_x, bed.bed_size_y, bed.bed_size_z
        )));
    }
    if lo < 0.0 || hi > bed_len {
        return Err(ConfigError::Invalid(format!(
            "sweep on {name} spans [{lo}, {hi}] mm, outside the bed [0, {bed_len}]"
        )));
    }
    Ok(())
}

/// Full test program: park, disable shaping, the accelerating sweep, then
/// restore the acceleration limits and wait for the moves to finish.
pub fn resonance_sweep(
    request: &AxisSweepRequest,
    bed: &PrinterConfig,
) -> Result<Vec<String>, AnalysisError> {
    request.validate()?;
    check_bed_bounds(request, bed)?;

    let axis = request.axis;
    let ProbePoint { x, y, .. } = request.probe;
    let moves = SWEEP_CYCLES * SWEEP_STEPS_PER_CYCLE;
    let mut commands = Vec::with_capacity(moves + SWEEP_CYCLES / 4 + 16);

    commands.extend(park_commands(&request.probe));
    commands.push("M117 Starting resonance test".to_string());
    commands.push("M117 Accelerometer|ON".to_string());
    commands.push("M593 F0".to_string());
    commands.push(format!("M117 Resonance Test on {axis}-Axis"));

    let mut current_accel = request.accel_min as i64;
    commands.push(format!("M204 S{current_accel}"));

    for i in 0..SWEEP_CYCLES {
        let amplitude = linspace_at(SWEEP_START_AMPLITUDE_MM, SWEEP_END_AMPLITUDE_MM, SWEEP_CYCLES, i);
        let accel_f = linspace_at(request.accel_min, request.accel_max, SWEEP_CYCLES, i);
        let accel = accel_f as i64;
        let feed = (SWEEP_FEED_PER_ACCEL * accel_f).clamp(SWEEP_FEED_MIN, SWEEP_FEED_MAX) as i64;

        if (accel - current_accel).abs() > SWEEP_ACCEL_REISSUE_THRESHOLD {
            commands.push(format!("M204 S{accel}"));
            current_accel = accel;
        }

        for j in 0..SWEEP_STEPS_PER_CYCLE {
            let phase = 2.0 * PI * j as f64 / SWEEP_STEPS_PER_CYCLE as f64;
            let offset = amplitude * phase.sin();
            let line = match axis {
                TestAxis::X => format!("G0 X{:.3} Y{:.3} F{}", x + offset, y, feed),
                TestAxis::Y => format!("G0 X{:.3} Y{:.3} F{}", x, y + offset, feed),
            };
            commands.push(line);
        }
    }

    commands.push("M117 Resonance Test complete".to_string());
    commands.push("M204 P1500 R500 T1500".to_string());
    commands.push("M400".to_string());

    debug!(lines = commands.len(), "Sweep program generated");
    info!(
        %axis,
        accel_min = request.accel_min,
        accel_max = request.accel_max,
        cycles = SWEEP_CYCLES,
        "Resonance sweep ready"
    );
    Ok(commands)
}

/// Chirp from `freq_start_hz` to `freq_end_hz` around the probe point on the
/// tested axis, framed by `Testing Sweep` / `Finish Test Sweep` messages.
/// Single-axis moves at a fixed feed derived from `accel_max`; no parking and
/// no accelerometer markers.
pub fn test_sweep(
    request: &AxisSweepRequest,
    bed: &PrinterConfig,
) -> Result<Vec<String>, AnalysisError> {
    request.validate()?;
    check_envelope(request, TEST_SWEEP_AMPLITUDE_MM, bed)?;

    let axis = request.axis;
    let center = match axis {
        TestAxis::X => request.probe.x,
        TestAxis::Y => request.probe.y,
    };
    let feed = (TEST_SWEEP_FEED_PER_ACCEL * request.accel_max) as i64;
    let span = request.freq_end_hz - request.freq_start_hz;

    let mut commands = Vec::with_capacity(TEST_SWEEP_POINTS + 2);
    commands.push(format!("M117 Testing Sweep on {axis}-Axis"));
    for i in 0..TEST_SWEEP_POINTS {
        let t = linspace_at(0.0, TEST_SWEEP_DURATION_S, TEST_SWEEP_POINTS, i);
        let freq = request.freq_start_hz + span * t / TEST_SWEEP_DURATION_S;
        let pos = center + TEST_SWEEP_AMPLITUDE_MM * (2.0 * PI * freq * t).sin();
        commands.push(format!("G0 {axis}{pos:.3} F{feed}"));
    }
    commands.push(format!("M117 Finish Test Sweep on {axis}-Axis"));

    info!(
        %axis,
        freq_start_hz = request.freq_start_hz,
        freq_end_hz = request.freq_end_hz,
        points = TEST_SWEEP_POINTS,
        "Test sweep ready"
    );
    Ok(commands)
}


// src/sweep.rs
