// src/plot_functions/plot_signal.rs

use std::error::Error;
use std::path::Path;

use ndarray_stats::QuantileExt;

use crate::axis_names::TestAxis;
use crate::constants::{
    COLOR_SIGNAL_CONDITIONED, COLOR_SIGNAL_RAW, LINE_WIDTH_EMPHASIS, LINE_WIDTH_PLOT,
    SIGNAL_PLOT_DECIMATION,
};
use crate::data_analysis::signal_conditioning::ConditionedSignal;
use crate::plot_framework::{calculate_range, render_chart, PlotConfig, PlotSeries};

/// Raw vs conditioned acceleration of the tested axis over time.
pub fn plot_signal(
    signal: &ConditionedSignal,
    axis: TestAxis,
    output_path: &Path,
) -> Result<(), Box<dyn Error>> {
    let decimated = |values: &ndarray::Array1<f64>| -> Vec<(f64, f64)> {
        signal
            .time_s
            .iter()
            .zip(values.iter())
            .step_by(SIGNAL_PLOT_DECIMATION)
            .map(|(&t, &v)| (t, v))
            .collect()
    };

    // Raw keeps its offset; plot it centered so both traces share the axis.
    let raw_mean = signal.raw.mean().unwrap_or(0.0);
    let raw_centered = signal.raw.mapv(|v| v - raw_mean);

    let y_min = (*raw_centered.min()?).min(*signal.conditioned.min()?);
    let y_max = (*raw_centered.max()?).max(*signal.conditioned.max()?);
    let (y_lo, y_hi) = calculate_range(y_min, y_max);
    let t_start = signal.time_s.first().copied().unwrap_or(0.0);
    let t_end = signal.time_s.last().copied().unwrap_or(1.0);

    let config = PlotConfig {
        title: format!("Signal - Axis {axis}"),
        x_range: t_start..t_end.max(t_start + 1e-3),
        y_range: y_lo..y_hi,
        series: vec![
            PlotSeries {
                data: decimated(&raw_centered),
                label: "Original (mean removed)".to_string(),
                color: COLOR_SIGNAL_RAW,
                stroke_width: LINE_WIDTH_PLOT,
            },
            PlotSeries {
                data: decimated(&signal.conditioned),
                label: format!("Filtered ({:.0} Hz low-pass)", signal.cutoff_hz),
                color: COLOR_SIGNAL_CONDITIONED,
                stroke_width: LINE_WIDTH_EMPHASIS,
            },
        ],
        x_label: "Time (s)".to_string(),
        y_label: "Acceleration".to_string(),
        footer: None,
    };
    render_chart(output_path, &config)
}
