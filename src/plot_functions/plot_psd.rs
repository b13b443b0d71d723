// src/plot_functions/plot_psd.rs

use std::error::Error;
use std::path::Path;

use crate::axis_names::TestAxis;
use crate::constants::{
    COLOR_PSD_ORIGINAL, COLOR_SHAPERS, LINE_WIDTH_EMPHASIS, LINE_WIDTH_PLOT,
    PSD_PLOT_HEADROOM_FACTOR,
};
use crate::data_analysis::ranking::RankedRecommendation;
use crate::data_analysis::shaper_evaluation::{shaped_psd, ShaperTable};
use crate::data_analysis::spectral_analysis::PsdCurve;
use crate::plot_framework::{render_chart, PlotConfig, PlotSeries};

/// Legend text of one shaper trace.
pub fn shaper_label(table: &ShaperTable, index: usize, is_best: bool) -> String {
    let r = &table[index];
    format!(
        "{}{} ({:.1} Hz)  vibr={:.2e}  accel={:.0}",
        if is_best { "* " } else { "" },
        r.shaper_type,
        r.center_freq_hz,
        r.residual_vibration,
        r.achievable_accel
    )
}

/// Original PSD with every shaper's `PSD·|H|²` overlaid, plus the
/// recommendation under the chart.
pub fn plot_psd(
    psd: &PsdCurve,
    table: &ShaperTable,
    recommendation: &RankedRecommendation,
    axis: TestAxis,
    x_max_hz: f64,
    output_path: &Path,
) -> Result<(), Box<dyn Error>> {
    let shown = psd.restricted(x_max_hz);
    let y_max = shown
        .peak()
        .map(|(_, d)| d)
        .filter(|d| *d > 0.0)
        .unwrap_or(1.0)
        * PSD_PLOT_HEADROOM_FACTOR;

    let mut series = vec![PlotSeries {
        data: shown.as_pairs(),
        label: "Original".to_string(),
        color: COLOR_PSD_ORIGINAL,
        stroke_width: LINE_WIDTH_EMPHASIS,
    }];
    for (i, result) in table.iter().enumerate() {
        let is_best = result.shaper_type == recommendation.best.shaper_type;
        series.push(PlotSeries {
            data: shaped_psd(&shown, &result.candidate(recommendation.damping_ratio)),
            label: shaper_label(table, i, is_best),
            color: COLOR_SHAPERS[i % COLOR_SHAPERS.len()],
            stroke_width: if is_best { LINE_WIDTH_EMPHASIS } else { LINE_WIDTH_PLOT },
        });
    }

    let best = &recommendation.best;
    let config = PlotConfig {
        title: format!("PSD with Input Shapers - Axis {axis}"),
        x_range: 0.0..shown.frequencies_hz.last().copied().unwrap_or(x_max_hz).max(1.0),
        y_range: 0.0..y_max,
        series,
        x_label: "Frequency (Hz)".to_string(),
        y_label: "Power Spectral Density".to_string(),
        footer: Some(format!(
            "Recommended: {} ({:.2} Hz, accel {:.0})\nCommand: {}",
            best.shaper_type, best.center_freq_hz, best.achievable_accel, recommendation.command
        )),
    };
    render_chart(output_path, &config)
}
