// src/plot_framework.rs

use plotters::backend::BitMapBackend;
use plotters::chart::{ChartBuilder, SeriesLabelPosition};
use plotters::drawing::{DrawingArea, IntoDrawingArea};
use plotters::element::{PathElement, Text};
use plotters::series::LineSeries;
use plotters::style::colors::{BLACK, RED, WHITE};
use plotters::style::{Color, IntoFont, RGBColor};

use std::error::Error;
use std::ops::Range;
use std::path::Path;

use crate::constants::{FONT_SIZE_MESSAGE, LINE_WIDTH_LEGEND, PLOT_HEIGHT, PLOT_WIDTH};
use crate::font_config::{
    ensure_font_registered, FONT_TUPLE_AXIS_LABEL, FONT_TUPLE_CHART_TITLE, FONT_TUPLE_LEGEND,
    FONT_TUPLE_MESSAGE,
};

/// Calculate plot range with padding.
/// Adds 15% padding, or a fixed padding for very small ranges.
pub fn calculate_range(min_val: f64, max_val: f64) -> (f64, f64) {
    let (min, max) = if min_val <= max_val {
        (min_val, max_val)
    } else {
        (max_val, min_val)
    };
    let range = (max - min).abs();
    let padding = if range < 1e-6 { 0.5 } else { range * 0.15 };
    (min - padding, max + padding)
}

/// Y-axis tick label.
///
/// Large values use "k"/"M" notation, tiny non-zero values (PSD densities)
/// use scientific notation, small fractional values keep one decimal, and
/// dB axes are always integers.
pub fn format_axis_value(y: f64, y_label: &str) -> String {
    if y_label.contains("dB") {
        return format!("{:.0}", y);
    }
    if y.abs() >= 1_000_000.0 {
        format!("{:.1}M", y / 1_000_000.0)
    } else if y.abs() >= 1000.0 {
        format!("{:.0}k", y / 1000.0)
    } else if y != 0.0 && y.abs() < 0.1 {
        format!("{:.1e}", y)
    } else if y.abs() < 10.0 && (y.fract() != 0.0 || y_label.contains("Acceleration")) {
        format!("{:.1}", y)
    } else {
        format!("{:.0}", y)
    }
}

/// Draw a "Data Unavailable" message on a plot area.
pub fn draw_unavailable_message(
    area: &DrawingArea<BitMapBackend, plotters::coord::Shift>,
    plot_type: &str,
    reason: &str,
) -> Result<(), Box<dyn Error>> {
    const CHAR_WIDTH_RATIO: f32 = 0.6; // Approximate character width relative to font size

    let (x_range, y_range) = area.get_pixel_range();
    let (width, height) = (x_range.end - x_range.start, y_range.end - y_range.start);
    let message = format!("{plot_type} Data Unavailable: {reason}");

    let estimated_char_width = (FONT_SIZE_MESSAGE as f32 * CHAR_WIDTH_RATIO) as i32;
    let estimated_text_width = message.len() as i32 * estimated_char_width;
    let center_x = width / 2 - estimated_text_width / 2;
    let center_y = height / 2 - FONT_SIZE_MESSAGE / 2;

    let text_style = FONT_TUPLE_MESSAGE.into_font().color(&RED);
    area.draw(&Text::new(message, (center_x.max(0), center_y), text_style))?;
    Ok(())
}

#[derive(Clone)]
pub struct PlotSeries {
    pub data: Vec<(f64, f64)>,
    pub label: String,
    pub color: RGBColor,
    pub stroke_width: u32,
}

#[derive(Clone)]
pub struct PlotConfig {
    pub title: String,
    pub x_range: Range<f64>,
    pub y_range: Range<f64>,
    pub series: Vec<PlotSeries>,
    pub x_label: String,
    pub y_label: String,
    /// Text block drawn under the chart (e.g. the recommended command).
    pub footer: Option<String>,
}

/// Draws a single chart using a PlotConfig struct.
fn draw_chart_with_config(
    area: &DrawingArea<BitMapBackend, plotters::coord::Shift>,
    plot_config: &PlotConfig,
) -> Result<(), Box<dyn Error>> {
    let mut chart = ChartBuilder::on(area)
        .caption(&plot_config.title, FONT_TUPLE_CHART_TITLE)
        .margin(10)
        .x_label_area_size(50)
        .y_label_area_size(80)
        .build_cartesian_2d(plot_config.x_range.clone(), plot_config.y_range.clone())?;

    let y_label = plot_config.y_label.clone();
    chart
        .configure_mesh()
        .x_desc(&plot_config.x_label)
        .y_desc(&plot_config.y_label)
        .x_labels(20)
        .y_labels(10)
        .y_label_formatter(&|y| format_axis_value(*y, &y_label))
        .light_line_style(WHITE.mix(0.7))
        .label_style(FONT_TUPLE_AXIS_LABEL)
        .draw()?;

    let mut legend_series_count = 0;
    for s in &plot_config.series {
        if s.data.is_empty() {
            continue;
        }
        let series = chart.draw_series(LineSeries::new(
            s.data.iter().cloned(),
            s.color.stroke_width(s.stroke_width),
        ))?;
        if !s.label.is_empty() {
            let color = s.color;
            series.label(&s.label).legend(move |(x, y)| {
                PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(LINE_WIDTH_LEGEND))
            });
            legend_series_count += 1;
        }
    }

    if legend_series_count > 0 {
        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperRight)
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .label_font(FONT_TUPLE_LEGEND)
            .draw()?;
    }
    Ok(())
}

/// Renders `plot_config` into a PNG at `output_path`.
pub fn render_chart(output_path: &Path, plot_config: &PlotConfig) -> Result<(), Box<dyn Error>> {
    if !ensure_font_registered() {
        return Err("no usable font for plot text".into());
    }
    let root = BitMapBackend::new(output_path, (PLOT_WIDTH, PLOT_HEIGHT)).into_drawing_area();
    root.fill(&WHITE)?;

    let chart_area = match &plot_config.footer {
        Some(footer) => {
            let footer_height = 40 + 24 * footer.lines().count() as i32;
            let (upper, lower) = root.split_vertically((PLOT_HEIGHT as i32 - footer_height).max(0));
            for (i, line) in footer.lines().enumerate() {
                lower.draw(&Text::new(
                    line.to_string(),
                    (40, 10 + 24 * i as i32),
                    FONT_TUPLE_LEGEND.into_font().color(&BLACK),
                ))?;
            }
            upper
        }
        None => root.clone(),
    };

    if plot_config.series.iter().all(|s| s.data.is_empty()) {
        draw_unavailable_message(&chart_area, &plot_config.title, "no data")?;
    } else {
        draw_chart_with_config(&chart_area, plot_config)?;
    }
    root.present()?;
    Ok(())
}
