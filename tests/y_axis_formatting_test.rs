// tests/y_axis_formatting_test.rs

use shaper_tuner::plot_framework::{calculate_range, format_axis_value};

#[test]
fn test_acceleration_y_axis_formatting() {
    // Time-domain plots keep one decimal even on whole numbers below 10.
    let label = "Acceleration";

    assert_eq!(format_axis_value(0.0, label), "0.0");
    assert_eq!(format_axis_value(0.2, label), "0.2");
    assert_eq!(format_axis_value(1.0, label), "1.0");
    assert_eq!(format_axis_value(-2.5, label), "-2.5");
    assert_eq!(format_axis_value(10.0, label), "10");
    assert_eq!(format_axis_value(1000.0, label), "1k");
    assert_eq!(format_axis_value(-5000.0, label), "-5k");
}

#[test]
fn test_psd_y_axis_formatting() {
    let label = "Power Spectral Density";

    assert_eq!(format_axis_value(0.0, label), "0");
    assert_eq!(format_axis_value(1e-5, label), "1.0e-5");
    assert_eq!(format_axis_value(0.05, label), "5.0e-2");
    assert_eq!(format_axis_value(5.7, label), "5.7");
    assert_eq!(format_axis_value(10.0, label), "10");
    assert_eq!(format_axis_value(100.0, label), "100");
    assert_eq!(format_axis_value(12500.0, label), "12k");
    assert_eq!(format_axis_value(1_000_000.0, label), "1.0M");
    assert_eq!(format_axis_value(2_500_000.0, label), "2.5M");
}

#[test]
fn test_db_y_axis_formatting() {
    let label = "Power (dB)";

    assert_eq!(format_axis_value(-30.5, label), "-30");
    assert_eq!(format_axis_value(10.7, label), "11");
    assert_eq!(format_axis_value(0.001, label), "0");
}

#[test]
fn test_calculate_range_padding() {
    let (lo, hi) = calculate_range(0.0, 10.0);
    assert!((lo + 1.5).abs() < 1e-12);
    assert!((hi - 11.5).abs() < 1e-12);

    // Flat data gets a fixed margin, inverted input is reordered.
    assert_eq!(calculate_range(3.0, 3.0), (2.5, 3.5));
    let (lo, hi) = calculate_range(10.0, 0.0);
    assert!(lo < 0.0 && hi > 10.0);
}

// tests/y_axis_formatting_test.rs
