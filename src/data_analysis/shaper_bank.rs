// src/data_analysis/shaper_bank.rs

//! Closed-form input shapers.
//!
//! Every shaper in the catalog is an n-fold self-convolution of the
//! two-impulse zero-vibration (ZV) shaper, with `K = exp(-ζπ/√(1-ζ²))` and
//! impulses spaced half a period of the center frequency apart. That places
//! the notch of `|H(f)|` exactly at the center frequency; higher orders widen
//! and deepen it at the cost of a longer shaper and lower usable acceleration.

use std::f64::consts::PI;
use std::fmt;

use num_complex::Complex64;
use serde::{Deserialize, Serialize};

/// The fixed catalog of shaper families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShaperType {
    #[serde(rename = "ZV")]
    Zv,
    #[serde(rename = "MZV")]
    Mzv,
    #[serde(rename = "EI")]
    Ei,
    #[serde(rename = "2HUMP_EI")]
    TwoHumpEi,
    #[serde(rename = "3HUMP_EI")]
    ThreeHumpEi,
}

pub const SHAPER_COUNT: usize = 5;

impl ShaperType {
    pub const ALL: [ShaperType; SHAPER_COUNT] = [
        ShaperType::Zv,
        ShaperType::Mzv,
        ShaperType::Ei,
        ShaperType::TwoHumpEi,
        ShaperType::ThreeHumpEi,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ShaperType::Zv => "ZV",
            ShaperType::Mzv => "MZV",
            ShaperType::Ei => "EI",
            ShaperType::TwoHumpEi => "2HUMP_EI",
            ShaperType::ThreeHumpEi => "3HUMP_EI",
        }
    }

    /// Position in [`ShaperType::ALL`].
    pub fn index(self) -> usize {
        match self {
            ShaperType::Zv => 0,
            ShaperType::Mzv => 1,
            ShaperType::Ei => 2,
            ShaperType::TwoHumpEi => 3,
            ShaperType::ThreeHumpEi => 4,
        }
    }

    /// How many times the ZV shaper is convolved with itself.
    fn zv_order(self) -> usize {
        match self {
            ShaperType::Zv => 1,
            ShaperType::Mzv => 2,
            ShaperType::Ei => 3,
            ShaperType::TwoHumpEi => 4,
            ShaperType::ThreeHumpEi => 6,
        }
    }

    pub fn impulse_count(self) -> usize {
        self.zv_order() + 1
    }

    /// Fraction of the configured maximum acceleration usable with this shaper.
    pub fn max_accel_factor(self) -> f64 {
        match self {
            ShaperType::Zv => 1.00,
            ShaperType::Mzv => 0.85,
            ShaperType::Ei => 0.70,
            ShaperType::TwoHumpEi => 0.55,
            ShaperType::ThreeHumpEi => 0.40,
        }
    }
}

impl fmt::Display for ShaperType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Impulse {
    pub amplitude: f64,
    pub time_s: f64,
}

/// A concrete shaper: type, tuning and its impulse table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShaperCandidate {
    pub shaper_type: ShaperType,
    pub center_freq_hz: f64,
    pub damping_ratio: f64,
    pub impulses: Vec<Impulse>,
    pub max_accel_factor: f64,
}

impl ShaperCandidate {
    /// Builds the impulse table. `center_freq_hz` must be positive and
    /// `damping_ratio` in [0, 1).
    pub fn new(shaper_type: ShaperType, center_freq_hz: f64, damping_ratio: f64) -> Self {
        let k = (-damping_ratio * PI / (1.0 - damping_ratio * damping_ratio).sqrt()).exp();
        let spacing = 0.5 / center_freq_hz;
        let n = shaper_type.zv_order();

        let mut coefficient = 1.0;
        let mut raw = Vec::with_capacity(n + 1);
        for i in 0..=n {
            if i > 0 {
                coefficient = coefficient * (n + 1 - i) as f64 / i as f64;
            }
            raw.push(coefficient * k.powi(i as i32));
        }
        let total: f64 = raw.iter().sum();
        let impulses = raw
            .into_iter()
            .enumerate()
            .map(|(i, a)| Impulse {
                amplitude: a / total,
                time_s: i as f64 * spacing,
            })
            .collect();

        Self {
            shaper_type,
            center_freq_hz,
            damping_ratio,
            impulses,
            max_accel_factor: shaper_type.max_accel_factor(),
        }
    }

    /// `H(f) = Σ A_i · exp(-i·2π·f·t_i)`.
    pub fn response(&self, freq_hz: f64) -> Complex64 {
        self.impulses
            .iter()
            .map(|imp| Complex64::from_polar(imp.amplitude, -2.0 * PI * freq_hz * imp.time_s))
            .sum()
    }

    pub fn magnitude_squared(&self, freq_hz: f64) -> f64 {
        self.response(freq_hz).norm_sqr()
    }

    /// Time from first to last impulse.
    pub fn duration_s(&self) -> f64 {
        self.impulses.last().map_or(0.0, |imp| imp.time_s)
    }
}
