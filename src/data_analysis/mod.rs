// src/data_analysis/mod.rs

pub mod damping_estimation;
pub mod fft_utils;
pub mod ranking;
pub mod shaper_bank;
pub mod shaper_evaluation;
pub mod signal_conditioning;
pub mod spectral_analysis;

// src/data_analysis/mod.rs
