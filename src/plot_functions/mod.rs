// src/plot_functions/mod.rs

pub mod plot_psd;
pub mod plot_signal;

// src/plot_functions/mod.rs
