// src/data_input/mod.rs

pub mod capture_parser;
pub mod sample_data;
pub mod shaper_echo;
pub mod sweep_request;

// src/data_input/mod.rs
