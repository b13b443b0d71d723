// src/error.rs

use std::path::PathBuf;

use thiserror::Error;

/// Fatal conditions that abort a resonance analysis run.
///
/// Non-fatal conditions (reduced Welch resolution, artifact write failures)
/// are reported as [`crate::pipeline::RunFlag`]s on an otherwise complete result.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("insufficient data: {available} samples available, at least {required} required")]
    InsufficientData { available: usize, required: usize },

    #[error("acquisition failure: {0}")]
    AcquisitionFailure(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(#[from] ConfigError),

    #[error("a resonance test is already in progress on this device")]
    TestInProgress,

    #[error("analysis cancelled")]
    Cancelled,
}

impl AnalysisError {
    /// Stable identifier used in serialized failure records.
    pub fn kind(&self) -> &'static str {
        match self {
            AnalysisError::InsufficientData { .. } => "insufficient_data",
            AnalysisError::AcquisitionFailure(_) => "acquisition_failure",
            AnalysisError::InvalidConfig(_) => "invalid_config",
            AnalysisError::TestInProgress => "test_in_progress",
            AnalysisError::Cancelled => "cancelled",
        }
    }
}

impl From<csv::Error> for AnalysisError {
    fn from(err: csv::Error) -> Self {
        AnalysisError::AcquisitionFailure(err.to_string())
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("{0}")]
    Invalid(String),
}

/// Failure to persist one diagnostic artifact. Never fatal for a run.
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("IO error writing {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("CSV error writing {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("plot rendering failed for {path}: {reason}")]
    Plot { path: PathBuf, reason: String },
}
