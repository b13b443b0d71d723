// src/pipeline.rs

//! One resonance analysis run, start to finish.
//!
//! Stages: conditioning → Welch PSD → (optional damping estimate) →
//! shaper evaluation → ranking → artifacts. A [`CancellationToken`] is
//! checked between stages. [`DeviceSession`] allows a single run in flight
//! per device and turns the outcome into an [`AnalysisResponse`].

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::artifacts::{build_plot_data, ArtifactInputs, ArtifactPaths, ArtifactStage, PlotData};
use crate::axis_names::TestAxis;
use crate::config::AnalyzerConfig;
use crate::data_analysis::damping_estimation::estimate_damping_ratio;
use crate::data_analysis::ranking::{rank, RankedRecommendation};
use crate::data_analysis::shaper_evaluation::{evaluate_shapers, EvaluationSettings, ShaperTable};
use crate::data_analysis::signal_conditioning::{condition_signal, ConditioningConfig};
use crate::data_analysis::spectral_analysis::{welch_psd, PsdCurve, WelchConfig};
use crate::data_input::capture_parser::parse_capture_file;
use crate::data_input::sample_data::SampleSeries;
use crate::data_input::sweep_request::AxisSweepRequest;
use crate::error::{AnalysisError, ConfigError};

/// Non-fatal conditions attached to a successful run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunFlag {
    /// Timestamps were too irregular and the series was resampled.
    Resampled,
    /// The Welch segment was shortened to the signal length.
    DegradedResolution,
    /// At least one artifact is missing from the result.
    ArtifactWriteFailure,
}

impl RunFlag {
    /// Short note appended to the response summary.
    pub fn describe(self) -> &'static str {
        match self {
            RunFlag::Resampled => "resampled",
            RunFlag::DegradedResolution => "degraded resolution",
            RunFlag::ArtifactWriteFailure => "artifacts unavailable",
        }
    }
}

/// Cooperative cancellation shared between the caller and a running analysis.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn check(&self, stage: &'static str) -> Result<(), AnalysisError> {
        if self.is_cancelled() {
            info!(stage, "Analysis cancelled");
            return Err(AnalysisError::Cancelled);
        }
        Ok(())
    }
}

/// Everything a completed run produced.
#[derive(Debug, Clone)]
pub struct AnalysisOutcome {
    pub recommendation: RankedRecommendation,
    pub table: ShaperTable,
    pub psd: PsdCurve,
    pub flags: Vec<RunFlag>,
    pub artifacts: ArtifactPaths,
    pub plot_data: PlotData,
}

/// Runs the full analysis for one axis on an already acquired series.
pub fn analyze(
    series: &SampleSeries,
    request: &AxisSweepRequest,
    config: &AnalyzerConfig,
    cancel: &CancellationToken,
) -> Result<AnalysisOutcome, AnalysisError> {
    config.validate()?;
    request.validate()?;
    let axis = request.axis;
    let mut flags = Vec::new();
    info!(
        %axis,
        samples = series.len(),
        sensor = request.sensor_type.as_str(),
        nominal_rate_hz = request.sensor_type.capture_rate_hz(config.test.capture_rate_hz),
        "Starting resonance analysis"
    );

    cancel.check("conditioning")?;
    let signal = condition_signal(
        series,
        axis,
        &ConditioningConfig {
            jitter_tolerance: config.analysis.resample_jitter_tolerance,
            lowpass_order: config.analysis.lowpass_order,
            cutoff_hz: request.freq_end_hz,
        },
    )?;
    if signal.resampled {
        flags.push(RunFlag::Resampled);
    }

    cancel.check("spectral estimation")?;
    let estimate = welch_psd(
        &signal.conditioned.to_vec(),
        signal.sample_rate_hz,
        &WelchConfig {
            segment_length: config.analysis.segment_length,
            overlap_fraction: config.analysis.overlap,
        },
    )?;
    if estimate.degraded_resolution {
        flags.push(RunFlag::DegradedResolution);
    }
    let psd = estimate.psd;

    let damping_ratio = if config.analysis.estimate_damping {
        match estimate_damping_ratio(&psd, request.freq_start_hz, request.freq_end_hz) {
            Some(zeta) => {
                info!(damping_ratio = zeta, "Using estimated damping ratio");
                zeta
            }
            None => {
                warn!(
                    fallback = request.damping_ratio,
                    "Damping could not be estimated, using configured value"
                );
                request.damping_ratio
            }
        }
    } else {
        request.damping_ratio
    };

    cancel.check("shaper evaluation")?;
    let table = evaluate_shapers(
        &psd,
        &EvaluationSettings {
            freq_start_hz: request.freq_start_hz,
            freq_end_hz: request.freq_end_hz,
            scan_step_hz: config.analysis.scan_step_hz,
            damping_ratio,
            accel_min: request.accel_min,
            accel_max: request.accel_max,
        },
    )?;

    cancel.check("ranking")?;
    let recommendation = rank(&table, axis, damping_ratio, config.analysis.ranking_epsilon);

    let inputs = ArtifactInputs {
        axis,
        signal: &signal,
        psd: &psd,
        table: &table,
        recommendation: &recommendation,
        freq_end_hz: request.freq_end_hz,
    };
    let plot_data = build_plot_data(&inputs);

    let artifacts = if config.output.write_artifacts {
        cancel.check("artifacts")?;
        match ArtifactStage::new(&config.output.output_dir, axis) {
            Ok(mut stage) => {
                stage.render(&inputs);
                // Dropping the stage on cancellation discards the staged files.
                cancel.check("publish")?;
                let published = stage.publish();
                if published.write_failed {
                    flags.push(RunFlag::ArtifactWriteFailure);
                }
                published.paths
            }
            Err(e) => {
                warn!(error = %e, "Artifact directory unavailable");
                flags.push(RunFlag::ArtifactWriteFailure);
                ArtifactPaths::default()
            }
        }
    } else {
        debug!("Artifact output disabled");
        ArtifactPaths::default()
    };

    info!(
        %axis,
        shaper = %recommendation.best.shaper_type,
        base_freq_hz = recommendation.best.center_freq_hz,
        flags = flags.len(),
        "Resonance analysis complete"
    );
    Ok(AnalysisOutcome {
        recommendation,
        table,
        psd,
        flags,
        artifacts,
        plot_data,
    })
}

/// One row of the shaper comparison table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShaperRow {
    pub name: String,
    pub residual_vibration: f64,
    pub base_freq_hz: f64,
    pub achievable_accel: f64,
    pub is_best: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecommendationRecord {
    pub axis: TestAxis,
    pub shaper: String,
    pub base_freq_hz: f64,
    pub damping_ratio: f64,
    pub command: String,
    pub shapers: Vec<ShaperRow>,
    pub flags: Vec<RunFlag>,
    pub artifacts: ArtifactPaths,
    pub plot_data: PlotData,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailureRecord {
    pub kind: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponseBody {
    Recommendation(RecommendationRecord),
    Failure(FailureRecord),
}

/// What the caller of a test receives.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisResponse {
    pub success: bool,
    pub summary: String,
    pub body: ResponseBody,
}

impl AnalysisResponse {
    pub fn from_outcome(outcome: AnalysisOutcome) -> Self {
        let rec = outcome.recommendation;
        let shapers = outcome
            .table
            .iter()
            .map(|r| ShaperRow {
                name: r.shaper_type.name().to_string(),
                residual_vibration: r.residual_vibration,
                base_freq_hz: r.center_freq_hz,
                achievable_accel: r.achievable_accel,
                is_best: r.shaper_type == rec.best.shaper_type,
            })
            .collect();
        let mut summary = format!(
            "Axis {}: {} at {:.2} Hz (max accel {:.0})",
            rec.axis, rec.best.shaper_type, rec.best.center_freq_hz, rec.best.achievable_accel
        );
        for flag in &outcome.flags {
            summary.push_str("; ");
            summary.push_str(flag.describe());
        }
        Self {
            success: true,
            summary,
            body: ResponseBody::Recommendation(RecommendationRecord {
                axis: rec.axis,
                shaper: rec.best.shaper_type.name().to_string(),
                base_freq_hz: rec.best.center_freq_hz,
                damping_ratio: rec.damping_ratio,
                command: rec.command,
                shapers,
                flags: outcome.flags,
                artifacts: outcome.artifacts,
                plot_data: outcome.plot_data,
            }),
        }
    }

    pub fn from_error(err: &AnalysisError) -> Self {
        Self {
            success: false,
            summary: err.to_string(),
            body: ResponseBody::Failure(FailureRecord {
                kind: err.kind().to_string(),
                message: err.to_string(),
            }),
        }
    }

    pub fn from_result(result: Result<AnalysisOutcome, AnalysisError>) -> Self {
        match result {
            Ok(outcome) => Self::from_outcome(outcome),
            Err(e) => Self::from_error(&e),
        }
    }

    pub fn recommendation(&self) -> Option<&RecommendationRecord> {
        match &self.body {
            ResponseBody::Recommendation(r) => Some(r),
            ResponseBody::Failure(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&FailureRecord> {
        match &self.body {
            ResponseBody::Failure(f) => Some(f),
            ResponseBody::Recommendation(_) => None,
        }
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Marks a device busy for as long as it lives.
pub struct InFlightGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

/// Analysis entry point for one printer. Holds the validated configuration.
#[derive(Debug)]
pub struct DeviceSession {
    config: AnalyzerConfig,
    in_flight: AtomicBool,
}

impl DeviceSession {
    pub fn new(config: AnalyzerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            in_flight: AtomicBool::new(false),
        })
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Claims the device; fails with `TestInProgress` while another claim is alive.
    pub fn begin(&self) -> Result<InFlightGuard<'_>, AnalysisError> {
        self.in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map_err(|_| AnalysisError::TestInProgress)?;
        Ok(InFlightGuard {
            flag: &self.in_flight,
        })
    }

    /// Analyzes an acquired series.
    pub fn run(
        &self,
        series: &SampleSeries,
        request: &AxisSweepRequest,
        cancel: &CancellationToken,
    ) -> AnalysisResponse {
        let result = self
            .begin()
            .and_then(|_guard| analyze(series, request, &self.config, cancel));
        Self::respond(result)
    }

    /// Reads a capture file and analyzes it.
    pub fn run_capture_file(
        &self,
        capture: &Path,
        request: &AxisSweepRequest,
        cancel: &CancellationToken,
    ) -> AnalysisResponse {
        let result = self.begin().and_then(|_guard| {
            let series = parse_capture_file(capture)?;
            analyze(&series, request, &self.config, cancel)
        });
        Self::respond(result)
    }

    fn respond(result: Result<AnalysisOutcome, AnalysisError>) -> AnalysisResponse {
        if let Err(e) = &result {
            error!(kind = e.kind(), error = %e, "Resonance analysis failed");
        }
        AnalysisResponse::from_result(result)
    }
}


// src/pipeline.rs
