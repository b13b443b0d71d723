// src/artifacts.rs

//! Per-run diagnostic files: signal plot, PSD overlay plot and a CSV dump.
//!
//! Everything is rendered into a hidden staging directory under the output
//! root and only renamed into the root by [`ArtifactStage::publish`]. Dropping
//! a stage without publishing discards whatever was staged.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;
use serde::Serialize;
use tempfile::TempDir;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::axis_names::TestAxis;
use crate::constants::PLOT_DATA_DECIMATION;
use crate::data_analysis::ranking::RankedRecommendation;
use crate::data_analysis::shaper_evaluation::{shaped_psd, ShaperTable};
use crate::data_analysis::signal_conditioning::ConditionedSignal;
use crate::data_analysis::spectral_analysis::PsdCurve;
use crate::error::ArtifactError;
use crate::plot_functions::plot_psd::plot_psd;
use crate::plot_functions::plot_signal::plot_signal;

const STAGING_PREFIX: &str = ".staging-";
const SIGNAL_PLOT_SUFFIX: &str = "signal.png";
const PSD_PLOT_SUFFIX: &str = "psd.png";
const CSV_SUFFIX: &str = "data.csv";

/// Lowest upper bound of the plotted/exported spectrum.
const MIN_PLOT_MAX_HZ: f64 = 200.0;

/// Published artifact locations, relative to the output root. `None` when the
/// file could not be written or artifacts were disabled.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ArtifactPaths {
    pub signal_plot: Option<PathBuf>,
    pub psd_plot: Option<PathBuf>,
    pub csv: Option<PathBuf>,
}

/// Result of publishing a stage.
#[derive(Debug, Clone, Default)]
pub struct PublishedArtifacts {
    pub paths: ArtifactPaths,
    /// At least one artifact failed to render or publish.
    pub write_failed: bool,
}

/// `<AXIS>_<timestamp>_<id>` shared by the files of one run.
pub fn artifact_prefix(axis: TestAxis) -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("{}_{}_{}", axis, Local::now().format("%Y%m%dT%H%M%S"), &id[..8])
}

/// Upper frequency shown in plots and plot data: twice the test range, at
/// least `MIN_PLOT_MAX_HZ`, never past Nyquist.
pub fn plot_max_hz(psd: &PsdCurve, freq_end_hz: f64) -> f64 {
    let nyquist = psd.frequencies_hz.last().copied().unwrap_or(freq_end_hz);
    (2.0 * freq_end_hz).max(MIN_PLOT_MAX_HZ).min(nyquist)
}

/// Everything the renderers need from a finished analysis.
pub struct ArtifactInputs<'a> {
    pub axis: TestAxis,
    pub signal: &'a ConditionedSignal,
    pub psd: &'a PsdCurve,
    pub table: &'a ShaperTable,
    pub recommendation: &'a RankedRecommendation,
    pub freq_end_hz: f64,
}

/// Artifacts of one run, staged but not yet visible in the output root.
pub struct ArtifactStage {
    root: PathBuf,
    staging: TempDir,
    prefix: String,
    staged: Vec<(Slot, PathBuf)>,
    failed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    SignalPlot,
    PsdPlot,
    Csv,
}

impl ArtifactStage {
    /// Creates the output root if needed and a fresh staging directory in it.
    pub fn new(root: &Path, axis: TestAxis) -> Result<Self, ArtifactError> {
        fs::create_dir_all(root).map_err(|source| ArtifactError::Io {
            path: root.to_path_buf(),
            source,
        })?;
        let staging = tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .tempdir_in(root)
            .map_err(|source| ArtifactError::Io {
                path: root.to_path_buf(),
                source,
            })?;
        let prefix = artifact_prefix(axis);
        debug!(staging = %staging.path().display(), %prefix, "Created artifact staging directory");
        Ok(Self {
            root: root.to_path_buf(),
            staging,
            prefix,
            staged: Vec::new(),
            failed: false,
        })
    }

    fn file_name(&self, suffix: &str) -> PathBuf {
        PathBuf::from(format!("{}_{}", self.prefix, suffix))
    }

    fn record(&mut self, slot: Slot, name: PathBuf, outcome: Result<(), ArtifactError>) {
        match outcome {
            Ok(()) => self.staged.push((slot, name)),
            Err(e) => {
                warn!(error = %e, "Artifact not written");
                self.failed = true;
            }
        }
    }

    /// Renders all three artifacts into the staging directory. Individual
    /// failures are recorded and do not stop the others.
    pub fn render(&mut self, inputs: &ArtifactInputs<'_>) {
        let csv_name = self.file_name(CSV_SUFFIX);
        let csv_path = self.staging.path().join(&csv_name);
        let outcome = write_data_csv(&csv_path, inputs.signal, inputs.psd);
        self.record(Slot::Csv, csv_name, outcome);

        let signal_name = self.file_name(SIGNAL_PLOT_SUFFIX);
        let signal_path = self.staging.path().join(&signal_name);
        let outcome = plot_signal(inputs.signal, inputs.axis, &signal_path).map_err(|e| {
            ArtifactError::Plot {
                path: signal_path.clone(),
                reason: e.to_string(),
            }
        });
        self.record(Slot::SignalPlot, signal_name, outcome);

        let psd_name = self.file_name(PSD_PLOT_SUFFIX);
        let psd_path = self.staging.path().join(&psd_name);
        let outcome = plot_psd(
            inputs.psd,
            inputs.table,
            inputs.recommendation,
            inputs.axis,
            plot_max_hz(inputs.psd, inputs.freq_end_hz),
            &psd_path,
        )
        .map_err(|e| ArtifactError::Plot {
            path: psd_path.clone(),
            reason: e.to_string(),
        });
        self.record(Slot::PsdPlot, psd_name, outcome);
    }

    /// Moves the staged files into the output root and removes the staging directory.
    pub fn publish(self) -> PublishedArtifacts {
        let mut published = PublishedArtifacts {
            paths: ArtifactPaths::default(),
            write_failed: self.failed,
        };
        for (slot, name) in &self.staged {
            let from = self.staging.path().join(name);
            let to = self.root.join(name);
            if let Err(source) = fs::rename(&from, &to) {
                let err = ArtifactError::Io { path: to, source };
                warn!(error = %err, "Artifact not published");
                published.write_failed = true;
                continue;
            }
            let target = match slot {
                Slot::SignalPlot => &mut published.paths.signal_plot,
                Slot::PsdPlot => &mut published.paths.psd_plot,
                Slot::Csv => &mut published.paths.csv,
            };
            *target = Some(name.clone());
        }
        info!(
            root = %self.root.display(),
            published = self.staged.len(),
            write_failed = published.write_failed,
            "Artifacts published"
        );
        published
    }
}

/// CSV with columns `time_s,raw,conditioned,frequency_hz,psd`. The time and
/// spectrum columns have different lengths; the shorter side is left empty.
pub fn write_data_csv(
    path: &Path,
    signal: &ConditionedSignal,
    psd: &PsdCurve,
) -> Result<(), ArtifactError> {
    let csv_err = |source: csv::Error| ArtifactError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut writer = csv::Writer::from_path(path).map_err(csv_err)?;
    writer
        .write_record(["time_s", "raw", "conditioned", "frequency_hz", "psd"])
        .map_err(csv_err)?;

    let rows = signal.len().max(psd.len());
    for i in 0..rows {
        let cell = |v: Option<&f64>| v.map(|x| x.to_string()).unwrap_or_default();
        writer
            .write_record([
                cell(signal.time_s.get(i)),
                cell(signal.raw.get(i)),
                cell(signal.conditioned.get(i)),
                cell(psd.frequencies_hz.get(i)),
                cell(psd.density.get(i)),
            ])
            .map_err(csv_err)?;
    }
    writer.flush().map_err(|source| ArtifactError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(())
}

/// One shaper's curve as drawn in the PSD overlay.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShaperCurve {
    pub name: String,
    pub center_freq_hz: f64,
    pub residual_vibration: f64,
    pub achievable_accel: f64,
    /// `PSD·|H|²` on the frequencies of [`PlotData::psd_frequencies_hz`].
    pub shaped_density: Vec<f64>,
}

/// Plot-ready data for a UI layer that draws its own charts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlotData {
    pub time_s: Vec<f64>,
    pub raw: Vec<f64>,
    pub conditioned: Vec<f64>,
    pub psd_frequencies_hz: Vec<f64>,
    pub psd_density: Vec<f64>,
    pub shapers: Vec<ShaperCurve>,
    pub base_freq_hz: f64,
    pub best_shaper: String,
}

pub fn build_plot_data(inputs: &ArtifactInputs<'_>) -> PlotData {
    let every = |values: &ndarray::Array1<f64>| -> Vec<f64> {
        values.iter().step_by(PLOT_DATA_DECIMATION).copied().collect()
    };
    let shown = inputs.psd.restricted(plot_max_hz(inputs.psd, inputs.freq_end_hz));
    let damping = inputs.recommendation.damping_ratio;

    let shapers = inputs
        .table
        .iter()
        .map(|r| ShaperCurve {
            name: r.shaper_type.name().to_string(),
            center_freq_hz: r.center_freq_hz,
            residual_vibration: r.residual_vibration,
            achievable_accel: r.achievable_accel,
            shaped_density: shaped_psd(&shown, &r.candidate(damping))
                .into_iter()
                .map(|(_, d)| d)
                .collect(),
        })
        .collect();

    PlotData {
        time_s: every(&inputs.signal.time_s),
        raw: every(&inputs.signal.raw),
        conditioned: every(&inputs.signal.conditioned),
        psd_frequencies_hz: shown.frequencies_hz,
        psd_density: shown.density,
        shapers,
        base_freq_hz: inputs.recommendation.best.center_freq_hz,
        best_shaper: inputs.recommendation.best.shaper_type.name().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_analysis::ranking::rank;
    use crate::data_analysis::shaper_evaluation::{evaluate_shapers, EvaluationSettings};
    use ndarray::Array1;

    fn fixture() -> (ConditionedSignal, PsdCurve) {
        let n = 100;
        let fs = 100.0;
        let time_s = Array1::from_iter((0..n).map(|i| i as f64 / fs));
        let raw = time_s.mapv(|t| (2.0 * std::f64::consts::PI * 10.0 * t).sin() + 1.0);
        let conditioned = raw.mapv(|v| v - 1.0);
        let signal = ConditionedSignal {
            time_s,
            raw,
            conditioned,
            sample_rate_hz: fs,
            resampled: false,
            cutoff_hz: 40.0,
        };
        let frequencies_hz: Vec<f64> = (0..=50).map(f64::from).collect();
        let density = frequencies_hz
            .iter()
            .map(|f| 1.0 / (1.0 + (f - 10.0) * (f - 10.0)))
            .collect();
        (signal, PsdCurve { frequencies_hz, density })
    }

    fn settings() -> EvaluationSettings {
        EvaluationSettings {
            freq_start_hz: 5.0,
            freq_end_hz: 30.0,
            scan_step_hz: 0.5,
            damping_ratio: 0.1,
            accel_min: 1000.0,
            accel_max: 5000.0,
        }
    }

    #[test]
    fn test_prefix_shape() {
        let p = artifact_prefix(TestAxis::Y);
        let parts: Vec<&str> = p.split('_').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "Y");
        assert_eq!(parts[1].len(), 15); // 20261019T120000
        assert_eq!(parts[2].len(), 8);
        assert_ne!(p, artifact_prefix(TestAxis::Y));
    }

    #[test]
    fn test_plot_max_hz_bounds() {
        let (_, psd) = fixture();
        assert_eq!(plot_max_hz(&psd, 30.0), 50.0);
        let wide = PsdCurve {
            frequencies_hz: (0..=1600).map(f64::from).collect(),
            density: vec![0.0; 1601],
        };
        assert_eq!(plot_max_hz(&wide, 60.0), 200.0);
        assert_eq!(plot_max_hz(&wide, 132.0), 264.0);
    }

    #[test]
    fn test_csv_columns_and_padding() {
        let (signal, psd) = fixture();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.csv");
        write_data_csv(&path, &signal, &psd).unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert_eq!(
            headers.iter().collect::<Vec<_>>(),
            vec!["time_s", "raw", "conditioned", "frequency_hz", "psd"]
        );
        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 100);
        assert_eq!(&rows[50][3], "50");
        assert_eq!(&rows[51][3], "");
        assert_eq!(&rows[51][4], "");
        assert!(!rows[99][0].is_empty());
    }

    #[test]
    fn test_publish_moves_staged_files_into_root() {
        let (signal, psd) = fixture();
        let table = evaluate_shapers(&psd, &settings()).unwrap();
        let rec = rank(&table, TestAxis::X, 0.1, 0.1);
        let inputs = ArtifactInputs {
            axis: TestAxis::X,
            signal: &signal,
            psd: &psd,
            table: &table,
            recommendation: &rec,
            freq_end_hz: 30.0,
        };

        let root = tempfile::tempdir().unwrap();
        let mut stage = ArtifactStage::new(root.path(), TestAxis::X).unwrap();
        stage.render(&inputs);
        let published = stage.publish();

        // Plots depend on a system font; the CSV never does.
        let csv = published.paths.csv.expect("csv published");
        assert!(csv.is_relative());
        assert!(root.path().join(&csv).is_file());
        assert!(csv.to_string_lossy().ends_with("_data.csv"));
        let leftovers = fs::read_dir(root.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with(STAGING_PREFIX))
            .count();
        assert_eq!(leftovers, 0);
    }

    #[test]
    fn test_dropped_stage_leaves_nothing() {
        let root = tempfile::tempdir().unwrap();
        {
            let _stage = ArtifactStage::new(root.path(), TestAxis::X).unwrap();
        }
        assert_eq!(fs::read_dir(root.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_plot_data_decimation_and_shapers() {
        let (signal, psd) = fixture();
        let table = evaluate_shapers(&psd, &settings()).unwrap();
        let rec = rank(&table, TestAxis::X, 0.1, 0.1);
        let inputs = ArtifactInputs {
            axis: TestAxis::X,
            signal: &signal,
            psd: &psd,
            table: &table,
            recommendation: &rec,
            freq_end_hz: 30.0,
        };
        let data = build_plot_data(&inputs);
        assert_eq!(data.time_s.len(), 20);
        assert_eq!(data.time_s[1], signal.time_s[5]);
        assert_eq!(data.shapers.len(), 5);
        for curve in &data.shapers {
            assert_eq!(curve.shaped_density.len(), data.psd_frequencies_hz.len());
        }
        assert_eq!(data.best_shaper, rec.best.shaper_type.name());
        assert_eq!(data.base_freq_hz, rec.best.center_freq_hz);
    }
}

// src/artifacts.rs
