// src/main.rs

use std::error::Error;
use std::fs;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tracing::{info, Level};

use shaper_tuner::axis_names::TestAxis;
use shaper_tuner::config::{AnalyzerConfig, PrinterConfig};
use shaper_tuner::constants::DEFAULT_PROBE_Z_MM;
use shaper_tuner::crate_version;
use shaper_tuner::data_input::shaper_echo::parse_shaper_echo;
use shaper_tuner::data_input::sweep_request::{AxisSweepRequest, ProbePoint};
use shaper_tuner::pipeline::{AnalysisResponse, CancellationToken, DeviceSession, ResponseBody};
use shaper_tuner::sweep::{resonance_sweep, test_sweep};

/// Resonance test analysis and input shaper recommendation.
#[derive(Parser)]
#[command(name = "shaper-tuner", version)]
struct Cli {
    /// Debug-level logging.
    #[arg(long, short, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Warnings and errors only.
    #[arg(long, short, global = true)]
    quiet: bool,

    /// TOML configuration file. Built-in defaults are used when omitted.
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Analyze a capture CSV (time,x,y,z) and recommend a shaper.
    Analyze {
        /// Capture file written during the sweep.
        capture: PathBuf,
        #[arg(long, short)]
        axis: TestAxis,
        /// Where plots and the CSV dump go (overrides `output.output_dir`).
        #[arg(long, short)]
        output_dir: Option<PathBuf>,
        /// Skip plots and CSV.
        #[arg(long)]
        no_artifacts: bool,
        /// Print the full result as JSON instead of a table.
        #[arg(long)]
        json: bool,
        #[command(flatten)]
        probe: ProbeArgs,
    },
    /// Print the G-code program of a resonance sweep.
    Sweep {
        #[arg(long, short)]
        axis: TestAxis,
        #[command(flatten)]
        probe: ProbeArgs,
    },
    /// Print a short chirp program that exercises one axis without capturing.
    TestSweep {
        #[arg(long, short)]
        axis: TestAxis,
        #[command(flatten)]
        probe: ProbeArgs,
    },
    /// Turn saved `M593` echo lines into restore commands.
    Restore {
        /// Text file with the controller's `M593` replies.
        echo_file: PathBuf,
    },
}

/// Probe point; X/Y default to the bed center.
#[derive(Args)]
struct ProbeArgs {
    #[arg(long)]
    x: Option<f64>,
    #[arg(long)]
    y: Option<f64>,
    #[arg(long, default_value_t = DEFAULT_PROBE_Z_MM)]
    z: f64,
}

impl ProbeArgs {
    fn resolve(&self, bed: &PrinterConfig) -> ProbePoint {
        ProbePoint {
            x: self.x.unwrap_or(bed.bed_size_x / 2.0),
            y: self.y.unwrap_or(bed.bed_size_y / 2.0),
            z: self.z,
        }
    }
}

fn print_response(response: &AnalysisResponse) {
    match &response.body {
        ResponseBody::Recommendation(rec) => {
            println!("\n--- Shaper comparison (axis {}) ---", rec.axis);
            println!(
                "  {:<10} {:>10} {:>14} {:>12}",
                "Shaper", "Freq (Hz)", "Residual", "Max accel"
            );
            for row in &rec.shapers {
                println!(
                    "{} {:<10} {:>10.2} {:>14.4e} {:>12.0}",
                    if row.is_best { "*" } else { " " },
                    row.name,
                    row.base_freq_hz,
                    row.residual_vibration,
                    row.achievable_accel
                );
            }
            println!("\nRecommended: {} at {:.2} Hz", rec.shaper, rec.base_freq_hz);
            println!("Command: {}", rec.command);
            for (label, path) in [
                ("Signal plot", &rec.artifacts.signal_plot),
                ("PSD plot", &rec.artifacts.psd_plot),
                ("Data CSV", &rec.artifacts.csv),
            ] {
                if let Some(p) = path {
                    println!("  {label} saved as '{}'.", p.display());
                }
            }
            if !rec.flags.is_empty() {
                println!("Flags: {:?}", rec.flags);
            }
        }
        ResponseBody::Failure(failure) => {
            eprintln!("Analysis failed ({}): {}", failure.kind, failure.message);
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else if cli.quiet {
        Level::WARN
    } else {
        Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
    info!(version = crate_version(), "shaper-tuner starting");

    let mut config = match &cli.config {
        Some(path) => AnalyzerConfig::load_from_file(path)?,
        None => AnalyzerConfig::default(),
    };

    match cli.command {
        Command::Analyze {
            capture,
            axis,
            output_dir,
            no_artifacts,
            json,
            probe,
        } => {
            if let Some(dir) = output_dir {
                config.output.output_dir = dir;
            }
            if no_artifacts {
                config.output.write_artifacts = false;
            }
            let request = AxisSweepRequest::from_config(&config, axis, probe.resolve(&config.printer));
            let session = DeviceSession::new(config)?;
            let response = session.run_capture_file(&capture, &request, &CancellationToken::new());
            if json {
                println!("{}", response.to_json_pretty()?);
            } else {
                print_response(&response);
            }
            if !response.success {
                std::process::exit(1);
            }
        }
        Command::Sweep { axis, probe } => {
            config.validate()?;
            let request = AxisSweepRequest::from_config(&config, axis, probe.resolve(&config.printer));
            for line in resonance_sweep(&request, &config.printer)? {
                println!("{line}");
            }
        }
        Command::TestSweep { axis, probe } => {
            config.validate()?;
            let request = AxisSweepRequest::from_config(&config, axis, probe.resolve(&config.printer));
            for line in test_sweep(&request, &config.printer)? {
                println!("{line}");
            }
        }
        Command::Restore { echo_file } => {
            let contents = fs::read_to_string(&echo_file)?;
            let saved = parse_shaper_echo(contents.lines());
            if saved.is_empty() {
                eprintln!("No M593 settings found in '{}'.", echo_file.display());
                std::process::exit(1);
            }
            for line in saved.restore_commands() {
                println!("{line}");
            }
        }
    }
    Ok(())
}

// src/main.rs
