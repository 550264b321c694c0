use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use emg_inspector::report::{findings_text, outputs_text};
use emg_inspector::{AnalysisConfig, Analyzer};

/// Inspect one EMG recording: summary, flattened table and diagnostic charts.
#[derive(Parser, Debug)]
#[command(name = "emg-inspector")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Recording to inspect [default: DB2_s1/S1_E1_A1.mat]
    path: Option<PathBuf>,

    /// JSON configuration file; command-line flags override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory the charts are written to
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Signal channel to plot (1-based)
    #[arg(long)]
    channel: Option<usize>,

    /// Number of leading samples in the signal chart
    #[arg(long)]
    window: Option<usize>,

    /// Sampling rate in Hz used for the duration estimate
    #[arg(long)]
    sample_rate: Option<f64>,

    /// Row count used to select arrays for the table (derived when omitted)
    #[arg(long)]
    rows: Option<usize>,

    /// Name of the signal array
    #[arg(long)]
    signal: Option<String>,

    /// Name of the label array
    #[arg(long)]
    label: Option<String>,

    /// Also write the flattened table to this .parquet or .csv file
    #[arg(short, long)]
    export: Option<PathBuf>,
}

impl Cli {
    /// Defaults, then the config file, then flags.
    fn into_config(self) -> Result<AnalysisConfig> {
        let mut config = match &self.config {
            Some(path) => AnalysisConfig::from_json_file(path)
                .with_context(|| format!("reading config {}", path.display()))?,
            None => AnalysisConfig::default(),
        };
        if let Some(path) = self.path {
            config.input = path;
        }
        if let Some(dir) = self.output_dir {
            config.plot.output_dir = dir;
        }
        if let Some(channel) = self.channel {
            config.plot.channel = channel;
        }
        if let Some(window) = self.window {
            config.plot.window = window;
        }
        if let Some(rate) = self.sample_rate {
            config.sample_rate_hz = rate;
        }
        if let Some(rows) = self.rows {
            config.row_count = Some(rows);
        }
        if let Some(signal) = self.signal {
            config.signal_array = signal;
        }
        if let Some(label) = self.label {
            config.label_array = label;
        }
        if let Some(export) = self.export {
            config.export = Some(export);
        }
        Ok(config)
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = cli.into_config()?;
    log::debug!("configuration: {config:?}");
    log::info!("inspecting {}", config.input.display());

    let head_rows = config.head_rows;
    let analyzer = Analyzer::open(config).context("loading recording")?;
    let findings = analyzer.analyze().context("analysing recording")?;
    println!("Loaded {}", analyzer.config().input.display());
    print!("{}", findings_text(&findings, head_rows)?);

    // Outputs fail one by one; the findings above stay printed.
    let outputs = analyzer.write_outputs(&findings);
    print!("{}", outputs_text(&findings, &outputs));
    Ok(())
}

fn main() {
    env_logger::init();

    // Failures are reported, not signalled through the exit status.
    if let Err(e) = run(Cli::parse()) {
        eprintln!("Error: {e:#}");
    }
}
