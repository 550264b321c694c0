use std::path::{Path, PathBuf};

use arrow::record_batch::RecordBatch;
use log::{info, warn};

use crate::config::AnalysisConfig;
use crate::data::export::export_table;
use crate::data::loader::load_file;
use crate::data::model::{ArrayCollection, LabelFrequencies};
use crate::data::reshape::{dominant_row_count, reshape};
use crate::data::summary::{label_frequencies, StructuralSummary, SummaryKeys};
use crate::error::{AnalysisError, Result};
use crate::render::distribution::render_distribution_plot;
use crate::render::signal::{render_signal_plot, SignalWindow};

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// Everything derived from the loaded arrays, before anything is written.
#[derive(Debug, Clone)]
pub struct Findings {
    pub summary: StructuralSummary,
    /// Row count the table was built around.
    pub row_count: usize,
    pub table: RecordBatch,
    pub frequencies: LabelFrequencies,
}

/// Files written from the findings. Each one succeeds or fails on its own.
#[derive(Debug)]
pub struct Outputs {
    /// `None` when no export was requested.
    pub exported_table: Option<Result<PathBuf>>,
    pub signal_plot: Result<PathBuf>,
    pub distribution_plot: Result<PathBuf>,
}

impl Outputs {
    /// Every output that could not be written.
    pub fn failures(&self) -> impl Iterator<Item = &AnalysisError> {
        self.exported_table
            .iter()
            .chain([&self.signal_plot, &self.distribution_plot])
            .filter_map(|r| r.as_ref().err())
    }

    pub fn is_complete(&self) -> bool {
        self.failures().next().is_none()
    }
}

/// Outcome of a complete analysis pass.
#[derive(Debug)]
pub struct AnalysisReport {
    pub source: PathBuf,
    pub findings: Findings,
    pub outputs: Outputs,
}

// ---------------------------------------------------------------------------
// Analyzer
// ---------------------------------------------------------------------------

/// One loaded recording plus the settings it is analysed with.
pub struct Analyzer {
    config: AnalysisConfig,
    arrays: ArrayCollection,
}

impl Analyzer {
    /// Validate `config` and load the file it points at.
    pub fn open(config: AnalysisConfig) -> Result<Self> {
        config.validate()?;
        let arrays = load_file(&config.input)?;
        Ok(Self { config, arrays })
    }

    /// Analyse arrays that are already in memory.
    pub fn from_arrays(config: AnalysisConfig, arrays: ArrayCollection) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, arrays })
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn arrays(&self) -> &ArrayCollection {
        &self.arrays
    }

    pub fn summary(&self) -> StructuralSummary {
        let metadata = [
            self.config.subject_array.as_str(),
            self.config.exercise_array.as_str(),
        ];
        let keys = SummaryKeys {
            signal: &self.config.signal_array,
            label: &self.config.label_array,
            metadata: &metadata,
        };
        StructuralSummary::build(&self.arrays, keys, self.config.sample_rate_hz)
    }

    /// The configured row count, else the one of the label or signal array.
    pub fn row_count(&self) -> Result<usize> {
        if let Some(rows) = self.config.row_count {
            return Ok(rows);
        }
        let preferred = [
            self.config.label_array.as_str(),
            self.config.signal_array.as_str(),
        ];
        dominant_row_count(&self.arrays, &preferred)
            .ok_or_else(|| AnalysisError::EmptyInput("no arrays to derive a row count from".into()))
    }

    /// Flatten the arrays sharing the row count into one table.
    pub fn build_table(&self) -> Result<RecordBatch> {
        let rows = self.row_count()?;
        let table = reshape(&self.arrays, rows)?;
        info!(
            "table built: {} rows x {} columns",
            table.num_rows(),
            table.num_columns()
        );
        Ok(table)
    }

    pub fn label_frequencies(&self) -> Result<LabelFrequencies> {
        let labels = self.arrays.require(&self.config.label_array)?;
        Ok(label_frequencies(labels))
    }

    /// Derive summary, table and label counts without touching the disk.
    pub fn analyze(&self) -> Result<Findings> {
        self.arrays.require(&self.config.signal_array)?;
        self.arrays.require(&self.config.label_array)?;
        Ok(Findings {
            summary: self.summary(),
            row_count: self.row_count()?,
            table: self.build_table()?,
            frequencies: self.label_frequencies()?,
        })
    }

    pub fn render_signal(&self, table: &RecordBatch) -> Result<PathBuf> {
        let window = SignalWindow::from_table(table, &self.config)?;
        let path = self.config.plot.signal_path();
        prepare_parent(&path)?;
        render_signal_plot(&window, &path, self.config.plot.signal_size)?;
        Ok(path)
    }

    pub fn render_distribution(&self, frequencies: &LabelFrequencies) -> Result<PathBuf> {
        let path = self.config.plot.distribution_path();
        prepare_parent(&path)?;
        render_distribution_plot(frequencies, &path, self.config.plot.distribution_size)?;
        Ok(path)
    }

    /// Export the table (if configured) and draw both charts. A failing
    /// output is logged and recorded; the others are still written.
    pub fn write_outputs(&self, findings: &Findings) -> Outputs {
        let exported_table = self.config.export.as_ref().map(|path| {
            prepare_parent(path)
                .and_then(|()| export_table(&findings.table, path))
                .map(|()| path.clone())
        });
        let outputs = Outputs {
            exported_table,
            signal_plot: self.render_signal(&findings.table),
            distribution_plot: self.render_distribution(&findings.frequencies),
        };
        for e in outputs.failures() {
            warn!("{e}");
        }
        outputs
    }

    /// Full pass: analyse, then write every output.
    pub fn run(&self) -> Result<AnalysisReport> {
        let findings = self.analyze()?;
        let outputs = self.write_outputs(&findings);
        Ok(AnalysisReport {
            source: self.config.input.clone(),
            findings,
            outputs,
        })
    }
}

/// Load, analyse and render in one call.
pub fn run(config: AnalysisConfig) -> Result<AnalysisReport> {
    Analyzer::open(config)?.run()
}

fn prepare_parent(path: &Path) -> Result<()> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => {
            std::fs::create_dir_all(dir).map_err(|e| AnalysisError::io(dir, e))
        }
        _ => Ok(()),
    }
}
