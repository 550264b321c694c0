use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::data::summary::DEFAULT_SAMPLE_RATE_HZ;
use crate::error::{AnalysisError, Result};

/// Recording inspected when no path is given.
pub const DEFAULT_INPUT: &str = "DB2_s1/S1_E1_A1.mat";

// ---------------------------------------------------------------------------
// Plot settings
// ---------------------------------------------------------------------------

/// Where and how the two diagnostic charts are drawn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlotConfig {
    pub output_dir: PathBuf,
    /// Signal channel to draw, 1-based.
    pub channel: usize,
    /// Number of leading samples shown in the signal chart.
    pub window: usize,
    pub signal_file: PathBuf,
    pub distribution_file: PathBuf,
    /// Pixel size (width, height) of the signal chart.
    pub signal_size: (u32, u32),
    /// Pixel size (width, height) of the distribution chart.
    pub distribution_size: (u32, u32),
}

impl Default for PlotConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            channel: 1,
            window: 2000,
            signal_file: PathBuf::from("emg_stimulus.png"),
            distribution_file: PathBuf::from("stimulus_distribution.png"),
            signal_size: (2250, 1200),
            distribution_size: (1800, 900),
        }
    }
}

impl PlotConfig {
    pub fn signal_path(&self) -> PathBuf {
        self.output_dir.join(&self.signal_file)
    }

    pub fn distribution_path(&self) -> PathBuf {
        self.output_dir.join(&self.distribution_file)
    }
}

// ---------------------------------------------------------------------------
// Analysis settings
// ---------------------------------------------------------------------------

/// Everything one analysis pass needs, threaded explicitly through the run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub input: PathBuf,
    pub signal_array: String,
    pub label_array: String,
    pub subject_array: String,
    pub exercise_array: String,
    pub sample_rate_hz: f64,
    /// Row count used to select arrays for the table. Derived from the
    /// label (or signal) array when unset.
    pub row_count: Option<usize>,
    pub head_rows: usize,
    /// Optional `.parquet` / `.csv` destination for the flattened table.
    pub export: Option<PathBuf>,
    pub plot: PlotConfig,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::from(DEFAULT_INPUT),
            signal_array: "emg".into(),
            label_array: "stimulus".into(),
            subject_array: "subject".into(),
            exercise_array: "exercise".into(),
            sample_rate_hz: DEFAULT_SAMPLE_RATE_HZ,
            row_count: None,
            head_rows: 5,
            export: None,
            plot: PlotConfig::default(),
        }
    }
}

impl AnalysisConfig {
    /// Read a JSON config file; absent fields keep their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| AnalysisError::io(path, e))?;
        Self::from_json_str(&text)
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Reject settings no run could succeed with.
    pub fn validate(&self) -> Result<()> {
        if !(self.sample_rate_hz.is_finite() && self.sample_rate_hz > 0.0) {
            return Err(AnalysisError::InvalidConfig(format!(
                "sample rate must be positive, got {}",
                self.sample_rate_hz
            )));
        }
        if self.plot.channel == 0 {
            return Err(AnalysisError::InvalidConfig(
                "channels are numbered from 1".into(),
            ));
        }
        if self.plot.window == 0 {
            return Err(AnalysisError::InvalidConfig(
                "plot window must hold at least one sample".into(),
            ));
        }
        for (what, name) in [
            ("signal", &self.signal_array),
            ("label", &self.label_array),
            ("subject", &self.subject_array),
            ("exercise", &self.exercise_array),
        ] {
            if name.is_empty() {
                return Err(AnalysisError::InvalidConfig(format!(
                    "{what} array name is empty"
                )));
            }
        }
        let sizes = [self.plot.signal_size, self.plot.distribution_size];
        if sizes.iter().any(|&(w, h)| w == 0 || h == 0) {
            return Err(AnalysisError::InvalidConfig(
                "plot sizes must be non-zero".into(),
            ));
        }
        Ok(())
    }

    /// Column holding the plotted signal channel.
    pub fn channel_column(&self) -> String {
        format!("{}_{}", self.signal_array, self.plot.channel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = AnalysisConfig::default();
        config.validate().unwrap();
        assert_eq!(config.input, PathBuf::from(DEFAULT_INPUT));
        assert_eq!(config.sample_rate_hz, 2000.0);
        assert_eq!(config.channel_column(), "emg_1");
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config = AnalysisConfig::from_json_str(
            r#"{ "input": "S2_E1_A1.mat", "plot": { "channel": 3 } }"#,
        )
        .unwrap();
        assert_eq!(config.input, PathBuf::from("S2_E1_A1.mat"));
        assert_eq!(config.plot.channel, 3);
        assert_eq!(config.plot.window, 2000);
        assert_eq!(config.label_array, "stimulus");
    }

    #[test]
    fn bad_json_is_a_json_error() {
        let err = AnalysisConfig::from_json_str("{ nope").unwrap_err();
        assert!(matches!(err, AnalysisError::Json(_)));
    }

    #[test]
    fn invalid_settings_are_rejected() {
        let mut config = AnalysisConfig::default();
        config.sample_rate_hz = 0.0;
        assert!(matches!(config.validate(), Err(AnalysisError::InvalidConfig(_))));

        let mut config = AnalysisConfig::default();
        config.plot.channel = 0;
        assert!(config.validate().is_err());

        let mut config = AnalysisConfig::default();
        config.plot.window = 0;
        assert!(config.validate().is_err());

        let mut config = AnalysisConfig::default();
        config.label_array.clear();
        assert!(config.validate().is_err());

        let mut config = AnalysisConfig::default();
        config.plot.distribution_size = (0, 900);
        assert!(config.validate().is_err());
    }

    #[test]
    fn plot_paths_join_output_dir() {
        let mut plot = PlotConfig::default();
        plot.output_dir = PathBuf::from("out");
        assert_eq!(plot.signal_path(), PathBuf::from("out/emg_stimulus.png"));
        assert_eq!(
            plot.distribution_path(),
            PathBuf::from("out/stimulus_distribution.png")
        );
    }
}
