//! Exploratory inspection of EMG recordings stored in MATLAB `.mat` files.
//!
//! A run loads one recording, summarizes its arrays, flattens the arrays that
//! share the recording's sample count into an Arrow table, counts the
//! stimulus labels and renders two PNG charts.

pub mod analysis;
pub mod color;
pub mod config;
pub mod data;
pub mod error;
pub mod render;
pub mod report;

pub use analysis::{run, AnalysisReport, Analyzer, Findings, Outputs};
pub use config::AnalysisConfig;
pub use error::{AnalysisError, Result};
