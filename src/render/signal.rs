use std::path::Path;

use arrow::record_batch::RecordBatch;
use log::{info, warn};
use plotters::coord::Shift;
use plotters::prelude::*;

use super::{ensure_font, padded_range, render_err, FONT_FAMILY};
use crate::config::AnalysisConfig;
use crate::data::reshape::column_values;
use crate::error::{AnalysisError, Result};

/// The leading samples of one signal channel and of the label column.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalWindow {
    /// 1-based channel number.
    pub channel: usize,
    /// `None` when the table has no column for the channel.
    pub signal: Option<Vec<f64>>,
    pub labels: Vec<f64>,
}

impl SignalWindow {
    /// Cut the first `config.plot.window` rows out of the table.
    pub fn from_table(batch: &RecordBatch, config: &AnalysisConfig) -> Result<Self> {
        let window = config.plot.window;
        let column = config.channel_column();
        let signal = column_values(batch, &column, window)?;
        if signal.is_none() {
            warn!("no column '{column}' in the table; signal panel left empty");
        }
        let labels = column_values(batch, &config.label_array, window)?
            .ok_or_else(|| AnalysisError::MissingRequiredField(config.label_array.clone()))?;
        Ok(SignalWindow {
            channel: config.plot.channel,
            signal,
            labels,
        })
    }

    /// Number of samples actually shown.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Draw the channel (top) and the label trace (bottom) into one PNG.
pub fn render_signal_plot(window: &SignalWindow, path: &Path, size: (u32, u32)) -> Result<()> {
    ensure_font()?;
    let root = BitMapBackend::new(path, size).into_drawing_area();
    root.fill(&WHITE).map_err(render_err)?;
    let panels = root.split_evenly((2, 1));

    let n = window.len();
    let empty = Vec::new();
    draw_trace(
        &panels[0],
        window.signal.as_ref().unwrap_or(&empty),
        n,
        &format!("EMG channel {} - first {n} samples", window.channel),
        "EMG amplitude",
        None,
        &BLUE,
    )?;
    draw_trace(
        &panels[1],
        &window.labels,
        n,
        &format!("Stimulus - first {n} samples"),
        "Stimulus class",
        Some("Samples"),
        &RED,
    )?;

    root.present().map_err(render_err)?;
    info!("signal chart saved to {}", path.display());
    Ok(())
}

fn draw_trace(
    area: &DrawingArea<BitMapBackend, Shift>,
    values: &[f64],
    samples: usize,
    title: &str,
    y_desc: &str,
    x_desc: Option<&str>,
    color: &RGBColor,
) -> Result<()> {
    let y_range = padded_range(values);
    let x_max = samples.max(1) as f64;

    let mut chart = ChartBuilder::on(area)
        .caption(title, (FONT_FAMILY, 28).into_font())
        .margin(15)
        .x_label_area_size(45)
        .y_label_area_size(80)
        .build_cartesian_2d(0f64..x_max, y_range)
        .map_err(render_err)?;

    let mut mesh = chart.configure_mesh();
    mesh.y_desc(y_desc);
    if let Some(x_desc) = x_desc {
        mesh.x_desc(x_desc);
    }
    mesh.draw().map_err(render_err)?;

    chart
        .draw_series(LineSeries::new(
            values
                .iter()
                .enumerate()
                .filter(|(_, v)| v.is_finite())
                .map(|(i, &v)| (i as f64, v)),
            color.stroke_width(2),
        ))
        .map_err(render_err)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{ArrayCollection, ElementType, NamedArray};
    use crate::data::reshape::reshape;

    fn table(rows: usize) -> RecordBatch {
        let mut c = ArrayCollection::new();
        let emg: Vec<Vec<f64>> = (0..rows).map(|i| vec![i as f64, -(i as f64)]).collect();
        c.insert(NamedArray::from_rows("emg", ElementType::Float64, &emg).unwrap())
            .unwrap();
        c.insert(NamedArray::column_vector(
            "stimulus",
            ElementType::UInt8,
            (0..rows).map(|i| (i / 3) as f64).collect(),
        ))
        .unwrap();
        reshape(&c, rows).unwrap()
    }

    #[test]
    fn window_takes_leading_samples() {
        let mut config = AnalysisConfig::default();
        config.plot.window = 4;
        config.plot.channel = 2;
        let w = SignalWindow::from_table(&table(10), &config).unwrap();
        assert_eq!(w.signal, Some(vec![0.0, -1.0, -2.0, -3.0]));
        assert_eq!(w.labels, vec![0.0, 0.0, 0.0, 1.0]);
        assert_eq!(w.len(), 4);
    }

    #[test]
    fn window_is_clipped_to_table_length() {
        let config = AnalysisConfig::default();
        let w = SignalWindow::from_table(&table(6), &config).unwrap();
        assert_eq!(w.len(), 6);
    }

    #[test]
    fn missing_channel_leaves_signal_empty() {
        let mut config = AnalysisConfig::default();
        config.plot.channel = 9;
        let w = SignalWindow::from_table(&table(5), &config).unwrap();
        assert!(w.signal.is_none());
        assert_eq!(w.len(), 5);
    }

    #[test]
    fn missing_label_column_is_an_error() {
        let mut config = AnalysisConfig::default();
        config.label_array = "restimulus".into();
        match SignalWindow::from_table(&table(5), &config) {
            Err(AnalysisError::MissingRequiredField(name)) => assert_eq!(name, "restimulus"),
            other => panic!("unexpected: {other:?}"),
        }
    }
}
