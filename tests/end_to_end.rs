use std::path::Path;

use emg_inspector::data::export::export_table;
use emg_inspector::data::loader::{load_file, save_mat};
use emg_inspector::data::model::{ElementType, NamedArray};
use emg_inspector::{AnalysisConfig, AnalysisError, Analyzer};

const ROWS: usize = 4_000;

fn recording() -> Vec<NamedArray> {
    let emg: Vec<Vec<f64>> = (0..ROWS)
        .map(|i| (0..12).map(|c| ((i + c) as f64 * 0.01).sin() * 1e-4).collect())
        .collect();
    // 0 for the first half, then movements 1..=4 in equal blocks.
    let stimulus: Vec<f64> = (0..ROWS)
        .map(|i| if i < ROWS / 2 { 0.0 } else { ((i - ROWS / 2) / 500 + 1) as f64 })
        .collect();
    vec![
        NamedArray::new("__header__", vec![1, 1], ElementType::UInt8, vec![0.0]).unwrap(),
        NamedArray::from_rows("emg", ElementType::Float64, &emg).unwrap(),
        NamedArray::column_vector("stimulus", ElementType::UInt8, stimulus),
        NamedArray::scalar("subject", ElementType::UInt8, 1.0),
        NamedArray::scalar("exercise", ElementType::UInt8, 2.0),
        NamedArray::column_vector("movements", ElementType::UInt8, vec![1.0, 2.0, 3.0, 4.0]),
    ]
}

fn write_recording(dir: &Path, compress: bool) -> std::path::PathBuf {
    let path = dir.join(if compress { "rec_z.mat" } else { "rec.mat" });
    save_mat(&path, &recording(), compress).unwrap();
    path
}

fn config_for(path: &Path) -> AnalysisConfig {
    AnalysisConfig {
        input: path.to_path_buf(),
        ..AnalysisConfig::default()
    }
}

#[test]
fn recording_is_summarized() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_recording(dir.path(), false);

    let analyzer = Analyzer::open(config_for(&path)).unwrap();
    assert!(analyzer.arrays().get("__header__").is_none());
    assert_eq!(analyzer.arrays().len(), 5);

    let findings = analyzer.analyze().unwrap();
    let signal = findings.summary.signal.as_ref().unwrap();
    assert_eq!(signal.channels, 12);
    assert_eq!(signal.samples, ROWS);
    assert!((signal.duration_minutes - ROWS as f64 / 2000.0 / 60.0).abs() < 1e-12);
    assert_eq!(findings.summary.label.as_ref().unwrap().distinct_classes, 5);

    let subject = findings
        .summary
        .metadata
        .iter()
        .find(|m| m.name == "subject")
        .unwrap();
    assert_eq!(subject.value, Some(1.0));

    let text = findings.summary.to_string();
    assert!(text.contains("emg: (4000, 12) | dtype: float64"));
    assert!(text.contains("4,000 samples"));
}

#[test]
fn table_holds_only_full_length_arrays() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_recording(dir.path(), false);
    let findings = Analyzer::open(config_for(&path)).unwrap().analyze().unwrap();

    assert_eq!(findings.row_count, ROWS);
    assert_eq!(findings.table.num_rows(), ROWS);
    // 12 signal channels plus the label column.
    assert_eq!(findings.table.num_columns(), 13);
    let schema = findings.table.schema();
    assert_eq!(schema.field(0).name(), "emg_1");
    assert_eq!(schema.field(11).name(), "emg_12");
    assert_eq!(schema.field(12).name(), "stimulus");
    assert!(schema.field_with_name("movements").is_err());
}

#[test]
fn label_counts_cover_every_sample() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_recording(dir.path(), false);
    let freq = Analyzer::open(config_for(&path))
        .unwrap()
        .label_frequencies()
        .unwrap();

    assert_eq!(freq.total(), ROWS as u64);
    assert_eq!(freq.count(0.0), (ROWS / 2) as u64);
    assert_eq!(freq.count(3.0), 500);
    assert!((freq.percentage(0.0) - 50.0).abs() < 1e-9);
    let labels: Vec<f64> = freq.iter().map(|(v, _)| v.get()).collect();
    assert_eq!(labels, vec![0.0, 1.0, 2.0, 3.0, 4.0]);
}

#[test]
fn compressed_file_reads_the_same() {
    let dir = tempfile::tempdir().unwrap();
    let plain = load_file(&write_recording(dir.path(), false)).unwrap();
    let packed = load_file(&write_recording(dir.path(), true)).unwrap();
    assert_eq!(plain.len(), packed.len());
    for (a, b) in plain.iter().zip(packed.iter()) {
        assert_eq!(a, b);
    }
}

#[test]
fn table_exports_to_csv() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_recording(dir.path(), false);
    let findings = Analyzer::open(config_for(&path)).unwrap().analyze().unwrap();

    let out = dir.path().join("table.csv");
    export_table(&findings.table, &out).unwrap();

    let mut reader = csv::Reader::from_path(&out).unwrap();
    let headers = reader.headers().unwrap().clone();
    assert_eq!(headers.len(), 13);
    assert_eq!(&headers[12], "stimulus");
    assert_eq!(reader.records().count(), ROWS);
}

#[test]
fn full_run_writes_charts_and_export() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_recording(dir.path(), true);
    let mut config = config_for(&path);
    config.plot.output_dir = dir.path().join("out");
    config.plot.signal_size = (900, 480);
    config.plot.distribution_size = (720, 360);
    config.export = Some(dir.path().join("out").join("table.parquet"));

    let report = emg_inspector::run(config).unwrap();
    assert!(report.outputs.is_complete());

    let signal = report.outputs.signal_plot.as_ref().unwrap();
    let distribution = report.outputs.distribution_plot.as_ref().unwrap();
    assert!(signal.ends_with("out/emg_stimulus.png"));
    assert!(distribution.ends_with("out/stimulus_distribution.png"));
    assert_eq!(image::image_dimensions(signal).unwrap(), (900, 480));
    assert_eq!(image::image_dimensions(distribution).unwrap(), (720, 360));

    let exported = report.outputs.exported_table.as_ref().unwrap().as_ref().unwrap();
    assert!(std::fs::metadata(exported).unwrap().len() > 0);

    let text = emg_inspector::report::report_text(&report, 5).unwrap();
    assert!(text.contains("Signal chart saved to"));
    assert!(text.contains("Class  0:"));
}

#[test]
fn missing_signal_array_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("labels_only.mat");
    let labels = NamedArray::column_vector("stimulus", ElementType::UInt8, vec![0.0, 1.0]);
    save_mat(&path, [&labels], false).unwrap();

    let err = Analyzer::open(config_for(&path))
        .unwrap()
        .analyze()
        .unwrap_err();
    assert!(matches!(err, AnalysisError::MissingRequiredField(ref name) if name == "emg"));
}

#[test]
fn missing_file_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let err = Analyzer::open(config_for(&dir.path().join("absent.mat"))).err().unwrap();
    assert!(matches!(err, AnalysisError::FileNotFound { .. }));
}

#[test]
fn config_file_overrides_defaults() {
    let config = AnalysisConfig::from_json_str(
        r#"{ "input": "other.mat", "sample_rate_hz": 1000.0, "plot": { "channel": 3 } }"#,
    )
    .unwrap();
    assert_eq!(config.sample_rate_hz, 1000.0);
    assert_eq!(config.channel_column(), "emg_3");
    assert_eq!(config.plot.window, 2000);
    assert_eq!(config.label_array, "stimulus");
}
