use std::fmt;

use log::debug;

use super::model::{ArrayCollection, LabelFrequencies, LabelValue, NamedArray};

/// Sampling rate of the NinaPro DB2 EMG recordings.
pub const DEFAULT_SAMPLE_RATE_HZ: f64 = 2000.0;

// ---------------------------------------------------------------------------
// Label frequencies
// ---------------------------------------------------------------------------

/// Count every distinct value of a label array, whatever its shape.
pub fn label_frequencies(labels: &NamedArray) -> LabelFrequencies {
    if !labels.element_type.is_integral() {
        debug!(
            "label array '{}' is {}, counting exact values",
            labels.name,
            labels.element_type
        );
    }
    LabelFrequencies::from_values(labels.values().iter().copied())
}

/// Duration in minutes of `samples` recorded at `sample_rate_hz`.
pub fn duration_minutes(samples: usize, sample_rate_hz: f64) -> f64 {
    samples as f64 / sample_rate_hz / 60.0
}

// ---------------------------------------------------------------------------
// Structural summary
// ---------------------------------------------------------------------------

/// Shape and type of one array.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayShape {
    pub name: String,
    pub shape: String,
    pub element_type: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SignalSummary {
    pub name: String,
    pub channels: usize,
    pub samples: usize,
    pub duration_minutes: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LabelSummary {
    pub name: String,
    pub distinct_classes: usize,
}

/// First value of a scalar metadata array such as `subject`.
#[derive(Debug, Clone, PartialEq)]
pub struct MetadataEntry {
    pub name: String,
    pub value: Option<f64>,
}

/// Names of the arrays the summary looks for.
#[derive(Debug, Clone, Copy)]
pub struct SummaryKeys<'a> {
    pub signal: &'a str,
    pub label: &'a str,
    pub metadata: &'a [&'a str],
}

/// Read-only description of a loaded container.
#[derive(Debug, Clone, PartialEq)]
pub struct StructuralSummary {
    pub arrays: Vec<ArrayShape>,
    pub signal: Option<SignalSummary>,
    pub label: Option<LabelSummary>,
    pub metadata: Vec<MetadataEntry>,
}

impl StructuralSummary {
    /// Describe every array, plus the signal, label and metadata arrays when
    /// present.
    pub fn build(arrays: &ArrayCollection, keys: SummaryKeys<'_>, sample_rate_hz: f64) -> Self {
        let shapes = arrays
            .iter()
            .map(|a| ArrayShape {
                name: a.name.clone(),
                shape: a.shape_string(),
                element_type: a.element_type.to_string(),
            })
            .collect();

        let signal = arrays.get(keys.signal).map(|a| SignalSummary {
            name: a.name.clone(),
            channels: a.cols(),
            samples: a.rows(),
            duration_minutes: duration_minutes(a.rows(), sample_rate_hz),
        });

        let label = arrays.get(keys.label).map(|a| LabelSummary {
            name: a.name.clone(),
            distinct_classes: label_frequencies(a).distinct(),
        });

        let metadata = keys
            .metadata
            .iter()
            .filter_map(|name| arrays.get(name))
            .map(|a| MetadataEntry {
                name: a.name.clone(),
                value: a.first_value(),
            })
            .collect();

        StructuralSummary {
            arrays: shapes,
            signal,
            label,
            metadata,
        }
    }
}

impl fmt::Display for StructuralSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "=".repeat(60);
        writeln!(f, "{rule}")?;
        writeln!(f, "EMG DATASET SUMMARY")?;
        writeln!(f, "{rule}")?;
        for a in &self.arrays {
            writeln!(f, "  {}: {} | dtype: {}", a.name, a.shape, a.element_type)?;
        }

        if let Some(s) = &self.signal {
            writeln!(f)?;
            writeln!(f, "Signal '{}':", s.name)?;
            writeln!(f, "  - {} channels", s.channels)?;
            writeln!(f, "  - {} samples", crate::report::group_thousands(s.samples as u64))?;
            writeln!(f, "  - estimated duration: {:.2} minutes", s.duration_minutes)?;
        }
        if let Some(l) = &self.label {
            writeln!(f)?;
            writeln!(f, "Labels '{}':", l.name)?;
            writeln!(f, "  - {} distinct classes", l.distinct_classes)?;
        }
        if !self.metadata.is_empty() {
            writeln!(f)?;
            writeln!(f, "Metadata:")?;
            for m in &self.metadata {
                match m.value {
                    Some(v) => writeln!(f, "  - {}: {}", m.name, LabelValue::new(v))?,
                    None => writeln!(f, "  - {}: <empty>", m.name)?,
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::ElementType;

    const KEYS: SummaryKeys<'static> = SummaryKeys {
        signal: "emg",
        label: "stimulus",
        metadata: &["subject", "exercise"],
    };

    #[test]
    fn duration_in_minutes() {
        assert_eq!(duration_minutes(120_000, DEFAULT_SAMPLE_RATE_HZ), 1.0);
        assert!((duration_minutes(1_808_331, DEFAULT_SAMPLE_RATE_HZ) - 15.069425).abs() < 1e-6);
    }

    #[test]
    fn label_counts_sum_to_length() {
        let labels = NamedArray::new(
            "stimulus",
            vec![1, 6],
            ElementType::Float64,
            vec![0.0, 0.0, 1.0, 2.0, 1.0, 0.0],
        )
        .unwrap();
        let freq = label_frequencies(&labels);
        assert_eq!(freq.total(), 6);
        assert_eq!(freq.count(0.0), 3);
        assert_eq!(freq.count(1.0), 2);
        assert_eq!(freq.count(2.0), 1);
        assert_eq!(freq.distinct(), 3);
    }

    #[test]
    fn summary_reports_signal_label_and_metadata() {
        let mut c = ArrayCollection::new();
        c.insert(NamedArray::new("emg", vec![120_000, 12], ElementType::Float64, vec![0.0; 1_440_000]).unwrap())
            .unwrap();
        c.insert(NamedArray::column_vector(
            "stimulus",
            ElementType::UInt8,
            (0..120_000).map(|i| (i % 4) as f64).collect(),
        ))
        .unwrap();
        c.insert(NamedArray::scalar("subject", ElementType::UInt8, 1.0)).unwrap();
        c.insert(NamedArray::scalar("exercise", ElementType::UInt8, 2.0)).unwrap();

        let summary = StructuralSummary::build(&c, KEYS, DEFAULT_SAMPLE_RATE_HZ);
        assert_eq!(summary.arrays.len(), 4);
        let signal = summary.signal.as_ref().unwrap();
        assert_eq!(signal.channels, 12);
        assert_eq!(signal.duration_minutes, 1.0);
        assert_eq!(summary.label.as_ref().unwrap().distinct_classes, 4);

        let text = summary.to_string();
        assert!(text.contains("emg: (120000, 12) | dtype: float64"));
        assert!(text.contains("12 channels"));
        assert!(text.contains("120,000 samples"));
        assert!(text.contains("4 distinct classes"));
        assert!(text.contains("subject: 1"));
        assert!(text.contains("exercise: 2"));
    }

    #[test]
    fn summary_without_known_arrays() {
        let mut c = ArrayCollection::new();
        c.insert(NamedArray::column_vector("glove", ElementType::Float32, vec![0.0; 3]))
            .unwrap();
        let summary = StructuralSummary::build(&c, KEYS, DEFAULT_SAMPLE_RATE_HZ);
        assert!(summary.signal.is_none());
        assert!(summary.label.is_none());
        assert!(summary.metadata.is_empty());
        assert!(summary.to_string().contains("glove: (3, 1) | dtype: float32"));
    }
}
