//! Console text for an analysis pass.

use std::fmt;
use std::path::PathBuf;

use arrow::array::Array;
use arrow::record_batch::RecordBatch;
use arrow::util::pretty::pretty_format_batches;

use crate::analysis::{AnalysisReport, Findings, Outputs};
use crate::data::model::LabelFrequencies;
use crate::error::Result;

/// `1808331` → `1,808,331`.
pub fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// First `n` rows rendered as a text grid.
pub fn table_head(batch: &RecordBatch, n: usize) -> Result<String> {
    if batch.num_columns() == 0 {
        return Ok("(empty table)".into());
    }
    let head = batch.slice(0, n.min(batch.num_rows()));
    Ok(pretty_format_batches(&[head])?.to_string())
}

/// Column listing with non-null counts, data types and memory use.
pub struct TableInfo<'a>(pub &'a RecordBatch);

impl fmt::Display for TableInfo<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let batch = self.0;
        match batch.num_rows() {
            0 => writeln!(f, "RecordBatch: 0 entries")?,
            rows => writeln!(f, "RecordBatch: {rows} entries, 0 to {}", rows - 1)?,
        }
        writeln!(f, "Data columns (total {} columns):", batch.num_columns())?;

        let schema = batch.schema();
        let width = schema
            .fields()
            .iter()
            .map(|field| field.name().len())
            .max()
            .unwrap_or(0)
            .max("Column".len());
        writeln!(f, " #   {:<width$}  Non-Null Count  Dtype", "Column")?;
        for (i, (field, column)) in schema.fields().iter().zip(batch.columns()).enumerate() {
            writeln!(
                f,
                " {i:<3} {:<width$}  {:>8} non-null  {}",
                field.name(),
                column.len() - column.null_count(),
                field.data_type()
            )?;
        }
        writeln!(
            f,
            "memory usage: {} bytes",
            group_thousands(batch.get_array_memory_size() as u64)
        )
    }
}

/// Per-class counts with their share of all counted labels.
pub struct ClassBreakdown<'a>(pub &'a LabelFrequencies);

impl fmt::Display for ClassBreakdown<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let freq = self.0;
        for (label, count) in freq.iter() {
            writeln!(
                f,
                "   Class {label:2}: {:>9} samples ({:.1}%)",
                group_thousands(count),
                freq.percentage(label.get())
            )?;
        }
        Ok(())
    }
}

/// Where each output went, or why it is missing.
pub struct OutputSummary<'a>(pub &'a Outputs);

impl fmt::Display for OutputSummary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let outputs = self.0;
        if let Some(export) = &outputs.exported_table {
            write_output(f, "Table export", export)?;
        }
        write_output(f, "Signal chart", &outputs.signal_plot)?;
        write_output(f, "Distribution chart", &outputs.distribution_plot)
    }
}

fn write_output(f: &mut fmt::Formatter<'_>, what: &str, result: &Result<PathBuf>) -> fmt::Result {
    match result {
        Ok(path) => writeln!(f, "{what} saved to {}", path.display()),
        Err(e) => writeln!(f, "{what} not written: {e}"),
    }
}

/// Structure, table preview and table info.
pub fn findings_text(findings: &Findings, head_rows: usize) -> Result<String> {
    Ok(format!(
        "{summary}\n\
         Table created: ({rows}, {cols}) built around {r} rows\n\n\
         First {head_rows} rows of the table:\n\
         {head}\n\n\
         Table info:\n\
         {info}",
        summary = findings.summary,
        rows = findings.table.num_rows(),
        cols = findings.table.num_columns(),
        r = group_thousands(findings.row_count as u64),
        head = table_head(&findings.table, head_rows)?,
        info = TableInfo(&findings.table),
    ))
}

/// Output locations followed by the class breakdown.
pub fn outputs_text(findings: &Findings, outputs: &Outputs) -> String {
    format!(
        "\n{}\nClass summary:\n{}",
        OutputSummary(outputs),
        ClassBreakdown(&findings.frequencies)
    )
}

/// The complete console report of a run.
pub fn report_text(report: &AnalysisReport, head_rows: usize) -> Result<String> {
    Ok(format!(
        "Loaded {}\n{}{}",
        report.source.display(),
        findings_text(&report.findings, head_rows)?,
        outputs_text(&report.findings, &report.outputs)
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{ArrayCollection, ElementType, NamedArray};
    use crate::error::AnalysisError;
    use crate::data::reshape::reshape;

    #[test]
    fn thousands_are_grouped() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1000), "1,000");
        assert_eq!(group_thousands(1_808_331), "1,808,331");
    }

    #[test]
    fn breakdown_lists_classes_in_order() {
        let freq = LabelFrequencies::from_values([2.0, 0.0, 0.0, 1.0]);
        let text = ClassBreakdown(&freq).to_string();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains("Class  0:") && lines[0].contains("(50.0%)"));
        assert!(lines[2].contains("Class  2:") && lines[2].contains("(25.0%)"));
    }

    #[test]
    fn breakdown_shares_sum_to_one_hundred() {
        let freq = LabelFrequencies::from_values((0..7).map(|i| (i % 3) as f64));
        let total: f64 = ClassBreakdown(&freq)
            .to_string()
            .lines()
            .map(|l| {
                let pct = &l[l.rfind('(').unwrap() + 1..l.rfind('%').unwrap()];
                pct.parse::<f64>().unwrap()
            })
            .sum();
        assert!((total - 100.0).abs() < 0.2, "shares add up to {total}");
    }

    #[test]
    fn head_and_info_describe_table() {
        let mut c = ArrayCollection::new();
        c.insert(NamedArray::column_vector(
            "stimulus",
            ElementType::UInt8,
            (0..10).map(|i| i as f64).collect(),
        ))
        .unwrap();
        let batch = reshape(&c, 10).unwrap();

        let head = table_head(&batch, 5).unwrap();
        assert!(head.contains("stimulus"));
        assert!(head.contains("| 4 "));
        assert!(!head.contains("| 5 "));

        let info = TableInfo(&batch).to_string();
        assert!(info.contains("10 entries, 0 to 9"));
        assert!(info.contains("total 1 columns"));
        assert!(info.contains("UInt8"));
    }

    #[test]
    fn empty_table_head() {
        let batch = reshape(&ArrayCollection::new(), 3).unwrap();
        assert_eq!(table_head(&batch, 5).unwrap(), "(empty table)");
        let info = TableInfo(&batch).to_string();
        assert!(info.starts_with("RecordBatch: 0 entries\n"));
        assert!(!info.contains("0 to"));
    }

    #[test]
    fn failed_outputs_are_listed_with_their_error() {
        let outputs = Outputs {
            exported_table: Some(Err(AnalysisError::UnsupportedFormat(
                "cannot export to .xlsx".into(),
            ))),
            signal_plot: Ok(PathBuf::from("out/emg_stimulus.png")),
            distribution_plot: Err(AnalysisError::Render("disk full".into())),
        };
        let text = OutputSummary(&outputs).to_string();
        assert!(text.contains("Table export not written: unsupported format"));
        assert!(text.contains("Signal chart saved to out/emg_stimulus.png"));
        assert!(text.contains("Distribution chart not written: rendering failed: disk full"));
    }
}
