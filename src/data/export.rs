use std::fs::File;
use std::path::Path;

use arrow::record_batch::RecordBatch;
use arrow::util::display::{ArrayFormatter, FormatOptions};
use log::info;
use parquet::arrow::ArrowWriter;

use crate::error::{AnalysisError, Result};

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Write the flattened table to a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.parquet` – one row group, schema taken from the batch
/// * `.csv`     – header row with column names, one line per sample
pub fn export_table(batch: &RecordBatch, path: &Path) -> Result<()> {
    if batch.num_columns() == 0 {
        return Err(AnalysisError::EmptyInput(
            "the flattened table has no columns to export".into(),
        ));
    }
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "parquet" | "pq" => write_parquet(batch, path)?,
        "csv" => write_csv(batch, path)?,
        other => {
            return Err(AnalysisError::UnsupportedFormat(format!(
                "cannot export to .{other}"
            )))
        }
    }
    info!(
        "exported {} rows x {} columns to {}",
        batch.num_rows(),
        batch.num_columns(),
        path.display()
    );
    Ok(())
}

fn write_parquet(batch: &RecordBatch, path: &Path) -> Result<()> {
    let file = File::create(path).map_err(|e| AnalysisError::io(path, e))?;
    let mut writer = ArrowWriter::try_new(file, batch.schema(), None)?;
    writer.write(batch)?;
    writer.close()?;
    Ok(())
}

fn write_csv(batch: &RecordBatch, path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    let schema = batch.schema();
    writer.write_record(schema.fields().iter().map(|f| f.name()))?;

    let options = FormatOptions::default();
    let formatters = batch
        .columns()
        .iter()
        .map(|c| ArrayFormatter::try_new(c.as_ref(), &options))
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut record = Vec::with_capacity(formatters.len());
    for row in 0..batch.num_rows() {
        record.clear();
        record.extend(formatters.iter().map(|f| f.value(row).to_string()));
        writer.write_record(&record)?;
    }
    writer.flush().map_err(|e| AnalysisError::io(path, e))?;
    Ok(())
}
