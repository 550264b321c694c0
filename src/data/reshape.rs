use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use arrow::array::{
    Array, ArrayRef, AsArray, BooleanArray, Float32Array, Float64Array, Int16Array, Int32Array,
    Int64Array, Int8Array, UInt16Array, UInt32Array, UInt64Array, UInt8Array,
};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Field, Float64Type, Schema};
use arrow::record_batch::RecordBatch;
use log::debug;

use super::model::{ArrayCollection, ElementType, NamedArray};
use crate::error::{AnalysisError, Result};

// ---------------------------------------------------------------------------
// Row count selection
// ---------------------------------------------------------------------------

/// Pick the row count the table is built around.
///
/// The first array of `preferred` present in the collection decides. Without
/// one, the most common first dimension wins, ties going to the larger count.
pub fn dominant_row_count(arrays: &ArrayCollection, preferred: &[&str]) -> Option<usize> {
    if let Some(array) = preferred.iter().find_map(|name| arrays.get(name)) {
        return Some(array.rows());
    }
    let mut tally: BTreeMap<usize, usize> = BTreeMap::new();
    for array in arrays {
        *tally.entry(array.rows()).or_default() += 1;
    }
    tally
        .into_iter()
        .max_by(|(rows_a, n_a), (rows_b, n_b)| n_a.cmp(n_b).then(rows_a.cmp(rows_b)))
        .map(|(rows, _)| rows)
}

// ---------------------------------------------------------------------------
// Reshaping
// ---------------------------------------------------------------------------

/// Name of output column `c` (0-based) of an array with `cols` columns.
pub fn column_name(array_name: &str, c: usize, cols: usize) -> String {
    if cols == 1 {
        array_name.to_string()
    } else {
        format!("{array_name}_{}", c + 1)
    }
}

/// Flatten every array with exactly `target_rows` rows into one table.
///
/// Arrays are visited in collection order and their columns in ascending
/// order. Arrays with a different row count are left out. When nothing
/// matches the result has no columns.
pub fn reshape(arrays: &ArrayCollection, target_rows: usize) -> Result<RecordBatch> {
    let mut fields = Vec::new();
    let mut columns: Vec<ArrayRef> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    for array in arrays {
        if array.rows() != target_rows {
            debug!(
                "excluding '{}' {}: expected {target_rows} rows",
                array.name,
                array.shape_string()
            );
            continue;
        }
        let cols = array.cols();
        for c in 0..cols {
            let name = column_name(&array.name, c, cols);
            if !seen.insert(name.clone()) {
                return Err(AnalysisError::DuplicateColumn(name));
            }
            let column = to_arrow(array, c)?;
            fields.push(Field::new(name, column.data_type().clone(), false));
            columns.push(column);
        }
    }

    if columns.is_empty() {
        return Ok(RecordBatch::new_empty(Arc::new(Schema::empty())));
    }
    build_batch(fields, columns)
}

/// Assemble a batch, failing on columns of unequal length.
pub fn build_batch(fields: Vec<Field>, columns: Vec<ArrayRef>) -> Result<RecordBatch> {
    let schema = Arc::new(Schema::new(fields));
    RecordBatch::try_new(schema, columns)
        .map_err(|e| AnalysisError::SchemaMismatch(e.to_string()))
}

/// Column `c` of `array` as an Arrow array of the matching type.
fn to_arrow(array: &NamedArray, c: usize) -> Result<ArrayRef> {
    let values = array.column(c).ok_or_else(|| {
        AnalysisError::SchemaMismatch(format!("'{}' has no column {}", array.name, c + 1))
    })?;
    let iter = values.iter().copied();
    let column: ArrayRef = match array.element_type {
        ElementType::Float64 => Arc::new(Float64Array::from(values.to_vec())),
        ElementType::Float32 => Arc::new(Float32Array::from_iter_values(iter.map(|v| v as f32))),
        ElementType::Int8 => Arc::new(Int8Array::from_iter_values(iter.map(|v| v as i8))),
        ElementType::UInt8 => Arc::new(UInt8Array::from_iter_values(iter.map(|v| v as u8))),
        ElementType::Int16 => Arc::new(Int16Array::from_iter_values(iter.map(|v| v as i16))),
        ElementType::UInt16 => Arc::new(UInt16Array::from_iter_values(iter.map(|v| v as u16))),
        ElementType::Int32 => Arc::new(Int32Array::from_iter_values(iter.map(|v| v as i32))),
        ElementType::UInt32 => Arc::new(UInt32Array::from_iter_values(iter.map(|v| v as u32))),
        ElementType::Int64 => Arc::new(Int64Array::from_iter_values(iter.map(|v| v as i64))),
        ElementType::UInt64 => Arc::new(UInt64Array::from_iter_values(iter.map(|v| v as u64))),
        ElementType::Bool => Arc::new(BooleanArray::from(
            iter.map(|v| v != 0.0).collect::<Vec<bool>>(),
        )),
    };
    Ok(column)
}

// -- Reading columns back --

/// The first `limit` values of column `name` as `f64`, or `None` if the table
/// has no such column.
pub fn column_values(batch: &RecordBatch, name: &str, limit: usize) -> Result<Option<Vec<f64>>> {
    let Some(column) = batch.column_by_name(name) else {
        return Ok(None);
    };
    let window = column.slice(0, limit.min(column.len()));
    let as_f64 = cast(&window, &DataType::Float64)?;
    let values = as_f64.as_primitive::<Float64Type>();
    Ok(Some(values.iter().map(|v| v.unwrap_or(f64::NAN)).collect()))
}
