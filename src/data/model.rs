use std::collections::BTreeMap;
use std::fmt;

use crate::error::{AnalysisError, Result};

// ---------------------------------------------------------------------------
// ElementType – storage class of a named array
// ---------------------------------------------------------------------------

/// Numeric element type of a loaded array, named the way NumPy names dtypes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementType {
    Float64,
    Float32,
    Int8,
    UInt8,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
    /// MATLAB `logical`.
    Bool,
}

impl ElementType {
    pub fn name(self) -> &'static str {
        match self {
            ElementType::Float64 => "float64",
            ElementType::Float32 => "float32",
            ElementType::Int8 => "int8",
            ElementType::UInt8 => "uint8",
            ElementType::Int16 => "int16",
            ElementType::UInt16 => "uint16",
            ElementType::Int32 => "int32",
            ElementType::UInt32 => "uint32",
            ElementType::Int64 => "int64",
            ElementType::UInt64 => "uint64",
            ElementType::Bool => "bool",
        }
    }

    /// Whether values of this type are whole numbers.
    pub fn is_integral(self) -> bool {
        !matches!(self, ElementType::Float64 | ElementType::Float32)
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Product of `dims`, or `None` if any partial product overflows `usize`.
/// Trailing dimensions are checked on their own too, so a leading zero
/// cannot hide an overflowing column count.
pub fn element_count(dims: &[usize]) -> Option<usize> {
    let cols = dims
        .iter()
        .skip(1)
        .try_fold(1usize, |acc, &d| acc.checked_mul(d))?;
    dims.first().copied().unwrap_or(1).checked_mul(cols)
}

// ---------------------------------------------------------------------------
// NamedArray – one variable of the container
// ---------------------------------------------------------------------------

/// A named 2-D numeric array.
///
/// Values are stored column-major (the MATLAB layout), so every source column
/// is a contiguous slice. Arrays with more than two dimensions keep their full
/// `dims` for reporting; for reshaping the trailing dimensions are folded into
/// `cols`.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedArray {
    pub name: String,
    pub dims: Vec<usize>,
    pub element_type: ElementType,
    values: Vec<f64>,
}

impl NamedArray {
    /// Build an array, checking that `values` fills `dims` exactly.
    pub fn new(
        name: impl Into<String>,
        dims: Vec<usize>,
        element_type: ElementType,
        values: Vec<f64>,
    ) -> Result<Self> {
        let name = name.into();
        let Some(expected) = element_count(&dims) else {
            return Err(AnalysisError::SchemaMismatch(format!(
                "array '{name}' has dims {dims:?}, too many elements to address"
            )));
        };
        if dims.is_empty() || expected != values.len() {
            return Err(AnalysisError::SchemaMismatch(format!(
                "array '{name}' has dims {dims:?} but {} values",
                values.len()
            )));
        }
        Ok(NamedArray {
            name,
            dims,
            element_type,
            values,
        })
    }

    /// Build a `rows × cols` array from row-major rows.
    pub fn from_rows(
        name: impl Into<String>,
        element_type: ElementType,
        rows: &[Vec<f64>],
    ) -> Result<Self> {
        let name = name.into();
        let n_rows = rows.len();
        let n_cols = rows.first().map_or(0, Vec::len);
        if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != n_cols) {
            return Err(AnalysisError::SchemaMismatch(format!(
                "array '{name}': row {i} has {} values, expected {n_cols}",
                row.len()
            )));
        }
        let mut values = Vec::with_capacity(n_rows * n_cols);
        for c in 0..n_cols {
            values.extend(rows.iter().map(|r| r[c]));
        }
        Self::new(name, vec![n_rows, n_cols], element_type, values)
    }

    /// Build a single-column array.
    pub fn column_vector(
        name: impl Into<String>,
        element_type: ElementType,
        values: Vec<f64>,
    ) -> Self {
        let rows = values.len();
        NamedArray {
            name: name.into(),
            dims: vec![rows, 1],
            element_type,
            values,
        }
    }

    /// Build a 1×1 array.
    pub fn scalar(name: impl Into<String>, element_type: ElementType, value: f64) -> Self {
        NamedArray {
            name: name.into(),
            dims: vec![1, 1],
            element_type,
            values: vec![value],
        }
    }

    /// First dimension.
    pub fn rows(&self) -> usize {
        self.dims.first().copied().unwrap_or(0)
    }

    /// Product of every dimension after the first.
    pub fn cols(&self) -> usize {
        if self.dims.len() < 2 {
            1
        } else {
            self.dims[1..].iter().fold(1usize, |acc, &d| acc.saturating_mul(d))
        }
    }

    /// Column `c` (0-based) as a contiguous slice.
    pub fn column(&self, c: usize) -> Option<&[f64]> {
        let rows = self.rows();
        if c >= self.cols() {
            return None;
        }
        self.values.get(c * rows..(c + 1) * rows)
    }

    /// All values in storage (column-major) order.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// The first stored value, used for scalar metadata such as `subject`.
    pub fn first_value(&self) -> Option<f64> {
        self.values.first().copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Shape formatted like a NumPy tuple, e.g. `(1808331, 12)`.
    pub fn shape_string(&self) -> String {
        let dims: Vec<String> = self.dims.iter().map(|d| d.to_string()).collect();
        if dims.len() == 1 {
            format!("({},)", dims[0])
        } else {
            format!("({})", dims.join(", "))
        }
    }
}

// ---------------------------------------------------------------------------
// ArrayCollection – the complete loaded container
// ---------------------------------------------------------------------------

/// Named arrays of one container, in file order, with unique names.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArrayCollection {
    arrays: Vec<NamedArray>,
}

impl ArrayCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an array, rejecting a name that is already present.
    pub fn insert(&mut self, array: NamedArray) -> Result<()> {
        if self.get(&array.name).is_some() {
            return Err(AnalysisError::SchemaMismatch(format!(
                "array '{}' appears more than once",
                array.name
            )));
        }
        self.arrays.push(array);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&NamedArray> {
        self.arrays.iter().find(|a| a.name == name)
    }

    /// Like [`get`](Self::get) but a missing array is an error.
    pub fn require(&self, name: &str) -> Result<&NamedArray> {
        self.get(name)
            .ok_or_else(|| AnalysisError::MissingRequiredField(name.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &NamedArray> {
        self.arrays.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.arrays.iter().map(|a| a.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.arrays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arrays.is_empty()
    }
}

impl<'a> IntoIterator for &'a ArrayCollection {
    type Item = &'a NamedArray;
    type IntoIter = std::slice::Iter<'a, NamedArray>;

    fn into_iter(self) -> Self::IntoIter {
        self.arrays.iter()
    }
}

// ---------------------------------------------------------------------------
// LabelValue – a single class label
// ---------------------------------------------------------------------------

/// A label value compared exactly on its stored bits.
/// Used as a `BTreeMap` key, so it must be `Ord`. `-0.0` is folded into `0.0`
/// and every NaN into one canonical NaN.
#[derive(Debug, Clone, Copy)]
pub struct LabelValue(f64);

impl LabelValue {
    pub fn new(v: f64) -> Self {
        if v == 0.0 {
            LabelValue(0.0)
        } else if v.is_nan() {
            LabelValue(f64::NAN)
        } else {
            LabelValue(v)
        }
    }

    pub fn get(self) -> f64 {
        self.0
    }
}

impl PartialEq for LabelValue {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == std::cmp::Ordering::Equal
    }
}

impl Eq for LabelValue {}

impl PartialOrd for LabelValue {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for LabelValue {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl std::hash::Hash for LabelValue {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.to_bits().hash(state);
    }
}

impl From<f64> for LabelValue {
    fn from(v: f64) -> Self {
        LabelValue::new(v)
    }
}

impl fmt::Display for LabelValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        format_number(self.0, f)
    }
}

/// Whole numbers print without a fractional part, everything else as-is.
fn format_number(v: f64, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e15 {
        match f.width() {
            Some(w) => write!(f, "{:>w$}", v as i64),
            None => write!(f, "{}", v as i64),
        }
    } else {
        match f.width() {
            Some(w) => write!(f, "{v:>w$}"),
            None => write!(f, "{v}"),
        }
    }
}

// ---------------------------------------------------------------------------
// LabelFrequencies – occurrence count per label
// ---------------------------------------------------------------------------

/// Occurrence count of every distinct label value, ascending by value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelFrequencies {
    counts: BTreeMap<LabelValue, u64>,
    total: u64,
}

impl LabelFrequencies {
    /// Count each value exactly once.
    pub fn from_values<I>(values: I) -> Self
    where
        I: IntoIterator<Item = f64>,
    {
        let mut counts: BTreeMap<LabelValue, u64> = BTreeMap::new();
        let mut total = 0u64;
        for v in values {
            *counts.entry(LabelValue::new(v)).or_default() += 1;
            total += 1;
        }
        LabelFrequencies { counts, total }
    }

    pub fn count(&self, value: f64) -> u64 {
        self.counts.get(&LabelValue::new(value)).copied().unwrap_or(0)
    }

    /// Share of `value` in percent of all counted samples.
    pub fn percentage(&self, value: f64) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.count(value) as f64 / self.total as f64 * 100.0
    }

    /// Sum of all counts (the flattened input length).
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Number of distinct labels.
    pub fn distinct(&self) -> usize {
        self.counts.len()
    }

    pub fn max_count(&self) -> u64 {
        self.counts.values().copied().max().unwrap_or(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (LabelValue, u64)> + '_ {
        self.counts.iter().map(|(k, v)| (*k, *v))
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}
