use std::path::Path;

use log::{debug, info};

use super::matfile;
use super::model::{ArrayCollection, NamedArray};
use crate::error::{AnalysisError, Result};

/// Keys with this prefix are container metadata, not data.
pub const RESERVED_PREFIX: &str = "__";

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a recording from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.mat` – MATLAB level-5 MAT-file (v5/v6 uncompressed, v7 compressed)
pub fn load_file(path: &Path) -> Result<ArrayCollection> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "mat" => load_mat(path),
        other => Err(AnalysisError::UnsupportedFormat(format!(
            "unsupported file extension: .{other}"
        ))),
    }
}

/// Write arrays to a `.mat` file.
pub fn save_mat<'a, I>(path: &Path, arrays: I, compress: bool) -> Result<()>
where
    I: IntoIterator<Item = &'a NamedArray>,
{
    let bytes = matfile::encode(arrays, compress)?;
    std::fs::write(path, bytes).map_err(|e| AnalysisError::io(path, e))?;
    info!("wrote {}", path.display());
    Ok(())
}

// ---------------------------------------------------------------------------
// MAT loader
// ---------------------------------------------------------------------------

fn load_mat(path: &Path) -> Result<ArrayCollection> {
    let bytes = std::fs::read(path).map_err(|e| AnalysisError::io(path, e))?;
    debug!(
        "{}: {} bytes, header '{}'",
        path.display(),
        bytes.len(),
        matfile::header_text(&bytes)
    );

    let collection = collect_arrays(matfile::parse(&bytes)?)?;
    if collection.is_empty() {
        return Err(AnalysisError::EmptyInput(format!(
            "{} holds no numeric arrays",
            path.display()
        )));
    }
    info!(
        "loaded {} arrays from {}",
        collection.len(),
        path.display()
    );
    Ok(collection)
}

/// Build a collection, dropping reserved metadata keys.
pub fn collect_arrays<I>(arrays: I) -> Result<ArrayCollection>
where
    I: IntoIterator<Item = NamedArray>,
{
    let mut collection = ArrayCollection::new();
    for array in arrays {
        if array.name.starts_with(RESERVED_PREFIX) {
            debug!("dropping reserved key '{}'", array.name);
            continue;
        }
        collection.insert(array)?;
    }
    Ok(collection)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::ElementType;

    #[test]
    fn reserved_keys_are_dropped() {
        let arrays = vec![
            NamedArray::scalar("__version__", ElementType::Float64, 1.0),
            NamedArray::scalar("subject", ElementType::UInt8, 1.0),
        ];
        let c = collect_arrays(arrays).unwrap();
        let names: Vec<&str> = c.names().collect();
        assert_eq!(names, vec!["subject"]);
    }

    #[test]
    fn unknown_extension_is_unsupported() {
        let err = load_file(Path::new("recording.csv")).unwrap_err();
        assert!(matches!(err, AnalysisError::UnsupportedFormat(_)));
    }

    #[test]
    fn missing_file_is_file_not_found() {
        let err = load_file(Path::new("/definitely/not/here.mat")).unwrap_err();
        assert!(matches!(err, AnalysisError::FileNotFound { .. }));
    }

    #[test]
    fn container_without_arrays_is_empty_input() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.mat");
        save_mat(&path, std::iter::empty(), false).unwrap();
        let err = load_file(&path).unwrap_err();
        assert!(matches!(err, AnalysisError::EmptyInput(_)));
    }

    #[test]
    fn extension_match_is_case_insensitive() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("S1_E1_A1.MAT");
        let arr = NamedArray::column_vector("stimulus", ElementType::UInt8, vec![0.0, 1.0]);
        save_mat(&path, [&arr], true).unwrap();
        let c = load_file(&path).unwrap();
        assert_eq!(c.get("stimulus"), Some(&arr));
    }
}
