/// Data layer: core types, loading, reshaping, summarizing and export.
///
/// Architecture:
/// ```text
///        .mat
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file → ArrayCollection (drops "__" keys)
///   └──────────┘
///        │
///        ├──────────────► summary   shapes, duration, class count
///        ▼
///   ┌──────────┐
///   │  reshape  │  arrays with R rows → RecordBatch (one column per channel)
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  export   │  RecordBatch → .parquet / .csv
///   └──────────┘
/// ```

pub mod export;
pub mod loader;
pub mod matfile;
pub mod model;
pub mod reshape;
pub mod summary;
