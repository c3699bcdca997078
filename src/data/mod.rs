/// Data layer: core types, loading, QC normalization and filtering.
///
/// Architecture:
/// ```text
///  .csv / .parquet   (local path or http(s) URL)
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  fetch + parse, schema check → Dataset
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │    qc     │  acceptable raw flag codes → 1
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  keep records with any tracked flag == 1
///   └──────────┘
///        │
///        ▼
///    plots / export
/// ```

pub mod error;
pub mod export;
pub mod fetch;
pub mod filter;
pub mod loader;
pub mod model;
pub mod pipeline;
pub mod qc;
pub mod schema;
