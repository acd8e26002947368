/// Data layer: core types, loading, filtering and summaries.
///
/// Architecture:
/// ```text
///  upload bytes / .csv / .json / .parquet
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse → Dataset (+ raw bytes)
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  Dataset  │  Vec<Column>, inferred ColumnKind
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  apply predicates → FilteredView (row indices)
///   └──────────┘
///        │
///        ▼
///   columns (salary resolver) · stats (counts, quantiles, describe)
/// ```

pub mod columns;
pub mod filter;
pub mod loader;
pub mod model;
pub mod preview;
pub mod stats;
