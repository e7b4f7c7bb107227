/// Data layer: core types, loading, channel selection and export.
///
/// Architecture:
/// ```text
///  .txt / .csv / .json        .quad
///        │                      │
///        ▼                      ▼
///   ┌──────────┐          ┌──────────┐
///   │  loader   │          │  loader   │
///   └──────────┘          └──────────┘
///        │                      │
///        ▼                      ▼
///   Measurements           QuadProfile ──► sampler (draw at input %)
///        │                      │
///        └──────► solver ◄──────┘
///                   │
///                   ▼
///   ┌──────────┐  ┌──────────┐
///   │  filter   │  │  export   │  json / csv / parquet
///   └──────────┘  └──────────┘
/// ```

pub mod error;
pub mod export;
pub mod filter;
pub mod loader;
pub mod model;
pub mod sampler;
