//! Data layer: core types, loading, derivation, filtering and aggregation.
//!
//! Architecture:
//! ```text
//!  .csv / .json / .parquet
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  loader   │  parse file → Table
//!   └──────────┘
//!        │
//!        ├───────────────┐
//!        ▼               ▼
//!   ┌──────────┐   ┌──────────┐
//!   │  derive   │   │  expand   │  age / age_group  |  one row per quality
//!   └──────────┘   └──────────┘
//!        │               │
//!        ▼               ▼
//!   ┌──────────┐
//!   │  filter   │  apply column predicates → filtered Table
//!   └──────────┘
//!        │
//!        ▼
//!   ┌───────────┐
//!   │ aggregate  │  means, value counts, long-format group views
//!   └───────────┘
//! ```

pub mod aggregate;
pub mod derive;
pub mod expand;
pub mod filter;
pub mod loader;
pub mod model;
pub mod schema;
pub mod survey;
