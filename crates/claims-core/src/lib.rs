//! Shared building blocks for the claims pipeline.
//!
//! Holds the in-memory table model, column alias resolution, parse-or-null
//! coercion, statistics and formatting helpers, configuration and the error
//! types used by every other crate in the workspace.

pub mod coerce;
pub mod columns;
pub mod config;
pub mod error;
pub mod formatting;
pub mod settings;
pub mod stats;
pub mod table;

pub use columns::{resolve, ColumnSpec};
pub use config::{AnalysisConfig, PipelineConfig, QualityConfig};
pub use error::{ClaimsError, IntegrityError, Result};
pub use table::{Cell, TabularOutput, Table};
