use std::path::{Path, PathBuf};
use thiserror::Error;

/// Aggregated integrity-check failure.
///
/// Carries every failed rule from one pass over the raw table together with
/// the diagnostic files that were written before the failure was raised.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{}", render_integrity(.failures, .missingness_path, .profile_path))]
pub struct IntegrityError {
    /// One human-readable message per failed rule, in evaluation order.
    pub failures: Vec<String>,
    /// Location of the missingness diagnostic.
    pub missingness_path: PathBuf,
    /// Location of the basic profile diagnostic.
    pub profile_path: PathBuf,
}

/// Failure list followed by the next steps for the operator.
fn render_integrity(failures: &[String], missingness_path: &Path, profile_path: &Path) -> String {
    let mut lines = vec!["Integrity checks failed:".to_string()];
    lines.extend(failures.iter().map(|failure| format!("- {failure}")));
    lines.push(String::new());
    lines.push("Next steps:".into());
    lines.push(format!(
        "- Review {} for missing fields",
        missingness_path.display()
    ));
    lines.push(format!("- Review {} for basic stats", profile_path.display()));
    lines.push(
        "- Fix the input file (or update required columns) and re-run `claims-pipeline`".into(),
    );
    lines.join("\n")
}

/// All errors produced by the claims pipeline.
#[derive(Error, Debug)]
pub enum ClaimsError {
    /// A file could not be opened or read from disk.
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A CSV document could not be parsed or written.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A JSON document could not be parsed or written.
    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// No input dataset was given and none of the default names exist.
    #[error("No input CSV found: {0}")]
    InputNotFound(String),

    /// The raw table failed one or more integrity rules.
    #[error(transparent)]
    Integrity(#[from] IntegrityError),

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Pass-through for any raw I/O error that does not carry a path.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Convenience alias used throughout the claims crates.
pub type Result<T> = std::result::Result<T, ClaimsError>;
