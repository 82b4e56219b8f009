use std::path::PathBuf;

use thiserror::Error;

/// All errors produced by the survey pipelines.
#[derive(Error, Debug)]
pub enum SurveyError {
    /// The source file is missing, unreadable or structurally malformed.
    #[error("Source unavailable at {path}: {reason}")]
    SourceUnavailable { path: PathBuf, reason: String },

    /// One or more fixed columns are absent from the loaded table.
    #[error("Schema mismatch in {path}: missing column(s) {}", .missing.join(", "))]
    SchemaMismatch { path: PathBuf, missing: Vec<String> },

    /// Expansion was requested on a column that does not hold lists.
    #[error("Column '{column}' does not hold list values (found {found})")]
    InvalidListColumn { column: String, found: String },

    /// A mean was requested over a column with no non-null numeric values.
    #[error("Mean of column '{column}' is undefined: no numeric values")]
    UndefinedAggregate { column: String },

    /// A ranking was requested over a column with no non-null values.
    #[error("Column '{column}' has no values to rank")]
    EmptyDomain { column: String },

    /// A filter expression supplied by the caller could not be understood.
    #[error("Invalid filter: {0}")]
    InvalidFilter(String),
}

impl SurveyError {
    /// Whether the caller should render a placeholder instead of failing.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            SurveyError::UndefinedAggregate { .. } | SurveyError::EmptyDomain { .. }
        )
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, SurveyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_schema_mismatch() {
        let err = SurveyError::SchemaMismatch {
            path: PathBuf::from("survey.csv"),
            missing: vec!["sex".to_string(), "country".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "Schema mismatch in survey.csv: missing column(s) sex, country"
        );
    }

    #[test]
    fn test_error_display_invalid_list_column() {
        let err = SurveyError::InvalidListColumn {
            column: "country".to_string(),
            found: "string".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Column 'country' does not hold list values (found string)"
        );
    }

    #[test]
    fn test_recoverable_errors() {
        assert!(SurveyError::UndefinedAggregate { column: "x".into() }.is_recoverable());
        assert!(SurveyError::EmptyDomain { column: "x".into() }.is_recoverable());
        assert!(!SurveyError::SourceUnavailable {
            path: PathBuf::from("a.csv"),
            reason: "gone".into(),
        }
        .is_recoverable());
    }
}
