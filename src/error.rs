// src/error.rs

use thiserror::Error;

pub type Result<T> = std::result::Result<T, AnalysisError>;

/// Everything that can go wrong while attributing a commit range.
///
/// Only revision resolution (and the setup errors around it) ends a run.
/// Diff parse errors end the analysis of one commit, extraction errors degrade
/// one file, and attribution inconsistencies are never raised at all.
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("cannot resolve revision '{spec}': {message}")]
    RevisionResolution { spec: String, message: String },

    #[error("malformed diff for {file}: {message}")]
    DiffParse { file: String, message: String },

    #[error("symbol extraction failed for {file}: {message}")]
    SymbolExtraction { file: String, message: String },

    #[error("line {line} of {file} is past the end of the file ({line_count} lines)")]
    AttributionInconsistency {
        file: String,
        line: u32,
        line_count: u32,
    },

    #[error("no repository at {path}: {message}")]
    RepositoryNotFound { path: String, message: String },

    #[error("no ctags executable found (tried {tried})")]
    TaggerNotFound { tried: String },

    #[error("git error: {0}")]
    Git(#[from] git2::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
}

impl AnalysisError {
    pub fn revision(spec: impl Into<String>, message: impl Into<String>) -> Self {
        Self::RevisionResolution {
            spec: spec.into(),
            message: message.into(),
        }
    }

    pub fn diff_parse(file: impl Into<String>, message: impl Into<String>) -> Self {
        Self::DiffParse {
            file: file.into(),
            message: message.into(),
        }
    }

    pub fn extraction(file: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SymbolExtraction {
            file: file.into(),
            message: message.into(),
        }
    }

    /// Errors that leave nothing to analyse and must stop the whole run.
    pub fn is_fatal_for_run(&self) -> bool {
        matches!(
            self,
            Self::RevisionResolution { .. }
                | Self::RepositoryNotFound { .. }
                | Self::TaggerNotFound { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatality_follows_propagation_policy() {
        assert!(AnalysisError::revision("nope", "not found").is_fatal_for_run());
        let missing = AnalysisError::RepositoryNotFound {
            path: "/tmp/x".to_string(),
            message: "not a repository".to_string(),
        };
        assert!(missing.is_fatal_for_run());
        assert!(!AnalysisError::diff_parse("a.c", "bad header").is_fatal_for_run());
        assert!(!AnalysisError::extraction("a.c", "exit 1").is_fatal_for_run());
    }

    #[test]
    fn test_messages_name_the_file() {
        let err = AnalysisError::diff_parse("src/main.c", "hunk ended early");
        assert_eq!(err.to_string(), "malformed diff for src/main.c: hunk ended early");
    }
}
