//! Error types for the asyncify pipeline.

use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by the analysis and transformation jobs.
///
/// Unresolved symbols and missing graph entities are skipped silently
/// inside the pipeline (the graph is simply sparser), so no variants exist
/// for them. Invalid input and compilation failures are surfaced as
/// warnings carrying these kinds; the file (or project) is skipped and the
/// job continues.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid input in {path}: {message}")]
    InvalidInput { path: PathBuf, message: String },

    #[error("operation cancelled")]
    Cancelled,

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("compilation produced no analyzable sources: {0}")]
    CompilationFailure(String),

    #[error(transparent)]
    Syntax(#[from] asyncify_syntax::SyntaxError),

    #[error(transparent)]
    Store(#[from] asyncify_graph::StoreError),

    #[error("background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl From<asyncify_analysis::AnalysisError> for Error {
    fn from(err: asyncify_analysis::AnalysisError) -> Self {
        match err {
            asyncify_analysis::AnalysisError::Cancelled => Error::Cancelled,
        }
    }
}

impl Error {
    /// Cancellation is reported distinctly from failure by the job layer.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Error::Cancelled)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancelled_is_distinct_from_failure() {
        assert!(Error::Cancelled.is_cancellation());
        assert!(!Error::CompilationFailure("empty".into()).is_cancellation());
    }

    #[test]
    fn test_analysis_error_converts_to_cancelled() {
        let err: Error = asyncify_analysis::AnalysisError::Cancelled.into();
        assert!(err.is_cancellation());
    }

    #[test]
    fn test_io_error_display_includes_path() {
        let err = Error::Io {
            path: PathBuf::from("src/a.cs"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        };
        assert!(err.to_string().contains("src/a.cs"));
    }
}
