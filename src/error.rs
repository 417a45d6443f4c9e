//! Error types for the format analyzer and code generator

use thiserror::Error;

/// Result type for analysis and generation operations
pub type AnalyzerResult<T> = Result<T, AnalyzerError>;

/// Analysis and generation errors
///
/// Pattern-match misses are not errors; strategies signal them with `None`
/// and the orchestrator falls through to the next strategy.
#[derive(Debug, Error)]
pub enum AnalyzerError {
    #[error("Expression error: {message}")]
    Expression { message: String },

    #[error("Format analysis error: {message}")]
    FormatAnalysis { message: String },

    #[error("Name conflict: loop counter {name} shadows a declared name")]
    NameConflict { name: String },

    #[error("Generation error: {message}")]
    Generation { message: String },
}

impl AnalyzerError {
    pub fn expression(msg: impl Into<String>) -> Self {
        AnalyzerError::Expression { message: msg.into() }
    }

    pub fn format_analysis(msg: impl Into<String>) -> Self {
        AnalyzerError::FormatAnalysis { message: msg.into() }
    }

    pub fn name_conflict(name: impl Into<String>) -> Self {
        AnalyzerError::NameConflict { name: name.into() }
    }

    pub fn generation(msg: impl Into<String>) -> Self {
        AnalyzerError::Generation { message: msg.into() }
    }
}
