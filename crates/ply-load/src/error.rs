use thiserror::Error;

/// Error types for suite loading.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LoadError {
    /// Document parsed to something other than a mapping, or not at all.
    #[error("bad ply flow: {path}")]
    BadFlowDocument { path: String },

    #[error("bad ply request: {path}")]
    BadRequestDocument { path: String },

    #[error("bad ply values: {path}")]
    BadValuesDocument { path: String },

    #[error("error reading: {path}")]
    Io { path: String },

    #[error("invalid file pattern: {pattern}")]
    Pattern { pattern: String },
}

pub type Result<T, E = error_stack::Report<LoadError>> = std::result::Result<T, E>;
