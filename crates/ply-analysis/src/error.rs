use thiserror::Error;

/// Error types for flow analysis.
///
/// Structural oddities in a graph (missing start step, dangling link target,
/// unreachable step) are normalized away rather than reported here; only
/// genuinely malformed input errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AnalysisError {
    #[error("malformed {attribute} attribute in {path}")]
    MalformedAttribute { attribute: String, path: String },
}

pub type Result<T, E = error_stack::Report<AnalysisError>> = std::result::Result<T, E>;
