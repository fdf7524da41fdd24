use thiserror::Error;

use crate::domain::{
    artifact::SvgArtifact, error::ThemeLookupError, options::DiagramOptions,
};

/// Turns diagram source plus fully-resolved options into an artifact.
///
/// Implementations must be deterministic: the cache assumes identical inputs
/// always yield identical output.
pub trait DiagramRenderer: Send + Sync {
    fn render(&self, source: &str, options: &DiagramOptions) -> Result<SvgArtifact, RenderError>;
}

/// Renderer failures. Causes are flattened to strings so the error can be
/// cloned to every caller sharing a computation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    #[error("d2 CLI unavailable at {path}: {message}")]
    NotFound { path: String, message: String },
    #[error("renderer I/O failure: {message}")]
    Io { message: String },
    #[error("d2 CLI invocation failed (exit {exit_code:?}): {stderr}")]
    Cli {
        exit_code: Option<i32>,
        stderr: String,
    },
    #[error("malformed SVG output: {message}")]
    Svg { message: String },
    #[error("failed to minify SVG body: {message}")]
    Minify { message: String },
    #[error(transparent)]
    Theme(#[from] ThemeLookupError),
}

impl RenderError {
    pub(crate) fn io(err: impl ToString) -> Self {
        Self::Io {
            message: err.to_string(),
        }
    }

    pub(crate) fn svg(message: impl Into<String>) -> Self {
        Self::Svg {
            message: message.into(),
        }
    }
}
