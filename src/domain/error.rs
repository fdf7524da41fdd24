use thiserror::Error;

/// Option constraint violations, in the order `DiagramOptions::validate` checks them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid dark theme (empty string)")]
    EmptyDarkTheme,
    #[error("invalid layout engine (empty string)")]
    EmptyLayoutEngine,
    #[error("layout engine must be elk or dagre")]
    UnsupportedLayoutEngine,
    #[error("invalid light theme (empty string)")]
    EmptyLightTheme,
    #[error("padding must be an integer between 0 and 1000 inclusive")]
    PaddingOutOfRange,
    #[error("scale must be greater than 0 and less than or equal to 100")]
    ScaleOutOfRange,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ThemeLookupError {
    #[error("cannot resolve an empty string to a theme ID")]
    Empty,
    #[error("theme does not exist: {0}")]
    Unknown(String),
}
