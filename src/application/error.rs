use std::path::PathBuf;

use thiserror::Error;

use crate::{
    application::render::RenderError,
    cache::{CodecError, StoreError},
    config::LoadError,
    domain::error::{ThemeLookupError, ValidationError},
    infra::error::InfraError,
};

/// Malformed call-site arguments, reported before any option is resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ArgumentError {
    #[error("requires 1 or 2 arguments")]
    Arity,
    #[error("first argument must be a string")]
    SourceNotString,
    #[error("second argument must be a map of options")]
    OptionsNotMap,
    #[error("invalid markup (empty string)")]
    EmptySource,
}

/// Everything that can go wrong producing one diagram.
///
/// `Clone` so that callers waiting on an in-flight computation receive the
/// leader's failure verbatim.
#[derive(Debug, Clone, Error)]
pub enum DiagramError {
    #[error(transparent)]
    Argument(#[from] ArgumentError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    ThemeLookup(#[from] ThemeLookupError),
    #[error("option `{field}`: expected {expected}, found {found}")]
    OptionDecode {
        field: &'static str,
        expected: &'static str,
        found: String,
    },
    #[error("option `{field}` given twice, as `{first}` and `{second}`")]
    DuplicateOption {
        field: &'static str,
        first: String,
        second: String,
    },
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error(transparent)]
    Storage(#[from] StoreError),
    #[error("failed to encode diagram artifact: {0}")]
    Encode(CodecError),
    #[error("cache entry {key} is corrupt: {source}")]
    Corrupt {
        key: String,
        #[source]
        source: CodecError,
    },
    #[error("computation for {key} was interrupted before completing")]
    Interrupted { key: String },
    #[error("unable to find {name}: searched {}", display_paths(.searched))]
    SpecFileNotFound { name: String, searched: Vec<PathBuf> },
    #[error("failed to read {}: {message}", .path.display())]
    SpecFileRead { path: PathBuf, message: String },
}

impl DiagramError {
    pub(crate) fn option_decode(
        field: &'static str,
        expected: &'static str,
        found: impl ToString,
    ) -> Self {
        Self::OptionDecode {
            field,
            expected,
            found: found.to_string(),
        }
    }
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|path| path.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Top-level failure of the binary.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Diagram(#[from] DiagramError),
    #[error(transparent)]
    Config(#[from] LoadError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn argument_messages_are_verbatim() {
        let err: DiagramError = ArgumentError::Arity.into();
        assert_eq!(err.to_string(), "requires 1 or 2 arguments");
        assert_eq!(
            DiagramError::from(ArgumentError::EmptySource).to_string(),
            "invalid markup (empty string)"
        );
    }

    #[test]
    fn validation_errors_pass_through() {
        let err = DiagramError::from(ValidationError::PaddingOutOfRange);
        assert_eq!(
            err.to_string(),
            "padding must be an integer between 0 and 1000 inclusive"
        );
    }

    #[test]
    fn spec_file_not_found_lists_searched_paths() {
        let err = DiagramError::SpecFileNotFound {
            name: "flow.d2".to_string(),
            searched: vec![
                PathBuf::from("content/post/flow.d2"),
                PathBuf::from("assets/flow.d2"),
            ],
        };
        assert_eq!(
            err.to_string(),
            "unable to find flow.d2: searched content/post/flow.d2, assets/flow.d2"
        );
    }

    #[test]
    fn option_decode_names_the_field() {
        let err = DiagramError::option_decode("padding", "an integer", "\"wide\"");
        assert_eq!(
            err.to_string(),
            "option `padding`: expected an integer, found \"wide\""
        );
    }
}
