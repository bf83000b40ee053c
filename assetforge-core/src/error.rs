//! Error types for asset compilation.
//!
//! Every failure aborts the enclosing top-level request. Messages carry the
//! offending paths and content types so a failure deep inside a multi-stage
//! chain can be diagnosed from the message alone.

use std::path::PathBuf;

use thiserror::Error;

/// Boxed cause carried by [`AssetError::Processor`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("couldn't find file '{reference}'")]
    NotFound { reference: String },

    #[error("{path} is '{actual}', not '{expected}'")]
    ContentTypeMismatch {
        path: String,
        expected: String,
        actual: String,
    },

    #[error("no content type registered for extension '{extension}' ({})", .pathname.display())]
    UnknownContentType { extension: String, pathname: PathBuf },

    #[error("circular dependency: {}", describe_chain(.chain))]
    CircularDependency { chain: Vec<PathBuf> },

    #[error("processor '{extension}' failed on {}: {source}", .pathname.display())]
    Processor {
        extension: String,
        pathname: PathBuf,
        #[source]
        source: BoxError,
    },

    #[error("unknown helper '{name}'")]
    UnknownHelper { name: String },

    #[error("I/O error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config error in {}: {message}", .path.display())]
    Config { path: PathBuf, message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, AssetError>;

impl AssetError {
    /// Failure raised from inside a processor stage.
    ///
    /// The pipeline fills in the extension and pathname of the failing stage.
    pub fn processor(cause: impl Into<BoxError>) -> Self {
        Self::Processor {
            extension: String::new(),
            pathname: PathBuf::new(),
            source: cause.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Attach stage location to a processor failure that does not have one yet.
    pub(crate) fn at_stage(self, pathname: &std::path::Path, stage: &str) -> Self {
        match self {
            Self::Processor {
                extension,
                source,
                ..
            } if extension.is_empty() => Self::Processor {
                extension: stage.to_string(),
                pathname: pathname.to_path_buf(),
                source,
            },
            other => other,
        }
    }
}

fn describe_chain(chain: &[PathBuf]) -> String {
    chain
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mismatch_names_both_types() {
        let err = AssetError::ContentTypeMismatch {
            path: "foo.js".into(),
            expected: "text/css".into(),
            actual: "application/javascript".into(),
        };
        assert_eq!(
            err.to_string(),
            "foo.js is 'application/javascript', not 'text/css'"
        );
    }

    #[test]
    fn processor_error_keeps_cause_and_gains_location() {
        let err = AssetError::processor("bad manifest")
            .at_stage(std::path::Path::new("/src/app.js.yml"), ".yml");
        let message = err.to_string();
        assert!(message.contains(".yml"));
        assert!(message.contains("/src/app.js.yml"));
        assert!(message.contains("bad manifest"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn stage_location_is_not_overwritten() {
        let err = AssetError::processor("inner")
            .at_stage(std::path::Path::new("/a.css.embed"), ".embed")
            .at_stage(std::path::Path::new("/b.css.tmpl"), ".tmpl");
        assert!(err.to_string().contains("/a.css.embed"));
    }

    #[test]
    fn cycle_lists_chain() {
        let err = AssetError::CircularDependency {
            chain: vec!["/a.js".into(), "/b.js".into(), "/a.js".into()],
        };
        assert_eq!(err.to_string(), "circular dependency: /a.js -> /b.js -> /a.js");
    }
}
