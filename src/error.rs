//! Error taxonomy for the pipeline
//!
//! Every stage propagates into [`Error`]; nothing is recovered locally.

use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::citation::CitationError;
use crate::conllu::ParseError as ConlluError;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("file not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("I/O error while {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error(transparent)]
    Citation(#[from] CitationError),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("unknown reference {0} in source text")]
    UnknownReference(String),

    #[error("CoNLL-U from parser: {0}")]
    Conllu(#[from] ConlluError),

    #[error("annotator failed: {message}")]
    Annotator { message: String },

    #[error("parse cache: {message}")]
    Cache { message: String },

    #[error("parse cache was written by model {found}, expected {expected}")]
    ModelMismatch { expected: String, found: String },
}

impl Error {
    /// Map an I/O error, turning `NotFound` into [`Error::NotFound`] for `path`.
    pub(crate) fn io(context: impl Into<String>, path: &Path, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::NotFound {
            Self::NotFound {
                path: path.to_path_buf(),
            }
        } else {
            Self::Io {
                context: format!("{} {}", context.into(), path.display()),
                source,
            }
        }
    }

    pub(crate) fn cache(err: impl std::fmt::Display) -> Self {
        Self::Cache {
            message: err.to_string(),
        }
    }

    pub(crate) fn annotator(err: impl std::fmt::Display) -> Self {
        Self::Annotator {
            message: err.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Malformed local input: citation numerals or delimited-file rows
    pub fn is_parse_error(&self) -> bool {
        matches!(self, Self::Parse { .. } | Self::Citation(_))
    }

    /// Failures raised by the text source or the linguistic parser
    pub fn is_collaborator_error(&self) -> bool {
        matches!(
            self,
            Self::Xml(_) | Self::UnknownReference(_) | Self::Conllu(_) | Self::Annotator { .. }
        )
    }
}
