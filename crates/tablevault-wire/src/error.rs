//! Translation error types.

use thiserror::Error;

/// Errors raised while flattening a job definition tree. All are fatal to
/// the translation call and propagate to the submitter.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DefinitionError {
    #[error("missing \"objects\" key in definition")]
    MissingObjects,

    #[error("missing \"id\" key of element: {element}")]
    MissingId { element: String },

    #[error("unsupported value for key {key:?}: {value}")]
    UnsupportedValue { key: String, value: String },
}
