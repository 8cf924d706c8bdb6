use thiserror::Error;

use crate::element::ElementType;

/// Every variant names the backing file.
#[derive(Error, Debug)]
pub enum RecordError {
    #[error("{file}: storage backend error: {message}")]
    Backend { file: String, message: String },

    #[error("{file}: {what} '{name}' not found")]
    NotFound {
        file: String,
        what: &'static str,
        name: String,
    },

    #[error("{file}: invalid argument: {what}")]
    InvalidArgument { file: String, what: String },

    #[error("{file}: element '{element}' holds {actual}, not {expected}")]
    TypeMismatch {
        file: String,
        element: String,
        expected: ElementType,
        actual: ElementType,
    },

    #[error("{file}: element '{element}': {len} bytes exceed the limit of {max}")]
    LengthExceeded {
        file: String,
        element: String,
        len: usize,
        max: usize,
    },
}

pub type RecordResult<T> = Result<T, RecordError>;
