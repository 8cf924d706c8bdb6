//! Error types for engine sessions.

use thiserror::Error;

use crate::session::SessionState;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Engine call {operation} failed with status {code}: {message}")]
    Backend {
        operation: &'static str,
        code: i32,
        message: String,
    },

    #[error("Invalid state: {operation} is not allowed while {state}")]
    InvalidState {
        operation: &'static str,
        state: SessionState,
    },

    #[error(transparent)]
    Model(#[from] hn_model::ModelError),
}

pub type EngineResult<T> = Result<T, EngineError>;
