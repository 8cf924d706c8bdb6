use thiserror::Error;

pub type CoreResult<T> = Result<T, CoreError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    #[error("Unknown unit '{unit}' for dimension {dimension}")]
    UnknownUnit { dimension: String, unit: String },

    #[error("Unknown unit dimension '{name}'")]
    UnknownDimension { name: String },
}
