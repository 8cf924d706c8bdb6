//! hn-case: case file format, network assembly and record persistence.

pub mod convert;
pub mod persist;
pub mod schema;
pub mod validate;

pub use convert::{build_network, snapshot};
pub use persist::{RecordHeader, read_header, read_network, write_network};
pub use schema::*;
pub use validate::{LATEST_VERSION, ValidationError, validate_case};

pub type CaseResult<T> = Result<T, CaseError>;

#[derive(thiserror::Error, Debug)]
pub enum CaseError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Model error: {0}")]
    Model(#[from] hn_model::ModelError),

    #[error("Record error: {0}")]
    Record(#[from] hn_record::RecordError),

    #[error("Unit error: {0}")]
    Units(#[from] hn_core::CoreError),

    #[error("Persisted data error: {what}")]
    Persist { what: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub fn load_yaml(path: &std::path::Path) -> CaseResult<CaseDef> {
    let content = std::fs::read_to_string(path)?;
    let case: CaseDef = serde_yaml::from_str(&content)?;
    validate_case(&case)?;
    tracing::debug!(path = %path.display(), items = case.items.len(), "case file parsed");
    Ok(case)
}

pub fn save_yaml(path: &std::path::Path, case: &CaseDef) -> CaseResult<()> {
    validate_case(case)?;
    let content = serde_yaml::to_string(case)?;
    std::fs::write(path, content)?;
    Ok(())
}

pub fn load_json(path: &std::path::Path) -> CaseResult<CaseDef> {
    let content = std::fs::read_to_string(path)?;
    let case: CaseDef = serde_json::from_str(&content)?;
    validate_case(&case)?;
    Ok(case)
}

pub fn save_json(path: &std::path::Path, case: &CaseDef) -> CaseResult<()> {
    validate_case(case)?;
    let content = serde_json::to_string_pretty(case)?;
    std::fs::write(path, content)?;
    Ok(())
}

/// Load by extension: `.json` as JSON, anything else as YAML.
pub fn load(path: &std::path::Path) -> CaseResult<CaseDef> {
    match path.extension().and_then(|e| e.to_str()) {
        Some(e) if e.eq_ignore_ascii_case("json") => load_json(path),
        _ => load_yaml(path),
    }
}

pub fn save(path: &std::path::Path, case: &CaseDef) -> CaseResult<()> {
    match path.extension().and_then(|e| e.to_str()) {
        Some(e) if e.eq_ignore_ascii_case("json") => save_json(path, case),
        _ => save_yaml(path, case),
    }
}
