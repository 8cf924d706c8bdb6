//! Structural checks on a case file before it is built into a network.

use std::collections::HashSet;

use hn_core::{ItemKey, UnitDimension};

use crate::schema::CaseDef;

pub const LATEST_VERSION: u32 = 1;

#[derive(thiserror::Error, Debug)]
pub enum ValidationError {
    #[error("Duplicate key: {key}")]
    DuplicateKey { key: i32 },

    #[error("Duplicate name: {name} ({type_name})")]
    DuplicateName { name: String, type_name: String },

    #[error("Unassigned key on item {name}")]
    UnassignedKey { name: String },

    #[error("Missing reference: key {key} in {context}")]
    MissingReference { key: i32, context: String },

    #[error("Invalid value: {field} = {value} ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Unsupported version: {version}")]
    UnsupportedVersion { version: u32 },
}

pub fn validate_case(case: &CaseDef) -> Result<(), ValidationError> {
    if case.version == 0 || case.version > LATEST_VERSION {
        return Err(ValidationError::UnsupportedVersion {
            version: case.version,
        });
    }

    for dimension in case.units.keys() {
        if dimension.parse::<UnitDimension>().is_err() {
            return Err(ValidationError::InvalidValue {
                field: "units".into(),
                value: dimension.clone(),
                reason: "unknown dimension".into(),
            });
        }
    }

    let mut keys = HashSet::new();
    let mut names = HashSet::new();
    for item in &case.items {
        if !ItemKey(item.key).is_assigned() {
            return Err(ValidationError::UnassignedKey {
                name: item.name.clone(),
            });
        }
        if !keys.insert(item.key) {
            return Err(ValidationError::DuplicateKey { key: item.key });
        }
        if !names.insert((item.type_name.as_str(), item.name.as_str())) {
            return Err(ValidationError::DuplicateName {
                name: item.name.clone(),
                type_name: item.type_name.clone(),
            });
        }
        if item.name.trim().is_empty() {
            return Err(ValidationError::InvalidValue {
                field: format!("items[{}].name", item.key),
                value: item.name.clone(),
                reason: "empty".into(),
            });
        }
    }

    for (i, connection) in case.connections.iter().enumerate() {
        for key in connection.keys() {
            if !keys.contains(&key) {
                return Err(ValidationError::MissingReference {
                    key,
                    context: format!("connections[{i}]"),
                });
            }
        }
    }

    Ok(())
}
