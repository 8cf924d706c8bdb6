//! Model error types.

use hn_core::CoreError;
use thiserror::Error;

pub type ModelResult<T> = Result<T, ModelError>;

/// Whether a failure is an expected state of unfinished input or a misuse
/// of the API by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// The network is not complete yet (value not entered, point not wired,
    /// outputs not loaded). Callers usually report these and carry on.
    Domain,
    /// The caller broke a contract (bad index, wrong accessor, bad name).
    Contract,
}

/// Errors raised by the item/property/table model.
///
/// Every variant names the item it concerns by qualified name. Errors raised
/// by a detached [`crate::Property`] or [`crate::Table`] carry an empty item
/// name until an [`crate::Item`] method fills it in via [`ModelError::in_item`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("{item}: '{property}' has not been specified")]
    NotSpecified { item: String, property: String },

    #[error("{item}: '{property}' value {value} is below the minimum {min}")]
    BelowMinimum {
        item: String,
        property: String,
        value: f64,
        min: f64,
    },

    #[error("{item}: '{property}' is {actual}, not {expected}")]
    TypeMismatch {
        item: String,
        property: String,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("{item}: {what} '{name}' not found")]
    NotFound {
        item: String,
        what: &'static str,
        name: String,
    },

    /// Lookup miss outside any item (arena slot, qualified name, type name).
    #[error("{what} '{name}' not found")]
    Unknown { what: &'static str, name: String },

    #[error("{item}: invalid argument: {what}")]
    InvalidArgument { item: String, what: String },

    #[error("{item}: '{property}' element {index} out of range (max {max})")]
    IndexOutOfRange {
        item: String,
        property: String,
        index: usize,
        max: usize,
    },

    #[error("{item}: invalid connection: {what}")]
    InvalidConnection { item: String, what: String },

    #[error("{item}: not connected: {what}")]
    NotConnected { item: String, what: String },

    #[error("{item}: still connected to {count} item(s)")]
    StillConnected { item: String, count: usize },

    #[error("{item}: item is disused, '{property}' has no results")]
    DisusedItem { item: String, property: String },

    #[error("{item}: '{property}' element {element} has no data loaded")]
    DataNotLoaded {
        item: String,
        property: String,
        element: usize,
    },

    #[error("{item}: {field} is {len} characters long (limit {max})")]
    LengthExceeded {
        item: String,
        field: &'static str,
        len: usize,
        max: usize,
    },

    #[error("{item}: list dependency of '{property}' forms a cycle")]
    DependencyCycle { item: String, property: String },

    #[error("Catalogue error: {message}")]
    Catalogue { message: String },

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl ModelError {
    pub fn class(&self) -> ErrorClass {
        match self {
            ModelError::NotSpecified { .. }
            | ModelError::NotConnected { .. }
            | ModelError::DataNotLoaded { .. }
            | ModelError::DisusedItem { .. } => ErrorClass::Domain,
            _ => ErrorClass::Contract,
        }
    }

    pub fn is_domain(&self) -> bool {
        self.class() == ErrorClass::Domain
    }

    /// Fill in the owning item's qualified name if it is still empty.
    pub fn in_item(mut self, name: &str) -> Self {
        let slot = match &mut self {
            ModelError::NotSpecified { item, .. }
            | ModelError::BelowMinimum { item, .. }
            | ModelError::TypeMismatch { item, .. }
            | ModelError::NotFound { item, .. }
            | ModelError::InvalidArgument { item, .. }
            | ModelError::IndexOutOfRange { item, .. }
            | ModelError::InvalidConnection { item, .. }
            | ModelError::NotConnected { item, .. }
            | ModelError::StillConnected { item, .. }
            | ModelError::DisusedItem { item, .. }
            | ModelError::DataNotLoaded { item, .. }
            | ModelError::LengthExceeded { item, .. }
            | ModelError::DependencyCycle { item, .. } => Some(item),
            ModelError::Unknown { .. } | ModelError::Catalogue { .. } | ModelError::Core(_) => None,
        };
        if let Some(item) = slot
            && item.is_empty()
        {
            *item = name.to_string();
        }
        self
    }

    pub(crate) fn not_found(item: &str, what: &'static str, name: &str) -> Self {
        ModelError::NotFound {
            item: item.to_string(),
            what,
            name: name.to_string(),
        }
    }

    pub(crate) fn unknown(what: &'static str, name: &str) -> Self {
        ModelError::Unknown {
            what,
            name: name.to_string(),
        }
    }

    pub(crate) fn invalid(item: &str, what: impl Into<String>) -> Self {
        ModelError::InvalidArgument {
            item: item.to_string(),
            what: what.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_names_item_and_property() {
        let err = ModelError::NotSpecified {
            item: "PIPE.P1".into(),
            property: "Diameter".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("PIPE.P1"));
        assert!(msg.contains("Diameter"));
    }

    #[test]
    fn in_item_fills_only_empty_names() {
        let err = ModelError::NotSpecified {
            item: String::new(),
            property: "Diameter".into(),
        }
        .in_item("PIPE.P1");
        assert!(err.to_string().starts_with("PIPE.P1"));

        let err = ModelError::invalid("NODE.N1", "bad").in_item("PIPE.P1");
        assert!(err.to_string().starts_with("NODE.N1"));
    }

    #[test]
    fn domain_conditions_are_classified() {
        let quiet = ModelError::NotConnected {
            item: "P".into(),
            what: "connect point 1".into(),
        };
        assert_eq!(quiet.class(), ErrorClass::Domain);

        let loud = ModelError::invalid("P", "connect point 9");
        assert_eq!(loud.class(), ErrorClass::Contract);
    }
}
