//! Error types for the fixture bridge.

use thiserror::Error;

/// Errors raised while loading schema documents, values or fixtures.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid identifier {name:?}")]
    InvalidIdentifier { name: String },

    #[error("cannot parse type {spec:?}: {message}")]
    InvalidType { spec: String, message: String },

    #[error("unknown type {name}")]
    UnknownType { name: String },

    #[error("{name} is declared more than once")]
    Duplicate { name: String },

    #[error("type cycle: {path}")]
    Cycle { path: String },

    #[error("at {path}: expected {expected}, found {found}")]
    TypeMismatch {
        path: String,
        expected: String,
        found: String,
    },

    #[error("at {path}: {type_name} has no field {field}")]
    UnknownField {
        path: String,
        type_name: String,
        field: String,
    },

    #[error("at {path}: {value} does not fit {ty}")]
    OutOfRange {
        path: String,
        value: String,
        ty: String,
    },

    #[error("at {path}: invalid base64: {message}")]
    InvalidBytes { path: String, message: String },

    #[error("fixture has no {key} value")]
    MissingValue { key: String },
}

pub type Result<T> = std::result::Result<T, SchemaError>;
