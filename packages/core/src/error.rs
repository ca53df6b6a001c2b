//! Error type for direct manipulation of model values.
//!
//! Conversion failures are never returned as errors; they are reported as
//! [`Diagnostic`](crate::Diagnostic) entries instead.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("type {type_name} has no field named {field}")]
    NoSuchField { type_name: String, field: String },
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_such_field_display() {
        let e = Error::NoSuchField {
            type_name: "Rule".to_string(),
            field: "Weight".to_string(),
        };
        assert_eq!(e.to_string(), "type Rule has no field named Weight");
    }
}
