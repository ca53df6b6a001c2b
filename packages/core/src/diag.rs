//! Conversion diagnostics.
//!
//! The engine never panics and never returns `Err` from a conversion. Each
//! failure, warning or trace note becomes a [`Diagnostic`] carrying the
//! source and target paths where it happened. Callers inspect the collected
//! [`Diagnostics`] afterwards.

use std::fmt;

use thiserror::Error;

use crate::path::Path;

/// Severity of a diagnostic entry.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
    Trace,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Trace => write!(f, "trace"),
        }
    }
}

/// Typed kind of an error diagnostic.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ConversionError {
    #[error("target must be a pointer to a struct, got {target_type}")]
    NotAPointer { target_type: String },

    #[error("expected a struct, got {type_name}")]
    NotAStruct { type_name: String },

    #[error("source {source_type} is nil")]
    SourceIsNil { source_type: String },

    #[error("cannot convert {source_type} to {target_type}: {reason}")]
    IncompatibleTypes {
        source_type: String,
        target_type: String,
        reason: String,
    },

    #[error("no field in {target_type} matches {field}")]
    UnmatchedField { field: String, target_type: String },

    #[error("externalizer for {type_name} returned no value")]
    HookReturnedNil { type_name: String },

    #[error("externalizer result {result_type} is not assignable to {target_type}")]
    HookResultNotAssignable {
        result_type: String,
        target_type: String,
    },

    #[error("wrapper {wrapper_type} has no field {field}")]
    MissingWrapperField { field: String, wrapper_type: String },

    #[error("block type {type_name} has no usable MapBlockKey")]
    MissingMapBlockKey { type_name: String },

    #[error("nesting exceeds the maximum depth of {max_depth}")]
    RecursionLimitExceeded { max_depth: usize },
}

/// One diagnostic entry.
#[derive(Clone, Debug, PartialEq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub source_path: Path,
    pub target_path: Path,
    pub message: String,
    pub error: Option<ConversionError>,
    /// Set when the failure aborted the enclosing subtree regardless of mode.
    pub fatal: bool,
}

impl Diagnostic {
    /// A field-level error. Whether it stops the walk depends on the error mode.
    pub fn error(source_path: &Path, target_path: &Path, error: ConversionError) -> Self {
        Diagnostic {
            severity: Severity::Error,
            source_path: source_path.clone(),
            target_path: target_path.clone(),
            message: error.to_string(),
            error: Some(error),
            fatal: false,
        }
    }

    /// An error that always aborts the enclosing subtree.
    pub fn fatal(source_path: &Path, target_path: &Path, error: ConversionError) -> Self {
        Diagnostic {
            fatal: true,
            ..Self::error(source_path, target_path, error)
        }
    }

    pub fn warning(source_path: &Path, target_path: &Path, message: impl Into<String>) -> Self {
        Diagnostic {
            severity: Severity::Warning,
            source_path: source_path.clone(),
            target_path: target_path.clone(),
            message: message.into(),
            error: None,
            fatal: false,
        }
    }

    pub fn trace(source_path: &Path, target_path: &Path, message: impl Into<String>) -> Self {
        Diagnostic {
            severity: Severity::Trace,
            ..Self::warning(source_path, target_path, message)
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} -> {}: {}",
            self.severity, self.source_path, self.target_path, self.message
        )
    }
}

/// Ordered collection of diagnostics from one conversion call.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Diagnostics(Vec<Diagnostic>);

impl Diagnostics {
    pub fn new() -> Self {
        Diagnostics(Vec::new())
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.0.push(diagnostic);
    }

    pub fn append(&mut self, other: Diagnostics) {
        self.0.extend(other.0);
    }

    pub fn has_error(&self) -> bool {
        self.0.iter().any(Diagnostic::is_error)
    }

    pub fn has_fatal(&self) -> bool {
        self.0.iter().any(|d| d.fatal)
    }

    /// Error entries, in the order they were recorded.
    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.0.iter().filter(|d| d.is_error())
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.0.iter().filter(|d| d.severity == Severity::Warning)
    }

    /// The typed kinds of every error entry.
    pub fn error_kinds(&self) -> Vec<&ConversionError> {
        self.0.iter().filter_map(|d| d.error.as_ref()).collect()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Diagnostic> for Diagnostics {
    fn from(diagnostic: Diagnostic) -> Self {
        Diagnostics(vec![diagnostic])
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for d in &self.0 {
            writeln!(f, "{}", d)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths() -> (Path, Path) {
        (Path::root().at_name("Rules"), Path::root().at_name("Rule"))
    }

    #[test]
    fn error_messages() {
        let e = ConversionError::IncompatibleTypes {
            source_type: "String".to_string(),
            target_type: "int32".to_string(),
            reason: "no conversion".to_string(),
        };
        assert_eq!(e.to_string(), "cannot convert String to int32: no conversion");

        let e = ConversionError::RecursionLimitExceeded { max_depth: 64 };
        assert!(e.to_string().contains("64"));
    }

    #[test]
    fn fatal_is_error() {
        let (s, t) = paths();
        let d = Diagnostic::fatal(
            &s,
            &t,
            ConversionError::SourceIsNil {
                source_type: "Rule".to_string(),
            },
        );
        assert!(d.is_error());
        assert!(d.fatal);
        assert_eq!(d.message, "source Rule is nil");
    }

    #[test]
    fn collection_queries() {
        let (s, t) = paths();
        let mut diags = Diagnostics::new();
        assert!(diags.is_empty());
        diags.push(Diagnostic::warning(&s, &t, "value truncated"));
        assert!(!diags.has_error());

        let mut more = Diagnostics::new();
        more.push(Diagnostic::error(
            &s,
            &t,
            ConversionError::NotAStruct {
                type_name: "int32".to_string(),
            },
        ));
        diags.append(more);

        assert_eq!(diags.len(), 2);
        assert!(diags.has_error());
        assert!(!diags.has_fatal());
        assert_eq!(diags.errors().count(), 1);
        assert_eq!(diags.warnings().count(), 1);
        assert!(matches!(
            diags.error_kinds()[0],
            ConversionError::NotAStruct { .. }
        ));
    }

    #[test]
    fn display_includes_paths() {
        let (s, t) = paths();
        let d = Diagnostic::trace(&s, &t, "matched");
        assert_eq!(d.to_string(), "trace: Rules -> Rule: matched");
        let diags = Diagnostics::from(d);
        assert_eq!(diags.to_string(), "trace: Rules -> Rule: matched\n");
    }
}
