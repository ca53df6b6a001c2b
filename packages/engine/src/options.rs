//! Per-call conversion options.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// How a field-level error affects the rest of the enclosing struct.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorMode {
    /// The first error stops the enclosing struct's field loop.
    #[default]
    FailFast,
    /// Non-fatal errors are recorded and the loop continues.
    Lenient,
    /// Like `FailFast`, and a source field with no target is an error.
    Strict,
}

/// Options for a single `externalize` or `internalize` call.
///
/// Unspecified fields take their defaults when deserialized.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    /// Source field names skipped on the top-level struct.
    pub ignored_field_names: BTreeSet<String>,
    /// Prefix the matcher also tries when pairing field names.
    pub field_name_prefix: Option<String>,
    pub error_mode: ErrorMode,
    /// Deepest struct nesting allowed before the walk gives up.
    pub max_depth: usize,
    /// Record matched and skipped fields as trace diagnostics.
    pub record_trace: bool,
}

pub const DEFAULT_MAX_DEPTH: usize = 64;

impl Default for Options {
    fn default() -> Self {
        Options {
            ignored_field_names: BTreeSet::new(),
            field_name_prefix: None,
            error_mode: ErrorMode::default(),
            max_depth: DEFAULT_MAX_DEPTH,
            record_trace: false,
        }
    }
}

impl Options {
    #[must_use]
    pub fn with_ignored<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ignored_field_names
            .extend(names.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.field_name_prefix = Some(prefix.into());
        self
    }

    #[must_use]
    pub fn with_error_mode(mut self, mode: ErrorMode) -> Self {
        self.error_mode = mode;
        self
    }

    #[must_use]
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    #[must_use]
    pub fn with_trace(mut self) -> Self {
        self.record_trace = true;
        self
    }

    pub fn is_ignored(&self, name: &str) -> bool {
        self.ignored_field_names.contains(name)
    }
}
