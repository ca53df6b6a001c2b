//! Customization hooks.
//!
//! A domain struct type may take over its own conversion. When present, a
//! hook replaces the generic walk for every value of that type, at any depth.

use std::fmt;
use std::sync::Arc;

use crate::diag::Diagnostics;
use crate::domain::DomainObject;
use crate::path::Path;
use crate::types::WireType;
use crate::wire::WireValue;

/// Where in the conversion a hook is being called.
#[derive(Clone, Copy, Debug)]
pub struct HookContext<'a> {
    pub source_path: &'a Path,
    pub target_path: &'a Path,
}

/// Converts a domain object into a wire value without knowing the target type.
pub trait Externalizer: Send + Sync {
    fn externalize(
        &self,
        ctx: HookContext<'_>,
        value: &DomainObject,
    ) -> (Option<WireValue>, Diagnostics);
}

/// Converts a domain object into a wire value of a given target type.
///
/// Preferred over [`Externalizer`] when a type carries both.
pub trait TypedExternalizer: Send + Sync {
    fn externalize_to(
        &self,
        ctx: HookContext<'_>,
        value: &DomainObject,
        target: &WireType,
    ) -> (Option<WireValue>, Diagnostics);
}

/// Populates a domain object from a wire value.
///
/// Nested values get a fresh `target` with every field null. At the top
/// level `target` is a copy of the caller's object, committed only when the
/// hook reports no error.
pub trait Internalizer: Send + Sync {
    fn internalize(
        &self,
        ctx: HookContext<'_>,
        source: &WireValue,
        target: &mut DomainObject,
    ) -> Diagnostics;
}

/// The hooks attached to a domain struct type.
#[derive(Clone, Default)]
pub struct Hooks {
    pub externalizer: Option<Arc<dyn Externalizer>>,
    pub typed_externalizer: Option<Arc<dyn TypedExternalizer>>,
    pub internalizer: Option<Arc<dyn Internalizer>>,
}

impl Hooks {
    pub fn has_externalizer(&self) -> bool {
        self.externalizer.is_some() || self.typed_externalizer.is_some()
    }

    pub fn is_empty(&self) -> bool {
        !self.has_externalizer() && self.internalizer.is_none()
    }
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks")
            .field("externalizer", &self.externalizer.is_some())
            .field("typed_externalizer", &self.typed_externalizer.is_some())
            .field("internalizer", &self.internalizer.is_some())
            .finish()
    }
}
