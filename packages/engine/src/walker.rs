//! State and helpers shared by both walk directions.

use std::sync::Arc;

use structflex_core::{
    ConversionError, Diagnostic, Diagnostics, Path, WireObject, WireStruct, WireType, WireValue,
};

use crate::engine::Engine;
use crate::matrix::WireKind;
use crate::options::{ErrorMode, Options};
use crate::schema::{FieldDescriptor, StructSchema};

/// Source fields with this name are never converted.
pub const TAGS_FIELD: &str = "Tags";

/// Domain block field supplying the key when blocks map to a wire map.
pub const MAP_BLOCK_KEY: &str = "MapBlockKey";

/// Options in effect for one field pair.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct FieldOpts {
    pub legacy: bool,
    pub omitempty: bool,
    /// Declared wrapper sequence field, from the domain side.
    pub wrapper: Option<String>,
}

impl FieldOpts {
    pub fn between(domain: &FieldDescriptor, wire: &FieldDescriptor) -> Self {
        FieldOpts {
            legacy: domain.legacy_zero_value || wire.legacy_zero_value,
            omitempty: domain.omit_if_empty || wire.omit_if_empty,
            wrapper: domain.wrapper_field_name.clone(),
        }
    }

    #[must_use]
    pub fn without_wrapper(&self) -> Self {
        FieldOpts {
            wrapper: None,
            ..self.clone()
        }
    }
}

/// One conversion call in progress.
pub(crate) struct Walker<'a> {
    pub engine: &'a Engine,
    pub options: &'a Options,
}

impl<'a> Walker<'a> {
    pub fn new(engine: &'a Engine, options: &'a Options) -> Self {
        Walker { engine, options }
    }

    /// Whether the enclosing loop must stop after these diagnostics.
    pub fn should_stop(&self, diags: &Diagnostics) -> bool {
        diags.has_fatal() || (self.options.error_mode != ErrorMode::Lenient && diags.has_error())
    }

    pub fn fail(&self, diags: &mut Diagnostics, sp: &Path, tp: &Path, error: ConversionError) {
        tracing::error!(source_path = %sp, target_path = %tp, "{}", error);
        diags.push(Diagnostic::error(sp, tp, error));
    }

    pub fn fail_fatal(
        &self,
        diags: &mut Diagnostics,
        sp: &Path,
        tp: &Path,
        error: ConversionError,
    ) {
        tracing::error!(source_path = %sp, target_path = %tp, fatal = true, "{}", error);
        diags.push(Diagnostic::fatal(sp, tp, error));
    }

    pub fn warn(&self, diags: &mut Diagnostics, sp: &Path, tp: &Path, message: String) {
        tracing::warn!(source_path = %sp, target_path = %tp, "{}", message);
        diags.push(Diagnostic::warning(sp, tp, message));
    }

    pub fn note(&self, diags: &mut Diagnostics, sp: &Path, tp: &Path, message: &str) {
        tracing::trace!(source_path = %sp, target_path = %tp, "{}", message);
        if self.options.record_trace {
            diags.push(Diagnostic::trace(sp, tp, message));
        }
    }

    /// Record a fatal recursion error when `depth` is past the limit.
    pub fn too_deep(&self, depth: usize, sp: &Path, tp: &Path, diags: &mut Diagnostics) -> bool {
        if depth > self.options.max_depth {
            self.fail_fatal(
                diags,
                sp,
                tp,
                ConversionError::RecursionLimitExceeded {
                    max_depth: self.options.max_depth,
                },
            );
            return true;
        }
        false
    }

    /// Why a source field is not converted at all, if it isn't.
    pub fn skip_reason(&self, field: &FieldDescriptor, depth: usize) -> Option<&'static str> {
        if field.ignored {
            Some("skipped excluded field")
        } else if field.declared_name == TAGS_FIELD {
            Some("skipped tags field")
        } else if depth == 0 && self.options.is_ignored(&field.declared_name) {
            Some("skipped ignored field")
        } else {
            None
        }
    }

    pub fn find_field(&self, name: &str, target: &StructSchema) -> Option<usize> {
        self.engine
            .matcher
            .find(name, target, self.options.field_name_prefix.as_deref())
    }

    /// Dispatch kind of a non-pointer wire type.
    pub fn wire_kind(&self, ty: &WireType) -> Option<WireKind> {
        WireKind::of(ty, |t| {
            t.struct_def()
                .is_some_and(|def| self.engine.schemas.wire(def).wrapper.is_some())
        })
    }
}

/// Peel one pointer off a wire type.
pub(crate) fn peel(ty: &WireType) -> (&WireType, bool) {
    match ty {
        WireType::Pointer(inner) => (inner, true),
        other => (other, false),
    }
}

/// Store `value` in `slot`, behind a pointer when the slot type is one.
pub(crate) fn place(slot: &mut WireValue, value: WireValue, is_ptr: bool) {
    *slot = if is_ptr {
        WireValue::pointer(value)
    } else {
        value
    };
}

/// Take the struct already in `slot` if it has type `def`, else a zero one.
pub(crate) fn take_struct(slot: &mut WireValue, def: &Arc<WireStruct>) -> WireObject {
    let found = match std::mem::take(slot) {
        WireValue::Struct(obj) => Some(obj),
        WireValue::Pointer(inner) => match *inner {
            WireValue::Struct(obj) => Some(obj),
            _ => None,
        },
        _ => None,
    };
    match found {
        Some(obj) if obj.type_name() == def.name => obj,
        _ => WireObject::zero(def.clone()),
    }
}

/// Count value for a `Quantity` field of type `*int32` or `*int64`.
pub(crate) fn count_value(ty: &WireType, len: usize) -> WireValue {
    match ty.pointee() {
        WireType::Int32 => {
            WireValue::pointer(WireValue::Int32(i32::try_from(len).unwrap_or(i32::MAX)))
        }
        _ => WireValue::pointer(WireValue::Int64(i64::try_from(len).unwrap_or(i64::MAX))),
    }
}
