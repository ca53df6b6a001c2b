//! The conversion engine and its entry points.

use structflex_core::{
    ConversionError, Diagnostic, Diagnostics, DomainObject, DomainValue, Known, Path, WireObject,
    WireValue,
};

use crate::matcher::FieldMatcher;
use crate::matrix::CoercionMatrix;
use crate::options::Options;
use crate::schema::SchemaCache;
use crate::walker::Walker;

/// Converts values between the domain and wire models.
///
/// An engine owns its schema cache, matcher memo and coercion matrix. It is
/// `Send + Sync`; share one behind an `Arc` to reuse the caches across calls
/// and threads. Conversions never panic and never return `Err`: every
/// problem is reported in the returned [`Diagnostics`].
#[derive(Debug)]
pub struct Engine {
    pub(crate) schemas: SchemaCache,
    pub(crate) matcher: FieldMatcher,
    pub(crate) matrix: CoercionMatrix,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    pub fn new() -> Self {
        let matrix = CoercionMatrix::new();
        tracing::debug!(
            externalize_rules = matrix.externalize_entries().count(),
            internalize_rules = matrix.internalize_entries().count(),
            "coercion matrix built"
        );
        Engine {
            schemas: SchemaCache::new(),
            matcher: FieldMatcher::new(),
            matrix,
        }
    }

    pub fn matrix(&self) -> &CoercionMatrix {
        &self.matrix
    }

    pub fn schemas(&self) -> &SchemaCache {
        &self.schemas
    }

    pub fn matcher(&self) -> &FieldMatcher {
        &self.matcher
    }

    /// Domain to wire.
    ///
    /// `source` must be a known domain object and `target` a pointer to a
    /// wire struct. The struct is filled in place.
    pub fn externalize(
        &self,
        source: &DomainValue,
        target: &mut WireValue,
        options: &Options,
    ) -> Diagnostics {
        let root = Path::root();
        let mut diags = Diagnostics::new();

        let structural = match &*target {
            WireValue::Pointer(inner) => match &**inner {
                WireValue::Struct(_) => None,
                other => Some(ConversionError::NotAStruct {
                    type_name: other.shape_name(),
                }),
            },
            other => Some(ConversionError::NotAPointer {
                target_type: other.shape_name(),
            }),
        };
        if let Some(error) = structural {
            tracing::error!(target_path = %root, "{}", error);
            diags.push(Diagnostic::fatal(&root, &root, error));
            return diags;
        }

        let object = match source {
            DomainValue::Known(Known::Object(obj)) => obj,
            DomainValue::Known(other) => {
                let error = ConversionError::NotAStruct {
                    type_name: other.kind_name().to_string(),
                };
                tracing::error!(source_path = %root, "{}", error);
                diags.push(Diagnostic::fatal(&root, &root, error));
                return diags;
            }
            DomainValue::Null | DomainValue::Unknown => {
                let error = ConversionError::SourceIsNil {
                    source_type: format!("{:?}", source.state()),
                };
                tracing::error!(source_path = %root, "{}", error);
                diags.push(Diagnostic::fatal(&root, &root, error));
                return diags;
            }
        };

        tracing::debug!(source_type = %object.type_name(), "externalizing");
        Walker::new(self, options).externalize_root(object, target)
    }

    /// Wire to domain.
    ///
    /// `source` must be a wire struct or a pointer to one, and `target` a
    /// known domain object, which is filled in place.
    pub fn internalize(
        &self,
        source: &WireValue,
        target: &mut DomainValue,
        options: &Options,
    ) -> Diagnostics {
        let root = Path::root();
        let mut diags = Diagnostics::new();
        let state = target.state();

        let object = match target {
            DomainValue::Known(Known::Object(obj)) => obj,
            DomainValue::Known(other) => {
                let error = ConversionError::NotAStruct {
                    type_name: other.kind_name().to_string(),
                };
                tracing::error!(target_path = %root, "{}", error);
                diags.push(Diagnostic::fatal(&root, &root, error));
                return diags;
            }
            DomainValue::Null | DomainValue::Unknown => {
                let error = ConversionError::NotAStruct {
                    type_name: format!("{:?}", state),
                };
                tracing::error!(target_path = %root, "{}", error);
                diags.push(Diagnostic::fatal(&root, &root, error));
                return diags;
            }
        };

        let wire = match source {
            WireValue::Nil => Err(ConversionError::SourceIsNil {
                source_type: source.shape_name(),
            }),
            other => other.as_struct().ok_or_else(|| ConversionError::NotAStruct {
                type_name: other.shape_name(),
            }),
        };
        let wire = match wire {
            Ok(wire) => wire,
            Err(error) => {
                tracing::error!(source_path = %root, "{}", error);
                diags.push(Diagnostic::fatal(&root, &root, error));
                return diags;
            }
        };

        tracing::debug!(source_type = %wire.type_name(), "internalizing");
        Walker::new(self, options).internalize_root(wire, object)
    }

    /// [`externalize`](Self::externalize) between two struct values.
    pub fn externalize_object(
        &self,
        source: &DomainObject,
        target: &mut WireObject,
        options: &Options,
    ) -> Diagnostics {
        let zero = WireObject::zero(target.def().clone());
        let mut slot = WireValue::pointer_to(std::mem::replace(target, zero));
        let diags = Walker::new(self, options).externalize_root(source, &mut slot);
        if let WireValue::Pointer(inner) = slot {
            if let WireValue::Struct(obj) = *inner {
                *target = obj;
            }
        }
        diags
    }

    /// [`internalize`](Self::internalize) between two struct values.
    pub fn internalize_object(
        &self,
        source: &WireObject,
        target: &mut DomainObject,
        options: &Options,
    ) -> Diagnostics {
        Walker::new(self, options).internalize_root(source, target)
    }
}
