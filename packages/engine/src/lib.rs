//! Structflex conversion engine
//!
//! Maps values between the tri-state domain model and the pointer-based wire
//! model in both directions. It adds:
//! - `Engine`: the externalize (domain to wire) and internalize (wire to domain) entry points
//! - `Options`: per-call ignore list, name prefix, error mode and recursion limit
//! - `CoercionMatrix`: the kind-pair dispatch tables
//! - `SchemaCache` and `FieldMatcher`: per-type caches shared across calls
//!
//! Counted-collection wrappers (a slice plus a `Quantity` count, optionally
//! with sibling fields) are reconciled with plain collections and blocks on
//! the domain side.
//!
//! # Example
//!
//! ```rust
//! use structflex_engine::{Engine, Options};
//! use structflex_engine::model::{
//!     DomainObject, DomainStruct, DomainType, DomainValue, WireObject, WireStruct, WireType,
//!     WireValue,
//! };
//!
//! let domain = DomainStruct::new("Rule")
//!     .field("Name", DomainType::String)
//!     .build();
//! let wire = WireStruct::new("Rule")
//!     .field("Name", WireType::pointer(WireType::String))
//!     .build();
//!
//! let engine = Engine::new();
//! let source = DomainValue::object(
//!     DomainObject::new(domain).with("Name", DomainValue::string("web")).unwrap(),
//! );
//! let mut target = WireValue::pointer_to(WireObject::zero(wire));
//!
//! let diags = engine.externalize(&source, &mut target, &Options::default());
//! assert!(!diags.has_error());
//! assert_eq!(
//!     target.as_struct().unwrap().get("Name"),
//!     Some(&WireValue::pointer(WireValue::string("web")))
//! );
//! ```

mod engine;
mod externalize;
mod internalize;
mod matcher;
mod matrix;
mod options;
mod scalar;
mod schema;
mod walker;
mod wrapper;

pub use engine::Engine;
pub use matcher::FieldMatcher;
pub use matrix::{Coercion, CoercionMatrix, DomainKind, WireKind};
pub use options::{ErrorMode, Options, DEFAULT_MAX_DEPTH};
pub use scalar::{narrow_f64, widen_f32};
pub use schema::{FieldDescriptor, SchemaCache, StructSchema, TypeKey, WrapperShape, COUNT_FIELD};
pub use walker::{MAP_BLOCK_KEY, TAGS_FIELD};

// Re-export the model for convenience
pub use structflex_core as model;
