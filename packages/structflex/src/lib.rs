//! structflex: bidirectional structural mapping between a tri-state domain
//! model and a pointer-based wire model.
//!
//! Domain values are null, unknown or known. Wire values are built from
//! optional pointers, slices, maps and counted-collection wrappers (a
//! sequence field plus a `Quantity` field). The [`Engine`] converts either
//! way, matching fields by name and reporting every problem as a
//! [`Diagnostic`] instead of failing.
//!
//! This crate re-exports the layers:
//! - [`model`]: schema descriptors, values, paths, diagnostics, hook traits
//! - [`engine`]: the conversion engine and its options
//! - [`json`]: JSON schema documents and fixtures
//!
//! # Example
//!
//! ```rust
//! use structflex::{
//!     DomainObject, DomainStruct, DomainType, DomainValue, Engine, Options, WireObject,
//!     WireStruct, WireType, WireValue,
//! };
//!
//! let wire = WireStruct::new("Rule")
//!     .field("Name", WireType::pointer(WireType::String))
//!     .build();
//! let domain = DomainStruct::new("Rule")
//!     .field("Name", DomainType::String)
//!     .build();
//!
//! let source = DomainObject::new(domain)
//!     .with("Name", DomainValue::string("web"))
//!     .unwrap();
//! let mut target = WireValue::pointer_to(WireObject::zero(wire));
//!
//! let diags = Engine::new().externalize(
//!     &DomainValue::object(source),
//!     &mut target,
//!     &Options::default(),
//! );
//! assert!(diags.is_empty());
//! assert_eq!(
//!     target.as_struct().unwrap().get("Name"),
//!     Some(&WireValue::pointer(WireValue::string("web")))
//! );
//! ```

pub use structflex_core as model;
pub use structflex_engine as engine;
pub use structflex_serde as json;

pub use structflex_core::{
    ConversionError, Diagnostic, Diagnostics, DomainObject, DomainStruct, DomainType, DomainValue,
    Externalizer, FieldTag, HookContext, InterfaceDef, Internalizer, Known, Path, Severity,
    TypedExternalizer, ValueState, WireObject, WireStruct, WireType, WireValue,
};
pub use structflex_engine::{Engine, ErrorMode, Options};
