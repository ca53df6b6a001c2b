//! Core structflex model
//!
//! This crate holds the vocabulary shared by every other structflex crate:
//! - Schema descriptors: [`WireStruct`], [`DomainStruct`], [`InterfaceDef`] and their field types
//! - Values: tri-state [`DomainValue`] trees and pointer-based [`WireValue`] trees
//! - [`Path`]: where in a value tree something happened
//! - [`Diagnostics`]: the outcome of a conversion
//! - Hook traits a domain type implements to take over its own conversion
//!
//! Nothing here converts anything. The conversion engine lives in
//! `structflex-engine`.
//!
//! # Example
//!
//! ```rust
//! use structflex_core::{DomainObject, DomainStruct, DomainType, DomainValue};
//!
//! let rule = DomainStruct::new("Rule")
//!     .field("Name", DomainType::String)
//!     .field("Ports", DomainType::set(DomainType::Int64))
//!     .build();
//!
//! let value = DomainObject::new(rule)
//!     .with("Name", DomainValue::string("web"))
//!     .unwrap();
//! assert!(value.get("Ports").unwrap().is_null());
//! ```

mod diag;
mod domain;
mod error;
mod hooks;
mod path;
mod types;
mod wire;

pub use diag::{ConversionError, Diagnostic, Diagnostics, Severity};
pub use domain::{DomainObject, DomainValue, Known, ValueState};
pub use error::{Error, Result};
pub use hooks::{Externalizer, HookContext, Hooks, Internalizer, TypedExternalizer};
pub use path::{Path, PathStep};
pub use types::{DomainStruct, DomainType, Field, FieldTag, InterfaceDef, WireStruct, WireType};
pub use wire::{WireObject, WireValue};
