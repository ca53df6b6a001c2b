//! JSON fixture bridge for structflex
//!
//! Schemas and values are normally built in Rust. This crate lets tests and
//! the `structflex` binary describe them in JSON instead. It adds:
//! - [`Schema`]: a schema document resolved into shared descriptors
//! - JSON <-> [`DomainValue`](structflex_core::DomainValue) and
//!   [`WireValue`](structflex_core::WireValue) conversion
//! - [`Fixture`]: a schema, options and an input value in one document
//!
//! This is an inspection tool, not a wire encoding of API structs.
//!
//! # Example
//!
//! ```rust
//! use serde_json::json;
//! use structflex_engine::{Engine, Options};
//! use structflex_serde::Fixture;
//!
//! let fixture: Fixture = serde_json::from_value(json!({
//!     "schema": {
//!         "wire": { "Rule": { "fields": [ { "name": "Ports", "type": "[]string" } ] } },
//!         "domain": { "Rule": { "fields": [ { "name": "Ports", "type": "set<string>" } ] } }
//!     },
//!     "domain_type": "Rule",
//!     "wire_type": "Rule",
//!     "domain": { "Ports": ["80"] }
//! }))
//! .unwrap();
//!
//! let report = fixture.externalize(&Engine::new(), &Options::default()).unwrap();
//! assert_eq!(report.result, json!({ "Ports": ["80"] }));
//! ```

mod error;
mod fixture;
mod schema;
mod types;
mod value;

pub use error::{Result, SchemaError};
pub use fixture::{diagnostics_to_json, Fixture, Report};
pub use schema::{FieldDoc, Schema, SchemaDoc, StructDoc};
pub use types::{is_identifier, TypeExpr};
pub use value::{
    domain_object_to_json, domain_to_json, wire_object_to_json, wire_to_json, TYPE_MARKER,
    UNKNOWN_MARKER,
};
