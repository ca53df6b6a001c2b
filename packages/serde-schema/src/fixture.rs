//! Self-contained conversion fixtures.
//!
//! A fixture bundles a schema document, the options for the call, the two
//! root type names and the value to convert:
//!
//! ```json
//! {
//!   "schema": { "wire": { ... }, "domain": { ... } },
//!   "options": { "error_mode": "lenient" },
//!   "domain_type": "Firewall",
//!   "wire_type": "Firewall",
//!   "domain": { "Ports": ["80", "443"] }
//! }
//! ```
//!
//! `domain` is the input for externalize and `wire` the input for
//! internalize. A fixture may carry both.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value as Json};
use structflex_core::{Diagnostics, DomainObject, DomainValue, WireObject, WireType, WireValue};
use structflex_engine::{Engine, Options};

use crate::error::{Result, SchemaError};
use crate::schema::{Schema, SchemaDoc};
use crate::value::{domain_to_json, wire_to_json};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Fixture {
    pub schema: SchemaDoc,
    #[serde(default)]
    pub options: Options,
    pub domain_type: String,
    pub wire_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<Json>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wire: Option<Json>,
}

/// The outcome of running a fixture: the converted value and the diagnostics.
#[derive(Debug, Clone)]
pub struct Report {
    pub result: Json,
    pub diagnostics: Diagnostics,
}

impl Fixture {
    pub fn parse(json: &str) -> Result<Fixture> {
        Ok(serde_json::from_str(json)?)
    }

    /// Decode `domain` and externalize it into a fresh wire struct.
    pub fn externalize(&self, engine: &Engine, options: &Options) -> Result<Report> {
        let schema = Schema::from_doc(&self.schema)?;
        let domain_def = schema.domain(&self.domain_type)?;
        let wire_def = schema.wire(&self.wire_type)?;
        let input = self.domain.as_ref().ok_or_else(|| SchemaError::MissingValue {
            key: "domain".to_string(),
        })?;

        let source = DomainValue::object(schema.domain_object(input, domain_def)?);
        let mut target = WireValue::pointer_to(WireObject::zero(wire_def.clone()));
        let diagnostics = engine.externalize(&source, &mut target, options);

        let ty = WireType::pointer(WireType::Struct(wire_def.clone()));
        Ok(Report {
            result: wire_to_json(&target, &ty),
            diagnostics,
        })
    }

    /// Decode `wire` and internalize it into a fresh domain object.
    pub fn internalize(&self, engine: &Engine, options: &Options) -> Result<Report> {
        let schema = Schema::from_doc(&self.schema)?;
        let domain_def = schema.domain(&self.domain_type)?;
        let wire_def = schema.wire(&self.wire_type)?;
        let input = self.wire.as_ref().ok_or_else(|| SchemaError::MissingValue {
            key: "wire".to_string(),
        })?;

        let source = WireValue::pointer_to(schema.wire_object(input, wire_def)?);
        let mut target = DomainValue::object(DomainObject::new(domain_def.clone()));
        let diagnostics = engine.internalize(&source, &mut target, options);

        Ok(Report {
            result: domain_to_json(&target),
            diagnostics,
        })
    }
}

impl Report {
    pub fn has_error(&self) -> bool {
        self.diagnostics.has_error()
    }

    /// `{"result": ..., "diagnostics": [...]}`
    pub fn to_json(&self) -> Json {
        json!({
            "result": self.result,
            "diagnostics": diagnostics_to_json(&self.diagnostics),
        })
    }
}

pub fn diagnostics_to_json(diagnostics: &Diagnostics) -> Json {
    Json::Array(
        diagnostics
            .iter()
            .map(|d| {
                json!({
                    "severity": d.severity.to_string(),
                    "source_path": d.source_path.to_string(),
                    "target_path": d.target_path.to_string(),
                    "message": d.message,
                    "fatal": d.fatal,
                })
            })
            .collect(),
    )
}
