//! Schema documents and their resolution into descriptors.
//!
//! A document declares three namespaces:
//!
//! ```json
//! {
//!   "interfaces": { "Shape": ["Circle"] },
//!   "wire":   { "Circle": { "fields": [ { "name": "Radius", "type": "*float64" } ] } },
//!   "domain": { "Circle": { "fields": [ { "name": "Radius", "type": "float64" } ] } }
//! }
//! ```
//!
//! Field tags use the same keys as [`FieldTag`]. Struct references are
//! resolved by name; a struct that reaches itself is a [`SchemaError::Cycle`].

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use structflex_core::{DomainStruct, DomainType, FieldTag, InterfaceDef, WireStruct, WireType};

use crate::error::{Result, SchemaError};
use crate::types::{check_identifier, TypeExpr};

/// The JSON form of a schema.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SchemaDoc {
    pub interfaces: BTreeMap<String, Vec<String>>,
    pub wire: BTreeMap<String, StructDoc>,
    pub domain: BTreeMap<String, StructDoc>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StructDoc {
    pub fields: Vec<FieldDoc>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldDoc {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(default)]
    pub tag: FieldTag,
}

/// A resolved schema: every named struct and interface as a shared descriptor.
#[derive(Debug, Clone)]
pub struct Schema {
    wire: BTreeMap<String, Arc<WireStruct>>,
    domain: BTreeMap<String, Arc<DomainStruct>>,
    interfaces: BTreeMap<String, Arc<InterfaceDef>>,
}

impl Schema {
    /// Parse and resolve a schema document.
    pub fn parse(json: &str) -> Result<Schema> {
        let doc: SchemaDoc = serde_json::from_str(json)?;
        Schema::from_doc(&doc)
    }

    pub fn from_json(json: serde_json::Value) -> Result<Schema> {
        let doc: SchemaDoc = serde_json::from_value(json)?;
        Schema::from_doc(&doc)
    }

    pub fn from_doc(doc: &SchemaDoc) -> Result<Schema> {
        let mut resolver = Resolver::new(doc)?;
        for name in doc.wire.keys() {
            resolver.wire_struct(name)?;
        }
        for name in doc.domain.keys() {
            resolver.domain_struct(name)?;
        }
        Ok(Schema {
            wire: resolver.wire,
            domain: resolver.domain,
            interfaces: resolver.interfaces,
        })
    }

    pub fn wire(&self, name: &str) -> Result<&Arc<WireStruct>> {
        self.wire.get(name).ok_or_else(|| unknown(name))
    }

    pub fn domain(&self, name: &str) -> Result<&Arc<DomainStruct>> {
        self.domain.get(name).ok_or_else(|| unknown(name))
    }

    pub fn interface(&self, name: &str) -> Result<&Arc<InterfaceDef>> {
        self.interfaces.get(name).ok_or_else(|| unknown(name))
    }

    pub fn wire_names(&self) -> impl Iterator<Item = &str> {
        self.wire.keys().map(String::as_str)
    }

    pub fn domain_names(&self) -> impl Iterator<Item = &str> {
        self.domain.keys().map(String::as_str)
    }
}

fn unknown(name: &str) -> SchemaError {
    SchemaError::UnknownType {
        name: name.to_string(),
    }
}

struct Resolver<'a> {
    doc: &'a SchemaDoc,
    wire: BTreeMap<String, Arc<WireStruct>>,
    domain: BTreeMap<String, Arc<DomainStruct>>,
    interfaces: BTreeMap<String, Arc<InterfaceDef>>,
    stack: Vec<String>,
}

impl<'a> Resolver<'a> {
    fn new(doc: &'a SchemaDoc) -> Result<Self> {
        let mut interfaces = BTreeMap::new();
        for (name, implementors) in &doc.interfaces {
            check_identifier(name)?;
            if doc.wire.contains_key(name) {
                return Err(SchemaError::Duplicate { name: name.clone() });
            }
            for implementor in implementors {
                if !doc.wire.contains_key(implementor) {
                    return Err(unknown(implementor));
                }
            }
            let names: Vec<&str> = implementors.iter().map(String::as_str).collect();
            interfaces.insert(name.clone(), InterfaceDef::new(name.as_str(), &names));
        }
        Ok(Resolver {
            doc,
            wire: BTreeMap::new(),
            domain: BTreeMap::new(),
            interfaces,
            stack: Vec::new(),
        })
    }

    fn enter(&mut self, name: &str) -> Result<()> {
        if let Some(pos) = self.stack.iter().position(|n| n == name) {
            let mut path: Vec<&str> = self.stack[pos..].iter().map(String::as_str).collect();
            path.push(name);
            return Err(SchemaError::Cycle {
                path: path.join(" -> "),
            });
        }
        self.stack.push(name.to_string());
        Ok(())
    }

    fn wire_struct(&mut self, name: &str) -> Result<Arc<WireStruct>> {
        if let Some(done) = self.wire.get(name) {
            return Ok(done.clone());
        }
        let doc = self.doc.wire.get(name).ok_or_else(|| unknown(name))?;
        check_identifier(name)?;
        self.enter(name)?;

        let mut def = WireStruct::new(name);
        let mut seen = BTreeSet::new();
        for field in &doc.fields {
            check_field(name, &field.name, &mut seen)?;
            let ty = self.wire_type(&TypeExpr::parse(&field.ty)?, &field.ty)?;
            def = def.tagged_field(field.name.as_str(), ty, field.tag.clone());
        }

        self.stack.pop();
        let def = def.build();
        self.wire.insert(name.to_string(), def.clone());
        Ok(def)
    }

    fn wire_type(&mut self, expr: &TypeExpr, spec: &str) -> Result<WireType> {
        Ok(match expr {
            TypeExpr::Bool => WireType::Bool,
            TypeExpr::Int32 => WireType::Int32,
            TypeExpr::Int64 => WireType::Int64,
            TypeExpr::Float32 => WireType::Float32,
            TypeExpr::Float64 => WireType::Float64,
            TypeExpr::String => WireType::String,
            TypeExpr::Bytes => WireType::Bytes,
            TypeExpr::Pointer(inner) => WireType::pointer(self.wire_type(inner, spec)?),
            TypeExpr::Slice(inner) => WireType::slice(self.wire_type(inner, spec)?),
            TypeExpr::Map(inner) => WireType::map(self.wire_type(inner, spec)?),
            TypeExpr::List(_) | TypeExpr::Set(_) => {
                return Err(SchemaError::InvalidType {
                    spec: spec.to_string(),
                    message: "list and set are domain types".to_string(),
                })
            }
            TypeExpr::Named(name) => match self.interfaces.get(name) {
                Some(iface) => WireType::Interface(iface.clone()),
                None => WireType::Struct(self.wire_struct(name)?),
            },
        })
    }

    fn domain_struct(&mut self, name: &str) -> Result<Arc<DomainStruct>> {
        if let Some(done) = self.domain.get(name) {
            return Ok(done.clone());
        }
        let doc = self.doc.domain.get(name).ok_or_else(|| unknown(name))?;
        check_identifier(name)?;
        self.enter(name)?;

        let mut def = DomainStruct::new(name);
        let mut seen = BTreeSet::new();
        for field in &doc.fields {
            check_field(name, &field.name, &mut seen)?;
            let ty = self.domain_type(&TypeExpr::parse(&field.ty)?, &field.ty)?;
            def = def.tagged_field(field.name.as_str(), ty, field.tag.clone());
        }

        self.stack.pop();
        let def = def.build();
        self.domain.insert(name.to_string(), def.clone());
        Ok(def)
    }

    fn domain_type(&mut self, expr: &TypeExpr, spec: &str) -> Result<DomainType> {
        let wire_only = |what: &str| SchemaError::InvalidType {
            spec: spec.to_string(),
            message: format!("{} is a wire type", what),
        };
        Ok(match expr {
            TypeExpr::Bool => DomainType::Bool,
            TypeExpr::Int32 => DomainType::Int32,
            TypeExpr::Int64 => DomainType::Int64,
            TypeExpr::Float32 => DomainType::Float32,
            TypeExpr::Float64 => DomainType::Float64,
            TypeExpr::String => DomainType::String,
            TypeExpr::List(inner) => DomainType::list(self.domain_type(inner, spec)?),
            TypeExpr::Set(inner) => DomainType::set(self.domain_type(inner, spec)?),
            TypeExpr::Map(inner) => DomainType::map(self.domain_type(inner, spec)?),
            TypeExpr::Bytes => return Err(wire_only("[]byte")),
            TypeExpr::Pointer(_) => return Err(wire_only("a pointer")),
            TypeExpr::Slice(_) => return Err(wire_only("a slice")),
            TypeExpr::Named(name) => DomainType::object(&self.domain_struct(name)?),
        })
    }
}

fn check_field(type_name: &str, field: &str, seen: &mut BTreeSet<String>) -> Result<()> {
    check_identifier(field)?;
    if !seen.insert(field.to_string()) {
        return Err(SchemaError::Duplicate {
            name: format!("{}.{}", type_name, field),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn resolves_nested_structs() {
        let schema = Schema::from_json(json!({
            "wire": {
                "Rule": { "fields": [ { "name": "Name", "type": "*string" } ] },
                "Policy": { "fields": [ { "name": "Rules", "type": "[]*Rule" } ] }
            },
            "domain": {
                "Rule": { "fields": [ { "name": "Name", "type": "string" } ] },
                "Policy": { "fields": [ { "name": "Rules", "type": "list<Rule>" } ] }
            }
        }))
        .unwrap();

        let policy = schema.wire("Policy").unwrap();
        let rule = schema.wire("Rule").unwrap();
        assert_eq!(
            policy.fields[0].ty,
            WireType::slice(WireType::pointer(WireType::Struct(rule.clone())))
        );

        let domain = schema.domain("Policy").unwrap();
        assert_eq!(
            domain.fields[0].ty,
            DomainType::list_of_objects(schema.domain("Rule").unwrap())
        );
    }

    #[test]
    fn tags_are_carried() {
        let schema = Schema::from_json(json!({
            "domain": {
                "Firewall": { "fields": [
                    {
                        "name": "Ports",
                        "type": "set<string>",
                        "tag": { "wrapper": "Items", "omitempty": true }
                    }
                ] }
            }
        }))
        .unwrap();
        let tag = &schema.domain("Firewall").unwrap().fields[0].tag;
        assert_eq!(tag.wrapper.as_deref(), Some("Items"));
        assert!(tag.omitempty);
        assert!(!tag.legacy);
    }

    #[test]
    fn interfaces_resolve_to_interface_types() {
        let schema = Schema::from_json(json!({
            "interfaces": { "Shape": ["Circle"] },
            "wire": {
                "Circle": { "fields": [ { "name": "Radius", "type": "*float64" } ] },
                "Canvas": { "fields": [ { "name": "Shape", "type": "Shape" } ] }
            }
        }))
        .unwrap();
        let canvas = schema.wire("Canvas").unwrap();
        match &canvas.fields[0].ty {
            WireType::Interface(iface) => assert!(iface.is_implemented_by("Circle")),
            other => panic!("expected interface, got {}", other),
        }
        assert!(schema.interface("Shape").is_ok());
    }

    #[test]
    fn cycle_is_reported() {
        let err = Schema::from_json(json!({
            "wire": {
                "A": { "fields": [ { "name": "B", "type": "*B" } ] },
                "B": { "fields": [ { "name": "A", "type": "[]A" } ] }
            }
        }))
        .unwrap_err();
        match err {
            SchemaError::Cycle { path } => assert_eq!(path, "A -> B -> A"),
            other => panic!("expected cycle, got {}", other),
        }
    }

    #[test]
    fn self_reference_is_a_cycle() {
        let err = Schema::from_json(json!({
            "domain": { "Node": { "fields": [ { "name": "Next", "type": "Node" } ] } }
        }))
        .unwrap_err();
        assert!(matches!(err, SchemaError::Cycle { .. }));
    }

    #[test]
    fn unknown_names() {
        let err = Schema::from_json(json!({
            "wire": { "A": { "fields": [ { "name": "B", "type": "*Missing" } ] } }
        }))
        .unwrap_err();
        assert!(matches!(err, SchemaError::UnknownType { ref name } if name == "Missing"));

        let err = Schema::from_json(json!({
            "interfaces": { "Shape": ["Square"] }
        }))
        .unwrap_err();
        assert!(matches!(err, SchemaError::UnknownType { .. }));

        let schema = Schema::from_json(json!({})).unwrap();
        assert!(schema.wire("Nope").is_err());
    }

    #[test]
    fn duplicate_fields_and_names() {
        let err = Schema::from_json(json!({
            "wire": { "A": { "fields": [
                { "name": "X", "type": "bool" },
                { "name": "X", "type": "bool" }
            ] } }
        }))
        .unwrap_err();
        assert!(matches!(err, SchemaError::Duplicate { ref name } if name == "A.X"));

        let err = Schema::from_json(json!({
            "interfaces": { "A": [] },
            "wire": { "A": { "fields": [] } }
        }))
        .unwrap_err();
        assert!(matches!(err, SchemaError::Duplicate { .. }));
    }

    #[test]
    fn wrong_side_types() {
        let err = Schema::from_json(json!({
            "wire": { "A": { "fields": [ { "name": "X", "type": "set<string>" } ] } }
        }))
        .unwrap_err();
        assert!(matches!(err, SchemaError::InvalidType { .. }));

        let err = Schema::from_json(json!({
            "domain": { "A": { "fields": [ { "name": "X", "type": "*string" } ] } }
        }))
        .unwrap_err();
        assert!(matches!(err, SchemaError::InvalidType { .. }));
    }

    #[test]
    fn invalid_identifiers_and_keys() {
        let err = Schema::from_json(json!({
            "wire": { "A": { "fields": [ { "name": "not valid", "type": "bool" } ] } }
        }))
        .unwrap_err();
        assert!(matches!(err, SchemaError::InvalidIdentifier { .. }));

        let err = Schema::from_json(json!({ "structs": {} })).unwrap_err();
        assert!(matches!(err, SchemaError::Json(_)));
    }

    #[test]
    fn parse_from_text() {
        let schema = Schema::parse(r#"{ "wire": { "Empty": {} } }"#).unwrap();
        assert_eq!(schema.wire_names().collect::<Vec<_>>(), vec!["Empty"]);
        assert_eq!(schema.domain_names().count(), 0);
    }
}
