//! Type expressions used in schema documents.
//!
//! Wire fields use Go-style spellings (`*int32`, `[]string`, `[]byte`,
//! `map[string]T`). Domain fields use `list<T>`, `set<T>` and `map<T>`.
//! Anything else must be an identifier naming a declared struct or
//! interface.

use crate::error::{Result, SchemaError};

/// A parsed, not yet resolved, type expression.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TypeExpr {
    Bool,
    Int32,
    Int64,
    Float32,
    Float64,
    String,
    Bytes,
    Pointer(Box<TypeExpr>),
    Slice(Box<TypeExpr>),
    /// `map[string]T` on the wire side, `map<T>` on the domain side.
    Map(Box<TypeExpr>),
    List(Box<TypeExpr>),
    Set(Box<TypeExpr>),
    Named(String),
}

impl TypeExpr {
    pub fn parse(spec: &str) -> Result<TypeExpr> {
        let trimmed = spec.trim();
        parse_inner(trimmed).map_err(|message| SchemaError::InvalidType {
            spec: spec.to_string(),
            message,
        })
    }
}

fn parse_inner(s: &str) -> std::result::Result<TypeExpr, String> {
    match s {
        "" => return Err("empty type".to_string()),
        "bool" => return Ok(TypeExpr::Bool),
        "int32" => return Ok(TypeExpr::Int32),
        "int64" => return Ok(TypeExpr::Int64),
        "float32" => return Ok(TypeExpr::Float32),
        "float64" => return Ok(TypeExpr::Float64),
        "string" => return Ok(TypeExpr::String),
        "[]byte" => return Ok(TypeExpr::Bytes),
        _ => {}
    }

    if let Some(rest) = s.strip_prefix('*') {
        return Ok(TypeExpr::Pointer(Box::new(parse_inner(rest)?)));
    }
    if let Some(rest) = s.strip_prefix("[]") {
        return Ok(TypeExpr::Slice(Box::new(parse_inner(rest)?)));
    }
    if let Some(rest) = s.strip_prefix("map[string]") {
        return Ok(TypeExpr::Map(Box::new(parse_inner(rest)?)));
    }
    if let Some(rest) = s.strip_prefix("map[") {
        let key = rest.split(']').next().unwrap_or(rest);
        return Err(format!("map keys must be string, not {}", key));
    }
    for (prefix, wrap) in [
        ("list<", TypeExpr::List as fn(Box<TypeExpr>) -> TypeExpr),
        ("set<", TypeExpr::Set),
        ("map<", TypeExpr::Map),
    ] {
        if let Some(rest) = s.strip_prefix(prefix) {
            let inner = rest
                .strip_suffix('>')
                .ok_or_else(|| format!("missing closing '>' in {}", s))?;
            return Ok(wrap(Box::new(parse_inner(inner.trim())?)));
        }
    }

    if is_identifier(s) {
        Ok(TypeExpr::Named(s.to_string()))
    } else {
        Err(format!("{:?} is not a type name", s))
    }
}

/// Check that a name is a valid identifier: `_` or XID_Start, then XID_Continue.
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first == '_' || unicode_ident::is_xid_start(first) => {}
        _ => return false,
    }
    chars.all(unicode_ident::is_xid_continue)
}

/// Validate a struct, field or interface name.
pub fn check_identifier(name: &str) -> Result<()> {
    if is_identifier(name) {
        Ok(())
    } else {
        Err(SchemaError::InvalidIdentifier {
            name: name.to_string(),
        })
    }
}
