//! JSON <-> domain and wire value conversion.
//!
//! Decoding is type-directed: the declared field type decides how a JSON
//! value is read. Two markers extend plain JSON:
//! - `{"$unknown": true}` is a domain `Unknown`
//! - `{"$type": "Circle", ...}` selects the implementor of a wire interface
//!
//! Wire `[]byte` values travel as base64 strings.

use std::collections::BTreeMap;

use base64::Engine as _;
use serde_json::{Map, Number, Value as Json};
use structflex_core::{
    DomainObject, DomainStruct, DomainType, DomainValue, Known, Path, WireObject, WireStruct,
    WireType, WireValue,
};
use structflex_engine::{narrow_f64, widen_f32};

use crate::error::{Result, SchemaError};
use crate::schema::Schema;

pub const UNKNOWN_MARKER: &str = "$unknown";
pub const TYPE_MARKER: &str = "$type";

impl Schema {
    /// Read a domain object of type `def` from a JSON object.
    ///
    /// Fields missing from the JSON are null.
    pub fn domain_object(
        &self,
        json: &Json,
        def: &std::sync::Arc<DomainStruct>,
    ) -> Result<DomainObject> {
        decode_domain_object(json, def, &Path::root())
    }

    /// Read a domain value of type `ty`.
    pub fn domain_value(&self, json: &Json, ty: &DomainType) -> Result<DomainValue> {
        decode_domain(json, ty, &Path::root())
    }

    /// Read a wire struct of type `def` from a JSON object.
    ///
    /// Fields missing from the JSON hold their zero value.
    pub fn wire_object(&self, json: &Json, def: &std::sync::Arc<WireStruct>) -> Result<WireObject> {
        self.decode_wire_object(json, def, &Path::root())
    }

    /// Read a wire value of type `ty`.
    pub fn wire_value(&self, json: &Json, ty: &WireType) -> Result<WireValue> {
        self.decode_wire(json, ty, &Path::root())
    }

    fn decode_wire(&self, json: &Json, ty: &WireType, path: &Path) -> Result<WireValue> {
        Ok(match (ty, json) {
            (
                WireType::Pointer(_)
                | WireType::Slice(_)
                | WireType::Map(_)
                | WireType::Interface(_),
                Json::Null,
            ) => WireValue::Nil,
            (WireType::Pointer(inner), json) => {
                WireValue::pointer(self.decode_wire(json, inner, path)?)
            }
            (WireType::Bool, Json::Bool(b)) => WireValue::Bool(*b),
            (WireType::Int32, Json::Number(n)) => WireValue::Int32(int32(n, path)?),
            (WireType::Int64, Json::Number(n)) => WireValue::Int64(int64(n, path)?),
            (WireType::Float32, Json::Number(n)) => WireValue::Float32(narrow_f64(float(n, path)?)),
            (WireType::Float64, Json::Number(n)) => WireValue::Float64(float(n, path)?),
            (WireType::String, Json::String(s)) => WireValue::String(s.clone()),
            (WireType::Bytes, Json::String(s)) => WireValue::Bytes(
                base64::engine::general_purpose::STANDARD
                    .decode(s)
                    .map_err(|e| SchemaError::InvalidBytes {
                        path: display(path),
                        message: e.to_string(),
                    })?,
            ),
            (WireType::Slice(elem), Json::Array(items)) => WireValue::Slice(
                items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| self.decode_wire(item, elem, &path.at_index(i)))
                    .collect::<Result<Vec<_>>>()?,
            ),
            (WireType::Map(elem), Json::Object(entries)) => WireValue::Map(
                entries
                    .iter()
                    .map(|(k, v)| Ok((k.clone(), self.decode_wire(v, elem, &path.at_key(k))?)))
                    .collect::<Result<BTreeMap<_, _>>>()?,
            ),
            (WireType::Struct(def), Json::Object(_)) => {
                WireValue::Struct(self.decode_wire_object(json, def, path)?)
            }
            (WireType::Interface(iface), Json::Object(fields)) => {
                let name = fields
                    .get(TYPE_MARKER)
                    .and_then(Json::as_str)
                    .ok_or_else(|| mismatch(path, "an object with \"$type\"", json))?;
                if !iface.is_implemented_by(name) {
                    return Err(SchemaError::TypeMismatch {
                        path: display(path),
                        expected: format!("an implementor of {}", iface.name),
                        found: name.to_string(),
                    });
                }
                let def = self.wire(name)?;
                WireValue::pointer_to(self.decode_wire_object(json, def, path)?)
            }
            (ty, json) => return Err(mismatch(path, &ty.to_string(), json)),
        })
    }

    fn decode_wire_object(
        &self,
        json: &Json,
        def: &std::sync::Arc<WireStruct>,
        path: &Path,
    ) -> Result<WireObject> {
        let fields = json
            .as_object()
            .ok_or_else(|| mismatch(path, &def.name, json))?;
        let mut obj = WireObject::zero(def.clone());
        for (name, value) in fields {
            if name == TYPE_MARKER {
                continue;
            }
            let index = def
                .field_index(name)
                .ok_or_else(|| unknown_field(path, &def.name, name))?;
            let decoded = self.decode_wire(value, &def.fields[index].ty, &path.at_name(name))?;
            obj.values_mut()[index] = decoded;
        }
        Ok(obj)
    }
}

fn decode_domain(json: &Json, ty: &DomainType, path: &Path) -> Result<DomainValue> {
    match json {
        Json::Null => return Ok(DomainValue::Null),
        Json::Object(fields) if is_unknown_marker(fields) => return Ok(DomainValue::Unknown),
        _ => {}
    }
    let known = match (ty, json) {
        (DomainType::Bool, Json::Bool(b)) => Known::Bool(*b),
        (DomainType::Int32, Json::Number(n)) => Known::Int32(int32(n, path)?),
        (DomainType::Int64, Json::Number(n)) => Known::Int64(int64(n, path)?),
        (DomainType::Float32, Json::Number(n)) => Known::Float32(narrow_f64(float(n, path)?)),
        (DomainType::Float64, Json::Number(n)) => Known::Float64(float(n, path)?),
        (DomainType::String, Json::String(s)) => Known::String(s.clone()),
        (DomainType::List(elem), Json::Array(items)) => {
            Known::List(decode_items(items, elem, path)?)
        }
        (DomainType::Set(elem), Json::Array(items)) => {
            return Ok(DomainValue::set(decode_items(items, elem, path)?))
        }
        (DomainType::Map(elem), Json::Object(entries)) => Known::Map(
            entries
                .iter()
                .map(|(k, v)| Ok((k.clone(), decode_domain(v, elem, &path.at_key(k))?)))
                .collect::<Result<BTreeMap<_, _>>>()?,
        ),
        (DomainType::Object(def), Json::Object(_)) => {
            Known::Object(decode_domain_object(json, def, path)?)
        }
        (ty, json) => return Err(mismatch(path, &ty.to_string(), json)),
    };
    Ok(DomainValue::Known(known))
}

fn decode_items(items: &[Json], elem: &DomainType, path: &Path) -> Result<Vec<DomainValue>> {
    items
        .iter()
        .enumerate()
        .map(|(i, item)| decode_domain(item, elem, &path.at_index(i)))
        .collect()
}

fn decode_domain_object(
    json: &Json,
    def: &std::sync::Arc<DomainStruct>,
    path: &Path,
) -> Result<DomainObject> {
    let fields = json
        .as_object()
        .ok_or_else(|| mismatch(path, &def.name, json))?;
    let mut obj = DomainObject::new(def.clone());
    for (name, value) in fields {
        let index = def
            .field_index(name)
            .ok_or_else(|| unknown_field(path, &def.name, name))?;
        let decoded = decode_domain(value, &def.fields[index].ty, &path.at_name(name))?;
        obj.values_mut()[index] = decoded;
    }
    Ok(obj)
}

fn is_unknown_marker(fields: &Map<String, Json>) -> bool {
    fields.len() == 1 && fields.get(UNKNOWN_MARKER) == Some(&Json::Bool(true))
}

/// Render a domain value. Objects list every declared field, nulls included.
pub fn domain_to_json(value: &DomainValue) -> Json {
    match value {
        DomainValue::Null => Json::Null,
        DomainValue::Unknown => {
            let mut marker = Map::new();
            marker.insert(UNKNOWN_MARKER.to_string(), Json::Bool(true));
            Json::Object(marker)
        }
        DomainValue::Known(known) => match known {
            Known::Bool(b) => Json::Bool(*b),
            Known::Int32(v) => Json::from(*v),
            Known::Int64(v) => Json::from(*v),
            Known::Float32(v) => float_json(widen_f32(*v)),
            Known::Float64(v) => float_json(*v),
            Known::String(s) => Json::String(s.clone()),
            Known::List(items) | Known::Set(items) => {
                Json::Array(items.iter().map(domain_to_json).collect())
            }
            Known::Map(entries) => Json::Object(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), domain_to_json(v)))
                    .collect(),
            ),
            Known::Object(obj) => domain_object_to_json(obj),
        },
    }
}

pub fn domain_object_to_json(obj: &DomainObject) -> Json {
    Json::Object(
        obj.iter()
            .map(|(name, value)| (name.to_string(), domain_to_json(value)))
            .collect(),
    )
}

/// Render a wire value of declared type `ty`.
///
/// Pointers are transparent and nil renders as `null`. Structs stored in
/// an interface carry a `$type` key.
pub fn wire_to_json(value: &WireValue, ty: &WireType) -> Json {
    render_wire(value, Some(ty))
}

pub fn wire_object_to_json(obj: &WireObject) -> Json {
    struct_json(obj, false)
}

fn render_wire(value: &WireValue, ty: Option<&WireType>) -> Json {
    match value {
        WireValue::Nil => Json::Null,
        WireValue::Bool(b) => Json::Bool(*b),
        WireValue::Int32(v) => Json::from(*v),
        WireValue::Int64(v) => Json::from(*v),
        WireValue::Float32(v) => float_json(widen_f32(*v)),
        WireValue::Float64(v) => float_json(*v),
        WireValue::String(s) => Json::String(s.clone()),
        WireValue::Bytes(b) => Json::String(base64::engine::general_purpose::STANDARD.encode(b)),
        WireValue::Pointer(inner) => match ty {
            Some(WireType::Pointer(pointee)) => render_wire(inner, Some(pointee)),
            other => render_wire(inner, other),
        },
        WireValue::Slice(items) => {
            let elem = match ty {
                Some(WireType::Slice(elem)) => Some(&**elem),
                _ => None,
            };
            Json::Array(items.iter().map(|item| render_wire(item, elem)).collect())
        }
        WireValue::Map(entries) => {
            let elem = match ty {
                Some(WireType::Map(elem)) => Some(&**elem),
                _ => None,
            };
            Json::Object(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), render_wire(v, elem)))
                    .collect(),
            )
        }
        WireValue::Struct(obj) => struct_json(obj, matches!(ty, Some(WireType::Interface(_)))),
    }
}

fn struct_json(obj: &WireObject, tagged: bool) -> Json {
    let mut fields = Map::new();
    if tagged {
        fields.insert(TYPE_MARKER.to_string(), Json::String(obj.type_name().to_string()));
    }
    for (field, value) in obj.def().fields.iter().zip(obj.values()) {
        fields.insert(field.name.clone(), render_wire(value, Some(&field.ty)));
    }
    Json::Object(fields)
}

fn float_json(v: f64) -> Json {
    Number::from_f64(v).map(Json::Number).unwrap_or(Json::Null)
}

fn int32(n: &Number, path: &Path) -> Result<i32> {
    let wide = int64(n, path)?;
    i32::try_from(wide).map_err(|_| out_of_range(path, n, "int32"))
}

fn int64(n: &Number, path: &Path) -> Result<i64> {
    n.as_i64().ok_or_else(|| out_of_range(path, n, "int64"))
}

fn float(n: &Number, path: &Path) -> Result<f64> {
    n.as_f64().ok_or_else(|| out_of_range(path, n, "float64"))
}

fn display(path: &Path) -> String {
    if path.is_empty() {
        "$".to_string()
    } else {
        path.to_string()
    }
}

fn json_kind(json: &Json) -> &'static str {
    match json {
        Json::Null => "null",
        Json::Bool(_) => "boolean",
        Json::Number(_) => "number",
        Json::String(_) => "string",
        Json::Array(_) => "array",
        Json::Object(_) => "object",
    }
}

fn mismatch(path: &Path, expected: &str, found: &Json) -> SchemaError {
    SchemaError::TypeMismatch {
        path: display(path),
        expected: expected.to_string(),
        found: json_kind(found).to_string(),
    }
}

fn out_of_range(path: &Path, n: &Number, ty: &str) -> SchemaError {
    SchemaError::OutOfRange {
        path: display(path),
        value: n.to_string(),
        ty: ty.to_string(),
    }
}

fn unknown_field(path: &Path, type_name: &str, field: &str) -> SchemaError {
    SchemaError::UnknownField {
        path: display(path),
        type_name: type_name.to_string(),
        field: field.to_string(),
    }
}
