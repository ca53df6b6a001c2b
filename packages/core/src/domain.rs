//! Tri-state domain values and the value classifier.

use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeMap, HashMap};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::types::DomainStruct;

/// Classification of a domain value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ValueState {
    Null,
    Unknown,
    Known,
}

/// A domain model value: null, unknown, or a known payload.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum DomainValue {
    #[default]
    Null,
    Unknown,
    Known(Known),
}

/// Payload of a known domain value.
///
/// A `List` or `Set` holding objects is a nested object collection.
#[derive(Clone, Debug)]
pub enum Known {
    Bool(bool),
    Int32(i32),
    Int64(i64),
    Float32(f32),
    Float64(f64),
    String(String),
    List(Vec<DomainValue>),
    Set(Vec<DomainValue>),
    Map(BTreeMap<String, DomainValue>),
    Object(DomainObject),
}

impl DomainValue {
    /// Classify this value.
    pub fn state(&self) -> ValueState {
        match self {
            DomainValue::Null => ValueState::Null,
            DomainValue::Unknown => ValueState::Unknown,
            DomainValue::Known(_) => ValueState::Known,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, DomainValue::Null)
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, DomainValue::Unknown)
    }

    pub fn is_known(&self) -> bool {
        matches!(self, DomainValue::Known(_))
    }

    pub fn known(&self) -> Option<&Known> {
        match self {
            DomainValue::Known(k) => Some(k),
            _ => None,
        }
    }

    pub fn bool(v: bool) -> Self {
        DomainValue::Known(Known::Bool(v))
    }

    pub fn int32(v: i32) -> Self {
        DomainValue::Known(Known::Int32(v))
    }

    pub fn int64(v: i64) -> Self {
        DomainValue::Known(Known::Int64(v))
    }

    pub fn float32(v: f32) -> Self {
        DomainValue::Known(Known::Float32(v))
    }

    pub fn float64(v: f64) -> Self {
        DomainValue::Known(Known::Float64(v))
    }

    pub fn string(v: impl Into<String>) -> Self {
        DomainValue::Known(Known::String(v.into()))
    }

    pub fn list(items: impl IntoIterator<Item = DomainValue>) -> Self {
        DomainValue::Known(Known::List(items.into_iter().collect()))
    }

    /// A set; duplicate elements are dropped, first occurrence wins.
    pub fn set(items: impl IntoIterator<Item = DomainValue>) -> Self {
        let mut out: Vec<DomainValue> = Vec::new();
        let mut seen: HashMap<u64, Vec<usize>> = HashMap::new();
        for item in items {
            let bucket = seen.entry(hash_one(&item)).or_default();
            if bucket.iter().any(|&i| out[i] == item) {
                continue;
            }
            bucket.push(out.len());
            out.push(item);
        }
        DomainValue::Known(Known::Set(out))
    }

    pub fn map(entries: impl IntoIterator<Item = (String, DomainValue)>) -> Self {
        DomainValue::Known(Known::Map(entries.into_iter().collect()))
    }

    pub fn object(obj: DomainObject) -> Self {
        DomainValue::Known(Known::Object(obj))
    }

    pub fn strings<S: Into<String>>(items: impl IntoIterator<Item = S>) -> Vec<DomainValue> {
        items.into_iter().map(DomainValue::string).collect()
    }

    pub fn as_object(&self) -> Option<&DomainObject> {
        match self {
            DomainValue::Known(Known::Object(obj)) => Some(obj),
            _ => None,
        }
    }

    pub fn as_object_mut(&mut self) -> Option<&mut DomainObject> {
        match self {
            DomainValue::Known(Known::Object(obj)) => Some(obj),
            _ => None,
        }
    }

    /// Elements of a known list or set.
    pub fn elements(&self) -> Option<&[DomainValue]> {
        match self {
            DomainValue::Known(Known::List(items)) | DomainValue::Known(Known::Set(items)) => {
                Some(items)
            }
            _ => None,
        }
    }
}

impl Known {
    /// Short name of the payload variant, for diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Known::Bool(_) => "Bool",
            Known::Int32(_) => "Int32",
            Known::Int64(_) => "Int64",
            Known::Float32(_) => "Float32",
            Known::Float64(_) => "Float64",
            Known::String(_) => "String",
            Known::List(_) => "List",
            Known::Set(_) => "Set",
            Known::Map(_) => "Map",
            Known::Object(_) => "Object",
        }
    }
}

impl PartialEq for Known {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Known::Bool(a), Known::Bool(b)) => a == b,
            (Known::Int32(a), Known::Int32(b)) => a == b,
            (Known::Int64(a), Known::Int64(b)) => a == b,
            (Known::Float32(a), Known::Float32(b)) => a == b,
            (Known::Float64(a), Known::Float64(b)) => a == b,
            (Known::String(a), Known::String(b)) => a == b,
            (Known::List(a), Known::List(b)) => a == b,
            (Known::Set(a), Known::Set(b)) => same_members(a, b),
            (Known::Map(a), Known::Map(b)) => a == b,
            (Known::Object(a), Known::Object(b)) => a == b,
            _ => false,
        }
    }
}

/// Unordered comparison of set members.
fn same_members(a: &[DomainValue], b: &[DomainValue]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut pending: HashMap<u64, Vec<&DomainValue>> = HashMap::new();
    for candidate in b {
        pending.entry(hash_one(candidate)).or_default().push(candidate);
    }
    a.iter().all(|item| {
        let Some(bucket) = pending.get_mut(&hash_one(item)) else {
            return false;
        };
        match bucket.iter().position(|candidate| *candidate == item) {
            Some(i) => {
                bucket.swap_remove(i);
                true
            }
            None => false,
        }
    })
}

fn hash_one<T: Hash + ?Sized>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

// Hashing agrees with equality: set members combine order-independently,
// objects hash by type name, and both float zeroes hash alike.
impl Hash for DomainValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        if let DomainValue::Known(known) = self {
            known.hash(state);
        }
    }
}

impl Hash for Known {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Known::Bool(v) => v.hash(state),
            Known::Int32(v) => v.hash(state),
            Known::Int64(v) => v.hash(state),
            Known::Float32(v) => (if *v == 0.0 { 0.0f32 } else { *v }).to_bits().hash(state),
            Known::Float64(v) => (if *v == 0.0 { 0.0f64 } else { *v }).to_bits().hash(state),
            Known::String(v) => v.hash(state),
            Known::List(items) => items.hash(state),
            Known::Set(items) => {
                items.len().hash(state);
                items
                    .iter()
                    .map(hash_one)
                    .fold(0u64, u64::wrapping_add)
                    .hash(state);
            }
            Known::Map(entries) => entries.hash(state),
            Known::Object(obj) => obj.hash(state),
        }
    }
}

/// An instance of a domain struct type.
///
/// Holds one value per declared field, in declaration order. A new object
/// starts with every field null.
#[derive(Clone, Debug)]
pub struct DomainObject {
    def: Arc<DomainStruct>,
    values: Vec<DomainValue>,
}

impl DomainObject {
    pub fn new(def: Arc<DomainStruct>) -> Self {
        let values = vec![DomainValue::Null; def.fields.len()];
        DomainObject { def, values }
    }

    pub fn def(&self) -> &Arc<DomainStruct> {
        &self.def
    }

    pub fn type_name(&self) -> &str {
        &self.def.name
    }

    pub fn get(&self, name: &str) -> Option<&DomainValue> {
        self.def.field_index(name).map(|i| &self.values[i])
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut DomainValue> {
        self.def.field_index(name).map(move |i| &mut self.values[i])
    }

    /// Set a field by name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoSuchField`] if the type declares no such field.
    pub fn set(&mut self, name: &str, value: DomainValue) -> Result<()> {
        match self.def.field_index(name) {
            Some(i) => {
                self.values[i] = value;
                Ok(())
            }
            None => Err(Error::NoSuchField {
                type_name: self.def.name.clone(),
                field: name.to_string(),
            }),
        }
    }

    /// Builder form of [`set`](Self::set).
    pub fn with(mut self, name: &str, value: DomainValue) -> Result<Self> {
        self.set(name, value)?;
        Ok(self)
    }

    pub fn values(&self) -> &[DomainValue] {
        &self.values
    }

    pub fn values_mut(&mut self) -> &mut [DomainValue] {
        &mut self.values
    }

    /// Iterate over `(field name, value)` pairs in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &DomainValue)> {
        self.def
            .fields
            .iter()
            .map(|f| f.name.as_str())
            .zip(self.values.iter())
    }
}

impl PartialEq for DomainObject {
    fn eq(&self, other: &Self) -> bool {
        (Arc::ptr_eq(&self.def, &other.def) || self.def.name == other.def.name)
            && self.values == other.values
    }
}

impl Hash for DomainObject {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.def.name.hash(state);
        self.values.hash(state);
    }
}
