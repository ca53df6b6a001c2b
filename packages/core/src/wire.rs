//! Wire model values.
//!
//! `Nil` stands for every nilable wire shape: a nil pointer, nil slice, nil
//! map or nil interface. A non-nil empty slice is `Slice(vec![])`, which is
//! a different value.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::types::WireStruct;

#[derive(Clone, Debug, Default, PartialEq)]
pub enum WireValue {
    #[default]
    Nil,
    Bool(bool),
    Int32(i32),
    Int64(i64),
    Float32(f32),
    Float64(f64),
    String(String),
    Bytes(Vec<u8>),
    Pointer(Box<WireValue>),
    Slice(Vec<WireValue>),
    Map(BTreeMap<String, WireValue>),
    Struct(WireObject),
}

impl WireValue {
    pub fn pointer(inner: WireValue) -> Self {
        WireValue::Pointer(Box::new(inner))
    }

    /// A pointer to a struct value, the usual externalize target.
    pub fn pointer_to(obj: WireObject) -> Self {
        WireValue::pointer(WireValue::Struct(obj))
    }

    pub fn string(v: impl Into<String>) -> Self {
        WireValue::String(v.into())
    }

    pub fn strings<S: Into<String>>(items: impl IntoIterator<Item = S>) -> Self {
        WireValue::Slice(items.into_iter().map(WireValue::string).collect())
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, WireValue::Nil)
    }

    /// Follow one pointer. `Nil` yields `None`; non-pointers yield themselves.
    pub fn deref(&self) -> Option<&WireValue> {
        match self {
            WireValue::Nil => None,
            WireValue::Pointer(inner) => Some(inner),
            other => Some(other),
        }
    }

    pub fn as_struct(&self) -> Option<&WireObject> {
        match self.deref()? {
            WireValue::Struct(obj) => Some(obj),
            _ => None,
        }
    }

    pub fn as_struct_mut(&mut self) -> Option<&mut WireObject> {
        match self {
            WireValue::Struct(obj) => Some(obj),
            WireValue::Pointer(inner) => match &mut **inner {
                WireValue::Struct(obj) => Some(obj),
                _ => None,
            },
            _ => None,
        }
    }

    /// Zero in the loose sense used for wrapper collapsing.
    ///
    /// Pointers count as zero when nil or when they point at a zero value;
    /// slices and maps count as zero when empty.
    pub fn is_zero_like(&self) -> bool {
        match self {
            WireValue::Nil => true,
            WireValue::Bool(b) => !b,
            WireValue::Int32(v) => *v == 0,
            WireValue::Int64(v) => *v == 0,
            WireValue::Float32(v) => *v == 0.0,
            WireValue::Float64(v) => *v == 0.0,
            WireValue::String(s) => s.is_empty(),
            WireValue::Bytes(b) => b.is_empty(),
            WireValue::Pointer(inner) => inner.is_zero_like(),
            WireValue::Slice(items) => items.is_empty(),
            WireValue::Map(entries) => entries.is_empty(),
            WireValue::Struct(obj) => obj.values().iter().all(WireValue::is_zero_like),
        }
    }

    /// Short description of the value's shape, for diagnostics.
    pub fn shape_name(&self) -> String {
        match self {
            WireValue::Nil => "nil".to_string(),
            WireValue::Bool(_) => "bool".to_string(),
            WireValue::Int32(_) => "int32".to_string(),
            WireValue::Int64(_) => "int64".to_string(),
            WireValue::Float32(_) => "float32".to_string(),
            WireValue::Float64(_) => "float64".to_string(),
            WireValue::String(_) => "string".to_string(),
            WireValue::Bytes(_) => "[]byte".to_string(),
            WireValue::Pointer(inner) => format!("*{}", inner.shape_name()),
            WireValue::Slice(_) => "slice".to_string(),
            WireValue::Map(_) => "map".to_string(),
            WireValue::Struct(obj) => obj.type_name().to_string(),
        }
    }
}

/// An instance of a wire struct type, one value per declared field.
#[derive(Clone, Debug)]
pub struct WireObject {
    def: Arc<WireStruct>,
    values: Vec<WireValue>,
}

impl WireObject {
    /// A struct whose fields all hold their zero value.
    pub fn zero(def: Arc<WireStruct>) -> Self {
        let values = def.fields.iter().map(|f| f.ty.zero_value()).collect();
        WireObject { def, values }
    }

    pub fn def(&self) -> &Arc<WireStruct> {
        &self.def
    }

    pub fn type_name(&self) -> &str {
        &self.def.name
    }

    pub fn get(&self, name: &str) -> Option<&WireValue> {
        self.def.field_index(name).map(|i| &self.values[i])
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut WireValue> {
        self.def.field_index(name).map(move |i| &mut self.values[i])
    }

    /// Set a field by name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoSuchField`] if the type declares no such field.
    pub fn set(&mut self, name: &str, value: WireValue) -> Result<()> {
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
    pub fn with(mut self, name: &str, value: WireValue) -> Result<Self> {
        self.set(name, value)?;
        Ok(self)
    }

    pub fn values(&self) -> &[WireValue] {
        &self.values
    }

    pub fn values_mut(&mut self) -> &mut [WireValue] {
        &mut self.values
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &WireValue)> {
        self.def
            .fields
            .iter()
            .map(|f| f.name.as_str())
            .zip(self.values.iter())
    }
}

impl PartialEq for WireObject {
    fn eq(&self, other: &Self) -> bool {
        (Arc::ptr_eq(&self.def, &other.def) || self.def.name == other.def.name)
            && self.values == other.values
    }
}
