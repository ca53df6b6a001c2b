//! Schema descriptors for the domain and wire model families.
//!
//! A struct *type* is an immutable descriptor shared behind an `Arc`. Struct
//! *values* ([`DomainObject`](crate::DomainObject),
//! [`WireObject`](crate::WireObject)) point back at their descriptor, so the
//! engine always knows the declared type of every field it touches.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::hooks::{Externalizer, Hooks, Internalizer, TypedExternalizer};
use crate::wire::{WireObject, WireValue};

/// Already-parsed tag metadata for a single struct field.
///
/// A `name` of `"-"` excludes the field from conversion entirely.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldTag {
    /// Rename used when matching against the other model.
    pub name: Option<String>,
    /// Collapse empty values to null / nil.
    pub omitempty: bool,
    /// Map absent values to the type's zero value and back.
    pub legacy: bool,
    /// Sequence field of the counted-collection wrapper this field maps to.
    pub wrapper: Option<String>,
    /// Never written by the engine.
    pub read_only: bool,
    /// Never a target when internalizing.
    pub no_internalize: bool,
}

impl FieldTag {
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// A tag excluding the field from conversion.
    pub fn excluded() -> Self {
        Self::default().with_name("-")
    }

    pub fn with_omitempty(mut self) -> Self {
        self.omitempty = true;
        self
    }

    pub fn with_legacy(mut self) -> Self {
        self.legacy = true;
        self
    }

    pub fn with_wrapper(mut self, sequence_field: impl Into<String>) -> Self {
        self.wrapper = Some(sequence_field.into());
        self
    }

    pub fn with_read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    pub fn with_no_internalize(mut self) -> Self {
        self.no_internalize = true;
        self
    }

    pub fn is_excluded(&self) -> bool {
        self.name.as_deref() == Some("-")
    }
}

/// One declared field of a struct type.
#[derive(Clone, Debug, PartialEq)]
pub struct Field<T> {
    pub name: String,
    pub ty: T,
    pub tag: FieldTag,
}

impl<T> Field<T> {
    pub fn new(name: impl Into<String>, ty: T) -> Self {
        Field {
            name: name.into(),
            ty,
            tag: FieldTag::default(),
        }
    }

    #[must_use]
    pub fn tagged(mut self, tag: FieldTag) -> Self {
        self.tag = tag;
        self
    }
}

/// Type of a field in the wire model.
#[derive(Clone, Debug)]
pub enum WireType {
    Bool,
    Int32,
    Int64,
    Float32,
    Float64,
    String,
    /// `[]byte`
    Bytes,
    /// Nilable pointer to a value.
    Pointer(Box<WireType>),
    /// Native slice. Nil and empty are distinct.
    Slice(Box<WireType>),
    /// Native map with string keys.
    Map(Box<WireType>),
    Struct(Arc<WireStruct>),
    Interface(Arc<InterfaceDef>),
}

impl WireType {
    pub fn pointer(inner: WireType) -> Self {
        WireType::Pointer(Box::new(inner))
    }

    pub fn slice(elem: WireType) -> Self {
        WireType::Slice(Box::new(elem))
    }

    pub fn map(elem: WireType) -> Self {
        WireType::Map(Box::new(elem))
    }

    /// The type behind one pointer indirection, or the type itself.
    pub fn pointee(&self) -> &WireType {
        match self {
            WireType::Pointer(inner) => inner,
            other => other,
        }
    }

    pub fn is_pointer(&self) -> bool {
        matches!(self, WireType::Pointer(_))
    }

    /// Struct descriptor of this type, looking through one pointer.
    pub fn struct_def(&self) -> Option<&Arc<WireStruct>> {
        match self.pointee() {
            WireType::Struct(def) => Some(def),
            _ => None,
        }
    }

    /// True for `*int32` and `*int64`, the shapes a wrapper count may take.
    pub fn is_optional_integer(&self) -> bool {
        matches!(
            self,
            WireType::Pointer(inner) if matches!(**inner, WireType::Int32 | WireType::Int64)
        )
    }

    /// The Go-style zero value of this type.
    pub fn zero_value(&self) -> WireValue {
        match self {
            WireType::Bool => WireValue::Bool(false),
            WireType::Int32 => WireValue::Int32(0),
            WireType::Int64 => WireValue::Int64(0),
            WireType::Float32 => WireValue::Float32(0.0),
            WireType::Float64 => WireValue::Float64(0.0),
            WireType::String => WireValue::String(String::new()),
            WireType::Bytes => WireValue::Bytes(Vec::new()),
            WireType::Pointer(_)
            | WireType::Slice(_)
            | WireType::Map(_)
            | WireType::Interface(_) => WireValue::Nil,
            WireType::Struct(def) => WireValue::Struct(WireObject::zero(def.clone())),
        }
    }
}

impl PartialEq for WireType {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (WireType::Bool, WireType::Bool)
            | (WireType::Int32, WireType::Int32)
            | (WireType::Int64, WireType::Int64)
            | (WireType::Float32, WireType::Float32)
            | (WireType::Float64, WireType::Float64)
            | (WireType::String, WireType::String)
            | (WireType::Bytes, WireType::Bytes) => true,
            (WireType::Pointer(a), WireType::Pointer(b))
            | (WireType::Slice(a), WireType::Slice(b))
            | (WireType::Map(a), WireType::Map(b)) => a == b,
            (WireType::Struct(a), WireType::Struct(b)) => Arc::ptr_eq(a, b) || a.name == b.name,
            (WireType::Interface(a), WireType::Interface(b)) => {
                Arc::ptr_eq(a, b) || a.name == b.name
            }
            _ => false,
        }
    }
}

impl fmt::Display for WireType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WireType::Bool => write!(f, "bool"),
            WireType::Int32 => write!(f, "int32"),
            WireType::Int64 => write!(f, "int64"),
            WireType::Float32 => write!(f, "float32"),
            WireType::Float64 => write!(f, "float64"),
            WireType::String => write!(f, "string"),
            WireType::Bytes => write!(f, "[]byte"),
            WireType::Pointer(inner) => write!(f, "*{}", inner),
            WireType::Slice(elem) => write!(f, "[]{}", elem),
            WireType::Map(elem) => write!(f, "map[string]{}", elem),
            WireType::Struct(def) => write!(f, "{}", def.name),
            WireType::Interface(def) => write!(f, "{}", def.name),
        }
    }
}

/// Type of a field in the domain model.
///
/// A `List` or `Set` of `Object` is a nested object collection.
#[derive(Clone, Debug)]
pub enum DomainType {
    Bool,
    Int32,
    Int64,
    Float32,
    Float64,
    String,
    List(Box<DomainType>),
    Set(Box<DomainType>),
    Map(Box<DomainType>),
    Object(Arc<DomainStruct>),
}

impl DomainType {
    pub fn list(elem: DomainType) -> Self {
        DomainType::List(Box::new(elem))
    }

    pub fn set(elem: DomainType) -> Self {
        DomainType::Set(Box::new(elem))
    }

    pub fn map(elem: DomainType) -> Self {
        DomainType::Map(Box::new(elem))
    }

    pub fn object(def: &Arc<DomainStruct>) -> Self {
        DomainType::Object(def.clone())
    }

    pub fn list_of_objects(def: &Arc<DomainStruct>) -> Self {
        DomainType::list(DomainType::object(def))
    }

    pub fn set_of_objects(def: &Arc<DomainStruct>) -> Self {
        DomainType::set(DomainType::object(def))
    }

    /// Element type of a list, set or map.
    pub fn element(&self) -> Option<&DomainType> {
        match self {
            DomainType::List(elem) | DomainType::Set(elem) | DomainType::Map(elem) => Some(elem),
            _ => None,
        }
    }

    /// Struct descriptor of an object, or of the elements of an object collection.
    pub fn object_def(&self) -> Option<&Arc<DomainStruct>> {
        match self {
            DomainType::Object(def) => Some(def),
            DomainType::List(elem) | DomainType::Set(elem) => match &**elem {
                DomainType::Object(def) => Some(def),
                _ => None,
            },
            _ => None,
        }
    }

    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            DomainType::Bool
                | DomainType::Int32
                | DomainType::Int64
                | DomainType::Float32
                | DomainType::Float64
                | DomainType::String
        )
    }

    /// List or set whose elements are not objects.
    pub fn is_plain_collection(&self) -> bool {
        match self {
            DomainType::List(elem) | DomainType::Set(elem) => {
                !matches!(**elem, DomainType::Object(_))
            }
            _ => false,
        }
    }
}

impl PartialEq for DomainType {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (DomainType::Bool, DomainType::Bool)
            | (DomainType::Int32, DomainType::Int32)
            | (DomainType::Int64, DomainType::Int64)
            | (DomainType::Float32, DomainType::Float32)
            | (DomainType::Float64, DomainType::Float64)
            | (DomainType::String, DomainType::String) => true,
            (DomainType::List(a), DomainType::List(b))
            | (DomainType::Set(a), DomainType::Set(b))
            | (DomainType::Map(a), DomainType::Map(b)) => a == b,
            (DomainType::Object(a), DomainType::Object(b)) => {
                Arc::ptr_eq(a, b) || a.name == b.name
            }
            _ => false,
        }
    }
}

impl fmt::Display for DomainType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DomainType::Bool => write!(f, "Bool"),
            DomainType::Int32 => write!(f, "Int32"),
            DomainType::Int64 => write!(f, "Int64"),
            DomainType::Float32 => write!(f, "Float32"),
            DomainType::Float64 => write!(f, "Float64"),
            DomainType::String => write!(f, "String"),
            DomainType::List(elem) => write!(f, "List[{}]", elem),
            DomainType::Set(elem) => write!(f, "Set[{}]", elem),
            DomainType::Map(elem) => write!(f, "Map[{}]", elem),
            DomainType::Object(def) => write!(f, "Object[{}]", def.name),
        }
    }
}

/// A wire model struct type.
#[derive(Debug)]
pub struct WireStruct {
    pub name: String,
    pub fields: Vec<Field<WireType>>,
}

impl WireStruct {
    pub fn new(name: impl Into<String>) -> Self {
        WireStruct {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    #[must_use]
    pub fn field(mut self, name: impl Into<String>, ty: WireType) -> Self {
        self.fields.push(Field::new(name, ty));
        self
    }

    #[must_use]
    pub fn tagged_field(mut self, name: impl Into<String>, ty: WireType, tag: FieldTag) -> Self {
        self.fields.push(Field::new(name, ty).tagged(tag));
        self
    }

    pub fn build(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }
}

/// A domain model struct type, with optional customization hooks.
#[derive(Debug)]
pub struct DomainStruct {
    pub name: String,
    pub fields: Vec<Field<DomainType>>,
    pub hooks: Hooks,
}

impl DomainStruct {
    pub fn new(name: impl Into<String>) -> Self {
        DomainStruct {
            name: name.into(),
            fields: Vec::new(),
            hooks: Hooks::default(),
        }
    }

    #[must_use]
    pub fn field(mut self, name: impl Into<String>, ty: DomainType) -> Self {
        self.fields.push(Field::new(name, ty));
        self
    }

    #[must_use]
    pub fn tagged_field(
        mut self,
        name: impl Into<String>,
        ty: DomainType,
        tag: FieldTag,
    ) -> Self {
        self.fields.push(Field::new(name, ty).tagged(tag));
        self
    }

    #[must_use]
    pub fn with_externalizer(mut self, hook: Arc<dyn Externalizer>) -> Self {
        self.hooks.externalizer = Some(hook);
        self
    }

    #[must_use]
    pub fn with_typed_externalizer(mut self, hook: Arc<dyn TypedExternalizer>) -> Self {
        self.hooks.typed_externalizer = Some(hook);
        self
    }

    #[must_use]
    pub fn with_internalizer(mut self, hook: Arc<dyn Internalizer>) -> Self {
        self.hooks.internalizer = Some(hook);
        self
    }

    pub fn build(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }
}

/// A wire interface type and the struct types satisfying it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InterfaceDef {
    pub name: String,
    pub implementors: Vec<String>,
}

impl InterfaceDef {
    pub fn new(name: impl Into<String>, implementors: &[&str]) -> Arc<Self> {
        Arc::new(InterfaceDef {
            name: name.into(),
            implementors: implementors.iter().map(|s| s.to_string()).collect(),
        })
    }

    pub fn is_implemented_by(&self, struct_name: &str) -> bool {
        self.implementors.iter().any(|n| n == struct_name)
    }
}
