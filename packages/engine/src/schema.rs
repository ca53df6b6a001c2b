//! Struct schema cache.
//!
//! Field descriptors are derived once per struct type and shared afterwards.
//! Types are identified by the address of their `Arc` descriptor; every cache
//! entry keeps a clone of that `Arc`, so an address cannot be reused by a
//! different type while the engine is alive.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use structflex_core::{
    ConversionError, DomainStruct, FieldTag, WireObject, WireStruct, WireType, WireValue,
};

/// Name of the count field of a counted-collection wrapper.
pub const COUNT_FIELD: &str = "Quantity";

/// Identity of a struct type.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct TypeKey(usize);

impl TypeKey {
    pub fn of_domain(def: &Arc<DomainStruct>) -> Self {
        TypeKey(Arc::as_ptr(def) as usize)
    }

    pub fn of_wire(def: &Arc<WireStruct>) -> Self {
        TypeKey(Arc::as_ptr(def) as usize)
    }
}

/// Conversion-relevant view of one declared field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldDescriptor {
    /// Position in the struct's declared field list.
    pub index: usize,
    pub declared_name: String,
    pub wire_name_override: Option<String>,
    pub ignored: bool,
    pub omit_if_empty: bool,
    pub legacy_zero_value: bool,
    pub wrapper_field_name: Option<String>,
    pub read_only: bool,
    pub no_internalize: bool,
}

impl FieldDescriptor {
    fn new(index: usize, name: &str, tag: &FieldTag) -> Self {
        FieldDescriptor {
            index,
            declared_name: name.to_string(),
            wire_name_override: tag.name.clone().filter(|n| n != "-"),
            ignored: tag.is_excluded(),
            omit_if_empty: tag.omitempty,
            legacy_zero_value: tag.legacy,
            wrapper_field_name: tag.wrapper.clone(),
            read_only: tag.read_only,
            no_internalize: tag.no_internalize,
        }
    }

    /// The name used to look for a counterpart in the other model.
    pub fn match_name(&self) -> &str {
        self.wire_name_override
            .as_deref()
            .unwrap_or(&self.declared_name)
    }
}

/// Layout of a counted-collection wrapper struct.
///
/// Exactly one sequence field and a `Quantity` count. Any further fields are
/// siblings, which makes the wrapper a Rule 2 wrapper.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WrapperShape {
    pub sequence: String,
    pub count: String,
    pub siblings: Vec<String>,
}

impl WrapperShape {
    /// Detect the wrapper shape from the struct's fields alone.
    pub fn detect(def: &WireStruct) -> Option<Self> {
        let mut slices = def
            .fields
            .iter()
            .filter(|f| matches!(f.ty, WireType::Slice(_)));
        let sequence = slices.next()?;
        if slices.next().is_some() {
            return None;
        }
        let count = def.fields.iter().find(|f| f.name == COUNT_FIELD)?;
        if !count.ty.is_optional_integer() {
            return None;
        }
        Some(Self::with_sequence(def, &sequence.name))
    }

    /// Validate a wrapper relationship declared on a domain field.
    pub fn declared(def: &WireStruct, sequence: &str) -> Result<Self, ConversionError> {
        let seq = def
            .fields
            .iter()
            .find(|f| f.name == sequence)
            .ok_or_else(|| ConversionError::MissingWrapperField {
                field: sequence.to_string(),
                wrapper_type: def.name.clone(),
            })?;
        if !matches!(seq.ty, WireType::Slice(_)) {
            return Err(ConversionError::IncompatibleTypes {
                source_type: seq.ty.to_string(),
                target_type: def.name.clone(),
                reason: format!("wrapper field {} is not a slice", sequence),
            });
        }
        match def.fields.iter().find(|f| f.name == COUNT_FIELD) {
            Some(count) if count.ty.is_optional_integer() => {}
            Some(count) => {
                return Err(ConversionError::IncompatibleTypes {
                    source_type: count.ty.to_string(),
                    target_type: def.name.clone(),
                    reason: format!("{} must be *int32 or *int64", COUNT_FIELD),
                })
            }
            None => {
                return Err(ConversionError::IncompatibleTypes {
                    source_type: def.name.clone(),
                    target_type: def.name.clone(),
                    reason: format!("wrapper has no {} field", COUNT_FIELD),
                })
            }
        }
        Ok(Self::with_sequence(def, sequence))
    }

    fn with_sequence(def: &WireStruct, sequence: &str) -> Self {
        let siblings = def
            .fields
            .iter()
            .filter(|f| f.name != sequence && f.name != COUNT_FIELD)
            .map(|f| f.name.clone())
            .collect();
        WrapperShape {
            sequence: sequence.to_string(),
            count: COUNT_FIELD.to_string(),
            siblings,
        }
    }

    /// Rule 2 wrappers carry sibling fields next to the sequence and count.
    pub fn is_rule2(&self) -> bool {
        !self.siblings.is_empty()
    }

    /// True when the sequence is nil or empty and every sibling is zero.
    /// The count is not consulted.
    pub fn is_all_zero(&self, wrapper: &WireObject) -> bool {
        let sequence_empty = wrapper
            .get(&self.sequence)
            .map_or(true, |seq| seq.deref().map_or(true, WireValue::is_zero_like));
        sequence_empty
            && self
                .siblings
                .iter()
                .filter_map(|name| wrapper.get(name))
                .all(WireValue::is_zero_like)
    }
}

/// Cached schema of one struct type.
#[derive(Debug)]
pub struct StructSchema {
    pub key: TypeKey,
    pub type_name: String,
    pub fields: Vec<FieldDescriptor>,
    /// Sniffed counted-collection wrapper shape. Always `None` for domain types.
    pub wrapper: Option<WrapperShape>,
}

impl StructSchema {
    fn for_domain(def: &Arc<DomainStruct>) -> Self {
        StructSchema {
            key: TypeKey::of_domain(def),
            type_name: def.name.clone(),
            fields: def
                .fields
                .iter()
                .enumerate()
                .map(|(i, f)| FieldDescriptor::new(i, &f.name, &f.tag))
                .collect(),
            wrapper: None,
        }
    }

    fn for_wire(def: &Arc<WireStruct>) -> Self {
        StructSchema {
            key: TypeKey::of_wire(def),
            type_name: def.name.clone(),
            fields: def
                .fields
                .iter()
                .enumerate()
                .map(|(i, f)| FieldDescriptor::new(i, &f.name, &f.tag))
                .collect(),
            wrapper: WrapperShape::detect(def),
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.declared_name == name)
    }
}

enum Pinned {
    Domain(#[allow(dead_code)] Arc<DomainStruct>),
    Wire(#[allow(dead_code)] Arc<WireStruct>),
}

struct Entry {
    schema: Arc<StructSchema>,
    _pinned: Pinned,
}

/// Thread-safe, insert-once cache of struct schemas.
#[derive(Default)]
pub struct SchemaCache {
    entries: RwLock<HashMap<TypeKey, Entry>>,
}

impl SchemaCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn domain(&self, def: &Arc<DomainStruct>) -> Arc<StructSchema> {
        let key = TypeKey::of_domain(def);
        self.get_or_insert(key, || Entry {
            schema: Arc::new(StructSchema::for_domain(def)),
            _pinned: Pinned::Domain(def.clone()),
        })
    }

    pub fn wire(&self, def: &Arc<WireStruct>) -> Arc<StructSchema> {
        let key = TypeKey::of_wire(def);
        self.get_or_insert(key, || Entry {
            schema: Arc::new(StructSchema::for_wire(def)),
            _pinned: Pinned::Wire(def.clone()),
        })
    }

    /// Sniffed wrapper shape of a wire struct, if it is one.
    pub fn wrapper_shape(&self, def: &Arc<WireStruct>) -> Option<WrapperShape> {
        self.wire(def).wrapper.clone()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    fn get_or_insert(&self, key: TypeKey, build: impl FnOnce() -> Entry) -> Arc<StructSchema> {
        if let Some(entry) = self.entries.read().get(&key) {
            return entry.schema.clone();
        }
        let mut entries = self.entries.write();
        entries.entry(key).or_insert_with(build).schema.clone()
    }
}

impl std::fmt::Debug for SchemaCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaCache")
            .field("entries", &self.len())
            .finish()
    }
}
