//! Type coercion matrix.
//!
//! Dispatch is an explicit table keyed by the kinds of the two sides, built
//! once when the engine is constructed. Pairs missing from the table are
//! incompatible.

use std::collections::BTreeMap;
use std::fmt;

use structflex_core::{DomainType, WireType};

/// Kind of a domain field type, as seen by the dispatch tables.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum DomainKind {
    Bool,
    Int32,
    Int64,
    Float32,
    Float64,
    String,
    List,
    Set,
    Map,
    Object,
    ObjectList,
    ObjectSet,
}

impl DomainKind {
    pub fn of(ty: &DomainType) -> Self {
        match ty {
            DomainType::Bool => DomainKind::Bool,
            DomainType::Int32 => DomainKind::Int32,
            DomainType::Int64 => DomainKind::Int64,
            DomainType::Float32 => DomainKind::Float32,
            DomainType::Float64 => DomainKind::Float64,
            DomainType::String => DomainKind::String,
            DomainType::List(elem) => match **elem {
                DomainType::Object(_) => DomainKind::ObjectList,
                _ => DomainKind::List,
            },
            DomainType::Set(elem) => match **elem {
                DomainType::Object(_) => DomainKind::ObjectSet,
                _ => DomainKind::Set,
            },
            DomainType::Map(_) => DomainKind::Map,
            DomainType::Object(_) => DomainKind::Object,
        }
    }
}

/// Kind of a wire field type after one pointer has been peeled.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum WireKind {
    Bool,
    Int32,
    Int64,
    Float32,
    Float64,
    String,
    Bytes,
    Slice,
    Map,
    Struct,
    /// A struct with a counted-collection wrapper shape.
    Wrapper,
    Interface,
}

impl WireKind {
    /// Kind of a non-pointer wire type. `None` for pointers.
    pub fn of(ty: &WireType, is_wrapper: impl FnOnce(&WireType) -> bool) -> Option<Self> {
        Some(match ty {
            WireType::Bool => WireKind::Bool,
            WireType::Int32 => WireKind::Int32,
            WireType::Int64 => WireKind::Int64,
            WireType::Float32 => WireKind::Float32,
            WireType::Float64 => WireKind::Float64,
            WireType::String => WireKind::String,
            WireType::Bytes => WireKind::Bytes,
            WireType::Slice(_) => WireKind::Slice,
            WireType::Map(_) => WireKind::Map,
            WireType::Struct(_) if is_wrapper(ty) => WireKind::Wrapper,
            WireType::Struct(_) => WireKind::Struct,
            WireType::Interface(_) => WireKind::Interface,
            WireType::Pointer(_) => return None,
        })
    }
}

/// What a table entry does with a pair of values.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum Coercion {
    /// Same scalar kind.
    Assign,
    /// int32 to int64, float32 to float64.
    Widen,
    /// int64 to int32, float64 to float32.
    Narrow,
    /// String and bytes, UTF-8.
    Text,
    /// Collection and slice, element by element.
    Elements,
    /// Map and map, value by value.
    Entries,
    /// Object and struct, field by field.
    Nested,
    /// Block collection and a single struct.
    SingleBlock,
    /// Block collection and a map of structs keyed by `MapBlockKey`.
    KeyedBlocks,
    /// Collection or block and a counted-collection wrapper.
    CountedWrapper,
}

impl fmt::Display for Coercion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// The externalize and internalize dispatch tables.
#[derive(Clone, Debug)]
pub struct CoercionMatrix {
    externalize: BTreeMap<(DomainKind, WireKind), Coercion>,
    internalize: BTreeMap<(WireKind, DomainKind), Coercion>,
}

impl Default for CoercionMatrix {
    fn default() -> Self {
        Self::new()
    }
}

impl CoercionMatrix {
    pub fn new() -> Self {
        use Coercion::*;
        use DomainKind as D;
        use WireKind as W;

        let shared: &[(DomainKind, WireKind, Coercion)] = &[
            (D::Bool, W::Bool, Assign),
            (D::Int32, W::Int32, Assign),
            (D::Int64, W::Int64, Assign),
            (D::Float32, W::Float32, Assign),
            (D::Float64, W::Float64, Assign),
            (D::String, W::String, Assign),
            (D::String, W::Bytes, Text),
            (D::List, W::Slice, Elements),
            (D::Set, W::Slice, Elements),
            (D::ObjectList, W::Slice, Elements),
            (D::ObjectSet, W::Slice, Elements),
            (D::Map, W::Map, Entries),
            (D::Object, W::Struct, Nested),
            (D::ObjectList, W::Struct, SingleBlock),
            (D::ObjectSet, W::Struct, SingleBlock),
            (D::ObjectList, W::Map, KeyedBlocks),
            (D::ObjectSet, W::Map, KeyedBlocks),
            (D::List, W::Wrapper, CountedWrapper),
            (D::Set, W::Wrapper, CountedWrapper),
            (D::Object, W::Wrapper, CountedWrapper),
            (D::ObjectList, W::Wrapper, CountedWrapper),
            (D::ObjectSet, W::Wrapper, CountedWrapper),
        ];

        let mut externalize = BTreeMap::new();
        let mut internalize = BTreeMap::new();
        for &(d, w, c) in shared {
            externalize.insert((d, w), c);
            internalize.insert((w, d), c);
        }

        externalize.insert((D::Int32, W::Int64), Widen);
        externalize.insert((D::Int64, W::Int32), Narrow);
        externalize.insert((D::Float32, W::Float64), Widen);
        externalize.insert((D::Float64, W::Float32), Narrow);

        internalize.insert((W::Int32, D::Int64), Widen);
        internalize.insert((W::Int64, D::Int32), Narrow);
        internalize.insert((W::Float32, D::Float64), Widen);
        internalize.insert((W::Float64, D::Float32), Narrow);
        internalize.insert((W::Interface, D::Object), Nested);
        internalize.insert((W::Interface, D::ObjectList), SingleBlock);
        internalize.insert((W::Interface, D::ObjectSet), SingleBlock);

        CoercionMatrix {
            externalize,
            internalize,
        }
    }

    pub fn externalize_rule(&self, from: DomainKind, to: WireKind) -> Option<Coercion> {
        self.externalize.get(&(from, to)).copied()
    }

    pub fn internalize_rule(&self, from: WireKind, to: DomainKind) -> Option<Coercion> {
        self.internalize.get(&(from, to)).copied()
    }

    /// Every externalize entry, ordered by key.
    pub fn externalize_entries(
        &self,
    ) -> impl Iterator<Item = (DomainKind, WireKind, Coercion)> + '_ {
        self.externalize.iter().map(|(&(d, w), &c)| (d, w, c))
    }

    /// Every internalize entry, ordered by key.
    pub fn internalize_entries(
        &self,
    ) -> impl Iterator<Item = (WireKind, DomainKind, Coercion)> + '_ {
        self.internalize.iter().map(|(&(w, d), &c)| (w, d, c))
    }
}
