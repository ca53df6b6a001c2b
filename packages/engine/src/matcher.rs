//! Fuzzy field-name matching between the two models.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::schema::{StructSchema, TypeKey};

type MemoKey = (String, TypeKey, Option<String>);

/// Pairs a source field name with a field of the target struct.
///
/// Attempts, first hit wins:
/// 1. exact name
/// 2. case-insensitive name
/// 3. case-insensitive singular/plural variants (`+s`, `+es`, `-s`, `-es`)
///
/// With a prefix, the same attempts are repeated on the prefixed name and
/// then on the name with the prefix removed. Hits and misses are memoized.
#[derive(Default)]
pub struct FieldMatcher {
    memo: RwLock<HashMap<MemoKey, Option<usize>>>,
}

impl FieldMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index into `target.fields` of the field matching `name`.
    pub fn find(&self, name: &str, target: &StructSchema, prefix: Option<&str>) -> Option<usize> {
        let key = (name.to_string(), target.key, prefix.map(str::to_string));
        if let Some(hit) = self.memo.read().get(&key) {
            return *hit;
        }
        let found = resolve(name, target, prefix);
        self.memo.write().insert(key, found);
        found
    }

    pub fn len(&self) -> usize {
        self.memo.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.memo.read().is_empty()
    }
}

impl std::fmt::Debug for FieldMatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldMatcher")
            .field("memo", &self.len())
            .finish()
    }
}

fn resolve(name: &str, target: &StructSchema, prefix: Option<&str>) -> Option<usize> {
    if let Some(i) = lookup(name, target) {
        return Some(i);
    }
    let prefix = prefix.filter(|p| !p.is_empty())?;
    if let Some(i) = lookup(&format!("{}{}", prefix, name), target) {
        return Some(i);
    }
    match name.strip_prefix(prefix) {
        Some(rest) if !rest.is_empty() => lookup(rest, target),
        _ => None,
    }
}

fn lookup(name: &str, target: &StructSchema) -> Option<usize> {
    let names = || target.fields.iter().map(|f| f.declared_name.as_str());

    if let Some(i) = names().position(|n| n == name) {
        return Some(i);
    }
    if let Some(i) = names().position(|n| fold_eq(n, name)) {
        return Some(i);
    }
    plural_candidates(name)
        .iter()
        .find_map(|candidate| names().position(|n| fold_eq(n, candidate)))
}

fn plural_candidates(name: &str) -> Vec<String> {
    let mut out = vec![format!("{}s", name), format!("{}es", name)];
    if let Some(stem) = name.strip_suffix('s').filter(|s| !s.is_empty()) {
        out.push(stem.to_string());
    }
    if let Some(stem) = name.strip_suffix("es").filter(|s| !s.is_empty()) {
        out.push(stem.to_string());
    }
    out
}

fn fold_eq(a: &str, b: &str) -> bool {
    a == b || a.to_lowercase() == b.to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SchemaCache;
    use std::sync::Arc;
    use structflex_core::{WireStruct, WireType};

    fn schema(fields: &[&str]) -> Arc<StructSchema> {
        let mut def = WireStruct::new("Target");
        for f in fields {
            def = def.field(*f, WireType::String);
        }
        SchemaCache::new().wire(&def.build())
    }

    #[test]
    fn exact_then_case_insensitive() {
        let s = schema(&["name", "Name"]);
        let m = FieldMatcher::new();
        assert_eq!(m.find("Name", &s, None), Some(1));
        assert_eq!(m.find("NAME", &s, None), Some(0));
    }

    #[test]
    fn plural_variants() {
        let s = schema(&["Addresses", "Policy", "Ports"]);
        let m = FieldMatcher::new();
        assert_eq!(m.find("Address", &s, None), Some(0));
        assert_eq!(m.find("Policies", &s, None), None);
        assert_eq!(m.find("policys", &s, None), Some(1));
        assert_eq!(m.find("port", &s, None), Some(2));
    }

    #[test]
    fn exact_beats_plural() {
        let s = schema(&["Rules", "Rule"]);
        let m = FieldMatcher::new();
        assert_eq!(m.find("Rule", &s, None), Some(1));
        assert_eq!(m.find("Rules", &s, None), Some(0));
    }

    #[test]
    fn prefix_added_and_stripped() {
        let s = schema(&["BucketName", "Region"]);
        let m = FieldMatcher::new();
        assert_eq!(m.find("Name", &s, None), None);
        assert_eq!(m.find("Name", &s, Some("Bucket")), Some(0));
        assert_eq!(m.find("BucketRegion", &s, Some("Bucket")), Some(1));
        assert_eq!(m.find("Bucket", &s, Some("Bucket")), None);
    }

    #[test]
    fn misses_are_memoized() {
        let s = schema(&["Name"]);
        let m = FieldMatcher::new();
        assert!(m.is_empty());
        assert_eq!(m.find("Other", &s, None), None);
        assert_eq!(m.find("Other", &s, None), None);
        assert_eq!(m.find("Other", &s, Some("X")), None);
        assert_eq!(m.len(), 2);
    }
}
