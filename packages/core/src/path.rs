//! Locations inside a value tree.
//!
//! A [`Path`] is a sequence of steps from the root struct. It renders the way
//! the field would be written in source: `Rules[0].Targets["blue"].Weight`.

use std::fmt;

/// One step of a [`Path`].
#[derive(Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum PathStep {
    /// A struct field.
    Field(String),
    /// A list, set or slice element.
    Index(usize),
    /// A map entry.
    Key(String),
}

/// A location inside a domain or wire value, relative to the root struct.
#[derive(Clone, Debug, Default, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct Path {
    pub steps: Vec<PathStep>,
}

impl Path {
    /// The root path. Renders as the empty string.
    pub fn root() -> Self {
        Path { steps: Vec::new() }
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PathStep> {
        self.steps.iter()
    }

    #[must_use]
    pub fn at_name(&self, name: &str) -> Path {
        self.push(PathStep::Field(name.to_string()))
    }

    #[must_use]
    pub fn at_index(&self, index: usize) -> Path {
        self.push(PathStep::Index(index))
    }

    #[must_use]
    pub fn at_key(&self, key: &str) -> Path {
        self.push(PathStep::Key(key.to_string()))
    }

    /// The name of the innermost field step, if any.
    pub fn last_name(&self) -> Option<&str> {
        self.steps.iter().rev().find_map(|s| match s {
            PathStep::Field(name) => Some(name.as_str()),
            _ => None,
        })
    }

    fn push(&self, step: PathStep) -> Path {
        let mut steps = Vec::with_capacity(self.steps.len() + 1);
        steps.extend(self.steps.iter().cloned());
        steps.push(step);
        Path { steps }
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, step) in self.steps.iter().enumerate() {
            match step {
                PathStep::Field(name) if i == 0 => write!(f, "{}", name)?,
                PathStep::Field(name) => write!(f, ".{}", name)?,
                PathStep::Index(index) => write!(f, "[{}]", index)?,
                PathStep::Key(key) => write!(f, "[{:?}]", key)?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_is_empty() {
        let p = Path::root();
        assert!(p.is_empty());
        assert_eq!(p.len(), 0);
        assert_eq!(p.to_string(), "");
    }

    #[test]
    fn display_mixed_steps() {
        let p = Path::root()
            .at_name("Rules")
            .at_index(0)
            .at_name("Targets")
            .at_key("blue")
            .at_name("Weight");
        assert_eq!(p.to_string(), r#"Rules[0].Targets["blue"].Weight"#);
        assert_eq!(p.len(), 5);
    }

    #[test]
    fn push_does_not_mutate() {
        let base = Path::root().at_name("A");
        let child = base.at_name("B");
        assert_eq!(base.to_string(), "A");
        assert_eq!(child.to_string(), "A.B");
    }

    #[test]
    fn last_name_skips_indices() {
        let p = Path::root().at_name("Rules").at_index(2);
        assert_eq!(p.last_name(), Some("Rules"));
        assert_eq!(Path::root().last_name(), None);
    }

    #[test]
    fn key_is_quoted() {
        let p = Path::root().at_name("M").at_key("a\"b");
        assert_eq!(p.to_string(), r#"M["a\"b"]"#);
    }
}
