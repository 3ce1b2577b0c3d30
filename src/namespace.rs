//! Name-addressable bag of objects that iterates alphabetically.
//!
//! Insertion order matters while loading (hooks see objects in the order a
//! plugin produced them) but not to the user: iterating a [`Namespace`]
//! yields values sorted by name, whatever order they were bound in.

use crate::object::Object;
use std::collections::btree_map::{self, BTreeMap};

/// Ordered namespace container.
///
/// Supports lookup and binding by name plus iteration over values in key
/// order. There is no removal.
#[derive(Debug, Clone, Default)]
pub struct Namespace {
    entries: BTreeMap<String, Object>,
}

impl Namespace {
    /// Create an empty namespace.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up an object by name.
    pub fn get(&self, name: &str) -> Option<&Object> {
        self.entries.get(name)
    }

    /// Bind `obj` under `name`, returning the object previously bound there.
    pub fn set(&mut self, name: impl Into<String>, obj: Object) -> Option<Object> {
        self.entries.insert(name.into(), obj)
    }

    /// True if `name` is bound.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Number of bound names.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if nothing is bound.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Bound names in alphabetical order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Values in alphabetical order of their names.
    pub fn iter(&self) -> btree_map::Values<'_, String, Object> {
        self.entries.values()
    }

    /// `(name, value)` pairs in alphabetical order.
    pub fn entries(&self) -> btree_map::Iter<'_, String, Object> {
        self.entries.iter()
    }
}

impl<'a> IntoIterator for &'a Namespace {
    type Item = &'a Object;
    type IntoIter = btree_map::Values<'a, String, Object>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl Extend<(String, Object)> for Namespace {
    fn extend<I: IntoIterator<Item = (String, Object)>>(&mut self, iter: I) {
        self.entries.extend(iter);
    }
}

impl FromIterator<(String, Object)> for Namespace {
    fn from_iter<I: IntoIterator<Item = (String, Object)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn value(obj: &Object) -> &str {
        obj.downcast_ref::<&'static str>().copied().unwrap_or("?")
    }

    #[test]
    fn iterates_values_by_name() {
        let mut ns = Namespace::new();
        ns.set("b", Object::new("bee"));
        ns.set("a", Object::new("ay"));
        ns.set("c", Object::new("sea"));

        let values: Vec<&str> = ns.iter().map(value).collect();
        assert_eq!(values, vec!["ay", "bee", "sea"]);
        assert_eq!(ns.names().collect::<Vec<_>>(), vec!["a", "b", "c"]);

        let mut looped = Vec::new();
        for obj in &ns {
            looped.push(value(obj));
        }
        assert_eq!(looped, values);
    }

    #[test]
    fn lookup_by_name() {
        let ns: Namespace = vec![("sam_x".to_string(), Object::new("motor"))]
            .into_iter()
            .collect();
        assert!(ns.contains("sam_x"));
        assert_eq!(ns.get("sam_x").map(value), Some("motor"));
        assert!(ns.get("sam_y").is_none());
        assert_eq!(ns.len(), 1);
        assert!(!Namespace::new().iter().any(|_| true));
    }

    #[test]
    fn set_returns_previous_binding() {
        let mut ns = Namespace::new();
        assert!(ns.set("x", Object::new("first")).is_none());
        let previous = ns.set("x", Object::new("second")).unwrap();
        assert_eq!(value(&previous), "first");
        assert_eq!(ns.get("x").map(value), Some("second"));
    }
}
