use std::collections::HashMap;

use parking_lot::RwLock;

/// Bidirectional mapping between feature names and feature indices.
///
/// A mapper is shared (behind an `Arc`) by a [`FeatureVectorFactory`] and
/// every vector it builds. Its current size is the `length` of all those
/// vectors, so vectors built early see features interned later as zeros.
///
/// [`FeatureVectorFactory`]: super::FeatureVectorFactory
#[derive(Debug, Default)]
pub struct FeatureMapper {
    inner: RwLock<Names>,
}

#[derive(Debug, Default)]
struct Names {
    to_index: HashMap<String, usize>,
    to_name: Vec<String>,
}

impl FeatureMapper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a mapper from names listed in index order
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mapper = Self::new();
        for name in names {
            mapper.intern(&name.into());
        }
        mapper
    }

    /// Number of distinct features seen so far
    pub fn len(&self) -> usize {
        self.inner.read().to_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get the index of a feature name, assigning the next free index if unseen
    pub fn intern(&self, name: &str) -> usize {
        if let Some(&index) = self.inner.read().to_index.get(name) {
            return index;
        }
        let mut names = self.inner.write();
        // another writer may have inserted it between the two locks
        if let Some(&index) = names.to_index.get(name) {
            return index;
        }
        let index = names.to_name.len();
        names.to_index.insert(name.to_string(), index);
        names.to_name.push(name.to_string());
        index
    }

    /// Look up the index of a feature name without inserting it
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.inner.read().to_index.get(name).copied()
    }

    /// Look up the name of a feature index
    pub fn name_of(&self, index: usize) -> Option<String> {
        self.inner.read().to_name.get(index).cloned()
    }

    /// Snapshot of all names in index order
    pub fn names(&self) -> Vec<String> {
        self.inner.read().to_name.clone()
    }
}
