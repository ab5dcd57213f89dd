use bson::Bson;
use std::collections::BTreeMap;

use crate::document::id_key;

/// Document ids touched per collection, deduplicated by id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DirtySet {
    collections: BTreeMap<String, BTreeMap<String, Bson>>,
}

impl DirtySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an id. Returns `false` if it was already recorded for the collection.
    pub fn insert(&mut self, collection: &str, id: &Bson) -> bool {
        self.collections
            .entry(collection.to_owned())
            .or_default()
            .insert(id_key(id), id.clone())
            .is_none()
    }

    pub fn contains(&self, collection: &str, id: &Bson) -> bool {
        self.collections
            .get(collection)
            .is_some_and(|ids| ids.contains_key(&id_key(id)))
    }

    /// The recorded ids of a collection, in key order.
    pub fn ids(&self, collection: &str) -> Vec<Bson> {
        self.collections
            .get(collection)
            .map(|ids| ids.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn collections(&self) -> impl Iterator<Item = &str> {
        self.collections.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.collections.is_empty()
    }

    /// Total number of recorded ids across collections.
    pub fn len(&self) -> usize {
        self.collections.values().map(BTreeMap::len).sum()
    }
}
