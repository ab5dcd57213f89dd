//! Field projection of find results.
//!
//! A projection document is inclusive when its first value is `1` (copy only the listed
//! paths) and exclusive otherwise (copy everything except the listed paths). `_id` is
//! always treated as listed, so inclusive projections keep it and exclusive ones drop it.

use bson::{Bson, Document};

use crate::{
    codec::clone_value,
    lookup::resolve_path,
    value::as_number,
};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Mode {
    Include,
    Exclude,
}

/// A compiled projection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Projection {
    mode: Mode,
    paths: Vec<String>,
}

impl Projection {
    /// Compiles a projection document. An empty document yields `None`.
    pub fn compile(fields: &Document) -> Option<Self> {
        let (_, first) = fields.iter().next()?;
        let mode = if as_number(first) == Some(1.0) {
            Mode::Include
        } else {
            Mode::Exclude
        };
        let mut paths: Vec<String> = fields.keys().cloned().collect();
        paths.push("_id".to_owned());
        Some(Self { mode, paths })
    }

    pub fn is_inclusive(&self) -> bool {
        self.mode == Mode::Include
    }

    /// Produces a projected copy. The source document is left untouched.
    pub fn apply(&self, document: &Document) -> Document {
        match self.mode {
            Mode::Include => {
                let mut projected = Document::new();
                for path in &self.paths {
                    match resolve_path(document, path) {
                        None | Some(Bson::Null) => continue,
                        Some(value) => insert_path(&mut projected, path, clone_value(value)),
                    }
                }
                projected
            }
            Mode::Exclude => {
                let mut projected = document.clone();
                for path in &self.paths {
                    remove_path(&mut projected, path);
                }
                projected
            }
        }
    }
}

/// Projects every item. An absent or empty projection returns the items as-is.
pub fn filter_fields(items: Vec<Document>, fields: Option<&Document>) -> Vec<Document> {
    match fields.and_then(Projection::compile) {
        Some(projection) => items.iter().map(|item| projection.apply(item)).collect(),
        None => items,
    }
}

// Intermediate non-document values are left in place and the insert is dropped.
fn insert_path(target: &mut Document, path: &str, value: Bson) {
    let mut segments = path.split('.').peekable();
    let mut current = target;
    while let Some(segment) = segments.next() {
        if segments.peek().is_none() {
            current.insert(segment, value);
            return;
        }
        if !current.contains_key(segment) {
            current.insert(segment, Document::new());
        }
        match current.get_mut(segment) {
            Some(Bson::Document(next)) => current = next,
            _ => return,
        }
    }
}

fn remove_path(target: &mut Document, path: &str) {
    let Some((parents, last)) = path.rsplit_once('.') else {
        target.remove(path);
        return;
    };

    let mut segments = parents.split('.');
    let Some(first) = segments.next() else {
        return;
    };
    let Some(mut current) = target.get_mut(first) else {
        return;
    };
    for segment in segments {
        let next = match current {
            Bson::Document(document) => document.get_mut(segment),
            Bson::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get_mut(i)),
            _ => None,
        };
        match next {
            Some(next) => current = next,
            None => return,
        }
    }

    // Array elements are left in place.
    if let Bson::Document(document) = current {
        document.remove(last);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    #[test]
    fn inclusive_keeps_listed_paths_and_id() {
        let document = doc! { "_id": 1, "a": { "b": 2, "c": 3 }, "d": 4 };
        let projected = Projection::compile(&doc! { "a.b": 1 }).unwrap().apply(&document);
        assert_eq!(projected, doc! { "a": { "b": 2 }, "_id": 1 });
    }

    #[test]
    fn inclusive_skips_missing_and_null() {
        let document = doc! { "_id": 1, "a": null };
        let projected = Projection::compile(&doc! { "a": 1, "z": 1 }).unwrap().apply(&document);
        assert_eq!(projected, doc! { "_id": 1 });
    }

    #[test]
    fn exclusive_removes_listed_paths_and_id() {
        let document = doc! { "_id": 1, "a": { "b": 2, "c": 3 }, "d": 4 };
        let projected = Projection::compile(&doc! { "a.b": 0 }).unwrap().apply(&document);
        assert_eq!(projected, doc! { "a": { "c": 3 }, "d": 4 });
        assert_eq!(document.get_document("a").unwrap().len(), 2);
    }

    #[test]
    fn empty_projection_is_identity() {
        let items = vec![doc! { "_id": 1, "a": 1 }];
        assert_eq!(filter_fields(items.clone(), Some(&doc! {})), items);
        assert_eq!(filter_fields(items.clone(), None), items);
    }

    #[test]
    fn projects_every_item() {
        let items = vec![doc! { "_id": 1, "a": 1, "b": 1 }, doc! { "_id": 2, "b": 2 }];
        let projected = filter_fields(items, Some(&doc! { "b": 1 }));
        assert_eq!(projected, vec![doc! { "b": 1, "_id": 1 }, doc! { "b": 2, "_id": 2 }]);
    }
}
