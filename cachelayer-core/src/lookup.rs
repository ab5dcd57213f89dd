//! Dotted path resolution with array branching.
//!
//! A path such as `a.b.c` walks into nested documents. When an intermediate value is an
//! array and the next segment is not an index, the walk forks over every element, so a
//! single path can resolve to several candidate values ("branches").

use bson::{Bson, Document};

use crate::value::present;

/// A compiled dotted path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lookup {
    path: String,
    segments: Vec<String>,
}

impl Lookup {
    pub fn new(path: impl Into<String>) -> Self {
        let path = path.into();
        let segments = path.split('.').map(str::to_owned).collect();
        Self { path, segments }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Resolves the path against a document, returning one entry per branch.
    ///
    /// Missing intermediate values and empty arrays yield a single absent branch. Arrays
    /// reached at the final segment are returned whole; matchers decide whether to look
    /// inside them.
    pub fn branches<'a>(&self, document: &'a Document) -> Vec<Option<&'a Bson>> {
        let mut out = Vec::with_capacity(1);
        let Some((first, rest)) = self.segments.split_first() else {
            out.push(None);
            return out;
        };
        walk(present(document.get(first)), rest, &mut out);
        out
    }
}

fn walk<'a>(first_level: Option<&'a Bson>, rest: &[String], out: &mut Vec<Option<&'a Bson>>) {
    let Some((next, tail)) = rest.split_first() else {
        out.push(first_level);
        return;
    };

    match first_level {
        Some(Bson::Array(items)) if items.is_empty() => out.push(None),
        Some(Bson::Array(items)) if !is_index(next) => {
            for item in items {
                descend(Some(item), next, tail, out);
            }
        }
        other => descend(other, next, tail, out),
    }
}

fn descend<'a>(
    container: Option<&'a Bson>,
    key: &str,
    rest: &[String],
    out: &mut Vec<Option<&'a Bson>>,
) {
    match present(container) {
        None | Some(Bson::Null) => out.push(None),
        Some(value) => walk(present(child(value, key)), rest, out),
    }
}

/// Single-step navigation: document field or array index.
pub fn child<'a>(value: &'a Bson, key: &str) -> Option<&'a Bson> {
    match value {
        Bson::Document(document) => document.get(key),
        Bson::Array(items) => key.parse::<usize>().ok().and_then(|index| items.get(index)),
        _ => None,
    }
}

/// Non-branching resolution of a dotted path, used where a single value is wanted.
pub fn resolve_path<'a>(document: &'a Document, path: &str) -> Option<&'a Bson> {
    let mut segments = path.split('.');
    let first = segments.next()?;
    let mut current = present(document.get(first))?;
    for segment in segments {
        current = present(child(current, segment))?;
    }
    Some(current)
}

fn is_index(segment: &str) -> bool {
    !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    #[test]
    fn simple_path() {
        let document = doc! { "a": { "b": 1 } };
        assert_eq!(Lookup::new("a.b").branches(&document), vec![Some(&Bson::Int32(1))]);
        assert_eq!(Lookup::new("a.c").branches(&document), vec![None]);
    }

    #[test]
    fn arrays_fork_the_walk() {
        let document = doc! { "a": [{ "b": 1 }, { "b": 2 }, { "c": 3 }] };
        assert_eq!(
            Lookup::new("a.b").branches(&document),
            vec![Some(&Bson::Int32(1)), Some(&Bson::Int32(2)), None]
        );
    }

    #[test]
    fn numeric_segments_index_instead_of_fork() {
        let document = doc! { "a": [{ "b": 1 }, { "b": 2 }] };
        assert_eq!(Lookup::new("a.1.b").branches(&document), vec![Some(&Bson::Int32(2))]);
    }

    #[test]
    fn empty_array_is_a_single_absent_branch() {
        let document = doc! { "a": [] };
        assert_eq!(Lookup::new("a.b").branches(&document), vec![None]);
    }

    #[test]
    fn terminal_arrays_are_returned_whole() {
        let document = doc! { "a": [1, 2] };
        let branches = Lookup::new("a").branches(&document);
        assert_eq!(branches.len(), 1);
        assert!(matches!(branches[0], Some(Bson::Array(items)) if items.len() == 2));
    }

    #[test]
    fn null_intermediate_is_absent() {
        let document = doc! { "a": null };
        assert_eq!(Lookup::new("a.b.c").branches(&document), vec![None]);
    }

    #[test]
    fn resolve_path_does_not_branch() {
        let document = doc! { "loc": { "coordinates": [1.5, 2.5] } };
        assert_eq!(
            resolve_path(&document, "loc.coordinates.1"),
            Some(&Bson::Double(2.5))
        );
        assert_eq!(resolve_path(&document, "loc.missing"), None);
    }
}
