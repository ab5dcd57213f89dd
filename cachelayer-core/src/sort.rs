//! Sort specifications and the comparators compiled from them.
//!
//! A sort specification is either a mapping (`{"a": 1, "b": -1}`) or an array of keys
//! (`["a", ["b", "desc"]]`). Each key resolves through a [`Lookup`]; when a path yields
//! several values (array branching or array-valued fields) the minimum is used for
//! ascending keys and the maximum for descending ones.

use bson::{Bson, Document};
use serde::{Deserialize, Serialize};
use std::{borrow::Borrow, cmp::Ordering};

use crate::{
    error::{CompileError, CompileResult, ComparisonResult},
    lookup::Lookup,
    value::{as_number, compare, present},
};

/// A single sort key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortKey {
    pub path: String,
    pub ascending: bool,
}

/// An ordered list of sort keys, most significant first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    keys: Vec<SortKey>,
}

impl SortSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an ascending key.
    pub fn asc(mut self, path: impl Into<String>) -> Self {
        self.keys.push(SortKey {
            path: path.into(),
            ascending: true,
        });
        self
    }

    /// Appends a descending key.
    pub fn desc(mut self, path: impl Into<String>) -> Self {
        self.keys.push(SortKey {
            path: path.into(),
            ascending: false,
        });
        self
    }

    pub fn keys(&self) -> &[SortKey] {
        &self.keys
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Parses a mapping or array sort specification.
    ///
    /// # Errors
    ///
    /// Returns [`CompileError::BadSortSpecification`] for any other shape, for mapping
    /// values that are not numbers, and for array entries that are not a path or a
    /// `[path, direction]` pair.
    pub fn parse(spec: &Bson) -> CompileResult<Self> {
        match spec {
            Bson::Document(mapping) => Self::from_mapping(mapping),
            Bson::Array(entries) => {
                let mut sort = Self::new();
                for entry in entries {
                    sort.keys.push(parse_entry(entry)?);
                }
                Ok(sort)
            }
            other => Err(CompileError::BadSortSpecification(other.to_string())),
        }
    }

    pub fn from_mapping(mapping: &Document) -> CompileResult<Self> {
        let mut sort = Self::new();
        for (path, direction) in mapping {
            let direction = as_number(direction)
                .ok_or_else(|| CompileError::BadSortSpecification(format!("{path}: {direction}")))?;
            sort.keys.push(SortKey {
                path: path.clone(),
                ascending: direction >= 0.0,
            });
        }
        Ok(sort)
    }
}

impl TryFrom<&Bson> for SortSpec {
    type Error = CompileError;

    fn try_from(spec: &Bson) -> CompileResult<Self> {
        Self::parse(spec)
    }
}

fn parse_entry(entry: &Bson) -> CompileResult<SortKey> {
    match entry {
        Bson::String(path) => Ok(SortKey {
            path: path.clone(),
            ascending: true,
        }),
        Bson::Array(pair) => match pair.as_slice() {
            [Bson::String(path)] => Ok(SortKey {
                path: path.clone(),
                ascending: true,
            }),
            [Bson::String(path), direction, ..] => Ok(SortKey {
                path: path.clone(),
                ascending: direction.as_str() != Some("desc"),
            }),
            _ => Err(CompileError::BadSortSpecification(entry.to_string())),
        },
        other => Err(CompileError::BadSortSpecification(other.to_string())),
    }
}

#[derive(Debug, Clone)]
struct SortPart {
    lookup: Lookup,
    ascending: bool,
}

/// A compiled comparator over documents.
#[derive(Debug, Clone, Default)]
pub struct SortComparator {
    parts: Vec<SortPart>,
}

impl SortComparator {
    pub fn new(spec: &SortSpec) -> Self {
        let parts = spec
            .keys()
            .iter()
            .map(|key| SortPart {
                lookup: Lookup::new(key.path.as_str()),
                ascending: key.ascending,
            })
            .collect();
        Self { parts }
    }

    /// Compiles a raw mapping or array specification.
    pub fn compile(spec: &Bson) -> CompileResult<Self> {
        Ok(Self::new(&SortSpec::parse(spec)?))
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Compares two documents key by key. With no keys every pair is equal.
    ///
    /// # Errors
    ///
    /// Propagates the first [`ComparisonError`](crate::error::ComparisonError) raised
    /// while reducing or comparing key values.
    pub fn compare(&self, a: &Document, b: &Document) -> ComparisonResult<Ordering> {
        for part in &self.parts {
            let left = reduce(part.lookup.branches(a), part.ascending)?;
            let right = reduce(part.lookup.branches(b), part.ascending)?;
            let ordering = compare(left, right)?;
            if ordering != Ordering::Equal {
                return Ok(if part.ascending { ordering } else { ordering.reverse() });
            }
        }
        Ok(Ordering::Equal)
    }

    /// Stable in-place sort. The slice order is unspecified if an error is returned.
    pub fn sort<D: Borrow<Document>>(&self, documents: &mut [D]) -> ComparisonResult<()> {
        if self.parts.is_empty() {
            return Ok(());
        }
        let mut failure = None;
        documents.sort_by(|a, b| match self.compare(
            <D as Borrow<Document>>::borrow(a),
            <D as Borrow<Document>>::borrow(b),
        ) {
            Ok(ordering) => ordering,
            Err(err) => {
                failure.get_or_insert(err);
                Ordering::Equal
            }
        });
        failure.map_or(Ok(()), Err)
    }
}

/// Compiles a mapping or array sort specification into a comparator.
pub fn compile_sort(spec: &Bson) -> CompileResult<SortComparator> {
    SortComparator::compile(spec)
}

// Arrays contribute their elements, and an empty array contributes an absent value.
fn reduce(branches: Vec<Option<&Bson>>, find_min: bool) -> ComparisonResult<Option<&Bson>> {
    let mut reduced = None;
    for branch in branches {
        match branch {
            Some(Bson::Array(items)) if items.is_empty() => consider(&mut reduced, None, find_min)?,
            Some(Bson::Array(items)) => {
                for item in items {
                    consider(&mut reduced, present(Some(item)), find_min)?;
                }
            }
            other => consider(&mut reduced, other, find_min)?,
        }
    }
    Ok(reduced.flatten())
}

fn consider<'a>(
    reduced: &mut Option<Option<&'a Bson>>,
    value: Option<&'a Bson>,
    find_min: bool,
) -> ComparisonResult<()> {
    let replace = match *reduced {
        None => true,
        Some(current) => {
            let ordering = compare(current, value)?;
            if find_min {
                ordering == Ordering::Greater
            } else {
                ordering == Ordering::Less
            }
        }
    };
    if replace {
        *reduced = Some(value);
    }
    Ok(())
}
