//! The find pipeline: filter, geo post-filter, sort, skip, limit and project.
//!
//! # Options
//!
//! [`FindOptions`] can be assembled with the fluent builder or decoded from a BSON
//! options document of the shape `{sort, skip, limit, fields}`:
//!
//! ```ignore
//! use cachelayer_core::{query::FindOptions, sort::SortSpec};
//!
//! let options = FindOptions::builder()
//!     .sort(SortSpec::new().desc("score"))
//!     .skip(10)
//!     .limit(10)
//!     .build();
//! ```
//!
//! A `skip` or `limit` of zero is the same as leaving it unset.

use bson::{Bson, Document, de::deserialize_from_document};
use serde::Deserialize;

use crate::{
    error::{CompileError, CompileResult, QueryResult},
    projection::filter_fields,
    selector::DocumentSelector,
    sort::{SortComparator, SortSpec},
};

/// Options accepted by a find.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindOptions {
    /// Sort order applied after filtering.
    pub sort: Option<SortSpec>,
    /// Number of results to drop from the front.
    pub skip: Option<usize>,
    /// Maximum number of results to return.
    pub limit: Option<usize>,
    /// Projection applied to the final results.
    pub fields: Option<Document>,
}

#[derive(Debug, Deserialize)]
struct RawFindOptions {
    sort: Option<Bson>,
    skip: Option<i64>,
    limit: Option<i64>,
    fields: Option<Document>,
}

impl FindOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> FindOptionsBuilder {
        FindOptionsBuilder::new()
    }

    /// Decodes options from a BSON document.
    ///
    /// # Errors
    ///
    /// Returns [`CompileError::BadFindOptions`] if the document has the wrong shape or a
    /// negative `skip`/`limit`, and [`CompileError::BadSortSpecification`] for an invalid sort.
    pub fn from_document(options: &Document) -> CompileResult<Self> {
        let raw: RawFindOptions = deserialize_from_document(options.clone())
            .map_err(|err| CompileError::BadFindOptions(err.to_string()))?;

        let count = |name: &str, value: Option<i64>| -> CompileResult<Option<usize>> {
            value
                .map(|n| {
                    usize::try_from(n)
                        .map_err(|_| CompileError::BadFindOptions(format!("{name} must not be negative")))
                })
                .transpose()
        };

        Ok(Self {
            sort: raw.sort.as_ref().map(SortSpec::parse).transpose()?,
            skip: count("skip", raw.skip)?,
            limit: count("limit", raw.limit)?,
            fields: raw.fields,
        })
    }
}

impl TryFrom<&Document> for FindOptions {
    type Error = CompileError;

    fn try_from(options: &Document) -> CompileResult<Self> {
        Self::from_document(options)
    }
}

#[derive(Debug, Clone, Default)]
pub struct FindOptionsBuilder {
    options: FindOptions,
}

impl FindOptionsBuilder {
    pub fn new() -> Self {
        FindOptionsBuilder {
            options: FindOptions::default(),
        }
    }

    /// Sets the sort order.
    ///
    /// # Arguments
    ///
    /// * `sort` - Keys to sort by, most significant first
    pub fn sort(mut self, sort: SortSpec) -> Self {
        self.options.sort = Some(sort);
        self
    }

    /// Sets the number of results to skip.
    pub fn skip(mut self, skip: usize) -> Self {
        self.options.skip = Some(skip);
        self
    }

    /// Sets the maximum number of results to return.
    pub fn limit(mut self, limit: usize) -> Self {
        self.options.limit = Some(limit);
        self
    }

    /// Sets the projection applied to each result.
    ///
    /// # Arguments
    ///
    /// * `fields` - `{path: 1}` entries to include, or `{path: 0}` entries to exclude
    pub fn fields(mut self, fields: Document) -> Self {
        self.options.fields = Some(fields);
        self
    }

    pub fn build(self) -> FindOptions {
        self.options
    }
}

/// Compiles `selector` and runs the find pipeline over `items`.
///
/// # Errors
///
/// Returns a [`QueryError`](crate::error::QueryError) if the selector fails to compile
/// or the sort hits values that cannot be ordered.
pub fn process_find<'a, I>(items: I, selector: &Document, options: &FindOptions) -> QueryResult<Vec<Document>>
where
    I: IntoIterator<Item = &'a Document>,
{
    let selector = DocumentSelector::compile(selector)?;
    find_with(items, &selector, options)
}

/// Runs the find pipeline with an already compiled selector.
///
/// Source documents are never modified; results are copies.
pub fn find_with<'a, I>(items: I, selector: &DocumentSelector, options: &FindOptions) -> QueryResult<Vec<Document>>
where
    I: IntoIterator<Item = &'a Document>,
{
    let mut matched: Vec<&Document> = items
        .into_iter()
        .filter(|document| selector.matches(document))
        .collect();

    if !selector.geo().is_empty() {
        matched = selector.geo().apply(matched);
    }

    if let Some(sort) = options.sort.as_ref().filter(|sort| !sort.is_empty()) {
        SortComparator::new(sort).sort(&mut matched)?;
    }

    if let Some(skip) = options.skip.filter(|skip| *skip > 0) {
        matched.drain(..skip.min(matched.len()));
    }

    if let Some(limit) = options.limit.filter(|limit| *limit > 0) {
        matched.truncate(limit);
    }

    log::trace!("find matched {} document(s)", matched.len());
    let results = matched.into_iter().cloned().collect();
    Ok(filter_fields(results, options.fields.as_ref()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::QueryError;
    use bson::doc;

    fn people() -> Vec<Document> {
        vec![
            doc! { "_id": 1, "name": "ada", "age": 36, "tags": ["math"] },
            doc! { "_id": 2, "name": "bob", "age": 25, "tags": ["ops", "math"] },
            doc! { "_id": 3, "name": "cy", "age": 41 },
            doc! { "_id": 4, "name": "di", "age": 25, "tags": [] },
        ]
    }

    fn ids(documents: &[Document]) -> Vec<i32> {
        documents.iter().map(|d| d.get_i32("_id").unwrap()).collect()
    }

    #[test]
    fn filters_then_sorts() {
        let people = people();
        let options = FindOptions::builder().sort(SortSpec::new().desc("age").asc("_id")).build();
        let found = process_find(&people, &doc! { "age": { "$lt": 40 } }, &options).unwrap();
        assert_eq!(ids(&found), vec![1, 2, 4]);
    }

    #[test]
    fn skip_and_limit() {
        let people = people();
        let options = FindOptions::builder().sort(SortSpec::new().asc("_id")).skip(1).limit(2).build();
        let found = process_find(&people, &doc! {}, &options).unwrap();
        assert_eq!(ids(&found), vec![2, 3]);
    }

    #[test]
    fn zero_skip_and_limit_are_ignored() {
        let people = people();
        let options = FindOptions::builder().skip(0).limit(0).build();
        assert_eq!(process_find(&people, &doc! {}, &options).unwrap().len(), 4);
    }

    #[test]
    fn skip_past_the_end_is_empty() {
        let people = people();
        let options = FindOptions::builder().skip(10).build();
        assert!(process_find(&people, &doc! {}, &options).unwrap().is_empty());
    }

    #[test]
    fn projection_applies_last() {
        let people = people();
        let options = FindOptions::builder().fields(doc! { "name": 1 }).build();
        let found = process_find(&people, &doc! { "tags": "ops" }, &options).unwrap();
        assert_eq!(found, vec![doc! { "name": "bob", "_id": 2 }]);
    }

    #[test]
    fn compile_errors_surface() {
        let people = people();
        let err = process_find(&people, &doc! { "age": { "$nope": 1 } }, &FindOptions::default()).unwrap_err();
        assert_eq!(err, QueryError::Compile(CompileError::UnrecognizedOperator("$nope".into())));
    }

    #[test]
    fn options_decode_from_bson() {
        let options = FindOptions::from_document(&doc! {
            "sort": { "age": -1 },
            "skip": 1,
            "limit": 5,
            "fields": { "name": 1 }
        })
        .unwrap();
        assert_eq!(
            options,
            FindOptions::builder()
                .sort(SortSpec::new().desc("age"))
                .skip(1)
                .limit(5)
                .fields(doc! { "name": 1 })
                .build()
        );

        assert!(matches!(
            FindOptions::from_document(&doc! { "limit": -1 }),
            Err(CompileError::BadFindOptions(_))
        ));
        assert!(matches!(
            FindOptions::from_document(&doc! { "sort": 3 }),
            Err(CompileError::BadSortSpecification(_))
        ));
    }
}
