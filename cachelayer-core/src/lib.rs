//! Query matching and write coordination for a MongoDB-compatible document cache.
//!
//! This crate is the core of the cachelayer project and provides:
//!
//! - **Value model** ([`value`], [`equality`], [`lookup`]) - Type ranks, ordering, equality and dotted path lookup over BSON
//! - **Selectors** ([`selector`]) - Compiled MongoDB-style query documents, including `$where` predicates
//! - **Geo post-filters** ([`geo`]) - `$near` and `$geoIntersects` applied after matching
//! - **Sorting and projection** ([`sort`], [`projection`]) - Sort specifications and field projections
//! - **Find pipeline** ([`query`]) - Filter, sort, skip, limit and project in one call
//! - **Upsert normalization** ([`upsert`]) - Turning one-or-many upserts into checked items
//! - **Custom types** ([`codec`]) - A registry of extension value types
//! - **Store backend abstraction** ([`backend`]) - Traits for implementing storage backends
//! - **Transactions** ([`transaction`]) - Read tracking, write gating and batched change publication
//! - **Database and collections** ([`store`], [`collection`]) - The front end tying it all together
//! - **Error handling** ([`error`]) - Error families and result types
//!
//! # Example
//!
//! ```ignore
//! use cachelayer_core::{query::{process_find, FindOptions}, sort::SortSpec};
//! use bson::doc;
//!
//! let docs = vec![
//!     doc! { "_id": 1, "name": "Alice", "age": 31 },
//!     doc! { "_id": 2, "name": "Bob", "age": 25 },
//! ];
//! let options = FindOptions::builder().sort(SortSpec::new().asc("age")).build();
//! let found = process_find(&docs, &doc! { "age": { "$gt": 20 } }, &options)?;
//! assert_eq!(found[0].get_str("name")?, "Bob");
//! ```

#[allow(unused_extern_crates)]
extern crate self as cachelayer_core;

pub mod backend;
pub mod codec;
pub mod collection;
pub mod document;
pub mod equality;
pub mod error;
pub mod geo;
pub mod lookup;
pub mod projection;
pub mod query;
pub mod selector;
pub mod sort;
pub mod store;
pub mod transaction;
pub mod upsert;
pub mod value;
