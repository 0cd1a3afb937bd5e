//! Abstract list queries and their translation into source queries.

pub mod bin_queries;

pub use bin_queries::{BinField, ListQuery, Predicate, QueryTranslator, SourceQuery};
