//! Backing sources that persist or serve bin records.
//!
//! A source speaks its own record shape; the [`FieldMapper`] it exposes turns
//! those records into canonical [`crate::models::Bin`] values and back.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::mapping::FieldMapper;
use crate::queries::SourceQuery;

pub mod destination;
pub mod local;
pub mod odata;

pub use destination::{ConfiguredDestinations, Destination, DestinationLookup};
pub use local::LocalBinStore;
pub use odata::{ODataBinSource, ODataSettings};

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("record not found: {0}")]
    NotFound(String),

    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected status {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },

    #[error("failed to decode source payload: {0}")]
    Decode(String),

    #[error("destination error: {0}")]
    Destination(String),
}

impl From<serde_json::Error> for SourceError {
    fn from(err: serde_json::Error) -> Self {
        SourceError::Decode(err.to_string())
    }
}

/// Tabular store of bin records.
#[async_trait]
pub trait BinSource: Send + Sync {
    type Record: Clone + Send + Sync + 'static;
    type Mapper: FieldMapper<Record = Self::Record>;

    fn mapper(&self) -> &Self::Mapper;

    /// Whether `id` satisfies the source's identifier format.
    fn is_valid_id(&self, id: &str) -> bool;

    async fn query(&self, query: &SourceQuery) -> Result<Vec<Self::Record>, SourceError>;

    async fn get(&self, id: &str) -> Result<Option<Self::Record>, SourceError>;

    async fn insert(&self, record: Self::Record) -> Result<Self::Record, SourceError>;

    async fn update(&self, id: &str, record: Self::Record) -> Result<Self::Record, SourceError>;

    async fn remove(&self, id: &str) -> Result<(), SourceError>;
}

#[async_trait]
impl<S> BinSource for Arc<S>
where
    S: BinSource,
{
    type Record = S::Record;
    type Mapper = S::Mapper;

    fn mapper(&self) -> &Self::Mapper {
        (**self).mapper()
    }

    fn is_valid_id(&self, id: &str) -> bool {
        (**self).is_valid_id(id)
    }

    async fn query(&self, query: &SourceQuery) -> Result<Vec<Self::Record>, SourceError> {
        (**self).query(query).await
    }

    async fn get(&self, id: &str) -> Result<Option<Self::Record>, SourceError> {
        (**self).get(id).await
    }

    async fn insert(&self, record: Self::Record) -> Result<Self::Record, SourceError> {
        (**self).insert(record).await
    }

    async fn update(&self, id: &str, record: Self::Record) -> Result<Self::Record, SourceError> {
        (**self).update(id, record).await
    }

    async fn remove(&self, id: &str) -> Result<(), SourceError> {
        (**self).remove(id).await
    }
}
