use async_trait::async_trait;

use crate::errors::ServiceResult;
use crate::models::{Bin, BinStatistics, NewBin, PartialBin};
use crate::queries::ListQuery;

pub mod bin_repository;

pub use bin_repository::{BinRepository, RepositoryOptions};

/// Bin operations offered to the HTTP layer, independent of the backing source.
#[async_trait]
pub trait BinOperations: Send + Sync {
    async fn list(&self, query: &ListQuery) -> ServiceResult<Vec<Bin>>;

    async fn get_by_id(&self, id: &str) -> ServiceResult<Bin>;

    async fn get_by_barcode(&self, barcode: &str) -> ServiceResult<Bin>;

    async fn create(&self, fields: NewBin) -> ServiceResult<Bin>;

    async fn update(&self, id: &str, partial: PartialBin) -> ServiceResult<Bin>;

    async fn delete(&self, id: &str) -> ServiceResult<()>;

    async fn statistics(&self) -> ServiceResult<BinStatistics>;
}
