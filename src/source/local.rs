// In-process bin store used when no remote source is configured

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use super::{BinSource, SourceError};
use crate::mapping::{LocalBinDocument, LocalBinMapper};
use crate::queries::SourceQuery;

/// Documents kept in insertion order. Bin numbers are unique; the check and
/// the write happen under the same lock.
#[derive(Debug, Clone, Default)]
pub struct LocalBinStore {
    documents: Arc<RwLock<Vec<LocalBinDocument>>>,
    mapper: LocalBinMapper,
}

impl LocalBinStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.documents.read().await.is_empty()
    }
}

#[async_trait]
impl BinSource for LocalBinStore {
    type Record = LocalBinDocument;
    type Mapper = LocalBinMapper;

    fn mapper(&self) -> &LocalBinMapper {
        &self.mapper
    }

    fn is_valid_id(&self, id: &str) -> bool {
        Uuid::parse_str(id).is_ok()
    }

    async fn query(&self, query: &SourceQuery) -> Result<Vec<LocalBinDocument>, SourceError> {
        let documents = self.documents.read().await;
        let offset = usize::try_from(query.offset).unwrap_or(usize::MAX);
        let page_size = usize::try_from(query.page_size).unwrap_or(usize::MAX);

        let page: Vec<LocalBinDocument> = documents
            .iter()
            .filter(|doc| {
                query
                    .filter
                    .as_ref()
                    .map_or(true, |predicate| predicate.matches(&self.mapper, doc))
            })
            .skip(offset)
            .take(page_size)
            .cloned()
            .collect();

        debug!(returned = page.len(), offset, page_size, "local store query");
        Ok(page)
    }

    async fn get(&self, id: &str) -> Result<Option<LocalBinDocument>, SourceError> {
        let documents = self.documents.read().await;
        Ok(documents.iter().find(|doc| doc.id == id).cloned())
    }

    async fn insert(&self, mut record: LocalBinDocument) -> Result<LocalBinDocument, SourceError> {
        let mut documents = self.documents.write().await;

        if documents
            .iter()
            .any(|doc| doc.bin_number == record.bin_number)
        {
            return Err(SourceError::UniqueViolation(record.bin_number));
        }

        if record.id.is_empty() {
            record.id = Uuid::new_v4().to_string();
        }
        documents.push(record.clone());
        Ok(record)
    }

    async fn update(
        &self,
        id: &str,
        mut record: LocalBinDocument,
    ) -> Result<LocalBinDocument, SourceError> {
        let mut documents = self.documents.write().await;
        let slot = documents
            .iter_mut()
            .find(|doc| doc.id == id)
            .ok_or_else(|| SourceError::NotFound(id.to_string()))?;

        // Identity and creation time are owned by the store.
        record.id = slot.id.clone();
        record.bin_number = slot.bin_number.clone();
        record.created_at = slot.created_at;
        *slot = record.clone();
        Ok(record)
    }

    async fn remove(&self, id: &str) -> Result<(), SourceError> {
        let mut documents = self.documents.write().await;
        let position = documents
            .iter()
            .position(|doc| doc.id == id)
            .ok_or_else(|| SourceError::NotFound(id.to_string()))?;
        documents.remove(position);
        Ok(())
    }
}
