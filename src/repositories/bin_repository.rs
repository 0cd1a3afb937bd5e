use async_trait::async_trait;
use chrono::Utc;
use tracing::{error, info, instrument, warn};

use super::BinOperations;
use crate::config::BinSettings;
use crate::errors::{ServiceError, ServiceResult};
use crate::mapping::FieldMapper;
use crate::models::{validate, Bin, BinStatistics, NewBin, PartialBin};
use crate::queries::{BinField, ListQuery, Predicate, QueryTranslator, SourceQuery};
use crate::source::{BinSource, SourceError};

pub const DEFAULT_STATISTICS_FETCH_LIMIT: u64 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepositoryOptions {
    pub translator: QueryTranslator,
    /// Upper bound on bins read to compute statistics.
    pub statistics_fetch_limit: u64,
}

impl Default for RepositoryOptions {
    fn default() -> Self {
        Self {
            translator: QueryTranslator::default(),
            statistics_fetch_limit: DEFAULT_STATISTICS_FETCH_LIMIT,
        }
    }
}

impl From<&BinSettings> for RepositoryOptions {
    fn from(settings: &BinSettings) -> Self {
        Self {
            translator: QueryTranslator::new(settings.default_page_size, settings.max_page_size),
            statistics_fetch_limit: u64::from(settings.statistics_fetch_limit),
        }
    }
}

/// Bin operations over any [`BinSource`].
///
/// Validation runs before every write. The facade holds no state besides the
/// source handle and its options; every call goes to the source.
#[derive(Debug, Clone)]
pub struct BinRepository<S> {
    source: S,
    options: RepositoryOptions,
}

impl<S: BinSource> BinRepository<S> {
    pub fn new(source: S) -> Self {
        Self::with_options(source, RepositoryOptions::default())
    }

    pub fn with_options(source: S, options: RepositoryOptions) -> Self {
        Self { source, options }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    fn ensure_valid_id(&self, id: &str) -> ServiceResult<()> {
        if self.source.is_valid_id(id) {
            Ok(())
        } else {
            Err(ServiceError::InvalidId(id.to_string()))
        }
    }

    fn to_canonical(&self, record: &S::Record) -> ServiceResult<Bin> {
        self.source
            .mapper()
            .to_canonical(record)
            .map_err(|e| unavailable("map", e))
    }

    async fn find_first(&self, predicate: Predicate) -> ServiceResult<Option<Bin>> {
        let records = self
            .source
            .query(&SourceQuery::first(predicate))
            .await
            .map_err(|e| unavailable("query", e))?;
        records.first().map(|r| self.to_canonical(r)).transpose()
    }

    async fn fetch_existing(&self, id: &str) -> ServiceResult<Bin> {
        let record = self
            .source
            .get(id)
            .await
            .map_err(|e| unavailable("get", e))?
            .ok_or_else(|| ServiceError::NotFound(id.to_string()))?;
        self.to_canonical(&record)
    }
}

fn unavailable(operation: &'static str, err: SourceError) -> ServiceError {
    error!(operation, error = %err, "backing source call failed");
    ServiceError::SourceUnavailable(err)
}

fn rejected(err: impl Into<ServiceError>) -> ServiceError {
    let err = err.into();
    warn!(kind = err.kind(), error = %err, "write rejected");
    err
}

#[async_trait]
impl<S> BinOperations for BinRepository<S>
where
    S: BinSource + 'static,
{
    #[instrument(skip(self))]
    async fn list(&self, query: &ListQuery) -> ServiceResult<Vec<Bin>> {
        let source_query = self.options.translator.translate(query)?;
        let records = self
            .source
            .query(&source_query)
            .await
            .map_err(|e| unavailable("query", e))?;
        records.iter().map(|r| self.to_canonical(r)).collect()
    }

    #[instrument(skip(self))]
    async fn get_by_id(&self, id: &str) -> ServiceResult<Bin> {
        self.ensure_valid_id(id)?;
        self.fetch_existing(id).await
    }

    #[instrument(skip(self))]
    async fn get_by_barcode(&self, barcode: &str) -> ServiceResult<Bin> {
        self.find_first(Predicate::equals(BinField::Barcode, barcode))
            .await?
            .ok_or_else(|| ServiceError::NotFound(barcode.to_string()))
    }

    #[instrument(skip(self))]
    async fn create(&self, fields: NewBin) -> ServiceResult<Bin> {
        let candidate = fields.into_bin(Utc::now()).map_err(rejected)?;
        validate(&candidate).map_err(rejected)?;

        let bin_number = candidate.bin_number.clone();
        if self
            .find_first(Predicate::equals(BinField::BinNumber, bin_number.as_str()))
            .await?
            .is_some()
        {
            return Err(rejected(ServiceError::DuplicateBinNumber(bin_number)));
        }

        let record = self.source.mapper().to_source(&candidate);
        let stored = self.source.insert(record).await.map_err(|e| match e {
            SourceError::UniqueViolation(_) => {
                rejected(ServiceError::DuplicateBinNumber(bin_number.clone()))
            }
            other => unavailable("insert", other),
        })?;

        let bin = self.to_canonical(&stored)?;
        info!(id = %bin.id, bin_number = %bin.bin_number, "bin created");
        Ok(bin)
    }

    #[instrument(skip(self))]
    async fn update(&self, id: &str, partial: PartialBin) -> ServiceResult<Bin> {
        self.ensure_valid_id(id)?;
        let current = self.fetch_existing(id).await?;

        if partial.is_empty() {
            return Ok(current);
        }

        let mut merged = partial.apply(&current);
        validate(&merged).map_err(rejected)?;
        merged.last_updated = Utc::now();

        let record = self.source.mapper().to_source(&merged);
        let written = self.source.update(id, record).await.map_err(|e| match e {
            SourceError::NotFound(_) => ServiceError::NotFound(id.to_string()),
            other => unavailable("update", other),
        })?;

        let bin = self.to_canonical(&written)?;
        info!(id = %bin.id, "bin updated");
        Ok(bin)
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: &str) -> ServiceResult<()> {
        self.ensure_valid_id(id)?;
        self.source.remove(id).await.map_err(|e| match e {
            SourceError::NotFound(_) => ServiceError::NotFound(id.to_string()),
            other => unavailable("remove", other),
        })?;
        info!(id, "bin deleted");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn statistics(&self) -> ServiceResult<BinStatistics> {
        let limit = self.options.statistics_fetch_limit;
        let records = self
            .source
            .query(&SourceQuery::new(0, limit))
            .await
            .map_err(|e| unavailable("query", e))?;

        if records.len() as u64 >= limit {
            warn!(limit, "statistics fetch limit reached, totals may be incomplete");
        }

        let bins = records
            .iter()
            .map(|r| self.to_canonical(r))
            .collect::<ServiceResult<Vec<Bin>>>()?;
        Ok(BinStatistics::from_bins(&bins))
    }
}
