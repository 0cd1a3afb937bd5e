#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::{self, Body},
    http::{Method, Request},
    response::Response,
    Router,
};
use bin_lookup_api::{
    app_router,
    config::AppConfig,
    mapping::{ODataBinMapper, ODataBinRecord},
    models::{BinStatus, NewBin},
    queries::SourceQuery,
    repositories::{BinOperations, BinRepository},
    source::{odata::MAX_STORAGE_BIN_LENGTH, BinSource, LocalBinStore, SourceError},
    AppState,
};
use serde_json::Value;
use tokio::sync::RwLock;
use tower::ServiceExt;
use tower_http::cors::CorsLayer;

/// Router over a fresh local store.
pub struct TestApp {
    router: Router,
    pub bins: Arc<BinRepository<LocalBinStore>>,
}

impl TestApp {
    pub fn new() -> Self {
        let bins = Arc::new(BinRepository::new(LocalBinStore::new()));
        let state = AppState::new(bins.clone(), AppConfig::default());
        Self {
            router: app_router(state, CorsLayer::permissive()),
            bins,
        }
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub async fn request(&self, method: Method, uri: &str, body: Option<Value>) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                builder = builder.header("content-type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        self.router
            .clone()
            .oneshot(builder.body(body).expect("request"))
            .await
            .expect("router response")
    }

    pub async fn get(&self, uri: &str) -> Response {
        self.request(Method::GET, uri, None).await
    }
}

pub async fn response_json(response: Response) -> Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    serde_json::from_slice(&bytes).expect("json response")
}

/// The bin used throughout the lookup scenarios.
pub fn bin_a001() -> NewBin {
    NewBin::new("BIN-A001", "Aisle A - Row 1", 1000)
        .with_stock(750)
        .with_status(BinStatus::Active)
        .with_barcode("1234567890")
}

/// Four bins whose statistics are 4/3/1/3500/2150/61.43.
pub fn statistics_fixture() -> Vec<NewBin> {
    vec![
        NewBin::new("BIN-A001", "Aisle A - Row 1", 1000).with_stock(750),
        NewBin::new("BIN-B002", "Aisle B - Row 3", 800).with_stock(300),
        NewBin::new("BIN-C003", "Aisle C - Row 2", 1200).with_stock(1100),
        NewBin::new("BIN-D004", "Dock", 500).with_status(BinStatus::Inactive),
    ]
}

pub async fn seed<R: BinOperations + ?Sized>(repo: &R, bins: Vec<NewBin>) {
    for bin in bins {
        repo.create(bin).await.expect("seed bin");
    }
}

/// OData-shaped source kept in memory: records carry the S/4HANA field names,
/// `StorageBin` is the key, and predicates go through [`ODataBinMapper`].
#[derive(Debug, Default)]
pub struct FakeODataSource {
    records: RwLock<Vec<ODataBinRecord>>,
    mapper: ODataBinMapper,
    unavailable: AtomicBool,
}

impl FakeODataSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub async fn records(&self) -> Vec<ODataBinRecord> {
        self.records.read().await.clone()
    }

    fn check_available(&self) -> Result<(), SourceError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(SourceError::UnexpectedStatus {
                status: 503,
                body: "service unavailable".into(),
            })
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl BinSource for FakeODataSource {
    type Record = ODataBinRecord;
    type Mapper = ODataBinMapper;

    fn mapper(&self) -> &ODataBinMapper {
        &self.mapper
    }

    fn is_valid_id(&self, id: &str) -> bool {
        let length = id.chars().count();
        length > 0 && length <= MAX_STORAGE_BIN_LENGTH && !id.chars().any(char::is_control)
    }

    async fn query(&self, query: &SourceQuery) -> Result<Vec<ODataBinRecord>, SourceError> {
        self.check_available()?;
        let records = self.records.read().await;
        Ok(records
            .iter()
            .filter(|r| {
                query
                    .filter
                    .as_ref()
                    .map_or(true, |p| p.matches(&self.mapper, r))
            })
            .skip(query.offset as usize)
            .take(query.page_size as usize)
            .cloned()
            .collect())
    }

    async fn get(&self, id: &str) -> Result<Option<ODataBinRecord>, SourceError> {
        self.check_available()?;
        let records = self.records.read().await;
        Ok(records.iter().find(|r| r.storage_bin == id).cloned())
    }

    async fn insert(&self, record: ODataBinRecord) -> Result<ODataBinRecord, SourceError> {
        self.check_available()?;
        let mut records = self.records.write().await;
        if records.iter().any(|r| r.storage_bin == record.storage_bin) {
            return Err(SourceError::UniqueViolation(record.storage_bin));
        }
        records.push(record.clone());
        Ok(record)
    }

    async fn update(&self, id: &str, record: ODataBinRecord) -> Result<ODataBinRecord, SourceError> {
        self.check_available()?;
        let mut records = self.records.write().await;
        let slot = records
            .iter_mut()
            .find(|r| r.storage_bin == id)
            .ok_or_else(|| SourceError::NotFound(id.to_string()))?;
        *slot = record.clone();
        Ok(record)
    }

    async fn remove(&self, id: &str) -> Result<(), SourceError> {
        self.check_available()?;
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|r| r.storage_bin != id);
        if records.len() == before {
            return Err(SourceError::NotFound(id.to_string()));
        }
        Ok(())
    }
}
