//! OData V2 client for the S/4HANA warehouse storage-bin service.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderValue, ACCEPT};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use tracing::{debug, warn};
use url::Url;

use super::{BinSource, Destination, DestinationLookup, SourceError};
use crate::mapping::{ODataBinMapper, ODataBinRecord};
use crate::queries::bin_queries::odata_literal;
use crate::queries::SourceQuery;

pub const DEFAULT_SERVICE_PATH: &str = "/sap/opu/odata/sap/API_WAREHOUSE_STORAGE_BIN";
pub const DEFAULT_ENTITY_SET: &str = "WarehouseStorageBin";
pub const MAX_STORAGE_BIN_LENGTH: usize = 18;

const CSRF_HEADER: &str = "x-csrf-token";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ODataSettings {
    pub service_path: String,
    pub entity_set: String,
    pub timeout: Duration,
}

impl Default for ODataSettings {
    fn default() -> Self {
        Self {
            service_path: DEFAULT_SERVICE_PATH.to_string(),
            entity_set: DEFAULT_ENTITY_SET.to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CollectionEnvelope {
    d: CollectionBody,
}

#[derive(Debug, Deserialize)]
struct CollectionBody {
    results: Vec<ODataBinRecord>,
}

#[derive(Debug, Deserialize)]
struct EntityEnvelope {
    d: ODataBinRecord,
}

/// Storage bins served by an OData V2 entity set.
///
/// The entity key is `StorageBin`. Writes fetch a CSRF token first and send
/// it back together with the session cookie, as SAP Gateway expects.
#[derive(Debug, Clone)]
pub struct ODataBinSource {
    client: Client,
    destination: Destination,
    service_root: Url,
    entity_set: String,
    mapper: ODataBinMapper,
}

impl ODataBinSource {
    pub fn new(destination: Destination, settings: ODataSettings) -> Result<Self, SourceError> {
        let client = Client::builder()
            .timeout(settings.timeout)
            .cookie_store(true)
            .build()?;
        Self::with_client(client, destination, settings)
    }

    pub fn with_client(
        client: Client,
        destination: Destination,
        settings: ODataSettings,
    ) -> Result<Self, SourceError> {
        let service_root = service_root(&destination.base_url, &settings.service_path)?;
        Ok(Self {
            client,
            destination,
            service_root,
            entity_set: settings.entity_set,
            mapper: ODataBinMapper,
        })
    }

    /// Resolves `destination` through `lookup` and builds the client.
    pub async fn connect(
        lookup: &dyn DestinationLookup,
        destination: &str,
        settings: ODataSettings,
    ) -> Result<Self, SourceError> {
        let resolved = lookup.resolve(destination).await?;
        debug!(destination = %resolved.name, base_url = %resolved.base_url, "resolved OData destination");
        Self::new(resolved, settings)
    }

    pub fn service_root(&self) -> &Url {
        &self.service_root
    }

    fn collection_url(&self) -> Result<Url, SourceError> {
        self.resource_url(&self.entity_set)
    }

    fn entity_url(&self, id: &str) -> Result<Url, SourceError> {
        self.resource_url(&format!("{}({})", self.entity_set, odata_literal(id)))
    }

    fn resource_url(&self, segment: &str) -> Result<Url, SourceError> {
        let mut url = self.service_root.clone();
        url.path_segments_mut()
            .map_err(|_| {
                SourceError::Destination(format!(
                    "destination '{}' cannot carry a path",
                    self.destination.name
                ))
            })?
            .pop_if_empty()
            .push(segment);
        Ok(url)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let request = request.header(ACCEPT, HeaderValue::from_static("application/json"));
        match &self.destination.username {
            Some(username) => request.basic_auth(username, self.destination.password.as_deref()),
            None => request,
        }
    }

    async fn fetch_csrf_token(&self) -> Result<Option<String>, SourceError> {
        let response = self
            .authorize(self.client.get(self.service_root.clone()))
            .header(CSRF_HEADER, "Fetch")
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(unexpected_status(response).await);
        }

        let token = response
            .headers()
            .get(CSRF_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        if token.is_none() {
            warn!(destination = %self.destination.name, "service issued no CSRF token");
        }
        Ok(token)
    }

    async fn write_request(&self, request: RequestBuilder) -> Result<Response, SourceError> {
        let token = self.fetch_csrf_token().await?;
        let request = self.authorize(request);
        let request = match token {
            Some(token) => request.header(CSRF_HEADER, token),
            None => request,
        };
        Ok(request.send().await?)
    }
}

fn service_root(base_url: &Url, service_path: &str) -> Result<Url, SourceError> {
    let root = format!(
        "{}/{}/",
        base_url.as_str().trim_end_matches('/'),
        service_path.trim_matches('/')
    );
    Url::parse(&root)
        .map_err(|e| SourceError::Destination(format!("invalid service root '{root}': {e}")))
}

/// Percent-encodes OData system query options. Spaces become `%20`, never `+`.
fn system_query(options: &[(&str, String)]) -> String {
    options
        .iter()
        .map(|(name, value)| format!("{name}={}", urlencoding::encode(value)))
        .collect::<Vec<_>>()
        .join("&")
}

async fn unexpected_status(response: Response) -> SourceError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    SourceError::UnexpectedStatus { status, body }
}

async fn read_entity(response: Response) -> Result<ODataBinRecord, SourceError> {
    let bytes = response.bytes().await?;
    let envelope: EntityEnvelope = serde_json::from_slice(&bytes)?;
    Ok(envelope.d)
}

#[async_trait]
impl BinSource for ODataBinSource {
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
        let mut url = self.collection_url()?;
        let mut options = vec![
            ("$format", "json".to_string()),
            ("$skip", query.offset.to_string()),
            ("$top", query.page_size.to_string()),
        ];
        if let Some(filter) = &query.filter {
            options.push(("$filter", filter.to_odata_filter(&self.mapper)));
        }
        url.set_query(Some(&system_query(&options)));

        debug!(url = %url, "querying OData entity set");
        let response = self.authorize(self.client.get(url)).send().await?;
        if !response.status().is_success() {
            return Err(unexpected_status(response).await);
        }

        let bytes = response.bytes().await?;
        let envelope: CollectionEnvelope = serde_json::from_slice(&bytes)?;
        Ok(envelope.d.results)
    }

    async fn get(&self, id: &str) -> Result<Option<ODataBinRecord>, SourceError> {
        let mut url = self.entity_url(id)?;
        url.set_query(Some(&system_query(&[("$format", "json".to_string())])));

        let response = self.authorize(self.client.get(url)).send().await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => read_entity(response).await.map(Some),
            _ => Err(unexpected_status(response).await),
        }
    }

    async fn insert(&self, record: ODataBinRecord) -> Result<ODataBinRecord, SourceError> {
        let url = self.collection_url()?;
        let response = self
            .write_request(self.client.post(url).json(&record))
            .await?;

        match response.status() {
            StatusCode::CONFLICT => Err(SourceError::UniqueViolation(record.storage_bin)),
            StatusCode::NO_CONTENT => Ok(record),
            status if status.is_success() => read_entity(response).await,
            _ => Err(unexpected_status(response).await),
        }
    }

    async fn update(&self, id: &str, record: ODataBinRecord) -> Result<ODataBinRecord, SourceError> {
        let url = self.entity_url(id)?;
        let response = self
            .write_request(self.client.put(url).json(&record))
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(SourceError::NotFound(id.to_string())),
            // PUT answers 204 without a body; the sent record is the new state.
            status if status.is_success() => Ok(record),
            _ => Err(unexpected_status(response).await),
        }
    }

    async fn remove(&self, id: &str) -> Result<(), SourceError> {
        let url = self.entity_url(id)?;
        let response = self.write_request(self.client.delete(url)).await?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(SourceError::NotFound(id.to_string())),
            status if status.is_success() => Ok(()),
            _ => Err(unexpected_status(response).await),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(base_url: &str) -> ODataBinSource {
        let destination = Destination::new("s4hana", Url::parse(base_url).unwrap());
        ODataBinSource::new(destination, ODataSettings::default()).unwrap()
    }

    #[test]
    fn service_root_keeps_base_path_prefix() {
        let source = source("https://gw.example.com/proxy/");
        assert_eq!(
            source.service_root().as_str(),
            "https://gw.example.com/proxy/sap/opu/odata/sap/API_WAREHOUSE_STORAGE_BIN/"
        );
    }

    #[test]
    fn entity_url_quotes_and_escapes_key() {
        let source = source("https://gw.example.com");
        assert_eq!(
            source.entity_url("A'1").unwrap().path(),
            "/sap/opu/odata/sap/API_WAREHOUSE_STORAGE_BIN/WarehouseStorageBin('A''1')"
        );
        assert_eq!(
            source.collection_url().unwrap().path(),
            "/sap/opu/odata/sap/API_WAREHOUSE_STORAGE_BIN/WarehouseStorageBin"
        );
    }

    #[test]
    fn system_query_options_are_percent_encoded() {
        let query = system_query(&[
            ("$top", "10".to_string()),
            ("$filter", "substringof('a+b & c',tolower(StorageBin))".to_string()),
        ]);
        assert_eq!(
            query,
            "$top=10&$filter=substringof%28%27a%2Bb%20%26%20c%27%2Ctolower%28StorageBin%29%29"
        );
    }

    #[test]
    fn storage_bin_id_format() {
        let source = source("https://gw.example.com");
        assert!(source.is_valid_id("01-02-03"));
        assert!(source.is_valid_id("ABCDEFGHIJKLMNOPQR"));
        assert!(!source.is_valid_id("ABCDEFGHIJKLMNOPQRS"));
        assert!(!source.is_valid_id(""));
        assert!(!source.is_valid_id("BIN\n1"));
    }
}
