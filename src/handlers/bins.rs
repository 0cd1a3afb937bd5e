use crate::errors::ServiceError;
use crate::models::{Bin, BinStatistics, BinStatus, NewBin, PartialBin};
use crate::queries::ListQuery;
use crate::repositories::BinOperations;
use axum::{
    extract::{Json, Path, Query, State},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use utoipa::{IntoParams, ToSchema};

/// Handler state that exposes the bin operations
pub trait BinHandlerState: Clone + Send + Sync + 'static {
    fn bins(&self) -> &dyn BinOperations;
}

/// Plain acknowledgement body
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    fn new(message: &str) -> Json<Self> {
        Json(Self {
            message: message.to_string(),
        })
    }
}

/// Query string of the bin list route
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct BinListParams {
    /// Number of bins to skip (default 0)
    pub skip: Option<i64>,
    /// Page size (default 100, at most 500)
    pub limit: Option<i64>,
    /// Case-insensitive match on bin number, location or barcode
    pub search: Option<String>,
    /// `active` or `inactive`
    pub status: Option<String>,
}

impl TryFrom<BinListParams> for ListQuery {
    type Error = ServiceError;

    fn try_from(params: BinListParams) -> Result<Self, Self::Error> {
        let status = params
            .status
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(|raw| {
                BinStatus::from_str(raw)
                    .map_err(|_| ServiceError::InvalidQuery(format!("unknown status '{raw}'")))
            })
            .transpose()?;

        Ok(ListQuery {
            search: params.search,
            status,
            skip: params.skip,
            limit: params.limit,
        })
    }
}

/// Create the bin router
pub fn bin_routes<S>() -> Router<S>
where
    S: BinHandlerState,
{
    Router::new()
        .route("/api/", get(api_root))
        .route("/api/bins", get(list_bins::<S>).post(create_bin::<S>))
        .route("/api/bins/count", get(bin_statistics::<S>))
        .route("/api/bins/barcode/:barcode", get(get_bin_by_barcode::<S>))
        .route(
            "/api/bins/:id",
            get(get_bin::<S>).put(update_bin::<S>).delete(delete_bin::<S>),
        )
}

/// Service banner
#[utoipa::path(
    get,
    path = "/api/",
    responses(
        (status = 200, description = "Service banner", body = MessageResponse)
    ),
    tag = "bins"
)]
pub async fn api_root() -> Json<MessageResponse> {
    MessageResponse::new("Warehouse Bin Lookup API")
}

/// List bins with pagination, search and status filter
#[utoipa::path(
    get,
    path = "/api/bins",
    params(BinListParams),
    responses(
        (status = 200, description = "Bins returned", body = [Bin],
            headers(("X-Request-Id" = String, description = "Unique request id for tracing"))
        ),
        (status = 400, description = "Invalid query", body = crate::errors::ErrorResponse),
        (status = 502, description = "Backing source unavailable", body = crate::errors::ErrorResponse)
    ),
    tag = "bins"
)]
pub async fn list_bins<S>(
    State(state): State<S>,
    Query(params): Query<BinListParams>,
) -> Result<Json<Vec<Bin>>, ServiceError>
where
    S: BinHandlerState,
{
    let query = ListQuery::try_from(params)?;
    let bins = state.bins().list(&query).await?;
    Ok(Json(bins))
}

/// Aggregate bin statistics
#[utoipa::path(
    get,
    path = "/api/bins/count",
    responses(
        (status = 200, description = "Statistics returned", body = BinStatistics),
        (status = 502, description = "Backing source unavailable", body = crate::errors::ErrorResponse)
    ),
    tag = "bins"
)]
pub async fn bin_statistics<S>(State(state): State<S>) -> Result<Json<BinStatistics>, ServiceError>
where
    S: BinHandlerState,
{
    Ok(Json(state.bins().statistics().await?))
}

/// Look up a bin by its barcode
#[utoipa::path(
    get,
    path = "/api/bins/barcode/{barcode}",
    params(
        ("barcode" = String, Path, description = "Scanned barcode")
    ),
    responses(
        (status = 200, description = "Bin returned", body = Bin),
        (status = 404, description = "Bin not found", body = crate::errors::ErrorResponse),
        (status = 502, description = "Backing source unavailable", body = crate::errors::ErrorResponse)
    ),
    tag = "bins"
)]
pub async fn get_bin_by_barcode<S>(
    State(state): State<S>,
    Path(barcode): Path<String>,
) -> Result<Json<Bin>, ServiceError>
where
    S: BinHandlerState,
{
    Ok(Json(state.bins().get_by_barcode(&barcode).await?))
}

/// Get a bin by id
#[utoipa::path(
    get,
    path = "/api/bins/{id}",
    params(
        ("id" = String, Path, description = "Bin ID")
    ),
    responses(
        (status = 200, description = "Bin returned", body = Bin),
        (status = 400, description = "Invalid bin ID format", body = crate::errors::ErrorResponse),
        (status = 404, description = "Bin not found", body = crate::errors::ErrorResponse),
        (status = 502, description = "Backing source unavailable", body = crate::errors::ErrorResponse)
    ),
    tag = "bins"
)]
pub async fn get_bin<S>(
    State(state): State<S>,
    Path(id): Path<String>,
) -> Result<Json<Bin>, ServiceError>
where
    S: BinHandlerState,
{
    Ok(Json(state.bins().get_by_id(&id).await?))
}

/// Create a bin
#[utoipa::path(
    post,
    path = "/api/bins",
    request_body = NewBin,
    responses(
        (status = 200, description = "Bin created", body = Bin),
        (status = 400, description = "Missing field, stock above capacity or duplicate bin number", body = crate::errors::ErrorResponse),
        (status = 502, description = "Backing source unavailable", body = crate::errors::ErrorResponse)
    ),
    tag = "bins"
)]
pub async fn create_bin<S>(
    State(state): State<S>,
    Json(payload): Json<NewBin>,
) -> Result<Json<Bin>, ServiceError>
where
    S: BinHandlerState,
{
    Ok(Json(state.bins().create(payload).await?))
}

/// Update a bin; omitted fields keep their value
#[utoipa::path(
    put,
    path = "/api/bins/{id}",
    params(
        ("id" = String, Path, description = "Bin ID")
    ),
    request_body = PartialBin,
    responses(
        (status = 200, description = "Bin updated", body = Bin),
        (status = 400, description = "Invalid ID or stock above capacity", body = crate::errors::ErrorResponse),
        (status = 404, description = "Bin not found", body = crate::errors::ErrorResponse),
        (status = 502, description = "Backing source unavailable", body = crate::errors::ErrorResponse)
    ),
    tag = "bins"
)]
pub async fn update_bin<S>(
    State(state): State<S>,
    Path(id): Path<String>,
    Json(payload): Json<PartialBin>,
) -> Result<Json<Bin>, ServiceError>
where
    S: BinHandlerState,
{
    Ok(Json(state.bins().update(&id, payload).await?))
}

/// Delete a bin
#[utoipa::path(
    delete,
    path = "/api/bins/{id}",
    params(
        ("id" = String, Path, description = "Bin ID")
    ),
    responses(
        (status = 200, description = "Bin deleted", body = MessageResponse),
        (status = 400, description = "Invalid bin ID format", body = crate::errors::ErrorResponse),
        (status = 404, description = "Bin not found", body = crate::errors::ErrorResponse),
        (status = 502, description = "Backing source unavailable", body = crate::errors::ErrorResponse)
    ),
    tag = "bins"
)]
pub async fn delete_bin<S>(
    State(state): State<S>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ServiceError>
where
    S: BinHandlerState,
{
    state.bins().delete(&id).await?;
    Ok(MessageResponse::new("Bin deleted successfully"))
}
