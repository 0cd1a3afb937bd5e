use axum::{routing::get, Json, Router};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Warehouse Bin Lookup API",
        version = "1.0.0",
        description = r#"
# Warehouse Bin Lookup API

Look up, list and maintain warehouse storage bins. Bins are served from a
local store or from an S/4HANA storage-bin OData service.

## Errors

Failures return `{ error, message, request_id, timestamp }`. Validation
failures, malformed ids, bad queries and duplicate bin numbers are `400`;
unknown bins are `404`; an unreachable backing source is `502`.

## Request ids

Send `X-Request-Id` to correlate logs; one is generated otherwise and echoed
in the response.
        "#,
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "bins", description = "Storage bin endpoints")
    ),
    paths(
        crate::handlers::bins::api_root,
        crate::handlers::bins::list_bins,
        crate::handlers::bins::bin_statistics,
        crate::handlers::bins::get_bin_by_barcode,
        crate::handlers::bins::get_bin,
        crate::handlers::bins::create_bin,
        crate::handlers::bins::update_bin,
        crate::handlers::bins::delete_bin,
    ),
    components(
        schemas(
            crate::models::Bin,
            crate::models::BinStatus,
            crate::models::NewBin,
            crate::models::PartialBin,
            crate::models::BinStatistics,
            crate::handlers::bins::MessageResponse,
            crate::errors::ErrorResponse
        )
    )
)]
pub struct ApiDoc;

/// Serves the generated document at `/api/openapi.json`.
pub fn openapi_routes<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new().route(
        "/api/openapi.json",
        get(|| async { Json(ApiDoc::openapi()) }),
    )
}
