//! Warehouse Bin Lookup API
//!
//! Canonical bin model, query translation and field mapping, and the
//! repository facade that serves bins from a local store or from an S/4HANA
//! storage-bin OData service.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod config;
pub mod errors;
pub mod handlers;
pub mod mapping;
pub mod middleware_helpers;
pub mod models;
pub mod openapi;
pub mod queries;
pub mod repositories;
pub mod source;
pub mod tracing;

use std::sync::Arc;

use ::tracing::{error, info};
use anyhow::{bail, Context};
use axum::Router;
use http::HeaderValue;
use tower_http::cors::{Any, CorsLayer};

use crate::config::{AppConfig, SourceKind};
use crate::handlers::{bin_routes, health_routes, BinHandlerState};
use crate::repositories::{BinOperations, BinRepository, RepositoryOptions};
use crate::source::{ConfiguredDestinations, LocalBinStore, ODataBinSource};

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub bins: Arc<dyn BinOperations>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(bins: Arc<dyn BinOperations>, config: AppConfig) -> Self {
        Self {
            bins,
            config: Arc::new(config),
        }
    }
}

impl BinHandlerState for AppState {
    fn bins(&self) -> &dyn BinOperations {
        self.bins.as_ref()
    }
}

/// Builds the bin facade over the source selected in `config`.
pub async fn build_bin_service(config: &AppConfig) -> anyhow::Result<Arc<dyn BinOperations>> {
    let options = RepositoryOptions::from(&config.bins);

    match config.source.kind {
        SourceKind::Local => {
            info!("Serving bins from the local store");
            Ok(Arc::new(BinRepository::with_options(
                LocalBinStore::new(),
                options,
            )))
        }
        SourceKind::OData => {
            let name = config
                .source
                .destination
                .as_deref()
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .context("source.destination is required for the odata source")?;

            let destinations = ConfiguredDestinations::from_config(&config.destinations)
                .context("invalid destination configuration")?;
            let source = ODataBinSource::connect(
                &destinations,
                &name.to_lowercase(),
                config.source.odata_settings(),
            )
            .await
            .with_context(|| format!("failed to set up OData source for destination '{name}'"))?;

            info!(
                destination = name,
                service_root = %source.service_root(),
                "Serving bins from OData"
            );
            Ok(Arc::new(BinRepository::with_options(source, options)))
        }
    }
}

/// CORS policy: configured origins, else permissive in development or when
/// explicitly allowed.
pub fn cors_layer(config: &AppConfig) -> anyhow::Result<CorsLayer> {
    let configured_origins: Option<Vec<HeaderValue>> = config
        .cors_allowed_origins
        .as_ref()
        .map(|raw| {
            raw.split(',')
                .filter_map(|origin| {
                    let trimmed = origin.trim();
                    if trimmed.is_empty() {
                        None
                    } else {
                        HeaderValue::from_str(trimmed).ok()
                    }
                })
                .collect::<Vec<_>>()
        })
        .filter(|origins| !origins.is_empty());

    if let Some(origins) = configured_origins {
        Ok(CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any))
    } else if config.should_allow_permissive_cors() {
        info!(
            "Using permissive CORS because explicit origins were not configured ({})",
            if config.is_development() {
                "development environment"
            } else {
                "explicit override enabled"
            }
        );
        Ok(CorsLayer::permissive())
    } else {
        error!("Missing CORS configuration detected; set APP__CORS_ALLOWED_ORIGINS or APP__CORS_ALLOW_ANY_ORIGIN=true");
        bail!("Missing CORS configuration: set APP__CORS_ALLOWED_ORIGINS or APP__CORS_ALLOW_ANY_ORIGIN=true")
    }
}

/// Full HTTP surface: bin routes, health, OpenAPI document, with request ids,
/// tracing and CORS applied.
pub fn app_router(state: AppState, cors: CorsLayer) -> Router {
    Router::new()
        .merge(bin_routes::<AppState>())
        .merge(health_routes::<AppState>())
        .merge(openapi::openapi_routes::<AppState>())
        .layer(crate::tracing::configure_http_tracing())
        .layer(cors)
        // Outermost so the trace span and handlers see the request id
        .layer(axum::middleware::from_fn(
            middleware_helpers::request_id::request_id_middleware,
        ))
        .with_state(state)
}

/// Builds the application router from configuration.
pub async fn build_app(config: AppConfig) -> anyhow::Result<Router> {
    let cors = cors_layer(&config)?;
    let bins = build_bin_service(&config).await?;
    Ok(app_router(AppState::new(bins, config), cors))
}
