//! Standalone REST API server binary.
//!
//! ## Purpose
//! Runs the REST API server on its own.
//!
//! ## Intended use
//! This binary is useful for development and debugging when you only want the
//! REST server (with OpenAPI/Swagger UI). The workspace's main `clinlab-run`
//! binary is the deployable entry point.

use std::path::PathBuf;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_rest::{router, AppState};
use clinlab_core::{resolve_catalog_dir, LabConfig};

/// Main entry point for the clinical laboratory REST API server
///
/// Starts the REST API server on the configured address (default: 0.0.0.0:5000).
/// Provides HTTP endpoints for patient operations with OpenAPI/Swagger documentation.
///
/// # Environment Variables
/// - `CLINLAB_REST_ADDR`: Server address (default: "0.0.0.0:5000")
/// - `CLINLAB_CATALOG_DIR`: Overrides the reference-range catalog directory
/// - `COPOMEX_BASE_URL`: Overrides the postal-code service base URL
/// - `COPOMEX_TOKEN`: Overrides the postal-code service token
///
/// # Returns
/// * `Ok(())` - If server starts and runs successfully
///
/// # Errors
/// Returns an error if:
/// - the logging/tracing configuration cannot be initialised,
/// - the catalog directory cannot be resolved or a catalog fails to load,
/// - the server address cannot be bound, or
/// - the HTTP server fails while running.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("api_rest=info".parse()?)
                .add_directive("clinlab_core=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let addr = std::env::var("CLINLAB_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:5000".into());

    tracing::info!("-- Starting clinlab REST API on {}", addr);

    let catalog_override = std::env::var("CLINLAB_CATALOG_DIR").ok().map(PathBuf::from);
    let catalog_dir = resolve_catalog_dir(catalog_override)?;

    let postal_base_url = std::env::var("COPOMEX_BASE_URL")
        .unwrap_or_else(|_| clinlab_core::constants::DEFAULT_POSTAL_BASE_URL.into());
    let postal_token = std::env::var("COPOMEX_TOKEN")
        .unwrap_or_else(|_| clinlab_core::constants::DEFAULT_POSTAL_TOKEN.into());

    let config = LabConfig::new(catalog_dir, postal_base_url, postal_token)?;
    let state = AppState::from_config(&config)?;

    // Surface broken catalogs at startup rather than on the first request.
    state.generator.catalogs().preload()?;

    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
