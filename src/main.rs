use std::path::PathBuf;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_rest::{router, AppState};
use clinlab_core::{resolve_catalog_dir, LabConfig};

/// Main entry point for the clinlab application
///
/// Starts the REST server backed by the in-memory record store, with the
/// three reference-range catalogs preloaded so broken reference data is
/// caught at startup instead of on the first request.
///
/// # Environment Variables
/// - `CLINLAB_REST_ADDR`: REST server address (default: "0.0.0.0:5000")
/// - `CLINLAB_CATALOG_DIR`: Overrides the reference-range catalog directory
/// - `COPOMEX_BASE_URL`: Overrides the postal-code service base URL
/// - `COPOMEX_TOKEN`: Overrides the postal-code service token
///
/// # Returns
/// * `Ok(())` - If the server starts and runs successfully
/// * `Err(anyhow::Error)` - If startup or runtime fails
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("clinlab_run=info".parse()?)
                .add_directive("api_rest=info".parse()?)
                .add_directive("clinlab_core=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let rest_addr = std::env::var("CLINLAB_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:5000".into());

    tracing::info!("++ Starting clinlab REST on {}", rest_addr);

    let catalog_override = std::env::var("CLINLAB_CATALOG_DIR").ok().map(PathBuf::from);
    let catalog_dir = resolve_catalog_dir(catalog_override)?;

    let postal_base_url = std::env::var("COPOMEX_BASE_URL")
        .unwrap_or_else(|_| clinlab_core::constants::DEFAULT_POSTAL_BASE_URL.into());
    let postal_token = std::env::var("COPOMEX_TOKEN")
        .unwrap_or_else(|_| clinlab_core::constants::DEFAULT_POSTAL_TOKEN.into());

    let config = LabConfig::new(catalog_dir, postal_base_url, postal_token)?;
    let state = AppState::from_config(&config)?;

    state.generator.catalogs().preload()?;

    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&rest_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
