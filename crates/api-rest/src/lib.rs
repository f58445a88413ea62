//! # API REST
//!
//! REST API implementation for the clinical laboratory service.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - OpenAPI/Swagger documentation
//! - REST-specific concerns (JSON serialization, CORS)
//!
//! State is built once from [`clinlab_core::LabConfig`] and shared across
//! handlers.

#![warn(rust_2018_idioms)]

use std::sync::Arc;

use axum::routing::{delete, get, post, put};
use axum::Router;
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use clinlab_core::{
    CatalogCache, HttpTransport, LabConfig, MemoryStore, PostalResult, PostalService,
    RecordStore, ResultGenerator,
};

pub mod error;
pub mod handlers;
pub mod types;

/// Shared handler state: the result generator, the record store and the
/// postal-code client.
#[derive(Clone)]
pub struct AppState {
    pub generator: Arc<ResultGenerator>,
    pub store: Arc<dyn RecordStore>,
    pub postal: Arc<PostalService<HttpTransport>>,
}

impl AppState {
    /// Wires the state from a validated configuration.
    ///
    /// # Errors
    /// Fails when the postal HTTP client cannot be built.
    pub fn from_config(config: &LabConfig) -> PostalResult<Self> {
        let catalogs = Arc::new(CatalogCache::new(config.catalog_dir().to_path_buf()));
        let transport = HttpTransport::new(config.postal_base_url(), config.postal_token())?;
        Ok(AppState {
            generator: Arc::new(ResultGenerator::new(catalogs)),
            store: Arc::new(MemoryStore::new()),
            postal: Arc::new(PostalService::new(transport)),
        })
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::index,
        handlers::service_status,
        handlers::list_patients,
        handlers::get_patient,
        handlers::create_patient,
        handlers::update_patient,
        handlers::delete_patient,
        handlers::statistics,
        handlers::postal_lookup,
    ),
    components(schemas(
        types::CreatePatientReq,
        types::StudyReq,
        types::UpdatePatientReq,
        types::StudyPatchReq,
        types::PatientListRes,
        types::PatientRes,
        types::MessageRes,
        types::StatisticsRes,
        types::IndexRes,
        types::ServiceStatusRes,
        error::ErrorBody,
    ))
)]
pub struct ApiDoc;

/// Builds the complete application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/api/test", get(handlers::service_status))
        .route("/api/pacientes", get(handlers::list_patients))
        .route("/api/pacientes", post(handlers::create_patient))
        .route("/api/pacientes/:id", get(handlers::get_patient))
        .route("/api/pacientes/:id", put(handlers::update_patient))
        .route("/api/pacientes/:id", delete(handlers::delete_patient))
        .route("/api/estadisticas", get(handlers::statistics))
        .route("/api-externa/cp/:codigo", get(handlers::postal_lookup))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .fallback(handlers::endpoint_not_found)
        .layer(CorsLayer::permissive())
        .with_state(state)
}
