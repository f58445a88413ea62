//! REST error mapping.
//!
//! Every failure leaves the API as `{"error": "..."}` with a status chosen
//! from the error kind, never from string matching. Internal details are
//! logged and replaced with a generic message on the wire.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use clinlab_core::{LabError, PostalError, StoreError};
use serde::Serialize;
use utoipa::ToSchema;

/// JSON error body, the shape the API has always answered errors with.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
}

/// An API-level error carrying its HTTP status and wire message.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }

    /// Logs the underlying cause and answers with the generic message the
    /// API uses for server-side failures.
    pub fn internal(cause: &dyn std::fmt::Display) -> Self {
        tracing::error!("internal error: {cause}");
        ApiError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: "Error interno del servidor".to_string(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorBody {
                error: self.message,
            }),
        )
            .into_response()
    }
}

impl From<LabError> for ApiError {
    fn from(err: LabError) -> Self {
        match err {
            LabError::UnknownStudyType(code) => ApiError::bad_request(format!(
                "Tipo de estudio inválido: {code}. Tipos válidos: biometria_hematica, quimica_sanguinea, examen_orina"
            )),
            LabError::InvalidInput(detail) => ApiError::bad_request(detail),
            err @ LabError::CatalogUnavailable { .. } => ApiError::internal(&err),
        }
    }
}

impl From<PostalError> for ApiError {
    fn from(err: PostalError) -> Self {
        match err {
            PostalError::InvalidPostalCode(code) => ApiError::bad_request(format!(
                "Código postal inválido: {code}. Debe ser de 5 dígitos."
            )),
            PostalError::LookupNotFound(code) => {
                ApiError::not_found(format!("Código postal no encontrado: {code}"))
            }
            PostalError::LookupTimeout(_) => ApiError {
                status: StatusCode::GATEWAY_TIMEOUT,
                message: "Timeout al consultar API de códigos postales. Intenta de nuevo."
                    .to_string(),
            },
            PostalError::LookupTransportError(detail) => {
                tracing::error!("postal transport failure: {detail}");
                ApiError {
                    status: StatusCode::BAD_GATEWAY,
                    message: "Error al consultar API de códigos postales".to_string(),
                }
            }
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::internal(&err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use std::path::PathBuf;

    async fn body_json(err: ApiError) -> serde_json::Value {
        let response = err.into_response();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body reads");
        serde_json::from_slice(&bytes).expect("body is JSON")
    }

    #[tokio::test]
    async fn errors_serialize_as_the_error_body() {
        let err = ApiError::not_found("Paciente no encontrado");
        assert_eq!(err.status(), StatusCode::NOT_FOUND);

        let body = body_json(err).await;
        assert_eq!(body["error"], "Paciente no encontrado");
    }

    #[test]
    fn unknown_study_types_map_to_bad_request() {
        let err: ApiError = LabError::UnknownStudyType("radiografia".to_string()).into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert!(err.message().contains("radiografia"));
    }

    #[test]
    fn catalog_problems_hide_their_detail() {
        let err: ApiError = LabError::CatalogUnavailable {
            path: PathBuf::from("/data/rangos_quimica.json"),
            source: "disk on fire".into(),
        }
        .into();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message(), "Error interno del servidor");
    }

    #[test]
    fn postal_errors_map_by_kind() {
        let err: ApiError = PostalError::InvalidPostalCode("12".to_string()).into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            err.message(),
            "Código postal inválido: 12. Debe ser de 5 dígitos."
        );

        let err: ApiError = PostalError::LookupNotFound("99999".to_string()).into();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);

        let err: ApiError = PostalError::LookupTimeout(5).into();
        assert_eq!(err.status(), StatusCode::GATEWAY_TIMEOUT);

        let err: ApiError = PostalError::LookupTransportError("conn refused".to_string()).into();
        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
    }
}
