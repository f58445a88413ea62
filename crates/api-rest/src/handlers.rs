//! Request handlers for the laboratory REST API.

use axum::extract::{Path as AxumPath, State};
use axum::http::StatusCode;
use axum::response::Json;
use std::collections::BTreeMap;
use uuid::Uuid;

use clinlab_core::{
    age_from_birth_date, assemble_record, format_timestamp, local_now, PostalInfo, RecordPatch,
    RecordQuery, Sex, StoredRecord, StudyType,
};

use crate::error::ApiError;
use crate::types::{
    CreatePatientReq, IndexRes, MessageRes, PatientListRes, PatientRes, ServiceStatusRes,
    StatisticsRes, UpdatePatientReq,
};
use crate::AppState;

fn parse_patient_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::bad_request("ID de paciente inválido"))
}

#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "API banner with the available endpoints", body = IndexRes)
    )
)]
/// Service banner: name, version and endpoint overview.
#[axum::debug_handler]
pub async fn index() -> Json<IndexRes> {
    Json(IndexRes {
        api: "Laboratorio Clínico API".to_string(),
        version: "1.0".to_string(),
        endpoints: vec![
            "GET  /api/pacientes - Lista todos los pacientes".to_string(),
            "GET  /api/pacientes/<id> - Obtiene un paciente".to_string(),
            "POST /api/pacientes - Crea paciente + genera resultados".to_string(),
            "PUT  /api/pacientes/<id> - Actualiza paciente".to_string(),
            "DELETE /api/pacientes/<id> - Elimina paciente".to_string(),
            "GET  /api/estadisticas - Estadísticas del dashboard".to_string(),
            "GET  /api-externa/cp/<codigo> - Consulta código postal".to_string(),
        ],
    })
}

#[utoipa::path(
    get,
    path = "/api/test",
    responses(
        (status = 200, description = "Service and store status", body = ServiceStatusRes)
    )
)]
/// Health probe: confirms the API is up and whether the store answers.
#[axum::debug_handler]
pub async fn service_status(State(state): State<AppState>) -> Json<ServiceStatusRes> {
    let database = if state.store.ping() {
        "Conectado"
    } else {
        "Desconectado"
    };
    Json(ServiceStatusRes {
        message: "API funcionando correctamente".to_string(),
        status: "ok".to_string(),
        database: database.to_string(),
    })
}

#[utoipa::path(
    get,
    path = "/api/pacientes",
    responses(
        (status = 200, description = "Active patients and their count", body = PatientListRes),
        (status = 500, description = "Internal server error", body = crate::error::ErrorBody)
    )
)]
/// Lists every active patient record.
///
/// Soft-deleted records are excluded; fetch them individually by id if
/// needed.
///
/// # Errors
/// Returns `500 Internal Server Error` if the store cannot be read.
#[axum::debug_handler]
pub async fn list_patients(State(state): State<AppState>) -> Result<Json<PatientListRes>, ApiError> {
    let pacientes = state.store.find_where(&RecordQuery::active())?;
    let total = pacientes.len();
    Ok(Json(PatientListRes { pacientes, total }))
}

#[utoipa::path(
    get,
    path = "/api/pacientes/{id}",
    params(("id" = String, Path, description = "Record identifier")),
    responses(
        (status = 200, description = "The complete record, soft-deleted ones included", body = Object),
        (status = 400, description = "Malformed identifier", body = crate::error::ErrorBody),
        (status = 404, description = "No record with that identifier", body = crate::error::ErrorBody)
    )
)]
/// Fetches one record by id.
///
/// Soft-deleted records are still returned here so history stays
/// reachable.
///
/// # Errors
/// * `400` when the id is not a UUID
/// * `404` when no record carries the id
#[axum::debug_handler]
pub async fn get_patient(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
) -> Result<Json<StoredRecord>, ApiError> {
    let id = parse_patient_id(&id)?;
    match state.store.find_by_id(id)? {
        Some(stored) => Ok(Json(stored)),
        None => Err(ApiError::not_found("Paciente no encontrado")),
    }
}

#[utoipa::path(
    post,
    path = "/api/pacientes",
    request_body = CreatePatientReq,
    responses(
        (status = 201, description = "Record created with a freshly generated panel", body = PatientRes),
        (status = 400, description = "Missing or invalid data", body = crate::error::ErrorBody),
        (status = 500, description = "Internal server error", body = crate::error::ErrorBody)
    )
)]
/// Creates a patient record and generates its laboratory results.
///
/// The study type picks the panel, the patient's sex picks the reference
/// ranges, and the age is derived from the birth date when one is given.
///
/// # Errors
/// * `400` when the body, the personal data or the study type is missing
/// * `400` when the study type is not one of the recognized codes
/// * `500` when the catalog or the store fails
#[axum::debug_handler]
pub async fn create_patient(
    State(state): State<AppState>,
    body: Option<Json<CreatePatientReq>>,
) -> Result<(StatusCode, Json<PatientRes>), ApiError> {
    let Some(Json(req)) = body else {
        return Err(ApiError::bad_request("No se enviaron datos"));
    };
    let Some(personal) = req.datos_personales else {
        return Err(ApiError::bad_request("Faltan datos personales"));
    };
    let Some(study_code) = req.estudio.as_ref().and_then(|study| study.tipo.clone()) else {
        return Err(ApiError::bad_request("Falta tipo de estudio"));
    };
    let notes = req.estudio.and_then(|study| study.notas);

    let sex = Sex::from_code(personal.sex_code.as_deref());
    let results = state.generator.generate(&study_code, sex)?;
    let record = assemble_record(
        personal,
        req.direccion,
        study_code,
        notes,
        results,
        local_now(),
    )?;

    let id = state.store.insert_record(record)?;
    let stored = state
        .store
        .find_by_id(id)?
        .ok_or_else(|| ApiError::internal(&"freshly inserted record not found"))?;

    Ok((
        StatusCode::CREATED,
        Json(PatientRes {
            message: "Paciente creado exitosamente".to_string(),
            paciente: stored,
        }),
    ))
}

#[utoipa::path(
    put,
    path = "/api/pacientes/{id}",
    params(("id" = String, Path, description = "Record identifier")),
    request_body = UpdatePatientReq,
    responses(
        (status = 200, description = "Record updated", body = PatientRes),
        (status = 400, description = "Missing or invalid data", body = crate::error::ErrorBody),
        (status = 404, description = "No record with that identifier", body = crate::error::ErrorBody)
    )
)]
/// Updates a record's personal data, address or study notes.
///
/// Supplying a new birth date recomputes the stored age. The study type and
/// its generated results never change here.
///
/// # Errors
/// * `400` when the id is malformed or the body carries nothing to update
/// * `404` when no record carries the id
#[axum::debug_handler]
pub async fn update_patient(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
    body: Option<Json<UpdatePatientReq>>,
) -> Result<Json<PatientRes>, ApiError> {
    let id = parse_patient_id(&id)?;
    let Some(Json(req)) = body else {
        return Err(ApiError::bad_request("No se enviaron datos"));
    };
    if req.is_empty() {
        return Err(ApiError::bad_request("No se enviaron datos"));
    }

    let now = local_now();
    let mut personal = req.datos_personales;
    if let Some(personal) = personal.as_mut() {
        if let Some(birth) = personal.birth_date.as_deref() {
            personal.age = Some(age_from_birth_date(birth, now.date())?);
        }
    }

    let patch = RecordPatch {
        personal,
        address: req.direccion,
        study_notes: req.estudio.and_then(|study| study.notas),
        modified_at: Some(format_timestamp(now)),
        ..RecordPatch::default()
    };

    let matched = state.store.update_where(&RecordQuery::by_id(id), &patch)?;
    if matched == 0 {
        return Err(ApiError::not_found("Paciente no encontrado"));
    }

    let stored = state
        .store
        .find_by_id(id)?
        .ok_or_else(|| ApiError::internal(&"updated record not found"))?;

    Ok(Json(PatientRes {
        message: "Paciente actualizado exitosamente".to_string(),
        paciente: stored,
    }))
}

#[utoipa::path(
    delete,
    path = "/api/pacientes/{id}",
    params(("id" = String, Path, description = "Record identifier")),
    responses(
        (status = 200, description = "Record deactivated", body = MessageRes),
        (status = 400, description = "Malformed identifier", body = crate::error::ErrorBody),
        (status = 404, description = "No record with that identifier", body = crate::error::ErrorBody)
    )
)]
/// Soft-deletes a record.
///
/// The record keeps its data, drops out of listings and statistics, and
/// remains readable by id.
///
/// # Errors
/// * `400` when the id is not a UUID
/// * `404` when no record carries the id
#[axum::debug_handler]
pub async fn delete_patient(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
) -> Result<Json<MessageRes>, ApiError> {
    let id = parse_patient_id(&id)?;

    let patch = RecordPatch {
        active: Some(false),
        deleted_at: Some(format_timestamp(local_now())),
        ..RecordPatch::default()
    };
    let matched = state.store.update_where(&RecordQuery::by_id(id), &patch)?;
    if matched == 0 {
        return Err(ApiError::not_found("Paciente no encontrado"));
    }

    Ok(Json(MessageRes {
        message: "Paciente eliminado exitosamente".to_string(),
    }))
}

#[utoipa::path(
    get,
    path = "/api/estadisticas",
    responses(
        (status = 200, description = "Dashboard counters", body = StatisticsRes),
        (status = 500, description = "Internal server error", body = crate::error::ErrorBody)
    )
)]
/// Dashboard statistics over the active records.
///
/// `por_tipo_estudio` always carries the three recognized study types, even
/// at zero, so the dashboard never has to guess at keys.
#[axum::debug_handler]
pub async fn statistics(State(state): State<AppState>) -> Result<Json<StatisticsRes>, ApiError> {
    let today = local_now().date();
    let total_pacientes = state.store.count_where(&RecordQuery::active())?;
    let estudios_hoy = state
        .store
        .count_where(&RecordQuery::active_created_on(today))?;

    let mut por_tipo_estudio: BTreeMap<String, u64> = StudyType::ALL
        .iter()
        .map(|study| (study.code().to_string(), 0))
        .collect();
    for (code, count) in state.store.count_by_study_type(&RecordQuery::active())? {
        if let Some(slot) = por_tipo_estudio.get_mut(&code) {
            *slot = count;
        }
    }

    Ok(Json(StatisticsRes {
        total_pacientes,
        estudios_hoy,
        por_tipo_estudio,
    }))
}

#[utoipa::path(
    get,
    path = "/api-externa/cp/{codigo}",
    params(("codigo" = String, Path, description = "Five-digit postal code")),
    responses(
        (status = 200, description = "Neighborhoods, municipality and state", body = Object),
        (status = 400, description = "Malformed postal code", body = crate::error::ErrorBody),
        (status = 404, description = "Postal code not found", body = crate::error::ErrorBody),
        (status = 502, description = "Upstream service failure", body = crate::error::ErrorBody),
        (status = 504, description = "Upstream service timeout", body = crate::error::ErrorBody)
    )
)]
/// Looks up a Mexican postal code through the Copomex service.
///
/// # Errors
/// * `400` before any network traffic when the code is not 5 digits
/// * `404` when the upstream does not know the code
/// * `502` / `504` when the upstream fails or times out
#[axum::debug_handler]
pub async fn postal_lookup(
    State(state): State<AppState>,
    AxumPath(codigo): AxumPath<String>,
) -> Result<Json<PostalInfo>, ApiError> {
    let info = state.postal.lookup(&codigo).await?;
    Ok(Json(info))
}

/// Fallback for unknown routes.
pub async fn endpoint_not_found() -> ApiError {
    ApiError::not_found("Endpoint no encontrado")
}
