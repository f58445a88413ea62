//! Request and response bodies for the REST endpoints.
//!
//! Responses reuse the core document types directly; only the envelopes the
//! API wraps them in live here.

use clinlab_core::{Address, PersonalData, StoredRecord};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::ToSchema;

/// Body of `POST /api/pacientes`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreatePatientReq {
    #[schema(value_type = Object)]
    pub datos_personales: Option<PersonalData>,
    #[schema(value_type = Object)]
    pub direccion: Option<Address>,
    pub estudio: Option<StudyReq>,
}

/// Study block of a create request.
#[derive(Debug, Deserialize, ToSchema)]
pub struct StudyReq {
    pub tipo: Option<String>,
    pub notas: Option<String>,
}

/// Body of `PUT /api/pacientes/{id}`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdatePatientReq {
    #[schema(value_type = Object)]
    pub datos_personales: Option<PersonalData>,
    #[schema(value_type = Object)]
    pub direccion: Option<Address>,
    pub estudio: Option<StudyPatchReq>,
}

/// Study block of an update request. The study type and its generated
/// results are fixed at creation; only the notes can change afterwards.
#[derive(Debug, Deserialize, ToSchema)]
pub struct StudyPatchReq {
    pub notas: Option<String>,
}

impl UpdatePatientReq {
    /// Whether the request carries nothing to update.
    pub fn is_empty(&self) -> bool {
        self.datos_personales.is_none()
            && self.direccion.is_none()
            && self
                .estudio
                .as_ref()
                .map_or(true, |study| study.notas.is_none())
    }
}

/// Response of `GET /api/pacientes`.
#[derive(Debug, Serialize, ToSchema)]
pub struct PatientListRes {
    #[schema(value_type = Vec<Object>)]
    pub pacientes: Vec<StoredRecord>,
    pub total: usize,
}

/// Envelope for create and update confirmations.
#[derive(Debug, Serialize, ToSchema)]
pub struct PatientRes {
    pub message: String,
    #[schema(value_type = Object)]
    pub paciente: StoredRecord,
}

/// Plain confirmation message.
#[derive(Debug, Serialize, ToSchema)]
pub struct MessageRes {
    pub message: String,
}

/// Response of `GET /api/estadisticas`.
#[derive(Debug, Serialize, ToSchema)]
pub struct StatisticsRes {
    pub total_pacientes: u64,
    pub estudios_hoy: u64,
    pub por_tipo_estudio: BTreeMap<String, u64>,
}

/// Response of `GET /`.
#[derive(Debug, Serialize, ToSchema)]
pub struct IndexRes {
    pub api: String,
    pub version: String,
    pub endpoints: Vec<String>,
}

/// Response of `GET /api/test`.
#[derive(Debug, Serialize, ToSchema)]
pub struct ServiceStatusRes {
    pub message: String,
    pub status: String,
    pub database: String,
}
