//! Patient record documents and their assembly.
//!
//! Field names on the wire are the Spanish ones the API has always spoken;
//! the structs keep English names internally and map via serde renames.

use crate::error::{LabError, LabResult};
use crate::generator::ResultEntry;
use crate::study;
use chrono::{Local, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Timestamp format stored on records (local time, microsecond precision).
///
/// The `YYYY-MM-DD` prefix is what lets the statistics roll-up match
/// "created today" with a plain prefix comparison.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

/// Date-only format for birth dates.
const BIRTH_DATE_FORMAT: &str = "%Y-%m-%d";

/// Identity block of a record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersonalData {
    #[serde(rename = "nombre", default)]
    pub first_name: String,
    #[serde(rename = "apellido_paterno", default)]
    pub paternal_surname: String,
    #[serde(rename = "apellido_materno", default, skip_serializing_if = "Option::is_none")]
    pub maternal_surname: Option<String>,
    /// `YYYY-MM-DD`; drives the derived `edad` field.
    #[serde(rename = "fecha_nacimiento", default, skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<String>,
    #[serde(rename = "sexo", default, skip_serializing_if = "Option::is_none")]
    pub sex_code: Option<String>,
    #[serde(rename = "telefono", default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(rename = "email", default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Whole years, recomputed from `fecha_nacimiento` whenever one is
    /// supplied.
    #[serde(rename = "edad", default, skip_serializing_if = "Option::is_none")]
    pub age: Option<i64>,
}

/// Address block of a record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Address {
    #[serde(rename = "calle", default, skip_serializing_if = "Option::is_none")]
    pub street: Option<String>,
    #[serde(rename = "numero", default, skip_serializing_if = "Option::is_none")]
    pub number: Option<String>,
    #[serde(rename = "colonia", default)]
    pub neighborhood: String,
    #[serde(rename = "municipio", default)]
    pub municipality: String,
    #[serde(rename = "estado", default)]
    pub state: String,
    #[serde(rename = "codigo_postal", default)]
    pub postal_code: String,
}

/// The study block: which panel was run and when.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudyInfo {
    #[serde(rename = "tipo")]
    pub code: String,
    #[serde(rename = "nombre")]
    pub display_name: String,
    #[serde(rename = "notas", default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(rename = "fecha_creacion")]
    pub created_at: String,
}

/// A complete patient record as persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientRecord {
    #[serde(rename = "datos_personales")]
    pub personal: PersonalData,
    #[serde(rename = "direccion", default, skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
    #[serde(rename = "estudio")]
    pub study: StudyInfo,
    #[serde(rename = "resultados")]
    pub results: Vec<ResultEntry>,
    #[serde(rename = "fecha_registro")]
    pub registered_at: String,
    /// Soft-delete flag. Deleted records keep their data and stay
    /// addressable by id.
    #[serde(rename = "activo")]
    pub active: bool,
    #[serde(rename = "fecha_modificacion", default, skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<String>,
    #[serde(rename = "fecha_eliminacion", default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<String>,
}

/// Age in whole years on `today`, as `days since birth // 365`.
///
/// The floor division slightly inflates ages across many leap years, but it
/// is the rule the stored records were built with, so it stays.
///
/// # Errors
///
/// Returns [`LabError::InvalidInput`] when `birth_date` is not `YYYY-MM-DD`.
pub fn age_from_birth_date(birth_date: &str, today: NaiveDate) -> LabResult<i64> {
    let birth = NaiveDate::parse_from_str(birth_date, BIRTH_DATE_FORMAT).map_err(|e| {
        LabError::InvalidInput(format!("invalid fecha_nacimiento {birth_date:?}: {e}"))
    })?;
    Ok((today - birth).num_days().div_euclid(365))
}

/// Formats a timestamp the way records store them.
pub fn format_timestamp(at: NaiveDateTime) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

/// The current local time, the clock all record timestamps use.
pub fn local_now() -> NaiveDateTime {
    Local::now().naive_local()
}

/// Combines patient attributes with a generated panel into a persistable
/// record: derives the age when a birth date is present, resolves the study
/// display name, stamps both creation timestamps and marks the record
/// active.
///
/// # Errors
///
/// Returns [`LabError::InvalidInput`] when the supplied birth date cannot be
/// parsed.
pub fn assemble_record(
    mut personal: PersonalData,
    address: Option<Address>,
    study_code: String,
    notes: Option<String>,
    results: Vec<ResultEntry>,
    now: NaiveDateTime,
) -> LabResult<PatientRecord> {
    if let Some(birth) = personal.birth_date.as_deref() {
        personal.age = Some(age_from_birth_date(birth, now.date())?);
    }

    let stamp = format_timestamp(now);
    Ok(PatientRecord {
        study: StudyInfo {
            display_name: study::display_name(&study_code).to_owned(),
            code: study_code,
            notes,
            created_at: stamp.clone(),
        },
        personal,
        address,
        results,
        registered_at: stamp,
        active: true,
        modified_at: None,
        deleted_at: None,
    })
}
