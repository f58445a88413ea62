//! Study-type metadata: the recognized panel codes, their display names and
//! the sex codes that steer range selection.

use crate::error::{LabError, LabResult};
use serde::{Deserialize, Serialize};

/// The laboratory panels the system can generate results for.
///
/// The set is deliberately closed: catalog loading, generation and the
/// statistics roll-up all rely on the recognized codes being known at
/// compile time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StudyType {
    /// Complete blood count.
    #[serde(rename = "biometria_hematica")]
    BiometriaHematica,
    /// Blood chemistry (metabolic panel).
    #[serde(rename = "quimica_sanguinea")]
    QuimicaSanguinea,
    /// Urinalysis.
    #[serde(rename = "examen_orina")]
    ExamenOrina,
}

impl StudyType {
    /// Every recognized study type, in catalog-slot order.
    pub const ALL: [StudyType; 3] = [
        StudyType::BiometriaHematica,
        StudyType::QuimicaSanguinea,
        StudyType::ExamenOrina,
    ];

    /// Parses a wire code into a study type.
    ///
    /// # Errors
    ///
    /// Returns [`LabError::UnknownStudyType`] for codes outside the
    /// recognized set.
    pub fn from_code(code: &str) -> LabResult<Self> {
        match code {
            "biometria_hematica" => Ok(StudyType::BiometriaHematica),
            "quimica_sanguinea" => Ok(StudyType::QuimicaSanguinea),
            "examen_orina" => Ok(StudyType::ExamenOrina),
            other => Err(LabError::UnknownStudyType(other.to_string())),
        }
    }

    /// The wire code for this study type.
    pub fn code(&self) -> &'static str {
        match self {
            StudyType::BiometriaHematica => "biometria_hematica",
            StudyType::QuimicaSanguinea => "quimica_sanguinea",
            StudyType::ExamenOrina => "examen_orina",
        }
    }

    /// Human-readable name stamped onto records and reports.
    pub fn display_name(&self) -> &'static str {
        match self {
            StudyType::BiometriaHematica => "Biometría Hemática Completa",
            StudyType::QuimicaSanguinea => "Química Sanguínea (Perfil Metabólico)",
            StudyType::ExamenOrina => "Examen General de Orina",
        }
    }

    /// Catalog file backing this study type.
    pub(crate) fn catalog_filename(&self) -> &'static str {
        match self {
            StudyType::BiometriaHematica => "rangos_biometria.json",
            StudyType::QuimicaSanguinea => "rangos_quimica.json",
            StudyType::ExamenOrina => "rangos_orina.json",
        }
    }

    /// Position of this study type's slot in the catalog cache.
    pub(crate) fn slot_index(&self) -> usize {
        match self {
            StudyType::BiometriaHematica => 0,
            StudyType::QuimicaSanguinea => 1,
            StudyType::ExamenOrina => 2,
        }
    }
}

impl std::fmt::Display for StudyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

impl std::str::FromStr for StudyType {
    type Err = LabError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StudyType::from_code(s)
    }
}

/// Resolves a study-type code to its display name.
///
/// Unrecognized codes are returned unchanged rather than rejected, so
/// callers can stamp names onto records without a validation pass. Callers
/// that need strict validation parse a [`StudyType`] instead.
pub fn display_name(code: &str) -> &str {
    match StudyType::from_code(code) {
        Ok(study) => study.display_name(),
        Err(_) => code,
    }
}

/// Biological sex used for range selection.
///
/// Parsing is permissive: only an explicit `"F"` selects the female ranges
/// and every other code (including none at all) falls back to male. Unknown
/// codes are never an error.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sex {
    #[default]
    #[serde(rename = "M")]
    Male,
    #[serde(rename = "F")]
    Female,
}

impl Sex {
    /// Interprets an optional wire code.
    pub fn from_code(code: Option<&str>) -> Self {
        match code {
            Some("F") => Sex::Female,
            _ => Sex::Male,
        }
    }
}
