//! Range catalogs: the reference tables the generator samples from.
//!
//! Each study type is backed by one JSON file of parameter specs. Catalogs
//! are loaded once, validated, and shared read-only for the life of the
//! process.

use crate::error::{LabError, LabResult};
use crate::study::{Sex, StudyType};
use clinlab_types::NonEmptyText;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

/// A numeric parameter with reference bounds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuantitativeSpec {
    #[serde(rename = "nombre")]
    pub name: NonEmptyText,
    #[serde(rename = "unidad", default)]
    pub unit: String,
    #[serde(rename = "rango_min")]
    pub range_min: f64,
    #[serde(rename = "rango_max")]
    pub range_max: f64,
    /// When set, the per-sex bounds below take precedence over the base ones.
    #[serde(rename = "genero_especifico", default)]
    pub sex_specific: bool,
    #[serde(rename = "rango_min_hombre", default, skip_serializing_if = "Option::is_none")]
    pub range_min_male: Option<f64>,
    #[serde(rename = "rango_max_hombre", default, skip_serializing_if = "Option::is_none")]
    pub range_max_male: Option<f64>,
    #[serde(rename = "rango_min_mujer", default, skip_serializing_if = "Option::is_none")]
    pub range_min_female: Option<f64>,
    #[serde(rename = "rango_max_mujer", default, skip_serializing_if = "Option::is_none")]
    pub range_max_female: Option<f64>,
}

impl QuantitativeSpec {
    /// The bounds a draw for `sex` actually uses.
    ///
    /// Sex overrides apply only when the parameter is flagged sex-specific,
    /// and each missing override falls back to the base bound on its side.
    pub fn resolved_range(&self, sex: Sex) -> (f64, f64) {
        if !self.sex_specific {
            return (self.range_min, self.range_max);
        }
        match sex {
            Sex::Male => (
                self.range_min_male.unwrap_or(self.range_min),
                self.range_max_male.unwrap_or(self.range_max),
            ),
            Sex::Female => (
                self.range_min_female.unwrap_or(self.range_min),
                self.range_max_female.unwrap_or(self.range_max),
            ),
        }
    }
}

/// An observed parameter with one normal value and a closed set of
/// alternatives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualitativeSpec {
    #[serde(rename = "nombre")]
    pub name: NonEmptyText,
    #[serde(rename = "valor_normal")]
    pub normal_value: NonEmptyText,
    #[serde(rename = "valores_posibles")]
    pub possible_values: Vec<String>,
}

impl QualitativeSpec {
    /// The values a draw can report besides the normal one.
    pub fn abnormal_values(&self) -> Vec<&str> {
        self.possible_values
            .iter()
            .map(String::as_str)
            .filter(|value| *value != self.normal_value.as_str())
            .collect()
    }
}

/// One catalog entry, discriminated by its `tipo` tag.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "tipo")]
pub enum ParameterSpec {
    #[serde(rename = "cuantitativo")]
    Quantitative(QuantitativeSpec),
    #[serde(rename = "cualitativo")]
    Qualitative(QualitativeSpec),
}

impl ParameterSpec {
    /// The parameter's display name.
    pub fn name(&self) -> &str {
        match self {
            ParameterSpec::Quantitative(spec) => spec.name.as_str(),
            ParameterSpec::Qualitative(spec) => spec.name.as_str(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(rename = "parametros")]
    parameters: Vec<ParameterSpec>,
}

/// The ordered reference table for one study type.
///
/// Immutable once loaded; generation walks the parameters in file order so
/// reports always come out in the same sequence.
#[derive(Debug, Clone)]
pub struct RangeCatalog {
    study: StudyType,
    parameters: Vec<ParameterSpec>,
}

impl RangeCatalog {
    /// Loads and validates the catalog for `study` from `catalog_dir`.
    ///
    /// # Errors
    ///
    /// Returns [`LabError::CatalogUnavailable`] when the file is missing,
    /// unreadable, malformed JSON, or violates a catalog invariant.
    pub fn load(catalog_dir: &Path, study: StudyType) -> LabResult<Self> {
        let path = catalog_dir.join(study.catalog_filename());
        let unavailable = |source: Box<dyn std::error::Error + Send + Sync>| {
            LabError::CatalogUnavailable {
                path: path.clone(),
                source,
            }
        };

        let contents = fs::read_to_string(&path).map_err(|e| unavailable(Box::new(e)))?;
        let file: CatalogFile =
            serde_json::from_str(&contents).map_err(|e| unavailable(Box::new(e)))?;
        let catalog = RangeCatalog {
            study,
            parameters: file.parameters,
        };
        catalog.validate().map_err(|reason| unavailable(reason.into()))?;

        tracing::debug!(
            "loaded range catalog for {} ({} parameters)",
            study,
            catalog.parameters.len()
        );
        Ok(catalog)
    }

    /// Checks the invariants generation depends on.
    fn validate(&self) -> Result<(), String> {
        if self.parameters.is_empty() {
            return Err("catalog has no parameters".to_string());
        }
        for spec in &self.parameters {
            match spec {
                ParameterSpec::Quantitative(q) => {
                    for sex in [Sex::Male, Sex::Female] {
                        let (range_min, range_max) = q.resolved_range(sex);
                        if range_max <= range_min {
                            return Err(format!(
                                "parameter {:?} has an empty or inverted range ({range_min}..{range_max})",
                                q.name.as_str()
                            ));
                        }
                    }
                }
                ParameterSpec::Qualitative(q) => {
                    let listed = q
                        .possible_values
                        .iter()
                        .any(|value| value == q.normal_value.as_str());
                    if !listed {
                        return Err(format!(
                            "parameter {:?} does not list its normal value among the possible values",
                            q.name.as_str()
                        ));
                    }
                    if q.abnormal_values().is_empty() {
                        return Err(format!(
                            "parameter {:?} has no abnormal alternatives",
                            q.name.as_str()
                        ));
                    }
                }
            }
        }
        Ok(())
    }

    /// The study type this catalog belongs to.
    pub fn study(&self) -> StudyType {
        self.study
    }

    /// The parameter specs, in file order.
    pub fn parameters(&self) -> &[ParameterSpec] {
        &self.parameters
    }

    /// Number of parameters in the catalog.
    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    /// Whether the catalog holds no parameters (never true after a
    /// successful load).
    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }
}

/// Shared catalog cache with one slot per study type.
///
/// Slots fill on first use. Two threads racing on a first load may both read
/// the file; whichever publishes second just reuses the winner's value, which
/// is harmless because successfully loaded catalogs are interchangeable. A
/// failed load leaves its slot empty, so a later call retries instead of
/// caching the error.
#[derive(Debug)]
pub struct CatalogCache {
    catalog_dir: PathBuf,
    slots: [OnceLock<Arc<RangeCatalog>>; 3],
}

impl CatalogCache {
    /// Creates a cache backed by `catalog_dir`. Nothing is read until the
    /// first [`CatalogCache::get`].
    pub fn new(catalog_dir: PathBuf) -> Self {
        CatalogCache {
            catalog_dir,
            slots: [OnceLock::new(), OnceLock::new(), OnceLock::new()],
        }
    }

    /// Returns the catalog for `study`, loading it on first access.
    ///
    /// # Errors
    ///
    /// Returns [`LabError::CatalogUnavailable`] when the load fails.
    pub fn get(&self, study: StudyType) -> LabResult<Arc<RangeCatalog>> {
        let slot = &self.slots[study.slot_index()];
        if let Some(catalog) = slot.get() {
            return Ok(Arc::clone(catalog));
        }
        let loaded = Arc::new(RangeCatalog::load(&self.catalog_dir, study)?);
        Ok(Arc::clone(slot.get_or_init(|| loaded)))
    }

    /// Loads every catalog up front so configuration problems surface at
    /// startup instead of on the first request.
    ///
    /// # Errors
    ///
    /// Returns the first [`LabError::CatalogUnavailable`] encountered.
    pub fn preload(&self) -> LabResult<()> {
        for study in StudyType::ALL {
            self.get(study)?;
        }
        Ok(())
    }

    /// The directory this cache reads catalogs from.
    pub fn catalog_dir(&self) -> &Path {
        &self.catalog_dir
    }
}
