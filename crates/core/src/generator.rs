//! Laboratory result generation.
//!
//! Every catalog parameter produces exactly one result entry, in catalog
//! order. Draws are biased so most values land inside the reference range
//! and the rest spill into a bounded band just below or above it, the way
//! plausible lab sheets look.

use crate::catalog::{CatalogCache, ParameterSpec, QualitativeSpec, QuantitativeSpec, RangeCatalog};
use crate::error::LabResult;
use crate::study::{Sex, StudyType};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Probability that a draw stays inside the reference range.
const NORMAL_PROBABILITY: f64 = 0.8;

/// Width of the out-of-range bands, as a fraction of the range width.
const EXCURSION_FRACTION: f64 = 0.2;

/// One generated result, discriminated by the same `tipo` tag as its
/// parameter spec.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "tipo")]
pub enum ResultEntry {
    #[serde(rename = "cuantitativo")]
    Quantitative(QuantitativeResult),
    #[serde(rename = "cualitativo")]
    Qualitative(QualitativeResult),
}

impl ResultEntry {
    /// The parameter this entry reports on.
    pub fn parameter(&self) -> &str {
        match self {
            ResultEntry::Quantitative(result) => &result.parameter,
            ResultEntry::Qualitative(result) => &result.parameter,
        }
    }

    /// Whether the reported value counts as normal.
    pub fn is_normal(&self) -> bool {
        match self {
            ResultEntry::Quantitative(result) => result.is_normal,
            ResultEntry::Qualitative(result) => result.is_normal,
        }
    }
}

/// A numeric result with the bounds that were actually applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuantitativeResult {
    #[serde(rename = "parametro")]
    pub parameter: String,
    #[serde(rename = "valor")]
    pub value: f64,
    #[serde(rename = "unidad")]
    pub unit: String,
    /// Lower bound used for this draw (sex-adjusted when the spec is).
    #[serde(rename = "valor_minimo")]
    pub range_min: f64,
    /// Upper bound used for this draw (sex-adjusted when the spec is).
    #[serde(rename = "valor_maximo")]
    pub range_max: f64,
    #[serde(rename = "normal")]
    pub is_normal: bool,
}

/// An observed result alongside the value considered normal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualitativeResult {
    #[serde(rename = "parametro")]
    pub parameter: String,
    #[serde(rename = "valor")]
    pub value: String,
    #[serde(rename = "valor_normal")]
    pub normal_value: String,
    #[serde(rename = "normal")]
    pub is_normal: bool,
}

/// Rounds to the two decimal places lab sheets report.
fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn sample_quantitative(spec: &QuantitativeSpec, sex: Sex, rng: &mut impl Rng) -> QuantitativeResult {
    let (range_min, range_max) = spec.resolved_range(sex);
    let spread = (range_max - range_min) * EXCURSION_FRACTION;

    let value = if rng.gen::<f64>() < NORMAL_PROBABILITY {
        round2(rng.gen_range(range_min..=range_max))
    } else if rng.gen_bool(0.5) {
        // The low band clamps at zero and can collapse to the single point
        // `range_min` when the range starts there.
        let band_low = (range_min - spread).max(0.0).min(range_min);
        round2(rng.gen_range(band_low..=range_min))
    } else {
        round2(rng.gen_range(range_max..=range_max + spread))
    };

    // Normality is judged from the rounded value, not from the branch taken:
    // an excursion that rounds back onto a bound is reported normal.
    let is_normal = value >= range_min && value <= range_max;

    QuantitativeResult {
        parameter: spec.name.as_str().to_owned(),
        value,
        unit: spec.unit.clone(),
        range_min,
        range_max,
        is_normal,
    }
}

fn sample_qualitative(spec: &QualitativeSpec, rng: &mut impl Rng) -> QualitativeResult {
    let (value, is_normal) = if rng.gen::<f64>() < NORMAL_PROBABILITY {
        (spec.normal_value.as_str().to_owned(), true)
    } else {
        let alternatives = spec.abnormal_values();
        let choice = alternatives
            .choose(rng)
            .expect("catalog validation guarantees at least one abnormal value");
        ((*choice).to_owned(), false)
    };

    QualitativeResult {
        parameter: spec.name.as_str().to_owned(),
        value,
        normal_value: spec.normal_value.as_str().to_owned(),
        is_normal,
    }
}

/// Samples one result per catalog parameter, in catalog order, using the
/// caller's random source.
pub fn sample_catalog(catalog: &RangeCatalog, sex: Sex, rng: &mut impl Rng) -> Vec<ResultEntry> {
    catalog
        .parameters()
        .iter()
        .map(|spec| match spec {
            ParameterSpec::Quantitative(q) => {
                ResultEntry::Quantitative(sample_quantitative(q, sex, rng))
            }
            ParameterSpec::Qualitative(q) => ResultEntry::Qualitative(sample_qualitative(q, rng)),
        })
        .collect()
}

/// Result generation front door.
///
/// Stateless apart from the shared catalog cache, so it is safe to clone and
/// call from any number of request handlers at once; randomness comes from
/// the calling thread's generator.
#[derive(Debug, Clone)]
pub struct ResultGenerator {
    catalogs: Arc<CatalogCache>,
}

impl ResultGenerator {
    /// Creates a generator over the given catalog cache.
    pub fn new(catalogs: Arc<CatalogCache>) -> Self {
        ResultGenerator { catalogs }
    }

    /// Generates a full panel for the given study-type code.
    ///
    /// # Arguments
    ///
    /// * `study_code` - Wire code of the panel to generate
    /// * `sex` - Sex whose reference ranges apply
    ///
    /// # Errors
    ///
    /// * [`crate::LabError::UnknownStudyType`] for unrecognized codes
    /// * [`crate::LabError::CatalogUnavailable`] when the reference data
    ///   cannot be loaded
    pub fn generate(&self, study_code: &str, sex: Sex) -> LabResult<Vec<ResultEntry>> {
        let study = StudyType::from_code(study_code)?;
        let catalog = self.catalogs.get(study)?;
        Ok(sample_catalog(&catalog, sex, &mut rand::thread_rng()))
    }

    /// The catalog cache backing this generator.
    pub fn catalogs(&self) -> &CatalogCache {
        &self.catalogs
    }
}
