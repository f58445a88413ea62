//! Core runtime configuration.
//!
//! This module defines configuration that should be resolved once at process startup and then
//! passed into core services. The intent is to avoid reading process-wide environment variables
//! during request handling, which can lead to inconsistent behaviour in multi-threaded runtimes
//! and test harnesses.

use crate::constants::DEFAULT_CATALOG_DIR;
use crate::study::StudyType;
use crate::{LabError, LabResult};
use std::path::{Path, PathBuf};

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct LabConfig {
    catalog_dir: PathBuf,
    postal_base_url: String,
    postal_token: String,
}

impl LabConfig {
    /// Create a new `LabConfig`.
    pub fn new(
        catalog_dir: PathBuf,
        postal_base_url: String,
        postal_token: String,
    ) -> LabResult<Self> {
        if postal_base_url.trim().is_empty() {
            return Err(LabError::InvalidInput(
                "postal_base_url cannot be empty".into(),
            ));
        }
        if postal_token.trim().is_empty() {
            return Err(LabError::InvalidInput(
                "postal_token cannot be empty".into(),
            ));
        }

        Ok(Self {
            catalog_dir,
            postal_base_url,
            postal_token,
        })
    }

    pub fn catalog_dir(&self) -> &Path {
        &self.catalog_dir
    }

    pub fn postal_base_url(&self) -> &str {
        &self.postal_base_url
    }

    pub fn postal_token(&self) -> &str {
        &self.postal_token
    }
}

/// Resolve the range-catalog directory without reading environment variables.
///
/// If `override_dir` is provided, it must be a directory containing all three catalog files.
/// Otherwise this searches for `crates/core/data/` relative to the current working directory and
/// then walks up from `CARGO_MANIFEST_DIR`.
pub fn resolve_catalog_dir(override_dir: Option<PathBuf>) -> LabResult<PathBuf> {
    fn looks_like_catalog_dir(path: &Path) -> bool {
        StudyType::ALL
            .iter()
            .all(|study| path.join(study.catalog_filename()).is_file())
    }

    if let Some(catalog_dir) = override_dir {
        if catalog_dir.is_dir() && looks_like_catalog_dir(&catalog_dir) {
            return Ok(catalog_dir);
        }
        return Err(LabError::InvalidInput(
            "CLINLAB_CATALOG_DIR override is not a valid catalog directory (must contain the rangos_*.json files)"
                .into(),
        ));
    }

    let cwd_relative = PathBuf::from(DEFAULT_CATALOG_DIR);
    if cwd_relative.is_dir() && looks_like_catalog_dir(&cwd_relative) {
        return Ok(cwd_relative);
    }

    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    for ancestor in manifest_dir.ancestors() {
        let candidate = ancestor.join(DEFAULT_CATALOG_DIR);
        if candidate.is_dir() && looks_like_catalog_dir(&candidate) {
            return Ok(candidate);
        }
    }

    Err(LabError::InvalidInput(
        "could not locate crates/core/data/ directory with the rangos_*.json files".into(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_rejects_blank_postal_settings() {
        let err = LabConfig::new(PathBuf::from("data"), "  ".into(), "pruebas".into())
            .expect_err("blank base url");
        assert!(matches!(err, LabError::InvalidInput(_)));

        let err = LabConfig::new(PathBuf::from("data"), "https://example.test".into(), "".into())
            .expect_err("blank token");
        assert!(matches!(err, LabError::InvalidInput(_)));
    }

    #[test]
    fn resolve_accepts_a_valid_override() {
        let dir = tempfile::tempdir().expect("create temp dir");
        for study in StudyType::ALL {
            std::fs::write(dir.path().join(study.catalog_filename()), "{}")
                .expect("write catalog file");
        }

        let resolved = resolve_catalog_dir(Some(dir.path().to_path_buf()))
            .expect("override with all files resolves");
        assert_eq!(resolved, dir.path());
    }

    #[test]
    fn resolve_rejects_an_incomplete_override() {
        let dir = tempfile::tempdir().expect("create temp dir");
        std::fs::write(dir.path().join("rangos_quimica.json"), "{}").expect("write catalog file");

        let err = resolve_catalog_dir(Some(dir.path().to_path_buf()))
            .expect_err("missing files must fail");
        assert!(matches!(err, LabError::InvalidInput(_)));
    }

    #[test]
    fn resolve_finds_the_bundled_data_from_the_manifest_walk() {
        let resolved = resolve_catalog_dir(None).expect("bundled catalogs resolve");
        assert!(resolved.join("rangos_biometria.json").is_file());
    }
}
