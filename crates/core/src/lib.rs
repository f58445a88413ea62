//! # clinlab Core
//!
//! Core business logic for the clinlab laboratory record system.
//!
//! This crate contains the domain operations, independent of any server:
//! - Range catalogs and randomized result generation
//! - Patient record assembly and the persistence interface
//! - Mexican postal-code lookup against Copomex
//!
//! **No API concerns**: HTTP routing, status mapping and request DTOs belong
//! in `api-rest`.

pub mod catalog;
pub mod config;
pub mod constants;
pub mod error;
pub mod generator;
pub mod postal;
pub mod record;
pub mod store;
pub mod study;

pub use catalog::{CatalogCache, ParameterSpec, QualitativeSpec, QuantitativeSpec, RangeCatalog};
pub use config::{resolve_catalog_dir, LabConfig};
pub use error::{LabError, LabResult, PostalError, PostalResult, StoreError, StoreResult};
pub use generator::{
    sample_catalog, QualitativeResult, QuantitativeResult, ResultEntry, ResultGenerator,
};
pub use postal::{
    validate_postal_code, HttpTransport, PostalInfo, PostalService, PostalTransport,
};
pub use record::{
    age_from_birth_date, assemble_record, format_timestamp, local_now, Address, PatientRecord,
    PersonalData, StudyInfo,
};
pub use store::{MemoryStore, RecordPatch, RecordQuery, RecordStore, StoredRecord};
pub use study::{display_name, Sex, StudyType};
