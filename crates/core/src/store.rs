//! Record persistence: the storage interface and the in-memory backend.
//!
//! Production deployments put a document database behind [`RecordStore`];
//! the bundled server and the test suite run on [`MemoryStore`]. Deletion is
//! always soft: records flip their `activo` flag and keep their data.

use crate::error::{StoreError, StoreResult};
use crate::record::{Address, PatientRecord, PersonalData};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::RwLock;
use uuid::Uuid;

/// A persisted record: the generated identifier plus the document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRecord {
    #[serde(rename = "_id")]
    pub id: Uuid,
    #[serde(flatten)]
    pub record: PatientRecord,
}

/// Declarative record filter. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordQuery {
    pub id: Option<Uuid>,
    pub active: Option<bool>,
    /// Matches records whose study was created on this local date (prefix
    /// match on `estudio.fecha_creacion`).
    pub created_on: Option<NaiveDate>,
}

impl RecordQuery {
    /// Matches every record.
    pub fn any() -> Self {
        RecordQuery::default()
    }

    /// Matches the record with the given identifier, deleted or not.
    pub fn by_id(id: Uuid) -> Self {
        RecordQuery {
            id: Some(id),
            ..RecordQuery::default()
        }
    }

    /// Matches records that have not been soft-deleted.
    pub fn active() -> Self {
        RecordQuery {
            active: Some(true),
            ..RecordQuery::default()
        }
    }

    /// Matches active records whose study was created on `date`.
    pub fn active_created_on(date: NaiveDate) -> Self {
        RecordQuery {
            active: Some(true),
            created_on: Some(date),
            ..RecordQuery::default()
        }
    }

    /// Whether the record identified by `id` satisfies every set field.
    pub fn matches(&self, id: Uuid, record: &PatientRecord) -> bool {
        if let Some(wanted) = self.id {
            if id != wanted {
                return false;
            }
        }
        if let Some(active) = self.active {
            if record.active != active {
                return false;
            }
        }
        if let Some(date) = self.created_on {
            let prefix = date.format("%Y-%m-%d").to_string();
            if !record.study.created_at.starts_with(&prefix) {
                return false;
            }
        }
        true
    }
}

/// Partial update applied by [`RecordStore::update_where`].
///
/// Set blocks replace their counterparts wholesale, the way a document
/// store's `$set` does.
#[derive(Debug, Clone, Default)]
pub struct RecordPatch {
    pub personal: Option<PersonalData>,
    pub address: Option<Address>,
    pub study_notes: Option<String>,
    pub active: Option<bool>,
    pub modified_at: Option<String>,
    pub deleted_at: Option<String>,
}

impl RecordPatch {
    /// Applies every set field to `record`.
    pub fn apply(&self, record: &mut PatientRecord) {
        if let Some(personal) = &self.personal {
            record.personal = personal.clone();
        }
        if let Some(address) = &self.address {
            record.address = Some(address.clone());
        }
        if let Some(notes) = &self.study_notes {
            record.study.notes = Some(notes.clone());
        }
        if let Some(active) = self.active {
            record.active = active;
        }
        if let Some(stamp) = &self.modified_at {
            record.modified_at = Some(stamp.clone());
        }
        if let Some(stamp) = &self.deleted_at {
            record.deleted_at = Some(stamp.clone());
        }
    }
}

/// Interface to the record collection.
///
/// Implementations must be safe to share across request handlers.
pub trait RecordStore: Send + Sync {
    /// Inserts a new document and returns its generated identifier.
    fn insert_record(&self, record: PatientRecord) -> StoreResult<Uuid>;

    /// Fetches one record by identifier, soft-deleted ones included.
    fn find_by_id(&self, id: Uuid) -> StoreResult<Option<StoredRecord>>;

    /// Every record matching the query, in identifier order.
    fn find_where(&self, query: &RecordQuery) -> StoreResult<Vec<StoredRecord>>;

    /// Number of records matching the query.
    fn count_where(&self, query: &RecordQuery) -> StoreResult<u64>;

    /// Applies the patch to every matching record and returns how many
    /// matched.
    fn update_where(&self, query: &RecordQuery, patch: &RecordPatch) -> StoreResult<u64>;

    /// Matching records grouped and counted by study-type code.
    fn count_by_study_type(&self, query: &RecordQuery) -> StoreResult<BTreeMap<String, u64>>;

    /// Backend liveness probe for the health endpoint.
    fn ping(&self) -> bool;
}

/// In-memory [`RecordStore`] used by the bundled server and the tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<BTreeMap<Uuid, PatientRecord>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        MemoryStore::default()
    }
}

impl RecordStore for MemoryStore {
    fn insert_record(&self, record: PatientRecord) -> StoreResult<Uuid> {
        let id = Uuid::new_v4();
        let mut records = self.records.write().map_err(|_| StoreError::LockPoisoned)?;
        records.insert(id, record);
        Ok(id)
    }

    fn find_by_id(&self, id: Uuid) -> StoreResult<Option<StoredRecord>> {
        let records = self.records.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(records.get(&id).map(|record| StoredRecord {
            id,
            record: record.clone(),
        }))
    }

    fn find_where(&self, query: &RecordQuery) -> StoreResult<Vec<StoredRecord>> {
        let records = self.records.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(records
            .iter()
            .filter(|(id, record)| query.matches(**id, record))
            .map(|(id, record)| StoredRecord {
                id: *id,
                record: record.clone(),
            })
            .collect())
    }

    fn count_where(&self, query: &RecordQuery) -> StoreResult<u64> {
        let records = self.records.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(records
            .iter()
            .filter(|(id, record)| query.matches(**id, record))
            .count() as u64)
    }

    fn update_where(&self, query: &RecordQuery, patch: &RecordPatch) -> StoreResult<u64> {
        let mut records = self.records.write().map_err(|_| StoreError::LockPoisoned)?;
        let mut matched = 0u64;
        for (id, record) in records.iter_mut() {
            if query.matches(*id, record) {
                patch.apply(record);
                matched += 1;
            }
        }
        Ok(matched)
    }

    fn count_by_study_type(&self, query: &RecordQuery) -> StoreResult<BTreeMap<String, u64>> {
        let records = self.records.read().map_err(|_| StoreError::LockPoisoned)?;
        let mut counts = BTreeMap::new();
        for (id, record) in records.iter() {
            if query.matches(*id, record) {
                *counts.entry(record.study.code.clone()).or_insert(0) += 1;
            }
        }
        Ok(counts)
    }

    fn ping(&self) -> bool {
        self.records.read().is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{assemble_record, format_timestamp};
    use chrono::NaiveDateTime;

    fn at(date: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(date, "%Y-%m-%dT%H:%M:%S").expect("valid test timestamp")
    }

    fn record(study_code: &str, created: NaiveDateTime) -> PatientRecord {
        assemble_record(
            PersonalData {
                first_name: "Ana".to_string(),
                ..PersonalData::default()
            },
            None,
            study_code.to_string(),
            None,
            Vec::new(),
            created,
        )
        .expect("record assembles")
    }

    #[test]
    fn insert_then_find_by_id() {
        let store = MemoryStore::new();
        let id = store
            .insert_record(record("quimica_sanguinea", at("2026-08-21T10:00:00")))
            .expect("insert");

        let stored = store
            .find_by_id(id)
            .expect("lookup")
            .expect("record exists");
        assert_eq!(stored.id, id);
        assert_eq!(stored.record.study.code, "quimica_sanguinea");
    }

    #[test]
    fn find_by_id_returns_soft_deleted_records() {
        let store = MemoryStore::new();
        let id = store
            .insert_record(record("examen_orina", at("2026-08-21T10:00:00")))
            .expect("insert");

        let patch = RecordPatch {
            active: Some(false),
            deleted_at: Some(format_timestamp(at("2026-08-21T11:00:00"))),
            ..RecordPatch::default()
        };
        let matched = store
            .update_where(&RecordQuery::by_id(id), &patch)
            .expect("soft delete");
        assert_eq!(matched, 1);

        let stored = store
            .find_by_id(id)
            .expect("lookup")
            .expect("deleted records stay addressable");
        assert!(!stored.record.active);
        assert!(stored.record.deleted_at.is_some());
    }

    #[test]
    fn active_query_excludes_soft_deleted_records() {
        let store = MemoryStore::new();
        let keep = store
            .insert_record(record("quimica_sanguinea", at("2026-08-21T10:00:00")))
            .expect("insert");
        let delete = store
            .insert_record(record("biometria_hematica", at("2026-08-21T10:05:00")))
            .expect("insert");

        store
            .update_where(
                &RecordQuery::by_id(delete),
                &RecordPatch {
                    active: Some(false),
                    ..RecordPatch::default()
                },
            )
            .expect("soft delete");

        let active = store.find_where(&RecordQuery::active()).expect("query");
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, keep);
        assert_eq!(store.count_where(&RecordQuery::active()).expect("count"), 1);
        assert_eq!(store.count_where(&RecordQuery::any()).expect("count"), 2);
    }

    #[test]
    fn created_on_matches_by_date_prefix() {
        let store = MemoryStore::new();
        store
            .insert_record(record("examen_orina", at("2026-08-21T09:00:00")))
            .expect("insert");
        store
            .insert_record(record("examen_orina", at("2026-08-20T23:59:59")))
            .expect("insert");

        let today = NaiveDate::from_ymd_opt(2026, 8, 21).expect("valid date");
        assert_eq!(
            store
                .count_where(&RecordQuery::active_created_on(today))
                .expect("count"),
            1
        );
    }

    #[test]
    fn update_where_applies_the_patch_and_reports_matches() {
        let store = MemoryStore::new();
        let id = store
            .insert_record(record("quimica_sanguinea", at("2026-08-21T10:00:00")))
            .expect("insert");

        let stamp = format_timestamp(at("2026-08-21T12:00:00"));
        let patch = RecordPatch {
            personal: Some(PersonalData {
                first_name: "Luis".to_string(),
                ..PersonalData::default()
            }),
            study_notes: Some("en ayunas".to_string()),
            modified_at: Some(stamp.clone()),
            ..RecordPatch::default()
        };
        let matched = store
            .update_where(&RecordQuery::by_id(id), &patch)
            .expect("update");
        assert_eq!(matched, 1);

        let stored = store
            .find_by_id(id)
            .expect("lookup")
            .expect("record exists");
        assert_eq!(stored.record.personal.first_name, "Luis");
        assert_eq!(stored.record.study.notes.as_deref(), Some("en ayunas"));
        assert_eq!(stored.record.modified_at, Some(stamp));
    }

    #[test]
    fn update_where_with_no_match_reports_zero() {
        let store = MemoryStore::new();
        let matched = store
            .update_where(
                &RecordQuery::by_id(Uuid::new_v4()),
                &RecordPatch {
                    active: Some(false),
                    ..RecordPatch::default()
                },
            )
            .expect("update");
        assert_eq!(matched, 0);
    }

    #[test]
    fn counts_group_by_study_type() {
        let store = MemoryStore::new();
        for _ in 0..3 {
            store
                .insert_record(record("quimica_sanguinea", at("2026-08-21T10:00:00")))
                .expect("insert");
        }
        store
            .insert_record(record("examen_orina", at("2026-08-21T10:00:00")))
            .expect("insert");

        let counts = store
            .count_by_study_type(&RecordQuery::active())
            .expect("aggregate");
        assert_eq!(counts.get("quimica_sanguinea"), Some(&3));
        assert_eq!(counts.get("examen_orina"), Some(&1));
        assert_eq!(counts.get("biometria_hematica"), None);
    }

    #[test]
    fn ping_reports_a_healthy_store() {
        let store = MemoryStore::new();
        assert!(store.ping());
    }
}
