// 🗄️ Registry Store - versioned registry snapshots in SQLite
//
// Append-only: every snapshot is stored under its version and never
// rewritten. Evaluations pick a version (or the latest) and see exactly the
// entries that were saved with it.

use crate::entities::{EntityCategory, EntityClassifier, EntityRegistry, RegistryEntry};
use crate::error::RegistryError;
use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Mutex;
use tracing::info;

pub fn setup_registry_schema(conn: &Connection) -> Result<()> {
    // Enable WAL mode for crash recovery (in-memory databases report "memory")
    let _mode: String =
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS registry_versions (
            version INTEGER PRIMARY KEY,
            fingerprint TEXT NOT NULL,
            entry_count INTEGER NOT NULL,
            created_at TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS registry_entries (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            version INTEGER NOT NULL REFERENCES registry_versions(version),
            canonical_name TEXT NOT NULL,
            category TEXT NOT NULL,
            evidence TEXT NOT NULL,
            aliases_json TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_registry_entries_version ON registry_entries(version)",
        [],
    )?;

    Ok(())
}

/// One stored snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredVersion {
    pub version: u64,
    pub fingerprint: String,
    pub entry_count: usize,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// REGISTRY STORE
// ============================================================================

pub struct RegistryStore {
    conn: Connection,
}

impl RegistryStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path.as_ref())
            .with_context(|| format!("Failed to open registry store: {:?}", path.as_ref()))?;
        setup_registry_schema(&conn)?;
        Ok(RegistryStore { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory registry store")?;
        setup_registry_schema(&conn)?;
        Ok(RegistryStore { conn })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Store `registry` under its own version.
    ///
    /// Saving identical content again is a no-op; saving different content
    /// under an existing version is refused.
    pub fn save_snapshot(&mut self, registry: &EntityRegistry) -> Result<u64> {
        let version = registry.version();
        let fingerprint = registry.fingerprint();

        if let Some(existing) = fingerprint_of(&self.conn, version)? {
            if existing == fingerprint {
                return Ok(version);
            }
            bail!(
                "Registry version {} already stored with different content (fingerprint {})",
                version,
                existing
            );
        }

        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO registry_versions (version, fingerprint, entry_count, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                version as i64,
                fingerprint,
                registry.len() as i64,
                Utc::now().to_rfc3339()
            ],
        )?;

        for entry in registry.entries() {
            let aliases_json = serde_json::to_string(&entry.aliases)?;
            tx.execute(
                "INSERT INTO registry_entries (version, canonical_name, category, evidence, aliases_json)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    version as i64,
                    entry.canonical_name,
                    entry.category.as_str(),
                    entry.evidence,
                    aliases_json,
                ],
            )?;
        }
        tx.commit()?;

        info!(version, entries = registry.len(), "registry snapshot stored");
        Ok(version)
    }

    /// Store `registry` as the newest snapshot, renumbering it past the
    /// latest stored version when needed. Content equal to the latest
    /// snapshot is not stored twice.
    pub fn append(&mut self, registry: &EntityRegistry) -> Result<u64> {
        let latest = latest_version(&self.conn)?;
        if let Some(latest) = latest {
            if fingerprint_of(&self.conn, latest)?.as_deref() == Some(registry.fingerprint().as_str()) {
                return Ok(latest);
            }
        }

        let next = latest.map(|v| v + 1).unwrap_or(1).max(registry.version());
        if next == registry.version() {
            self.save_snapshot(registry)
        } else {
            let renumbered = EntityRegistry::from_entries(next, registry.entries().to_vec());
            self.save_snapshot(&renumbered)
        }
    }

    pub fn load_snapshot(&self, version: u64) -> Result<EntityRegistry> {
        if fingerprint_of(&self.conn, version)?.is_none() {
            bail!("Registry version {} not found in store", version);
        }
        let entries = load_entries(&self.conn, version)
            .with_context(|| format!("Failed to load registry version {}", version))?;
        let registry = EntityRegistry::from_entries(version, entries);
        registry.warn_on_conflicts();
        Ok(registry)
    }

    pub fn load_latest(&self) -> Result<Option<EntityRegistry>> {
        match latest_version(&self.conn)? {
            Some(version) => Ok(Some(self.load_snapshot(version)?)),
            None => Ok(None),
        }
    }

    pub fn versions(&self) -> Result<Vec<StoredVersion>> {
        let mut stmt = self.conn.prepare(
            "SELECT version, fingerprint, entry_count, created_at
             FROM registry_versions
             ORDER BY version",
        )?;

        let versions = stmt
            .query_map([], |row| {
                let version: i64 = row.get(0)?;
                let entry_count: i64 = row.get(2)?;
                let created_at: String = row.get(3)?;
                Ok(StoredVersion {
                    version: version as u64,
                    fingerprint: row.get(1)?,
                    entry_count: entry_count as usize,
                    created_at: DateTime::parse_from_rfc3339(&created_at)
                        .map(|dt| dt.with_timezone(&Utc))
                        .map_err(|e| {
                            rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
                        })?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(versions)
    }
}

fn latest_version(conn: &Connection) -> rusqlite::Result<Option<u64>> {
    let latest: Option<i64> =
        conn.query_row("SELECT MAX(version) FROM registry_versions", [], |row| row.get(0))?;
    Ok(latest.map(|v| v as u64))
}

fn fingerprint_of(conn: &Connection, version: u64) -> rusqlite::Result<Option<String>> {
    conn.query_row(
        "SELECT fingerprint FROM registry_versions WHERE version = ?1",
        [version as i64],
        |row| row.get(0),
    )
    .optional()
}

fn load_entries(conn: &Connection, version: u64) -> rusqlite::Result<Vec<RegistryEntry>> {
    let mut stmt = conn.prepare(
        "SELECT canonical_name, category, evidence, aliases_json
         FROM registry_entries
         WHERE version = ?1
         ORDER BY id",
    )?;

    let entries = stmt
        .query_map([version as i64], |row| {
            let category: String = row.get(1)?;
            let aliases_json: String = row.get(3)?;

            let category = EntityCategory::parse(&category).ok_or_else(|| {
                rusqlite::Error::FromSqlConversionFailure(
                    1,
                    rusqlite::types::Type::Text,
                    format!("unknown entity category: {}", category).into(),
                )
            })?;
            let aliases: BTreeSet<String> = serde_json::from_str(&aliases_json).map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
            })?;

            Ok(RegistryEntry {
                canonical_name: row.get(0)?,
                aliases,
                category,
                evidence: row.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(entries)
}

// ============================================================================
// STORE-BACKED CLASSIFIER
// ============================================================================

/// Classifier pinned to one stored snapshot.
///
/// The version is resolved once, at construction ("latest" means latest at
/// that moment), and its entries are loaded once. Snapshots are append-only,
/// so later imports never change what this classifier answers. Every lookup
/// still checks that the pinned snapshot is readable; any SQLite failure is
/// reported as [`RegistryError::Unavailable`], never as an "Unregulated"
/// finding.
pub struct StoreClassifier {
    conn: Mutex<Connection>,
    registry: EntityRegistry,
    fingerprint: String,
}

impl StoreClassifier {
    pub fn open<P: AsRef<Path>>(path: P, version: Option<u64>) -> Result<Self> {
        let store = RegistryStore::open(path)?;
        StoreClassifier::from_store(store, version)
    }

    pub fn from_store(store: RegistryStore, version: Option<u64>) -> Result<Self> {
        let registry = match version {
            Some(version) => store.load_snapshot(version)?,
            None => match store.load_latest()? {
                Some(registry) => registry,
                None => bail!("Registry store holds no snapshot"),
            },
        };

        info!(version = registry.version(), entries = registry.len(), "registry snapshot pinned");
        Ok(StoreClassifier {
            conn: Mutex::new(store.conn),
            fingerprint: registry.fingerprint(),
            registry,
        })
    }

    pub fn with_fuzzy_distance(mut self, distance: usize) -> Self {
        self.registry = self.registry.with_fuzzy_distance(distance);
        self
    }

    pub fn version(&self) -> u64 {
        self.registry.version()
    }

    fn pinned(&self) -> Result<&EntityRegistry, RegistryError> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| RegistryError::Unavailable("registry connection poisoned".to_string()))?;

        let version = self.registry.version();
        match fingerprint_of(&conn, version).map_err(unavailable)? {
            Some(fingerprint) if fingerprint == self.fingerprint => Ok(&self.registry),
            Some(_) => Err(RegistryError::Unavailable(format!(
                "registry version {} no longer matches its stored fingerprint",
                version
            ))),
            None => Err(RegistryError::Unavailable(format!(
                "registry version {} not found in store",
                version
            ))),
        }
    }
}

fn unavailable(err: rusqlite::Error) -> RegistryError {
    RegistryError::Unavailable(err.to_string())
}

impl EntityClassifier for StoreClassifier {
    fn classify(&self, name: &str) -> Result<RegistryEntry, RegistryError> {
        Ok(self.pinned()?.classify_name(name))
    }

    fn known_names(&self) -> Result<Vec<String>, RegistryError> {
        self.pinned()?.known_names()
    }

    fn snapshot_id(&self) -> Option<String> {
        self.registry.snapshot_id()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn store_with_defaults() -> RegistryStore {
        let mut store = RegistryStore::open_in_memory().unwrap();
        store.save_snapshot(&EntityRegistry::with_defaults()).unwrap();
        store
    }

    /// File-backed store so a second handle can change it under a classifier
    fn temp_store_path() -> std::path::PathBuf {
        std::env::temp_dir().join(format!("parts-trace-store-{}.db", Uuid::new_v4()))
    }

    fn remove_store(path: &Path) {
        for suffix in ["", "-wal", "-shm"] {
            let mut file = path.as_os_str().to_owned();
            file.push(suffix);
            std::fs::remove_file(file).ok();
        }
    }

    #[test]
    fn test_snapshot_round_trip() {
        let store = store_with_defaults();
        let registry = EntityRegistry::with_defaults();

        let loaded = store.load_snapshot(1).unwrap();
        assert_eq!(loaded.version(), 1);
        assert_eq!(loaded.len(), registry.len());
        assert_eq!(loaded.fingerprint(), registry.fingerprint());
    }

    #[test]
    fn test_save_is_append_only() {
        let mut store = store_with_defaults();

        // Same content again is fine
        assert_eq!(store.save_snapshot(&EntityRegistry::with_defaults()).unwrap(), 1);

        // Different content under version 1 is refused
        let other = EntityRegistry::from_entries(
            1,
            vec![RegistryEntry::new("Bizjet International", EntityCategory::RepairStation145, "")],
        );
        assert!(store.save_snapshot(&other).is_err());
        assert_eq!(store.versions().unwrap().len(), 1);
    }

    #[test]
    fn test_append_and_latest() {
        let mut store = store_with_defaults();
        let updated = store
            .load_latest()
            .unwrap()
            .unwrap()
            .with_entry(RegistryEntry::new("Bizjet International", EntityCategory::RepairStation145, "FAA 145 verified"));

        assert_eq!(store.append(&updated).unwrap(), 2);
        assert_eq!(store.append(&updated).unwrap(), 2);

        // A file-loaded snapshot that still says version 1 is renumbered
        let reimport = EntityRegistry::from_entries(1, vec![RegistryEntry::new("Solo Aero", EntityCategory::Oem, "")]);
        assert_eq!(store.append(&reimport).unwrap(), 3);

        let latest = store.load_latest().unwrap().unwrap();
        assert_eq!(latest.version(), 3);
        assert_eq!(latest.category_of("Solo Aero"), EntityCategory::Oem);

        let versions: Vec<u64> = store.versions().unwrap().iter().map(|v| v.version).collect();
        assert_eq!(versions, vec![1, 2, 3]);
    }

    #[test]
    fn test_load_missing_version() {
        let store = store_with_defaults();
        assert!(store.load_snapshot(9).is_err());
        assert!(RegistryStore::open_in_memory().unwrap().load_latest().unwrap().is_none());
    }

    #[test]
    fn test_store_classifier_matches_in_memory_registry() {
        let classifier = StoreClassifier::from_store(store_with_defaults(), None).unwrap();

        let entry = classifier.classify("EXPRESSJET AIRLINES INC").unwrap();
        assert_eq!(entry.category, EntityCategory::Airline121);
        assert_eq!(entry.canonical_name, "ExpressJet Airlines, Inc.");

        let unknown = classifier.classify("Nowhere Parts").unwrap();
        assert_eq!(unknown.category, EntityCategory::Unregulated);
        assert_eq!(classifier.version(), 1);
        assert_eq!(classifier.snapshot_id(), EntityRegistry::with_defaults().snapshot_id());
    }

    #[test]
    fn test_latest_is_pinned_at_construction() {
        let path = temp_store_path();
        let mut store = RegistryStore::open(&path).unwrap();
        store.save_snapshot(&EntityRegistry::with_defaults()).unwrap();

        let classifier = StoreClassifier::open(&path, None).unwrap();
        let before = classifier.classify("Bizjet International").unwrap().category;
        let snapshot_before = classifier.snapshot_id();

        // Another handle appends a newer snapshot mid-run
        let updated = EntityRegistry::with_defaults().with_entry(RegistryEntry::new(
            "Bizjet International",
            EntityCategory::Fraudulent,
            "blacklisted",
        ));
        assert_eq!(store.append(&updated).unwrap(), 2);

        let after = classifier.classify("Bizjet International").unwrap().category;
        assert_eq!(before, EntityCategory::Unregulated);
        assert_eq!(after, EntityCategory::Unregulated);
        assert_eq!(classifier.version(), 1);
        assert_eq!(classifier.snapshot_id(), snapshot_before);

        // A new classifier sees the new snapshot
        let fresh = StoreClassifier::open(&path, None).unwrap();
        assert_eq!(fresh.classify("Bizjet International").unwrap().category, EntityCategory::Fraudulent);

        drop(classifier);
        drop(fresh);
        drop(store);
        remove_store(&path);
    }

    #[test]
    fn test_store_failure_is_unavailable_not_unregulated() {
        let path = temp_store_path();
        let mut store = RegistryStore::open(&path).unwrap();
        store.save_snapshot(&EntityRegistry::with_defaults()).unwrap();

        let classifier = StoreClassifier::open(&path, None).unwrap();
        assert!(classifier.classify("Honeywell").is_ok());

        store.connection().execute("DROP TABLE registry_entries", []).unwrap();
        store.connection().execute("DROP TABLE registry_versions", []).unwrap();

        assert!(matches!(
            classifier.classify("Honeywell"),
            Err(RegistryError::Unavailable(_))
        ));

        drop(classifier);
        drop(store);
        remove_store(&path);
    }

    #[test]
    fn test_empty_store_or_missing_version_fails_construction() {
        assert!(StoreClassifier::from_store(RegistryStore::open_in_memory().unwrap(), None).is_err());
        assert!(StoreClassifier::from_store(store_with_defaults(), Some(4)).is_err());
    }

    #[test]
    fn test_validator_over_store_reports_registry_unavailable() {
        use crate::certificate::{CertificateRecord, CertificateType};
        use crate::config::TraceConfig;
        use crate::validator::Validator;
        use std::sync::Arc;

        let path = temp_store_path();
        let mut store = RegistryStore::open(&path).unwrap();
        store.save_snapshot(&EntityRegistry::with_defaults()).unwrap();

        let classifier = StoreClassifier::open(&path, None).unwrap();
        store.connection().execute("DROP TABLE registry_entries", []).unwrap();
        store.connection().execute("DROP TABLE registry_versions", []).unwrap();

        let validator = Validator::new(Arc::new(classifier), TraceConfig::default()).unwrap();
        let certs = vec![CertificateRecord::new(CertificateType::Coc, "P-1", "doc")
            .with_seller("Honeywell")
            .with_buyer("Skylink")];
        let err = validator.validate_document(&certs, "doc").unwrap_err();
        assert!(err.is_registry_unavailable());

        drop(validator);
        drop(store);
        remove_store(&path);
    }
}
