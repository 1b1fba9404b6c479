// crates/sweep-store-json/src/store.rs
// ============================================================================
// Module: JSON File Store
// Description: Vector and result store backed by one structured file.
// Purpose: Persist results idempotently without external services.
// Dependencies: sweep-core, serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! The file holds `{"serialized_vectors": {id: vector}, "results": {id:
//! record}}`. Every operation re-reads the file so external generators can
//! add vectors between runs; writes replace the whole file through a sibling
//! temporary file and a rename. Result upserts overwrite the entry keyed by
//! vector id, so re-running a suite never duplicates records.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Mutex;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;
use sweep_core::ModuleName;
use sweep_core::ResultRecord;
use sweep_core::ResultStore;
use sweep_core::StoreError;
use sweep_core::StoredVector;
use sweep_core::SuiteName;
use sweep_core::TestStatus;
use sweep_core::VectorId;
use sweep_core::VectorStatus;
use sweep_core::VectorStore;
use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// JSON store errors.
#[derive(Debug, Error)]
pub enum JsonStoreError {
    /// File I/O error.
    #[error("json store io error: {0}")]
    Io(String),
    /// File contents are not a valid database document.
    #[error("json store corruption: {0}")]
    Corrupt(String),
    /// Invalid store input.
    #[error("json store invalid data: {0}")]
    Invalid(String),
}

impl From<JsonStoreError> for StoreError {
    fn from(error: JsonStoreError) -> Self {
        match error {
            JsonStoreError::Io(message) => Self::Io(message),
            JsonStoreError::Corrupt(message) => Self::Corrupt(message),
            JsonStoreError::Invalid(message) => Self::Invalid(message),
        }
    }
}

// ============================================================================
// SECTION: File Layout
// ============================================================================

/// On-disk database document.
#[derive(Debug, Default, Serialize, Deserialize)]
struct Database {
    /// Vector documents keyed by vector id.
    #[serde(default)]
    serialized_vectors: Map<String, Value>,
    /// Result documents keyed by vector id.
    #[serde(default)]
    results: Map<String, Value>,
}

impl Database {
    /// Parses every vector document belonging to a module.
    fn module_vectors(&self, module: &ModuleName) -> Result<Vec<StoredVector>, JsonStoreError> {
        let mut vectors = Vec::new();
        for (id, document) in &self.serialized_vectors {
            let vector = StoredVector::from_document(id, document.clone())
                .map_err(|err| JsonStoreError::Corrupt(format!("vector {id}: {err}")))?;
            if vector.header.module_name == *module {
                vectors.push(vector);
            }
        }
        Ok(vectors)
    }

    /// Parses every result record belonging to a module.
    fn module_results(&self, module: &ModuleName) -> Result<Vec<ResultRecord>, JsonStoreError> {
        let mut records = Vec::new();
        for (id, document) in &self.results {
            let record: ResultRecord = serde_json::from_value(document.clone())
                .map_err(|err| JsonStoreError::Corrupt(format!("result {id}: {err}")))?;
            if record.header.module_name == *module {
                records.push(record);
            }
        }
        Ok(records)
    }
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// Flat-file sweep store.
#[derive(Debug)]
pub struct JsonFileStore {
    /// Database file path.
    path: PathBuf,
    /// Serializes read-modify-write cycles within this process.
    lock: Mutex<()>,
}

impl JsonFileStore {
    /// Creates a store over the given file; the file may not exist yet.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Returns the database file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Adds or replaces vector documents, keyed by their vector id.
    ///
    /// # Errors
    ///
    /// Returns [`JsonStoreError`] when the file cannot be read or written.
    pub fn insert_vectors(&self, vectors: &[StoredVector]) -> Result<(), JsonStoreError> {
        let _guard = self.lock()?;
        let mut database = self.read()?;
        for vector in vectors {
            let document = serde_json::to_value(vector)
                .map_err(|err| JsonStoreError::Invalid(err.to_string()))?;
            database.serialized_vectors.insert(vector.header.vector_id.to_string(), document);
        }
        self.write(&database)
    }

    /// Acquires the in-process file lock.
    fn lock(&self) -> Result<std::sync::MutexGuard<'_, ()>, JsonStoreError> {
        self.lock.lock().map_err(|_| JsonStoreError::Io("json store mutex poisoned".to_string()))
    }

    /// Reads the database; a missing file is an empty database.
    fn read(&self) -> Result<Database, JsonStoreError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Database::default()),
            Err(err) => {
                return Err(JsonStoreError::Io(format!("{}: {err}", self.path.display())));
            }
        };
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Database::default());
        }
        serde_json::from_slice(&bytes)
            .map_err(|err| JsonStoreError::Corrupt(format!("{}: {err}", self.path.display())))
    }

    /// Replaces the database file.
    fn write(&self, database: &Database) -> Result<(), JsonStoreError> {
        let payload = serde_json::to_vec_pretty(database)
            .map_err(|err| JsonStoreError::Invalid(err.to_string()))?;
        let mut staging = self.path.clone().into_os_string();
        staging.push(".tmp");
        let staging = PathBuf::from(staging);
        fs::write(&staging, payload)
            .map_err(|err| JsonStoreError::Io(format!("{}: {err}", staging.display())))?;
        fs::rename(&staging, &self.path)
            .map_err(|err| JsonStoreError::Io(format!("{}: {err}", self.path.display())))
    }
}

impl VectorStore for JsonFileStore {
    fn list_suites(&self, module: &ModuleName) -> Result<Vec<SuiteName>, StoreError> {
        let _guard = self.lock()?;
        let vectors = self.read()?.module_vectors(module)?;
        if vectors.is_empty() {
            return Err(StoreError::NotFound(format!(
                "no vectors for module {module} in {}",
                self.path.display()
            )));
        }
        let suites: BTreeSet<SuiteName> = vectors
            .into_iter()
            .filter(|vector| vector.status == VectorStatus::Current)
            .map(|vector| vector.header.suite_name)
            .collect();
        Ok(suites.into_iter().collect())
    }

    fn fetch_suite(
        &self,
        module: &ModuleName,
        suite: &SuiteName,
    ) -> Result<Vec<StoredVector>, StoreError> {
        let _guard = self.lock()?;
        let vectors = self.read()?.module_vectors(module)?;
        Ok(vectors
            .into_iter()
            .filter(|vector| {
                vector.status == VectorStatus::Current && vector.header.suite_name == *suite
            })
            .collect())
    }

    fn fetch_vector(
        &self,
        module: &ModuleName,
        vector_id: &VectorId,
    ) -> Result<Option<StoredVector>, StoreError> {
        let _guard = self.lock()?;
        let database = self.read()?;
        let Some(document) = database.serialized_vectors.get(vector_id.as_str()) else {
            return Ok(None);
        };
        let vector = StoredVector::from_document(vector_id.as_str(), document.clone())
            .map_err(|err| JsonStoreError::Corrupt(format!("vector {vector_id}: {err}")))?;
        Ok((vector.header.module_name == *module).then_some(vector))
    }
}

impl ResultStore for JsonFileStore {
    fn upsert_results(
        &self,
        module: &ModuleName,
        records: &[ResultRecord],
    ) -> Result<(), StoreError> {
        if records.is_empty() {
            return Ok(());
        }
        let _guard = self.lock()?;
        let mut database = self.read()?;
        for record in records {
            if record.header.module_name != *module {
                return Err(StoreError::Invalid(format!(
                    "result {} belongs to module {}, not {module}",
                    record.header.vector_id, record.header.module_name
                )));
            }
            let document = serde_json::to_value(record)
                .map_err(|err| JsonStoreError::Invalid(err.to_string()))?;
            database.results.insert(record.header.vector_id.to_string(), document);
        }
        Ok(self.write(&database)?)
    }

    fn query_results(
        &self,
        module: &ModuleName,
        suite: &SuiteName,
        status: Option<TestStatus>,
    ) -> Result<Vec<ResultRecord>, StoreError> {
        let _guard = self.lock()?;
        let records = self.read()?.module_results(module)?;
        Ok(records
            .into_iter()
            .filter(|record| record.header.suite_name == *suite)
            .filter(|record| status.is_none_or(|status| record.status == status))
            .collect())
    }

    fn results_for_vector(
        &self,
        module: &ModuleName,
        vector_id: &VectorId,
    ) -> Result<Vec<ResultRecord>, StoreError> {
        let _guard = self.lock()?;
        let database = self.read()?;
        let Some(document) = database.results.get(vector_id.as_str()) else {
            return Ok(Vec::new());
        };
        let record: ResultRecord = serde_json::from_value(document.clone())
            .map_err(|err| JsonStoreError::Corrupt(format!("result {vector_id}: {err}")))?;
        Ok(if record.header.module_name == *module { vec![record] } else { Vec::new() })
    }
}
