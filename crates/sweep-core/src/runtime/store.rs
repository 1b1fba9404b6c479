// crates/sweep-core/src/runtime/store.rs
// ============================================================================
// Module: Sweep In-Memory Store
// Description: Simple in-memory vector and result store for tests and examples.
// Purpose: Provide a deterministic store implementation without external deps.
// Dependencies: crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! This module provides a simple in-memory implementation of
//! [`VectorStore`] and [`ResultStore`] for tests and local demos. Vectors
//! keep insertion order; results are keyed by vector identifier. It is not
//! intended for production use.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::Mutex;

use crate::core::ModuleName;
use crate::core::ResultRecord;
use crate::core::StoredVector;
use crate::core::SuiteName;
use crate::core::TestStatus;
use crate::core::VectorId;
use crate::core::VectorStatus;
use crate::interfaces::ResultStore;
use crate::interfaces::StoreError;
use crate::interfaces::VectorStore;

// ============================================================================
// SECTION: In-Memory Store
// ============================================================================

/// In-memory sweep store for tests and examples.
#[derive(Debug, Default, Clone)]
pub struct InMemorySweepStore {
    /// Vectors per module, in insertion order.
    vectors: Arc<Mutex<BTreeMap<ModuleName, Vec<StoredVector>>>>,
    /// Results per module, keyed by vector identifier.
    results: Arc<Mutex<BTreeMap<ModuleName, BTreeMap<VectorId, ResultRecord>>>>,
}

impl InMemorySweepStore {
    /// Creates an empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts vectors, replacing any existing vector with the same id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] when the store mutex is poisoned.
    pub fn insert_vectors(
        &self,
        vectors: impl IntoIterator<Item = StoredVector>,
    ) -> Result<(), StoreError> {
        let mut guard = self
            .vectors
            .lock()
            .map_err(|_| StoreError::Io("vector store mutex poisoned".to_string()))?;
        for vector in vectors {
            let entries = guard.entry(vector.header.module_name.clone()).or_default();
            match entries.iter_mut().find(|entry| entry.header.vector_id == vector.header.vector_id)
            {
                Some(existing) => *existing = vector,
                None => entries.push(vector),
            }
        }
        drop(guard);
        Ok(())
    }

    /// Returns the total number of stored results for a module.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] when the store mutex is poisoned.
    pub fn result_count(&self, module: &ModuleName) -> Result<usize, StoreError> {
        let guard = self
            .results
            .lock()
            .map_err(|_| StoreError::Io("result store mutex poisoned".to_string()))?;
        Ok(guard.get(module).map_or(0, BTreeMap::len))
    }
}

impl VectorStore for InMemorySweepStore {
    fn list_suites(&self, module: &ModuleName) -> Result<Vec<SuiteName>, StoreError> {
        let guard = self
            .vectors
            .lock()
            .map_err(|_| StoreError::Io("vector store mutex poisoned".to_string()))?;
        let Some(entries) = guard.get(module) else {
            return Err(StoreError::NotFound(format!("no vectors for module {module}")));
        };
        let suites: BTreeSet<SuiteName> = entries
            .iter()
            .filter(|vector| vector.status == VectorStatus::Current)
            .map(|vector| vector.header.suite_name.clone())
            .collect();
        Ok(suites.into_iter().collect())
    }

    fn fetch_suite(
        &self,
        module: &ModuleName,
        suite: &SuiteName,
    ) -> Result<Vec<StoredVector>, StoreError> {
        let guard = self
            .vectors
            .lock()
            .map_err(|_| StoreError::Io("vector store mutex poisoned".to_string()))?;
        Ok(guard
            .get(module)
            .map(|entries| {
                entries
                    .iter()
                    .filter(|vector| {
                        vector.status == VectorStatus::Current && vector.header.suite_name == *suite
                    })
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn fetch_vector(
        &self,
        module: &ModuleName,
        vector_id: &VectorId,
    ) -> Result<Option<StoredVector>, StoreError> {
        let guard = self
            .vectors
            .lock()
            .map_err(|_| StoreError::Io("vector store mutex poisoned".to_string()))?;
        Ok(guard.get(module).and_then(|entries| {
            entries.iter().find(|vector| vector.header.vector_id == *vector_id).cloned()
        }))
    }
}

impl ResultStore for InMemorySweepStore {
    fn upsert_results(
        &self,
        module: &ModuleName,
        records: &[ResultRecord],
    ) -> Result<(), StoreError> {
        let mut guard = self
            .results
            .lock()
            .map_err(|_| StoreError::Io("result store mutex poisoned".to_string()))?;
        let entries = guard.entry(module.clone()).or_default();
        for record in records {
            entries.remove(&record.header.vector_id);
            entries.insert(record.header.vector_id.clone(), record.clone());
        }
        drop(guard);
        Ok(())
    }

    fn query_results(
        &self,
        module: &ModuleName,
        suite: &SuiteName,
        status: Option<TestStatus>,
    ) -> Result<Vec<ResultRecord>, StoreError> {
        let guard = self
            .results
            .lock()
            .map_err(|_| StoreError::Io("result store mutex poisoned".to_string()))?;
        Ok(guard
            .get(module)
            .map(|entries| {
                entries
                    .values()
                    .filter(|record| record.header.suite_name == *suite)
                    .filter(|record| status.is_none_or(|status| record.status == status))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn results_for_vector(
        &self,
        module: &ModuleName,
        vector_id: &VectorId,
    ) -> Result<Vec<ResultRecord>, StoreError> {
        let guard = self
            .results
            .lock()
            .map_err(|_| StoreError::Io("result store mutex poisoned".to_string()))?;
        Ok(guard
            .get(module)
            .and_then(|entries| entries.get(vector_id))
            .cloned()
            .into_iter()
            .collect())
    }
}
