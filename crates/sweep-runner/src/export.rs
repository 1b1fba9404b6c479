// crates/sweep-runner/src/export.rs
// ============================================================================
// Module: Result Exporter
// Description: Merges vector headers with results and upserts them.
// Purpose: Make one suite's outcomes durable, keyed by vector identifier.
// Dependencies: sweep-core, thiserror
// ============================================================================

//! ## Overview
//! Export happens once per suite. Each result is paired with the header held
//! aside before execution, tagged with the run's source revision, and upserted
//! so a re-run replaces the previous record for the same vector.

// ============================================================================
// SECTION: Imports
// ============================================================================

use sweep_core::EventSink;
use sweep_core::ExecutionResult;
use sweep_core::HarnessEvent;
use sweep_core::ModuleName;
use sweep_core::ResultRecord;
use sweep_core::ResultStore;
use sweep_core::StoreError;
use sweep_core::VectorHeader;
use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Export failures.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Header and result counts differ.
    #[error("export mismatch: {headers} headers for {results} results")]
    CountMismatch {
        /// Number of headers.
        headers: usize,
        /// Number of results.
        results: usize,
    },
    /// Store rejected the upsert.
    #[error(transparent)]
    Store(#[from] StoreError),
}

// ============================================================================
// SECTION: Exporter
// ============================================================================

/// Writes result batches to a result store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultExporter {
    /// Source revision recorded on every result.
    git_hash: String,
}

impl ResultExporter {
    /// Creates an exporter tagging results with `git_hash`.
    #[must_use]
    pub fn new(git_hash: impl Into<String>) -> Self {
        Self {
            git_hash: git_hash.into(),
        }
    }

    /// Returns the recorded source revision.
    #[must_use]
    pub fn git_hash(&self) -> &str {
        &self.git_hash
    }

    /// Merges headers with results and upserts them; returns the count written.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::CountMismatch`] when the batches are misaligned
    /// and [`ExportError::Store`] when the upsert fails.
    pub fn export<S: ResultStore + ?Sized>(
        &self,
        store: &S,
        module: &ModuleName,
        headers: &[VectorHeader],
        results: Vec<ExecutionResult>,
        events: &dyn EventSink,
    ) -> Result<usize, ExportError> {
        if results.is_empty() {
            return Ok(0);
        }
        if headers.len() != results.len() {
            return Err(ExportError::CountMismatch {
                headers: headers.len(),
                results: results.len(),
            });
        }
        let records: Vec<ResultRecord> = headers
            .iter()
            .cloned()
            .zip(results)
            .map(|(header, result)| ResultRecord::merge(header, result, &self.git_hash))
            .collect();
        store.upsert_results(module, &records)?;
        let mut event = HarnessEvent::new("results_exported")
            .with_module(module)
            .with_count(records.len())
            .with_message(self.git_hash.clone());
        if let Some(first) = records.first() {
            event = event.with_suite(&first.header.suite_name);
        }
        events.record(&event);
        Ok(records.len())
    }
}
