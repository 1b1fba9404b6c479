// crates/sweep-core/src/core/vector.rs
// ============================================================================
// Module: Sweep Test Vectors
// Description: Stored vector documents, headers, and executable parameters.
// Purpose: Separate vector identity from the parameters handed to devices.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! A [`StoredVector`] is the document persisted by a vector store: identity
//! header, validity metadata, lifecycle status, and the flattened parameter
//! mapping. Before execution the header is stripped off into a
//! [`VectorHeader`] and the remainder becomes a [`TestVector`]; the header is
//! re-attached when results are exported.
//!
//! Enum values accept the legacy `VectorValidity.VALID` /
//! `VectorStatus.CURRENT` spellings written by older generators.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::core::identifiers::ModuleName;
use crate::core::identifiers::SuiteName;
use crate::core::identifiers::VectorId;

// ============================================================================
// SECTION: Enumerations
// ============================================================================

/// Named parameter mapping for one test invocation.
pub type VectorParams = BTreeMap<String, Value>;

/// Validity tag assigned by the vector generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VectorValidity {
    /// Vector may be executed.
    #[serde(alias = "VectorValidity.VALID")]
    Valid,
    /// Vector is known unsupported and must not reach a device.
    #[serde(alias = "VectorValidity.INVALID")]
    Invalid,
}

/// Lifecycle status of a stored vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VectorStatus {
    /// Vector belongs to the active generation.
    #[default]
    #[serde(alias = "VectorStatus.CURRENT")]
    Current,
    /// Vector was superseded by a newer generation.
    #[serde(alias = "VectorStatus.ARCHIVED")]
    Archived,
}

// ============================================================================
// SECTION: Vector Documents
// ============================================================================

/// Identity fields of a vector, re-attached to results on export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VectorHeader {
    /// Sweep module that owns the vector.
    #[serde(alias = "sweep_name")]
    pub module_name: ModuleName,
    /// Suite the vector belongs to.
    pub suite_name: SuiteName,
    /// Vector identifier (store key).
    pub vector_id: VectorId,
}

/// Vector document as persisted by a vector store.
///
/// # Invariants
/// - `header` is declared before `params` so flattened identity fields are
///   never captured as parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredVector {
    /// Identity header.
    #[serde(flatten)]
    pub header: VectorHeader,
    /// Generation timestamp written by the generator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    /// Validity tag.
    pub validity: VectorValidity,
    /// Reason the vector is invalid, when it is.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invalid_reason: Option<String>,
    /// Lifecycle status.
    #[serde(default)]
    pub status: VectorStatus,
    /// Remaining fields are the operation parameters.
    #[serde(flatten)]
    pub params: VectorParams,
}

impl StoredVector {
    /// Splits the document into its header and executable vector.
    #[must_use]
    pub fn into_parts(self) -> (VectorHeader, TestVector) {
        (
            self.header,
            TestVector {
                params: self.params,
                validity: self.validity,
                invalid_reason: self.invalid_reason,
            },
        )
    }

    /// Parses a stored document, filling `vector_id` from the store key when
    /// the document body does not carry it and normalizing the legacy
    /// `sweep_name` key.
    ///
    /// # Errors
    ///
    /// Returns [`serde_json::Error`] when the document does not match the
    /// stored vector shape.
    pub fn from_document(id: &str, mut document: Value) -> Result<Self, serde_json::Error> {
        if let Value::Object(map) = &mut document {
            map.entry("vector_id").or_insert_with(|| Value::String(id.to_string()));
            if let Some(name) = map.remove("sweep_name") {
                map.entry("module_name").or_insert(name);
            }
        }
        serde_json::from_value(document)
    }
}

/// Executable portion of a vector, with identity stripped.
#[derive(Debug, Clone, PartialEq)]
pub struct TestVector {
    /// Operation parameters.
    pub params: VectorParams,
    /// Validity tag.
    pub validity: VectorValidity,
    /// Reason the vector is invalid, when it is.
    pub invalid_reason: Option<String>,
}

impl TestVector {
    /// Returns true when the vector may be sent to a device.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.validity == VectorValidity::Valid
    }
}

/// Ordered vectors of one suite with their headers held aside.
///
/// # Invariants
/// - `headers[i]` identifies `vectors[i]`.
#[derive(Debug, Clone, PartialEq)]
pub struct SuiteVectors {
    /// Module the suite belongs to.
    pub module: ModuleName,
    /// Suite name.
    pub suite: SuiteName,
    /// Stripped identity headers, in execution order.
    pub headers: Vec<VectorHeader>,
    /// Executable vectors, in execution order.
    pub vectors: Vec<TestVector>,
}

impl SuiteVectors {
    /// Builds a suite from stored documents, preserving their order.
    #[must_use]
    pub fn from_stored(module: ModuleName, suite: SuiteName, stored: Vec<StoredVector>) -> Self {
        let (headers, vectors) = stored.into_iter().map(StoredVector::into_parts).unzip();
        Self {
            module,
            suite,
            headers,
            vectors,
        }
    }

    /// Returns the number of vectors in the suite.
    #[must_use]
    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    /// Returns true when the suite has no vectors.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }
}
