// crates/sweep-store-elastic/src/store.rs
// ============================================================================
// Module: Elastic Sweep Store
// Description: Vector and result store over the Elasticsearch REST API.
// Purpose: Fetch suites by query and upsert results keyed by vector id.
// Dependencies: sweep-core, reqwest, serde_json, thiserror
// ============================================================================

//! ## Overview
//! Vectors live in `<vector_index_prefix><module>` and results in
//! `<result_index_prefix><module>`. Suites are discovered with a terms
//! aggregation on `suite_name.keyword`; a suite is fetched with a bool query
//! on the current status and the suite name. Results are written with
//! `PUT _doc/<vector_id>` so a re-run replaces the prior record instead of
//! appending a duplicate. A missing index maps to [`StoreError::NotFound`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use reqwest::Method;
use reqwest::StatusCode;
use reqwest::Url;
use reqwest::blocking::Client;
use reqwest::blocking::RequestBuilder;
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use serde_json::Value;
use serde_json::json;
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
// SECTION: Settings
// ============================================================================

/// Connection settings for the document-search service.
#[derive(Debug, Clone)]
pub struct ElasticSettings {
    /// Base URL of the service.
    pub url: Url,
    /// Basic-auth credentials, when the service requires them.
    pub credentials: Option<(String, String)>,
    /// Vector index prefix.
    pub vector_index_prefix: String,
    /// Result index prefix.
    pub result_index_prefix: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Maximum hits requested per search.
    pub max_hits: usize,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Document-search store errors.
#[derive(Debug, Error)]
pub enum ElasticStoreError {
    /// Transport failure.
    #[error("elastic request failed: {0}")]
    Http(String),
    /// Index or document does not exist.
    #[error("elastic index not found: {0}")]
    NotFound(String),
    /// Service returned an error status.
    #[error("elastic returned status {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body.
        body: String,
    },
    /// Response body did not match the expected shape.
    #[error("elastic response decode failed: {0}")]
    Decode(String),
    /// Invalid request input.
    #[error("elastic invalid request: {0}")]
    Invalid(String),
}

impl From<ElasticStoreError> for StoreError {
    fn from(error: ElasticStoreError) -> Self {
        match error {
            ElasticStoreError::NotFound(message) => Self::NotFound(message),
            ElasticStoreError::Http(message) => Self::Io(message),
            ElasticStoreError::Decode(message) => Self::Corrupt(message),
            ElasticStoreError::Invalid(message) => Self::Invalid(message),
            ElasticStoreError::Status {
                ..
            } => Self::Backend(error.to_string()),
        }
    }
}

// ============================================================================
// SECTION: Response Shapes
// ============================================================================

/// Search response envelope.
#[derive(Debug, Deserialize)]
struct SearchResponse {
    /// Matching documents.
    #[serde(default)]
    hits: Hits,
    /// Aggregation results.
    #[serde(default)]
    aggregations: Option<Aggregations>,
}

/// Hit container.
#[derive(Debug, Default, Deserialize)]
struct Hits {
    /// Matching documents.
    #[serde(default)]
    hits: Vec<Hit>,
}

/// One matching document.
#[derive(Debug, Deserialize)]
struct Hit {
    /// Document identifier.
    #[serde(rename = "_id")]
    id: String,
    /// Document body.
    #[serde(rename = "_source")]
    source: Value,
}

/// Aggregation container for suite discovery.
#[derive(Debug, Deserialize)]
struct Aggregations {
    /// Terms aggregation on the suite name.
    suites: TermsAggregation,
}

/// Terms aggregation result.
#[derive(Debug, Deserialize)]
struct TermsAggregation {
    /// One bucket per distinct term.
    buckets: Vec<Bucket>,
}

/// Terms aggregation bucket.
#[derive(Debug, Deserialize)]
struct Bucket {
    /// Distinct term.
    key: String,
}

/// Single-document lookup response.
#[derive(Debug, Deserialize)]
struct GetResponse {
    /// Whether the document exists.
    #[serde(default)]
    found: bool,
    /// Document body.
    #[serde(rename = "_source", default)]
    source: Option<Value>,
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// Elasticsearch-backed sweep store.
#[derive(Debug, Clone)]
pub struct ElasticStore {
    /// Connection settings.
    settings: ElasticSettings,
    /// Blocking HTTP client.
    client: Client,
}

impl ElasticStore {
    /// Creates a store with the given settings.
    ///
    /// # Errors
    ///
    /// Returns [`ElasticStoreError`] when the HTTP client cannot be created
    /// or the URL cannot carry a path.
    pub fn new(settings: ElasticSettings) -> Result<Self, ElasticStoreError> {
        if settings.url.cannot_be_a_base() {
            return Err(ElasticStoreError::Invalid("elastic url cannot be a base".to_string()));
        }
        let client = Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|err| ElasticStoreError::Http(format!("http client build failed: {err}")))?;
        Ok(Self {
            settings,
            client,
        })
    }

    /// Returns the vector index name for a module.
    #[must_use]
    pub fn vector_index(&self, module: &ModuleName) -> String {
        format!("{}{module}", self.settings.vector_index_prefix)
    }

    /// Returns the result index name for a module.
    #[must_use]
    pub fn result_index(&self, module: &ModuleName) -> String {
        format!("{}{module}", self.settings.result_index_prefix)
    }

    /// Builds an endpoint URL from path segments.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ElasticStoreError> {
        let mut url = self.settings.url.clone();
        url.path_segments_mut()
            .map_err(|()| ElasticStoreError::Invalid("elastic url cannot be a base".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Starts a request with credentials applied.
    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match &self.settings.credentials {
            Some((username, password)) => builder.basic_auth(username, Some(password)),
            None => builder,
        }
    }

    /// Sends a request and returns the decoded JSON body.
    fn send(
        &self,
        builder: RequestBuilder,
        body: Option<&Value>,
        target: &str,
    ) -> Result<Value, ElasticStoreError> {
        let builder = match body {
            Some(body) => builder.header(CONTENT_TYPE, "application/json").body(
                serde_json::to_vec(body)
                    .map_err(|err| ElasticStoreError::Invalid(err.to_string()))?,
            ),
            None => builder,
        };
        let response = builder.send().map_err(|err| ElasticStoreError::Http(err.to_string()))?;
        let status = response.status();
        let bytes = response.bytes().map_err(|err| ElasticStoreError::Http(err.to_string()))?;
        if status == StatusCode::NOT_FOUND {
            return Err(ElasticStoreError::NotFound(target.to_string()));
        }
        if !status.is_success() {
            return Err(ElasticStoreError::Status {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&bytes).into_owned(),
            });
        }
        serde_json::from_slice(&bytes).map_err(|err| ElasticStoreError::Decode(err.to_string()))
    }

    /// Runs a search against an index.
    fn search(&self, index: &str, body: &Value) -> Result<SearchResponse, ElasticStoreError> {
        let url = self.endpoint(&[index, "_search"])?;
        let value = self.send(self.request(Method::POST, url), Some(body), index)?;
        serde_json::from_value(value).map_err(|err| ElasticStoreError::Decode(err.to_string()))
    }

    /// Fetches one document by id; absent documents and indices yield `None`.
    fn get_document(&self, index: &str, id: &str) -> Result<Option<Value>, ElasticStoreError> {
        let url = self.endpoint(&[index, "_doc", id])?;
        let value = match self.send(self.request(Method::GET, url), None, index) {
            Ok(value) => value,
            Err(ElasticStoreError::NotFound(_)) => return Ok(None),
            Err(err) => return Err(err),
        };
        let response: GetResponse =
            serde_json::from_value(value).map_err(|err| ElasticStoreError::Decode(err.to_string()))?;
        Ok(if response.found { response.source } else { None })
    }

    /// Query clause matching current vectors in either status spelling.
    fn current_status_clause() -> Value {
        json!({
            "bool": {
                "should": [
                    {"match": {"status": "CURRENT"}},
                    {"match": {"status": "VectorStatus.CURRENT"}}
                ],
                "minimum_should_match": 1
            }
        })
    }
}

/// Parses a vector document, attributing it to the index's module when the
/// body carries no module name.
fn parse_vector(
    module: &ModuleName,
    id: &str,
    mut source: Value,
) -> Result<StoredVector, ElasticStoreError> {
    if let Value::Object(map) = &mut source
        && !map.contains_key("module_name")
        && !map.contains_key("sweep_name")
    {
        map.insert("module_name".to_string(), Value::String(module.to_string()));
    }
    StoredVector::from_document(id, source)
        .map_err(|err| ElasticStoreError::Decode(format!("vector {id}: {err}")))
}

/// Parses a result document.
fn parse_result(id: &str, source: Value) -> Result<ResultRecord, ElasticStoreError> {
    serde_json::from_value(source)
        .map_err(|err| ElasticStoreError::Decode(format!("result {id}: {err}")))
}

impl VectorStore for ElasticStore {
    fn list_suites(&self, module: &ModuleName) -> Result<Vec<SuiteName>, StoreError> {
        let index = self.vector_index(module);
        let body = json!({
            "size": 0,
            "query": Self::current_status_clause(),
            "aggs": {
                "suites": {
                    "terms": {"field": "suite_name.keyword", "size": self.settings.max_hits}
                }
            }
        });
        let response = self.search(&index, &body)?;
        let mut suites: Vec<SuiteName> = response
            .aggregations
            .map(|aggregations| aggregations.suites.buckets)
            .unwrap_or_default()
            .into_iter()
            .map(|bucket| SuiteName::new(bucket.key))
            .collect();
        suites.sort();
        suites.dedup();
        Ok(suites)
    }

    fn fetch_suite(
        &self,
        module: &ModuleName,
        suite: &SuiteName,
    ) -> Result<Vec<StoredVector>, StoreError> {
        let index = self.vector_index(module);
        let body = json!({
            "size": self.settings.max_hits,
            "sort": ["_doc"],
            "query": {
                "bool": {
                    "must": [
                        Self::current_status_clause(),
                        {"match": {"suite_name.keyword": suite.as_str()}}
                    ]
                }
            }
        });
        let response = self.search(&index, &body)?;
        let mut vectors = Vec::with_capacity(response.hits.hits.len());
        for hit in response.hits.hits {
            let vector = parse_vector(module, &hit.id, hit.source)?;
            if vector.status == VectorStatus::Current && vector.header.suite_name == *suite {
                vectors.push(vector);
            }
        }
        Ok(vectors)
    }

    fn fetch_vector(
        &self,
        module: &ModuleName,
        vector_id: &VectorId,
    ) -> Result<Option<StoredVector>, StoreError> {
        let index = self.vector_index(module);
        let Some(source) = self.get_document(&index, vector_id.as_str())? else {
            return Ok(None);
        };
        Ok(Some(parse_vector(module, vector_id.as_str(), source)?))
    }
}

impl ResultStore for ElasticStore {
    fn upsert_results(
        &self,
        module: &ModuleName,
        records: &[ResultRecord],
    ) -> Result<(), StoreError> {
        let index = self.result_index(module);
        for record in records {
            let mut url =
                self.endpoint(&[index.as_str(), "_doc", record.header.vector_id.as_str()])?;
            url.set_query(Some("refresh=true"));
            let body = serde_json::to_value(record)
                .map_err(|err| ElasticStoreError::Invalid(err.to_string()))?;
            self.send(self.request(Method::PUT, url), Some(&body), &index)?;
        }
        Ok(())
    }

    fn query_results(
        &self,
        module: &ModuleName,
        suite: &SuiteName,
        status: Option<TestStatus>,
    ) -> Result<Vec<ResultRecord>, StoreError> {
        let index = self.result_index(module);
        let body = json!({
            "size": self.settings.max_hits,
            "query": {"match": {"suite_name.keyword": suite.as_str()}}
        });
        let response = match self.search(&index, &body) {
            Ok(response) => response,
            Err(ElasticStoreError::NotFound(_)) => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };
        let mut records = Vec::with_capacity(response.hits.hits.len());
        for hit in response.hits.hits {
            let record = parse_result(&hit.id, hit.source)?;
            if record.header.suite_name == *suite
                && status.is_none_or(|status| record.status == status)
            {
                records.push(record);
            }
        }
        Ok(records)
    }

    fn results_for_vector(
        &self,
        module: &ModuleName,
        vector_id: &VectorId,
    ) -> Result<Vec<ResultRecord>, StoreError> {
        let index = self.result_index(module);
        let Some(source) = self.get_document(&index, vector_id.as_str())? else {
            return Ok(Vec::new());
        };
        Ok(vec![parse_result(vector_id.as_str(), source)?])
    }
}
