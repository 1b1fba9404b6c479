// crates/sweep-store-elastic/tests/elastic_store.rs
// ============================================================================
// Module: Elastic Store Tests
// Description: Exercises the document-search backend against a fake server.
// Purpose: Validate query shapes, index naming, and error mapping.
// Dependencies: sweep-store-elastic, sweep-core, tiny_http
// ============================================================================

//! ## Overview
//! Each test starts a local `tiny_http` server that answers a scripted
//! sequence of responses and captures the requests it received.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only panic-based assertions are permitted."
)]

use std::io::Read;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use reqwest::Url;
use serde_json::Value;
use serde_json::json;
use sweep_core::ModuleName;
use sweep_core::ResultRecord;
use sweep_core::ResultStore;
use sweep_core::StoreError;
use sweep_core::SuiteName;
use sweep_core::TestStatus;
use sweep_core::VectorHeader;
use sweep_core::VectorId;
use sweep_core::VectorStore;
use sweep_store_elastic::ElasticSettings;
use sweep_store_elastic::ElasticStore;
use tiny_http::Header;
use tiny_http::Response;
use tiny_http::Server;
use tiny_http::StatusCode;

// ============================================================================
// SECTION: Test Helpers
// ============================================================================

/// Request captured by the fake server.
#[derive(Debug)]
struct Captured {
    method: String,
    url: String,
    body: String,
    authorization: Option<String>,
}

/// Starts a server answering each request with the next scripted response.
fn spawn_server(
    script: Vec<(u16, Value)>,
) -> (ElasticStore, mpsc::Receiver<Captured>, thread::JoinHandle<()>) {
    let server = Server::http("127.0.0.1:0").unwrap();
    let addr = server.server_addr().to_ip().unwrap();
    let (tx, rx) = mpsc::channel();
    let handle = thread::spawn(move || {
        for (status, body) in script {
            let Ok(mut request) = server.recv() else {
                return;
            };
            let mut text = String::new();
            let _ = request.as_reader().read_to_string(&mut text);
            let authorization = request
                .headers()
                .iter()
                .find(|header| header.field.equiv("Authorization"))
                .map(|header| header.value.as_str().to_string());
            let _ = tx.send(Captured {
                method: request.method().to_string(),
                url: request.url().to_string(),
                body: text,
                authorization,
            });
            let response = Response::from_string(body.to_string())
                .with_status_code(StatusCode(status))
                .with_header(Header::from_bytes("Content-Type", "application/json").unwrap());
            let _ = request.respond(response);
        }
    });
    let store = ElasticStore::new(ElasticSettings {
        url: Url::parse(&format!("http://{addr}")).unwrap(),
        credentials: Some(("sweeper".to_string(), "secret".to_string())),
        vector_index_prefix: "ttnn_sweeps_test_vectors_".to_string(),
        result_index_prefix: "ttnn_sweeps_test_results_".to_string(),
        timeout: Duration::from_secs(5),
        max_hits: 10_000,
    })
    .unwrap();
    (store, rx, handle)
}

fn record(id: &str) -> ResultRecord {
    ResultRecord {
        header: VectorHeader {
            module_name: ModuleName::from("eltwise.add"),
            suite_name: SuiteName::from("nightly"),
            vector_id: VectorId::from(id),
        },
        status: TestStatus::Pass,
        message: "ok".to_string(),
        e2e_perf: Some(1.25),
        timestamp: "2026-01-01_00-00-00".to_string(),
        host: "host".to_string(),
        user: "user".to_string(),
        git_hash: "abc1234".to_string(),
    }
}

// ============================================================================
// SECTION: Vector Queries
// ============================================================================

#[test]
fn list_suites_uses_terms_aggregation() {
    let (store, rx, handle) = spawn_server(vec![(
        200,
        json!({
            "hits": {"hits": []},
            "aggregations": {"suites": {"buckets": [
                {"key": "zeta", "doc_count": 3},
                {"key": "alpha", "doc_count": 1}
            ]}}
        }),
    )]);
    let suites = store.list_suites(&ModuleName::from("eltwise.add")).unwrap();
    assert_eq!(suites, vec![SuiteName::from("alpha"), SuiteName::from("zeta")]);

    let captured = rx.recv().unwrap();
    assert_eq!(captured.method, "POST");
    assert_eq!(captured.url, "/ttnn_sweeps_test_vectors_eltwise.add/_search");
    assert!(captured.authorization.unwrap().starts_with("Basic "));
    let body: Value = serde_json::from_str(&captured.body).unwrap();
    assert_eq!(body["aggs"]["suites"]["terms"]["field"], "suite_name.keyword");
    assert_eq!(body["aggs"]["suites"]["terms"]["size"], 10_000);
    handle.join().unwrap();
}

#[test]
fn missing_index_maps_to_not_found() {
    let (store, _rx, handle) = spawn_server(vec![(
        404,
        json!({"error": {"type": "index_not_found_exception"}, "status": 404}),
    )]);
    let err = store.list_suites(&ModuleName::from("absent")).unwrap_err();
    assert!(matches!(err, StoreError::NotFound(_)));
    handle.join().unwrap();
}

#[test]
fn fetch_suite_fills_ids_from_hits() {
    let (store, rx, handle) = spawn_server(vec![(
        200,
        json!({"hits": {"hits": [
            {"_id": "v1", "_source": {
                "sweep_name": "eltwise.add",
                "suite_name": "nightly",
                "validity": "VectorValidity.VALID",
                "status": "VectorStatus.CURRENT",
                "shape": [1, 32]
            }},
            {"_id": "v2", "_source": {
                "suite_name": "nightly",
                "validity": "VectorValidity.INVALID",
                "invalid_reason": "unsupported shape",
                "status": "VectorStatus.CURRENT"
            }}
        ]}}),
    )]);
    let module = ModuleName::from("eltwise.add");
    let vectors = store.fetch_suite(&module, &SuiteName::from("nightly")).unwrap();
    assert_eq!(vectors.len(), 2);
    assert_eq!(vectors[0].header.vector_id.as_str(), "v1");
    assert_eq!(vectors[1].header.module_name, module);
    assert_eq!(vectors[1].invalid_reason.as_deref(), Some("unsupported shape"));

    let captured = rx.recv().unwrap();
    let body: Value = serde_json::from_str(&captured.body).unwrap();
    let must = body["query"]["bool"]["must"].as_array().unwrap();
    assert_eq!(must[1]["match"]["suite_name.keyword"], "nightly");
    handle.join().unwrap();
}

#[test]
fn fetch_vector_treats_missing_document_as_none() {
    let (store, rx, handle) =
        spawn_server(vec![(404, json!({"_id": "nope", "found": false}))]);
    let found = store.fetch_vector(&ModuleName::from("m"), &VectorId::from("nope")).unwrap();
    assert!(found.is_none());
    assert_eq!(rx.recv().unwrap().url, "/ttnn_sweeps_test_vectors_m/_doc/nope");
    handle.join().unwrap();
}

// ============================================================================
// SECTION: Result Writes
// ============================================================================

#[test]
fn upsert_puts_each_record_by_vector_id() {
    let (store, rx, handle) = spawn_server(vec![
        (201, json!({"result": "created"})),
        (200, json!({"result": "updated"})),
    ]);
    store.upsert_results(&ModuleName::from("eltwise.add"), &[record("v1"), record("v2")]).unwrap();
    let first = rx.recv().unwrap();
    assert_eq!(first.method, "PUT");
    assert_eq!(first.url, "/ttnn_sweeps_test_results_eltwise.add/_doc/v1?refresh=true");
    let body: Value = serde_json::from_str(&first.body).unwrap();
    assert_eq!(body["status"], "PASS");
    assert_eq!(body["git_hash"], "abc1234");
    let second = rx.recv().unwrap();
    assert_eq!(second.url, "/ttnn_sweeps_test_results_eltwise.add/_doc/v2?refresh=true");
    handle.join().unwrap();
}

#[test]
fn server_errors_surface_as_backend_errors() {
    let (store, _rx, handle) = spawn_server(vec![(500, json!({"error": "boom"}))]);
    let err = store.upsert_results(&ModuleName::from("m"), &[record("v1")]).unwrap_err();
    assert!(matches!(err, StoreError::Backend(_)));
    handle.join().unwrap();
}

#[test]
fn query_results_filters_status_client_side() {
    let mut failing = serde_json::to_value(record("v2")).unwrap();
    failing["status"] = json!("TestStatus.FAIL_CRASH_HANG");
    let (store, _rx, handle) = spawn_server(vec![(
        200,
        json!({"hits": {"hits": [
            {"_id": "v1", "_source": serde_json::to_value(record("v1")).unwrap()},
            {"_id": "v2", "_source": failing}
        ]}}),
    )]);
    let records = store
        .query_results(
            &ModuleName::from("eltwise.add"),
            &SuiteName::from("nightly"),
            Some(TestStatus::FailCrashHang),
        )
        .unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].header.vector_id.as_str(), "v2");
    handle.join().unwrap();
}

#[test]
fn query_results_on_missing_index_is_empty() {
    let (store, _rx, handle) = spawn_server(vec![(404, json!({"status": 404}))]);
    let records =
        store.query_results(&ModuleName::from("m"), &SuiteName::from("s"), None).unwrap();
    assert!(records.is_empty());
    handle.join().unwrap();
}
