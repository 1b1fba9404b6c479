// crates/sweep-runner/tests/campaign.rs
// ============================================================================
// Module: Campaign Driver Tests
// Description: Selection rules, suite iteration, and idempotent export.
// ============================================================================
//! ## Overview
//! Runs [`sweep_runner::CampaignDriver`] over an in-memory store with
//! scripted workers and checks what ends up stored.

#![allow(clippy::unwrap_used, reason = "Tests use unwrap on deterministic fixtures.")]

mod support;

use std::sync::Arc;
use std::time::Duration;

use sweep_core::ExecutionResult;
use sweep_core::InMemorySweepStore;
use sweep_core::MemoryEventSink;
use sweep_core::ModuleName;
use sweep_core::ResultStore;
use sweep_core::SuiteName;
use sweep_core::TestStatus;
use sweep_core::VectorHeader;
use sweep_core::VectorId;
use sweep_runner::CampaignDriver;
use sweep_runner::CampaignError;
use sweep_runner::CampaignSelection;
use sweep_runner::ExecutorOptions;
use sweep_runner::ExportError;
use sweep_runner::HostContext;
use sweep_runner::ModuleRegistry;
use sweep_runner::ResultExporter;
use sweep_runner::SINGLE_VECTOR_SUITE;
use sweep_runner::SuiteExecutor;

use support::RecordingReset;
use support::ScriptedModule;
use support::ScriptedSpawner;
use support::invalid;
use support::valid;

type TestResult = Result<(), String>;

struct Fixture {
    store: InMemorySweepStore,
    registry: ModuleRegistry,
    spawner: ScriptedSpawner,
    reset: RecordingReset,
    events: MemoryEventSink,
    host: HostContext,
}

impl Fixture {
    fn new() -> Self {
        let store = InMemorySweepStore::new();
        store
            .insert_vectors([
                valid("eltwise.add", "nightly", "a1", "pass"),
                invalid("eltwise.add", "nightly", "a2", "unsupported shape"),
                valid("eltwise.add", "nightly", "a3", "hang"),
                valid("eltwise.add", "smoke", "a4", "pass"),
                valid("matmul", "nightly", "m1", "fail"),
                valid("matmul", "nightly", "m2", "pass"),
            ])
            .unwrap();
        let mut registry = ModuleRegistry::new();
        registry.register(Arc::new(ScriptedModule::new("eltwise.add")));
        registry.register(Arc::new(ScriptedModule::new("matmul")));
        registry.register(Arc::new(ScriptedModule::new("conv2d")));
        Self {
            store,
            registry,
            spawner: ScriptedSpawner::default(),
            reset: RecordingReset::default(),
            events: MemoryEventSink::new(),
            host: HostContext::new("bench-01", "sweeper"),
        }
    }

    fn driver(&self, options: ExecutorOptions) -> CampaignDriver<'_> {
        let executor =
            SuiteExecutor::new(&self.spawner, &self.reset, &self.events, &self.host, options);
        CampaignDriver::new(
            &self.store,
            &self.registry,
            executor,
            ResultExporter::new("abc1234"),
            &self.events,
        )
    }
}

fn options() -> ExecutorOptions {
    ExecutorOptions {
        default_timeout: Duration::from_secs(2),
        ..ExecutorOptions::default()
    }
}

#[test]
fn full_campaign_runs_every_suite_and_skips_empty_modules() -> TestResult {
    let fixture = Fixture::new();

    let summary =
        fixture.driver(options()).run(&CampaignSelection::default()).map_err(|e| e.to_string())?;

    assert_eq!(summary.suites_run, 3);
    assert_eq!(summary.suites_failed, 0);
    assert_eq!(summary.vectors_executed, 6);
    assert_eq!(summary.count(TestStatus::Pass), 3);
    assert_eq!(summary.count(TestStatus::NotRun), 1);
    assert_eq!(summary.count(TestStatus::FailCrashHang), 1);
    assert_eq!(summary.count(TestStatus::FailAssertException), 1);
    assert_eq!(fixture.events.count("module_skipped"), 1);
    assert_eq!(fixture.reset.count(), 1);
    assert_eq!(fixture.store.result_count(&ModuleName::from("eltwise.add")).unwrap(), 4);
    assert_eq!(fixture.store.result_count(&ModuleName::from("matmul")).unwrap(), 2);
    Ok(())
}

#[test]
fn stored_results_carry_headers_and_provenance() -> TestResult {
    let fixture = Fixture::new();
    let selection = CampaignSelection {
        module: Some(ModuleName::from("eltwise.add")),
        suite: Some(SuiteName::from("nightly")),
        vector_id: None,
    };

    fixture.driver(options()).run(&selection).map_err(|e| e.to_string())?;

    let records = fixture
        .store
        .query_results(&ModuleName::from("eltwise.add"), &SuiteName::from("nightly"), None)
        .map_err(|e| e.to_string())?;
    assert_eq!(records.len(), 3);
    let not_run = records
        .iter()
        .find(|record| record.header.vector_id == VectorId::from("a2"))
        .ok_or("a2 missing")?;
    assert_eq!(not_run.status, TestStatus::NotRun);
    assert_eq!(not_run.message, "unsupported shape");
    assert!(records.iter().all(|record| record.git_hash == "abc1234"));
    assert!(records.iter().all(|record| record.host == "bench-01"));
    Ok(())
}

#[test]
fn rerun_replaces_previous_results() -> TestResult {
    let fixture = Fixture::new();
    let selection = CampaignSelection {
        module: Some(ModuleName::from("matmul")),
        ..CampaignSelection::default()
    };

    fixture.driver(options()).run(&selection).map_err(|e| e.to_string())?;
    fixture.driver(options()).run(&selection).map_err(|e| e.to_string())?;

    let records = fixture
        .store
        .results_for_vector(&ModuleName::from("matmul"), &VectorId::from("m1"))
        .map_err(|e| e.to_string())?;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].status, TestStatus::FailAssertException);
    Ok(())
}

#[test]
fn single_vector_runs_in_process_under_its_own_suite_name() -> TestResult {
    let fixture = Fixture::new();
    let selection = CampaignSelection {
        module: Some(ModuleName::from("eltwise.add")),
        suite: None,
        vector_id: Some(VectorId::from("a1")),
    };

    let summary = fixture.driver(options()).run(&selection).map_err(|e| e.to_string())?;

    assert_eq!(summary.vectors_executed, 1);
    assert_eq!(fixture.spawner.counts().0, 0);
    let started = fixture
        .events
        .events()
        .into_iter()
        .find(|event| event.event == "suite_started")
        .ok_or("suite_started missing")?;
    assert_eq!(started.suite.as_deref(), Some(SINGLE_VECTOR_SUITE));
    let records = fixture
        .store
        .results_for_vector(&ModuleName::from("eltwise.add"), &VectorId::from("a1"))
        .map_err(|e| e.to_string())?;
    assert_eq!(records[0].header.suite_name, SuiteName::from("nightly"));
    Ok(())
}

#[test]
fn missing_vector_is_a_suite_failure_not_a_campaign_failure() -> TestResult {
    let fixture = Fixture::new();
    let selection = CampaignSelection {
        module: Some(ModuleName::from("eltwise.add")),
        suite: None,
        vector_id: Some(VectorId::from("nope")),
    };

    let summary = fixture.driver(options()).run(&selection).map_err(|e| e.to_string())?;

    assert_eq!(summary.suites_failed, 1);
    assert_eq!(summary.vectors_executed, 0);
    assert_eq!(fixture.events.count("suite_failed"), 1);
    Ok(())
}

#[test]
fn unknown_module_fails_before_execution() {
    let fixture = Fixture::new();
    let selection = CampaignSelection {
        module: Some(ModuleName::from("softmax")),
        ..CampaignSelection::default()
    };

    let err = fixture.driver(options()).run(&selection).unwrap_err();

    assert!(matches!(err, CampaignError::ModuleNotFound(name) if name == "softmax"));
    assert_eq!(fixture.events.count("campaign_started"), 0);
}

#[test]
fn suite_or_vector_without_module_is_rejected() {
    let suite_only = CampaignSelection {
        suite: Some(SuiteName::from("nightly")),
        ..CampaignSelection::default()
    };
    let vector_only = CampaignSelection {
        vector_id: Some(VectorId::from("a1")),
        ..CampaignSelection::default()
    };

    assert!(matches!(suite_only.validate(), Err(CampaignError::InvalidSelection(_))));
    assert!(matches!(vector_only.validate(), Err(CampaignError::InvalidSelection(_))));
    assert!(CampaignSelection::default().validate().is_ok());
}

#[test]
fn dry_run_stores_nothing() -> TestResult {
    let fixture = Fixture::new();
    let dry = ExecutorOptions {
        dry_run: true,
        ..options()
    };

    let summary =
        fixture.driver(dry).run(&CampaignSelection::default()).map_err(|e| e.to_string())?;

    assert_eq!(summary.vectors_executed, 0);
    assert_eq!(fixture.store.result_count(&ModuleName::from("eltwise.add")).unwrap(), 0);
    assert_eq!(fixture.events.count("dry_run_vector"), 6);
    assert_eq!(fixture.events.count("results_exported"), 0);
    Ok(())
}

#[test]
fn exporter_rejects_misaligned_batches() {
    let store = InMemorySweepStore::new();
    let events = MemoryEventSink::new();
    let header = VectorHeader {
        module_name: ModuleName::from("matmul"),
        suite_name: SuiteName::from("nightly"),
        vector_id: VectorId::from("m1"),
    };
    let result = ExecutionResult {
        status: TestStatus::Pass,
        message: String::new(),
        e2e_perf: None,
        timestamp: "2026-01-01_00-00-00".to_string(),
        host: "h".to_string(),
        user: "u".to_string(),
    };
    let exporter = ResultExporter::new("abc1234");
    let module = ModuleName::from("matmul");

    let err = exporter
        .export(&store, &module, &[header.clone(), header], vec![result], &events)
        .unwrap_err();
    let empty = exporter.export(&store, &module, &[], Vec::new(), &events).unwrap();

    assert!(matches!(err, ExportError::CountMismatch { headers: 2, results: 1 }));
    assert_eq!(empty, 0);
    assert_eq!(events.count("results_exported"), 0);
}
