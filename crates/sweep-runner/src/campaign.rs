// crates/sweep-runner/src/campaign.rs
// ============================================================================
// Module: Campaign Driver
// Description: Iterates modules and suites, executing and exporting each.
// Purpose: Keep a campaign moving when individual suites fail.
// Dependencies: sweep-core, thiserror, crate::{executor, export}
// ============================================================================

//! ## Overview
//! A campaign walks the selected modules in name order and, for each, the
//! store's suites in sorted order. Each suite is fetched, executed, and
//! exported as one batch. A suite that cannot be fetched or exported is
//! logged and counted; the campaign continues. Only an invalid selection or
//! an unknown module stops the campaign, and both are reported before
//! anything runs.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;

use sweep_core::EventSink;
use sweep_core::HarnessEvent;
use sweep_core::ModuleName;
use sweep_core::StoreError;
use sweep_core::SuiteName;
use sweep_core::SuiteVectors;
use sweep_core::SweepModule;
use sweep_core::SweepStore;
use sweep_core::TestStatus;
use sweep_core::VectorId;
use thiserror::Error;

use crate::executor::SuiteExecutor;
use crate::export::ResultExporter;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Suite name used when a single vector is run by identifier.
pub const SINGLE_VECTOR_SUITE: &str = "Single Vector";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Fatal campaign errors, raised before any execution.
#[derive(Debug, Error)]
pub enum CampaignError {
    /// Selection flags are inconsistent.
    #[error("invalid selection: {0}")]
    InvalidSelection(String),
    /// Requested module is not registered.
    #[error("sweep module not found: {0}")]
    ModuleNotFound(String),
}

// ============================================================================
// SECTION: Module Registry
// ============================================================================

/// Sweep modules known to the harness, ordered by name.
#[derive(Default, Clone)]
pub struct ModuleRegistry {
    /// Registered modules.
    modules: BTreeMap<ModuleName, Arc<dyn SweepModule>>,
}

impl ModuleRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a module, replacing any module with the same name.
    pub fn register(&mut self, module: Arc<dyn SweepModule>) {
        self.modules.insert(module.name().clone(), module);
    }

    /// Looks up a module by name.
    #[must_use]
    pub fn get(&self, name: &ModuleName) -> Option<&Arc<dyn SweepModule>> {
        self.modules.get(name)
    }

    /// Returns registered module names in order.
    pub fn names(&self) -> impl Iterator<Item = &ModuleName> {
        self.modules.keys()
    }

    /// Returns the number of registered modules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    /// Returns true when no module is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

// ============================================================================
// SECTION: Selection
// ============================================================================

/// Which modules, suites, or vector a campaign runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CampaignSelection {
    /// Restrict to one module.
    pub module: Option<ModuleName>,
    /// Restrict to one suite of the module.
    pub suite: Option<SuiteName>,
    /// Run a single vector of the module.
    pub vector_id: Option<VectorId>,
}

impl CampaignSelection {
    /// Checks that suite and vector filters name a module.
    ///
    /// # Errors
    ///
    /// Returns [`CampaignError::InvalidSelection`] when they do not.
    pub fn validate(&self) -> Result<(), CampaignError> {
        if self.module.is_none() && self.suite.is_some() {
            return Err(CampaignError::InvalidSelection(
                "a suite name requires a module name".to_string(),
            ));
        }
        if self.module.is_none() && self.vector_id.is_some() {
            return Err(CampaignError::InvalidSelection(
                "a vector id requires a module name".to_string(),
            ));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Summary
// ============================================================================

/// Campaign totals.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CampaignSummary {
    /// Suites executed.
    pub suites_run: usize,
    /// Suites that could not be fetched or exported.
    pub suites_failed: usize,
    /// Results produced.
    pub vectors_executed: usize,
    /// Results per status.
    pub status_counts: BTreeMap<TestStatus, usize>,
}

impl CampaignSummary {
    /// Returns the number of results with the given status.
    #[must_use]
    pub fn count(&self, status: TestStatus) -> usize {
        self.status_counts.get(&status).copied().unwrap_or(0)
    }

    /// Renders per-status totals as `STATUS=n` pairs.
    #[must_use]
    pub fn status_line(&self) -> String {
        self.status_counts
            .iter()
            .map(|(status, count)| format!("{status}={count}"))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

// ============================================================================
// SECTION: Driver
// ============================================================================

/// Drives a campaign over a store.
pub struct CampaignDriver<'a> {
    /// Vector and result store.
    store: &'a dyn SweepStore,
    /// Known modules.
    registry: &'a ModuleRegistry,
    /// Suite executor.
    executor: SuiteExecutor<'a>,
    /// Result exporter.
    exporter: ResultExporter,
    /// Event sink.
    events: &'a dyn EventSink,
}

impl<'a> CampaignDriver<'a> {
    /// Creates a driver.
    #[must_use]
    pub const fn new(
        store: &'a dyn SweepStore,
        registry: &'a ModuleRegistry,
        executor: SuiteExecutor<'a>,
        exporter: ResultExporter,
        events: &'a dyn EventSink,
    ) -> Self {
        Self {
            store,
            registry,
            executor,
            exporter,
            events,
        }
    }

    /// Runs the selected part of the campaign.
    ///
    /// # Errors
    ///
    /// Returns [`CampaignError`] for an invalid selection or unknown module;
    /// suite-level failures are logged and counted instead.
    pub fn run(&self, selection: &CampaignSelection) -> Result<CampaignSummary, CampaignError> {
        selection.validate()?;
        let modules: Vec<&Arc<dyn SweepModule>> = match &selection.module {
            Some(name) => vec![
                self.registry
                    .get(name)
                    .ok_or_else(|| CampaignError::ModuleNotFound(name.to_string()))?,
            ],
            None => self.registry.names().filter_map(|name| self.registry.get(name)).collect(),
        };
        self.events.record(&HarnessEvent::new("campaign_started").with_count(modules.len()));
        let mut summary = CampaignSummary::default();
        for module in modules {
            self.run_module(module.as_ref(), selection, &mut summary);
        }
        self.events.record(
            &HarnessEvent::new("campaign_completed")
                .with_count(summary.vectors_executed)
                .with_message(format!(
                    "suites_run={} suites_failed={} {}",
                    summary.suites_run,
                    summary.suites_failed,
                    summary.status_line()
                )),
        );
        Ok(summary)
    }

    /// Runs the selected suites of one module.
    fn run_module(
        &self,
        module: &dyn SweepModule,
        selection: &CampaignSelection,
        summary: &mut CampaignSummary,
    ) {
        let name = module.name();
        self.events.record(&HarnessEvent::new("module_started").with_module(name));
        if let Some(vector_id) = &selection.vector_id {
            let suite = SuiteName::new(SINGLE_VECTOR_SUITE);
            match self.store.fetch_vector(name, vector_id) {
                Ok(Some(vector)) => {
                    let vectors = SuiteVectors::from_stored(name.clone(), suite, vec![vector]);
                    self.run_suite(module, &vectors, summary);
                }
                Ok(None) => self.suite_failed(
                    name,
                    &suite,
                    format!("vector {vector_id} not found"),
                    summary,
                ),
                Err(err) => self.suite_failed(name, &suite, err.to_string(), summary),
            }
            return;
        }
        let suites = match &selection.suite {
            Some(suite) => vec![suite.clone()],
            None => match self.store.list_suites(name) {
                Ok(suites) => suites,
                Err(err) => {
                    let message = match err {
                        StoreError::NotFound(message) => message,
                        other => other.to_string(),
                    };
                    self.events.record(
                        &HarnessEvent::new("module_skipped").with_module(name).with_message(message),
                    );
                    return;
                }
            },
        };
        for suite in suites {
            match self.store.fetch_suite(name, &suite) {
                Ok(stored) => {
                    let vectors = SuiteVectors::from_stored(name.clone(), suite, stored);
                    self.run_suite(module, &vectors, summary);
                }
                Err(err) => self.suite_failed(name, &suite, err.to_string(), summary),
            }
        }
    }

    /// Executes and exports one suite.
    fn run_suite(
        &self,
        module: &dyn SweepModule,
        suite: &SuiteVectors,
        summary: &mut CampaignSummary,
    ) {
        self.events.record(
            &HarnessEvent::new("suite_started")
                .with_module(&suite.module)
                .with_suite(&suite.suite)
                .with_count(suite.len()),
        );
        let results = self.executor.execute(module, suite);
        summary.suites_run += 1;
        summary.vectors_executed += results.len();
        for result in &results {
            *summary.status_counts.entry(result.status).or_insert(0) += 1;
        }
        match self.exporter.export(self.store, &suite.module, &suite.headers, results, self.events)
        {
            Ok(count) => self.events.record(
                &HarnessEvent::new("suite_completed")
                    .with_module(&suite.module)
                    .with_suite(&suite.suite)
                    .with_count(count),
            ),
            Err(err) => self.suite_failed(&suite.module, &suite.suite, err.to_string(), summary),
        }
    }

    /// Logs and counts a failed suite.
    fn suite_failed(
        &self,
        module: &ModuleName,
        suite: &SuiteName,
        message: String,
        summary: &mut CampaignSummary,
    ) {
        summary.suites_failed += 1;
        self.events.record(
            &HarnessEvent::new("suite_failed")
                .with_module(module)
                .with_suite(suite)
                .with_message(message),
        );
    }
}
