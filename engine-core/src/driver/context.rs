// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! [`DriverContext`]: the per-worker, per-package state machine that loads a
//! test binary, locates its framework, and dispatches the five driver
//! operations to it (spec §3, §4.G).

use super::adapter::{resolve_adapter, FrameworkAdapter, LoadFailure, ProgressSink};
use crate::binary_inspector::BinaryReport;
use crate::errors::DriverError;
use crate::package::SettingValue;
use camino::Utf8Path;
use std::collections::BTreeMap;
use tracing::instrument;

/// A `DriverContext`'s position in its lifecycle (spec §3: `Unloaded,
/// Loaded, Running, Stopped`).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DriverState {
    /// No binary has been loaded yet. Only `Load` is valid.
    Unloaded,
    /// A binary is loaded and its framework adapter resolved. No run is in
    /// flight.
    Loaded,
    /// A `Run` is currently in flight.
    Running,
    /// `StopRun(false)` has been acknowledged; the context is done.
    Stopped,
}

/// Per-worker, per-package driver state (spec §3 `DriverContext`): owns the
/// one [`FrameworkAdapter`] this worker ever loads (spec §4.G: "at-most-one
/// driver per worker").
pub struct DriverContext {
    state: DriverState,
    adapter: Option<Box<dyn FrameworkAdapter>>,
    /// The XML test tree `Load` returned, cached so the filter-excludes
    /// shortcut can report an accurate total without re-invoking the
    /// framework (spec §4.G).
    loaded_tree_xml: Option<String>,
    display_name: String,
}

impl DriverContext {
    /// Creates a fresh, `Unloaded` context. `display_name` is used as the
    /// run name on the filter-excludes shortcut's synthetic report.
    pub fn new(display_name: impl Into<String>) -> Self {
        Self {
            state: DriverState::Unloaded,
            adapter: None,
            loaded_tree_xml: None,
            display_name: display_name.into(),
        }
    }

    /// This context's current lifecycle position.
    pub fn state(&self) -> DriverState {
        self.state
    }

    /// `Load(binaryPath, settings)` (spec §4.G): inspects `report`'s
    /// referenced assemblies to resolve a [`FrameworkAdapter`], then asks it
    /// to load the binary and returns the resulting test tree XML.
    ///
    /// The binary itself is assumed already inspected (`BadBinary` and
    /// `UnsupportedPlatform` are [`crate::binary_inspector`] failures,
    /// surfaced before a `DriverContext` is ever involved); this operation
    /// only has the driver-level failure modes `FrameworkNotFound` and
    /// `IncompatibleFramework`.
    #[instrument(skip(self, report, settings), fields(binary = %report.path))]
    pub fn load(
        &mut self,
        report: &BinaryReport,
        settings: BTreeMap<String, SettingValue>,
    ) -> Result<String, DriverError> {
        let binary_dir = report.path.parent().unwrap_or_else(|| Utf8Path::new("."));
        let adapter = resolve_adapter(binary_dir, &report.referenced_assemblies)?;
        let framework = adapter.framework_name().to_string();

        let tree_xml = adapter.load(&report.path, &settings).map_err(|failure| match failure {
            LoadFailure::Incompatible(reason) => DriverError::IncompatibleFramework { framework: framework.clone(), reason },
            LoadFailure::Failed(cause) => DriverError::FrameworkFailure {
                framework: framework.clone(),
                operation: "Load",
                cause,
            },
        })?;

        self.loaded_tree_xml = Some(tree_xml.clone());
        self.adapter = Some(adapter);
        self.state = DriverState::Loaded;
        Ok(tree_xml)
    }

    /// `CountTestCases(filter)` (spec §4.G).
    pub fn count_test_cases(&self, filter_xml: &str) -> Result<usize, DriverError> {
        let adapter = self.require_loaded()?;
        adapter.count_test_cases(filter_xml).map_err(|cause| self.framework_failure("CountTestCases", cause))
    }

    /// `Explore(filter)` (spec §4.G).
    pub fn explore(&self, filter_xml: &str) -> Result<String, DriverError> {
        let adapter = self.require_loaded()?;
        adapter.explore(filter_xml).map_err(|cause| self.framework_failure("Explore", cause))
    }

    /// `Run(listener, filter)` (spec §4.G). `progress` plays the role of the
    /// listener, receiving each progress payload the framework produces
    /// before the final result XML is returned.
    ///
    /// If `filter` excludes every test in the binary, the framework is never
    /// invoked at all: a synthetic all-skipped report is built and returned
    /// directly (spec §4.G's filter-excludes shortcut), sized against the
    /// test count cached from `Load`.
    #[instrument(skip(self, filter, progress))]
    pub async fn run(&mut self, filter: &engine_filter::Filter, progress: ProgressSink) -> Result<String, DriverError> {
        self.require_loaded()?;

        if filter.excludes_everything() {
            let total = self
                .loaded_tree_xml
                .as_deref()
                .map(|xml| engine_xml::count_test_cases(xml).unwrap_or(0))
                .unwrap_or(0);
            let report = engine_xml::RunReport::all_skipped(self.display_name.clone(), total as u32, "excluded by filter");
            return Ok(report.to_string().expect("serializing a freshly built report never fails"));
        }

        let filter_xml = filter.to_xml().map_err(|err| DriverError::FrameworkFailure {
            framework: self.framework_name().unwrap_or("unknown").to_string(),
            operation: "Run",
            cause: err.to_string(),
        })?;

        self.state = DriverState::Running;
        let adapter = self.adapter.as_ref().expect("checked by require_loaded above").as_ref();
        let result = adapter.run(&filter_xml, progress).await;
        self.state = DriverState::Loaded;

        result.map_err(|cause| self.framework_failure("Run", cause))
    }

    /// `StopRun(force)` (spec §4.G, §8 boundary scenario 5). `force = true`
    /// is rejected outright: the Agency implements it by killing the worker
    /// process, never through this cooperative path.
    pub fn stop_run(&mut self, force: bool) -> Result<(), DriverError> {
        if force {
            return Err(DriverError::ForceStopNotSupported);
        }
        let adapter = self.require_loaded()?;
        adapter.stop_run().map_err(|cause| self.framework_failure("StopRun", cause))?;
        self.state = DriverState::Stopped;
        Ok(())
    }

    fn require_loaded(&self) -> Result<&dyn FrameworkAdapter, DriverError> {
        self.adapter.as_deref().ok_or(DriverError::NotLoaded)
    }

    fn framework_name(&self) -> Option<&str> {
        self.adapter.as_deref().map(FrameworkAdapter::framework_name)
    }

    fn framework_failure(&self, operation: &'static str, cause: String) -> DriverError {
        DriverError::FrameworkFailure {
            framework: self.framework_name().unwrap_or("unknown").to_string(),
            operation,
            cause,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::adapter::test_double::FixtureAdapter;
    use std::sync::Mutex;

    fn loaded_context() -> DriverContext {
        let mut ctx = DriverContext::new("my-run");
        ctx.adapter = Some(Box::new(FixtureAdapter {
            load_tree_xml: "<test-suite total=\"3\"/>".to_string(),
            run_result_xml: "<test-run total=\"3\"/>".to_string(),
            stop_calls: Mutex::new(0),
        }));
        ctx.loaded_tree_xml = Some("<test-suite><test-case/><test-case/><test-case/></test-suite>".to_string());
        ctx.state = DriverState::Loaded;
        ctx
    }

    #[test]
    fn every_op_but_load_fails_not_loaded_while_unloaded() {
        let ctx = DriverContext::new("my-run");
        assert!(matches!(ctx.count_test_cases("<filter/>"), Err(DriverError::NotLoaded)));
        assert!(matches!(ctx.explore("<filter/>"), Err(DriverError::NotLoaded)));
    }

    #[test]
    fn stop_run_true_is_always_force_stop_not_supported() {
        let mut ctx = loaded_context();
        assert!(matches!(ctx.stop_run(true), Err(DriverError::ForceStopNotSupported)));

        let mut unloaded = DriverContext::new("my-run");
        assert!(matches!(unloaded.stop_run(true), Err(DriverError::ForceStopNotSupported)));
    }

    #[test]
    fn stop_run_false_while_unloaded_is_not_loaded() {
        let mut ctx = DriverContext::new("my-run");
        assert!(matches!(ctx.stop_run(false), Err(DriverError::NotLoaded)));
    }

    #[test]
    fn stop_run_false_while_loaded_transitions_to_stopped() {
        let mut ctx = loaded_context();
        ctx.stop_run(false).unwrap();
        assert_eq!(ctx.state(), DriverState::Stopped);
    }

    #[tokio::test]
    async fn run_with_an_excluding_filter_skips_the_adapter_entirely() {
        let mut ctx = loaded_context();
        let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
        let xml = ctx.run(&engine_filter::Filter::Or(Vec::new()), tx).await.unwrap();
        assert_eq!(engine_xml::count_test_cases(&xml).unwrap(), 3);
        assert_eq!(ctx.state(), DriverState::Loaded);
    }

    #[tokio::test]
    async fn run_invokes_the_adapter_and_returns_to_loaded() {
        let mut ctx = loaded_context();
        let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
        let xml = ctx.run(&engine_filter::Filter::Test("My.Test".to_string()), tx).await.unwrap();
        assert_eq!(xml, "<test-run total=\"3\"/>");
        assert_eq!(ctx.state(), DriverState::Loaded);
    }
}
