// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The built-in NUnit [`FrameworkAdapter`], backed by a dynamically loaded
//! shared library (spec §4.G, §9): the framework's controller surface is
//! modeled as an opaque handle behind a small, hand-rolled C ABI, with its
//! well-known operation names (`LoadTests`, `CountTests`, `ExploreTests`,
//! `RunTests`, `StopRun`) carried by this module's trait rather than by
//! reflection against a CLR type name.

use super::adapter::{FrameworkAdapter, FrameworkAdapterFactory, LoadFailure, ProgressSink};
use crate::package::SettingValue;
use async_trait::async_trait;
use camino::{Utf8Path, Utf8PathBuf};
use libloading::{Library, Symbol};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// The name matched against a binary's referenced assemblies (spec §4.G:
/// `nunit.framework`, case-insensitively).
const FRAMEWORK_NAME: &str = "nunit.framework";

/// The symbol every adapter library exports: a parameterless factory
/// returning an owned, heap-allocated controller handle. Mirrors the
/// single-factory-export convention of dynamically loaded plugins generally
/// (one exported symbol, not one per operation), with the operation names
/// themselves carried on [`NUnitControllerHandle`] rather than as separate
/// exports.
const CREATE_SYMBOL: &[u8] = b"FrameworkController_Create";

/// The opaque controller handle an adapter library hands back, late-bound at
/// the operation level the way spec §9 describes ("model the framework
/// controller as an opaque handle and the operations as name-indexed
/// calls"). `extern "C"` callers on the other side of the library boundary
/// only ever see these five operations.
///
/// # Safety
///
/// Implementations are constructed from a raw pointer handed back across an
/// FFI boundary by [`CREATE_SYMBOL`]; the library that produced the pointer
/// must stay loaded for the handle's entire lifetime, which [`NUnitAdapter`]
/// guarantees by keeping its [`Library`] alongside the handle.
pub trait NUnitControllerHandle: Send + Sync {
    /// `LoadTests`: loads `binary_path` with the given settings (encoded as
    /// a small XML settings blob) and returns the test tree as XML.
    fn load_tests(&self, binary_path: &str, settings_xml: &str) -> Result<String, LoadFailure>;
    /// `CountTests`: counts the test cases `filter_xml` selects.
    fn count_tests(&self, filter_xml: &str) -> Result<i64, String>;
    /// `ExploreTests`: returns the test tree narrowed to `filter_xml`.
    fn explore_tests(&self, filter_xml: &str) -> Result<String, String>;
    /// `RunTests`: runs the test cases `filter_xml` selects, invoking
    /// `on_progress` synchronously for each progress payload the framework
    /// produces, and returns the final result XML.
    fn run_tests(&self, filter_xml: &str, on_progress: &mut dyn FnMut(String)) -> Result<String, String>;
    /// `StopRun`: cooperatively asks an in-flight run to stop.
    fn stop_run(&self) -> Result<(), String>;
}

type CreateFn = unsafe extern "C" fn() -> *mut dyn NUnitControllerHandle;

/// A loaded NUnit adapter library, bound to one [`NUnitControllerHandle`].
pub struct NUnitAdapter {
    // Never read again after construction, but must outlive `handle`: the
    // handle's vtable lives inside this library's mapped memory.
    _library: Library,
    handle: Arc<dyn NUnitControllerHandle>,
}

fn settings_to_xml(settings: &BTreeMap<String, SettingValue>) -> String {
    let mut xml = String::from("<settings>");
    for (name, value) in settings {
        let value_str = match value {
            SettingValue::Str(s) => s.clone(),
            SettingValue::Int(i) => i.to_string(),
            SettingValue::Bool(b) => b.to_string(),
        };
        xml.push_str(&format!(
            "<setting name=\"{}\" value=\"{}\"/>",
            name.replace('&', "&amp;").replace('"', "&quot;"),
            value_str.replace('&', "&amp;").replace('"', "&quot;")
        ));
    }
    xml.push_str("</settings>");
    xml
}

#[async_trait]
impl FrameworkAdapter for NUnitAdapter {
    fn framework_name(&self) -> &str {
        FRAMEWORK_NAME
    }

    fn load(&self, binary_path: &Utf8Path, settings: &BTreeMap<String, SettingValue>) -> Result<String, LoadFailure> {
        self.handle.load_tests(binary_path.as_str(), &settings_to_xml(settings))
    }

    fn count_test_cases(&self, filter_xml: &str) -> Result<usize, String> {
        self.handle
            .count_tests(filter_xml)
            .map(|count| count.max(0) as usize)
    }

    fn explore(&self, filter_xml: &str) -> Result<String, String> {
        self.handle.explore_tests(filter_xml)
    }

    async fn run(&self, filter_xml: &str, progress: ProgressSink) -> Result<String, String> {
        let handle = Arc::clone(&self.handle);
        let filter_xml = filter_xml.to_string();
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<Vec<u8>>();

        let run_task = tokio::task::spawn_blocking(move || {
            let mut on_progress = |payload: String| {
                let _ = tx.send(payload.into_bytes());
            };
            handle.run_tests(&filter_xml, &mut on_progress)
        });

        while let Some(payload) = rx.recv().await {
            if progress.send(payload).is_err() {
                break;
            }
        }

        run_task.await.map_err(|err| format!("adapter run task panicked: {err}"))?
    }

    fn stop_run(&self) -> Result<(), String> {
        self.handle.stop_run()
    }
}

/// Candidate on-disk names for the NUnit adapter library, tried in order
/// (spec §9's open question: the source resolves the filename by appending
/// `.dll` to the reference's simple name; this tries that convention plus
/// the platform's native library naming, since this engine isn't Windows-only).
fn candidate_paths(binary_dir: &Utf8Path) -> Vec<Utf8PathBuf> {
    let ext = std::env::consts::DLL_EXTENSION;
    vec![
        binary_dir.join(format!("{FRAMEWORK_NAME}.{ext}")),
        binary_dir.join(format!("lib{FRAMEWORK_NAME}.{ext}")),
        binary_dir.join("adapters").join(format!("{FRAMEWORK_NAME}.{ext}")),
    ]
}

/// Builds [`NUnitAdapter`]s by searching [`candidate_paths`] relative to a
/// binary's directory.
pub struct NUnitAdapterFactory;

impl FrameworkAdapterFactory for NUnitAdapterFactory {
    fn framework_name(&self) -> &'static str {
        FRAMEWORK_NAME
    }

    fn create(&self, binary_dir: &Utf8Path) -> Result<Box<dyn FrameworkAdapter>, Vec<Utf8PathBuf>> {
        let candidates = candidate_paths(binary_dir);
        let existing = candidates.iter().find(|p| p.exists());
        let Some(path) = existing else {
            return Err(candidates);
        };

        let (library, handle) = unsafe {
            let library = Library::new(path.as_std_path()).map_err(|_| candidates.clone())?;
            let create: Symbol<CreateFn> = library.get(CREATE_SYMBOL).map_err(|_| candidates.clone())?;
            let raw = create();
            let handle: Arc<dyn NUnitControllerHandle> = Arc::from(Box::from_raw(raw));
            (library, handle)
        };

        debug!(path = %path, "loaded NUnit adapter library");
        Ok(Box::new(NUnitAdapter {
            _library: library,
            handle,
        }))
    }
}
