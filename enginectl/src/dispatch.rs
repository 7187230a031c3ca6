// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Argument parsing and the top-level run loop for `enginectl`, grounded in
//! `cargo-nextest`'s `dispatch` module but thinned down to the one operation
//! this binary supports: load a package, run it to completion, print
//! progress lines (spec.md §1, "Out of scope": no subcommands, no config
//! file, no `--help` text beyond the one usage line in [`CliError::Usage`]).

use crate::errors::CliError;
use camino::Utf8PathBuf;
use engine_core::agent::{built_in_launchers, Agency};
use engine_core::driver::DriverProxy;
use engine_core::host::HostRuntime;
use engine_core::package::{RecognizedSetting, TestPackage};
use engine_core::runtime_id::RuntimeId;
use tracing::info;

/// Parsed command-line arguments.
#[derive(Debug)]
pub struct Args {
    /// Path to the test binary to run (or, with `--package`, the path
    /// recorded on the loaded description instead).
    pub binary: Option<Utf8PathBuf>,
    /// `--runtime <id>`: overrides `TargetRuntimeFramework` on the package.
    pub runtime_override: Option<String>,
    /// `--worker <path>`: the worker executable each built-in launcher
    /// spawns. Defaults to `enginectl-worker` on `$PATH`.
    pub worker_executable: Utf8PathBuf,
    /// `--package <file>`: loads the `TestPackage` description from this
    /// JSON file instead of building a bare leaf package from `binary`.
    pub package_file: Option<Utf8PathBuf>,
}

const DEFAULT_WORKER_EXECUTABLE: &str = "enginectl-worker";

impl Args {
    /// Parses `argv` (excluding the program name).
    pub fn parse(argv: &[String]) -> Result<Self, CliError> {
        let mut binary = None;
        let mut runtime_override = None;
        let mut worker_executable = None;
        let mut package_file = None;

        let mut iter = argv.iter();
        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--runtime" => {
                    let value = iter.next().ok_or_else(|| CliError::Usage("--runtime needs a value".to_string()))?;
                    runtime_override = Some(value.clone());
                }
                "--worker" => {
                    let value = iter.next().ok_or_else(|| CliError::Usage("--worker needs a value".to_string()))?;
                    worker_executable = Some(Utf8PathBuf::from(value));
                }
                "--package" => {
                    let value = iter.next().ok_or_else(|| CliError::Usage("--package needs a value".to_string()))?;
                    package_file = Some(Utf8PathBuf::from(value));
                }
                other if other.starts_with("--") => {
                    return Err(CliError::Usage(format!("unrecognized option `{other}`")));
                }
                other if binary.is_none() => {
                    binary = Some(Utf8PathBuf::from(other));
                }
                other => {
                    return Err(CliError::Usage(format!("unexpected extra argument `{other}`")));
                }
            }
        }

        if binary.is_none() && package_file.is_none() {
            return Err(CliError::Usage("no test binary or --package description given".to_string()));
        }

        Ok(Self {
            binary,
            runtime_override,
            worker_executable: worker_executable.unwrap_or_else(|| Utf8PathBuf::from(DEFAULT_WORKER_EXECUTABLE)),
            package_file,
        })
    }

    fn load_package(&self) -> Result<TestPackage, CliError> {
        let mut package = match &self.package_file {
            Some(path) => {
                let text = std::fs::read_to_string(path).map_err(|source| CliError::PackageFileUnreadable {
                    path: path.clone(),
                    source,
                })?;
                serde_json::from_str(&text).map_err(|source| CliError::PackageFileMalformed {
                    path: path.clone(),
                    source,
                })?
            }
            None => TestPackage::leaf(self.binary.clone().expect("checked in Args::parse")),
        };

        if let Some(runtime) = &self.runtime_override {
            RuntimeId::parse(runtime)?;
            package = package.with_setting(RecognizedSetting::TargetRuntimeFramework, runtime.as_str());
        }

        Ok(package)
    }
}

/// Runs `args` to completion: loads the package, dispatches `Load` then
/// `Run` against the one agent it selects, printing the framework's progress
/// events and the final result XML.
///
/// Returns the process exit code: `0` if the run was dispatched and
/// completed without an engine-level failure. Test-level pass/fail detail
/// lives inside the opaque result XML the engine only counts, never
/// interprets (spec.md §4.G).
pub async fn run(args: Args) -> Result<i32, CliError> {
    let host = HostRuntime::new(RuntimeId::any());
    let package = args.load_package()?;

    let agency = Agency::new(built_in_launchers(args.worker_executable.as_str()), host);
    let agent = agency.get_agent(&package).await.map_err(engine_core::errors::EngineError::from)?;
    let proxy = DriverProxy::new(&agency, agent);

    let binary_path = package.path().map(|p| p.to_string()).unwrap_or_default();
    let settings = Default::default();
    let tree_xml = proxy.load(&binary_path, &settings).await.map_err(engine_core::errors::EngineError::from)?;
    let total = engine_xml::count_test_cases(&tree_xml).unwrap_or(0);
    info!(total, "loaded test binary");

    let filter = engine_filter::Filter::And(Vec::new());
    let filter_xml = filter.to_xml().expect("a well-formed filter always serializes");

    let result_xml = proxy
        .run(&filter_xml, |event| info!(bytes = event.len(), "progress event"))
        .await
        .map_err(engine_core::errors::EngineError::from)?;
    let ran = engine_xml::count_test_cases(&result_xml).unwrap_or(0);
    info!(ran, "run complete");

    proxy.stop_run(false).await.map_err(engine_core::errors::EngineError::from)?;
    agency.shutdown_all().await;

    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_bare_binary_path() {
        let args = Args::parse(&["fixture.dll".to_string()]).unwrap();
        assert_eq!(args.binary.unwrap().as_str(), "fixture.dll");
        assert!(args.runtime_override.is_none());
        assert_eq!(args.worker_executable.as_str(), DEFAULT_WORKER_EXECUTABLE);
    }

    #[test]
    fn parses_runtime_and_worker_overrides() {
        let args = Args::parse(&[
            "fixture.dll".to_string(),
            "--runtime".to_string(),
            "net-5.0".to_string(),
            "--worker".to_string(),
            "/opt/worker".to_string(),
        ])
        .unwrap();
        assert_eq!(args.runtime_override.as_deref(), Some("net-5.0"));
        assert_eq!(args.worker_executable.as_str(), "/opt/worker");
    }

    #[test]
    fn missing_binary_and_package_is_a_usage_error() {
        let err = Args::parse(&[]).unwrap_err();
        assert!(matches!(err, CliError::Usage(_)));
    }

    #[test]
    fn unrecognized_option_is_a_usage_error() {
        let err = Args::parse(&["fixture.dll".to_string(), "--bogus".to_string()]).unwrap_err();
        assert!(matches!(err, CliError::Usage(_)));
    }

    #[test]
    fn loads_a_package_description_from_a_json_file() {
        let dir = camino_tempfile::Utf8TempDir::new().unwrap();
        let path = dir.path().join("package.json");
        std::fs::write(&path, r#"{"leaf": {"path": "/tests/fixture.dll"}}"#).unwrap();

        let args = Args::parse(&["--package".to_string(), path.to_string()]).unwrap();
        let package = args.load_package().unwrap();
        assert_eq!(package.path().unwrap().as_str(), "/tests/fixture.dll");
    }

    #[test]
    fn runtime_override_is_validated_before_use() {
        let args = Args::parse(&["fixture.dll".to_string(), "--runtime".to_string(), "bogus".to_string()]).unwrap();
        assert!(matches!(args.load_package(), Err(CliError::InvalidRuntime(_))));
    }
}
