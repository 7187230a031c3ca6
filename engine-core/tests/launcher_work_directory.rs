// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end check that the `WorkDirectory` setting actually reaches the
//! spawned worker's command line (spec §4.D, §6), exercised against a real
//! child process rather than the in-memory fixtures `agency.rs` itself uses.

use camino_tempfile::Utf8TempDir;
use engine_core::agent::{built_in_launchers, Agency};
use engine_core::errors::AgentLaunchCause;
use engine_core::host::HostRuntime;
use engine_core::package::{RecognizedSetting, TestPackage};
use engine_core::runtime_id::{FrameworkVersion, RuntimeFamily, RuntimeId};
use std::os::unix::fs::PermissionsExt;
use std::time::Duration;

fn host() -> HostRuntime {
    HostRuntime::new(RuntimeId::new(RuntimeFamily::NetCore, FrameworkVersion { major: 5, minor: 0 }))
        .with_handshake_timeout(Duration::from_millis(300))
}

#[tokio::test]
async fn work_directory_setting_becomes_a_work_argument_on_the_worker_command_line() {
    let work_dir = Utf8TempDir::new().expect("creates a temp work directory");
    let marker = work_dir.path().join("argv-seen-by-worker");

    // A tiny wrapper script stands in for a real worker executable: it never
    // writes the handshake event, so `get_agent` always times out, but by
    // then it has already recorded the argv it was actually spawned with.
    let wrapper = work_dir.path().join("worker.sh");
    std::fs::write(&wrapper, format!("#!/bin/sh\necho \"$@\" > {marker}\n")).expect("writes wrapper script");
    let mut perms = std::fs::metadata(&wrapper).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&wrapper, perms).unwrap();

    let agency = Agency::new(built_in_launchers(wrapper.as_str()), host());
    let package = TestPackage::leaf("/tests/fixture.dll")
        .with_setting(RecognizedSetting::TargetRuntimeFramework, "net-2.0")
        .with_raw_setting(RecognizedSetting::WorkDirectory.name(), work_dir.path().as_str());

    let err = agency.get_agent(&package).await.unwrap_err();
    assert!(matches!(err.cause, AgentLaunchCause::HandshakeTimedOut { .. }));

    let seen = std::fs::read_to_string(&marker).expect("worker ran and recorded its argv");
    let expected_arg = format!("--work={}", work_dir.path());
    assert!(
        seen.split_whitespace().any(|arg| arg == expected_arg),
        "expected `{expected_arg}` among the worker's argv, got: {seen}"
    );
}
