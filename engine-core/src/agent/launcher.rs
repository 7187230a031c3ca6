// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Agent launcher plugins (spec §4.D): each launcher knows how to host one
//! kind of worker runtime, and advertises what it would create without
//! actually creating it.

use super::agency::AgentId;
use super::info::{AgentInfo, AgentKind};
use crate::errors::AgentLaunchCause;
use crate::package::{RecognizedSetting, TestPackage};
use crate::runtime_id::{FrameworkVersion, RuntimeFamily, RuntimeId};
use camino::Utf8PathBuf;
use tokio::process::{Child, Command};

/// A plugin that can host test binaries targeting one runtime family and
/// version range.
///
/// Built-in launchers are tried in declaration order (spec §8 boundary
/// scenarios 1–2: "the first launcher whose advertised runtime supports the
/// package's target wins"); the first one whose [`AgentLauncher::can_host`]
/// returns `true` is used.
pub trait AgentLauncher: Send + Sync {
    /// A short name identifying this launcher, used in diagnostics.
    fn name(&self) -> &'static str;

    /// Describes the agent this launcher would create for `target_runtime`,
    /// without creating one (spec §4.D).
    fn advertise(&self, target_runtime: RuntimeId) -> AgentInfo;

    /// Whether this launcher can host a package targeting `target_runtime`.
    fn can_host(&self, target_runtime: RuntimeId) -> bool {
        self.advertise(target_runtime).runtime.supports(&target_runtime)
    }

    /// Spawns the worker process for `package`, identified to the worker as
    /// `agent_id` so it can address its handshake (spec §4.D, §6: the worker
    /// command line carries the agent id and an agency endpoint it connects
    /// back on). Only called after [`AgentLauncher::can_host`] has already
    /// returned `true` for the package's target runtime.
    fn create_process(
        &self,
        agent_id: AgentId,
        agency_endpoint: &str,
        package: &TestPackage,
    ) -> Result<Child, AgentLaunchCause>;
}

/// A launcher built around spawning a fixed worker executable under a given
/// runtime, parameterizing process creation on the package's settings. Every
/// built-in launcher is one of these with a different advertised runtime.
pub struct ProcessLauncher {
    name: &'static str,
    runtime: RuntimeId,
    /// The highest framework major version this launcher will host (spec
    /// §4.D: "the Net20 launcher accepts net family with framework major <
    /// 4"). A launcher's host process can run test binaries built against
    /// its own runtime or any earlier one in the same family, so this is a
    /// ceiling rather than an exact-version match — and, per spec §8
    /// boundary scenario 1, the ceiling isn't always the launcher's own
    /// major version: Net20 covers major 2 *and* 3, since there is no
    /// separate net3x launcher.
    max_major: i32,
    worker_executable: Utf8PathBuf,
}

impl ProcessLauncher {
    /// Creates a launcher advertising `runtime`, hosting any target runtime
    /// in the same family whose framework major version is at most
    /// `max_major`, and spawning `worker_executable` as the agent process.
    pub fn new(name: &'static str, runtime: RuntimeId, max_major: i32, worker_executable: impl Into<Utf8PathBuf>) -> Self {
        Self {
            name,
            runtime,
            max_major,
            worker_executable: worker_executable.into(),
        }
    }

    /// The .NET Framework 2.0 launcher. Also hosts net 3.x, since the
    /// built-in set has no dedicated net30/net35 launcher.
    pub fn net20(worker_executable: impl Into<Utf8PathBuf>) -> Self {
        Self::new(
            "net20",
            RuntimeId::new(RuntimeFamily::Net, FrameworkVersion { major: 2, minor: 0 }),
            3,
            worker_executable,
        )
    }

    /// The .NET Framework 4.0 launcher.
    pub fn net40(worker_executable: impl Into<Utf8PathBuf>) -> Self {
        Self::new(
            "net40",
            RuntimeId::new(RuntimeFamily::Net, FrameworkVersion { major: 4, minor: 0 }),
            4,
            worker_executable,
        )
    }

    /// The .NET Core 2.1 launcher.
    pub fn netcore21(worker_executable: impl Into<Utf8PathBuf>) -> Self {
        Self::new(
            "netcore21",
            RuntimeId::new(RuntimeFamily::NetCore, FrameworkVersion { major: 2, minor: 1 }),
            2,
            worker_executable,
        )
    }

    /// The .NET Core 3.1 launcher.
    pub fn netcore31(worker_executable: impl Into<Utf8PathBuf>) -> Self {
        Self::new(
            "netcore31",
            RuntimeId::new(RuntimeFamily::NetCore, FrameworkVersion { major: 3, minor: 1 }),
            3,
            worker_executable,
        )
    }

    /// The .NET 5.0 launcher.
    pub fn net50(worker_executable: impl Into<Utf8PathBuf>) -> Self {
        Self::new(
            "net50",
            RuntimeId::new(RuntimeFamily::NetCore, FrameworkVersion { major: 5, minor: 0 }),
            5,
            worker_executable,
        )
    }
}

impl AgentLauncher for ProcessLauncher {
    fn name(&self) -> &'static str {
        self.name
    }

    fn advertise(&self, _target_runtime: RuntimeId) -> AgentInfo {
        AgentInfo {
            launcher_name: self.name,
            agent_kind: AgentKind::LocalProcess,
            runtime: self.runtime,
        }
    }

    /// Applies this launcher's own family/version rule (spec §4.D) rather
    /// than the generic, CLR-exact [`RuntimeId::supports`] relation: a
    /// launcher hosts any target in the same family (or `any`) whose
    /// framework major version doesn't exceed its ceiling, independent of
    /// CLR build-number agreement. This is what lets a package targeting
    /// `net-2.0` match both the net20 *and* net40 launchers (spec §8
    /// boundary scenario 1) even though their CLR versions differ.
    fn can_host(&self, target_runtime: RuntimeId) -> bool {
        let family_matches = self.runtime.family() == target_runtime.family()
            || self.runtime.family() == RuntimeFamily::Any
            || target_runtime.family() == RuntimeFamily::Any;
        family_matches && target_runtime.framework_version().major <= self.max_major
    }

    fn create_process(
        &self,
        agent_id: AgentId,
        agency_endpoint: &str,
        package: &TestPackage,
    ) -> Result<Child, AgentLaunchCause> {
        let mut command = Command::new(self.worker_executable.as_std_path());
        command.kill_on_drop(true);

        // Worker command line (spec §6): `<agent-id> <agency-url>
        // --pid=<controller-pid> [--trace=<level>] [--debug-agent]
        // [--work=<dir>]`.
        command.arg(agent_id.to_string());
        command.arg(agency_endpoint);
        command.arg(format!("--pid={}", std::process::id()));
        if let Some(level) = package.raw_setting(RecognizedSetting::InternalTraceLevel.name()).and_then(|v| v.as_int()) {
            command.arg(format!("--trace={level}"));
        }
        if let Some(true) = package.raw_setting(RecognizedSetting::DebugAgent.name()).and_then(|v| v.as_bool()) {
            command.arg("--debug-agent");
        }
        if let Some(dir) = package.raw_setting(RecognizedSetting::WorkDirectory.name()).and_then(|v| v.as_str()) {
            command.arg(format!("--work={dir}"));
        }

        command.stdin(std::process::Stdio::piped());
        command.stdout(std::process::Stdio::piped());
        command.stderr(std::process::Stdio::inherit());

        command.spawn().map_err(|err| AgentLaunchCause::SpawnFailed(err.to_string()))
    }
}

/// The built-in launchers, tried in this exact order (spec §8 boundary
/// scenarios 1–2).
pub fn built_in_launchers(worker_executable: impl Into<Utf8PathBuf> + Clone) -> Vec<Box<dyn AgentLauncher>> {
    vec![
        Box::new(ProcessLauncher::net20(worker_executable.clone())),
        Box::new(ProcessLauncher::net40(worker_executable.clone())),
        Box::new(ProcessLauncher::netcore21(worker_executable.clone())),
        Box::new(ProcessLauncher::netcore31(worker_executable.clone())),
        Box::new(ProcessLauncher::net50(worker_executable)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Spec §8 boundary scenario 1, pinned exactly: `net-2.0` matches both
    /// net20 and net40 in that order; `net-4.0` matches only net40.
    #[test]
    fn net_2_0_matches_net20_then_net40_net_4_0_matches_only_net40() {
        let launchers = built_in_launchers("/bin/agent-worker");

        let net20_target = RuntimeId::new(RuntimeFamily::Net, FrameworkVersion { major: 2, minor: 0 });
        let matching: Vec<&str> = launchers.iter().filter(|l| l.can_host(net20_target)).map(|l| l.name()).collect();
        assert_eq!(matching, vec!["net20", "net40"]);

        let net40_target = RuntimeId::new(RuntimeFamily::Net, FrameworkVersion { major: 4, minor: 0 });
        let matching: Vec<&str> = launchers.iter().filter(|l| l.can_host(net40_target)).map(|l| l.name()).collect();
        assert_eq!(matching, vec!["net40"]);
    }

    /// Spec §8 boundary scenario 2, pinned exactly: `netcore-1.1` matches
    /// netcore21, netcore31, and net50, in that order.
    #[test]
    fn netcore_1_1_matches_netcore21_netcore31_net50_in_order() {
        let launchers = built_in_launchers("/bin/agent-worker");
        let target = RuntimeId::new(RuntimeFamily::NetCore, FrameworkVersion { major: 1, minor: 1 });
        let matching: Vec<&str> = launchers.iter().filter(|l| l.can_host(target)).map(|l| l.name()).collect();
        assert_eq!(matching, vec!["netcore21", "netcore31", "net50"]);
    }

    #[test]
    fn netcore_package_matches_lowest_compatible_netcore_launcher_first() {
        let launchers = built_in_launchers("/bin/agent-worker");
        let target = RuntimeId::new(RuntimeFamily::NetCore, FrameworkVersion { major: 2, minor: 1 });
        let matched = launchers.iter().find(|l| l.can_host(target)).unwrap();
        assert_eq!(matched.name(), "netcore21");
    }

    #[test]
    fn no_launcher_matches_an_unsupported_family() {
        let launchers = built_in_launchers("/bin/agent-worker");
        let target = RuntimeId::new(RuntimeFamily::Mono, FrameworkVersion { major: 5, minor: 0 });
        assert!(!launchers.iter().any(|l| l.can_host(target)));
    }

    #[test]
    fn advertise_reports_launcher_kind_and_runtime() {
        let launcher = ProcessLauncher::net40("/bin/agent-worker");
        let info = launcher.advertise(RuntimeId::new(RuntimeFamily::Net, FrameworkVersion { major: 4, minor: 0 }));
        assert_eq!(info.launcher_name, "net40");
        assert_eq!(info.agent_kind, AgentKind::LocalProcess);
    }
}
