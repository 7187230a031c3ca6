// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The [`Agency`] (spec §4.E): selects a launcher for a package, spawns and
//! tracks its agent process, and reclaims it when the caller is done with
//! it, reporting crashes observed outside of a cooperative release.

use super::launcher::AgentLauncher;
use crate::errors::{AgentCrashed, AgentLaunchCause, AgentLaunchFailed, NoSuitableAgent, TransportError};
use crate::host::HostRuntime;
use crate::package::{RecognizedSetting, TestPackage};
use crate::runtime_id::RuntimeId;
use crate::transport::{AgentChannel, Command, CommandResult};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::process::{Child, ChildStdin, ChildStdout};
use tokio::sync::{broadcast, Mutex as AsyncMutex};
use tracing::{debug, warn};
use uuid::Uuid;

/// The framed connection to a worker process, wrapping its piped stdio.
pub type WorkerChannel = AgentChannel<ChildStdout, ChildStdin>;

/// A 128-bit identifier naming one agent for the lifetime of its process
/// (spec §6: the worker's command line carries this id so its handshake can
/// name itself).
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct AgentId(Uuid);

impl AgentId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// The underlying 128-bit value, as reported in [`AgentCrashed`] and
    /// other errors that predate this newtype.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// An agent's position in its lifecycle (spec §4.E).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AgentStatus {
    /// The process has been spawned but hasn't completed its handshake yet.
    Launching,
    /// The agent completed its handshake and is waiting for a command.
    Ready,
    /// A command is currently outstanding against this agent.
    Running,
    /// The Agency has asked the agent to stop and is waiting for it to exit.
    Stopping,
    /// The process has exited, whether gracefully or by crash.
    Dead,
}

/// Reported when an agent's process exits unexpectedly (spec §4.E: "an
/// observed process exit in any state other than `Stopping` is reported as
/// a crash").
#[derive(Clone, Copy, Debug)]
pub struct AgentCrashEvent {
    /// The agent whose process exited.
    pub agent_id: AgentId,
    /// The process exit code, if the OS reported one.
    pub exit_code: Option<i32>,
}

const CRASH_POLL_INTERVAL: Duration = Duration::from_millis(200);

struct AgentRecord {
    id: AgentId,
    runtime: RuntimeId,
    launcher_name: &'static str,
    channel: AsyncMutex<WorkerChannel>,
    child: AsyncMutex<Child>,
    status: Mutex<AgentStatus>,
    created_at: Instant,
}

impl AgentRecord {
    fn status(&self) -> AgentStatus {
        *self.status.lock().expect("agent status mutex poisoned")
    }

    fn set_status(&self, status: AgentStatus) {
        *self.status.lock().expect("agent status mutex poisoned") = status;
    }
}

/// A handle to a spawned, handshaken agent, obtained from
/// [`Agency::get_agent`]. Dispatch and release go through the [`Agency`]
/// that produced it.
#[derive(Clone)]
pub struct AgentHandle {
    record: Arc<AgentRecord>,
}

impl AgentHandle {
    /// This agent's id.
    pub fn id(&self) -> AgentId {
        self.record.id
    }

    /// The runtime this agent's process was launched under.
    pub fn runtime(&self) -> RuntimeId {
        self.record.runtime
    }

    /// The launcher that created this agent, by name.
    pub fn launcher_name(&self) -> &'static str {
        self.record.launcher_name
    }

    /// The agent's current lifecycle position.
    pub fn status(&self) -> AgentStatus {
        self.record.status()
    }

    /// How long this agent has been alive.
    pub fn age(&self) -> Duration {
        self.record.created_at.elapsed()
    }
}

/// Selects a launcher, spawns and tracks agent processes, and reclaims them
/// (spec §4.E). Launchers are tried in declaration order; the handshake and
/// graceful-stop suspension points are bounded by the timeouts carried on
/// [`HostRuntime`].
pub struct Agency {
    launchers: Vec<Box<dyn AgentLauncher>>,
    host: HostRuntime,
    records: Mutex<HashMap<AgentId, Arc<AgentRecord>>>,
    crashes: broadcast::Sender<AgentCrashEvent>,
}

impl Agency {
    /// Builds an Agency trying `launchers` in order for every package.
    pub fn new(launchers: Vec<Box<dyn AgentLauncher>>, host: HostRuntime) -> Self {
        let (crashes, _) = broadcast::channel(64);
        Self {
            launchers,
            host,
            records: Mutex::new(HashMap::new()),
            crashes,
        }
    }

    /// Subscribes to crash notifications, published for any agent whose
    /// process exits outside of a [`Agency::release_agent`] call.
    pub fn subscribe_crashes(&self) -> broadcast::Receiver<AgentCrashEvent> {
        self.crashes.subscribe()
    }

    /// How many agents are currently tracked (any status other than fully
    /// reaped).
    pub fn agent_count(&self) -> usize {
        self.records.lock().expect("agent table mutex poisoned").len()
    }

    fn target_runtime(package: &TestPackage) -> RuntimeId {
        package
            .raw_setting(RecognizedSetting::TargetRuntimeFramework.name())
            .and_then(|v| v.as_str())
            .and_then(|s| RuntimeId::parse(s).ok())
            .unwrap_or_else(RuntimeId::any)
    }

    fn select_launcher(&self, target: RuntimeId) -> Option<&dyn AgentLauncher> {
        self.launchers.iter().find(|l| l.can_host(target)).map(|l| l.as_ref())
    }

    /// Selects a launcher for `package`'s declared target runtime, spawns its
    /// worker process, and waits for the agent's handshake, bounded by
    /// [`HostRuntime::agent_handshake_timeout`].
    pub async fn get_agent(&self, package: &TestPackage) -> Result<AgentHandle, AgentLaunchFailed> {
        let package_id = package.id();
        let target = Self::target_runtime(package);

        let launch = async {
            let launcher = self
                .select_launcher(target)
                .ok_or(NoSuitableAgent { target_runtime: target })?;

            let agent_id = AgentId::new();
            let mut child = launcher.create_process(agent_id, "stdio", package)?;

            let stdout = child.stdout.take().expect("worker stdout is piped");
            let stdin = child.stdin.take().expect("worker stdin is piped");
            let mut channel = WorkerChannel::new(stdout, stdin);

            match tokio::time::timeout(self.host.agent_handshake_timeout, channel.read_event()).await {
                Ok(Ok(_handshake_payload)) => {}
                Ok(Err(TransportError::ConnectionClosed)) => {
                    let exit_code = child.try_wait().ok().flatten().and_then(|s| s.code());
                    return Err(AgentLaunchCause::ExitedDuringHandshake { exit_code });
                }
                Ok(Err(other)) => return Err(AgentLaunchCause::SpawnFailed(other.to_string())),
                Err(_elapsed) => {
                    let _ = child.start_kill();
                    return Err(AgentLaunchCause::HandshakeTimedOut {
                        timeout_secs: self.host.agent_handshake_timeout.as_secs(),
                    });
                }
            }

            let record = Arc::new(AgentRecord {
                id: agent_id,
                runtime: launcher.advertise(target).runtime,
                launcher_name: launcher.name(),
                channel: AsyncMutex::new(channel),
                child: AsyncMutex::new(child),
                status: Mutex::new(AgentStatus::Ready),
                created_at: Instant::now(),
            });

            self.records
                .lock()
                .expect("agent table mutex poisoned")
                .insert(agent_id, Arc::clone(&record));
            self.spawn_crash_watcher(Arc::clone(&record));

            debug!(agent_id = %agent_id, launcher = launcher.name(), "agent ready");
            Ok(AgentHandle { record })
        };

        launch.await.map_err(|cause| AgentLaunchFailed { package_id, cause })
    }

    /// Watches an agent's process for an exit that wasn't initiated by
    /// [`Agency::release_agent`], publishing [`AgentCrashEvent`] when one is
    /// observed (spec §4.E).
    fn spawn_crash_watcher(&self, record: Arc<AgentRecord>) {
        let crashes = self.crashes.clone();
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(CRASH_POLL_INTERVAL).await;
                if record.status() == AgentStatus::Dead {
                    return;
                }
                let exit = {
                    let mut child = record.child.lock().await;
                    child.try_wait()
                };
                match exit {
                    Ok(Some(status)) => {
                        let was_stopping = record.status() == AgentStatus::Stopping;
                        record.set_status(AgentStatus::Dead);
                        if !was_stopping {
                            let _ = crashes.send(AgentCrashEvent {
                                agent_id: record.id,
                                exit_code: status.code(),
                            });
                        }
                        return;
                    }
                    Ok(None) => continue,
                    Err(_) => return,
                }
            }
        });
    }

    /// Sends `command` to `agent` and waits for its result, delivering
    /// interleaved `Event` frames to `on_event`. An agent only ever has one
    /// outstanding command at a time; the channel mutex enforces that.
    pub async fn dispatch(
        &self,
        agent: &AgentHandle,
        command: Command,
        on_event: impl FnMut(Vec<u8>),
    ) -> Result<CommandResult, AgentCrashed> {
        agent.record.set_status(AgentStatus::Running);
        let mut channel = agent.record.channel.lock().await;
        let result = channel.send_command(&command, on_event).await;
        drop(channel);

        match result {
            Ok(result) => {
                agent.record.set_status(AgentStatus::Ready);
                Ok(result)
            }
            Err(_transport_err) => {
                let exit_code = {
                    let mut child = agent.record.child.lock().await;
                    child.try_wait().ok().flatten().and_then(|s| s.code())
                };
                agent.record.set_status(AgentStatus::Dead);
                self.records.lock().expect("agent table mutex poisoned").remove(&agent.id());
                Err(AgentCrashed {
                    agent_id: agent.id().as_uuid(),
                    exit_code,
                })
            }
        }
    }

    /// Asks `agent` to stop, waits for it to exit gracefully bounded by
    /// [`HostRuntime::agent_graceful_stop_timeout`], and kills it if it
    /// doesn't (spec §4.E). The process exiting here is expected, not a
    /// crash.
    pub async fn release_agent(&self, agent: AgentHandle) -> Result<(), TransportError> {
        let result = release_record(Arc::clone(&agent.record), self.host.agent_graceful_stop_timeout).await;
        self.records.lock().expect("agent table mutex poisoned").remove(&agent.id());
        result
    }

    /// Releases every currently-tracked agent concurrently, bounded overall
    /// by the same graceful-stop timeout each release already honors.
    pub async fn shutdown_all(&self) {
        let records: Vec<Arc<AgentRecord>> = self
            .records
            .lock()
            .expect("agent table mutex poisoned")
            .values()
            .cloned()
            .collect();
        let graceful_timeout = self.host.agent_graceful_stop_timeout;

        let mut set = tokio::task::JoinSet::new();
        for record in records {
            set.spawn(async move {
                if let Err(err) = release_record(record, graceful_timeout).await {
                    warn!(%err, "error releasing agent during shutdown");
                }
            });
        }
        while set.join_next().await.is_some() {}
        self.records.lock().expect("agent table mutex poisoned").clear();
    }
}

/// Sends the agent a `Stop` frame and waits for its process to exit,
/// bounded by `graceful_timeout`, killing it if that elapses. Free of `&self`
/// so it can be spawned as an independent, `'static` task from
/// [`Agency::shutdown_all`].
async fn release_record(record: Arc<AgentRecord>, graceful_timeout: Duration) -> Result<(), TransportError> {
    record.set_status(AgentStatus::Stopping);

    let stop_result = {
        let mut channel = record.channel.lock().await;
        channel.send_stop().await
    };

    {
        let mut child = record.child.lock().await;
        match tokio::time::timeout(graceful_timeout, child.wait()).await {
            Ok(_exit_status) => {}
            Err(_elapsed) => {
                warn!(agent_id = %record.id, "agent did not exit gracefully, killing");
                let _ = child.kill().await;
            }
        }
    }

    record.set_status(AgentStatus::Dead);
    stop_result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package::TestPackage;
    use crate::runtime_id::{FrameworkVersion, RuntimeFamily};

    fn host() -> HostRuntime {
        HostRuntime::new(RuntimeId::new(RuntimeFamily::NetCore, FrameworkVersion { major: 5, minor: 0 }))
            .with_handshake_timeout(Duration::from_millis(500))
            .with_graceful_stop_timeout(Duration::from_millis(500))
    }

    fn shell_launchers() -> Vec<Box<dyn AgentLauncher>> {
        // `sh` stands in for the real worker executable: it never writes the
        // handshake event, so these tests exercise the timeout/crash paths
        // without needing an actual agent binary.
        crate::agent::launcher::built_in_launchers("/bin/sh")
    }

    #[tokio::test]
    async fn no_launcher_matches_reports_no_suitable_agent() {
        let agency = Agency::new(shell_launchers(), host());
        let package = TestPackage::leaf("/tests/fixture.dll")
            .with_setting(RecognizedSetting::TargetRuntimeFramework, "mono-5.0");

        let err = agency.get_agent(&package).await.unwrap_err();
        assert!(matches!(err.cause, AgentLaunchCause::NoSuitableAgent(_)));
    }

    #[tokio::test]
    async fn handshake_timeout_is_reported_and_process_is_killed() {
        let agency = Agency::new(shell_launchers(), host());
        let package = TestPackage::leaf("/tests/fixture.dll")
            .with_setting(RecognizedSetting::TargetRuntimeFramework, "net-2.0");

        let err = agency.get_agent(&package).await.unwrap_err();
        assert!(matches!(err.cause, AgentLaunchCause::HandshakeTimedOut { .. }));
        assert_eq!(agency.agent_count(), 0);
    }
}
