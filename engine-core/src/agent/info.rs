// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Descriptive information a launcher advertises about the agent kind it
//! would create (spec §4.D).

use crate::runtime_id::RuntimeId;

/// Where the agent's test code actually runs.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AgentKind {
    /// A separate worker process, communicating over the framed transport.
    LocalProcess,
    /// Hosted directly inside the controller process (used by launchers that
    /// can't or don't need process isolation, e.g. a same-runtime in-process
    /// fast path).
    InProcess,
}

/// What an [`AgentLauncher`](super::launcher::AgentLauncher) would create for
/// a given package, without actually creating it (spec §4.D: "advertise,
/// without creating one").
#[derive(Clone, Debug)]
pub struct AgentInfo {
    /// The launcher's own name, surfaced in diagnostics and logs.
    pub launcher_name: &'static str,
    /// Where the agent's test code would run.
    pub agent_kind: AgentKind,
    /// The runtime the resulting agent would run under.
    pub runtime: RuntimeId,
}
