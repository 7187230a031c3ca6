// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Agent launcher plugins (spec §4.D) and the Agency that selects, spawns,
//! tracks, and reclaims the processes they create (spec §4.E).

pub mod agency;
pub mod info;
pub mod launcher;

pub use agency::{Agency, AgentCrashEvent, AgentHandle, AgentId, AgentStatus, WorkerChannel};
pub use info::{AgentInfo, AgentKind};
pub use launcher::{built_in_launchers, AgentLauncher, ProcessLauncher};
