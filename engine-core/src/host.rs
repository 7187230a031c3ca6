// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! [`HostRuntime`]: an explicit value computed once at startup and threaded
//! into the [`ExtensionRegistry`](crate::extension::registry::ExtensionRegistry)
//! and [`Agency`](crate::agent::agency::Agency) constructors, replacing the
//! "global current framework singleton" the source system uses (spec §9).

use crate::runtime_id::RuntimeId;
use std::time::Duration;

/// The engine-version gate used during extension discovery (spec §4.C.4):
/// extensions declaring a newer `EngineVersion` than this are skipped.
pub const COMPATIBLE_ENGINE_VERSION: (u16, u16) = (1, 0);

/// Values that would otherwise live as mutable module-level state: the
/// host's own runtime (used by the target-framework compatibility gate,
/// spec §4.C.5), the engine-version ceiling extensions are gated against,
/// and the timeouts the Agency's suspension points are bounded by (spec §5).
#[derive(Clone, Copy, Debug)]
pub struct HostRuntime {
    /// The runtime family/version the host process itself runs under.
    pub runtime: RuntimeId,
    /// The highest `EngineVersion` an extension may declare and still load.
    pub compatible_engine_version: (u16, u16),
    /// Default bound on waiting for an agent's `AgentStarted` handshake
    /// (spec §4.E: "bounded by a timeout, default 30s").
    pub agent_handshake_timeout: Duration,
    /// Default bound on waiting for a released agent to exit gracefully
    /// before it is killed (spec §4.E).
    pub agent_graceful_stop_timeout: Duration,
}

impl HostRuntime {
    /// Builds a `HostRuntime` for the given host runtime id, using the
    /// engine's documented default timeouts.
    pub fn new(runtime: RuntimeId) -> Self {
        Self {
            runtime,
            compatible_engine_version: COMPATIBLE_ENGINE_VERSION,
            agent_handshake_timeout: Duration::from_secs(30),
            agent_graceful_stop_timeout: Duration::from_secs(10),
        }
    }

    /// Overrides the handshake timeout, builder-style.
    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.agent_handshake_timeout = timeout;
        self
    }

    /// Overrides the graceful-stop timeout, builder-style.
    pub fn with_graceful_stop_timeout(mut self, timeout: Duration) -> Self {
        self.agent_graceful_stop_timeout = timeout;
        self
    }
}
