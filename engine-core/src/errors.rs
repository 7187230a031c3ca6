// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Errors produced by the engine.

use crate::runtime_id::RuntimeId;
use camino::Utf8PathBuf;
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// An error encountered while parsing a [`RuntimeId`](crate::runtime_id::RuntimeId).
#[derive(Clone, Debug, Error)]
#[non_exhaustive]
pub enum RuntimeIdParseError {
    /// The family component isn't one the engine recognizes.
    #[error("unsupported runtime family `{family}` in `{input}`")]
    UnsupportedRuntime {
        /// The raw input string that failed to parse.
        input: String,
        /// The family token extracted from the input.
        family: String,
    },

    /// The version component couldn't be parsed as a dotted numeric version.
    #[error("malformed version `{version}` in runtime id `{input}`")]
    MalformedVersion {
        /// The raw input string that failed to parse.
        input: String,
        /// The version token extracted from the input.
        version: String,
    },
}

/// An error returned when a test binary's metadata can't be read or targets a
/// platform the engine refuses to host.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BinaryInspectError {
    /// The binary's metadata was unreadable or malformed.
    #[error("bad binary `{path}`: {reason}")]
    BadBinary {
        /// Path to the binary that failed to load.
        path: Utf8PathBuf,
        /// Human-readable reason the metadata couldn't be read.
        reason: String,
    },

    /// The binary's declared target platform is one the engine explicitly rejects.
    #[error("unsupported platform `{platform}` declared by `{path}`")]
    UnsupportedPlatform {
        /// Path to the binary that declared the platform.
        path: Utf8PathBuf,
        /// The rejected platform name, e.g. `Silverlight`.
        platform: String,
    },

    /// The binary's declared runtime couldn't be parsed.
    #[error("unsupported runtime declared by `{path}`")]
    UnsupportedRuntime {
        /// Path to the binary that declared the runtime.
        path: Utf8PathBuf,
        /// The underlying parse failure.
        #[source]
        source: RuntimeIdParseError,
    },
}

/// An error returned while discovering extensions at startup.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ExtensionLoadError {
    /// An explicitly-listed addin candidate couldn't be read.
    #[error("failed to read extension assembly `{assembly_path}`: {reason}")]
    CandidateUnreadable {
        /// Path to the assembly that failed to load.
        assembly_path: Utf8PathBuf,
        /// Human-readable failure reason.
        reason: String,
    },

    /// Two root-registered extension points declared the same path.
    #[error("duplicate extension point path `{path}`")]
    DuplicateExtensionPoint {
        /// The path that was registered twice.
        path: String,
    },

    /// A node declared no explicit path and none of its type, interfaces, or
    /// base types matched a known extension point.
    #[error("no extension point matches type `{type_name}`")]
    NoExtensionPoint {
        /// The fully-qualified type name that carried the extension marker.
        type_name: String,
    },

    /// A node declared no explicit path and more than one candidate extension
    /// point matched (e.g. two implemented interfaces each bind to a point).
    #[error("ambiguous extension point for type `{type_name}`: candidates {candidates:?}")]
    AmbiguousExtensionPoint {
        /// The fully-qualified type name that carried the extension marker.
        type_name: String,
        /// The paths of every extension point that matched.
        candidates: Vec<String>,
    },

    /// The manifest file itself was malformed in a way that can't be
    /// recovered from (distinct from an individual candidate being
    /// unreadable).
    #[error("malformed addins manifest `{manifest_path}`: {reason}")]
    MalformedManifest {
        /// Path to the `.addins` manifest file.
        manifest_path: Utf8PathBuf,
        /// Human-readable failure reason.
        reason: String,
    },

    /// The host's own target-framework family rejected an extension's
    /// target-framework family (spec §4.C.5).
    #[error(
        "extension `{type_name}` targets `{extension_runtime}`, incompatible with host runtime `{host_runtime}`"
    )]
    IncompatibleHostFramework {
        /// The fully-qualified type name that carried the extension marker.
        type_name: String,
        /// The runtime the extension declared.
        extension_runtime: RuntimeId,
        /// The host's own runtime.
        host_runtime: RuntimeId,
    },
}

/// An error returned when no registered launcher can host a package.
#[derive(Clone, Debug, Error)]
#[error("no suitable agent launcher found for target runtime `{target_runtime}`")]
pub struct NoSuitableAgent {
    /// The runtime the package declared via `TargetRuntimeFramework`.
    pub target_runtime: RuntimeId,
}

/// An error returned when spawning an agent process fails at any step of
/// selection, process creation, or handshake.
#[derive(Debug, Error)]
#[error("failed to launch agent for package `{package_id}`: {cause}")]
pub struct AgentLaunchFailed {
    /// The package the agent was being launched for.
    pub package_id: Uuid,
    /// The underlying cause.
    pub cause: AgentLaunchCause,
}

/// The specific step at which an agent launch failed.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AgentLaunchCause {
    /// [`NoSuitableAgent`] was returned during launcher selection.
    #[error(transparent)]
    NoSuitableAgent(#[from] NoSuitableAgent),

    /// The worker process could not be spawned at all (e.g. the executable
    /// was missing).
    #[error("could not spawn worker process: {0}")]
    SpawnFailed(String),

    /// The worker process was spawned but did not send `AgentStarted` before
    /// the handshake timeout elapsed.
    #[error("agent did not complete handshake within {timeout_secs}s")]
    HandshakeTimedOut {
        /// The configured handshake timeout, for diagnostics.
        timeout_secs: u64,
    },

    /// The worker process exited before completing the handshake.
    #[error("worker process exited during handshake with status {exit_code:?}")]
    ExitedDuringHandshake {
        /// The process exit code, if one was observed.
        exit_code: Option<i32>,
    },
}

/// An error surfaced when a previously-Ready agent's process exits outside of
/// a graceful `Stopping` transition.
#[derive(Clone, Copy, Debug, Error)]
#[error("agent {agent_id} crashed (exit code {exit_code:?})")]
pub struct AgentCrashed {
    /// The id of the agent that crashed.
    pub agent_id: Uuid,
    /// The process exit code, if the OS reported one.
    pub exit_code: Option<i32>,
}

/// An error returned by driver operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DriverError {
    /// An operation other than `Load` was attempted while the driver was
    /// still `Unloaded`.
    #[error("driver has not loaded a binary yet")]
    NotLoaded,

    /// No loaded framework adapter matched any reference in the binary, or a
    /// match was found but its adapter library couldn't be located on disk
    /// (spec §9's open question: "do not guess" about the on-disk name).
    #[error("no supported test framework reference found among: {referenced:?}")]
    FrameworkNotFound {
        /// The assembly references the inspector found in the binary.
        referenced: Vec<String>,
        /// Every on-disk path that was tried while resolving a matched
        /// framework name to an adapter library, logged by the caller via
        /// [`format_attempted_paths`] rather than folded into this message
        /// so a match-but-not-found case stays distinguishable from a
        /// no-match-at-all case in logs.
        attempted: Vec<Utf8PathBuf>,
    },

    /// A framework adapter was found but declared itself incompatible with
    /// the binary (e.g. an unsupported framework version range).
    #[error("framework `{framework}` is incompatible with this binary: {reason}")]
    IncompatibleFramework {
        /// The framework that was matched.
        framework: String,
        /// Human-readable incompatibility reason.
        reason: String,
    },

    /// `StopRun(force = true)` was requested directly against a driver; this
    /// must be implemented at the Agency level by killing the process.
    #[error("force-stop is not implemented cooperatively by the driver")]
    ForceStopNotSupported,

    /// The underlying framework controller surfaced a failure while running
    /// an operation.
    #[error("framework `{framework}` reported an error during `{operation}`: {cause}")]
    FrameworkFailure {
        /// The framework that reported the failure.
        framework: String,
        /// The operation that was in flight (`Load`, `CountTestCases`, ...).
        operation: &'static str,
        /// The underlying cause, as reported by the framework adapter.
        cause: String,
    },
}

/// An error returned while encoding or decoding a transport frame.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TransportError {
    /// The connection was closed (by either side) before a complete frame
    /// could be read.
    #[error("connection closed while reading a frame")]
    ConnectionClosed,

    /// A frame's declared length exceeded the configured maximum, almost
    /// always indicating stream corruption rather than a legitimately large
    /// payload.
    #[error("frame length {len} exceeds the maximum of {max}")]
    FrameTooLarge {
        /// The length the frame header declared.
        len: u32,
        /// The configured maximum frame length.
        max: u32,
    },

    /// The frame's kind byte didn't match any known [`FrameKind`](crate::transport::frame::FrameKind).
    #[error("unrecognized frame kind byte {byte}")]
    UnrecognizedKind {
        /// The raw byte that didn't match a known kind.
        byte: u8,
    },

    /// The payload of a `Command` or `CommandResult` frame was malformed.
    #[error("malformed {frame_kind} payload: {reason}")]
    MalformedPayload {
        /// Which kind of frame the payload belonged to.
        frame_kind: &'static str,
        /// Human-readable failure reason.
        reason: String,
    },

    /// An I/O error occurred while reading or writing a frame.
    #[error("I/O error on transport: {0}")]
    Io(#[from] std::io::Error),
}

/// An error surfaced by [`crate::driver::DriverProxy`]: either the agent
/// carrying the driver crashed mid-command, or it answered with
/// `CommandResult::Err`, or the result payload it sent back couldn't be
/// decoded.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DriverProxyError {
    /// The agent's process exited while a command was outstanding.
    #[error(transparent)]
    AgentCrashed(#[from] AgentCrashed),

    /// The remote driver reported a failure for this operation.
    #[error("remote driver operation `{operation}` failed: {reason}")]
    Remote {
        /// The driver operation that failed (`Load`, `Run`, ...).
        operation: &'static str,
        /// The human-readable reason the agent reported.
        reason: String,
    },

    /// The command's arguments or result payload couldn't be encoded/decoded.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// The top-level error type returned by public engine-core operations.
///
/// Individual subsystems return their own focused error types (so callers can
/// match precisely); this type exists to let `enginectl` propagate any of
/// them with `?` through a single error path.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EngineError {
    /// See [`RuntimeIdParseError`].
    #[error(transparent)]
    RuntimeIdParse(#[from] RuntimeIdParseError),
    /// See [`BinaryInspectError`].
    #[error(transparent)]
    BinaryInspect(#[from] BinaryInspectError),
    /// See [`ExtensionLoadError`].
    #[error(transparent)]
    ExtensionLoad(#[from] ExtensionLoadError),
    /// See [`NoSuitableAgent`].
    #[error(transparent)]
    NoSuitableAgent(#[from] NoSuitableAgent),
    /// See [`AgentLaunchFailed`].
    #[error(transparent)]
    AgentLaunchFailed(#[from] AgentLaunchFailed),
    /// See [`AgentCrashed`].
    #[error(transparent)]
    AgentCrashed(#[from] AgentCrashed),
    /// See [`DriverError`].
    #[error(transparent)]
    Driver(#[from] DriverError),
    /// See [`DriverProxyError`].
    #[error(transparent)]
    DriverProxy(#[from] DriverProxyError),
    /// See [`TransportError`].
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Formats a list of candidate paths for inclusion in an error message, used
/// by the framework-resolution open question (spec §9): when a framework
/// reference can't be resolved to an on-disk assembly, surface every path
/// that was attempted rather than guessing at a fallback.
pub(crate) fn format_attempted_paths(paths: &[Utf8PathBuf]) -> impl fmt::Display + '_ {
    struct Attempted<'a>(&'a [Utf8PathBuf]);
    impl fmt::Display for Attempted<'_> {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            for (i, p) in self.0.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{p}")?;
            }
            Ok(())
        }
    }
    Attempted(paths)
}
