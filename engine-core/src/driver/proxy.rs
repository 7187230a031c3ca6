// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! [`DriverProxy`]: the controller-side typed handle for the five driver
//! operations (spec §4.G), dispatched over [`Agency::dispatch`] to a remote
//! [`crate::driver::worker_loop`] and decoded back from wire-encoded
//! [`CommandResult`]s.
//!
//! This is the only thing a controller ever calls to drive a loaded worker:
//! it owns no state of its own beyond the [`AgentHandle`] it was built with,
//! mirroring [`DriverContext`]'s one-binary-per-worker contract from the
//! other side of the transport.

use super::wire;
use crate::agent::{AgentHandle, Agency};
use crate::errors::DriverProxyError;
use crate::package::SettingValue;
use crate::transport::{Command, CommandResult};
use std::collections::BTreeMap;

fn remote(operation: &'static str, reason: String) -> DriverProxyError {
    DriverProxyError::Remote { operation, reason }
}

fn decode_ok(operation: &'static str, result: CommandResult) -> Result<Vec<u8>, DriverProxyError> {
    match result {
        CommandResult::Ok(payload) => Ok(payload),
        CommandResult::Err(reason) => Err(remote(operation, reason)),
    }
}

fn utf8(operation: &'static str, bytes: Vec<u8>) -> Result<String, DriverProxyError> {
    String::from_utf8(bytes).map_err(|_| remote(operation, "response payload is not valid UTF-8".to_string()))
}

/// A controller-side handle to a single worker's [`DriverContext`], reached
/// through its [`AgentHandle`] via the owning [`Agency`].
pub struct DriverProxy<'a> {
    agency: &'a Agency,
    agent: AgentHandle,
}

impl<'a> DriverProxy<'a> {
    /// Builds a proxy for `agent`, dispatched through `agency`.
    pub fn new(agency: &'a Agency, agent: AgentHandle) -> Self {
        Self { agency, agent }
    }

    /// The agent this proxy drives.
    pub fn agent(&self) -> &AgentHandle {
        &self.agent
    }

    /// `Load(binaryPath, settings)`: returns the loaded test tree as XML.
    pub async fn load(&self, binary_path: &str, settings: &BTreeMap<String, SettingValue>) -> Result<String, DriverProxyError> {
        let command = Command {
            name: wire::op::LOAD.to_string(),
            args: wire::encode_load_args(binary_path, settings),
        };
        let result = self.agency.dispatch(&self.agent, command, |_event| {}).await?;
        utf8(wire::op::LOAD, decode_ok(wire::op::LOAD, result)?)
    }

    /// `CountTestCases(filter)`: counts the test cases `filter_xml` selects.
    pub async fn count_test_cases(&self, filter_xml: &str) -> Result<usize, DriverProxyError> {
        let command = Command {
            name: wire::op::COUNT_TEST_CASES.to_string(),
            args: wire::encode_filter_arg(filter_xml),
        };
        let result = self.agency.dispatch(&self.agent, command, |_event| {}).await?;
        let payload = decode_ok(wire::op::COUNT_TEST_CASES, result)?;
        wire::decode_count(&payload).map_err(DriverProxyError::from)
    }

    /// `Explore(filter)`: returns the test tree narrowed to `filter_xml`.
    pub async fn explore(&self, filter_xml: &str) -> Result<String, DriverProxyError> {
        let command = Command {
            name: wire::op::EXPLORE.to_string(),
            args: wire::encode_filter_arg(filter_xml),
        };
        let result = self.agency.dispatch(&self.agent, command, |_event| {}).await?;
        utf8(wire::op::EXPLORE, decode_ok(wire::op::EXPLORE, result)?)
    }

    /// `Run(listener, filter)`: runs the test cases `filter_xml` selects,
    /// forwarding each progress payload to `on_event` as it arrives, and
    /// returns the final result XML.
    pub async fn run(&self, filter_xml: &str, on_event: impl FnMut(Vec<u8>)) -> Result<String, DriverProxyError> {
        let command = Command {
            name: wire::op::RUN.to_string(),
            args: wire::encode_filter_arg(filter_xml),
        };
        let result = self.agency.dispatch(&self.agent, command, on_event).await?;
        utf8(wire::op::RUN, decode_ok(wire::op::RUN, result)?)
    }

    /// `StopRun(force)`: `force = true` asks the Agency to kill the worker
    /// process directly rather than round-tripping a cooperative request the
    /// driver always rejects (spec §4.G, §8 boundary scenario 5).
    pub async fn stop_run(&self, force: bool) -> Result<(), DriverProxyError> {
        if force {
            self.agency.release_agent(self.agent.clone()).await?;
            return Ok(());
        }

        let command = Command {
            name: wire::op::STOP_RUN.to_string(),
            args: wire::encode_stop_run_args(false),
        };
        let result = self.agency.dispatch(&self.agent, command, |_event| {}).await?;
        decode_ok(wire::op::STOP_RUN, result)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_error_result_becomes_a_remote_error() {
        let err = decode_ok(wire::op::LOAD, CommandResult::Err("bad binary".to_string())).unwrap_err();
        match err {
            DriverProxyError::Remote { operation, reason } => {
                assert_eq!(operation, wire::op::LOAD);
                assert_eq!(reason, "bad binary");
            }
            other => panic!("expected Remote, got {other:?}"),
        }
    }

    #[test]
    fn ok_result_passes_its_payload_through() {
        let payload = decode_ok(wire::op::EXPLORE, CommandResult::Ok(vec![1, 2, 3])).unwrap();
        assert_eq!(payload, vec![1, 2, 3]);
    }

    #[test]
    fn non_utf8_payload_is_a_remote_error() {
        let err = utf8(wire::op::LOAD, vec![0xff, 0xfe]).unwrap_err();
        assert!(matches!(err, DriverProxyError::Remote { .. }));
    }
}
