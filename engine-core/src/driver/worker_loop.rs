// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The in-worker dispatch loop: reads [`Command`]/`Stop` frames off an
//! [`AgentChannel`], drives a single [`DriverContext`], and answers with
//! [`CommandResult`] frames, forwarding `Run`'s progress payloads as
//! interleaved `Event` frames (spec §4.F, §4.G, §5 "the driver is never
//! re-entered").

use super::context::DriverContext;
use super::wire::{self, op};
use crate::binary_inspector::{self, BinaryMetadataSource};
use crate::errors::TransportError;
use crate::transport::{AgentChannel, AgentInbound, Command, CommandResult};
use camino::Utf8Path;
use engine_filter::Filter;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{info, warn};

/// Runs the dispatch loop to completion: returns `Ok(())` once a `Stop`
/// frame is received, or an error if the channel itself fails. Individual
/// command failures never end the loop; they're reported as
/// `CommandResult::Err` and the loop continues.
pub async fn run<R, W>(
    channel: &mut AgentChannel<R, W>,
    source: &dyn BinaryMetadataSource,
    display_name: impl Into<String>,
) -> Result<(), TransportError>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    let mut ctx = DriverContext::new(display_name);

    loop {
        match channel.recv().await? {
            AgentInbound::Stop => {
                info!("received Stop, exiting dispatch loop");
                return Ok(());
            }
            AgentInbound::Command(command) => {
                let result = dispatch(&mut ctx, source, &command, channel).await;
                channel.send_result(&result).await?;
            }
        }
    }
}

async fn dispatch<R, W>(
    ctx: &mut DriverContext,
    source: &dyn BinaryMetadataSource,
    command: &Command,
    channel: &mut AgentChannel<R, W>,
) -> CommandResult
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    match command.name.as_str() {
        op::LOAD => load(ctx, source, &command.args),
        op::COUNT_TEST_CASES => count_test_cases(ctx, &command.args),
        op::EXPLORE => explore(ctx, &command.args),
        op::RUN => run_command(ctx, &command.args, channel).await,
        op::STOP_RUN => stop_run(ctx, &command.args),
        other => CommandResult::Err(format!("unrecognized operation `{other}`")),
    }
}

fn load(ctx: &mut DriverContext, source: &dyn BinaryMetadataSource, args: &[Vec<u8>]) -> CommandResult {
    let (path, settings) = match wire::decode_load_args(args) {
        Ok(decoded) => decoded,
        Err(err) => return CommandResult::Err(err.to_string()),
    };
    let report = match binary_inspector::inspect(source, Utf8Path::new(&path)) {
        Ok(report) => report,
        Err(err) => return CommandResult::Err(err.to_string()),
    };
    match ctx.load(&report, settings) {
        Ok(tree_xml) => CommandResult::Ok(tree_xml.into_bytes()),
        Err(err) => CommandResult::Err(err.to_string()),
    }
}

fn count_test_cases(ctx: &DriverContext, args: &[Vec<u8>]) -> CommandResult {
    let filter_xml = match wire::decode_filter_arg(args) {
        Ok(xml) => xml,
        Err(err) => return CommandResult::Err(err.to_string()),
    };
    match ctx.count_test_cases(&filter_xml) {
        Ok(count) => CommandResult::Ok(wire::encode_count(count)),
        Err(err) => CommandResult::Err(err.to_string()),
    }
}

fn explore(ctx: &DriverContext, args: &[Vec<u8>]) -> CommandResult {
    let filter_xml = match wire::decode_filter_arg(args) {
        Ok(xml) => xml,
        Err(err) => return CommandResult::Err(err.to_string()),
    };
    match ctx.explore(&filter_xml) {
        Ok(xml) => CommandResult::Ok(xml.into_bytes()),
        Err(err) => CommandResult::Err(err.to_string()),
    }
}

async fn run_command<R, W>(ctx: &mut DriverContext, args: &[Vec<u8>], channel: &mut AgentChannel<R, W>) -> CommandResult
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    let filter_xml = match wire::decode_filter_arg(args) {
        Ok(xml) => xml,
        Err(err) => return CommandResult::Err(err.to_string()),
    };
    let filter = match Filter::from_xml(&filter_xml) {
        Ok(filter) => filter,
        Err(err) => return CommandResult::Err(err.to_string()),
    };

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let run_fut = ctx.run(&filter, tx);
    tokio::pin!(run_fut);

    let result = loop {
        tokio::select! {
            biased;
            result = &mut run_fut => {
                while let Ok(payload) = rx.try_recv() {
                    if let Err(err) = channel.send_event(payload).await {
                        warn!(%err, "failed to forward a trailing Run progress event");
                    }
                }
                break result;
            }
            Some(payload) = rx.recv() => {
                if let Err(err) = channel.send_event(payload).await {
                    warn!(%err, "failed to forward a Run progress event");
                }
            }
        }
    };

    match result {
        Ok(xml) => CommandResult::Ok(xml.into_bytes()),
        Err(err) => CommandResult::Err(err.to_string()),
    }
}

fn stop_run(ctx: &mut DriverContext, args: &[Vec<u8>]) -> CommandResult {
    let force = match wire::decode_stop_run_args(args) {
        Ok(force) => force,
        Err(err) => return CommandResult::Err(err.to_string()),
    };
    match ctx.stop_run(force) {
        Ok(()) => CommandResult::Ok(Vec::new()),
        Err(err) => CommandResult::Err(err.to_string()),
    }
}
