// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! [`AgentChannel`]: the controller side of the framed transport (spec §6).
//!
//! Only one command may be outstanding at a time; while waiting for its
//! result, `Event` frames emitted by the agent interleave and are delivered
//! to the caller in emission order, with the `CommandResult` frame always
//! arriving last for that command.

use super::codec::{self, Command, CommandResult};
use super::frame::{Frame, FrameKind};
use crate::errors::TransportError;
use tokio::io::{AsyncRead, AsyncWrite};

/// A bidirectional framed connection to a single agent process.
pub struct AgentChannel<R, W> {
    reader: R,
    writer: W,
}

impl<R, W> AgentChannel<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    /// Wraps a reader/writer pair (typically an agent process's stdout and
    /// stdin) as a framed channel.
    pub fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }

    /// Sends `command` and waits for its result, delivering any interleaved
    /// `Event` frames to `on_event` as they arrive.
    pub async fn send_command(
        &mut self,
        command: &Command,
        mut on_event: impl FnMut(Vec<u8>),
    ) -> Result<CommandResult, TransportError> {
        let frame = Frame::new(FrameKind::Command, codec::encode_command(command));
        frame.write(&mut self.writer).await?;

        loop {
            let frame = Frame::read(&mut self.reader).await?;
            match frame.kind {
                FrameKind::Event => on_event(frame.payload),
                FrameKind::CommandResult => return codec::decode_result(&frame.payload),
                FrameKind::Command | FrameKind::Stop => {
                    return Err(TransportError::MalformedPayload {
                        frame_kind: "CommandResult",
                        reason: "agent sent a Command/Stop frame while a result was expected".to_string(),
                    })
                }
            }
        }
    }

    /// Sends a `Stop` frame. The agent is expected to exit after receiving
    /// this; no response frame follows it.
    pub async fn send_stop(&mut self) -> Result<(), TransportError> {
        Frame::new(FrameKind::Stop, Vec::new()).write(&mut self.writer).await
    }

    /// Reads a single out-of-band `Event` frame without sending a command
    /// first, used while waiting for the agent's initial handshake event.
    pub async fn read_event(&mut self) -> Result<Vec<u8>, TransportError> {
        let frame = Frame::read(&mut self.reader).await?;
        match frame.kind {
            FrameKind::Event => Ok(frame.payload),
            _ => Err(TransportError::MalformedPayload {
                frame_kind: "Event",
                reason: "expected an Event frame".to_string(),
            }),
        }
    }

    /// Sends a handshake `Event` frame, as seen from the agent side, used
    /// once at startup to report `AgentStarted` (spec §4.E).
    pub async fn send_handshake(&mut self, payload: Vec<u8>) -> Result<(), TransportError> {
        Frame::new(FrameKind::Event, payload).write(&mut self.writer).await
    }

    /// Reads the next inbound frame as seen from the agent side of the
    /// channel: either a [`Command`] to dispatch or a request to stop.
    pub async fn recv(&mut self) -> Result<AgentInbound, TransportError> {
        let frame = Frame::read(&mut self.reader).await?;
        match frame.kind {
            FrameKind::Command => Ok(AgentInbound::Command(codec::decode_command(&frame.payload)?)),
            FrameKind::Stop => Ok(AgentInbound::Stop),
            FrameKind::Event | FrameKind::CommandResult => Err(TransportError::MalformedPayload {
                frame_kind: "Command",
                reason: "expected a Command or Stop frame".to_string(),
            }),
        }
    }

    /// Sends an out-of-band `Event` frame, as seen from the agent side,
    /// interleaved ahead of a command's eventual result.
    pub async fn send_event(&mut self, payload: Vec<u8>) -> Result<(), TransportError> {
        Frame::new(FrameKind::Event, payload).write(&mut self.writer).await
    }

    /// Sends a command's result, as seen from the agent side. Always the
    /// last frame of that command's conversation (spec §4.F).
    pub async fn send_result(&mut self, result: &CommandResult) -> Result<(), TransportError> {
        Frame::new(FrameKind::CommandResult, codec::encode_result(result))
            .write(&mut self.writer)
            .await
    }
}

/// An inbound frame as seen from the agent side of a channel: either a
/// command to execute or a request to stop (spec §4.F).
#[derive(Clone, Debug)]
pub enum AgentInbound {
    /// A command the agent should execute and eventually answer with a
    /// [`CommandResult`].
    Command(Command),
    /// A request to stop; the agent is expected to exit after this.
    Stop,
}
