// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The wire frame format (spec §6): `[u32 big-endian length][u8 kind][payload]`.

use crate::errors::TransportError;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// The maximum frame payload length the engine will accept before treating
/// the declared length as stream corruption rather than a legitimately large
/// payload.
pub const MAX_FRAME_LEN: u32 = 64 * 1024 * 1024;

/// What kind of frame a [`Frame`] carries.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FrameKind {
    /// A command sent from the controller to an agent.
    Command,
    /// The result of a previously-sent command, sent from an agent back to
    /// the controller. Always the last frame in a command's conversation.
    CommandResult,
    /// An out-of-band event emitted by the agent (e.g. a test result as it
    /// completes), which may interleave with a command's eventual result.
    Event,
    /// A request to stop, sent from the controller to an agent.
    Stop,
}

impl FrameKind {
    fn to_byte(self) -> u8 {
        match self {
            Self::Command => 0,
            Self::CommandResult => 1,
            Self::Event => 2,
            Self::Stop => 3,
        }
    }

    fn from_byte(byte: u8) -> Result<Self, TransportError> {
        match byte {
            0 => Ok(Self::Command),
            1 => Ok(Self::CommandResult),
            2 => Ok(Self::Event),
            3 => Ok(Self::Stop),
            _ => Err(TransportError::UnrecognizedKind { byte }),
        }
    }
}

/// A single frame: a kind tag and an opaque payload. Encoding of the
/// payload's contents is the concern of [`super::codec`]; this type only
/// knows how to get bytes on and off the wire.
#[derive(Clone, Debug)]
pub struct Frame {
    /// The frame's kind.
    pub kind: FrameKind,
    /// The frame's raw payload bytes.
    pub payload: Vec<u8>,
}

impl Frame {
    /// Builds a frame of the given kind carrying `payload`.
    pub fn new(kind: FrameKind, payload: Vec<u8>) -> Self {
        Self { kind, payload }
    }

    /// Writes this frame to `writer`.
    pub async fn write<W: AsyncWrite + Unpin>(&self, writer: &mut W) -> Result<(), TransportError> {
        let len = u32::try_from(self.payload.len()).map_err(|_| TransportError::FrameTooLarge {
            len: u32::MAX,
            max: MAX_FRAME_LEN,
        })?;
        if len > MAX_FRAME_LEN {
            return Err(TransportError::FrameTooLarge { len, max: MAX_FRAME_LEN });
        }
        writer.write_u32(len).await?;
        writer.write_u8(self.kind.to_byte()).await?;
        writer.write_all(&self.payload).await?;
        writer.flush().await?;
        Ok(())
    }

    /// Reads a single frame from `reader`, or returns
    /// [`TransportError::ConnectionClosed`] if the stream ends before a
    /// complete frame is available.
    pub async fn read<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Self, TransportError> {
        let len = match reader.read_u32().await {
            Ok(len) => len,
            Err(err) if err.kind() == std::io::ErrorKind::UnexpectedEof => {
                return Err(TransportError::ConnectionClosed)
            }
            Err(err) => return Err(TransportError::Io(err)),
        };
        if len > MAX_FRAME_LEN {
            return Err(TransportError::FrameTooLarge { len, max: MAX_FRAME_LEN });
        }
        let kind = FrameKind::from_byte(reader.read_u8().await?)?;
        let mut payload = vec![0u8; len as usize];
        reader.read_exact(&mut payload).await?;
        Ok(Self { kind, payload })
    }
}
