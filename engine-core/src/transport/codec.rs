// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Payload encoding for `Command` and `CommandResult` frames (spec §6).
//!
//! A command payload is its name followed by its argument list, each
//! length-prefixed. A result payload is a single `ok` byte followed by
//! either a success payload or an error message, both length-prefixed.

use crate::errors::TransportError;

/// A command sent from the controller to an agent: a named operation plus
/// its (already-serialized) arguments.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Command {
    /// The operation name, e.g. `Load`, `CountTestCases`, `Run`.
    pub name: String,
    /// Serialized arguments, in declaration order.
    pub args: Vec<Vec<u8>>,
}

/// The outcome of a command, reported back by the agent.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum CommandResult {
    /// The command succeeded, carrying its (already-serialized) return value.
    Ok(Vec<u8>),
    /// The command failed; the agent reports a human-readable reason.
    Err(String),
}

fn write_len_prefixed(buf: &mut Vec<u8>, bytes: &[u8]) {
    buf.extend_from_slice(&(bytes.len() as u32).to_be_bytes());
    buf.extend_from_slice(bytes);
}

fn read_len_prefixed<'a>(
    buf: &'a [u8],
    cursor: &mut usize,
    frame_kind: &'static str,
) -> Result<&'a [u8], TransportError> {
    let len_bytes = buf
        .get(*cursor..*cursor + 4)
        .ok_or_else(|| TransportError::MalformedPayload {
            frame_kind,
            reason: "truncated length prefix".to_string(),
        })?;
    let len = u32::from_be_bytes(len_bytes.try_into().expect("slice is exactly 4 bytes")) as usize;
    *cursor += 4;
    let data = buf
        .get(*cursor..*cursor + len)
        .ok_or_else(|| TransportError::MalformedPayload {
            frame_kind,
            reason: "truncated payload data".to_string(),
        })?;
    *cursor += len;
    Ok(data)
}

/// Encodes a [`Command`] into a `Command` frame payload.
pub fn encode_command(command: &Command) -> Vec<u8> {
    let mut buf = Vec::new();
    write_len_prefixed(&mut buf, command.name.as_bytes());
    buf.extend_from_slice(&(command.args.len() as u32).to_be_bytes());
    for arg in &command.args {
        write_len_prefixed(&mut buf, arg);
    }
    buf
}

/// Decodes a `Command` frame payload into a [`Command`].
pub fn decode_command(payload: &[u8]) -> Result<Command, TransportError> {
    let mut cursor = 0;
    let name_bytes = read_len_prefixed(payload, &mut cursor, "Command")?;
    let name = String::from_utf8(name_bytes.to_vec()).map_err(|_| TransportError::MalformedPayload {
        frame_kind: "Command",
        reason: "command name is not valid UTF-8".to_string(),
    })?;

    let count_bytes = payload
        .get(cursor..cursor + 4)
        .ok_or_else(|| TransportError::MalformedPayload {
            frame_kind: "Command",
            reason: "truncated argument count".to_string(),
        })?;
    let count = u32::from_be_bytes(count_bytes.try_into().expect("slice is exactly 4 bytes"));
    cursor += 4;

    let mut args = Vec::with_capacity(count as usize);
    for _ in 0..count {
        args.push(read_len_prefixed(payload, &mut cursor, "Command")?.to_vec());
    }

    Ok(Command { name, args })
}

/// Encodes a [`CommandResult`] into a `CommandResult` frame payload.
pub fn encode_result(result: &CommandResult) -> Vec<u8> {
    let mut buf = Vec::new();
    match result {
        CommandResult::Ok(payload) => {
            buf.push(1);
            write_len_prefixed(&mut buf, payload);
        }
        CommandResult::Err(message) => {
            buf.push(0);
            write_len_prefixed(&mut buf, message.as_bytes());
        }
    }
    buf
}

/// Decodes a `CommandResult` frame payload into a [`CommandResult`].
pub fn decode_result(payload: &[u8]) -> Result<CommandResult, TransportError> {
    let ok_byte = *payload.first().ok_or_else(|| TransportError::MalformedPayload {
        frame_kind: "CommandResult",
        reason: "empty payload".to_string(),
    })?;
    let mut cursor = 1;
    let data = read_len_prefixed(payload, &mut cursor, "CommandResult")?;
    match ok_byte {
        1 => Ok(CommandResult::Ok(data.to_vec())),
        0 => {
            let message = String::from_utf8(data.to_vec()).map_err(|_| TransportError::MalformedPayload {
                frame_kind: "CommandResult",
                reason: "error message is not valid UTF-8".to_string(),
            })?;
            Ok(CommandResult::Err(message))
        }
        other => Err(TransportError::MalformedPayload {
            frame_kind: "CommandResult",
            reason: format!("unrecognized ok byte {other}"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_command_with_multiple_args() {
        let command = Command {
            name: "Run".to_string(),
            args: vec![b"filter-xml".to_vec(), b"settings".to_vec()],
        };
        let decoded = decode_command(&encode_command(&command)).unwrap();
        assert_eq!(decoded, command);
    }

    #[test]
    fn round_trips_a_command_with_no_args() {
        let command = Command {
            name: "CountTestCases".to_string(),
            args: vec![],
        };
        let decoded = decode_command(&encode_command(&command)).unwrap();
        assert_eq!(decoded, command);
    }

    #[test]
    fn round_trips_an_ok_result() {
        let result = CommandResult::Ok(b"42".to_vec());
        assert_eq!(decode_result(&encode_result(&result)).unwrap(), result);
    }

    #[test]
    fn round_trips_an_err_result() {
        let result = CommandResult::Err("framework exploded".to_string());
        assert_eq!(decode_result(&encode_result(&result)).unwrap(), result);
    }

    #[test]
    fn truncated_command_payload_is_malformed() {
        let err = decode_command(&[0, 0, 0, 5, b'h', b'i']).unwrap_err();
        assert!(matches!(err, TransportError::MalformedPayload { frame_kind: "Command", .. }));
    }
}
