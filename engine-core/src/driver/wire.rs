// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wire encoding for driver operation arguments, carried inside a
//! [`crate::transport::Command`]'s already-length-prefixed `args` list (spec
//! §4.F, §6).
//!
//! Each operation gets its own small encode/decode pair rather than one
//! generic value format, mirroring [`crate::transport::codec`]'s own
//! length-prefixed-field style.

use crate::errors::TransportError;
use crate::package::SettingValue;
use std::collections::BTreeMap;

/// The five operation names (spec §4.G's table), used verbatim as
/// [`crate::transport::Command::name`].
pub mod op {
    /// `Load(binaryPath, settings)`.
    pub const LOAD: &str = "Load";
    /// `CountTestCases(filter)`.
    pub const COUNT_TEST_CASES: &str = "CountTestCases";
    /// `Explore(filter)`.
    pub const EXPLORE: &str = "Explore";
    /// `Run(listener, filter)`.
    pub const RUN: &str = "Run";
    /// `StopRun(force)`.
    pub const STOP_RUN: &str = "StopRun";
}

fn malformed(reason: impl Into<String>) -> TransportError {
    TransportError::MalformedPayload {
        frame_kind: "Command",
        reason: reason.into(),
    }
}

/// Encodes `Load`'s arguments: the binary path, then its settings map.
pub fn encode_load_args(binary_path: &str, settings: &BTreeMap<String, SettingValue>) -> Vec<Vec<u8>> {
    vec![binary_path.as_bytes().to_vec(), encode_settings(settings)]
}

/// Decodes `Load`'s arguments.
pub fn decode_load_args(args: &[Vec<u8>]) -> Result<(String, BTreeMap<String, SettingValue>), TransportError> {
    let [path, settings] = args else {
        return Err(malformed(format!("Load expects 2 args, got {}", args.len())));
    };
    let path = String::from_utf8(path.clone()).map_err(|_| malformed("Load binary path is not valid UTF-8"))?;
    Ok((path, decode_settings(settings)?))
}

/// Encodes `CountTestCases`/`Explore`/`Run`'s single filter-XML argument.
pub fn encode_filter_arg(filter_xml: &str) -> Vec<Vec<u8>> {
    vec![filter_xml.as_bytes().to_vec()]
}

/// Decodes a single filter-XML argument.
pub fn decode_filter_arg(args: &[Vec<u8>]) -> Result<String, TransportError> {
    let [filter_xml] = args else {
        return Err(malformed(format!("expected 1 filter arg, got {}", args.len())));
    };
    String::from_utf8(filter_xml.clone()).map_err(|_| malformed("filter XML is not valid UTF-8"))
}

/// Encodes `StopRun`'s single `force` argument.
pub fn encode_stop_run_args(force: bool) -> Vec<Vec<u8>> {
    vec![vec![u8::from(force)]]
}

/// Decodes `StopRun`'s `force` argument.
pub fn decode_stop_run_args(args: &[Vec<u8>]) -> Result<bool, TransportError> {
    let [force] = args else {
        return Err(malformed(format!("StopRun expects 1 arg, got {}", args.len())));
    };
    match force.as_slice() {
        [0] => Ok(false),
        [1] => Ok(true),
        _ => Err(malformed("StopRun force flag must be a single 0/1 byte")),
    }
}

/// Encodes `CountTestCases`'s successful `usize` result.
pub fn encode_count(count: usize) -> Vec<u8> {
    (count as u64).to_be_bytes().to_vec()
}

/// Decodes `CountTestCases`'s successful result.
pub fn decode_count(payload: &[u8]) -> Result<usize, TransportError> {
    let bytes: [u8; 8] = payload
        .try_into()
        .map_err(|_| malformed("CountTestCases result must be 8 bytes"))?;
    Ok(u64::from_be_bytes(bytes) as usize)
}

const TAG_STR: u8 = 0;
const TAG_INT: u8 = 1;
const TAG_BOOL: u8 = 2;

fn encode_settings(settings: &BTreeMap<String, SettingValue>) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.extend_from_slice(&(settings.len() as u32).to_be_bytes());
    for (name, value) in settings {
        write_len_prefixed(&mut buf, name.as_bytes());
        match value {
            SettingValue::Str(s) => {
                buf.push(TAG_STR);
                write_len_prefixed(&mut buf, s.as_bytes());
            }
            SettingValue::Int(i) => {
                buf.push(TAG_INT);
                buf.extend_from_slice(&i.to_be_bytes());
            }
            SettingValue::Bool(b) => {
                buf.push(TAG_BOOL);
                buf.push(u8::from(*b));
            }
        }
    }
    buf
}

fn decode_settings(bytes: &[u8]) -> Result<BTreeMap<String, SettingValue>, TransportError> {
    let mut cursor = 0usize;
    let count = read_u32(bytes, &mut cursor)?;
    let mut settings = BTreeMap::new();
    for _ in 0..count {
        let name_bytes = read_len_prefixed(bytes, &mut cursor)?;
        let name = String::from_utf8(name_bytes.to_vec()).map_err(|_| malformed("setting name is not valid UTF-8"))?;
        let tag = *bytes.get(cursor).ok_or_else(|| malformed("truncated setting tag"))?;
        cursor += 1;
        let value = match tag {
            TAG_STR => {
                let s = read_len_prefixed(bytes, &mut cursor)?;
                SettingValue::Str(String::from_utf8(s.to_vec()).map_err(|_| malformed("setting value is not valid UTF-8"))?)
            }
            TAG_INT => {
                let int_bytes: [u8; 8] = bytes
                    .get(cursor..cursor + 8)
                    .ok_or_else(|| malformed("truncated int setting value"))?
                    .try_into()
                    .expect("slice is exactly 8 bytes");
                cursor += 8;
                SettingValue::Int(i64::from_be_bytes(int_bytes))
            }
            TAG_BOOL => {
                let b = *bytes.get(cursor).ok_or_else(|| malformed("truncated bool setting value"))?;
                cursor += 1;
                SettingValue::Bool(b != 0)
            }
            other => return Err(malformed(format!("unrecognized setting tag {other}"))),
        };
        settings.insert(name, value);
    }
    Ok(settings)
}

fn write_len_prefixed(buf: &mut Vec<u8>, bytes: &[u8]) {
    buf.extend_from_slice(&(bytes.len() as u32).to_be_bytes());
    buf.extend_from_slice(bytes);
}

fn read_u32(buf: &[u8], cursor: &mut usize) -> Result<u32, TransportError> {
    let bytes: [u8; 4] = buf
        .get(*cursor..*cursor + 4)
        .ok_or_else(|| malformed("truncated length prefix"))?
        .try_into()
        .expect("slice is exactly 4 bytes");
    *cursor += 4;
    Ok(u32::from_be_bytes(bytes))
}

fn read_len_prefixed<'a>(buf: &'a [u8], cursor: &mut usize) -> Result<&'a [u8], TransportError> {
    let len = read_u32(buf, cursor)? as usize;
    let data = buf
        .get(*cursor..*cursor + len)
        .ok_or_else(|| malformed("truncated payload data"))?;
    *cursor += len;
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_load_args_with_mixed_setting_types() {
        let mut settings = BTreeMap::new();
        settings.insert("DebugTests".to_string(), SettingValue::Bool(true));
        settings.insert("InternalTraceLevel".to_string(), SettingValue::Int(3));
        settings.insert("WorkDirectory".to_string(), SettingValue::Str("/tmp/work".to_string()));

        let args = encode_load_args("/tests/foo.dll", &settings);
        let (path, decoded) = decode_load_args(&args).unwrap();
        assert_eq!(path, "/tests/foo.dll");
        assert_eq!(decoded, settings);
    }

    #[test]
    fn round_trips_a_filter_arg() {
        let args = encode_filter_arg("<filter><test>x</test></filter>");
        assert_eq!(decode_filter_arg(&args).unwrap(), "<filter><test>x</test></filter>");
    }

    #[test]
    fn round_trips_stop_run_force_flag() {
        assert!(decode_stop_run_args(&encode_stop_run_args(true)).unwrap());
        assert!(!decode_stop_run_args(&encode_stop_run_args(false)).unwrap());
    }

    #[test]
    fn round_trips_a_count_result() {
        assert_eq!(decode_count(&encode_count(42)).unwrap(), 42);
    }

    #[test]
    fn wrong_arg_count_is_malformed() {
        let err = decode_filter_arg(&[]).unwrap_err();
        assert!(matches!(err, TransportError::MalformedPayload { .. }));
    }
}
