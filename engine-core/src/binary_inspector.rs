// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reads a test binary's metadata without loading it into the host process
//! (spec §4.B): the declared target runtime, the assemblies it references
//! (used to locate its test framework in [`crate::driver`]), and its
//! required bitness.

use crate::errors::BinaryInspectError;
use crate::runtime_id::RuntimeId;
use camino::{Utf8Path, Utf8PathBuf};

/// Platforms the engine explicitly refuses to host (spec §4.B). These are
/// rejected before runtime parsing is even attempted, since they aren't
/// expressible as a [`RuntimeId`] family at all.
const REJECTED_PLATFORMS: &[&str] = &[
    "Silverlight",
    ".NETPortable",
    ".NETStandard",
    ".NETCompactFramework",
];

/// The bitness a binary requires.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Bitness {
    /// No specific bitness is required; the binary runs in either process
    /// type.
    AnyCpu,
    /// The binary requires a 32-bit (x86) process.
    X86,
    /// The binary requires a 64-bit process.
    X64,
}

/// A provider of raw binary metadata, abstracting over how that metadata is
/// actually read (a real assembly-metadata reader in production, a
/// deterministic fixture in tests). The inspector never loads the binary's
/// code, only this declarative metadata — see spec §4.B and the sibling
/// constraint on extension discovery in §4.C.3.
pub trait BinaryMetadataSource {
    /// Returns the platform token declared by the binary (e.g. `.NETFramework,Version=v4.5`,
    /// or one of [`REJECTED_PLATFORMS`]), or an error if the metadata could
    /// not be read at all.
    fn declared_platform(&self, path: &Utf8Path) -> Result<String, String>;

    /// Returns the simple names of every assembly the binary references.
    fn referenced_assemblies(&self, path: &Utf8Path) -> Result<Vec<String>, String>;

    /// Returns the bitness the binary requires.
    fn required_bitness(&self, path: &Utf8Path) -> Result<Bitness, String>;
}

/// The structured report produced by [`inspect`].
#[derive(Clone, Debug)]
pub struct BinaryReport {
    /// Path to the inspected binary.
    pub path: Utf8PathBuf,
    /// The runtime the binary declares it targets.
    pub target_runtime: RuntimeId,
    /// The simple names of every assembly the binary references, used by
    /// [`crate::driver`] to locate a matching test framework.
    pub referenced_assemblies: Vec<String>,
    /// The bitness the binary requires.
    pub bitness: Bitness,
}

impl BinaryReport {
    /// Whether any referenced assembly's simple name case-insensitively
    /// matches `framework_name` (spec §4.G: "locate one matching a known
    /// framework name, case-insensitively").
    pub fn references_framework(&self, framework_name: &str) -> bool {
        self.referenced_assemblies
            .iter()
            .any(|r| r.eq_ignore_ascii_case(framework_name))
    }
}

/// Reads `path`'s metadata via `source` and returns a [`BinaryReport`], or an
/// error if the metadata is unreadable, malformed, or declares a rejected
/// platform (spec §4.B).
pub fn inspect(
    source: &dyn BinaryMetadataSource,
    path: &Utf8Path,
) -> Result<BinaryReport, BinaryInspectError> {
    let platform = source
        .declared_platform(path)
        .map_err(|reason| BinaryInspectError::BadBinary {
            path: path.to_owned(),
            reason,
        })?;

    if let Some(rejected) = REJECTED_PLATFORMS
        .iter()
        .find(|&&p| platform.eq_ignore_ascii_case(p) || platform.starts_with(p))
    {
        return Err(BinaryInspectError::UnsupportedPlatform {
            path: path.to_owned(),
            platform: (*rejected).to_string(),
        });
    }

    let target_runtime =
        parse_platform_token(&platform).map_err(|source| BinaryInspectError::UnsupportedRuntime {
            path: path.to_owned(),
            source,
        })?;

    let referenced_assemblies =
        source
            .referenced_assemblies(path)
            .map_err(|reason| BinaryInspectError::BadBinary {
                path: path.to_owned(),
                reason,
            })?;

    let bitness = source
        .required_bitness(path)
        .map_err(|reason| BinaryInspectError::BadBinary {
            path: path.to_owned(),
            reason,
        })?;

    Ok(BinaryReport {
        path: path.to_owned(),
        target_runtime,
        referenced_assemblies,
        bitness,
    })
}

/// Converts a raw platform token (as read from the binary-level attribute,
/// e.g. `.NETFramework,Version=v4.5` or `.NETCoreApp,Version=v3.1`) into a
/// [`RuntimeId`] by delegating to [`RuntimeId::parse`] on its version suffix.
fn parse_platform_token(platform: &str) -> Result<RuntimeId, crate::errors::RuntimeIdParseError> {
    let version_part = platform
        .rsplit("Version=")
        .next()
        .unwrap_or(platform)
        .trim();

    if platform.starts_with(".NETCoreApp") {
        return RuntimeId::parse(&format!("netcore-{}", version_part.trim_start_matches('v')));
    }
    if platform.starts_with(".NETFramework") {
        return RuntimeId::parse(version_part);
    }
    // Fall back to treating the whole token as a RuntimeId string, covering
    // callers that pass an already-canonical id (useful in tests and for
    // forward-compatible raw inputs).
    RuntimeId::parse(platform)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct FixtureSource {
        platforms: HashMap<Utf8PathBuf, String>,
        references: HashMap<Utf8PathBuf, Vec<String>>,
        bitness: HashMap<Utf8PathBuf, Bitness>,
    }

    impl BinaryMetadataSource for FixtureSource {
        fn declared_platform(&self, path: &Utf8Path) -> Result<String, String> {
            self.platforms
                .get(path)
                .cloned()
                .ok_or_else(|| "no metadata".to_string())
        }

        fn referenced_assemblies(&self, path: &Utf8Path) -> Result<Vec<String>, String> {
            Ok(self.references.get(path).cloned().unwrap_or_default())
        }

        fn required_bitness(&self, path: &Utf8Path) -> Result<Bitness, String> {
            Ok(self.bitness.get(path).copied().unwrap_or(Bitness::AnyCpu))
        }
    }

    fn fixture() -> FixtureSource {
        let path: Utf8PathBuf = "/tests/foo.dll".into();
        FixtureSource {
            platforms: HashMap::from([(path.clone(), ".NETFramework,Version=v4.5".to_string())]),
            references: HashMap::from([(path.clone(), vec!["nunit.framework".to_string()])]),
            bitness: HashMap::from([(path, Bitness::X86)]),
        }
    }

    #[test]
    fn inspects_a_net_framework_binary() {
        let source = fixture();
        let report = inspect(&source, Utf8Path::new("/tests/foo.dll")).unwrap();
        assert_eq!(report.target_runtime.to_string(), "net-4.5");
        assert!(report.references_framework("NUnit.Framework"));
        assert_eq!(report.bitness, Bitness::X86);
    }

    #[test]
    fn rejects_silverlight() {
        let mut source = fixture();
        source
            .platforms
            .insert("/tests/foo.dll".into(), "Silverlight,Version=v5.0".to_string());
        let err = inspect(&source, Utf8Path::new("/tests/foo.dll")).unwrap_err();
        assert!(matches!(err, BinaryInspectError::UnsupportedPlatform { .. }));
    }

    #[test]
    fn rejects_netstandard() {
        let mut source = fixture();
        source
            .platforms
            .insert("/tests/foo.dll".into(), ".NETStandard,Version=v2.0".to_string());
        let err = inspect(&source, Utf8Path::new("/tests/foo.dll")).unwrap_err();
        assert!(matches!(err, BinaryInspectError::UnsupportedPlatform { .. }));
    }

    #[test]
    fn unreadable_metadata_is_bad_binary() {
        let source = fixture();
        let err = inspect(&source, Utf8Path::new("/tests/missing.dll")).unwrap_err();
        assert!(matches!(err, BinaryInspectError::BadBinary { .. }));
    }

    #[test]
    fn parses_netcoreapp_platform_token() {
        let id = parse_platform_token(".NETCoreApp,Version=v3.1").unwrap();
        assert_eq!(id.to_string(), "netcore-3.1");
    }
}
