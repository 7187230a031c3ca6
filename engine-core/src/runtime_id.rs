// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Parsing and matching of runtime identifiers.
//!
//! A [`RuntimeId`] is the canonical tag the engine uses everywhere it needs
//! to reason about "what managed runtime does this binary want, and what can
//! a given agent launcher host": `TargetRuntimeFramework` package settings,
//! [`AgentLauncher`](crate::agent::launcher::AgentLauncher) capability
//! checks, and the extension registry's target-framework compatibility gate
//! all speak this type.

use crate::errors::RuntimeIdParseError;
use std::fmt;

/// The broad kind of managed runtime a [`RuntimeId`] refers to.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum RuntimeFamily {
    /// The .NET Framework (desktop CLR).
    Net,
    /// .NET Core / modern .NET (5+).
    NetCore,
    /// Mono.
    Mono,
    /// A wildcard family that matches any concrete family.
    Any,
}

impl RuntimeFamily {
    fn as_str(self) -> &'static str {
        match self {
            Self::Net => "net",
            Self::NetCore => "netcore",
            Self::Mono => "mono",
            Self::Any => "any",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "net" => Some(Self::Net),
            "netcore" => Some(Self::NetCore),
            "mono" => Some(Self::Mono),
            "any" => Some(Self::Any),
            _ => None,
        }
    }
}

impl fmt::Display for RuntimeFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A two-component `major.minor` version, used both for the "framework
/// version" (e.g. `net-4.5`) and, internally, for CLR versions which are
/// stored as three components via [`ClrVersion`].
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Default)]
pub struct FrameworkVersion {
    /// Major version component.
    pub major: i32,
    /// Minor version component.
    pub minor: i32,
}

impl FrameworkVersion {
    /// The zero version, used by [`RuntimeId::any_version`].
    pub const ZERO: Self = Self { major: 0, minor: 0 };

    fn is_zero(self) -> bool {
        self.major == 0 && self.minor == 0
    }
}

impl fmt::Display for FrameworkVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// A three-component CLR version, e.g. `4.0.30319`.
///
/// Components that are negative are treated as "don't care" by
/// [`RuntimeId::supports`] (spec §4.A): this is how a `RuntimeId` parsed from
/// a bare framework version (which has no CLR version at all) still
/// participates in the supports relation.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct ClrVersion {
    /// Major version component, or negative if unspecified.
    pub major: i32,
    /// Minor version component, or negative if unspecified.
    pub minor: i32,
    /// Build version component, or negative if unspecified.
    pub build: i32,
}

impl ClrVersion {
    /// A CLR version with every component unspecified.
    pub const UNSPECIFIED: Self = Self {
        major: -1,
        minor: -1,
        build: -1,
    };

    fn matches(self, other: Self) -> bool {
        Self::component_matches(self.major, other.major)
            && Self::component_matches(self.minor, other.minor)
            && Self::component_matches(self.build, other.build)
    }

    fn component_matches(a: i32, b: i32) -> bool {
        a < 0 || b < 0 || a == b
    }
}

impl fmt::Display for ClrVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.build)
    }
}

/// The canonical runtime identifier: `<family>-<major>.<minor>`.
///
/// Carries both the declared framework version and the CLR version it maps
/// to (spec §4.A), since the two are needed for different comparisons: the
/// framework version drives "is this new enough" checks, while the CLR
/// version is what some legacy launchers actually gate on.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct RuntimeId {
    family: RuntimeFamily,
    framework: FrameworkVersion,
    clr: ClrVersion,
}

impl RuntimeId {
    /// Creates a `RuntimeId` directly from its parts, computing the CLR
    /// version from the family/framework mapping table.
    pub fn new(family: RuntimeFamily, framework: FrameworkVersion) -> Self {
        let clr = clr_for(family, framework);
        Self {
            family,
            framework,
            clr,
        }
    }

    /// The wildcard id that matches every concrete id (spec §3, §8).
    pub fn any() -> Self {
        Self::new(RuntimeFamily::Any, FrameworkVersion::ZERO)
    }

    /// The runtime family.
    pub fn family(&self) -> RuntimeFamily {
        self.family
    }

    /// The framework version.
    pub fn framework_version(&self) -> FrameworkVersion {
        self.framework
    }

    /// The CLR version this id maps to.
    pub fn clr_version(&self) -> ClrVersion {
        self.clr
    }

    fn is_any_version(&self) -> bool {
        self.family == RuntimeFamily::Any || self.framework.is_zero()
    }

    /// Parses one of the three accepted input shapes (spec §4.A):
    ///
    /// - a bare family name, e.g. `"net"` (any version)
    /// - a `v`-prefixed version, e.g. `"v4.5"` (family defaults to `net`)
    /// - a hyphenated `family-version`, e.g. `"net-4.0"` or `"netcore-3.1"`
    ///
    /// A version with three dotted components is treated as a CLR version
    /// and mapped back to a framework version; two components are a
    /// framework version directly.
    pub fn parse(input: &str) -> Result<Self, RuntimeIdParseError> {
        if let Some(rest) = input.strip_prefix('v') {
            return Self::parse_family_and_version(input, RuntimeFamily::Net, rest);
        }

        if let Some((family_str, version_str)) = input.split_once('-') {
            let family = RuntimeFamily::parse(family_str).ok_or_else(|| {
                RuntimeIdParseError::UnsupportedRuntime {
                    input: input.to_string(),
                    family: family_str.to_string(),
                }
            })?;
            return Self::parse_family_and_version(input, family, version_str);
        }

        let family = RuntimeFamily::parse(input).ok_or_else(|| {
            RuntimeIdParseError::UnsupportedRuntime {
                input: input.to_string(),
                family: input.to_string(),
            }
        })?;
        Ok(Self::new(family, FrameworkVersion::ZERO))
    }

    fn parse_family_and_version(
        input: &str,
        family: RuntimeFamily,
        version_str: &str,
    ) -> Result<Self, RuntimeIdParseError> {
        let parts: Vec<&str> = version_str.split('.').collect();
        let parse_component = |s: &str| -> Result<i32, RuntimeIdParseError> {
            s.parse::<i32>()
                .map_err(|_| RuntimeIdParseError::MalformedVersion {
                    input: input.to_string(),
                    version: version_str.to_string(),
                })
        };

        match parts.as_slice() {
            [major, minor] => {
                let framework = FrameworkVersion {
                    major: parse_component(major)?,
                    minor: parse_component(minor)?,
                };
                Ok(Self::new(family, framework))
            }
            [major, minor, build] => {
                let clr = ClrVersion {
                    major: parse_component(major)?,
                    minor: parse_component(minor)?,
                    build: parse_component(build)?,
                };
                let framework = framework_for_clr(family, clr).unwrap_or(FrameworkVersion::ZERO);
                Ok(Self {
                    family,
                    framework,
                    clr,
                })
            }
            _ => Err(RuntimeIdParseError::MalformedVersion {
                input: input.to_string(),
                version: version_str.to_string(),
            }),
        }
    }

    /// Whether `self` supports running a binary that targets `other` (spec
    /// §4.A). Reflexive, but neither symmetric nor antisymmetric.
    pub fn supports(&self, other: &Self) -> bool {
        let family_matches =
            self.family == other.family || self.family == RuntimeFamily::Any || other.family == RuntimeFamily::Any;
        if !family_matches {
            return false;
        }

        if self.is_any_version() || other.is_any_version() {
            return true;
        }

        let framework_ok = self.framework.major >= other.framework.major
            && self.framework.minor >= other.framework.minor;
        framework_ok && self.clr.matches(other.clr)
    }
}

impl fmt::Display for RuntimeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.family, self.framework)
    }
}

/// Maps a `(family, framework version)` pair to its CLR version, per the
/// per-family tables in spec §4.A. `netcore` passes the framework version
/// through unchanged (there is no separate CLR numbering scheme).
fn clr_for(family: RuntimeFamily, framework: FrameworkVersion) -> ClrVersion {
    match family {
        RuntimeFamily::Net => {
            if framework.major >= 4 {
                ClrVersion {
                    major: 4,
                    minor: 0,
                    build: 30319,
                }
            } else if framework.major == 2 || framework.major == 3 {
                ClrVersion {
                    major: 2,
                    minor: 0,
                    build: 50727,
                }
            } else {
                ClrVersion::UNSPECIFIED
            }
        }
        RuntimeFamily::NetCore => ClrVersion {
            major: framework.major,
            minor: framework.minor,
            build: -1,
        },
        RuntimeFamily::Mono | RuntimeFamily::Any => ClrVersion::UNSPECIFIED,
    }
}

/// The inverse of [`clr_for`]: recovers the framework version that a
/// three-component CLR version corresponds to, for the `vX.Y.Z` / hyphenated
/// three-component input shape.
fn framework_for_clr(family: RuntimeFamily, clr: ClrVersion) -> Option<FrameworkVersion> {
    match family {
        RuntimeFamily::Net => match (clr.major, clr.minor, clr.build) {
            (2, 0, 50727) => Some(FrameworkVersion { major: 2, minor: 0 }),
            (4, 0, 30319) => Some(FrameworkVersion { major: 4, minor: 0 }),
            _ => None,
        },
        RuntimeFamily::NetCore => Some(FrameworkVersion {
            major: clr.major,
            minor: clr.minor,
        }),
        RuntimeFamily::Mono | RuntimeFamily::Any => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn net(major: i32, minor: i32) -> RuntimeId {
        RuntimeId::new(RuntimeFamily::Net, FrameworkVersion { major, minor })
    }

    fn netcore(major: i32, minor: i32) -> RuntimeId {
        RuntimeId::new(RuntimeFamily::NetCore, FrameworkVersion { major, minor })
    }

    #[test]
    fn parses_bare_family() {
        let id = RuntimeId::parse("net").unwrap();
        assert_eq!(id.family(), RuntimeFamily::Net);
        assert_eq!(id.framework_version(), FrameworkVersion::ZERO);
    }

    #[test]
    fn parses_v_prefixed() {
        let id = RuntimeId::parse("v4.5").unwrap();
        assert_eq!(id.family(), RuntimeFamily::Net);
        assert_eq!(id.framework_version(), FrameworkVersion { major: 4, minor: 5 });
    }

    #[test]
    fn parses_hyphenated() {
        let id = RuntimeId::parse("netcore-3.1").unwrap();
        assert_eq!(id.family(), RuntimeFamily::NetCore);
        assert_eq!(id.framework_version(), FrameworkVersion { major: 3, minor: 1 });
    }

    #[test]
    fn parses_three_component_clr_version() {
        let id = RuntimeId::parse("net-4.0.30319").unwrap();
        assert_eq!(id.framework_version(), FrameworkVersion { major: 4, minor: 0 });
        assert_eq!(
            id.clr_version(),
            ClrVersion {
                major: 4,
                minor: 0,
                build: 30319
            }
        );
    }

    #[test]
    fn unknown_family_is_unsupported_runtime() {
        let err = RuntimeId::parse("silverlight-4.0").unwrap_err();
        assert!(matches!(err, RuntimeIdParseError::UnsupportedRuntime { .. }));
    }

    #[test]
    fn supports_is_reflexive() {
        for id in [net(2, 0), net(4, 5), netcore(3, 1), RuntimeId::any()] {
            assert!(id.supports(&id));
        }
    }

    #[test]
    fn any_family_supports_and_is_supported_by_everything() {
        let any = RuntimeId::any();
        let concrete = net(4, 5);
        assert!(any.supports(&concrete));
        assert!(concrete.supports(&any));
    }

    #[test]
    fn newer_framework_supports_older() {
        assert!(net(4, 5).supports(&net(4, 0)));
        assert!(!net(4, 0).supports(&net(4, 5)));
    }

    #[test]
    fn different_concrete_families_do_not_support_each_other() {
        assert!(!net(4, 5).supports(&netcore(3, 1)));
    }

    #[test]
    fn round_trips_through_display_and_parse() {
        for id in [net(2, 0), net(4, 5), netcore(3, 1)] {
            let reparsed = RuntimeId::parse(&id.to_string()).unwrap();
            assert_eq!(reparsed.family(), id.family());
            assert_eq!(reparsed.framework_version(), id.framework_version());
        }
    }

    #[test]
    fn clr_components_ignore_negative_on_either_side() {
        let a = net(4, 5);
        let b = RuntimeId {
            family: RuntimeFamily::Net,
            framework: FrameworkVersion { major: 4, minor: 5 },
            clr: ClrVersion {
                major: 4,
                minor: -1,
                build: -1,
            },
        };
        assert!(a.supports(&b));
        assert!(b.supports(&a));
    }
}
