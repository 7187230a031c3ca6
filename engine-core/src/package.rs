// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The [`TestPackage`] data model (spec §3): a request to execute one or
//! more test binaries, either a leaf (a single binary path) or an aggregate
//! (an ordered list of sub-packages), carrying settings that inherit from
//! parent to child unless overridden.

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// A recognized setting name, with a typed accessor on [`TestPackage`].
///
/// Unrecognized setting names are still stored (in [`TestPackage::settings`])
/// and can be looked up by raw string; this enum only exists to give the
/// well-known settings a typo-proof name and a documented meaning.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub enum RecognizedSetting {
    /// The runtime the binary was built against, as a [`RuntimeId`](crate::runtime_id::RuntimeId) string.
    TargetRuntimeFramework,
    /// The image's declared target framework name (raw, pre-normalization).
    ImageTargetFrameworkName,
    /// The assembly reference the image declares for its test framework.
    ImageTestFrameworkReference,
    /// Whether the image requires the x86 subsystem.
    ImageRequiresX86,
    /// Whether the agent should be launched as an x86 process regardless of
    /// host bitness.
    RunAsX86,
    /// Whether the worker should pause for a debugger to attach to the test
    /// process.
    DebugTests,
    /// Whether the worker should pause for a debugger to attach to the agent
    /// itself, before loading the binary.
    DebugAgent,
    /// The internal trace verbosity level passed to the worker.
    InternalTraceLevel,
    /// Whether the worker should load the user's OS profile.
    LoadUserProfile,
    /// The working directory the worker process should run in.
    WorkDirectory,
    /// Whether non-test assemblies (no recognized framework reference)
    /// should be skipped rather than failing discovery.
    SkipNonTestAssemblies,
}

impl RecognizedSetting {
    /// The raw setting-name string this variant corresponds to.
    pub const fn name(self) -> &'static str {
        match self {
            Self::TargetRuntimeFramework => "TargetRuntimeFramework",
            Self::ImageTargetFrameworkName => "ImageTargetFrameworkName",
            Self::ImageTestFrameworkReference => "ImageTestFrameworkReference",
            Self::ImageRequiresX86 => "ImageRequiresX86",
            Self::RunAsX86 => "RunAsX86",
            Self::DebugTests => "DebugTests",
            Self::DebugAgent => "DebugAgent",
            Self::InternalTraceLevel => "InternalTraceLevel",
            Self::LoadUserProfile => "LoadUserProfile",
            Self::WorkDirectory => "WorkDirectory",
            Self::SkipNonTestAssemblies => "SkipNonTestAssemblies",
        }
    }
}

/// A scalar setting value. Settings are untyped strings over the wire (spec
/// §3 says "scalar value"); this is the concrete representation the engine
/// uses in memory, with conversions for the common cases callers need
/// (`TargetRuntimeFramework` as a string, `DebugTests` as a bool, trace level
/// as an int).
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettingValue {
    /// A string value.
    Str(String),
    /// An integer value.
    Int(i64),
    /// A boolean value.
    Bool(bool),
}

impl SettingValue {
    /// Returns the value as a string slice, if it is a [`SettingValue::Str`].
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the value as a bool, if it is a [`SettingValue::Bool`].
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the value as an int, if it is a [`SettingValue::Int`].
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }
}

impl From<&str> for SettingValue {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for SettingValue {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<bool> for SettingValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for SettingValue {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

/// The body of a [`TestPackage`]: either a single binary path (a leaf) or an
/// ordered list of sub-packages (an aggregate). Spec §3's invariant — "a
/// package is either a leaf or an aggregate" — is enforced by construction:
/// there is no way to build a `TestPackage` with both a path and children.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PackageKind {
    /// A leaf package naming a single binary to load.
    Leaf {
        /// Path to the compiled test binary.
        path: Utf8PathBuf,
    },
    /// An aggregate package grouping an ordered list of sub-packages.
    Aggregate {
        /// The sub-packages, in declaration order.
        children: Vec<TestPackage>,
    },
}

/// A request to execute one or more test binaries (spec §3).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TestPackage {
    #[serde(default = "Uuid::new_v4")]
    id: Uuid,
    #[serde(flatten)]
    kind: PackageKind,
    #[serde(default)]
    settings: BTreeMap<String, SettingValue>,
}

impl TestPackage {
    /// Creates a new leaf package naming a single binary.
    pub fn leaf(path: impl Into<Utf8PathBuf>) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind: PackageKind::Leaf { path: path.into() },
            settings: BTreeMap::new(),
        }
    }

    /// Creates a new aggregate package grouping the given sub-packages.
    pub fn aggregate(children: Vec<TestPackage>) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind: PackageKind::Aggregate { children },
            settings: BTreeMap::new(),
        }
    }

    /// This package's unique identifier.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// The path of a leaf package, or `None` for an aggregate.
    pub fn path(&self) -> Option<&camino::Utf8Path> {
        match &self.kind {
            PackageKind::Leaf { path } => Some(path),
            PackageKind::Aggregate { .. } => None,
        }
    }

    /// The sub-packages of an aggregate package, or `None` for a leaf.
    pub fn children(&self) -> Option<&[TestPackage]> {
        match &self.kind {
            PackageKind::Leaf { .. } => None,
            PackageKind::Aggregate { children } => Some(children),
        }
    }

    /// Whether this package is a leaf (has a path, no sub-packages).
    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, PackageKind::Leaf { .. })
    }

    /// Sets a setting by recognized name, builder-style.
    pub fn with_setting(mut self, setting: RecognizedSetting, value: impl Into<SettingValue>) -> Self {
        self.settings.insert(setting.name().to_string(), value.into());
        self
    }

    /// Sets a setting by raw name, builder-style. Unrecognized names are
    /// tolerated (spec §9 notes the source system is forward-compatible with
    /// settings it doesn't know about).
    pub fn with_raw_setting(mut self, name: impl Into<String>, value: impl Into<SettingValue>) -> Self {
        self.settings.insert(name.into(), value.into());
        self
    }

    /// Looks up a recognized setting on this package only (no inheritance).
    pub fn setting(&self, setting: RecognizedSetting) -> Option<&SettingValue> {
        self.settings.get(setting.name())
    }

    /// Looks up a setting by raw name on this package only (no inheritance).
    pub fn raw_setting(&self, name: &str) -> Option<&SettingValue> {
        self.settings.get(name)
    }

    /// Resolves a setting by walking from `self` down through `ancestors` in
    /// order (nearest ancestor first), per spec §3: "Settings inherit from
    /// parent to child unless overridden." Call as
    /// `child.resolve_setting(setting, &[parent, grandparent])`.
    pub fn resolve_setting<'a>(
        &'a self,
        setting: RecognizedSetting,
        ancestors: &'a [&'a TestPackage],
    ) -> Option<&'a SettingValue> {
        if let Some(v) = self.setting(setting) {
            return Some(v);
        }
        ancestors.iter().find_map(|a| a.setting(setting))
    }
}

/// Walks a `TestPackage` tree, yielding every leaf package along with the
/// chain of ancestor packages needed to resolve inherited settings.
///
/// This is the concrete mechanism behind spec §3's settings-inheritance
/// invariant: rather than eagerly flattening settings onto every leaf at
/// construction time (which would let a parent mutation silently desync from
/// its children), inheritance is resolved lazily at the point of use via the
/// ancestor chain this iterator hands back.
pub fn leaves_with_ancestors(root: &TestPackage) -> Vec<(&TestPackage, Vec<&TestPackage>)> {
    let mut out = Vec::new();
    walk(root, &mut Vec::new(), &mut out);
    out
}

fn walk<'a>(
    pkg: &'a TestPackage,
    ancestors: &mut Vec<&'a TestPackage>,
    out: &mut Vec<(&'a TestPackage, Vec<&'a TestPackage>)>,
) {
    match &pkg.kind {
        PackageKind::Leaf { .. } => {
            out.push((pkg, ancestors.clone()));
        }
        PackageKind::Aggregate { children } => {
            ancestors.push(pkg);
            for child in children {
                walk(child, ancestors, out);
            }
            ancestors.pop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leaf_has_path_and_no_children() {
        let pkg = TestPackage::leaf("/tests/foo.dll");
        assert!(pkg.is_leaf());
        assert_eq!(pkg.path().unwrap().as_str(), "/tests/foo.dll");
        assert!(pkg.children().is_none());
    }

    #[test]
    fn aggregate_has_children_and_no_path() {
        let child = TestPackage::leaf("/tests/foo.dll");
        let pkg = TestPackage::aggregate(vec![child]);
        assert!(!pkg.is_leaf());
        assert!(pkg.path().is_none());
        assert_eq!(pkg.children().unwrap().len(), 1);
    }

    #[test]
    fn settings_inherit_unless_overridden() {
        let child = TestPackage::leaf("/tests/foo.dll")
            .with_setting(RecognizedSetting::DebugTests, true);
        let parent = TestPackage::aggregate(vec![child.clone()])
            .with_setting(RecognizedSetting::TargetRuntimeFramework, "net-4.5")
            .with_setting(RecognizedSetting::DebugTests, false);

        // The child's own setting wins over the parent's.
        assert_eq!(
            child.resolve_setting(RecognizedSetting::DebugTests, &[&parent]),
            Some(&SettingValue::Bool(true))
        );
        // The child inherits a setting it didn't override.
        assert_eq!(
            child
                .resolve_setting(RecognizedSetting::TargetRuntimeFramework, &[&parent])
                .and_then(SettingValue::as_str),
            Some("net-4.5")
        );
    }

    #[test]
    fn leaf_package_deserializes_from_a_description_file() {
        let json = r#"{
            "leaf": { "path": "/tests/fixture.dll" },
            "settings": { "TargetRuntimeFramework": {"str": "net-5.0"} }
        }"#;
        let pkg: TestPackage = serde_json::from_str(json).expect("parses");
        assert!(pkg.is_leaf());
        assert_eq!(pkg.path().unwrap().as_str(), "/tests/fixture.dll");
        assert_eq!(
            pkg.setting(RecognizedSetting::TargetRuntimeFramework).and_then(SettingValue::as_str),
            Some("net-5.0")
        );
    }

    #[test]
    fn leaves_with_ancestors_walks_nested_aggregates() {
        let a = TestPackage::leaf("/tests/a.dll");
        let b = TestPackage::leaf("/tests/b.dll");
        let inner = TestPackage::aggregate(vec![a, b]).with_setting(RecognizedSetting::WorkDirectory, "/inner");
        let root = TestPackage::aggregate(vec![inner]).with_setting(RecognizedSetting::WorkDirectory, "/root");

        let leaves = leaves_with_ancestors(&root);
        assert_eq!(leaves.len(), 2);
        for (leaf, ancestors) in &leaves {
            assert!(leaf.is_leaf());
            assert_eq!(ancestors.len(), 2);
            assert_eq!(
                leaf.resolve_setting(RecognizedSetting::WorkDirectory, ancestors)
                    .and_then(SettingValue::as_str),
                Some("/inner")
            );
        }
    }
}
