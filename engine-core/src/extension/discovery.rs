// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Extension discovery (spec §4.C): walks from a root manifest to every
//! candidate assembly, reads each one's declared extension points and
//! extensions, and assembles them into [`ExtensionPoint`]s ready to hand to
//! [`super::registry::ExtensionRegistry`].

use super::manifest::{self, ManifestEntry};
use super::node::{ExtensionFactory, ExtensionNode, ExtensionNodeParams};
use super::point::ExtensionPoint;
use crate::errors::ExtensionLoadError;
use crate::host::HostRuntime;
use crate::runtime_id::RuntimeId;
use camino::{Utf8Path, Utf8PathBuf};
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{debug, warn};

/// A root-registered extension point declared by an assembly (spec §3).
#[derive(Clone, Debug)]
pub struct AssemblyPointDecl {
    /// The point's explicit path, if the declaring attribute supplied one.
    pub path: Option<String>,
    /// The fully-qualified type name extensions at this point must satisfy.
    pub expected_type_name: String,
    /// A human-readable description.
    pub description: String,
}

/// A single type's extension declaration (spec §3, §4.C.4).
#[derive(Clone, Debug)]
pub struct TypeExtensionDecl {
    /// The fully-qualified name of the type carrying the extension marker.
    pub type_name: String,
    /// An explicit path, if one was given on the marker.
    pub path: Option<String>,
    /// The `EngineVersion` the marker declares; discovery skips nodes
    /// declaring a version newer than [`HostRuntime::compatible_engine_version`].
    pub engine_version: (u16, u16),
    /// The runtime this assembly targets, gated against the host's own
    /// runtime (spec §4.C.5).
    pub target_runtime: RuntimeId,
    /// Whether the node should start enabled.
    pub enabled: bool,
    /// A human-readable description.
    pub description: String,
    /// Named properties declared by property markers on the type.
    pub properties: BTreeMap<String, Vec<String>>,
    /// Fully-qualified names of interfaces the type implements, used by
    /// deduction tier 2.
    pub interfaces: Vec<String>,
    /// Fully-qualified names of the type's base types, nearest first, used
    /// by deduction tier 3.
    pub base_types: Vec<String>,
}

/// Everything discovery needs to read from a single assembly.
#[derive(Clone, Debug)]
pub struct AssemblyDecl {
    /// The assembly's four-part version, used for same-name dedup.
    pub version: (u16, u16, u16, u16),
    /// Extension points this assembly registers.
    pub points: Vec<AssemblyPointDecl>,
    /// Extensions this assembly registers.
    pub extensions: Vec<TypeExtensionDecl>,
}

/// Abstracts reading assembly metadata and enumerating candidate assemblies,
/// mirroring [`crate::binary_inspector::BinaryMetadataSource`]: the real
/// implementation reads managed assembly metadata, test fixtures provide
/// deterministic canned data.
pub trait AssemblySource {
    /// Reads the extension declarations carried by the assembly at `path`.
    fn read_assembly_decl(&self, path: &Utf8Path) -> Result<AssemblyDecl, String>;

    /// Lists candidate assembly paths directly inside `dir` (non-recursive).
    fn scan_directory(&self, dir: &Utf8Path) -> Result<Vec<Utf8PathBuf>, String>;

    /// Expands a wildcard glob into the assembly paths it matches.
    fn expand_wildcard(&self, pattern: &Utf8Path) -> Result<Vec<Utf8PathBuf>, String>;

    /// Builds the lazy factory that will materialize `type_name`'s backing
    /// object from `assembly_path`, standing in for the source system's
    /// reflective `Activator.CreateInstance` (spec §4.C "Observable side
    /// effect").
    fn build_factory(&self, assembly_path: &Utf8Path, type_name: &str) -> ExtensionFactory;
}

/// A candidate assembly path together with whether it was reached through a
/// wildcard (which changes read-failure policy, spec §4.C.2).
struct Candidate {
    path: Utf8PathBuf,
    from_wildcard: bool,
}

/// The outcome of a discovery pass: the assembled extension points, plus any
/// non-fatal problems encountered along the way (an explicit node that
/// couldn't be placed, an incompatible target framework) which discovery
/// skips rather than aborting on.
#[derive(Debug, Default)]
pub struct DiscoveryReport {
    /// Extension points discovered, keyed by their unique path.
    pub points: BTreeMap<String, ExtensionPoint>,
    /// Non-fatal problems: nodes that were skipped along with the reason.
    pub skipped: Vec<ExtensionLoadError>,
}

/// Runs discovery starting from the entries in `root_manifest_text` (the
/// contents of the root `.addins` file), gating extensions against `host`,
/// and using `source` to read assembly metadata.
///
/// Returns an error only for failures that make the whole pass unreliable:
/// an explicitly-listed candidate that can't be read, a malformed manifest,
/// or two points claiming the same path. Everything else (an unplaceable
/// node, an incompatible target framework, an unreadable wildcard match) is
/// recorded in [`DiscoveryReport::skipped`] and discovery continues.
pub fn discover(
    source: &dyn AssemblySource,
    root_manifest_text: &str,
    host: &HostRuntime,
) -> Result<DiscoveryReport, ExtensionLoadError> {
    let entries = manifest::parse(root_manifest_text);
    let candidates = collect_candidates(source, &entries)?;

    let mut report = DiscoveryReport::default();
    let mut visited: HashSet<Utf8PathBuf> = HashSet::new();
    let mut best_version_by_name: HashMap<String, (u16, u16, u16, u16)> = HashMap::new();

    for candidate in candidates {
        if !visited.insert(candidate.path.clone()) {
            continue;
        }

        let decl = match source.read_assembly_decl(&candidate.path) {
            Ok(decl) => decl,
            Err(reason) => {
                if candidate.from_wildcard {
                    debug!(path = %candidate.path, %reason, "skipping unreadable wildcard match");
                    continue;
                }
                return Err(ExtensionLoadError::CandidateUnreadable {
                    assembly_path: candidate.path,
                    reason,
                });
            }
        };

        let name = candidate.path.file_stem().unwrap_or_default().to_string();
        if let Some(&best) = best_version_by_name.get(&name) {
            if decl.version <= best {
                debug!(path = %candidate.path, "skipping superseded assembly version");
                continue;
            }
        }
        best_version_by_name.insert(name, decl.version);

        for point_decl in &decl.points {
            let path = point_decl.path.clone().unwrap_or_else(|| point_decl.expected_type_name.clone());
            if report.points.contains_key(&path) {
                return Err(ExtensionLoadError::DuplicateExtensionPoint { path });
            }
            report.points.insert(
                path.clone(),
                ExtensionPoint::new(path, point_decl.expected_type_name.clone(), point_decl.description.clone()),
            );
        }

        for ext in &decl.extensions {
            if let Err(err) = place_extension(source, &candidate.path, &decl, ext, host, &mut report) {
                warn!(type_name = %ext.type_name, %err, "skipping extension");
                report.skipped.push(err);
            }
        }
    }

    Ok(report)
}

/// Resolves a single [`TypeExtensionDecl`] to its extension point (applying
/// the engine-version gate, the target-framework gate, and tiered path
/// deduction) and pushes the resulting [`ExtensionNode`] onto it.
fn place_extension(
    source: &dyn AssemblySource,
    assembly_path: &Utf8Path,
    decl: &AssemblyDecl,
    ext: &TypeExtensionDecl,
    host: &HostRuntime,
    report: &mut DiscoveryReport,
) -> Result<(), ExtensionLoadError> {
    if ext.engine_version > host.compatible_engine_version {
        debug!(type_name = %ext.type_name, "skipping extension declaring a newer engine version");
        return Ok(());
    }

    if !host.runtime.supports(&ext.target_runtime) {
        return Err(ExtensionLoadError::IncompatibleHostFramework {
            type_name: ext.type_name.clone(),
            extension_runtime: ext.target_runtime,
            host_runtime: host.runtime,
        });
    }

    let path = resolve_path(ext, &report.points)?;

    let point = report
        .points
        .get_mut(&path)
        .expect("resolve_path only returns paths present in report.points");

    let factory = source.build_factory(assembly_path, &ext.type_name);
    point.push(ExtensionNode::new(ExtensionNodeParams {
        assembly_path: assembly_path.to_owned(),
        assembly_version: decl.version,
        type_name: ext.type_name.clone(),
        target_runtime: ext.target_runtime,
        enabled: ext.enabled,
        path,
        description: ext.description.clone(),
        properties: ext.properties.clone(),
        factory,
    }));

    Ok(())
}

/// Tiered extension-point deduction (spec §4.C.4): an explicit path wins
/// outright. Otherwise, in order — type identity, implemented interfaces,
/// base types — the first tier with exactly one matching point wins; more
/// than one match within a tier is ambiguous, and no match in any tier means
/// the node has nowhere to go.
fn resolve_path(
    ext: &TypeExtensionDecl,
    points: &BTreeMap<String, ExtensionPoint>,
) -> Result<String, ExtensionLoadError> {
    if let Some(path) = &ext.path {
        return if points.contains_key(path) {
            Ok(path.clone())
        } else {
            Err(ExtensionLoadError::NoExtensionPoint {
                type_name: ext.type_name.clone(),
            })
        };
    }

    let tiers: [&[String]; 2] = [std::slice::from_ref(&ext.type_name), ext.interfaces.as_slice()];
    for tier in tiers {
        let matches: Vec<&String> = points
            .iter()
            .filter(|(_, point)| tier.iter().any(|t| t == point.expected_type_name()))
            .map(|(path, _)| path)
            .collect();
        match matches.len() {
            0 => continue,
            1 => return Ok(matches[0].clone()),
            _ => {
                return Err(ExtensionLoadError::AmbiguousExtensionPoint {
                    type_name: ext.type_name.clone(),
                    candidates: matches.into_iter().cloned().collect(),
                })
            }
        }
    }

    let matches: Vec<&String> = points
        .iter()
        .filter(|(_, point)| ext.base_types.iter().any(|t| t == point.expected_type_name()))
        .map(|(path, _)| path)
        .collect();
    match matches.len() {
        0 => Err(ExtensionLoadError::NoExtensionPoint {
            type_name: ext.type_name.clone(),
        }),
        1 => Ok(matches[0].clone()),
        _ => Err(ExtensionLoadError::AmbiguousExtensionPoint {
            type_name: ext.type_name.clone(),
            candidates: matches.into_iter().cloned().collect(),
        }),
    }
}

/// Expands manifest entries into a flat candidate list, in declaration
/// order, tagging which ones came from a wildcard.
fn collect_candidates(
    source: &dyn AssemblySource,
    entries: &[ManifestEntry],
) -> Result<Vec<Candidate>, ExtensionLoadError> {
    let mut candidates = Vec::new();
    for entry in entries {
        match entry {
            ManifestEntry::Assembly(path) => candidates.push(Candidate {
                path: path.clone(),
                from_wildcard: false,
            }),
            ManifestEntry::Directory(dir) => {
                let paths = source.scan_directory(dir).map_err(|reason| ExtensionLoadError::MalformedManifest {
                    manifest_path: dir.clone(),
                    reason,
                })?;
                candidates.extend(paths.into_iter().map(|path| Candidate {
                    path,
                    from_wildcard: false,
                }));
            }
            ManifestEntry::Wildcard(pattern) => {
                let paths = source
                    .expand_wildcard(pattern)
                    .map_err(|reason| ExtensionLoadError::MalformedManifest {
                        manifest_path: pattern.clone(),
                        reason,
                    })?;
                candidates.extend(paths.into_iter().map(|path| Candidate {
                    path,
                    from_wildcard: true,
                }));
            }
        }
    }
    Ok(candidates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime_id::FrameworkVersion;
    use std::collections::HashMap as StdHashMap;
    use std::sync::Arc;

    struct FixtureSource {
        decls: StdHashMap<Utf8PathBuf, AssemblyDecl>,
        dirs: StdHashMap<Utf8PathBuf, Vec<Utf8PathBuf>>,
    }

    impl AssemblySource for FixtureSource {
        fn read_assembly_decl(&self, path: &Utf8Path) -> Result<AssemblyDecl, String> {
            self.decls.get(path).cloned().ok_or_else(|| "missing fixture".to_string())
        }

        fn scan_directory(&self, dir: &Utf8Path) -> Result<Vec<Utf8PathBuf>, String> {
            Ok(self.dirs.get(dir).cloned().unwrap_or_default())
        }

        fn expand_wildcard(&self, _pattern: &Utf8Path) -> Result<Vec<Utf8PathBuf>, String> {
            Ok(Vec::new())
        }

        fn build_factory(&self, _assembly_path: &Utf8Path, _type_name: &str) -> ExtensionFactory {
            Arc::new(|| Arc::new(()))
        }
    }

    fn host() -> HostRuntime {
        HostRuntime::new(RuntimeId::new(RuntimeFamily::Net, FrameworkVersion { major: 4, minor: 5 }))
    }

    fn basic_decl(point_path: &str, ext_path: Option<&str>) -> AssemblyDecl {
        AssemblyDecl {
            version: (1, 0, 0, 0),
            points: vec![AssemblyPointDecl {
                path: Some(point_path.to_string()),
                expected_type_name: "Engine.ITestRunner".to_string(),
                description: "runners".to_string(),
            }],
            extensions: vec![TypeExtensionDecl {
                type_name: "Plugin.MyRunner".to_string(),
                path: ext_path.map(str::to_string),
                engine_version: (1, 0),
                target_runtime: RuntimeId::new(RuntimeFamily::Net, FrameworkVersion { major: 4, minor: 0 }),
                enabled: true,
                description: "a runner".to_string(),
                properties: BTreeMap::new(),
                interfaces: vec!["Engine.ITestRunner".to_string()],
                base_types: vec![],
            }],
        }
    }

    #[test]
    fn discovers_extension_via_interface_tier() {
        let path: Utf8PathBuf = "/addins/plugin.dll".into();
        let source = FixtureSource {
            decls: StdHashMap::from([(path.clone(), basic_decl("/Engine/Runners", None))]),
            dirs: StdHashMap::new(),
        };
        let report = discover(&source, "addins/plugin.dll", &host()).unwrap();
        assert_eq!(report.points.len(), 1);
        let point = &report.points["/Engine/Runners"];
        assert_eq!(point.extensions().len(), 1);
        assert!(report.skipped.is_empty());
    }

    #[test]
    fn skips_extension_with_incompatible_target_runtime() {
        let path: Utf8PathBuf = "/addins/plugin.dll".into();
        let mut decl = basic_decl("/Engine/Runners", None);
        decl.extensions[0].target_runtime =
            RuntimeId::new(RuntimeFamily::NetCore, FrameworkVersion { major: 3, minor: 1 });
        let source = FixtureSource {
            decls: StdHashMap::from([(path.clone(), decl)]),
            dirs: StdHashMap::new(),
        };
        let report = discover(&source, "addins/plugin.dll", &host()).unwrap();
        assert_eq!(report.points["/Engine/Runners"].extensions().len(), 0);
        assert_eq!(report.skipped.len(), 1);
        assert!(matches!(
            report.skipped[0],
            ExtensionLoadError::IncompatibleHostFramework { .. }
        ));
    }

    #[test]
    fn explicit_candidate_read_failure_is_an_error() {
        let source = FixtureSource {
            decls: StdHashMap::new(),
            dirs: StdHashMap::new(),
        };
        let err = discover(&source, "addins/missing.dll", &host()).unwrap_err();
        assert!(matches!(err, ExtensionLoadError::CandidateUnreadable { .. }));
    }

    #[test]
    fn duplicate_explicit_path_is_rejected() {
        let path1: Utf8PathBuf = "/addins/a.dll".into();
        let path2: Utf8PathBuf = "/addins/b.dll".into();
        let source = FixtureSource {
            decls: StdHashMap::from([
                (path1.clone(), basic_decl("/Engine/Runners", None)),
                (path2.clone(), basic_decl("/Engine/Runners", None)),
            ]),
            dirs: StdHashMap::new(),
        };
        let err = discover(&source, "addins/a.dll\naddins/b.dll", &host()).unwrap_err();
        assert!(matches!(err, ExtensionLoadError::DuplicateExtensionPoint { .. }));
    }

    #[test]
    fn no_matching_tier_is_no_extension_point() {
        let path: Utf8PathBuf = "/addins/plugin.dll".into();
        let mut decl = basic_decl("/Engine/Runners", None);
        decl.extensions[0].interfaces = vec!["Engine.ISomethingElse".to_string()];
        let source = FixtureSource {
            decls: StdHashMap::from([(path.clone(), decl)]),
            dirs: StdHashMap::new(),
        };
        let report = discover(&source, "addins/plugin.dll", &host()).unwrap();
        assert_eq!(report.skipped.len(), 1);
        assert!(matches!(report.skipped[0], ExtensionLoadError::NoExtensionPoint { .. }));
    }

    #[test]
    fn explicit_path_bypasses_deduction() {
        let path: Utf8PathBuf = "/addins/plugin.dll".into();
        let source = FixtureSource {
            decls: StdHashMap::from([(path.clone(), basic_decl("/Engine/Runners", Some("/Engine/Custom")))]),
            dirs: StdHashMap::new(),
        };
        let report = discover(&source, "addins/plugin.dll", &host()).unwrap();
        // The explicit extension path doesn't correspond to any registered
        // point, so it has no home and is skipped rather than placed.
        assert_eq!(report.skipped.len(), 1);
        assert!(matches!(report.skipped[0], ExtensionLoadError::NoExtensionPoint { .. }));
    }
}
