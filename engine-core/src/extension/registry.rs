// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! [`ExtensionRegistry`]: the public surface over discovered extension points
//! and nodes (spec §3, §4.C).

use super::discovery::{self, AssemblySource, DiscoveryReport};
use super::point::ExtensionPoint;
use crate::errors::ExtensionLoadError;
use crate::host::HostRuntime;
use std::any::Any;
use std::collections::BTreeMap;
use std::sync::Arc;

/// The discovered set of extension points and their registered nodes,
/// queryable by path or by expected type.
///
/// Built once at startup via [`ExtensionRegistry::discover`] and shared
/// read-only thereafter; the only interior mutability is per-node (each
/// [`super::node::ExtensionNode`] guards its own `enabled` flag and lazily
/// materialized object).
#[derive(Debug)]
pub struct ExtensionRegistry {
    points: BTreeMap<String, ExtensionPoint>,
    points_by_type: BTreeMap<String, String>,
    skipped: Vec<ExtensionLoadError>,
}

impl ExtensionRegistry {
    /// Runs discovery from `root_manifest_text` using `source`, gating
    /// extensions against `host`, and builds the resulting registry.
    pub fn discover(
        source: &dyn AssemblySource,
        root_manifest_text: &str,
        host: &HostRuntime,
    ) -> Result<Self, ExtensionLoadError> {
        let DiscoveryReport { points, skipped } = discovery::discover(source, root_manifest_text, host)?;
        let points_by_type = points
            .values()
            .map(|point| (point.expected_type_name().to_string(), point.path().to_string()))
            .collect();
        Ok(Self {
            points,
            points_by_type,
            skipped,
        })
    }

    /// Returns the extension point registered at `path`, if any.
    pub fn extension_point(&self, path: &str) -> Option<&ExtensionPoint> {
        self.points.get(path)
    }

    /// Returns the extension point whose expected type is `type_name`, if
    /// any. Each expected type name maps to at most one point, since two
    /// root points declaring the same path are rejected at discovery time;
    /// two points declaring the same expected type but different paths are
    /// permitted and only the most recently discovered is returned here.
    pub fn extension_point_by_type(&self, type_name: &str) -> Option<&ExtensionPoint> {
        self.points_by_type.get(type_name).and_then(|path| self.points.get(path))
    }

    /// Returns every node registered at `path`, or an empty slice if the
    /// path names no known extension point.
    pub fn extension_nodes(&self, path: &str) -> &[super::node::ExtensionNode] {
        self.points.get(path).map(ExtensionPoint::extensions).unwrap_or(&[])
    }

    /// Returns the materialized, enabled extensions at `path` whose backing
    /// object downcasts to `T`, in installation order.
    pub fn extensions<T: Any + Send + Sync>(&self, path: &str) -> Vec<Arc<T>> {
        self.extension_nodes(path)
            .iter()
            .filter(|node| node.is_enabled())
            .filter_map(|node| node.object().downcast::<T>().ok())
            .collect()
    }

    /// Enables or disables every node whose type name is `type_name`,
    /// wherever it's registered. Returns the number of nodes affected.
    pub fn enable_extension(&self, type_name: &str, enabled: bool) -> usize {
        let mut count = 0;
        for point in self.points.values() {
            for node in point.extensions() {
                if node.type_name() == type_name {
                    node.set_enabled(enabled);
                    count += 1;
                }
            }
        }
        count
    }

    /// Every extension point known to the registry, in path order.
    pub fn points(&self) -> impl Iterator<Item = &ExtensionPoint> {
        self.points.values()
    }

    /// Problems encountered during discovery that didn't abort the pass: an
    /// unplaceable node, an incompatible target framework, and the like.
    pub fn skipped(&self) -> &[ExtensionLoadError] {
        &self.skipped
    }
}
