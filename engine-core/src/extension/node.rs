// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! [`ExtensionNode`]: a registered plugin, lazily materialized on first use.

use crate::runtime_id::RuntimeId;
use camino::Utf8PathBuf;
use std::any::Any;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

/// Constructs the backing plugin object for an [`ExtensionNode`], passing no
/// arguments — the Rust stand-in for "instantiate the type with a default
/// constructor" (spec §4.C "Observable side effect").
pub type ExtensionFactory = Arc<dyn Fn() -> Arc<dyn Any + Send + Sync> + Send + Sync>;

/// A registered plugin (spec §3). The backing object is materialized at most
/// once, lazily, on first call to [`ExtensionNode::object`]; subsequent
/// calls return the same cached instance.
pub struct ExtensionNode {
    assembly_path: Utf8PathBuf,
    assembly_version: (u16, u16, u16, u16),
    type_name: String,
    target_runtime: RuntimeId,
    enabled: Mutex<bool>,
    path: String,
    description: String,
    properties: BTreeMap<String, Vec<String>>,
    factory: ExtensionFactory,
    materialized: Mutex<Option<Arc<dyn Any + Send + Sync>>>,
}

impl std::fmt::Debug for ExtensionNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtensionNode")
            .field("assembly_path", &self.assembly_path)
            .field("type_name", &self.type_name)
            .field("path", &self.path)
            .field("enabled", &*self.enabled.lock().unwrap())
            .finish()
    }
}

/// Parameters needed to construct an [`ExtensionNode`], grouped so that
/// [`ExtensionNode::new`] doesn't take an unreadable wall of positional
/// arguments.
pub struct ExtensionNodeParams {
    /// Path to the assembly that declared this node.
    pub assembly_path: Utf8PathBuf,
    /// The declaring assembly's four-part version.
    pub assembly_version: (u16, u16, u16, u16),
    /// The fully-qualified type name carrying the extension marker.
    pub type_name: String,
    /// The runtime the declaring assembly targets.
    pub target_runtime: RuntimeId,
    /// Whether the node starts enabled (the marker's `Enabled` argument
    /// defaults to `true`, per spec §3).
    pub enabled: bool,
    /// The node's resolved path (explicit, or deduced per spec §4.C.4).
    pub path: String,
    /// A human-readable description.
    pub description: String,
    /// Named properties declared by property markers on the type.
    pub properties: BTreeMap<String, Vec<String>>,
    /// Constructs the backing plugin object on first access.
    pub factory: ExtensionFactory,
}

impl ExtensionNode {
    pub(crate) fn new(params: ExtensionNodeParams) -> Self {
        Self {
            assembly_path: params.assembly_path,
            assembly_version: params.assembly_version,
            type_name: params.type_name,
            target_runtime: params.target_runtime,
            enabled: Mutex::new(params.enabled),
            path: params.path,
            description: params.description,
            properties: params.properties,
            factory: params.factory,
            materialized: Mutex::new(None),
        }
    }

    /// Path to the assembly that declared this node.
    pub fn assembly_path(&self) -> &Utf8PathBuf {
        &self.assembly_path
    }

    /// The declaring assembly's four-part version.
    pub fn assembly_version(&self) -> (u16, u16, u16, u16) {
        self.assembly_version
    }

    /// The fully-qualified type name carrying the extension marker.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// The runtime the declaring assembly targets.
    pub fn target_runtime(&self) -> RuntimeId {
        self.target_runtime
    }

    /// Whether this node is currently enabled.
    pub fn is_enabled(&self) -> bool {
        *self.enabled.lock().unwrap()
    }

    /// Sets this node's enabled flag. Idempotent: calling it twice with the
    /// same value has the same observable effect as calling it once (spec
    /// §8 law).
    pub fn set_enabled(&self, enabled: bool) {
        *self.enabled.lock().unwrap() = enabled;
    }

    /// This node's resolved path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// A human-readable description.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Named properties declared by property markers on the type.
    pub fn properties(&self) -> &BTreeMap<String, Vec<String>> {
        &self.properties
    }

    /// Returns the backing plugin object, materializing it on first access
    /// and caching it for every subsequent call (spec §3, §4.C).
    pub fn object(&self) -> Arc<dyn Any + Send + Sync> {
        let mut slot = self.materialized.lock().unwrap();
        if let Some(obj) = slot.as_ref() {
            return Arc::clone(obj);
        }
        let obj = (self.factory)();
        *slot = Some(Arc::clone(&obj));
        obj
    }

    /// Whether the backing object has already been materialized.
    pub fn is_materialized(&self) -> bool {
        self.materialized.lock().unwrap().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime_id::{FrameworkVersion, RuntimeFamily};

    fn test_node(factory_calls: Arc<Mutex<u32>>) -> ExtensionNode {
        let calls = Arc::clone(&factory_calls);
        ExtensionNode::new(ExtensionNodeParams {
            assembly_path: "/addins/plugin.dll".into(),
            assembly_version: (1, 0, 0, 0),
            type_name: "Plugin.MyExtension".to_string(),
            target_runtime: RuntimeId::new(RuntimeFamily::Net, FrameworkVersion { major: 4, minor: 5 }),
            enabled: true,
            path: "/Engine/TypeExtensions/MyExtension".to_string(),
            description: "test node".to_string(),
            properties: BTreeMap::new(),
            factory: Arc::new(move || {
                *calls.lock().unwrap() += 1;
                Arc::new(42i32)
            }),
        })
    }

    #[test]
    fn materializes_lazily_and_caches() {
        let calls = Arc::new(Mutex::new(0));
        let node = test_node(Arc::clone(&calls));
        assert!(!node.is_materialized());
        assert_eq!(*calls.lock().unwrap(), 0);

        let first = node.object();
        assert_eq!(*calls.lock().unwrap(), 1);
        assert!(node.is_materialized());

        let second = node.object();
        assert_eq!(*calls.lock().unwrap(), 1, "factory must run at most once");
        assert!(Arc::ptr_eq(&first, &second), "same cached identity on every access");
    }

    #[test]
    fn enable_toggle_is_idempotent() {
        let node = test_node(Arc::new(Mutex::new(0)));
        node.set_enabled(true);
        node.set_enabled(true);
        assert!(node.is_enabled());
        node.set_enabled(false);
        assert!(!node.is_enabled());
    }
}
