// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! [`ExtensionPoint`]: a named slot identified by a unique path string.

use super::node::ExtensionNode;

/// A named extension point (spec §3). Paths are unique across the registry;
/// [`super::registry::ExtensionRegistry`] enforces that at discovery time.
#[derive(Debug)]
pub struct ExtensionPoint {
    path: String,
    expected_type_name: String,
    description: String,
    extensions: Vec<ExtensionNode>,
}

impl ExtensionPoint {
    pub(crate) fn new(
        path: impl Into<String>,
        expected_type_name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            expected_type_name: expected_type_name.into(),
            description: description.into(),
            extensions: Vec::new(),
        }
    }

    /// This extension point's unique path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The fully-qualified name of the type extensions at this point must
    /// implement or derive from.
    pub fn expected_type_name(&self) -> &str {
        &self.expected_type_name
    }

    /// A human-readable description.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// The extensions registered at this point, in installation order.
    pub fn extensions(&self) -> &[ExtensionNode] {
        &self.extensions
    }

    pub(crate) fn push(&mut self, node: ExtensionNode) {
        self.extensions.push(node);
    }
}
