// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use thiserror::Error;

/// An error that occurs while serializing a [`RunReport`](crate::RunReport).
///
/// Returned by [`RunReport::serialize`](crate::RunReport::serialize) and
/// [`RunReport::to_string`](crate::RunReport::to_string).
#[derive(Debug, Error)]
#[error("error serializing run report")]
pub struct SerializeError {
    #[from]
    inner: quick_xml::Error,
}

/// An error that occurs while scanning a framework's test-tree XML, e.g. to
/// count the `test-case` elements it declares.
#[derive(Debug, Error)]
#[error("error reading test-tree XML: {reason}")]
pub struct ScanError {
    pub(crate) reason: String,
}
