// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use thiserror::Error;

/// An error that occurs while serializing a [`Filter`](crate::Filter) to
/// XML.
#[derive(Debug, Error)]
#[error("error serializing filter")]
pub struct SerializeError {
    #[from]
    inner: quick_xml::Error,
}

/// An error that occurs while parsing a filter XML document back into a
/// [`Filter`](crate::Filter) tree.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The document was not well-formed XML.
    #[error("malformed filter XML")]
    Malformed(#[from] quick_xml::Error),

    /// An element appeared that the filter grammar doesn't recognize.
    #[error("unexpected element `{tag}`")]
    UnexpectedElement {
        /// The offending tag name.
        tag: String,
    },

    /// The document ended before a complete filter tree was read.
    #[error("unexpected end of filter document")]
    UnexpectedEof,
}
