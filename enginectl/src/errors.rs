// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Errors surfaced by the `enginectl` binary itself, on top of whatever
//! [`engine_core::errors::EngineError`] a driven run already produces.

use camino::Utf8PathBuf;
use thiserror::Error;

/// Top-level error type for `enginectl`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CliError {
    /// The command line didn't name a test binary, or named an option this
    /// thinned-down parser doesn't recognize (spec.md §1: full CLI UX is
    /// explicitly out of scope, so this only ever reports a usage line, not
    /// a structured diagnostic).
    #[error("usage: enginectl <test-binary> [--runtime <id>] [--worker <path>] [--package <file>]\n{0}")]
    Usage(String),

    /// A `--package` description file couldn't be read.
    #[error("failed to read package description `{path}`: {source}")]
    PackageFileUnreadable {
        /// Path to the file that failed to read.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A `--package` description file's contents were not a valid
    /// `TestPackage` description.
    #[error("malformed package description `{path}`: {source}")]
    PackageFileMalformed {
        /// Path to the file that failed to parse.
        path: Utf8PathBuf,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// The `--runtime` override wasn't a recognized runtime id.
    #[error("invalid --runtime value: {0}")]
    InvalidRuntime(#[from] engine_core::errors::RuntimeIdParseError),

    /// Driving the run itself failed.
    #[error(transparent)]
    Engine(#[from] engine_core::errors::EngineError),
}
