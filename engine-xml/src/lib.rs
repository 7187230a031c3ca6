// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! `engine-xml` is the run-summary model drivers use to report structured
//! counts back to the controller, and a small reader for the opaque
//! test-tree XML a framework adapter hands back from `Load` (spec §4.G).
//!
//! # Overview
//!
//! A [`RunReport`] is the root of a run summary: one [`TestSuite`] tree of
//! [`TestCase`]s, each with a [`CaseOutcome`]. [`RunReport::counts`] (and
//! [`TestSuite::counts`]) compute the aggregate [`RunCounts`] — the
//! `total`/`passed`/`failed`/`warnings`/`inconclusive`/`skipped` figures the
//! controller surfaces to its caller.
//!
//! [`scan::count_test_cases`] reads a framework's own test-tree XML (an
//! opaque document in whatever dialect that framework speaks) just far
//! enough to count its `test-case` elements, without attempting to
//! understand anything else about it.
//!
//! # Examples
//!
//! ```rust
//! use engine_xml::{CaseOutcome, RunReport, TestCase, TestSuite};
//!
//! let mut root = TestSuite::new("my-test-suite");
//! root.add_case(TestCase::new("passes", CaseOutcome::Passed));
//! root.add_case(TestCase::new(
//!     "fails",
//!     CaseOutcome::Failed { message: "assertion failed".to_string() },
//! ));
//!
//! let report = RunReport::new("my-test-run", root);
//! let counts = report.counts();
//! assert_eq!(counts.total, 2);
//! assert_eq!(counts.failed, 1);
//! ```

mod report;
mod scan;
mod serialize;

pub mod errors;

pub use report::*;
pub use scan::count_test_cases;

// Re-export `quick_xml::Error` and `Result` so it can be used by downstream
// consumers without an explicit `quick-xml` dependency.
#[doc(no_inline)]
pub use quick_xml::{Error, Result};
