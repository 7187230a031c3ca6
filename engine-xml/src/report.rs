// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::serialize::serialize_report;
use std::{io, time::Duration};

/// The root element of a run report: an NUnit-flavored summary of the test
/// cases executed (or skipped) by a single driver `Run` (spec §4.G, §8
/// boundary scenario 6).
///
/// A report's counts are always the recursive aggregate of its `root` suite's
/// cases, computed on demand rather than tracked incrementally, so a caller
/// building a tree bottom-up can never observe a stale total.
#[derive(Clone, Debug)]
pub struct RunReport {
    /// The name of the run, typically the test package's display name.
    pub name: String,

    /// The overall time taken, if known.
    pub time: Option<Duration>,

    /// The top-level suite. A report with no cases at all is represented as
    /// an empty root suite, not an absent one.
    pub root: TestSuite,
}

impl RunReport {
    /// Creates a new, empty report rooted at `root`.
    pub fn new(name: impl Into<String>, root: TestSuite) -> Self {
        Self {
            name: name.into(),
            time: None,
            root,
        }
    }

    /// Sets the overall time taken.
    pub fn set_time(&mut self, time: Duration) -> &mut Self {
        self.time = Some(time);
        self
    }

    /// Builds a synthetic report in which every one of `total` test cases is
    /// reported skipped, with no further structure. This is the shape the
    /// driver's filter-excludes shortcut produces (spec §4.G): when a filter
    /// selects nothing, the framework is never invoked and this report
    /// stands in for its would-be result.
    pub fn all_skipped(name: impl Into<String>, total: u32, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        let mut root = TestSuite::new("excluded-by-filter");
        for index in 0..total {
            root.add_case(TestCase::new(
                format!("excluded-{index}"),
                CaseOutcome::Skipped {
                    reason: Some(reason.clone()),
                },
            ));
        }
        Self::new(name, root)
    }

    /// The recursive aggregate counts across every suite and case in this
    /// report.
    pub fn counts(&self) -> RunCounts {
        self.root.counts()
    }

    /// Serializes this report to `writer` as NUnit-style XML.
    pub fn serialize(&self, writer: impl io::Write) -> quick_xml::Result<()> {
        serialize_report(self, writer)
    }

    /// Serializes this report to a `String`.
    pub fn to_string(&self) -> quick_xml::Result<String> {
        let mut buf: Vec<u8> = Vec::new();
        self.serialize(&mut buf)?;
        String::from_utf8(buf).map_err(|err| quick_xml::Error::Utf8(err.utf8_error()))
    }
}

/// A group of test cases and nested suites, mirroring a framework's own
/// suite/fixture hierarchy (spec §4.G: the driver reports whatever structure
/// the underlying framework produced, not a structure the engine invents).
#[derive(Clone, Debug, Default)]
pub struct TestSuite {
    /// The name of this suite.
    pub name: String,
    /// Leaf test cases directly under this suite.
    pub cases: Vec<TestCase>,
    /// Nested suites.
    pub suites: Vec<TestSuite>,
}

impl TestSuite {
    /// Creates a new, empty suite.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cases: Vec::new(),
            suites: Vec::new(),
        }
    }

    /// Adds a test case to this suite.
    pub fn add_case(&mut self, case: TestCase) -> &mut Self {
        self.cases.push(case);
        self
    }

    /// Adds a nested suite.
    pub fn add_suite(&mut self, suite: TestSuite) -> &mut Self {
        self.suites.push(suite);
        self
    }

    /// The recursive aggregate counts across this suite and all its
    /// descendants.
    pub fn counts(&self) -> RunCounts {
        let mut counts = RunCounts::default();
        for case in &self.cases {
            counts.add_case(&case.outcome);
        }
        for suite in &self.suites {
            counts = counts.combine(suite.counts());
        }
        counts
    }
}

/// A single executed (or skipped) test.
#[derive(Clone, Debug)]
pub struct TestCase {
    /// The name of this test case.
    pub name: String,
    /// The time it took to execute, if known. Always `None` for a skipped
    /// case.
    pub time: Option<Duration>,
    /// The outcome of this case.
    pub outcome: CaseOutcome,
}

impl TestCase {
    /// Creates a new test case with the given outcome.
    pub fn new(name: impl Into<String>, outcome: CaseOutcome) -> Self {
        Self {
            name: name.into(),
            time: None,
            outcome,
        }
    }

    /// Sets the time taken to execute this case.
    pub fn set_time(&mut self, time: Duration) -> &mut Self {
        self.time = Some(time);
        self
    }
}

/// The outcome of a single test case, following NUnit's four-way result plus
/// skip (spec §4.G: `total/passed/failed/warnings/inconclusive/skipped`).
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum CaseOutcome {
    /// The test passed.
    Passed,
    /// The test failed an assertion or raised an unhandled exception.
    Failed {
        /// A human-readable failure message.
        message: String,
    },
    /// The test passed, but reported a non-fatal warning.
    Warning {
        /// A human-readable warning message.
        message: String,
    },
    /// The test ran but its result is inconclusive, e.g. an assumption
    /// failed.
    Inconclusive,
    /// The test was not run.
    Skipped {
        /// Why the test was skipped, if known.
        reason: Option<String>,
    },
}

/// The recursive aggregate of a report or suite's test case outcomes.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct RunCounts {
    /// Total test cases counted.
    pub total: u32,
    pub passed: u32,
    pub failed: u32,
    pub warnings: u32,
    pub inconclusive: u32,
    pub skipped: u32,
}

impl RunCounts {
    fn add_case(&mut self, outcome: &CaseOutcome) {
        self.total += 1;
        match outcome {
            CaseOutcome::Passed => self.passed += 1,
            CaseOutcome::Failed { .. } => self.failed += 1,
            CaseOutcome::Warning { .. } => self.warnings += 1,
            CaseOutcome::Inconclusive => self.inconclusive += 1,
            CaseOutcome::Skipped { .. } => self.skipped += 1,
        }
    }

    fn combine(self, other: RunCounts) -> RunCounts {
        RunCounts {
            total: self.total + other.total,
            passed: self.passed + other.passed,
            failed: self.failed + other.failed,
            warnings: self.warnings + other.warnings,
            inconclusive: self.inconclusive + other.inconclusive,
            skipped: self.skipped + other.skipped,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_aggregate_recursively_through_nested_suites() {
        let mut root = TestSuite::new("root");
        root.add_case(TestCase::new("a", CaseOutcome::Passed));
        root.add_case(TestCase::new(
            "b",
            CaseOutcome::Failed {
                message: "boom".to_string(),
            },
        ));

        let mut nested = TestSuite::new("nested");
        nested.add_case(TestCase::new("c", CaseOutcome::Inconclusive));
        nested.add_case(TestCase::new("d", CaseOutcome::Skipped { reason: None }));
        root.add_suite(nested);

        let counts = root.counts();
        assert_eq!(
            counts,
            RunCounts {
                total: 4,
                passed: 1,
                failed: 1,
                warnings: 0,
                inconclusive: 1,
                skipped: 1,
            }
        );
    }

    #[test]
    fn all_skipped_reports_every_case_as_skipped() {
        let report = RunReport::all_skipped("my-run", 3, "excluded by filter");
        let counts = report.counts();
        assert_eq!(counts.total, 3);
        assert_eq!(counts.skipped, 3);
        assert_eq!(counts.passed, 0);
    }

    /// Builds a suite with exactly `passed` passed cases, `failed` failed
    /// cases, `warnings` warning cases, `inconclusive` inconclusive cases,
    /// and `skipped` skipped cases, in that order, named by outcome and
    /// index so two suites built from different tallies never collide.
    fn suite_with_tally(
        name: &str,
        passed: u32,
        failed: u32,
        warnings: u32,
        inconclusive: u32,
        skipped: u32,
    ) -> TestSuite {
        let mut suite = TestSuite::new(name);
        for i in 0..passed {
            suite.add_case(TestCase::new(format!("Passed{i}"), CaseOutcome::Passed));
        }
        for i in 0..failed {
            suite.add_case(TestCase::new(
                format!("Failed{i}"),
                CaseOutcome::Failed {
                    message: "assertion failed".to_string(),
                },
            ));
        }
        for i in 0..warnings {
            suite.add_case(TestCase::new(
                format!("Warning{i}"),
                CaseOutcome::Warning {
                    message: "deprecated assertion used".to_string(),
                },
            ));
        }
        for i in 0..inconclusive {
            suite.add_case(TestCase::new(format!("Inconclusive{i}"), CaseOutcome::Inconclusive));
        }
        for i in 0..skipped {
            suite.add_case(TestCase::new(
                format!("Skipped{i}"),
                CaseOutcome::Skipped { reason: None },
            ));
        }
        suite
    }

    /// Spec §8 boundary scenario 6, pinned exactly: running the reference
    /// mock binary under `net-4.5` yields
    /// Total=31/Passed=18/Failed=5/Warnings=0/Inconclusive=1/Skipped=7;
    /// under `netcore-2.1` it yields
    /// Total=36/Passed=23/Failed=5/Warnings=1/Inconclusive=1/Skipped=7.
    #[test]
    fn boundary_scenario_6_reference_binary_counts() {
        let net45 = RunReport::new("net-4.5", suite_with_tally("MockBinary", 18, 5, 0, 1, 7));
        assert_eq!(
            net45.counts(),
            RunCounts {
                total: 31,
                passed: 18,
                failed: 5,
                warnings: 0,
                inconclusive: 1,
                skipped: 7,
            }
        );

        let netcore21 = RunReport::new("netcore-2.1", suite_with_tally("MockBinary", 23, 5, 1, 1, 7));
        assert_eq!(
            netcore21.counts(),
            RunCounts {
                total: 36,
                passed: 23,
                failed: 5,
                warnings: 1,
                inconclusive: 1,
                skipped: 7,
            }
        );
    }
}
