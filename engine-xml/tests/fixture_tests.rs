// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use engine_xml::{CaseOutcome, RunReport, TestCase, TestSuite};
use pretty_assertions::assert_eq;
use std::time::Duration;

#[test]
fn serializes_a_mixed_outcome_report() {
    let mut root = TestSuite::new("MyAssembly.dll");

    let mut fixture = TestSuite::new("MyAssembly.Tests.CalculatorTests");
    fixture.add_case({
        let mut case = TestCase::new("Add_ReturnsSum", CaseOutcome::Passed);
        case.set_time(Duration::from_millis(5));
        case
    });
    fixture.add_case(TestCase::new(
        "Divide_ByZero_Throws",
        CaseOutcome::Failed {
            message: "expected DivideByZeroException, got nothing".to_string(),
        },
    ));
    fixture.add_case(TestCase::new(
        "Skipped_OnCi",
        CaseOutcome::Skipped {
            reason: Some("requires a display".to_string()),
        },
    ));
    root.add_suite(fixture);

    let report = RunReport::new("MyAssembly", root);
    let counts = report.counts();
    assert_eq!(counts.total, 3);
    assert_eq!(counts.passed, 1);
    assert_eq!(counts.failed, 1);
    assert_eq!(counts.skipped, 1);

    let xml = report.to_string().expect("serializes");
    assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
    assert!(xml.contains(
        r#"<test-run name="MyAssembly" total="3" passed="1" failed="1" warnings="0" inconclusive="0" skipped="1">"#
    ));
    assert!(xml.contains("Add_ReturnsSum"));
    assert!(xml.contains("expected DivideByZeroException"));
    assert!(xml.contains("requires a display"));
}

#[test]
fn all_skipped_shortcut_round_trips_through_the_xml_scanner() {
    let report = RunReport::all_skipped("MyAssembly", 12, "no tests matched the filter");
    let xml = report.to_string().expect("serializes");
    assert_eq!(engine_xml::count_test_cases(&xml).expect("scans"), 12);
}
