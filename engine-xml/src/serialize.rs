// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Serialize a [`RunReport`] as NUnit-flavored XML.

use crate::{CaseOutcome, RunReport, TestCase, TestSuite};
use quick_xml::{
    events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event},
    Writer,
};
use std::io;

static TEST_RUN_TAG: &str = "test-run";
static TEST_SUITE_TAG: &str = "test-suite";
static TEST_CASE_TAG: &str = "test-case";
static FAILURE_TAG: &str = "failure";
static MESSAGE_TAG: &str = "message";
static REASON_TAG: &str = "reason";

pub(crate) fn serialize_report(report: &RunReport, writer: impl io::Write) -> quick_xml::Result<()> {
    let mut writer = Writer::new_with_indent(writer, b' ', 4);

    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let counts = report.counts();
    let mut tag = BytesStart::new(TEST_RUN_TAG);
    tag.push_attribute(("name", report.name.as_str()));
    tag.push_attribute(("total", counts.total.to_string().as_str()));
    tag.push_attribute(("passed", counts.passed.to_string().as_str()));
    tag.push_attribute(("failed", counts.failed.to_string().as_str()));
    tag.push_attribute(("warnings", counts.warnings.to_string().as_str()));
    tag.push_attribute(("inconclusive", counts.inconclusive.to_string().as_str()));
    tag.push_attribute(("skipped", counts.skipped.to_string().as_str()));
    if let Some(time) = report.time {
        tag.push_attribute(("duration", format!("{:.3}", time.as_secs_f64()).as_str()));
    }
    writer.write_event(Event::Start(tag))?;

    serialize_suite(&report.root, &mut writer)?;

    writer.write_event(Event::End(BytesEnd::new(TEST_RUN_TAG)))?;
    writer.write_event(Event::Eof)?;

    Ok(())
}

fn serialize_suite(suite: &TestSuite, writer: &mut Writer<impl io::Write>) -> quick_xml::Result<()> {
    let mut tag = BytesStart::new(TEST_SUITE_TAG);
    tag.push_attribute(("name", suite.name.as_str()));
    writer.write_event(Event::Start(tag))?;

    for case in &suite.cases {
        serialize_case(case, writer)?;
    }
    for nested in &suite.suites {
        serialize_suite(nested, writer)?;
    }

    writer.write_event(Event::End(BytesEnd::new(TEST_SUITE_TAG)))
}

fn serialize_case(case: &TestCase, writer: &mut Writer<impl io::Write>) -> quick_xml::Result<()> {
    let mut tag = BytesStart::new(TEST_CASE_TAG);
    tag.push_attribute(("name", case.name.as_str()));
    tag.push_attribute(("result", result_attr(&case.outcome)));
    if let Some(time) = case.time {
        tag.push_attribute(("duration", format!("{:.3}", time.as_secs_f64()).as_str()));
    }

    match &case.outcome {
        CaseOutcome::Passed | CaseOutcome::Inconclusive => {
            writer.write_event(Event::Empty(tag))?;
        }
        CaseOutcome::Failed { message } => {
            writer.write_event(Event::Start(tag))?;
            serialize_message(FAILURE_TAG, message, writer)?;
            writer.write_event(Event::End(BytesEnd::new(TEST_CASE_TAG)))?;
        }
        CaseOutcome::Warning { message } => {
            writer.write_event(Event::Start(tag))?;
            serialize_message(REASON_TAG, message, writer)?;
            writer.write_event(Event::End(BytesEnd::new(TEST_CASE_TAG)))?;
        }
        CaseOutcome::Skipped { reason: Some(reason) } => {
            writer.write_event(Event::Start(tag))?;
            serialize_message(REASON_TAG, reason, writer)?;
            writer.write_event(Event::End(BytesEnd::new(TEST_CASE_TAG)))?;
        }
        CaseOutcome::Skipped { reason: None } => {
            writer.write_event(Event::Empty(tag))?;
        }
    }

    Ok(())
}

fn serialize_message(
    tag_name: &'static str,
    message: &str,
    writer: &mut Writer<impl io::Write>,
) -> quick_xml::Result<()> {
    writer.write_event(Event::Start(BytesStart::new(tag_name)))?;
    writer.write_event(Event::Start(BytesStart::new(MESSAGE_TAG)))?;
    writer.write_event(Event::Text(BytesText::new(message)))?;
    writer.write_event(Event::End(BytesEnd::new(MESSAGE_TAG)))?;
    writer.write_event(Event::End(BytesEnd::new(tag_name)))
}

fn result_attr(outcome: &CaseOutcome) -> &'static str {
    match outcome {
        CaseOutcome::Passed => "Passed",
        CaseOutcome::Failed { .. } => "Failed",
        CaseOutcome::Warning { .. } => "Warning",
        CaseOutcome::Inconclusive => "Inconclusive",
        CaseOutcome::Skipped { .. } => "Skipped",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RunReport;

    #[test]
    fn serializes_a_passed_and_a_failed_case() {
        let mut root = TestSuite::new("root");
        root.add_case(TestCase::new("a", CaseOutcome::Passed));
        root.add_case(TestCase::new(
            "b",
            CaseOutcome::Failed {
                message: "expected 1, got 2".to_string(),
            },
        ));
        let report = RunReport::new("my-run", root);

        let xml = report.to_string().unwrap();
        assert!(xml.contains(r#"name="a" result="Passed""#));
        assert!(xml.contains(r#"name="b" result="Failed""#));
        assert!(xml.contains("expected 1, got 2"));
        assert!(xml.contains(r#"total="2""#));
        assert!(xml.contains(r#"failed="1""#));
    }

    #[test]
    fn escapes_special_characters_in_failure_messages() {
        let mut root = TestSuite::new("root");
        root.add_case(TestCase::new(
            "a",
            CaseOutcome::Failed {
                message: "<expected> & \"actual\"".to_string(),
            },
        ));
        let report = RunReport::new("run", root);
        let xml = report.to_string().unwrap();
        assert!(xml.contains("&lt;expected&gt; &amp;"));
        assert!(!xml.contains("<expected>"));
    }
}
