// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Counting `test-case` elements in a framework-supplied test-tree XML
//! document, without needing to understand the rest of its shape.
//!
//! A driver's `Load` result is an opaque XML tree in whatever dialect the
//! underlying framework speaks (spec §4.G); the engine never parses it for
//! meaning, but `CountTestCases` and the filter-excludes shortcut both need
//! a bare count of leaf test cases, which is dialect-agnostic: every
//! framework we support names its leaf element `test-case`.

use crate::errors::ScanError;
use quick_xml::events::Event;
use quick_xml::reader::Reader;

/// Counts the number of `<test-case ...>` (or self-closing `<test-case .../>`)
/// elements in `xml`, at any nesting depth.
pub fn count_test_cases(xml: &str) -> Result<usize, ScanError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut count = 0;
    loop {
        match reader.read_event() {
            Ok(Event::Start(tag)) | Ok(Event::Empty(tag)) => {
                if tag.local_name().as_ref() == b"test-case" {
                    count += 1;
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(err) => {
                return Err(ScanError {
                    reason: err.to_string(),
                })
            }
        }
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_nested_test_cases() {
        let xml = r#"<test-suite name="root">
            <test-suite name="fixture">
                <test-case name="a" />
                <test-case name="b"><properties/></test-case>
            </test-suite>
            <test-case name="c" />
        </test-suite>"#;
        assert_eq!(count_test_cases(xml).unwrap(), 3);
    }

    #[test]
    fn empty_tree_has_no_cases() {
        let xml = r#"<test-suite name="root"></test-suite>"#;
        assert_eq!(count_test_cases(xml).unwrap(), 0);
    }

    #[test]
    fn malformed_xml_is_an_error() {
        let xml = "<test-suite><test-case";
        assert!(count_test_cases(xml).is_err());
    }
}
