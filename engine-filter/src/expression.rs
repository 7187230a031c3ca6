// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The filter expression tree and its XML wire form (spec §4.G, §8 boundary
//! scenarios 3–4).
//!
//! A filter is opaque to the engine except for well-formedness: it only
//! needs to build one from a set of selected test names (and optionally a
//! nested where-clause), serialize it to the XML a driver passes through to
//! its framework adapter, and recognize the case where it selects nothing at
//! all (the filter-excludes shortcut, spec §4.G).

use crate::errors::{ParseError, SerializeError};
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::reader::Reader;
use quick_xml::Writer;

/// A boolean combination of named test selections.
///
/// `Filter` is intentionally minimal: it has no notion of substring or
/// pattern matching, only exact test names combined with `and`/`or`/`not`.
/// Any richer matching (globs, tags, package scoping) happens upstream of
/// this crate, which only has to carry the *result* of that matching as a
/// set of concrete test names.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Filter {
    /// Selects the single test named exactly `name`.
    Test(String),
    /// Selects tests matched by every child (vacuously true if empty).
    And(Vec<Filter>),
    /// Selects tests matched by any child (vacuously false if empty).
    Or(Vec<Filter>),
    /// Selects tests not matched by `child`.
    Not(Box<Filter>),
}

impl Filter {
    /// Whether this filter selects nothing at all, in which case a driver
    /// can skip invoking its framework entirely (spec §4.G's filter-excludes
    /// shortcut). Only an explicit empty disjunction counts: a filter that
    /// merely *might* match nothing (e.g. `Not(Or([]))`, which actually
    /// selects everything) is not treated as exclude-all, since that would
    /// require evaluating the expression against the framework's test tree,
    /// which this crate has no visibility into.
    pub fn excludes_everything(&self) -> bool {
        matches!(self, Filter::Or(children) if children.is_empty())
    }

    /// Serializes this filter to its XML wire form: a `<filter>` root
    /// wrapping this expression tree, with no XML declaration and no
    /// indentation.
    pub fn to_xml(&self) -> Result<String, SerializeError> {
        let mut buf = Vec::new();
        {
            let mut writer = Writer::new(&mut buf);
            writer.write_event(Event::Start(BytesStart::new("filter")))?;
            write_node(self, &mut writer)?;
            writer.write_event(Event::End(BytesEnd::new("filter")))?;
        }
        Ok(String::from_utf8(buf).expect("writer only emits UTF-8 from UTF-8 input"))
    }

    /// Parses a filter previously produced by [`Filter::to_xml`].
    pub fn from_xml(xml: &str) -> Result<Filter, ParseError> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        expect_tag_start(&mut reader, b"filter")?;
        let filter = parse_node(&mut reader)?;
        expect_tag_end(&mut reader, b"filter")?;
        Ok(filter)
    }
}

fn write_node(filter: &Filter, writer: &mut Writer<&mut Vec<u8>>) -> quick_xml::Result<()> {
    match filter {
        Filter::Test(name) => {
            writer.write_event(Event::Start(BytesStart::new("test")))?;
            writer.write_event(Event::Text(BytesText::from_escaped(escape_test_name(name))))?;
            writer.write_event(Event::End(BytesEnd::new("test")))
        }
        Filter::And(children) => write_compound("and", children, writer),
        Filter::Or(children) => write_compound("or", children, writer),
        Filter::Not(child) => {
            writer.write_event(Event::Start(BytesStart::new("not")))?;
            write_node(child, writer)?;
            writer.write_event(Event::End(BytesEnd::new("not")))
        }
    }
}

fn write_compound(tag: &'static str, children: &[Filter], writer: &mut Writer<&mut Vec<u8>>) -> quick_xml::Result<()> {
    if children.is_empty() {
        return writer.write_event(Event::Empty(BytesStart::new(tag)));
    }
    writer.write_event(Event::Start(BytesStart::new(tag)))?;
    for child in children {
        write_node(child, writer)?;
    }
    writer.write_event(Event::End(BytesEnd::new(tag)))
}

/// XML-escapes a test name for use as element text, matching the source
/// framework's own quoting convention: `&`, `<`, `>`, and `"` are all
/// escaped even though only the first two are strictly required inside
/// element text (spec §8 boundary scenario 4).
fn escape_test_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for ch in name.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Reads events, skipping text/comments, until a `Start`/`Empty` tag named
/// `tag` is found, or returns an error.
fn expect_tag_start(reader: &mut Reader<&[u8]>, tag: &[u8]) -> Result<(), ParseError> {
    loop {
        match reader.read_event()? {
            Event::Start(start) | Event::Empty(start) => {
                return if start.local_name().as_ref() == tag {
                    Ok(())
                } else {
                    Err(ParseError::UnexpectedElement {
                        tag: String::from_utf8_lossy(start.local_name().as_ref()).into_owned(),
                    })
                };
            }
            Event::Text(_) | Event::Comment(_) | Event::Decl(_) => continue,
            Event::Eof => return Err(ParseError::UnexpectedEof),
            _ => continue,
        }
    }
}

/// Reads events, skipping text/comments, until an `End` tag named `tag` is
/// found, or returns an error.
fn expect_tag_end(reader: &mut Reader<&[u8]>, tag: &[u8]) -> Result<(), ParseError> {
    loop {
        match reader.read_event()? {
            Event::End(end) => {
                return if end.local_name().as_ref() == tag {
                    Ok(())
                } else {
                    Err(ParseError::UnexpectedElement {
                        tag: String::from_utf8_lossy(end.local_name().as_ref()).into_owned(),
                    })
                };
            }
            Event::Text(_) | Event::Comment(_) => continue,
            Event::Eof => return Err(ParseError::UnexpectedEof),
            _ => continue,
        }
    }
}

/// Reads the next meaningful (non-text/comment) event and parses the `Filter`
/// node it begins.
fn parse_node(reader: &mut Reader<&[u8]>) -> Result<Filter, ParseError> {
    loop {
        match reader.read_event()? {
            Event::Text(_) | Event::Comment(_) | Event::Decl(_) => continue,
            Event::Eof => return Err(ParseError::UnexpectedEof),
            other => return parse_node_from_event(other, reader),
        }
    }
}

/// Parses the `Filter` node begun by an already-consumed `Start`/`Empty`
/// event, reading whatever further events that node's body requires.
fn parse_node_from_event<'a>(event: Event<'a>, reader: &mut Reader<&[u8]>) -> Result<Filter, ParseError> {
    match event {
        Event::Empty(start) => match start.local_name().as_ref() {
            b"and" => Ok(Filter::And(Vec::new())),
            b"or" => Ok(Filter::Or(Vec::new())),
            tag => Err(ParseError::UnexpectedElement {
                tag: String::from_utf8_lossy(tag).into_owned(),
            }),
        },
        Event::Start(start) => {
            let tag = start.local_name().as_ref().to_vec();
            match tag.as_slice() {
                b"test" => {
                    let name = read_text(reader)?;
                    expect_tag_end(reader, b"test")?;
                    Ok(Filter::Test(name))
                }
                b"not" => {
                    let child = parse_node(reader)?;
                    expect_tag_end(reader, b"not")?;
                    Ok(Filter::Not(Box::new(child)))
                }
                b"and" | b"or" => {
                    let mut children = Vec::new();
                    loop {
                        match reader.read_event()? {
                            Event::End(end) if end.local_name().as_ref() == tag.as_slice() => break,
                            Event::Text(_) | Event::Comment(_) => continue,
                            Event::Eof => return Err(ParseError::UnexpectedEof),
                            other => children.push(parse_node_from_event(other, reader)?),
                        }
                    }
                    if tag == b"and" {
                        Ok(Filter::And(children))
                    } else {
                        Ok(Filter::Or(children))
                    }
                }
                _ => Err(ParseError::UnexpectedElement {
                    tag: String::from_utf8_lossy(&tag).into_owned(),
                }),
            }
        }
        other => Err(ParseError::UnexpectedElement {
            tag: format!("{other:?}"),
        }),
    }
}

fn read_text(reader: &mut Reader<&[u8]>) -> Result<String, ParseError> {
    match reader.read_event()? {
        Event::Text(text) => Ok(text.unescape()?.into_owned()),
        Event::End(_) => Ok(String::new()),
        Event::Eof => Err(ParseError::UnexpectedEof),
        other => Err(ParseError::UnexpectedElement {
            tag: format!("{other:?}"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_reserved_characters_in_a_test_name() {
        let filter = Filter::Test(r#"My.Test.Name<T>("abc")"#.to_string());
        let xml = filter.to_xml().unwrap();
        assert_eq!(
            xml,
            r#"<filter><test>My.Test.Name&lt;T&gt;(&quot;abc&quot;)</test></filter>"#
        );
    }

    #[test]
    fn serializes_an_or_of_several_tests() {
        let filter = Filter::Or(vec![
            Filter::Test("My.First.Test".to_string()),
            Filter::Test("My.Second.Test".to_string()),
            Filter::Test("My.Third.Test".to_string()),
        ]);
        assert_eq!(
            filter.to_xml().unwrap(),
            "<filter><or><test>My.First.Test</test><test>My.Second.Test</test><test>My.Third.Test</test></or></filter>"
        );
    }

    #[test]
    fn empty_or_excludes_everything() {
        assert!(Filter::Or(Vec::new()).excludes_everything());
        assert!(!Filter::And(Vec::new()).excludes_everything());
        assert!(!Filter::Test("x".to_string()).excludes_everything());
    }

    #[test]
    fn round_trips_a_nested_expression() {
        let filter = Filter::And(vec![
            Filter::Or(vec![Filter::Test("a".to_string()), Filter::Test("b".to_string())]),
            Filter::Not(Box::new(Filter::Test("c".to_string()))),
        ]);
        let xml = filter.to_xml().unwrap();
        let parsed = Filter::from_xml(&xml).unwrap();
        assert_eq!(parsed, filter);
    }

    #[test]
    fn round_trips_an_empty_or() {
        let filter = Filter::Or(Vec::new());
        let xml = filter.to_xml().unwrap();
        assert_eq!(xml, "<filter><or/></filter>");
        assert_eq!(Filter::from_xml(&xml).unwrap(), filter);
    }
}
