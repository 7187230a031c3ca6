// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Parses `.addins` manifest files (spec §6).
//!
//! Grammar, one entry per line:
//! - blank lines are ignored
//! - `#` starts a comment that extends to end of line
//! - a line ending in `/` names a directory to scan (non-recursively) for
//!   assemblies
//! - a line containing `*` names a wildcard glob over assembly paths; every
//!   assembly it matches is tainted "from wildcard" for read-failure policy
//!   purposes (spec §4.C.2: unreadable wildcard matches are skipped silently,
//!   unreadable explicit entries are an error)
//! - any other non-blank line names a single assembly path directly
//!
//! Backslashes normalize to forward slashes on read.

use crate::helpers::{normalize_slashes, strip_comment};
use camino::Utf8PathBuf;

/// A single parsed entry from an `.addins` manifest.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ManifestEntry {
    /// A directory to scan non-recursively for candidate assemblies.
    Directory(Utf8PathBuf),
    /// A single assembly, referenced explicitly. Read failures are an error.
    Assembly(Utf8PathBuf),
    /// A wildcard glob over assembly paths. Read failures on individual
    /// matches are skipped silently rather than erroring.
    Wildcard(Utf8PathBuf),
}

/// Parses the text of an `.addins` manifest file into its entries, in the
/// order they appear (discovery order matters for path-deduction ties, spec
/// §4.C.4).
pub fn parse(text: &str) -> Vec<ManifestEntry> {
    text.lines()
        .filter_map(|raw| {
            let stripped = strip_comment(raw).trim();
            if stripped.is_empty() {
                return None;
            }
            let normalized = normalize_slashes(stripped);
            if normalized.ends_with('/') {
                Some(ManifestEntry::Directory(normalized.trim_end_matches('/').into()))
            } else if normalized.contains('*') {
                Some(ManifestEntry::Wildcard(normalized.into()))
            } else {
                Some(ManifestEntry::Assembly(normalized.into()))
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ignores_blank_lines_and_comments() {
        let entries = parse("\n# a full-line comment\n\n");
        assert!(entries.is_empty());
    }

    #[test]
    fn strips_trailing_comment_on_entry_line() {
        let entries = parse("addins/plugin.dll # keep this one");
        assert_eq!(entries, vec![ManifestEntry::Assembly("addins/plugin.dll".into())]);
    }

    #[test]
    fn directory_entry_strips_trailing_slash() {
        let entries = parse("addins/plugins/");
        assert_eq!(entries, vec![ManifestEntry::Directory("addins/plugins".into())]);
    }

    #[test]
    fn wildcard_entry_is_recognized() {
        let entries = parse("addins/*.dll");
        assert_eq!(entries, vec![ManifestEntry::Wildcard("addins/*.dll".into())]);
    }

    #[test]
    fn normalizes_backslashes_before_classifying() {
        let entries = parse(r"addins\plugins\");
        assert_eq!(entries, vec![ManifestEntry::Directory("addins/plugins".into())]);
    }

    #[test]
    fn preserves_declaration_order() {
        let entries = parse("a.dll\nb/\nc*.dll");
        assert_eq!(
            entries,
            vec![
                ManifestEntry::Assembly("a.dll".into()),
                ManifestEntry::Directory("b".into()),
                ManifestEntry::Wildcard("c*.dll".into()),
            ]
        );
    }
}
