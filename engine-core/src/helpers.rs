// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! General support code shared across subsystems.

/// Normalizes backslashes to forward slashes, as required when reading
/// addins manifest lines (spec §6: "Backslashes normalize to forward slashes
/// on read").
pub(crate) fn normalize_slashes(s: &str) -> String {
    s.replace('\\', "/")
}

/// Strips a `#`-led comment, extending to end-of-line, from a manifest line
/// (spec §6 grammar).
pub(crate) fn strip_comment(line: &str) -> &str {
    match line.find('#') {
        Some(idx) => &line[..idx],
        None => line,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_backslashes() {
        assert_eq!(normalize_slashes(r"addins\plugin.dll"), "addins/plugin.dll");
    }

    #[test]
    fn strips_trailing_comment() {
        assert_eq!(strip_comment("addins/plugin.dll # keep"), "addins/plugin.dll ");
    }

    #[test]
    fn strips_whole_line_comment() {
        assert_eq!(strip_comment("# a comment"), "");
    }

    #[test]
    fn leaves_line_without_comment_untouched() {
        assert_eq!(strip_comment("addins/plugin.dll"), "addins/plugin.dll");
    }
}
