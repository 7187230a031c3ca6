// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! [`FilterBuilder`]: constructs a [`Filter`] from a set of selected test
//! names plus an optional where-clause (spec §8 boundary scenarios 3–4).

use crate::Filter;

/// Builds a [`Filter`] selecting a concrete set of test names, optionally
/// narrowed by a nested where-clause expression.
///
/// A single selection serializes as a bare `<test>` with no enclosing
/// `<or>` (spec §8 boundary scenario 4); two or more selections are combined
/// under an explicit `<or>` (scenario 3). A builder with no selections and
/// no where-clause produces the exclude-everything filter `Filter::Or([])`.
#[derive(Clone, Debug, Default)]
pub struct FilterBuilder {
    selections: Vec<String>,
    where_clause: Option<Filter>,
}

impl FilterBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one test name to the selection set.
    pub fn select(mut self, name: impl Into<String>) -> Self {
        self.selections.push(name.into());
        self
    }

    /// Adds several test names to the selection set.
    pub fn select_all(mut self, names: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.selections.extend(names.into_iter().map(Into::into));
        self
    }

    /// Narrows the selection by `filter`, combined with `and`.
    pub fn where_clause(mut self, filter: Filter) -> Self {
        self.where_clause = Some(filter);
        self
    }

    /// Builds the resulting [`Filter`].
    pub fn build(self) -> Filter {
        let selection = match self.selections.len() {
            0 => None,
            1 => Some(Filter::Test(self.selections.into_iter().next().expect("len == 1"))),
            _ => Some(Filter::Or(self.selections.into_iter().map(Filter::Test).collect())),
        };

        match (selection, self.where_clause) {
            (Some(selection), Some(where_clause)) => Filter::And(vec![selection, where_clause]),
            (Some(selection), None) => selection,
            (None, Some(where_clause)) => where_clause,
            (None, None) => Filter::Or(Vec::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn three_selections_build_an_or_of_tests() {
        let filter = FilterBuilder::new()
            .select_all(["My.First.Test", "My.Second.Test", "My.Third.Test"])
            .build();
        assert_eq!(
            filter.to_xml().unwrap(),
            "<filter><or><test>My.First.Test</test><test>My.Second.Test</test><test>My.Third.Test</test></or></filter>"
        );
    }

    #[test]
    fn a_single_selection_builds_a_bare_test() {
        let filter = FilterBuilder::new().select(r#"My.Test.Name<T>("abc")"#).build();
        assert_eq!(
            filter.to_xml().unwrap(),
            r#"<filter><test>My.Test.Name&lt;T&gt;(&quot;abc&quot;)</test></filter>"#
        );
    }

    #[test]
    fn no_selections_and_no_where_clause_excludes_everything() {
        let filter = FilterBuilder::new().build();
        assert!(filter.excludes_everything());
    }

    #[test]
    fn a_where_clause_combines_with_selections_under_and() {
        let filter = FilterBuilder::new()
            .select("My.Test")
            .where_clause(Filter::Not(Box::new(Filter::Test("My.Excluded".to_string()))))
            .build();
        assert_eq!(
            filter,
            Filter::And(vec![
                Filter::Test("My.Test".to_string()),
                Filter::Not(Box::new(Filter::Test("My.Excluded".to_string()))),
            ])
        );
    }
}
