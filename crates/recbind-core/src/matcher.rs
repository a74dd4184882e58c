// Dweve Recbind - Record Binding Compiler
//
// Copyright (c) 2025 Dweve IP B.V. and individual contributors.
//
// SPDX-License-Identifier: Apache-2.0
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License in the LICENSE file at the
// root of this repository or at: http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Group/record matching state machine.
//!
//! A group decides which of its children a candidate belongs to in three
//! stages: retry the last matched child, scan forward from the current
//! order position, and (when allowed) wrap around to start a new occurrence
//! of the group. A failed wrap restores every cursor it touched.

use crate::format::RawRecord;
use crate::tree::{first_order, NodeId, NodeKind, State, Tree};
use crate::value::Value;
use tracing::trace;

/// Something to be placed in the schema.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Candidate<'a> {
    /// An incoming record, identified by its identifying fields.
    Record(&'a RawRecord),
    /// An outgoing object, identified by type and identifying properties.
    Object(&'a Value),
    /// An outgoing object addressed to a record or group by name.
    Named(&'a str),
}

impl Candidate<'_> {
    fn is_reading(&self) -> bool {
        matches!(self, Candidate::Record(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MatchOutcome {
    /// `unit` is the outermost typed group (or the record itself) the
    /// candidate belongs to; `leaf` is the record or group that matched.
    Matched { unit: NodeId, leaf: NodeId },
    /// Nothing here; the caller may try elsewhere.
    NoMatch,
    /// Nothing here, and this node was left below its minimum.
    Unsatisfied(NodeId),
}

pub(crate) struct Matcher<'a> {
    tree: &'a Tree,
    state: &'a mut State,
    /// Groups that began a new occurrence during the current match.
    pub started: Vec<NodeId>,
}

impl<'a> Matcher<'a> {
    pub fn new(tree: &'a Tree, state: &'a mut State) -> Self {
        Self {
            tree,
            state,
            started: Vec::new(),
        }
    }

    /// Find the child of group `g` that accepts the candidate.
    pub fn match_next(&mut self, g: NodeId, candidate: Candidate<'_>, wrap: bool) -> MatchOutcome {
        let tree = self.tree;
        let last = self.state.cursor(g).last_matched;

        // Stage 1: the last matched child gets first refusal.
        if let Some(last) = last {
            if !self.max_reached(last) {
                match self.matches_node(last, candidate) {
                    MatchOutcome::NoMatch => {}
                    MatchOutcome::Unsatisfied(node) => return MatchOutcome::Unsatisfied(node),
                    matched => return self.accept(g, last, matched),
                }
            }
            if candidate.is_reading() && tree.is_group(last) {
                if let Some(node) = self.close(last) {
                    trace!(group = tree.name_of(last), node = tree.name_of(node), "group left unsatisfied");
                    return MatchOutcome::Unsatisfied(node);
                }
            }
        }

        // Stage 2: scan forward from the current position.
        let in_progress = last.is_some() || g == tree.root();
        match self.scan(g, candidate, last) {
            MatchOutcome::NoMatch => {}
            MatchOutcome::Unsatisfied(node) if !in_progress => {
                trace!(group = tree.name_of(g), node = tree.name_of(node), "unsatisfied before start");
                return MatchOutcome::NoMatch;
            }
            outcome => return outcome,
        }

        // Stage 3: wrap around into a new occurrence of this group.
        if !wrap || last.is_none() || self.state.cursor(g).count >= tree.occurs(g).max_limit() {
            return MatchOutcome::NoMatch;
        }
        if candidate.is_reading() {
            if let Some(node) = self.close(g) {
                trace!(group = tree.name_of(g), node = tree.name_of(node), "cannot wrap an unsatisfied group");
                return MatchOutcome::Unsatisfied(node);
            }
        }
        let snapshot = self.state.snapshot(tree, g);
        let started = self.started.len();
        self.reset(g);
        match self.scan(g, candidate, None) {
            outcome @ MatchOutcome::Matched { .. } => {
                trace!(group = tree.name_of(g), "wrapped into a new occurrence");
                outcome
            }
            _ => {
                self.state.restore(g, snapshot);
                self.started.truncate(started);
                MatchOutcome::NoMatch
            }
        }
    }

    fn scan(&mut self, g: NodeId, candidate: Candidate<'_>, tried: Option<NodeId>) -> MatchOutcome {
        let tree = self.tree;
        let Some(group) = tree.group(g) else {
            return MatchOutcome::NoMatch;
        };
        let position = self.state.cursor(g).position;
        let mut level = position;
        let mut unsatisfied = None;

        for &child in &group.children {
            let order = tree.order(child);
            if order < position {
                continue;
            }
            if order > level {
                if let Some(node) = unsatisfied {
                    return MatchOutcome::Unsatisfied(node);
                }
                level = order;
            }
            if Some(child) == tried || self.max_reached(child) {
                if self.below_min(child, candidate) {
                    unsatisfied.get_or_insert(child);
                }
                continue;
            }
            match self.matches_node(child, candidate) {
                MatchOutcome::NoMatch => {
                    if self.below_min(child, candidate) {
                        unsatisfied.get_or_insert(child);
                    }
                }
                MatchOutcome::Unsatisfied(node) => return MatchOutcome::Unsatisfied(node),
                matched => return self.accept(g, child, matched),
            }
        }
        unsatisfied.map_or(MatchOutcome::NoMatch, MatchOutcome::Unsatisfied)
    }

    /// Whether leaving `child` behind would break its minimum. Unbound
    /// nodes may be skipped silently while writing.
    fn below_min(&self, child: NodeId, candidate: Candidate<'_>) -> bool {
        self.state.cursor(child).count < self.tree.occurs(child).min
            && (candidate.is_reading() || self.tree.is_writable(child))
    }

    fn accept(&mut self, g: NodeId, child: NodeId, outcome: MatchOutcome) -> MatchOutcome {
        let tree = self.tree;
        match self.state.cursor(g).last_matched {
            None => {
                self.state.cursor_mut(g).count += 1;
                self.started.push(g);
            }
            Some(previous) if previous != child && tree.is_group(previous) => self.reset(previous),
            Some(_) => {}
        }
        let cursor = self.state.cursor_mut(g);
        cursor.position = tree.order(child);
        cursor.last_matched = Some(child);
        trace!(group = tree.name_of(g), child = tree.name_of(child), "matched");
        outcome
    }

    fn max_reached(&self, node: NodeId) -> bool {
        let cursor = self.state.cursor(node);
        let max = self.tree.occurs(node).max_limit();
        match &self.tree.node(node).kind {
            NodeKind::Record(_) => cursor.count >= max,
            NodeKind::Group(_) => cursor.last_matched.is_none() && cursor.count >= max,
            _ => true,
        }
    }

    fn matches_node(&mut self, node: NodeId, candidate: Candidate<'_>) -> MatchOutcome {
        let tree = self.tree;
        match &tree.node(node).kind {
            NodeKind::Record(_) => {
                let hit = match candidate {
                    Candidate::Record(raw) => tree.identifies(node, raw),
                    Candidate::Object(value) => tree.is_writable(node) && tree.defines(node, value),
                    Candidate::Named(name) => tree.name_of(node) == name,
                };
                if !hit {
                    return MatchOutcome::NoMatch;
                }
                self.state.cursor_mut(node).count += 1;
                MatchOutcome::Matched { unit: node, leaf: node }
            }
            NodeKind::Group(_) => {
                let typed = tree.is_typed(node);
                let direct = match candidate {
                    Candidate::Object(value) if typed => Some(tree.defines(node, value)),
                    Candidate::Named(name) if tree.name_of(node) == name => Some(true),
                    _ => None,
                };
                match direct {
                    Some(true) => {
                        self.state.cursor_mut(node).count += 1;
                        MatchOutcome::Matched { unit: node, leaf: node }
                    }
                    Some(false) => MatchOutcome::NoMatch,
                    None => match self.match_next(node, candidate, true) {
                        MatchOutcome::Matched { unit, leaf } => MatchOutcome::Matched {
                            unit: if typed { node } else { unit },
                            leaf,
                        },
                        other => other,
                    },
                }
            }
            _ => MatchOutcome::NoMatch,
        }
    }

    /// Forget the progress of a group so it can start over.
    pub fn reset(&mut self, g: NodeId) {
        let tree = self.tree;
        let Some(group) = tree.group(g) else {
            return;
        };
        let cursor = self.state.cursor_mut(g);
        cursor.last_matched = None;
        cursor.position = first_order(tree, group);
        for &child in &group.children {
            self.state.cursor_mut(child).count = 0;
            if tree.is_group(child) {
                self.reset(child);
            }
        }
    }

    /// First child at or after the current position still below its minimum.
    pub fn close(&self, g: NodeId) -> Option<NodeId> {
        let tree = self.tree;
        let group = tree.group(g)?;
        let cursor = self.state.cursor(g);
        if let Some(last) = cursor.last_matched {
            if tree.is_group(last) && self.state.cursor(last).last_matched.is_some() {
                if let Some(node) = self.close(last) {
                    return Some(node);
                }
            }
        }
        group
            .children
            .iter()
            .copied()
            .find(|&child| {
                tree.order(child) >= cursor.position
                    && self.state.cursor(child).count < tree.occurs(child).min
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::compile_tree;
    use crate::config::{FieldConfig, FormatKind, GroupConfig, RecordConfig, StreamConfig};
    use crate::options::CompileOptions;

    fn rec(name: &str, id: &str) -> RecordConfig {
        RecordConfig::new(name)
            .field(FieldConfig::new("kind").rid().literal(id))
            .field(FieldConfig::new("value"))
    }

    fn compile(config: StreamConfig) -> Tree {
        compile_tree(config, &CompileOptions::default()).unwrap()
    }

    fn raw(id: &str) -> RawRecord {
        RawRecord::fields([id, "x"])
    }

    /// Feed records through the root, returning the matched leaf names or
    /// the unsatisfied node name.
    fn feed(tree: &Tree, ids: &[&str]) -> Result<Vec<String>, String> {
        let mut state = State::new(tree);
        let mut names = Vec::new();
        for id in ids {
            let record = raw(id);
            let mut m = Matcher::new(tree, &mut state);
            match m.match_next(tree.root(), Candidate::Record(&record), true) {
                MatchOutcome::Matched { leaf, .. } => names.push(tree.name_of(leaf).to_string()),
                MatchOutcome::NoMatch => return Err(format!("nomatch:{}", id)),
                MatchOutcome::Unsatisfied(node) => return Err(tree.name_of(node).to_string()),
            }
        }
        let m = Matcher::new(tree, &mut state);
        match m.close(tree.root()) {
            Some(node) => Err(tree.name_of(node).to_string()),
            None => Ok(names),
        }
    }

    // ==================== Ordering tests ====================

    #[test]
    fn test_ordered_sequence() {
        let tree = compile(
            StreamConfig::new("s", FormatKind::Delimited)
                .record(rec("a", "A"))
                .record(rec("b", "B").unbounded().min_occurs(0)),
        );
        assert_eq!(feed(&tree, &["A", "B", "B"]).unwrap(), vec!["a", "b", "b"]);
    }

    #[test]
    fn test_out_of_order_is_unsatisfied() {
        let tree = compile(
            StreamConfig::new("s", FormatKind::Delimited)
                .record(rec("a", "A"))
                .record(rec("b", "B")),
        );
        assert_eq!(feed(&tree, &["B", "A"]).unwrap_err(), "a");
    }

    #[test]
    fn test_unordered_stream_accepts_any_order() {
        let tree = compile(
            StreamConfig::new("s", FormatKind::Delimited)
                .ordered(false)
                .record(rec("a", "A"))
                .record(rec("b", "B")),
        );
        assert_eq!(feed(&tree, &["B", "A"]).unwrap(), vec!["b", "a"]);
    }

    #[test]
    fn test_record_past_max_has_no_match() {
        let tree = compile(StreamConfig::new("s", FormatKind::Delimited).record(rec("a", "A")));
        assert_eq!(feed(&tree, &["A", "A"]).unwrap_err(), "nomatch:A");
    }

    // ==================== Occurrence tests ====================

    fn occurrence_tree() -> Tree {
        compile(
            StreamConfig::new("s", FormatKind::Delimited).group(
                GroupConfig::new("g")
                    .min_occurs(1)
                    .record(rec("d", "D").occurs(2, 3)),
            ),
        )
    }

    #[test]
    fn test_group_min_occurs_at_eof() {
        let tree = occurrence_tree();
        assert_eq!(feed(&tree, &["D"]).unwrap_err(), "d");
        assert!(feed(&tree, &["D", "D"]).is_ok());
        assert!(feed(&tree, &["D", "D", "D"]).is_ok());
    }

    #[test]
    fn test_fourth_record_leaves_group_unaffected() {
        let tree = occurrence_tree();
        let mut state = State::new(&tree);
        let d = raw("D");
        for _ in 0..3 {
            let mut m = Matcher::new(&tree, &mut state);
            assert!(matches!(
                m.match_next(tree.root(), Candidate::Record(&d), true),
                MatchOutcome::Matched { .. }
            ));
        }
        let g = tree.find("g").unwrap();
        let before = state.snapshot(&tree, g);
        let mut m = Matcher::new(&tree, &mut state);
        assert_eq!(m.match_next(g, Candidate::Record(&d), false), MatchOutcome::NoMatch);
        assert_eq!(state.snapshot(&tree, g), before);
    }

    #[test]
    fn test_repeating_group_wraps_around() {
        let tree = compile(
            StreamConfig::new("s", FormatKind::Delimited).group(
                GroupConfig::new("batch")
                    .unbounded()
                    .record(rec("h", "H"))
                    .record(rec("d", "D").unbounded().min_occurs(0))
                    .record(rec("t", "T")),
            ),
        );
        assert_eq!(
            feed(&tree, &["H", "D", "T", "H", "T"]).unwrap(),
            vec!["h", "d", "t", "h", "t"]
        );
        assert_eq!(feed(&tree, &["H", "D", "H"]).unwrap_err(), "t");
    }

    #[test]
    fn test_scan_does_not_leave_child_below_minimum() {
        let tree = compile(
            StreamConfig::new("s", FormatKind::Delimited)
                .record(rec("h", "H"))
                .record(rec("d", "D").occurs(2, 3))
                .record(rec("t", "T")),
        );
        assert_eq!(feed(&tree, &["H", "D", "T"]).unwrap_err(), "d");
        assert_eq!(feed(&tree, &["H", "D", "D", "T"]).unwrap(), vec!["h", "d", "d", "t"]);
    }

    #[test]
    fn test_no_wrap_while_occurrence_unsatisfied() {
        let tree = compile(
            StreamConfig::new("s", FormatKind::Delimited).group(
                GroupConfig::new("g")
                    .unbounded()
                    .record(rec("h", "H"))
                    .record(rec("d", "D").occurs(2, 3)),
            ),
        );
        assert_eq!(feed(&tree, &["H", "D", "H", "D", "D"]).unwrap_err(), "d");
        assert!(feed(&tree, &["H", "D", "D", "H", "D", "D"]).is_ok());
    }

    #[test]
    fn test_wrap_marks_group_started() {
        let tree = compile(
            StreamConfig::new("s", FormatKind::Delimited)
                .group(GroupConfig::new("g").unbounded().record(rec("a", "A"))),
        );
        let mut state = State::new(&tree);
        let a = raw("A");
        let g = tree.find("g").unwrap();

        let mut m = Matcher::new(&tree, &mut state);
        m.match_next(tree.root(), Candidate::Record(&a), true);
        assert!(m.started.contains(&g));

        let mut m = Matcher::new(&tree, &mut state);
        m.match_next(tree.root(), Candidate::Record(&a), true);
        assert_eq!(m.started, vec![g]);
        assert_eq!(state.cursor(g).count, 2);
    }

    #[test]
    fn test_typed_group_is_unit() {
        let tree = compile(
            StreamConfig::new("s", FormatKind::Delimited).group(
                GroupConfig::new("g")
                    .type_name("G")
                    .record(rec("a", "A").type_name("A")),
            ),
        );
        let mut state = State::new(&tree);
        let a = raw("A");
        let mut m = Matcher::new(&tree, &mut state);
        match m.match_next(tree.root(), Candidate::Record(&a), true) {
            MatchOutcome::Matched { unit, leaf } => {
                assert_eq!(tree.name_of(unit), "g");
                assert_eq!(tree.name_of(leaf), "a");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_named_candidate() {
        let tree = compile(
            StreamConfig::new("s", FormatKind::Delimited)
                .ordered(false)
                .record(rec("a", "A").type_name("A"))
                .record(rec("b", "B").type_name("B")),
        );
        let mut state = State::new(&tree);
        let mut m = Matcher::new(&tree, &mut state);
        match m.match_next(tree.root(), Candidate::Named("b"), true) {
            MatchOutcome::Matched { leaf, .. } => assert_eq!(tree.name_of(leaf), "b"),
            other => panic!("unexpected {:?}", other),
        }
    }
}
