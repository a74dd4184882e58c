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

//! Reader session: raw records in, bound values out.

use crate::context::{Mode, ParsingContext, RecordContext};
use crate::error::{BindingError, StreamError, StreamResult};
use crate::format::RawRecord;
use crate::io::RecordReader;
use crate::matcher::{Candidate, MatchOutcome, Matcher};
use crate::property::Lifecycle;
use crate::tree::{NodeId, State, Tree};
use crate::value::{Slot, Value};
use std::sync::Arc;
use tracing::{debug, warn};

/// One sequential read over a compiled stream.
///
/// Sessions own their state block; any number of sessions may read from
/// the same [`Stream`](crate::Stream) concurrently, but one session must
/// not be shared between threads.
///
/// # Examples
///
/// ```
/// use recbind_core::{compile, FieldConfig, FormatKind, IterReader, RawRecord, RecordConfig, StreamConfig};
///
/// let stream = compile(
///     StreamConfig::new("people", FormatKind::Delimited).record(
///         RecordConfig::new("person")
///             .type_name("Person")
///             .unbounded()
///             .field(FieldConfig::new("name"))
///             .field(FieldConfig::new("age").type_name("int")),
///     ),
/// )
/// .unwrap();
///
/// let input = IterReader::new(vec![RawRecord::fields(["Ann", "42"])]);
/// let mut reader = stream.begin_read(input);
/// let person = reader.read().unwrap().unwrap();
/// assert_eq!(person.property("age").and_then(|v| v.as_int()), Some(42));
/// assert!(reader.read().unwrap().is_none());
/// ```
#[derive(Debug)]
pub struct ReaderSession<R: RecordReader> {
    tree: Arc<Tree>,
    state: State,
    reader: R,
    /// Record pushed back after ending a group.
    pending: Option<(usize, RawRecord)>,
    context: RecordContext,
    finished: bool,
    closed: bool,
    /// Set once iteration has returned an error or reached the end.
    exhausted: bool,
}

impl<R: RecordReader> ReaderSession<R> {
    pub(crate) fn new(tree: Arc<Tree>, reader: R) -> Self {
        let state = State::new(&tree);
        Self {
            tree,
            state,
            reader,
            pending: None,
            context: RecordContext::default(),
            finished: false,
            closed: false,
            exhausted: false,
        }
    }

    /// Read the next bound value, or `None` at end of input.
    ///
    /// Records without a type are validated and skipped. A record that
    /// starts a typed group yields the whole group as one value.
    pub fn read(&mut self) -> StreamResult<Option<Value>> {
        if self.closed {
            return Err(StreamError::Closed);
        }
        let tree = Arc::clone(&self.tree);
        loop {
            let Some((line, raw)) = self.next_raw()? else {
                self.finish()?;
                return Ok(None);
            };

            let (outcome, started) = {
                let mut matcher = Matcher::new(&tree, &mut self.state);
                let outcome = matcher.match_next(tree.root(), Candidate::Record(&raw), true);
                (outcome, matcher.started)
            };

            match outcome {
                MatchOutcome::Matched { unit, leaf } if tree.is_group(unit) => {
                    return self.read_group(unit, leaf, &started, line, &raw).map(Some);
                }
                MatchOutcome::Matched { leaf, .. } => {
                    if let Some(value) = self.read_record(leaf, line, &raw)? {
                        return Ok(Some(value));
                    }
                }
                outcome => {
                    let known = tree.records.iter().copied().find(|&r| tree.identifies(r, &raw));
                    match (known, outcome) {
                        (None, _) if tree.ignore_unidentified => {
                            debug!(line, "skipping unidentified record");
                        }
                        (None, _) => {
                            self.context.record_errors.push("unidentified record".to_string());
                            return Err(StreamError::Unidentified { line });
                        }
                        (Some(_), MatchOutcome::Unsatisfied(node)) => {
                            return Err(self.unsatisfied(line, node));
                        }
                        (Some(record), _) => {
                            let name = tree.name_of(record).to_string();
                            debug!(line, record = %name, "record out of sequence");
                            self.context.record_errors.push(format!("unexpected record '{}'", name));
                            return Err(StreamError::Unexpected { line, record: name });
                        }
                    }
                }
            }
        }
    }

    /// Discard up to `count` records without matching them.
    pub fn skip_records(&mut self, count: usize) -> StreamResult<usize> {
        if self.closed {
            return Err(StreamError::Closed);
        }
        let mut skipped = 0;
        while skipped < count && self.next_raw()?.is_some() {
            skipped += 1;
        }
        Ok(skipped)
    }

    /// Name of the most recently matched record.
    pub fn record_name(&self) -> Option<&str> {
        self.context.record_name.as_deref()
    }

    /// Diagnostics for the most recently read record.
    pub fn record_context(&self) -> &RecordContext {
        &self.context
    }

    /// Line number of the most recently read record.
    pub fn line_number(&self) -> usize {
        self.context.line_number
    }

    /// End the session, checking that every node reached its minimum.
    pub fn close(&mut self) -> StreamResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.finish()
    }

    /// Give back the underlying reader.
    pub fn into_inner(self) -> R {
        self.reader
    }

    // ==================== Internals ====================

    fn next_raw(&mut self) -> StreamResult<Option<(usize, RawRecord)>> {
        let next = match self.pending.take() {
            Some(pending) => Some(pending),
            None => self
                .reader
                .read_record()?
                .map(|raw| (self.reader.line_number(), raw)),
        };
        if let Some((line, raw)) = &next {
            self.context = RecordContext {
                line_number: *line,
                text: Some(raw.text()),
                ..RecordContext::default()
            };
            if !self.tree.format.accepts(raw) {
                return Err(StreamError::malformed(*line, "record does not have the stream's format"));
            }
        }
        Ok(next)
    }

    fn finish(&mut self) -> StreamResult<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;
        let tree = Arc::clone(&self.tree);
        let unsatisfied = Matcher::new(&tree, &mut self.state).close(tree.root());
        match unsatisfied {
            Some(node) => Err(self.unsatisfied(self.reader.line_number(), node)),
            None => Ok(()),
        }
    }

    fn unsatisfied(&mut self, line: usize, node: NodeId) -> StreamError {
        let name = self.tree.name_of(node).to_string();
        warn!(line, node = %name, "structural violation");
        self.context
            .record_errors
            .push(format!("expected record or group '{}'", name));
        StreamError::unsatisfied(line, name)
    }

    fn binding(line: usize) -> impl Fn(BindingError) -> StreamError {
        move |source| StreamError::Binding { line, source }
    }

    /// Unmarshal one record, returning its value when it is typed.
    fn read_record(&mut self, record: NodeId, line: usize, raw: &RawRecord) -> StreamResult<Option<Value>> {
        let tree = Arc::clone(&self.tree);
        let name = tree.name_of(record).to_string();
        self.context.record_name = Some(name.clone());
        let Some(body) = tree.body(record) else {
            return Ok(None);
        };

        let mut ctx = ParsingContext::new(Mode::Read, tree.limits.max_unbounded_repetitions);
        let mut life = Lifecycle::new(&tree, &mut self.state);
        life.clear(body);
        life.unmarshal(body, &mut ctx, raw).map_err(Self::binding(line))?;
        if ctx.has_errors() {
            let errors = ctx.take_errors();
            debug!(line, record = %name, errors = errors.len(), "invalid record");
            self.context.field_errors = errors.clone();
            return Err(StreamError::InvalidRecord { line, record: name, errors });
        }
        if !tree.is_typed(record) {
            debug!(line, record = %name, "skipping unbound record");
            return Ok(None);
        }
        let slot = life.create_value(body).map_err(Self::binding(line))?;
        Ok(slot.into_value())
    }

    /// Read records belonging to one occurrence of a typed group.
    fn read_group(
        &mut self,
        unit: NodeId,
        leaf: NodeId,
        started: &[NodeId],
        line: usize,
        raw: &RawRecord,
    ) -> StreamResult<Value> {
        let tree = Arc::clone(&self.tree);
        if let Some(body) = tree.body(unit) {
            Lifecycle::new(&tree, &mut self.state).clear(body);
        }
        self.open_groups(unit, started, line)?;
        self.read_member(leaf, line, raw)?;

        let mut last_line = line;
        loop {
            let Some((line, raw)) = self.next_raw()? else {
                let unsatisfied = Matcher::new(&tree, &mut self.state).close(unit);
                if let Some(node) = unsatisfied {
                    return Err(self.unsatisfied(last_line, node));
                }
                break;
            };
            let (outcome, started) = {
                let mut matcher = Matcher::new(&tree, &mut self.state);
                let outcome = matcher.match_next(unit, Candidate::Record(&raw), false);
                (outcome, matcher.started)
            };
            match outcome {
                MatchOutcome::Matched { leaf, .. } => {
                    self.open_groups(unit, &started, line)?;
                    self.read_member(leaf, line, &raw)?;
                    last_line = line;
                }
                _ if !tree.records.iter().any(|&r| tree.identifies(r, &raw)) => {
                    if tree.ignore_unidentified {
                        debug!(line, "skipping unidentified record");
                        continue;
                    }
                    self.context.record_errors.push("unidentified record".to_string());
                    return Err(StreamError::Unidentified { line });
                }
                MatchOutcome::NoMatch => {
                    let unsatisfied = Matcher::new(&tree, &mut self.state).close(unit);
                    if let Some(node) = unsatisfied {
                        return Err(self.unsatisfied(line, node));
                    }
                    self.pending = Some((line, raw));
                    break;
                }
                MatchOutcome::Unsatisfied(node) => return Err(self.unsatisfied(line, node)),
            }
        }

        let mut life = Lifecycle::new(&tree, &mut self.state);
        let end = tree.node(unit).subtree_end;
        for index in (unit.index() + 1..end).rev() {
            let id = NodeId(index);
            if life.state.is_open(id) {
                life.flush(id).map_err(Self::binding(last_line))?;
            }
        }
        let body = tree.body(unit);
        let slot = match body {
            Some(body) => life.create_value(body).map_err(Self::binding(last_line))?,
            None => Default::default(),
        };
        self.context.record_name = Some(tree.name_of(unit).to_string());
        Ok(slot.into_value().unwrap_or(Value::Null))
    }

    /// Start new occurrences of typed groups nested in the unit, completing
    /// their previous occurrences first.
    fn open_groups(&mut self, unit: NodeId, started: &[NodeId], line: usize) -> StreamResult<()> {
        let tree = Arc::clone(&self.tree);
        let mut life = Lifecycle::new(&tree, &mut self.state);
        for &group in started {
            if !tree.contains(unit, group) || !tree.is_typed(group) {
                continue;
            }
            if life.state.is_open(group) {
                life.flush(group).map_err(Self::binding(line))?;
            }
            if let Some(body) = tree.body(group) {
                life.clear(body);
            }
            life.state.set_open(group, true);
        }
        Ok(())
    }

    /// Unmarshal a record inside a typed group and hand its value up.
    fn read_member(&mut self, record: NodeId, line: usize, raw: &RawRecord) -> StreamResult<()> {
        if let Some(value) = self.read_record(record, line, raw)? {
            let tree = Arc::clone(&self.tree);
            Lifecycle::new(&tree, &mut self.state).commit(record, Slot::Value(value));
        }
        Ok(())
    }
}

/// Iterates bound values until end of input or the first error.
impl<R: RecordReader> Iterator for ReaderSession<R> {
    type Item = StreamResult<Value>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.exhausted {
            return None;
        }
        match self.read() {
            Ok(Some(value)) => Some(Ok(value)),
            Ok(None) => {
                self.exhausted = true;
                None
            }
            Err(e) => {
                self.exhausted = true;
                Some(Err(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::config::{FieldConfig, FormatKind, GroupConfig, RecordConfig, StreamConfig};
    use crate::error::StreamError;
    use crate::format::RawRecord;
    use crate::io::IterReader;
    use crate::stream::compile;
    use crate::value::Value;

    fn records(rows: &[&[&str]]) -> IterReader<std::vec::IntoIter<RawRecord>> {
        IterReader::new(rows.iter().map(|r| RawRecord::fields(r.iter().copied())).collect::<Vec<_>>())
    }

    fn batch_config() -> StreamConfig {
        StreamConfig::new("batches", FormatKind::Delimited).group(
            GroupConfig::new("batch")
                .type_name("Batch")
                .unbounded()
                .record(
                    RecordConfig::new("header")
                        .type_name("Header")
                        .field(FieldConfig::new("kind").rid().literal("H"))
                        .field(FieldConfig::new("id")),
                )
                .record(
                    RecordConfig::new("detail")
                        .type_name("Detail")
                        .min_occurs(0)
                        .unbounded()
                        .collection("list")
                        .field(FieldConfig::new("kind").rid().literal("D"))
                        .field(FieldConfig::new("amount").type_name("int")),
                )
                .record(
                    RecordConfig::new("trailer")
                        .field(FieldConfig::new("kind").rid().literal("T"))
                        .field(FieldConfig::new("count").type_name("int")),
                ),
        )
    }

    #[test]
    fn test_reads_group_as_unit() {
        let stream = compile(batch_config()).unwrap();
        let mut reader = stream.begin_read(records(&[
            &["H", "b1"],
            &["D", "10"],
            &["D", "20"],
            &["T", "2"],
            &["H", "b2"],
            &["T", "0"],
        ]));

        let first = reader.read().unwrap().unwrap();
        let details = first.property("detail").and_then(Value::as_list).unwrap();
        assert_eq!(details.len(), 2);
        assert_eq!(details[1].property("amount"), Some(&Value::Int(20)));
        assert_eq!(
            first.property("header").and_then(|h| h.property("id")),
            Some(&Value::from("b1"))
        );
        assert_eq!(reader.record_name(), Some("batch"));

        let second = reader.read().unwrap().unwrap();
        assert_eq!(second.property("detail"), None);
        assert!(reader.read().unwrap().is_none());
    }

    #[test]
    fn test_missing_trailer_at_eof() {
        let stream = compile(batch_config()).unwrap();
        let mut reader = stream.begin_read(records(&[&["H", "b1"], &["D", "10"]]));
        match reader.read() {
            Err(StreamError::Unsatisfied { node, .. }) => assert_eq!(node, "trailer"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_unidentified_and_ignored() {
        let config = StreamConfig::new("s", FormatKind::Delimited).record(
            RecordConfig::new("a")
                .type_name("A")
                .unbounded()
                .min_occurs(0)
                .field(FieldConfig::new("kind").rid().literal("A")),
        );
        let stream = compile(config.clone()).unwrap();
        let mut reader = stream.begin_read(records(&[&["X"]]));
        assert!(matches!(reader.read(), Err(StreamError::Unidentified { line: 1 })));

        let stream = compile(config.ignore_unidentified_records(true)).unwrap();
        let mut reader = stream.begin_read(records(&[&["X"], &["A"]]));
        assert!(reader.read().unwrap().is_some());
        assert_eq!(reader.line_number(), 2);
    }

    #[test]
    fn test_skip_and_close() {
        let config = StreamConfig::new("s", FormatKind::Delimited).record(
            RecordConfig::new("a")
                .type_name("A")
                .unbounded()
                .field(FieldConfig::new("x")),
        );
        let stream = compile(config).unwrap();
        let mut reader = stream.begin_read(records(&[&["1"], &["2"], &["3"]]));
        assert_eq!(reader.skip_records(2).unwrap(), 2);
        let value = reader.read().unwrap().unwrap();
        assert_eq!(value.property("x"), Some(&Value::from("3")));
        reader.close().unwrap();
        assert!(matches!(reader.read(), Err(StreamError::Closed)));
    }

    #[test]
    fn test_iterator_stops_after_error() {
        let stream = compile(batch_config()).unwrap();
        let reader = stream.begin_read(records(&[&["H", "b1"], &["D", "10"]]));
        let results: Vec<_> = reader.collect();
        assert_eq!(results.len(), 1);
        assert!(matches!(&results[0], Err(StreamError::Unsatisfied { .. })));
    }

    #[test]
    fn test_malformed_record_shape() {
        let config = StreamConfig::new("s", FormatKind::Delimited)
            .record(RecordConfig::new("a").type_name("A").field(FieldConfig::new("x")));
        let stream = compile(config).unwrap();
        let mut reader = stream.begin_read(IterReader::new(vec![RawRecord::line("abc")]));
        assert!(matches!(reader.read(), Err(StreamError::Malformed { line: 1, .. })));
    }
}
