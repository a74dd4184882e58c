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

//! Writer session: bound values in, raw records out.

use crate::context::{Mode, ParsingContext, RecordContext};
use crate::error::{StreamError, StreamResult};
use crate::io::RecordWriter;
use crate::matcher::{Candidate, MatchOutcome, Matcher};
use crate::property::Lifecycle;
use crate::tree::{NodeId, NodeKind, State, Tree};
use crate::value::Value;
use std::sync::Arc;
use tracing::{debug, warn};

/// One sequential write over a compiled stream.
#[derive(Debug)]
pub struct WriterSession<W: RecordWriter> {
    tree: Arc<Tree>,
    state: State,
    writer: W,
    context: RecordContext,
    /// Records written so far.
    lines: usize,
    closed: bool,
}

impl<W: RecordWriter> WriterSession<W> {
    pub(crate) fn new(tree: Arc<Tree>, writer: W) -> Self {
        let state = State::new(&tree);
        Self {
            tree,
            state,
            writer,
            context: RecordContext::default(),
            lines: 0,
            closed: false,
        }
    }

    /// Write an object, selecting the record or typed group that defines it.
    pub fn write(&mut self, value: &Value) -> StreamResult<()> {
        self.write_candidate(Candidate::Object(value), value)
    }

    /// Write an object through the record or group with the given name,
    /// bypassing identification.
    pub fn write_named(&mut self, name: &str, value: &Value) -> StreamResult<()> {
        self.write_candidate(Candidate::Named(name), value)
    }

    pub fn flush(&mut self) -> StreamResult<()> {
        self.writer.flush()
    }

    /// Flush and close the underlying writer.
    pub fn close(&mut self) -> StreamResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.writer.close()
    }

    /// Name of the most recently written record.
    pub fn record_name(&self) -> Option<&str> {
        self.context.record_name.as_deref()
    }

    /// Diagnostics for the most recently written record.
    pub fn record_context(&self) -> &RecordContext {
        &self.context
    }

    /// Number of records written.
    pub fn line_number(&self) -> usize {
        self.lines
    }

    /// Give back the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }

    // ==================== Internals ====================

    fn write_candidate(&mut self, candidate: Candidate<'_>, value: &Value) -> StreamResult<()> {
        if self.closed {
            return Err(StreamError::Closed);
        }
        let tree = Arc::clone(&self.tree);
        let outcome = Matcher::new(&tree, &mut self.state).match_next(tree.root(), candidate, true);
        match outcome {
            MatchOutcome::Matched { leaf, .. } if tree.is_group(leaf) => {
                Lifecycle::new(&tree, &mut self.state).set_value(leaf, Some(value));
                self.write_group(leaf)
            }
            MatchOutcome::Matched { leaf, .. } => self.write_record(leaf, Some(value)),
            outcome => {
                let Some(known) = self.identify(candidate, value) else {
                    let type_name = match value {
                        Value::Object(object) => object.type_name.clone(),
                        other => other.value_type().to_string(),
                    };
                    return Err(StreamError::UnidentifiedObject { type_name });
                };
                match outcome {
                    MatchOutcome::Unsatisfied(node) => Err(self.unsatisfied(node)),
                    _ => {
                        let name = tree.name_of(known).to_string();
                        debug!(record = %name, "object out of sequence");
                        Err(StreamError::Unexpected {
                            line: self.lines + 1,
                            record: name,
                        })
                    }
                }
            }
        }
    }

    /// Any record or group the candidate could belong to, ignoring position.
    fn identify(&self, candidate: Candidate<'_>, value: &Value) -> Option<NodeId> {
        let tree = &self.tree;
        match candidate {
            Candidate::Named(name) => tree.find(name),
            _ => (0..tree.len()).map(NodeId).find(|&id| match &tree.node(id).kind {
                NodeKind::Record(_) => tree.is_writable(id) && tree.defines(id, value),
                NodeKind::Group(_) => tree.is_typed(id) && tree.defines(id, value),
                _ => false,
            }),
        }
    }

    fn unsatisfied(&mut self, node: NodeId) -> StreamError {
        let name = self.tree.name_of(node).to_string();
        warn!(line = self.lines + 1, node = %name, "structural violation");
        self.context
            .record_errors
            .push(format!("expected record or group '{}'", name));
        StreamError::unsatisfied(self.lines + 1, name)
    }

    fn write_record(&mut self, record: NodeId, value: Option<&Value>) -> StreamResult<()> {
        let tree = Arc::clone(&self.tree);
        let mut ctx = ParsingContext::new(Mode::Write, tree.limits.max_unbounded_repetitions);
        let mut raw = tree.format.new_record();
        let mut life = Lifecycle::new(&tree, &mut self.state);
        life.set_value(record, value);
        life.marshal(record, &mut ctx, &mut raw);

        self.lines += 1;
        self.context = RecordContext {
            record_name: Some(tree.name_of(record).to_string()),
            line_number: self.lines,
            text: Some(raw.text()),
            ..RecordContext::default()
        };
        self.writer.write_record(raw)
    }

    /// Values collected for a record or group: the items of its
    /// per-occurrence collection, or its own value.
    fn items_of(&self, node: NodeId) -> Vec<Value> {
        match self.tree.node(node).wrapper {
            Some(wrapper) => match self.state.slot(wrapper).value() {
                Some(Value::List(items)) => items.clone(),
                Some(Value::Map(entries)) => entries.iter().map(|(_, v)| v.clone()).collect(),
                Some(other) => vec![other.clone()],
                None => Vec::new(),
            },
            None => self.state.slot(node).value().cloned().into_iter().collect(),
        }
    }

    /// Write the children of a group whose value has been distributed.
    fn write_group(&mut self, group: NodeId) -> StreamResult<()> {
        let tree = Arc::clone(&self.tree);
        let Some(node) = tree.group(group) else {
            return Ok(());
        };
        for &child in &node.children {
            let occurs = tree.occurs(child);
            let typed = tree.is_typed(child);
            match &tree.node(child).kind {
                NodeKind::Record(_) if !typed => {
                    for _ in 0..occurs.min {
                        self.write_record(child, None)?;
                    }
                }
                NodeKind::Group(_) if !typed => self.write_group(child)?,
                NodeKind::Record(_) | NodeKind::Group(_) => {
                    let items = self.items_of(child);
                    if items.is_empty() && occurs.min >= 1 {
                        return Err(self.unsatisfied(child));
                    }
                    for item in items.iter().take(occurs.max_limit()) {
                        if tree.is_group(child) {
                            Lifecycle::new(&tree, &mut self.state).set_value(child, Some(item));
                            self.write_group(child)?;
                        } else {
                            self.write_record(child, Some(item))?;
                        }
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }
}
