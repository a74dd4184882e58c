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

//! Property lifecycle: clear, unmarshal, create, set, marshal.
//!
//! [`Lifecycle`] pairs the shared tree with one session's state block. All
//! value slots live in the state, so the same tree serves any number of
//! concurrent sessions.

use crate::context::ParsingContext;
use crate::error::BindingError;
use crate::format::RawRecord;
use crate::tree::{AggregationNode, CollectionKind, FieldNode, NodeId, NodeKind, State, Tree};
use crate::value::{Slot, Value};

pub(crate) struct Lifecycle<'a> {
    pub tree: &'a Tree,
    pub state: &'a mut State,
}

fn present(value: &Value) -> Option<&Value> {
    (!value.is_null()).then_some(value)
}

impl<'a> Lifecycle<'a> {
    pub fn new(tree: &'a Tree, state: &'a mut State) -> Self {
        Self { tree, state }
    }

    /// Reset a node and its bound descendants to missing.
    pub fn clear(&mut self, id: NodeId) {
        let tree = self.tree;
        self.state.set_slot(id, Slot::Missing);
        match &tree.node(id).kind {
            NodeKind::Composite(c) => {
                for &child in &c.children {
                    self.clear(child);
                }
            }
            NodeKind::Aggregation(a) => self.clear(a.child),
            NodeKind::Record(r) => self.clear(r.body),
            NodeKind::Group(g) => {
                if let Some(body) = g.body {
                    self.clear(body);
                }
            }
            NodeKind::Field(_) | NodeKind::Constant(_) => {}
        }
    }

    // ==================== Reading ====================

    /// Extract and validate the values of a property from a raw record.
    ///
    /// Returns whether any text was present. Validation failures are added to
    /// the context and leave the affected slots invalid.
    pub fn unmarshal(&mut self, id: NodeId, ctx: &mut ParsingContext, raw: &RawRecord) -> Result<bool, BindingError> {
        let tree = self.tree;
        match &tree.node(id).kind {
            NodeKind::Field(f) => Ok(self.unmarshal_field(id, f, ctx, raw)),
            NodeKind::Composite(c) => {
                let mut found = false;
                for &child in &c.children {
                    found |= self.unmarshal(child, ctx, raw)?;
                }
                Ok(found)
            }
            NodeKind::Aggregation(a) if !a.per_occurrence => self.unmarshal_aggregation(id, a, ctx, raw),
            NodeKind::Record(r) => self.unmarshal(r.body, ctx, raw),
            NodeKind::Aggregation(_) | NodeKind::Group(_) | NodeKind::Constant(_) => Ok(false),
        }
    }

    fn unmarshal_field(&mut self, id: NodeId, f: &FieldNode, ctx: &mut ParsingContext, raw: &RawRecord) -> bool {
        let name = self.tree.name_of(id);
        let Some(text) = self.tree.format.extract(raw, &f.layout, ctx.offset()) else {
            if f.mandatory {
                ctx.add_error(name, "minOccurs", "expected field is missing");
                self.state.set_slot(id, Slot::Invalid);
            } else {
                self.state.set_slot(id, Slot::Missing);
            }
            return false;
        };

        if text.is_empty() {
            let slot = if f.required {
                ctx.add_error(name, "required", "required field is empty");
                Slot::Invalid
            } else {
                match f.default.as_deref().map(|d| f.handler.parse(d)) {
                    None => Slot::Value(Value::Null),
                    Some(Ok(value)) => Slot::Value(value),
                    Some(Err(e)) => {
                        ctx.add_error(name, "type", e.message);
                        Slot::Invalid
                    }
                }
            };
            self.state.set_slot(id, slot);
            return true;
        }

        let length = text.chars().count();
        let mut valid = true;
        if let Some(min) = f.min_length.filter(|&min| length < min) {
            ctx.add_error(name, "minLength", format!("length {} is below minimum {}", length, min));
            valid = false;
        }
        if let Some(max) = f.max_length.filter(|&max| length > max) {
            ctx.add_error(name, "maxLength", format!("length {} exceeds maximum {}", length, max));
            valid = false;
        }
        // Identifying fields were already checked during matching.
        if !f.identifier {
            if let Some(literal) = f.literal.as_deref().filter(|&l| l != text) {
                ctx.add_error(name, "literal", format!("expected '{}', found '{}'", literal, text));
                valid = false;
            }
            if f.regex.as_ref().map_or(false, |r| !r.is_match(&text)) {
                ctx.add_error(name, "regex", format!("'{}' does not match the pattern", text));
                valid = false;
            }
        }

        let slot = if !valid {
            Slot::Invalid
        } else {
            match f.handler.parse(&text) {
                Ok(value) => Slot::Value(value),
                Err(e) => {
                    ctx.add_error(name, "type", e.message);
                    Slot::Invalid
                }
            }
        };
        self.state.set_slot(id, slot);
        true
    }

    fn unmarshal_aggregation(
        &mut self,
        id: NodeId,
        a: &AggregationNode,
        ctx: &mut ParsingContext,
        raw: &RawRecord,
    ) -> Result<bool, BindingError> {
        let tree = self.tree;
        let limit = if a.occurs.max.is_unbounded() {
            ctx.max_unbounded()
        } else {
            a.occurs.max_limit()
        };
        let base = ctx.offset();

        let mut items: Vec<Value> = Vec::new();
        let mut entries: Vec<(Value, Value)> = Vec::new();
        let mut count = 0;
        let mut skipped = 0;
        let mut invalid = false;

        for i in 0..limit {
            if !tree.format.has_position(raw, a.position + base + i * a.stride) {
                break;
            }
            ctx.push_iteration(i, a.stride);
            self.clear(a.child);
            let slot = self
                .unmarshal(a.child, ctx, raw)
                .and_then(|_| self.create_value(a.child));
            let key = a.key.and_then(|k| self.state.slot(k).value().cloned());
            ctx.pop_iteration();

            let slot = slot?;
            if a.kind == CollectionKind::Map && key.as_ref().and_then(present).is_none() {
                break;
            }
            count += 1;
            match slot {
                Slot::Invalid => invalid = true,
                Slot::Missing => skipped += 1,
                Slot::Value(value) => match (a.kind, key) {
                    (CollectionKind::Map, Some(key)) => {
                        entries.retain(|(k, _)| *k != key);
                        entries.push((key, value));
                    }
                    (CollectionKind::Set, _) if items.contains(&value) => {}
                    _ => {
                        // Gaps before a present item keep their index.
                        items.extend(std::iter::repeat(Value::Null).take(skipped));
                        skipped = 0;
                        items.push(value);
                    }
                },
            }
        }

        let slot = if invalid {
            Slot::Invalid
        } else if count < a.occurs.min {
            ctx.add_error(
                tree.name_of(id),
                "minOccurs",
                format!("expected at least {} occurrences, found {}", a.occurs.min, count),
            );
            Slot::Invalid
        } else if a.kind == CollectionKind::Map {
            Slot::from((!entries.is_empty()).then_some(Value::Map(entries)))
        } else {
            Slot::from((!items.is_empty()).then_some(Value::List(items)))
        };
        self.state.set_slot(id, slot);
        Ok(count > 0)
    }

    /// Assemble the value of a node from the slots of its children.
    pub fn create_value(&mut self, id: NodeId) -> Result<Slot, BindingError> {
        let tree = self.tree;
        let c = match &tree.node(id).kind {
            NodeKind::Constant(c) => return Ok(Slot::Value(c.value.clone())),
            NodeKind::Composite(c) => c,
            _ => return Ok(self.state.slot(id).clone()),
        };
        let Some(factory) = &c.factory else {
            return Ok(Slot::Missing);
        };

        let mut values: Vec<(NodeId, Option<Value>)> = Vec::with_capacity(c.children.len());
        let mut any = false;
        for &child in &c.children {
            if tree.node(child).accessor.is_none() {
                continue;
            }
            let slot = self.create_value(child)?;
            if slot.is_invalid() {
                self.state.set_slot(id, Slot::Invalid);
                return Ok(Slot::Invalid);
            }
            let is_constant = matches!(tree.node(child).kind, NodeKind::Constant(_));
            if !is_constant && slot.value().and_then(present).is_some() {
                any = true;
            }
            values.push((child, slot.into_value()));
        }

        if !any && !c.required {
            self.state.set_slot(id, Slot::Missing);
            return Ok(Slot::Missing);
        }

        let args = c
            .constructor_args
            .iter()
            .map(|arg| {
                values
                    .iter()
                    .find(|(child, _)| child == arg)
                    .and_then(|(_, v)| v.clone())
                    .unwrap_or(Value::Null)
            })
            .collect();
        let mut object = factory.instantiate(c.constructor, args)?;
        for (child, value) in values {
            if c.constructor_args.contains(&child) {
                continue;
            }
            let (Some(accessor), Some(value)) = (&tree.node(child).accessor, value) else {
                continue;
            };
            if !value.is_null() {
                accessor.set(&mut object, value)?;
            }
        }
        self.state.set_slot(id, Slot::Value(object.clone()));
        Ok(Slot::Value(object))
    }

    /// Hand a finished record or group value to its parent: appended to the
    /// per-occurrence collection when wrapped, stored in the node otherwise.
    pub fn commit(&mut self, node: NodeId, slot: Slot) {
        let tree = self.tree;
        let Some(wrapper) = tree.node(node).wrapper else {
            self.state.set_slot(node, slot);
            return;
        };
        let NodeKind::Aggregation(a) = &tree.node(wrapper).kind else {
            return;
        };
        let Some(value) = slot.into_value() else {
            return;
        };
        let collected = match (a.kind, self.state.take_slot(wrapper).into_value()) {
            (CollectionKind::Map, current) => {
                let mut entries = match current {
                    Some(Value::Map(entries)) => entries,
                    _ => Vec::new(),
                };
                let key = a.key.and_then(|k| self.state.slot(k).value().cloned());
                if let Some(key) = key.filter(|k| !k.is_null()) {
                    entries.retain(|(k, _)| *k != key);
                    entries.push((key, value));
                }
                Value::Map(entries)
            }
            (kind, current) => {
                let mut items = match current {
                    Some(Value::List(items)) => items,
                    _ => Vec::new(),
                };
                if kind != CollectionKind::Set || !items.contains(&value) {
                    items.push(value);
                }
                Value::List(items)
            }
        };
        self.state.set_slot(wrapper, Slot::Value(collected));
    }

    /// Complete the open occurrence of a typed group.
    pub fn flush(&mut self, group: NodeId) -> Result<(), BindingError> {
        if let Some(body) = self.tree.body(group) {
            let slot = self.create_value(body)?;
            self.commit(group, slot);
        }
        self.state.set_open(group, false);
        Ok(())
    }

    // ==================== Writing ====================

    /// Distribute an object over a node and its bound descendants.
    pub fn set_value(&mut self, id: NodeId, value: Option<&Value>) {
        let tree = self.tree;
        let Some(value) = value.and_then(present) else {
            self.clear(id);
            return;
        };
        match &tree.node(id).kind {
            NodeKind::Field(_) | NodeKind::Aggregation(_) => {
                self.state.set_slot(id, Slot::Value(value.clone()));
            }
            NodeKind::Composite(c) => {
                self.state.set_slot(id, Slot::Value(value.clone()));
                for &child in &c.children {
                    match &tree.node(child).accessor {
                        Some(accessor) => {
                            let property = accessor.get(value);
                            self.set_value(child, property.as_ref());
                        }
                        None => self.clear(child),
                    }
                }
            }
            NodeKind::Record(r) => {
                self.state.set_slot(id, Slot::Value(value.clone()));
                self.set_value(r.body, Some(value));
            }
            NodeKind::Group(g) => {
                self.state.set_slot(id, Slot::Value(value.clone()));
                if let Some(body) = g.body {
                    self.set_value(body, Some(value));
                }
            }
            NodeKind::Constant(_) => {}
        }
    }

    /// Format the current values of a property into a raw record.
    pub fn marshal(&mut self, id: NodeId, ctx: &mut ParsingContext, record: &mut RawRecord) {
        let tree = self.tree;
        match &tree.node(id).kind {
            NodeKind::Field(f) => {
                let text = match self.state.slot(id).value().and_then(present) {
                    Some(value) => f.handler.format(value),
                    None => f.fallback_text().to_string(),
                };
                tree.format.insert(record, &f.layout, ctx.offset(), &text);
            }
            NodeKind::Composite(c) => {
                for &child in &c.children {
                    self.marshal(child, ctx, record);
                }
            }
            NodeKind::Record(r) => self.marshal(r.body, ctx, record),
            NodeKind::Aggregation(a) if !a.per_occurrence => {
                let items: Vec<Value> = match self.state.slot(id).value() {
                    Some(Value::List(items)) => items.clone(),
                    Some(Value::Map(entries)) => entries.iter().map(|(_, v)| v.clone()).collect(),
                    Some(other) => vec![other.clone()],
                    None => Vec::new(),
                };
                let count = items.len().max(a.occurs.min).min(a.occurs.max_limit());
                for i in 0..count {
                    ctx.push_iteration(i, a.stride);
                    self.set_value(a.child, items.get(i));
                    self.marshal(a.child, ctx, record);
                    ctx.pop_iteration();
                }
            }
            NodeKind::Aggregation(_) | NodeKind::Group(_) | NodeKind::Constant(_) => {}
        }
    }
}
