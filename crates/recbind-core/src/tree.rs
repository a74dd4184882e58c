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

//! Compiled parser-component tree and per-session state.
//!
//! The tree is an arena of [`Component`]s allocated in depth-first preorder,
//! so every subtree is the contiguous id range `id..subtree_end`. The tree
//! shape is immutable and shared between sessions; each session owns a
//! [`State`] block indexed in parallel with the arena.

use crate::binding::{Accessor, TypeFactory};
use crate::config::MaxOccurs;
use crate::format::{FieldFormat, FieldLayout, RawRecord};
use crate::handler::TypeHandler;
use crate::limits::Limits;
use crate::value::{Slot, Value};
use regex::Regex;
use std::fmt;
use std::sync::Arc;

/// Index of a component in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Resolved occurrence bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Occurs {
    pub min: usize,
    pub max: MaxOccurs,
}

impl Occurs {
    pub const ONCE: Occurs = Occurs {
        min: 1,
        max: MaxOccurs::Bounded(1),
    };

    pub fn max_limit(&self) -> usize {
        self.max.limit()
    }

    pub fn repeats(&self) -> bool {
        self.max_limit() > 1
    }
}

/// Container produced by an aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionKind {
    Array,
    List,
    Set,
    Map,
}

impl CollectionKind {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "array" => Some(Self::Array),
            "list" => Some(Self::List),
            "set" => Some(Self::Set),
            "map" => Some(Self::Map),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub struct GroupNode {
    pub order: u32,
    pub occurs: Occurs,
    /// Structural children, stably sorted by order.
    pub children: Vec<NodeId>,
    /// Composite assembling the group object, when the group is typed.
    pub body: Option<NodeId>,
    /// Whether any descendant record can be written from an object.
    pub writable: bool,
}

#[derive(Debug)]
pub struct RecordNode {
    pub order: u32,
    pub occurs: Occurs,
    /// Always a composite.
    pub body: NodeId,
    /// Identifying fields, checked at iteration offset zero.
    pub identifiers: Vec<NodeId>,
}

#[derive(Debug)]
pub struct CompositeNode {
    /// `None` for untyped records, whose fields are validated but not bound.
    pub factory: Option<Arc<dyn TypeFactory>>,
    /// Every child property in declaration order, bound or not.
    pub children: Vec<NodeId>,
    /// Selected constructor.
    pub constructor: usize,
    /// Constructor-bound children ordered by argument index.
    pub constructor_args: Vec<NodeId>,
    /// Materialize even when every child is missing.
    pub required: bool,
    /// Contains an identifying field.
    pub identifier: bool,
}

#[derive(Debug)]
pub struct FieldNode {
    pub layout: FieldLayout,
    pub handler: Arc<dyn TypeHandler>,
    pub identifier: bool,
    pub literal: Option<String>,
    /// Anchored pattern.
    pub regex: Option<Regex>,
    pub required: bool,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub default: Option<String>,
    /// Missing text is a minOccurs error.
    pub mandatory: bool,
}

impl FieldNode {
    /// Whether text satisfies the literal and regex of this field.
    pub fn matches(&self, text: &str) -> bool {
        self.literal.as_deref().map_or(true, |l| l == text)
            && self.regex.as_ref().map_or(true, |r| r.is_match(text))
    }

    /// Text written when no value is present.
    pub fn fallback_text(&self) -> &str {
        self.literal
            .as_deref()
            .or(self.default.as_deref())
            .unwrap_or("")
    }
}

#[derive(Debug)]
pub struct ConstantNode {
    pub value: Value,
}

#[derive(Debug)]
pub struct AggregationNode {
    pub kind: CollectionKind,
    pub occurs: Occurs,
    pub child: NodeId,
    /// Positions consumed by one repetition.
    pub stride: usize,
    /// Collects one value per matched record or group occurrence instead of
    /// iterating positions inside one record.
    pub per_occurrence: bool,
    /// Key field of a map aggregation.
    pub key: Option<NodeId>,
    /// First position of the child.
    pub position: usize,
}

#[derive(Debug)]
pub enum NodeKind {
    Group(GroupNode),
    Record(RecordNode),
    Composite(CompositeNode),
    Field(FieldNode),
    Constant(ConstantNode),
    Aggregation(AggregationNode),
}

/// One node of the compiled tree.
#[derive(Debug)]
pub struct Component {
    pub name: String,
    pub parent: Option<NodeId>,
    /// Binding to the enclosing object, if bound.
    pub accessor: Option<Arc<dyn Accessor>>,
    /// Per-occurrence aggregation collecting this record or group.
    pub wrapper: Option<NodeId>,
    /// Exclusive end of this node's preorder range.
    pub subtree_end: usize,
    pub kind: NodeKind,
}

/// Immutable compiled tree shared by all sessions of a stream.
#[derive(Debug)]
pub struct Tree {
    pub(crate) name: String,
    pub(crate) nodes: Vec<Component>,
    pub(crate) root: NodeId,
    pub(crate) format: Arc<dyn FieldFormat>,
    pub(crate) ignore_unidentified: bool,
    pub(crate) limits: Limits,
    /// Every record node, in preorder.
    pub(crate) records: Vec<NodeId>,
}

impl Tree {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> &Component {
        &self.nodes[id.0]
    }

    pub fn name_of(&self, id: NodeId) -> &str {
        &self.nodes[id.0].name
    }

    /// Find a record or group by name.
    pub fn find(&self, name: &str) -> Option<NodeId> {
        self.nodes
            .iter()
            .position(|n| n.name == name && matches!(n.kind, NodeKind::Group(_) | NodeKind::Record(_)))
            .map(NodeId)
    }

    pub(crate) fn group(&self, id: NodeId) -> Option<&GroupNode> {
        match &self.nodes[id.0].kind {
            NodeKind::Group(g) => Some(g),
            _ => None,
        }
    }

    pub(crate) fn record(&self, id: NodeId) -> Option<&RecordNode> {
        match &self.nodes[id.0].kind {
            NodeKind::Record(r) => Some(r),
            _ => None,
        }
    }

    pub(crate) fn composite(&self, id: NodeId) -> Option<&CompositeNode> {
        match &self.nodes[id.0].kind {
            NodeKind::Composite(c) => Some(c),
            _ => None,
        }
    }

    pub(crate) fn field(&self, id: NodeId) -> Option<&FieldNode> {
        match &self.nodes[id.0].kind {
            NodeKind::Field(f) => Some(f),
            _ => None,
        }
    }

    /// Order of a record or group (1 for anything else).
    pub(crate) fn order(&self, id: NodeId) -> u32 {
        match &self.nodes[id.0].kind {
            NodeKind::Group(g) => g.order,
            NodeKind::Record(r) => r.order,
            _ => 1,
        }
    }

    pub(crate) fn occurs(&self, id: NodeId) -> Occurs {
        match &self.nodes[id.0].kind {
            NodeKind::Group(g) => g.occurs,
            NodeKind::Record(r) => r.occurs,
            NodeKind::Aggregation(a) => a.occurs,
            _ => Occurs::ONCE,
        }
    }

    /// Composite assembling the object of a record or typed group.
    pub(crate) fn body(&self, id: NodeId) -> Option<NodeId> {
        match &self.nodes[id.0].kind {
            NodeKind::Group(g) => g.body,
            NodeKind::Record(r) => Some(r.body),
            _ => None,
        }
    }

    /// Whether a record or group produces an object.
    pub(crate) fn is_typed(&self, id: NodeId) -> bool {
        self.body(id)
            .and_then(|b| self.composite(b))
            .map_or(false, |c| c.factory.is_some())
    }

    pub(crate) fn is_group(&self, id: NodeId) -> bool {
        matches!(self.nodes[id.0].kind, NodeKind::Group(_))
    }

    /// Whether an object can be written through this record or group.
    pub(crate) fn is_writable(&self, id: NodeId) -> bool {
        match &self.nodes[id.0].kind {
            NodeKind::Group(g) => g.writable,
            NodeKind::Record(_) => self.is_typed(id),
            _ => false,
        }
    }

    /// Whether `id` lies strictly inside the subtree of `ancestor`.
    pub(crate) fn contains(&self, ancestor: NodeId, id: NodeId) -> bool {
        id.0 > ancestor.0 && id.0 < self.nodes[ancestor.0].subtree_end
    }

    /// Whether every identifying field of a record matches a raw record.
    pub(crate) fn identifies(&self, record: NodeId, raw: &RawRecord) -> bool {
        let Some(r) = self.record(record) else {
            return false;
        };
        r.identifiers.iter().all(|&id| {
            self.field(id).map_or(false, |f| {
                self.format
                    .extract(raw, &f.layout, 0)
                    .map_or(false, |text| f.matches(&text))
            })
        })
    }

    /// Whether `value` belongs to this node: its type is compatible and every
    /// identifying descendant accepts the corresponding property.
    pub(crate) fn defines(&self, id: NodeId, value: &Value) -> bool {
        let node = &self.nodes[id.0];
        match &node.kind {
            NodeKind::Record(r) => self.defines(r.body, value),
            NodeKind::Group(g) => g.body.map_or(false, |b| self.defines(b, value)),
            NodeKind::Composite(c) => {
                let Some(factory) = &c.factory else {
                    return false;
                };
                factory.is_instance(value)
                    && c.children.iter().all(|&child| {
                        if !self.is_identifier(child) {
                            return true;
                        }
                        let property = self.nodes[child.0]
                            .accessor
                            .as_ref()
                            .and_then(|a| a.get(value));
                        self.defines_property(child, property.as_ref())
                    })
            }
            _ => false,
        }
    }

    fn defines_property(&self, id: NodeId, value: Option<&Value>) -> bool {
        match &self.nodes[id.0].kind {
            NodeKind::Field(f) => match value.filter(|v| !v.is_null()) {
                Some(v) => f.matches(&f.handler.format(v)),
                None => f.matches(f.fallback_text()),
            },
            NodeKind::Composite(_) => value.map_or(false, |v| self.defines(id, v)),
            _ => false,
        }
    }

    fn is_identifier(&self, id: NodeId) -> bool {
        match &self.nodes[id.0].kind {
            NodeKind::Field(f) => f.identifier,
            NodeKind::Composite(c) => c.identifier,
            _ => false,
        }
    }
}

/// Matching cursor of a record or group.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Cursor {
    /// Occurrences matched since the parent was last reset.
    pub count: usize,
    /// Group only: the child that matched most recently.
    pub last_matched: Option<NodeId>,
    /// Group only: order value of the current position.
    pub position: u32,
}

/// Mutable call-state of one node.
#[derive(Debug, Clone, Default)]
pub struct NodeState {
    pub slot: Slot,
    pub cursor: Cursor,
    /// Typed group with an occurrence being assembled.
    pub open: bool,
}

/// Per-session state block, indexed in parallel with the tree.
#[derive(Debug, Clone)]
pub struct State {
    nodes: Vec<NodeState>,
}

impl State {
    pub fn new(tree: &Tree) -> Self {
        let mut state = Self {
            nodes: vec![NodeState::default(); tree.len()],
        };
        for (i, node) in tree.nodes.iter().enumerate() {
            if let NodeKind::Group(g) = &node.kind {
                state.nodes[i].cursor.position = first_order(tree, g);
            }
        }
        state
    }

    pub fn slot(&self, id: NodeId) -> &Slot {
        &self.nodes[id.0].slot
    }

    pub fn set_slot(&mut self, id: NodeId, slot: Slot) {
        self.nodes[id.0].slot = slot;
    }

    pub fn take_slot(&mut self, id: NodeId) -> Slot {
        std::mem::take(&mut self.nodes[id.0].slot)
    }

    pub fn cursor(&self, id: NodeId) -> &Cursor {
        &self.nodes[id.0].cursor
    }

    pub fn cursor_mut(&mut self, id: NodeId) -> &mut Cursor {
        &mut self.nodes[id.0].cursor
    }

    pub fn is_open(&self, id: NodeId) -> bool {
        self.nodes[id.0].open
    }

    pub fn set_open(&mut self, id: NodeId, open: bool) {
        self.nodes[id.0].open = open;
    }

    /// Copy the cursors of a subtree.
    pub fn snapshot(&self, tree: &Tree, id: NodeId) -> Vec<Cursor> {
        self.nodes[id.0..tree.node(id).subtree_end]
            .iter()
            .map(|n| n.cursor)
            .collect()
    }

    /// Restore cursors taken with [`snapshot`](Self::snapshot).
    pub fn restore(&mut self, id: NodeId, cursors: Vec<Cursor>) {
        for (node, cursor) in self.nodes[id.0..].iter_mut().zip(cursors) {
            node.cursor = cursor;
        }
    }
}

/// Order value of the first child of a group.
pub(crate) fn first_order(tree: &Tree, group: &GroupNode) -> u32 {
    group
        .children
        .first()
        .map_or(1, |&child| tree.order(child))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collection_kind_names() {
        assert_eq!(CollectionKind::from_name("List"), Some(CollectionKind::List));
        assert_eq!(CollectionKind::from_name("array"), Some(CollectionKind::Array));
        assert_eq!(CollectionKind::from_name("map"), Some(CollectionKind::Map));
        assert_eq!(CollectionKind::from_name("bag"), None);
    }

    #[test]
    fn test_occurs() {
        assert!(!Occurs::ONCE.repeats());
        let many = Occurs {
            min: 0,
            max: MaxOccurs::Unbounded,
        };
        assert!(many.repeats());
        assert_eq!(many.max_limit(), usize::MAX);
    }

    #[test]
    fn test_cursor_default() {
        let c = Cursor::default();
        assert_eq!(c.count, 0);
        assert_eq!(c.last_matched, None);
    }
}
