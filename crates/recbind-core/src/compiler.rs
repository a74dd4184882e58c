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

//! Tree compiler: the second pass over a preprocessed schema.
//!
//! The builder walks the configuration with two stacks. The parser stack
//! holds the nodes under construction (and gives every node its parent and
//! the nesting depth); the property stack holds the innermost composite that
//! freshly built properties are attached to. Repeating nodes get an
//! aggregation allocated in front of them, so the aggregation's preorder
//! range encloses the node it wraps.

use crate::binding::{AccessorHints, DynamicType, TypeFactory};
use crate::config::{
    ConstantConfig, FieldConfig, FormatKind, GroupConfig, MaxOccurs, NodeAttrs, NodeConfig,
    PropertyConfig, RecordConfig, SegmentConfig, StreamConfig,
};
use crate::error::{ConfigError, ConfigResult};
use crate::format::{format_for, FieldLayout};
use crate::handler::{StringHandler, TypeHandler};
use crate::options::CompileOptions;
use crate::preprocess::preprocess;
use crate::tree::{
    AggregationNode, CollectionKind, Component, CompositeNode, ConstantNode, FieldNode, GroupNode,
    NodeId, NodeKind, Occurs, RecordNode, Tree,
};
use crate::value::ValueType;
use regex::Regex;
use std::sync::Arc;
use tracing::debug;

/// Preprocess and compile a schema into a component tree.
pub fn compile_tree(mut config: StreamConfig, options: &CompileOptions) -> ConfigResult<Tree> {
    preprocess(&mut config)?;

    let mut builder = TreeBuilder {
        options,
        format: config.format,
        nodes: Vec::new(),
        parser_stack: Vec::new(),
        property_stack: Vec::new(),
        records: Vec::new(),
    };
    let root = builder
        .root(&config)
        .map_err(|e| e.with_context(format!("stream '{}'", config.name)))?;

    debug!(
        stream = %config.name,
        nodes = builder.nodes.len(),
        records = builder.records.len(),
        "compiled stream"
    );

    Ok(Tree {
        name: config.name,
        nodes: builder.nodes,
        root,
        format: format_for(config.format),
        ignore_unidentified: config.ignore_unidentified_records,
        limits: options.limits.clone(),
        records: builder.records,
    })
}

struct TreeBuilder<'a> {
    options: &'a CompileOptions,
    format: FormatKind,
    nodes: Vec<Component>,
    parser_stack: Vec<NodeId>,
    property_stack: Vec<NodeId>,
    records: Vec<NodeId>,
}

fn occurs_of(attrs: &NodeAttrs) -> Occurs {
    Occurs {
        min: attrs.min_occurs.unwrap_or(1),
        max: attrs.max_occurs.unwrap_or(MaxOccurs::Bounded(1)),
    }
}

fn hints(attrs: &NodeAttrs, constructor_arg: Option<usize>) -> AccessorHints<'_> {
    AccessorHints {
        getter: attrs.getter.as_deref(),
        setter: attrs.setter.as_deref(),
        constructor_arg,
    }
}

impl<'a> TreeBuilder<'a> {
    // ==================== Arena ====================

    fn alloc(&mut self, name: &str, kind: NodeKind) -> ConfigResult<NodeId> {
        let limits = &self.options.limits;
        if self.nodes.len() >= limits.max_nodes {
            return Err(ConfigError::limit(format!(
                "schema compiles to more than {} nodes",
                limits.max_nodes
            )));
        }
        if self.parser_stack.len() >= limits.max_depth {
            return Err(ConfigError::limit(format!(
                "schema nesting exceeds maximum depth {}",
                limits.max_depth
            )));
        }
        let id = NodeId(self.nodes.len());
        self.nodes.push(Component {
            name: name.to_string(),
            parent: self.parser_stack.last().copied(),
            accessor: None,
            wrapper: None,
            subtree_end: id.0 + 1,
            kind,
        });
        Ok(id)
    }

    fn close(&mut self, id: NodeId) {
        self.nodes[id.0].subtree_end = self.nodes.len();
    }

    fn composite_mut(&mut self, id: NodeId) -> Option<&mut CompositeNode> {
        match &mut self.nodes[id.0].kind {
            NodeKind::Composite(c) => Some(c),
            _ => None,
        }
    }

    fn factory_of(&self, id: NodeId) -> Option<Arc<dyn TypeFactory>> {
        match &self.nodes[id.0].kind {
            NodeKind::Composite(c) => c.factory.clone(),
            _ => None,
        }
    }

    /// The composite properties are currently attached to.
    fn current_composite(&self) -> ConfigResult<NodeId> {
        let id = self
            .property_stack
            .last()
            .copied()
            .ok_or_else(|| ConfigError::invariant("property declared outside of a record"))?;
        match self.nodes[id.0].kind {
            NodeKind::Composite(_) => Ok(id),
            _ => Err(ConfigError::invariant(format!(
                "'{}' cannot hold child properties",
                self.nodes[id.0].name
            ))),
        }
    }

    /// Attach a property to a composite, resolving its accessor when the
    /// composite is bound to a type.
    fn attach(&mut self, composite: NodeId, property: NodeId, hints: Option<AccessorHints<'_>>) -> ConfigResult<()> {
        if let (Some(factory), Some(hints)) = (self.factory_of(composite), hints) {
            let name = self.nodes[property.0].name.clone();
            let accessor = factory.accessor(&name, hints)?;
            self.nodes[property.0].accessor = Some(accessor);
        }
        let c = self.composite_mut(composite).ok_or_else(|| {
            ConfigError::invariant("properties can only be attached to a composite")
        })?;
        c.children.push(property);
        Ok(())
    }

    // ==================== Structure ====================

    fn root(&mut self, config: &StreamConfig) -> ConfigResult<NodeId> {
        let id = self.alloc(
            &config.name,
            NodeKind::Group(GroupNode {
                order: 1,
                occurs: Occurs::ONCE,
                children: Vec::new(),
                body: None,
                writable: false,
            }),
        )?;
        self.parser_stack.push(id);
        let children = self.structural_children(&config.children)?;
        self.parser_stack.pop();
        self.finish_group(id, children);
        self.close(id);
        Ok(id)
    }

    fn structural_children(&mut self, children: &[NodeConfig]) -> ConfigResult<Vec<NodeId>> {
        children
            .iter()
            .map(|child| match child {
                NodeConfig::Group(g) => self
                    .group(g)
                    .map_err(|e| e.with_context(format!("group '{}'", g.name))),
                NodeConfig::Record(r) => self
                    .record(r)
                    .map_err(|e| e.with_context(format!("record '{}'", r.name))),
            })
            .collect()
    }

    fn group(&mut self, g: &GroupConfig) -> ConfigResult<NodeId> {
        let occurs = occurs_of(&g.attrs);
        let enclosing = self.property_stack.last().copied();
        let bound = enclosing.is_some() && g.attrs.type_name.is_some();
        let wrapper = if bound && occurs.repeats() {
            Some(self.aggregation(&g.name, g.attrs.collection.as_deref(), occurs, true)?)
        } else {
            None
        };

        let id = self.alloc(
            &g.name,
            NodeKind::Group(GroupNode {
                order: g.order.unwrap_or(1),
                occurs,
                children: Vec::new(),
                body: None,
                writable: false,
            }),
        )?;
        self.parser_stack.push(id);

        let body = match &g.attrs.type_name {
            Some(type_name) => {
                let factory = self.resolve_type(type_name)?;
                let body = self.alloc(&g.name, NodeKind::Composite(new_composite(Some(factory), true)))?;
                self.property_stack.push(body);
                Some(body)
            }
            None => None,
        };

        let children = self.structural_children(&g.children)?;

        if let Some(body) = body {
            self.property_stack.pop();
            self.finish_composite(body)?;
            if let NodeKind::Group(node) = &mut self.nodes[id.0].kind {
                node.body = Some(body);
            }
        }
        self.parser_stack.pop();
        self.finish_group(id, children);
        self.close(id);

        if let Some(w) = wrapper {
            self.finish_aggregation(w, id, None)?;
        }
        if let (true, Some(enclosing)) = (bound, enclosing) {
            self.attach(enclosing, wrapper.unwrap_or(id), Some(hints(&g.attrs, None)))?;
        }
        Ok(id)
    }

    fn finish_group(&mut self, id: NodeId, mut children: Vec<NodeId>) {
        children.sort_by_key(|&c| self.order_of(c));
        let writable = children.iter().any(|&c| match &self.nodes[c.0].kind {
            NodeKind::Group(g) => g.writable,
            NodeKind::Record(r) => self.factory_of(r.body).is_some(),
            _ => false,
        });
        if let NodeKind::Group(node) = &mut self.nodes[id.0].kind {
            node.children = children;
            node.writable = writable;
        }
    }

    fn order_of(&self, id: NodeId) -> u32 {
        match &self.nodes[id.0].kind {
            NodeKind::Group(g) => g.order,
            NodeKind::Record(r) => r.order,
            _ => 1,
        }
    }

    fn record(&mut self, r: &RecordConfig) -> ConfigResult<NodeId> {
        let occurs = occurs_of(&r.attrs);
        let enclosing = self.property_stack.last().copied();
        let bound = enclosing.is_some() && r.attrs.type_name.is_some();
        let wrapper = if bound && occurs.repeats() {
            Some(self.aggregation(&r.name, r.attrs.collection.as_deref(), occurs, true)?)
        } else {
            None
        };

        let id = self.alloc(
            &r.name,
            NodeKind::Record(RecordNode {
                order: r.order.unwrap_or(1),
                occurs,
                body: NodeId(0),
                identifiers: Vec::new(),
            }),
        )?;
        self.parser_stack.push(id);

        let factory = r
            .attrs
            .type_name
            .as_deref()
            .map(|t| self.resolve_type(t))
            .transpose()?;
        let body = self.alloc(&r.name, NodeKind::Composite(new_composite(factory, true)))?;
        self.parser_stack.push(body);
        self.property_stack.push(body);
        for property in &r.properties {
            self.property(property)?;
        }
        self.property_stack.pop();
        self.parser_stack.pop();
        self.finish_composite(body)?;
        self.close(body);

        let identifiers: Vec<NodeId> = (body.0..self.nodes.len())
            .filter(|&i| matches!(&self.nodes[i].kind, NodeKind::Field(f) if f.identifier))
            .map(NodeId)
            .collect();
        if let NodeKind::Record(node) = &mut self.nodes[id.0].kind {
            node.body = body;
            node.identifiers = identifiers;
        }
        self.parser_stack.pop();
        self.close(id);

        if let Some(w) = wrapper {
            let key = self.map_key(w, body, r.key.as_deref())?;
            self.finish_aggregation(w, id, key)?;
        }
        if let (true, Some(enclosing)) = (bound, enclosing) {
            self.attach(enclosing, wrapper.unwrap_or(id), Some(hints(&r.attrs, None)))?;
        }
        self.records.push(id);
        Ok(id)
    }

    // ==================== Properties ====================

    fn property(&mut self, property: &PropertyConfig) -> ConfigResult<()> {
        match property {
            PropertyConfig::Field(f) => self
                .field(f)
                .map_err(|e| e.with_context(format!("field '{}'", f.name))),
            PropertyConfig::Segment(s) => self
                .segment(s)
                .map_err(|e| e.with_context(format!("segment '{}'", s.name))),
            PropertyConfig::Constant(c) => self
                .constant(c)
                .map_err(|e| e.with_context(format!("constant '{}'", c.name))),
        }
    }

    fn field(&mut self, f: &FieldConfig) -> ConfigResult<()> {
        let parent = self.current_composite()?;
        let parent_factory = self.factory_of(parent);
        let bound = parent_factory.is_some() && !f.ignore;
        let occurs = occurs_of(&f.attrs);
        let wrapper = if occurs.repeats() {
            Some(self.aggregation(&f.name, f.attrs.collection.as_deref(), occurs, false)?)
        } else {
            None
        };

        let reflected = match (&parent_factory, bound && wrapper.is_none()) {
            (Some(factory), true) => factory.property_type(f.attrs.getter.as_deref().unwrap_or(&f.name)),
            _ => None,
        };
        let handler = self.resolve_handler(f.handler.as_deref(), f.attrs.type_name.as_deref(), reflected)?;
        if let Some(default) = &f.default {
            handler.parse(default).map_err(|e| {
                ConfigError::type_handler(format!("invalid default '{}': {}", default, e))
            })?;
        }
        let regex = f
            .regex
            .as_deref()
            .map(|pattern| Regex::new(&format!("^(?:{})$", pattern)))
            .transpose()
            .map_err(|e| ConfigError::invariant(format!("invalid regex: {}", e)))?;

        let id = self.alloc(
            &f.name,
            NodeKind::Field(FieldNode {
                layout: FieldLayout {
                    position: f.position.unwrap_or(0),
                    length: f.length,
                    padding: f.padding.unwrap_or(' '),
                    justify: f.justify,
                    trim: f.trim,
                },
                handler,
                identifier: f.record_identifier,
                literal: f.literal.clone(),
                regex,
                required: f.required,
                min_length: f.min_length,
                max_length: f.max_length,
                default: f.default.clone(),
                mandatory: wrapper.is_none() && occurs.min >= 1,
            }),
        )?;
        self.close(id);

        let property = match wrapper {
            Some(w) => {
                self.finish_aggregation(w, id, None)?;
                w
            }
            None => id,
        };
        let accessor_hints = bound.then(|| hints(&f.attrs, f.constructor_arg));
        self.attach(parent, property, accessor_hints)
    }

    fn segment(&mut self, s: &SegmentConfig) -> ConfigResult<()> {
        let parent = self.current_composite()?;
        let bound = self.factory_of(parent).is_some();
        let occurs = occurs_of(&s.attrs);
        let wrapper = if occurs.repeats() {
            Some(self.aggregation(&s.name, s.attrs.collection.as_deref(), occurs, false)?)
        } else {
            None
        };

        let factory = if bound {
            Some(match &s.attrs.type_name {
                Some(type_name) => self.resolve_type(type_name)?,
                None => Arc::new(DynamicType::open(s.name.clone())) as Arc<dyn TypeFactory>,
            })
        } else {
            None
        };
        let id = self.alloc(&s.name, NodeKind::Composite(new_composite(factory, false)))?;
        self.parser_stack.push(id);
        self.property_stack.push(id);
        for property in &s.properties {
            self.property(property)?;
        }
        self.property_stack.pop();
        self.parser_stack.pop();
        self.finish_composite(id)?;
        self.close(id);

        let property = match wrapper {
            Some(w) => {
                let key = self.map_key(w, id, s.key.as_deref())?;
                self.finish_aggregation(w, id, key)?;
                w
            }
            None => id,
        };
        let accessor_hints = bound.then(|| hints(&s.attrs, s.constructor_arg));
        self.attach(parent, property, accessor_hints)
    }

    fn constant(&mut self, c: &ConstantConfig) -> ConfigResult<()> {
        let parent = self.current_composite()?;
        let parent_factory = self.factory_of(parent);
        let reflected = parent_factory
            .as_ref()
            .and_then(|factory| factory.property_type(&c.name));
        let handler = self.resolve_handler(c.handler.as_deref(), c.type_name.as_deref(), reflected)?;
        let value = handler.parse(&c.value).map_err(|e| {
            ConfigError::type_handler(format!("invalid constant value '{}': {}", c.value, e))
        })?;
        let id = self.alloc(&c.name, NodeKind::Constant(ConstantNode { value }))?;
        self.close(id);
        let hints = parent_factory.is_some().then(|| AccessorHints {
            getter: c.getter.as_deref(),
            setter: c.setter.as_deref(),
            constructor_arg: c.constructor_arg,
        });
        self.attach(parent, id, hints)
    }

    // ==================== Aggregations ====================

    fn aggregation(
        &mut self,
        name: &str,
        collection: Option<&str>,
        occurs: Occurs,
        per_occurrence: bool,
    ) -> ConfigResult<NodeId> {
        let kind = collection
            .and_then(CollectionKind::from_name)
            .unwrap_or(CollectionKind::List);
        debug!(node = name, ?kind, per_occurrence, "wrapping repeating node in aggregation");
        let id = self.alloc(
            name,
            NodeKind::Aggregation(AggregationNode {
                kind,
                occurs,
                child: NodeId(0),
                stride: 0,
                per_occurrence,
                key: None,
                position: 0,
            }),
        )?;
        self.parser_stack.push(id);
        Ok(id)
    }

    fn finish_aggregation(&mut self, id: NodeId, child: NodeId, key: Option<NodeId>) -> ConfigResult<()> {
        let (start, end) = self.extent(child).unwrap_or((0, 0));
        let per_occurrence = match &mut self.nodes[id.0].kind {
            NodeKind::Aggregation(a) => {
                a.child = child;
                a.key = key;
                a.position = start;
                a.stride = end - start;
                a.per_occurrence
            }
            _ => false,
        };
        if per_occurrence {
            self.nodes[child.0].wrapper = Some(id);
        } else if end == start {
            return Err(ConfigError::layout("a repeating property must occupy at least one position"));
        }
        self.parser_stack.pop();
        self.close(id);
        Ok(())
    }

    /// Key field of a map aggregation, searched among the descendants of `scope`.
    fn map_key(&self, aggregation: NodeId, scope: NodeId, key: Option<&str>) -> ConfigResult<Option<NodeId>> {
        let is_map = matches!(
            &self.nodes[aggregation.0].kind,
            NodeKind::Aggregation(a) if a.kind == CollectionKind::Map
        );
        let Some(key) = key.filter(|_| is_map) else {
            return Ok(None);
        };
        (scope.0..self.nodes[scope.0].subtree_end)
            .find(|&i| self.nodes[i].name == key && matches!(self.nodes[i].kind, NodeKind::Field(_)))
            .map(|i| Some(NodeId(i)))
            .ok_or_else(|| ConfigError::binding(format!("map key field '{}' not found", key)))
    }

    /// Positions covered by a property, as a half-open range.
    fn extent(&self, id: NodeId) -> Option<(usize, usize)> {
        match &self.nodes[id.0].kind {
            NodeKind::Field(f) => {
                let start = f.layout.position;
                Some((start, start + f.layout.width(self.format)))
            }
            NodeKind::Composite(c) => c
                .children
                .iter()
                .filter_map(|&child| self.extent(child))
                .reduce(|(s1, e1), (s2, e2)| (s1.min(s2), e1.max(e2))),
            NodeKind::Aggregation(a) => self.extent(a.child).map(|(start, end)| {
                (start, start + (end - start).saturating_mul(a.occurs.max_limit()))
            }),
            _ => None,
        }
    }

    // ==================== Resolution ====================

    fn resolve_type(&self, name: &str) -> ConfigResult<Arc<dyn TypeFactory>> {
        match self.options.registry.type_factory(name) {
            Some(factory) => Ok(factory),
            None if self.options.strict_types => {
                Err(ConfigError::binding(format!("unknown type '{}'", name)))
            }
            None => Ok(Arc::new(DynamicType::open(name))),
        }
    }

    fn resolve_handler(
        &self,
        handler: Option<&str>,
        type_name: Option<&str>,
        reflected: Option<ValueType>,
    ) -> ConfigResult<Arc<dyn TypeHandler>> {
        let registry = &self.options.registry;
        if let Some(name) = handler {
            return registry
                .handler(name)
                .ok_or_else(|| ConfigError::type_handler(format!("no type handler named '{}'", name)));
        }
        if let Some(name) = type_name {
            return ValueType::from_name(name)
                .and_then(|ty| registry.handler_for(&ty))
                .or_else(|| registry.handler(name))
                .ok_or_else(|| ConfigError::type_handler(format!("no type handler for type '{}'", name)));
        }
        if let Some(handler) = reflected.and_then(|ty| registry.handler_for(&ty)) {
            return Ok(handler);
        }
        Ok(registry
            .handler_for(&ValueType::String)
            .unwrap_or_else(|| Arc::new(StringHandler)))
    }

    fn value_type_of(&self, id: NodeId) -> ValueType {
        match &self.nodes[id.0].kind {
            NodeKind::Field(f) => f.handler.value_type(),
            NodeKind::Constant(c) => c.value.value_type(),
            NodeKind::Composite(c) => c
                .factory
                .as_ref()
                .map_or(ValueType::Any, |f| ValueType::Object(f.type_name().to_string())),
            NodeKind::Aggregation(a) if a.kind == CollectionKind::Map => ValueType::Map,
            NodeKind::Aggregation(_) => ValueType::List,
            NodeKind::Group(_) | NodeKind::Record(_) => ValueType::Any,
        }
    }

    fn is_identifier(&self, id: NodeId) -> bool {
        match &self.nodes[id.0].kind {
            NodeKind::Field(f) => f.identifier,
            NodeKind::Composite(c) => c.identifier,
            _ => false,
        }
    }

    /// Resolve constructor arguments and select a constructor.
    fn finish_composite(&mut self, id: NodeId) -> ConfigResult<()> {
        let (factory, children) = match &self.nodes[id.0].kind {
            NodeKind::Composite(c) => (c.factory.clone(), c.children.clone()),
            _ => return Ok(()),
        };
        let identifier = children.iter().any(|&c| self.is_identifier(c));
        if let Some(c) = self.composite_mut(id) {
            c.identifier = identifier;
        }
        let Some(factory) = factory else {
            return Ok(());
        };

        let mut args: Vec<(usize, NodeId)> = children
            .iter()
            .filter_map(|&child| {
                self.nodes[child.0]
                    .accessor
                    .as_ref()
                    .and_then(|a| a.constructor_arg())
                    .map(|index| (index, child))
            })
            .collect();
        args.sort_by_key(|&(index, _)| index);
        for (expected, &(index, child)) in args.iter().enumerate() {
            if index != expected {
                return Err(ConfigError::constructor(format!(
                    "constructor arguments of '{}' must be contiguous from 0: '{}' has index {} where {} was expected",
                    factory.type_name(),
                    self.nodes[child.0].name,
                    index,
                    expected
                )));
            }
        }

        let types: Vec<ValueType> = args.iter().map(|&(_, c)| self.value_type_of(c)).collect();
        let constructor = factory
            .constructors()
            .iter()
            .position(|params| {
                params.len() == types.len() && params.iter().zip(&types).all(|(p, t)| p.accepts(t))
            })
            .ok_or_else(|| {
                let signature: Vec<String> = types.iter().map(ToString::to_string).collect();
                ConfigError::constructor(format!(
                    "type '{}' has no constructor accepting ({})",
                    factory.type_name(),
                    signature.join(", ")
                ))
            })?;

        if let Some(c) = self.composite_mut(id) {
            c.constructor = constructor;
            c.constructor_args = args.into_iter().map(|(_, child)| child).collect();
        }
        Ok(())
    }
}

fn new_composite(factory: Option<Arc<dyn TypeFactory>>, required: bool) -> CompositeNode {
    CompositeNode {
        factory,
        children: Vec::new(),
        constructor: 0,
        constructor_args: Vec::new(),
        required,
        identifier: false,
    }
}
