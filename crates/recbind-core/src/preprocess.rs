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

//! Schema preprocessing: defaults, positions, ordering and validation.
//!
//! Runs once over a [`StreamConfig`] before tree compilation and rewrites it
//! in place. Afterwards every record, group, segment and field has explicit
//! occurrence bounds, every record and group has an order and every field
//! has a position. Any inconsistency fails fast with a [`ConfigError`].
//!
//! Default occurrences:
//!
//! | Node                      | minOccurs | maxOccurs                          |
//! |---------------------------|-----------|------------------------------------|
//! | group (untyped or top)    | 0         | unbounded                          |
//! | group (typed, nested)     | 0         | unbounded with a collection, else 1 |
//! | record, segment, field    | 1         | unbounded with a collection, else 1 |

use crate::config::{
    FieldConfig, FormatKind, GroupConfig, MaxOccurs, NodeAttrs, NodeConfig, PropertyConfig,
    RecordConfig, SegmentConfig, StreamConfig,
};
use crate::error::{ConfigError, ConfigResult};
use crate::tree::{CollectionKind, Occurs};

/// Preprocess a stream configuration in place.
pub fn preprocess(config: &mut StreamConfig) -> ConfigResult<()> {
    let context = format!("stream '{}'", config.name);
    if config.children.is_empty() {
        return Err(ConfigError::invariant("stream declares no records").with_context(context));
    }
    let p = Preprocessor {
        format: config.format,
        ordered: config.ordered,
    };
    p.children(&mut config.children, false)
        .map_err(|e| e.with_context(context))
}

struct Preprocessor {
    format: FormatKind,
    ordered: bool,
}

/// Running field position within one record.
#[derive(Default)]
struct Layout {
    next: usize,
    after_unbounded: Option<String>,
}

impl Preprocessor {
    fn children(&self, children: &mut [NodeConfig], typed_parent: bool) -> ConfigResult<()> {
        for child in children.iter_mut() {
            match child {
                NodeConfig::Group(g) => {
                    let context = format!("group '{}'", g.name);
                    self.group(g, typed_parent)
                        .map_err(|e| e.with_context(context))?;
                }
                NodeConfig::Record(r) => {
                    let context = format!("record '{}'", r.name);
                    self.record(r, typed_parent)
                        .map_err(|e| e.with_context(context))?;
                }
            }
        }
        self.assign_order(children)
    }

    fn group(&self, g: &mut GroupConfig, typed_parent: bool) -> ConfigResult<()> {
        let typed = g.attrs.type_name.is_some();
        let bound = typed_parent && typed;
        let default_max = if bound && g.attrs.collection.is_none() {
            MaxOccurs::Bounded(1)
        } else {
            MaxOccurs::Unbounded
        };
        let occurs = resolve_occurs(&mut g.attrs, 0, default_max)?;
        check_collection(&g.attrs, bound, occurs, false, None)?;
        if g.children.is_empty() {
            return Err(ConfigError::invariant("group declares no children"));
        }
        self.children(&mut g.children, typed_parent || typed)
    }

    fn record(&self, r: &mut RecordConfig, typed_parent: bool) -> ConfigResult<()> {
        let typed = r.attrs.type_name.is_some();
        let bound = typed_parent && typed;
        let max = default_max(&r.attrs);
        let occurs = resolve_occurs(&mut r.attrs, 1, max)?;
        check_collection(&r.attrs, bound, occurs, true, r.key.as_deref())?;
        let mut layout = Layout::default();
        self.properties(&mut r.properties, typed, false, &mut layout)
    }

    fn properties(
        &self,
        properties: &mut [PropertyConfig],
        bound: bool,
        in_repeat: bool,
        layout: &mut Layout,
    ) -> ConfigResult<()> {
        for property in properties.iter_mut() {
            match property {
                PropertyConfig::Field(f) => {
                    let context = format!("field '{}'", f.name);
                    self.field(f, bound, in_repeat, layout)
                        .map_err(|e| e.with_context(context))?;
                }
                PropertyConfig::Segment(s) => {
                    let context = format!("segment '{}'", s.name);
                    self.segment(s, bound, in_repeat, layout)
                        .map_err(|e| e.with_context(context))?;
                }
                PropertyConfig::Constant(c) => {
                    if c.constructor_arg.is_some() && !bound {
                        return Err(ConfigError::binding(format!(
                            "constant '{}' is a constructor argument of an unbound parent",
                            c.name
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    fn field(
        &self,
        f: &mut FieldConfig,
        bound_parent: bool,
        in_repeat: bool,
        layout: &mut Layout,
    ) -> ConfigResult<()> {
        if f.ignore && f.constructor_arg.is_some() {
            return Err(ConfigError::binding(
                "an ignored field cannot be a constructor argument",
            ));
        }
        let bound = bound_parent && !f.ignore;
        let max = default_max(&f.attrs);
        let occurs = resolve_occurs(&mut f.attrs, 1, max)?;
        check_collection(&f.attrs, bound, occurs, false, None)?;

        if let (Some(min), Some(max)) = (f.min_length, f.max_length) {
            if min > max {
                return Err(ConfigError::invariant(format!(
                    "minLength {} exceeds maxLength {}",
                    min, max
                )));
            }
        }
        if f.record_identifier {
            if occurs.repeats() || in_repeat {
                return Err(ConfigError::invariant("a record identifier cannot repeat"));
            }
            if f.literal.is_none() && f.regex.is_none() {
                return Err(ConfigError::invariant(
                    "a record identifier requires a literal or regex",
                ));
            }
        }

        let width = match self.format {
            FormatKind::Delimited => 1,
            FormatKind::FixedLength => match f.length {
                Some(0) | None => {
                    return Err(ConfigError::layout("fixed-length fields require a positive length"))
                }
                Some(n) => n,
            },
        };
        let position = match f.position {
            Some(p) => p,
            None => {
                if let Some(prev) = &layout.after_unbounded {
                    return Err(ConfigError::layout(format!(
                        "field follows unbounded repetition '{}' without an explicit position",
                        prev
                    )));
                }
                layout.next
            }
        };
        f.position = Some(position);

        let span = if occurs.max.is_unbounded() {
            if in_repeat {
                return Err(ConfigError::layout(
                    "an unbounded repetition cannot be nested in another repetition",
                ));
            }
            layout.after_unbounded = Some(f.name.clone());
            width
        } else {
            width * occurs.max_limit()
        };
        layout.next = layout.next.max(position + span);
        Ok(())
    }

    fn segment(
        &self,
        s: &mut SegmentConfig,
        bound: bool,
        in_repeat: bool,
        layout: &mut Layout,
    ) -> ConfigResult<()> {
        if s.properties.is_empty() {
            return Err(ConfigError::invariant("segment declares no properties"));
        }
        let max = default_max(&s.attrs);
        let occurs = resolve_occurs(&mut s.attrs, 1, max)?;
        check_collection(&s.attrs, bound, occurs, true, s.key.as_deref())?;
        let repeats = occurs.repeats();
        if repeats {
            if let Some(prev) = &layout.after_unbounded {
                return Err(ConfigError::layout(format!(
                    "repeating segment follows unbounded repetition '{}'",
                    prev
                )));
            }
        }

        let start = layout.next;
        self.properties(&mut s.properties, bound, in_repeat || repeats, layout)?;
        let size = layout.next - start;
        if repeats {
            if occurs.max.is_unbounded() {
                if in_repeat {
                    return Err(ConfigError::layout(
                        "an unbounded repetition cannot be nested in another repetition",
                    ));
                }
                layout.after_unbounded = Some(s.name.clone());
            } else {
                layout.next = start + size * occurs.max_limit();
            }
        }
        Ok(())
    }

    fn assign_order(&self, children: &mut [NodeConfig]) -> ConfigResult<()> {
        let declared = children.iter().filter(|c| order_of(c).is_some()).count();
        if declared != 0 && declared != children.len() {
            return Err(ConfigError::ordering(
                "either all or none of a group's children must declare an order",
            ));
        }
        if !self.ordered {
            for child in children.iter_mut() {
                set_order(child, 1);
            }
            return Ok(());
        }
        if declared == 0 {
            for (i, child) in children.iter_mut().enumerate() {
                set_order(child, i as u32 + 1);
            }
            return Ok(());
        }
        let mut previous = 0;
        for child in children.iter() {
            let order = order_of(child).unwrap_or(0);
            if order < 1 {
                return Err(ConfigError::ordering(format!(
                    "'{}' declares order {}, orders start at 1",
                    child.name(),
                    order
                )));
            }
            if order < previous {
                return Err(ConfigError::ordering(format!(
                    "'{}' declares order {} after a sibling with order {}",
                    child.name(),
                    order,
                    previous
                )));
            }
            previous = order;
        }
        Ok(())
    }
}

fn order_of(node: &NodeConfig) -> Option<u32> {
    match node {
        NodeConfig::Group(g) => g.order,
        NodeConfig::Record(r) => r.order,
    }
}

fn set_order(node: &mut NodeConfig, order: u32) {
    match node {
        NodeConfig::Group(g) => g.order = Some(order),
        NodeConfig::Record(r) => r.order = Some(order),
    }
}

fn default_max(attrs: &NodeAttrs) -> MaxOccurs {
    if attrs.collection.is_some() {
        MaxOccurs::Unbounded
    } else {
        MaxOccurs::Bounded(1)
    }
}

fn resolve_occurs(attrs: &mut NodeAttrs, default_min: usize, default_max: MaxOccurs) -> ConfigResult<Occurs> {
    let min = attrs.min_occurs.unwrap_or(default_min);
    let max = attrs.max_occurs.unwrap_or(default_max);
    if max == MaxOccurs::Bounded(0) {
        return Err(ConfigError::occurs("maxOccurs must be at least 1"));
    }
    if min > max.limit() {
        return Err(ConfigError::occurs(format!(
            "minOccurs {} exceeds maxOccurs {}",
            min, max
        )));
    }
    attrs.min_occurs = Some(min);
    attrs.max_occurs = Some(max);
    Ok(Occurs { min, max })
}

fn check_collection(
    attrs: &NodeAttrs,
    bound: bool,
    occurs: Occurs,
    allow_map: bool,
    key: Option<&str>,
) -> ConfigResult<()> {
    match attrs.collection.as_deref() {
        Some(name) => {
            let kind = CollectionKind::from_name(name)
                .ok_or_else(|| ConfigError::binding(format!("unknown collection type '{}'", name)))?;
            if !bound {
                return Err(ConfigError::binding(format!(
                    "collection '{}' declared on a node that is not bound to a parent object",
                    name
                )));
            }
            if !occurs.repeats() {
                return Err(ConfigError::binding(format!(
                    "collection '{}' requires maxOccurs greater than 1",
                    name
                )));
            }
            if kind == CollectionKind::Map {
                if !allow_map {
                    return Err(ConfigError::binding(
                        "map collections are only supported on records and segments",
                    ));
                }
                if key.is_none() {
                    return Err(ConfigError::binding("a map collection requires a key"));
                }
            }
            Ok(())
        }
        None if bound && occurs.repeats() => Err(ConfigError::binding(
            "a repeating bound property requires a collection type",
        )),
        None => Ok(()),
    }
}
