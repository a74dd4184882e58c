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

//! Declarative schema configuration.
//!
//! A [`StreamConfig`] is produced by an external loader (or built in code
//! with the fluent setters below), consumed once by [`compile`](crate::compile)
//! and then discarded. Unset attributes are filled in by the preprocessor.
//!
//! # Examples
//!
//! ```rust
//! use recbind_core::{FieldConfig, FormatKind, RecordConfig, StreamConfig};
//!
//! let config = StreamConfig::new("orders", FormatKind::Delimited)
//!     .record(
//!         RecordConfig::new("header")
//!             .occurs(1, 1)
//!             .type_name("Header")
//!             .field(FieldConfig::new("kind").rid().literal("H").ignore())
//!             .field(FieldConfig::new("date")),
//!     )
//!     .record(
//!         RecordConfig::new("detail")
//!             .unbounded()
//!             .type_name("Detail")
//!             .field(FieldConfig::new("kind").rid().literal("D").ignore())
//!             .field(FieldConfig::new("amount").type_name("int")),
//!     );
//! assert_eq!(config.children.len(), 2);
//! ```

use std::fmt;

/// Record layout of a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum FormatKind {
    /// Records are lists of fields; positions are field indexes.
    #[default]
    Delimited,
    /// Records are lines; positions are character offsets.
    FixedLength,
}

/// Upper occurrence bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum MaxOccurs {
    Bounded(usize),
    Unbounded,
}

impl MaxOccurs {
    /// The bound as a number, with `usize::MAX` for unbounded.
    pub fn limit(self) -> usize {
        match self {
            Self::Bounded(n) => n,
            Self::Unbounded => usize::MAX,
        }
    }

    pub fn is_unbounded(self) -> bool {
        matches!(self, Self::Unbounded)
    }
}

impl From<usize> for MaxOccurs {
    fn from(n: usize) -> Self {
        Self::Bounded(n)
    }
}

impl fmt::Display for MaxOccurs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bounded(n) => write!(f, "{}", n),
            Self::Unbounded => write!(f, "unbounded"),
        }
    }
}

/// Justification of fixed-length field text within its padding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Justify {
    #[default]
    Left,
    Right,
}

/// Root of a schema.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct StreamConfig {
    pub name: String,
    pub format: FormatKind,
    /// Enforce sibling order (default: true).
    pub ordered: bool,
    /// Skip records no node identifies instead of failing.
    pub ignore_unidentified_records: bool,
    pub children: Vec<NodeConfig>,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self::new("", FormatKind::Delimited)
    }
}

impl StreamConfig {
    pub fn new(name: impl Into<String>, format: FormatKind) -> Self {
        Self {
            name: name.into(),
            format,
            ordered: true,
            ignore_unidentified_records: false,
            children: Vec::new(),
        }
    }

    pub fn ordered(mut self, ordered: bool) -> Self {
        self.ordered = ordered;
        self
    }

    pub fn ignore_unidentified_records(mut self, ignore: bool) -> Self {
        self.ignore_unidentified_records = ignore;
        self
    }

    pub fn group(mut self, group: GroupConfig) -> Self {
        self.children.push(NodeConfig::Group(group));
        self
    }

    pub fn record(mut self, record: RecordConfig) -> Self {
        self.children.push(NodeConfig::Record(record));
        self
    }
}

/// A structural child of a group.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", rename_all = "lowercase"))]
pub enum NodeConfig {
    Group(GroupConfig),
    Record(RecordConfig),
}

impl NodeConfig {
    pub fn name(&self) -> &str {
        match self {
            Self::Group(g) => &g.name,
            Self::Record(r) => &r.name,
        }
    }
}

/// Attributes shared by groups, records, segments and fields.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct NodeAttrs {
    pub min_occurs: Option<usize>,
    pub max_occurs: Option<MaxOccurs>,
    /// Collection kind name: `list`, `array`, `set` or `map`.
    pub collection: Option<String>,
    /// Application type name (or value type name for fields).
    pub type_name: Option<String>,
    pub getter: Option<String>,
    pub setter: Option<String>,
}

macro_rules! node_setters {
    ($ty:ident) => {
        impl $ty {
            pub fn min_occurs(mut self, min: usize) -> Self {
                self.attrs.min_occurs = Some(min);
                self
            }

            pub fn max_occurs(mut self, max: usize) -> Self {
                self.attrs.max_occurs = Some(MaxOccurs::Bounded(max));
                self
            }

            /// Remove the upper occurrence bound.
            pub fn unbounded(mut self) -> Self {
                self.attrs.max_occurs = Some(MaxOccurs::Unbounded);
                self
            }

            /// Set both occurrence bounds.
            pub fn occurs(self, min: usize, max: usize) -> Self {
                self.min_occurs(min).max_occurs(max)
            }

            pub fn collection(mut self, kind: impl Into<String>) -> Self {
                self.attrs.collection = Some(kind.into());
                self
            }

            pub fn type_name(mut self, name: impl Into<String>) -> Self {
                self.attrs.type_name = Some(name.into());
                self
            }

            pub fn getter(mut self, name: impl Into<String>) -> Self {
                self.attrs.getter = Some(name.into());
                self
            }

            pub fn setter(mut self, name: impl Into<String>) -> Self {
                self.attrs.setter = Some(name.into());
                self
            }
        }
    };
}

/// A group of records and nested groups.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct GroupConfig {
    pub name: String,
    pub order: Option<u32>,
    #[cfg_attr(feature = "serde", serde(flatten))]
    pub attrs: NodeAttrs,
    pub children: Vec<NodeConfig>,
}

impl GroupConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn order(mut self, order: u32) -> Self {
        self.order = Some(order);
        self
    }

    pub fn group(mut self, group: GroupConfig) -> Self {
        self.children.push(NodeConfig::Group(group));
        self
    }

    pub fn record(mut self, record: RecordConfig) -> Self {
        self.children.push(NodeConfig::Record(record));
        self
    }
}

node_setters!(GroupConfig);

/// One record layout.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RecordConfig {
    pub name: String,
    pub order: Option<u32>,
    #[cfg_attr(feature = "serde", serde(flatten))]
    pub attrs: NodeAttrs,
    /// Name of the descendant field used as map key.
    pub key: Option<String>,
    pub properties: Vec<PropertyConfig>,
}

impl RecordConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn order(mut self, order: u32) -> Self {
        self.order = Some(order);
        self
    }

    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn field(mut self, field: FieldConfig) -> Self {
        self.properties.push(PropertyConfig::Field(field));
        self
    }

    pub fn segment(mut self, segment: SegmentConfig) -> Self {
        self.properties.push(PropertyConfig::Segment(segment));
        self
    }

    pub fn constant(mut self, constant: ConstantConfig) -> Self {
        self.properties.push(PropertyConfig::Constant(constant));
        self
    }
}

node_setters!(RecordConfig);

/// A property of a record or segment.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", rename_all = "lowercase"))]
pub enum PropertyConfig {
    Field(FieldConfig),
    Segment(SegmentConfig),
    Constant(ConstantConfig),
}

impl PropertyConfig {
    pub fn name(&self) -> &str {
        match self {
            Self::Field(f) => &f.name,
            Self::Segment(s) => &s.name,
            Self::Constant(c) => &c.name,
        }
    }
}

/// A nested object (or repeated block of fields) inside a record.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SegmentConfig {
    pub name: String,
    #[cfg_attr(feature = "serde", serde(flatten))]
    pub attrs: NodeAttrs,
    pub key: Option<String>,
    pub constructor_arg: Option<usize>,
    pub properties: Vec<PropertyConfig>,
}

impl SegmentConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn constructor_arg(mut self, index: usize) -> Self {
        self.constructor_arg = Some(index);
        self
    }

    pub fn field(mut self, field: FieldConfig) -> Self {
        self.properties.push(PropertyConfig::Field(field));
        self
    }

    pub fn segment(mut self, segment: SegmentConfig) -> Self {
        self.properties.push(PropertyConfig::Segment(segment));
        self
    }

    pub fn constant(mut self, constant: ConstantConfig) -> Self {
        self.properties.push(PropertyConfig::Constant(constant));
        self
    }
}

node_setters!(SegmentConfig);

/// A scalar field.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct FieldConfig {
    pub name: String,
    #[cfg_attr(feature = "serde", serde(flatten))]
    pub attrs: NodeAttrs,
    /// Field index (delimited) or character offset (fixed-length).
    pub position: Option<usize>,
    /// Width of a fixed-length field.
    pub length: Option<usize>,
    pub padding: Option<char>,
    pub justify: Justify,
    pub trim: bool,
    /// Named type handler.
    pub handler: Option<String>,
    pub record_identifier: bool,
    pub literal: Option<String>,
    pub regex: Option<String>,
    pub required: bool,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub default: Option<String>,
    pub constructor_arg: Option<usize>,
    /// Present in the record, but not bound to a property.
    pub ignore: bool,
}

impl FieldConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn position(mut self, position: usize) -> Self {
        self.position = Some(position);
        self
    }

    pub fn length(mut self, length: usize) -> Self {
        self.length = Some(length);
        self
    }

    pub fn padding(mut self, padding: char) -> Self {
        self.padding = Some(padding);
        self
    }

    pub fn justify(mut self, justify: Justify) -> Self {
        self.justify = justify;
        self
    }

    pub fn trim(mut self) -> Self {
        self.trim = true;
        self
    }

    pub fn handler(mut self, name: impl Into<String>) -> Self {
        self.handler = Some(name.into());
        self
    }

    /// Mark the field as identifying its record.
    pub fn rid(mut self) -> Self {
        self.record_identifier = true;
        self
    }

    pub fn literal(mut self, literal: impl Into<String>) -> Self {
        self.literal = Some(literal.into());
        self
    }

    pub fn regex(mut self, regex: impl Into<String>) -> Self {
        self.regex = Some(regex.into());
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn min_length(mut self, n: usize) -> Self {
        self.min_length = Some(n);
        self
    }

    pub fn max_length(mut self, n: usize) -> Self {
        self.max_length = Some(n);
        self
    }

    pub fn default_text(mut self, text: impl Into<String>) -> Self {
        self.default = Some(text.into());
        self
    }

    pub fn constructor_arg(mut self, index: usize) -> Self {
        self.constructor_arg = Some(index);
        self
    }

    pub fn ignore(mut self) -> Self {
        self.ignore = true;
        self
    }
}

node_setters!(FieldConfig);

/// A property with a fixed value that is never read from or written to a record.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ConstantConfig {
    pub name: String,
    /// Text of the value, parsed with the constant's handler.
    pub value: String,
    pub handler: Option<String>,
    pub type_name: Option<String>,
    pub getter: Option<String>,
    pub setter: Option<String>,
    pub constructor_arg: Option<usize>,
}

impl ConstantConfig {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            ..Self::default()
        }
    }

    pub fn handler(mut self, name: impl Into<String>) -> Self {
        self.handler = Some(name.into());
        self
    }

    pub fn type_name(mut self, name: impl Into<String>) -> Self {
        self.type_name = Some(name.into());
        self
    }

    pub fn setter(mut self, name: impl Into<String>) -> Self {
        self.setter = Some(name.into());
        self
    }

    pub fn constructor_arg(mut self, index: usize) -> Self {
        self.constructor_arg = Some(index);
        self
    }
}
