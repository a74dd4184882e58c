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

//! Schema compiler and runtime for binding flat records to object graphs.
//!
//! A [`StreamConfig`] describes a file layout: groups and records in a
//! declared order, each record made of fields, nested segments and
//! constants, with occurrence bounds and optional collections. Compiling it
//! runs two passes:
//!
//! 1. The preprocessor resolves defaults, validates occurrence bounds,
//!    collections and orders, and assigns field positions.
//! 2. The tree compiler builds an arena of parser components, interposing an
//!    aggregation above every repeating node and resolving type factories,
//!    accessors, handlers and constructors from the [`Registry`].
//!
//! The resulting [`Stream`] is immutable and `Send + Sync`. Reading and
//! writing happen in sessions, each holding its own state block:
//!
//! - [`ReaderSession`] matches incoming records against groups and records
//!   (retry last, scan forward, wrap around) and assembles [`Value`]s.
//! - [`WriterSession`] matches outgoing objects the same way and formats them
//!   back into records.
//!
//! # Example
//!
//! ```
//! use recbind_core::{compile, FieldConfig, FormatKind, IterReader, RawRecord, RecordConfig, StreamConfig, Value};
//!
//! let stream = compile(
//!     StreamConfig::new("orders", FormatKind::Delimited).record(
//!         RecordConfig::new("order")
//!             .type_name("Order")
//!             .unbounded()
//!             .field(FieldConfig::new("id").type_name("int"))
//!             .field(FieldConfig::new("items").unbounded().collection("list")),
//!     ),
//! )
//! .unwrap();
//!
//! let input = IterReader::new(vec![RawRecord::fields(["7", "apple", "pear"])]);
//! let order = stream.begin_read(input).read().unwrap().unwrap();
//! assert_eq!(order.property("id"), Some(&Value::Int(7)));
//! assert_eq!(order.property("items").and_then(Value::as_list).map(|l| l.len()), Some(2));
//! ```

mod binding;
mod compiler;
mod config;
mod context;
mod error;
mod format;
mod handler;
mod io;
mod limits;
mod matcher;
mod options;
mod preprocess;
mod property;
mod reader;
mod registry;
mod stream;
pub mod tree;
mod value;
mod writer;

pub use binding::{Accessor, AccessorHints, DynamicType, PropertyAccessor, TypeFactory};
pub use config::{
    ConstantConfig, FieldConfig, FormatKind, GroupConfig, Justify, MaxOccurs, NodeAttrs, NodeConfig,
    PropertyConfig, RecordConfig, SegmentConfig, StreamConfig,
};
pub use context::{Mode, RecordContext};
pub use error::{
    BindingError, ConfigError, ConfigErrorKind, ConfigResult, ConversionError, FieldError, StreamError,
    StreamResult,
};
pub use format::{format_for, DelimitedFormat, FieldFormat, FieldLayout, FixedLengthFormat, RawRecord};
pub use handler::{BoolHandler, FloatHandler, IntHandler, StringHandler, TypeHandler};
pub use io::{IterReader, LineReader, LineWriter, RecordReader, RecordWriter};
pub use limits::Limits;
pub use options::{CompileOptions, CompileOptionsBuilder};
pub use preprocess::preprocess;
pub use reader::ReaderSession;
pub use registry::Registry;
pub use stream::{compile, compile_with_options, Stream};
pub use value::{Object, Slot, Value, ValueType};
pub use writer::WriterSession;
