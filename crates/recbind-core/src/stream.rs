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

//! Compiled streams and the compile entry points.

use crate::compiler::compile_tree;
use crate::config::{FormatKind, StreamConfig};
use crate::error::ConfigResult;
use crate::io::{RecordReader, RecordWriter};
use crate::options::CompileOptions;
use crate::reader::ReaderSession;
use crate::tree::Tree;
use crate::writer::WriterSession;
use std::sync::Arc;

/// A compiled stream schema.
///
/// Cheap to clone and safe to share between threads. Every session gets
/// its own state block, so sessions never observe each other.
#[derive(Debug, Clone)]
pub struct Stream {
    tree: Arc<Tree>,
}

impl Stream {
    pub fn name(&self) -> &str {
        self.tree.name()
    }

    pub fn format(&self) -> FormatKind {
        self.tree.format.kind()
    }

    /// The compiled component tree.
    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    /// Start reading records from `reader`.
    pub fn begin_read<R: RecordReader>(&self, reader: R) -> ReaderSession<R> {
        ReaderSession::new(Arc::clone(&self.tree), reader)
    }

    /// Start writing records to `writer`.
    pub fn begin_write<W: RecordWriter>(&self, writer: W) -> WriterSession<W> {
        WriterSession::new(Arc::clone(&self.tree), writer)
    }
}

/// Compile a stream schema with default options.
pub fn compile(config: StreamConfig) -> ConfigResult<Stream> {
    compile_with_options(config, &CompileOptions::default())
}

/// Compile a stream schema.
///
/// # Examples
///
/// ```
/// use recbind_core::{compile_with_options, CompileOptions, FieldConfig, FormatKind, RecordConfig, StreamConfig};
///
/// let options = CompileOptions::builder().strict_types(true).build();
/// let config = StreamConfig::new("s", FormatKind::Delimited)
///     .record(RecordConfig::new("r").type_name("Unknown").field(FieldConfig::new("x")));
/// assert!(compile_with_options(config, &options).is_err());
/// ```
pub fn compile_with_options(config: StreamConfig, options: &CompileOptions) -> ConfigResult<Stream> {
    let tree = compile_tree(config, options)?;
    Ok(Stream {
        tree: Arc::new(tree),
    })
}
