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

//! # Recbind - record binding for flat files
//!
//! Recbind maps streams of flat records (delimited or fixed-length) onto
//! object graphs and back. A declarative [`StreamConfig`] describes groups,
//! records, fields and nested segments; compiling it yields a [`Stream`]
//! that any number of reader and writer sessions can share.
//!
//! ## Quick Start
//!
//! ```rust
//! use recbind::{compile, read_lines, FieldConfig, FormatKind, RecordConfig, StreamConfig};
//!
//! let stream = compile(
//!     StreamConfig::new("people", FormatKind::FixedLength).record(
//!         RecordConfig::new("person")
//!             .type_name("Person")
//!             .unbounded()
//!             .field(FieldConfig::new("name").length(5))
//!             .field(FieldConfig::new("age").length(3).type_name("int")),
//!     ),
//! )
//! .unwrap();
//!
//! let people = read_lines(&stream, "Ann  42 \nBob  7  \n").unwrap();
//! assert_eq!(people.len(), 2);
//! assert_eq!(people[1].property("age").and_then(|v| v.as_int()), Some(7));
//! ```
//!
//! ## Modules
//!
//! - [`tree`]: the compiled component tree
//!
//! ### Optional Record Formats (feature-gated)
//!
//! - `csv`: quoted CSV readers and writers (feature = "csv")

pub use recbind_core::{
    // Compilation
    compile,
    compile_with_options,
    preprocess,
    CompileOptions,
    CompileOptionsBuilder,
    Limits,
    Registry,
    Stream,
    // Configuration model
    ConstantConfig,
    FieldConfig,
    FormatKind,
    GroupConfig,
    Justify,
    MaxOccurs,
    NodeAttrs,
    NodeConfig,
    PropertyConfig,
    RecordConfig,
    SegmentConfig,
    StreamConfig,
    // Binding capabilities
    Accessor,
    AccessorHints,
    BoolHandler,
    DynamicType,
    FloatHandler,
    IntHandler,
    PropertyAccessor,
    StringHandler,
    TypeFactory,
    TypeHandler,
    // Values
    Object,
    Slot,
    Value,
    ValueType,
    // Sessions and record I/O
    format_for,
    DelimitedFormat,
    FieldFormat,
    FieldLayout,
    FixedLengthFormat,
    IterReader,
    LineReader,
    LineWriter,
    Mode,
    RawRecord,
    ReaderSession,
    RecordContext,
    RecordReader,
    RecordWriter,
    WriterSession,
    // Errors
    BindingError,
    ConfigError,
    ConfigErrorKind,
    ConfigResult,
    ConversionError,
    FieldError,
    StreamError,
    StreamResult,
};

pub mod tree {
    //! Compiled component tree
    pub use recbind_core::tree::*;
}

/// CSV record I/O (requires `csv` feature).
#[cfg(feature = "csv")]
pub mod csv {
    pub use recbind_csv::{
        from_csv, from_csv_with_config, to_csv, to_csv_with_config, CsvConfig, CsvError,
        CsvRecordReader, CsvRecordWriter,
    };
}

use thiserror::Error;

/// Any failure from compiling a schema or running a session over it.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Stream(#[from] StreamError),
}

/// Convenience type alias for `Result` with [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Read every bound value from `reader`, then close the session.
///
/// # Examples
///
/// ```rust
/// use recbind::{compile, read_all, FieldConfig, FormatKind, IterReader, RawRecord, RecordConfig, StreamConfig};
///
/// let stream = compile(
///     StreamConfig::new("s", FormatKind::Delimited)
///         .record(RecordConfig::new("r").type_name("R").unbounded().field(FieldConfig::new("x"))),
/// )
/// .unwrap();
/// let values = read_all(&stream, IterReader::new(vec![RawRecord::fields(["1"]), RawRecord::fields(["2"])])).unwrap();
/// assert_eq!(values.len(), 2);
/// ```
pub fn read_all<R: RecordReader>(stream: &Stream, reader: R) -> StreamResult<Vec<Value>> {
    let mut session = stream.begin_read(reader);
    let mut values = Vec::new();
    while let Some(value) = session.read()? {
        values.push(value);
    }
    session.close()?;
    Ok(values)
}

/// Write every value to `writer`, close the session and give the writer back.
pub fn write_all<'a, W: RecordWriter>(
    stream: &Stream,
    writer: W,
    values: impl IntoIterator<Item = &'a Value>,
) -> StreamResult<W> {
    let mut session = stream.begin_write(writer);
    for value in values {
        session.write(value)?;
    }
    session.close()?;
    Ok(session.into_inner())
}

/// Read newline-separated records from text.
///
/// Fixed-length streams get one record per line; delimited streams split
/// lines on commas without quoting.
pub fn read_lines(stream: &Stream, text: &str) -> StreamResult<Vec<Value>> {
    match stream.format() {
        FormatKind::FixedLength => read_all(stream, LineReader::new(text.as_bytes())),
        FormatKind::Delimited => read_all(stream, LineReader::delimited(text.as_bytes(), ',')),
    }
}

/// Write values as newline-separated text, the inverse of [`read_lines`].
pub fn write_lines(stream: &Stream, values: &[Value]) -> StreamResult<String> {
    let writer = write_all(stream, LineWriter::new(Vec::new()), values)?;
    let bytes = writer.into_inner()?;
    String::from_utf8(bytes).map_err(|e| StreamError::malformed(0, e.to_string()))
}

/// Compile `config` and read every value from `reader` in one step.
pub fn bind_all<R: RecordReader>(config: StreamConfig, reader: R) -> Result<Vec<Value>> {
    let stream = compile(config)?;
    Ok(read_all(&stream, reader)?)
}

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    fn people() -> Stream {
        compile(
            StreamConfig::new("people", FormatKind::Delimited).record(
                RecordConfig::new("person")
                    .type_name("Person")
                    .min_occurs(0)
                    .unbounded()
                    .field(FieldConfig::new("name"))
                    .field(FieldConfig::new("age").type_name("int")),
            ),
        )
        .unwrap()
    }

    #[test]
    fn test_read_and_write_lines() {
        let stream = people();
        let values = read_lines(&stream, "Ann,42\nBob,7\n").unwrap();
        assert_eq!(values.len(), 2);
        assert_eq!(write_lines(&stream, &values).unwrap(), "Ann,42\nBob,7\n");
    }

    #[test]
    fn test_bind_all_reports_config_errors() {
        let config = StreamConfig::new("empty", FormatKind::Delimited);
        let err = bind_all(config, IterReader::new(Vec::new())).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_bind_all_reports_stream_errors() {
        let config = StreamConfig::new("s", FormatKind::Delimited).record(
            RecordConfig::new("r")
                .type_name("R")
                .field(FieldConfig::new("kind").rid().literal("R")),
        );
        let err = bind_all(config, IterReader::new(vec![RawRecord::fields(["X"])])).unwrap_err();
        assert!(matches!(err, Error::Stream(StreamError::Unidentified { line: 1 })));
    }

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
