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

//! CSV record I/O for recbind streams.
//!
//! Recbind sessions read and write [`RawRecord`](recbind_core::RawRecord)s;
//! this crate supplies CSV-backed readers and writers so delimited files
//! with quoting, custom delimiters and header rows can be bound directly.
//!
//! # Examples
//!
//! ## Reading CSV into values
//!
//! ```
//! use recbind_core::{compile, FieldConfig, FormatKind, RecordConfig, StreamConfig};
//! use recbind_csv::from_csv;
//!
//! let stream = compile(
//!     StreamConfig::new("people", FormatKind::Delimited).record(
//!         RecordConfig::new("person")
//!             .type_name("Person")
//!             .unbounded()
//!             .field(FieldConfig::new("name"))
//!             .field(FieldConfig::new("age").type_name("int")),
//!     ),
//! )
//! .unwrap();
//!
//! let people = from_csv(&stream, "\"Smith, Ann\",42\nBob,7\n").unwrap();
//! assert_eq!(people.len(), 2);
//! assert_eq!(people[0].property("name").and_then(|v| v.as_str()), Some("Smith, Ann"));
//! ```
//!
//! ## Writing values as CSV
//!
//! ```
//! use recbind_core::{compile, FieldConfig, FormatKind, Object, RecordConfig, StreamConfig};
//! use recbind_csv::{to_csv_with_config, CsvConfig};
//!
//! let stream = compile(
//!     StreamConfig::new("people", FormatKind::Delimited).record(
//!         RecordConfig::new("person")
//!             .type_name("Person")
//!             .unbounded()
//!             .field(FieldConfig::new("name"))
//!             .field(FieldConfig::new("age").type_name("int")),
//!     ),
//! )
//! .unwrap();
//!
//! let ann: recbind_core::Value = Object::new("Person").with("name", "Ann").with("age", 42i64).into();
//! let csv = to_csv_with_config(&stream, &[ann], &CsvConfig::delimited(b';')).unwrap();
//! assert_eq!(csv, "Ann;42\n");
//! ```

mod config;
mod error;
mod reader;
mod writer;

pub use config::CsvConfig;
pub use error::{CsvError, Result};
pub use reader::CsvRecordReader;
pub use writer::CsvRecordWriter;

use recbind_core::{Stream, StreamError, StreamResult, Value};

/// Read every bound value from CSV text with the default dialect.
pub fn from_csv(stream: &Stream, csv: &str) -> StreamResult<Vec<Value>> {
    from_csv_with_config(stream, csv, &CsvConfig::default())
}

/// Read every bound value from CSV text.
///
/// The session is closed at the end, so a stream left below a minimum
/// occurrence fails with [`StreamError::Unsatisfied`].
pub fn from_csv_with_config(stream: &Stream, csv: &str, config: &CsvConfig) -> StreamResult<Vec<Value>> {
    let reader = CsvRecordReader::new(csv.as_bytes(), config)?;
    let mut session = stream.begin_read(reader);
    let mut values = Vec::new();
    while let Some(value) = session.read()? {
        values.push(value);
    }
    session.close()?;
    Ok(values)
}

/// Write values as CSV text with the default dialect.
pub fn to_csv(stream: &Stream, values: &[Value]) -> StreamResult<String> {
    to_csv_with_config(stream, values, &CsvConfig::default())
}

/// Write values as CSV text.
pub fn to_csv_with_config(stream: &Stream, values: &[Value], config: &CsvConfig) -> StreamResult<String> {
    let writer = CsvRecordWriter::new(Vec::new(), config)?;
    let mut session = stream.begin_write(writer);
    for value in values {
        session.write(value)?;
    }
    session.close()?;
    let bytes = session.into_inner().into_inner()?;
    String::from_utf8(bytes).map_err(|_| {
        StreamError::from(CsvError::InvalidUtf8 {
            context: "CSV output".to_string(),
        })
    })
}
