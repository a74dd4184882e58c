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

//! Shared schema fixtures and builders for recbind tests.
//!
//! The fixtures cover the layouts every recbind crate needs to exercise:
//! header/detail/trailer batches (flat and as a typed group), groups with
//! occurrence bounds, ordered and unordered record pairs, and a
//! fixed-length layout.
//!
//! # Quick Start
//!
//! ```rust
//! use recbind_core::compile;
//! use recbind_test::{fixtures, records};
//!
//! let stream = compile(fixtures::batch_group()).unwrap();
//! let mut reader = stream.begin_read(records(fixtures::batch_rows()));
//! let batch = reader.read().unwrap().unwrap();
//! assert_eq!(batch.property("header").and_then(|h| h.property("id")).and_then(|v| v.as_str()), Some("b1"));
//! ```

pub mod fixtures;

use recbind_core::{IterReader, RawRecord, StreamConfig};

/// Type alias for a list of schema fixtures (name, generator).
pub type SchemaList = Vec<(&'static str, fn() -> StreamConfig)>;

/// In-memory reader over delimited rows.
pub fn records<R, S>(rows: impl IntoIterator<Item = R>) -> IterReader<std::vec::IntoIter<RawRecord>>
where
    R: IntoIterator<Item = S>,
    S: Into<String>,
{
    IterReader::new(rows.into_iter().map(RawRecord::fields).collect::<Vec<_>>())
}

/// In-memory reader over fixed-length lines.
pub fn lines<S: Into<String>>(lines: impl IntoIterator<Item = S>) -> IterReader<std::vec::IntoIter<RawRecord>> {
    IterReader::new(lines.into_iter().map(RawRecord::line).collect::<Vec<_>>())
}

/// Render written records as delimited rows for easy comparison.
pub fn rows_of(records: &[RawRecord]) -> Vec<Vec<String>> {
    records
        .iter()
        .map(|record| match record {
            RawRecord::Fields(fields) => fields.clone(),
            RawRecord::Line(line) => vec![line.clone()],
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use recbind_core::RecordReader;

    #[test]
    fn test_records_reader() {
        let mut reader = records([["A", "1"], ["B", "2"]]);
        assert_eq!(
            reader.read_record().unwrap(),
            Some(RawRecord::fields(["A", "1"]))
        );
        reader.read_record().unwrap();
        assert_eq!(reader.line_number(), 2);
    }

    #[test]
    fn test_rows_of() {
        let rows = rows_of(&[RawRecord::fields(["a", "b"]), RawRecord::line("xyz")]);
        assert_eq!(rows, vec![vec!["a", "b"], vec!["xyz"]]);
    }

    #[test]
    fn test_every_fixture_compiles() {
        for (name, fixture) in fixtures::all() {
            assert!(recbind_core::compile(fixture()).is_ok(), "fixture {} failed", name);
        }
    }
}
