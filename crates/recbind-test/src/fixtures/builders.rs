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

//! Builder pattern for creating customizable test fixtures.
//!
//! This module provides fluent builders for raw record sequences and
//! bound objects.

use recbind_core::{IterReader, Object, RawRecord, Value};

/// Builder for a sequence of raw records.
///
/// # Examples
///
/// ```
/// use recbind_test::fixtures::builders::RecordsBuilder;
/// use recbind_core::RawRecord;
///
/// let records = RecordsBuilder::new()
///     .row(["H", "b1"])
///     .repeat(["D", "5"], 2)
///     .row(["T", "2"])
///     .build();
///
/// assert_eq!(records.len(), 4);
/// assert_eq!(records[2], RawRecord::fields(["D", "5"]));
/// ```
#[derive(Debug, Clone, Default)]
pub struct RecordsBuilder {
    records: Vec<RawRecord>,
}

impl RecordsBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one delimited record.
    pub fn row<S: Into<String>>(mut self, fields: impl IntoIterator<Item = S>) -> Self {
        self.records.push(RawRecord::fields(fields));
        self
    }

    /// Appends the same delimited record `count` times.
    pub fn repeat<S: Into<String>>(mut self, fields: impl IntoIterator<Item = S>, count: usize) -> Self {
        let record = RawRecord::fields(fields);
        self.records.extend(std::iter::repeat(record).take(count));
        self
    }

    /// Appends one fixed-length line.
    pub fn line(mut self, text: impl Into<String>) -> Self {
        self.records.push(RawRecord::line(text));
        self
    }

    /// Builds the record list.
    pub fn build(self) -> Vec<RawRecord> {
        self.records
    }

    /// Builds an in-memory reader over the records.
    pub fn reader(self) -> IterReader<std::vec::IntoIter<RawRecord>> {
        IterReader::new(self.records)
    }
}

/// Builder for bound objects.
///
/// # Examples
///
/// ```
/// use recbind_test::fixtures::builders::ObjectBuilder;
/// use recbind_core::Value;
///
/// let value = ObjectBuilder::new("Person")
///     .string("name", "Ann")
///     .int("age", 42)
///     .build();
///
/// assert_eq!(value.property("age"), Some(&Value::Int(42)));
/// ```
#[derive(Debug, Clone)]
pub struct ObjectBuilder {
    object: Object,
}

impl ObjectBuilder {
    /// Creates a builder for an object of the given type.
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            object: Object::new(type_name),
        }
    }

    /// Sets a string property.
    pub fn string(self, name: &str, value: impl Into<String>) -> Self {
        self.value(name, Value::String(value.into()))
    }

    /// Sets an integer property.
    pub fn int(self, name: &str, value: i64) -> Self {
        self.value(name, Value::Int(value))
    }

    /// Sets a list property.
    pub fn list(self, name: &str, items: impl IntoIterator<Item = Value>) -> Self {
        self.value(name, Value::List(items.into_iter().collect()))
    }

    /// Sets any property.
    pub fn value(mut self, name: &str, value: Value) -> Self {
        self.object.set(name, value);
        self
    }

    /// Builds the object value.
    pub fn build(self) -> Value {
        Value::Object(self.object)
    }
}
