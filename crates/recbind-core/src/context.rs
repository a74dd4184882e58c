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

//! Per-call parsing context and per-record diagnostics.

use crate::error::FieldError;

/// Direction of the current operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Read,
    Write,
}

/// One active repetition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Iteration {
    pub index: usize,
    /// Positions consumed by one repetition.
    pub stride: usize,
}

/// Mutable state threaded through one unmarshal or marshal call.
#[derive(Debug)]
pub struct ParsingContext {
    mode: Mode,
    iterations: Vec<Iteration>,
    errors: Vec<FieldError>,
    max_unbounded: usize,
}

impl ParsingContext {
    pub fn new(mode: Mode, max_unbounded: usize) -> Self {
        Self {
            mode,
            iterations: Vec::new(),
            errors: Vec::new(),
            max_unbounded,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn is_reading(&self) -> bool {
        self.mode == Mode::Read
    }

    /// Cap on items read by one unbounded repetition.
    pub fn max_unbounded(&self) -> usize {
        self.max_unbounded
    }

    pub fn push_iteration(&mut self, index: usize, stride: usize) {
        self.iterations.push(Iteration { index, stride });
    }

    pub fn pop_iteration(&mut self) {
        self.iterations.pop();
    }

    /// Position offset of the innermost repetition. Nested repetitions add up.
    pub fn offset(&self) -> usize {
        self.iterations.iter().map(|i| i.index * i.stride).sum()
    }

    pub fn add_error(&mut self, field: impl Into<String>, rule: &'static str, message: impl Into<String>) {
        self.errors.push(FieldError::new(field, rule, message));
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn take_errors(&mut self) -> Vec<FieldError> {
        std::mem::take(&mut self.errors)
    }
}

/// Diagnostics for the most recent read or write.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordContext {
    /// Name of the matched record, if any.
    pub record_name: Option<String>,
    /// Line number of the record (1-based; records written for writers).
    pub line_number: usize,
    /// Raw record text.
    pub text: Option<String>,
    /// Field-level validation failures.
    pub field_errors: Vec<FieldError>,
    /// Record-level failures (identification and structure).
    pub record_errors: Vec<String>,
}

impl RecordContext {
    pub fn has_errors(&self) -> bool {
        !self.field_errors.is_empty() || !self.record_errors.is_empty()
    }

    /// Errors reported for one field.
    pub fn field_errors_for<'a>(&'a self, field: &'a str) -> impl Iterator<Item = &'a FieldError> + 'a {
        self.field_errors.iter().filter(move |e| e.field == field)
    }
}
