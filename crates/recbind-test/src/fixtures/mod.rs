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

//! Canonical schema fixtures.
//!
//! - **schemas**: stream configurations
//! - **samples**: input rows and objects matching those schemas
//! - **builders**: fluent builders for rows and objects

pub mod builders;
mod samples;
mod schemas;

pub use samples::*;
pub use schemas::*;

use crate::SchemaList;

/// Returns all schema fixtures for iteration.
pub fn all() -> SchemaList {
    vec![
        ("flat_batch", flat_batch),
        ("batch_group", batch_group),
        ("occurrence_group", occurrence_group),
        ("ordered_pair", ordered_pair),
        ("unordered_pair", unordered_pair),
        ("fixed_length_people", fixed_length_people),
        ("orders", orders),
    ]
}
