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

//! Resource limits for schema compilation and reading.

/// Configurable limits bounding compiled tree size and per-record work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Limits {
    /// Maximum schema nesting depth (default: 64).
    pub max_depth: usize,
    /// Maximum number of compiled nodes (default: 100k).
    pub max_nodes: usize,
    /// Maximum items read by one unbounded inline repetition (default: 10k).
    pub max_unbounded_repetitions: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_depth: 64,
            max_nodes: 100_000,
            max_unbounded_repetitions: 10_000,
        }
    }
}

impl Limits {
    /// Create limits with no restrictions (for testing).
    pub fn unlimited() -> Self {
        Self {
            max_depth: usize::MAX,
            max_nodes: usize::MAX,
            max_unbounded_repetitions: usize::MAX,
        }
    }
}
