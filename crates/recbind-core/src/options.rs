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

//! Compilation options.

use crate::binding::TypeFactory;
use crate::handler::TypeHandler;
use crate::limits::Limits;
use crate::registry::Registry;

/// Options controlling schema compilation.
#[derive(Debug, Clone, Default)]
pub struct CompileOptions {
    /// Resource limits.
    pub limits: Limits,
    /// Fail on type names missing from the registry instead of treating them
    /// as open dynamic types.
    pub strict_types: bool,
    /// Types and handlers available to the compiler.
    pub registry: Registry,
}

impl CompileOptions {
    /// Create a new builder for CompileOptions.
    ///
    /// # Examples
    ///
    /// ```text
    /// let opts = CompileOptions::builder()
    ///     .max_depth(16)
    ///     .strict_types(true)
    ///     .build();
    /// ```
    pub fn builder() -> CompileOptionsBuilder {
        CompileOptionsBuilder::new()
    }
}

/// Builder for ergonomic construction of CompileOptions.
#[derive(Debug, Clone, Default)]
pub struct CompileOptionsBuilder {
    options: CompileOptions,
}

impl CompileOptionsBuilder {
    /// Create a new builder with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum schema nesting depth (default: 64).
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.options.limits.max_depth = depth;
        self
    }

    /// Set the maximum number of compiled nodes (default: 100k).
    pub fn max_nodes(mut self, nodes: usize) -> Self {
        self.options.limits.max_nodes = nodes;
        self
    }

    /// Set the cap on items read by one unbounded inline repetition (default: 10k).
    pub fn max_unbounded_repetitions(mut self, count: usize) -> Self {
        self.options.limits.max_unbounded_repetitions = count;
        self
    }

    /// Replace all limits at once.
    pub fn limits(mut self, limits: Limits) -> Self {
        self.options.limits = limits;
        self
    }

    /// Remove all limits.
    pub fn unlimited(self) -> Self {
        self.limits(Limits::unlimited())
    }

    /// Require every type name to be registered.
    pub fn strict_types(mut self, strict: bool) -> Self {
        self.options.strict_types = strict;
        self
    }

    /// Replace the registry.
    pub fn registry(mut self, registry: Registry) -> Self {
        self.options.registry = registry;
        self
    }

    /// Register an application type.
    pub fn register_type(mut self, factory: impl TypeFactory + 'static) -> Self {
        self.options.registry.register_type(factory);
        self
    }

    /// Register a named type handler.
    pub fn register_handler(mut self, name: impl Into<String>, handler: impl TypeHandler + 'static) -> Self {
        self.options.registry.register_handler(name, handler);
        self
    }

    /// Build the options.
    pub fn build(self) -> CompileOptions {
        self.options
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::DynamicType;
    use crate::handler::BoolHandler;

    // ==================== Default options tests ====================

    #[test]
    fn test_default_options() {
        let opts = CompileOptions::default();
        assert_eq!(opts.limits, Limits::default());
        assert!(!opts.strict_types);
        assert!(opts.registry.handler("string").is_some());
    }

    // ==================== Builder tests ====================

    #[test]
    fn test_builder_limits() {
        let opts = CompileOptions::builder()
            .max_depth(5)
            .max_nodes(50)
            .max_unbounded_repetitions(7)
            .build();
        assert_eq!(opts.limits.max_depth, 5);
        assert_eq!(opts.limits.max_nodes, 50);
        assert_eq!(opts.limits.max_unbounded_repetitions, 7);
    }

    #[test]
    fn test_builder_unlimited() {
        let opts = CompileOptions::builder().max_depth(5).unlimited().build();
        assert_eq!(opts.limits, Limits::unlimited());
    }

    #[test]
    fn test_builder_registry() {
        let opts = CompileOptions::builder()
            .strict_types(true)
            .register_type(DynamicType::open("Header"))
            .register_handler("yn", BoolHandler::with_literals("Y", "N"))
            .build();
        assert!(opts.strict_types);
        assert!(opts.registry.type_factory("Header").is_some());
        assert!(opts.registry.handler("yn").is_some());
    }
}
