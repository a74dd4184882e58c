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

//! Capability registry for type factories and type handlers.

use crate::binding::TypeFactory;
use crate::handler::{BoolHandler, FloatHandler, IntHandler, StringHandler, TypeHandler};
use crate::value::ValueType;
use std::collections::HashMap;
use std::sync::Arc;

/// Maps names to application types and type handlers.
///
/// `Registry::default()` contains the built-in handlers `string`, `int`
/// (`integer`, `long`), `float` (`double`) and `bool` (`boolean`).
#[derive(Debug, Clone)]
pub struct Registry {
    types: HashMap<String, Arc<dyn TypeFactory>>,
    handlers: HashMap<String, Arc<dyn TypeHandler>>,
    defaults: HashMap<ValueType, Arc<dyn TypeHandler>>,
}

impl Default for Registry {
    fn default() -> Self {
        let mut registry = Self::empty();
        let string: Arc<dyn TypeHandler> = Arc::new(StringHandler);
        let int: Arc<dyn TypeHandler> = Arc::new(IntHandler);
        let float: Arc<dyn TypeHandler> = Arc::new(FloatHandler);
        let boolean: Arc<dyn TypeHandler> = Arc::new(BoolHandler::default());

        for (names, handler) in [
            (&["string"][..], &string),
            (&["int", "integer", "long"][..], &int),
            (&["float", "double"][..], &float),
            (&["bool", "boolean"][..], &boolean),
        ] {
            for name in names {
                registry.handlers.insert((*name).to_string(), Arc::clone(handler));
            }
            registry.defaults.insert(handler.value_type(), Arc::clone(handler));
        }
        registry
    }
}

impl Registry {
    /// A registry without any handlers or types.
    pub fn empty() -> Self {
        Self {
            types: HashMap::new(),
            handlers: HashMap::new(),
            defaults: HashMap::new(),
        }
    }

    /// Register an application type under its own name.
    pub fn register_type(&mut self, factory: impl TypeFactory + 'static) -> &mut Self {
        self.types
            .insert(factory.type_name().to_string(), Arc::new(factory));
        self
    }

    /// Register a named handler.
    pub fn register_handler(&mut self, name: impl Into<String>, handler: impl TypeHandler + 'static) -> &mut Self {
        self.handlers.insert(name.into(), Arc::new(handler));
        self
    }

    /// Replace the default handler used for a value type.
    pub fn register_default(&mut self, handler: impl TypeHandler + 'static) -> &mut Self {
        self.defaults.insert(handler.value_type(), Arc::new(handler));
        self
    }

    /// Builder-style [`register_type`](Self::register_type).
    pub fn with_type(mut self, factory: impl TypeFactory + 'static) -> Self {
        self.register_type(factory);
        self
    }

    /// Builder-style [`register_handler`](Self::register_handler).
    pub fn with_handler(mut self, name: impl Into<String>, handler: impl TypeHandler + 'static) -> Self {
        self.register_handler(name, handler);
        self
    }

    pub fn type_factory(&self, name: &str) -> Option<Arc<dyn TypeFactory>> {
        self.types.get(name).cloned()
    }

    pub fn handler(&self, name: &str) -> Option<Arc<dyn TypeHandler>> {
        self.handlers.get(name).cloned()
    }

    /// The default handler for a value type.
    pub fn handler_for(&self, ty: &ValueType) -> Option<Arc<dyn TypeHandler>> {
        self.defaults.get(ty).cloned()
    }
}
