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

//! Binding capabilities between parser components and application objects.
//!
//! The compiler never inspects application objects itself. It asks a
//! [`TypeFactory`] for constructors and [`Accessor`]s once, at compile time,
//! and the runtime only ever calls `get`, `set` and `constructor_arg`.

use crate::error::{BindingError, ConfigError, ConfigResult};
use crate::value::{Object, Value, ValueType};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Reads and writes one property of a parent object.
pub trait Accessor: Send + Sync + fmt::Debug {
    /// Read the property. `None` means the property is absent or null.
    fn get(&self, parent: &Value) -> Option<Value>;

    /// Write the property on an instantiated parent.
    fn set(&self, parent: &mut Value, value: Value) -> Result<(), BindingError>;

    /// The constructor argument slot this property is bound to, if any.
    fn constructor_arg(&self) -> Option<usize> {
        None
    }
}

/// Explicit accessor hints from the schema.
#[derive(Debug, Clone, Copy, Default)]
pub struct AccessorHints<'a> {
    pub getter: Option<&'a str>,
    pub setter: Option<&'a str>,
    pub constructor_arg: Option<usize>,
}

/// Describes and instantiates one application type.
pub trait TypeFactory: Send + Sync + fmt::Debug {
    /// The application type name.
    fn type_name(&self) -> &str;

    /// Parameter types of every available constructor.
    fn constructors(&self) -> Vec<Vec<ValueType>>;

    /// Create an instance using constructor `index` and its arguments.
    fn instantiate(&self, index: usize, args: Vec<Value>) -> Result<Value, BindingError>;

    /// Resolve an accessor for a property.
    fn accessor(&self, property: &str, hints: AccessorHints<'_>) -> ConfigResult<Arc<dyn Accessor>>;

    /// The reflected type of a property, when known.
    fn property_type(&self, property: &str) -> Option<ValueType>;

    /// Whether `value` is an instance of this type.
    fn is_instance(&self, value: &Value) -> bool;
}

/// Built-in [`TypeFactory`] over [`Value::Object`].
///
/// A closed type only knows its declared properties; an open type accepts
/// any property name.
#[derive(Debug, Clone, PartialEq)]
pub struct DynamicType {
    name: String,
    properties: BTreeMap<String, ValueType>,
    open: bool,
    constructors: Vec<Vec<(String, ValueType)>>,
}

impl DynamicType {
    /// A closed type; declare its properties with [`property`](Self::property).
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            properties: BTreeMap::new(),
            open: false,
            constructors: Vec::new(),
        }
    }

    /// An open type accepting any property.
    pub fn open(name: impl Into<String>) -> Self {
        Self {
            open: true,
            ..Self::new(name)
        }
    }

    /// Declare a typed property.
    pub fn property(mut self, name: impl Into<String>, ty: ValueType) -> Self {
        self.properties.insert(name.into(), ty);
        self
    }

    /// Declare a constructor. Arguments are stored under the parameter names.
    ///
    /// Without any declared constructor the type has a single no-argument one.
    pub fn constructor<N: Into<String>>(mut self, params: impl IntoIterator<Item = (N, ValueType)>) -> Self {
        self.constructors
            .push(params.into_iter().map(|(n, t)| (n.into(), t)).collect());
        self
    }

    fn knows(&self, property: &str) -> bool {
        self.open
            || self.properties.contains_key(property)
            || self
                .constructors
                .iter()
                .any(|c| c.iter().any(|(n, _)| n == property))
    }
}

impl TypeFactory for DynamicType {
    fn type_name(&self) -> &str {
        &self.name
    }

    fn constructors(&self) -> Vec<Vec<ValueType>> {
        if self.constructors.is_empty() {
            return vec![Vec::new()];
        }
        self.constructors
            .iter()
            .map(|c| c.iter().map(|(_, t)| t.clone()).collect())
            .collect()
    }

    fn instantiate(&self, index: usize, args: Vec<Value>) -> Result<Value, BindingError> {
        let mut object = Object::new(self.name.clone());
        if self.constructors.is_empty() {
            if index == 0 && args.is_empty() {
                return Ok(Value::Object(object));
            }
        } else if let Some(params) = self.constructors.get(index) {
            if params.len() == args.len() {
                for ((name, _), arg) in params.iter().zip(args) {
                    if !arg.is_null() {
                        object.set(name.clone(), arg);
                    }
                }
                return Ok(Value::Object(object));
            }
        }
        Err(BindingError::Instantiate {
            type_name: self.name.clone(),
            message: format!("no constructor #{} taking {} arguments", index, args.len()),
        })
    }

    fn accessor(&self, property: &str, hints: AccessorHints<'_>) -> ConfigResult<Arc<dyn Accessor>> {
        let getter = hints.getter.unwrap_or(property);
        let setter = hints.setter.unwrap_or(property);
        for name in [getter, setter] {
            if !self.knows(name) {
                return Err(ConfigError::binding(format!(
                    "type '{}' has no property '{}'",
                    self.name, name
                )));
            }
        }
        Ok(Arc::new(PropertyAccessor {
            type_name: self.name.clone(),
            getter: getter.to_string(),
            setter: setter.to_string(),
            constructor_arg: hints.constructor_arg,
        }))
    }

    fn property_type(&self, property: &str) -> Option<ValueType> {
        self.properties.get(property).cloned().or_else(|| {
            self.constructors
                .iter()
                .flatten()
                .find(|(n, _)| n == property)
                .map(|(_, t)| t.clone())
        })
    }

    fn is_instance(&self, value: &Value) -> bool {
        matches!(value, Value::Object(o) if o.type_name == self.name)
    }
}

/// Accessor over a named [`Object`] property.
///
/// Setting `Value::Null` removes the property, so an absent property and an
/// explicit null read back the same way.
#[derive(Debug, Clone)]
pub struct PropertyAccessor {
    type_name: String,
    getter: String,
    setter: String,
    constructor_arg: Option<usize>,
}

impl Accessor for PropertyAccessor {
    fn get(&self, parent: &Value) -> Option<Value> {
        parent
            .property(&self.getter)
            .filter(|v| !v.is_null())
            .cloned()
    }

    fn set(&self, parent: &mut Value, value: Value) -> Result<(), BindingError> {
        let found = parent.value_type().to_string();
        let object = parent
            .as_object_mut()
            .ok_or_else(|| BindingError::NotAnInstance {
                expected: self.type_name.clone(),
                found,
            })?;
        if value.is_null() {
            object.properties.remove(&self.setter);
        } else {
            object.set(self.setter.clone(), value);
        }
        Ok(())
    }

    fn constructor_arg(&self) -> Option<usize> {
        self.constructor_arg
    }
}
