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

//! Type handlers: conversion between field text and typed values.

use crate::error::ConversionError;
use crate::value::{Value, ValueType};
use std::fmt;

/// Converts field text to and from a typed [`Value`].
///
/// Handlers never see empty text on read; empty fields become the field's
/// default or `Value::Null` before a handler is consulted.
pub trait TypeHandler: Send + Sync + fmt::Debug {
    /// Parse non-empty field text.
    fn parse(&self, text: &str) -> Result<Value, ConversionError>;

    /// Format a value as field text.
    fn format(&self, value: &Value) -> String;

    /// The value type this handler produces.
    fn value_type(&self) -> ValueType;
}

/// Identity handler used when nothing more specific is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct StringHandler;

impl TypeHandler for StringHandler {
    fn parse(&self, text: &str) -> Result<Value, ConversionError> {
        Ok(Value::String(text.to_string()))
    }

    fn format(&self, value: &Value) -> String {
        value.to_string()
    }

    fn value_type(&self) -> ValueType {
        ValueType::String
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct IntHandler;

impl TypeHandler for IntHandler {
    fn parse(&self, text: &str) -> Result<Value, ConversionError> {
        let trimmed = text.trim();
        let digits = trimmed.strip_prefix('+').unwrap_or(trimmed);
        digits
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|_| ConversionError::new(format!("'{}' is not a valid integer", text)))
    }

    fn format(&self, value: &Value) -> String {
        value.to_string()
    }

    fn value_type(&self) -> ValueType {
        ValueType::Int
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FloatHandler;

impl TypeHandler for FloatHandler {
    fn parse(&self, text: &str) -> Result<Value, ConversionError> {
        text.trim()
            .parse::<f64>()
            .ok()
            .filter(|n| n.is_finite())
            .map(Value::Float)
            .ok_or_else(|| ConversionError::new(format!("'{}' is not a valid number", text)))
    }

    fn format(&self, value: &Value) -> String {
        match value {
            Value::Float(n) if n.fract() == 0.0 && n.abs() < 1e15 => format!("{:.1}", n),
            other => other.to_string(),
        }
    }

    fn value_type(&self) -> ValueType {
        ValueType::Float
    }
}

/// Boolean handler with configurable true/false literals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoolHandler {
    true_text: String,
    false_text: String,
}

impl Default for BoolHandler {
    fn default() -> Self {
        Self::with_literals("true", "false")
    }
}

impl BoolHandler {
    /// Create a handler that reads and writes the given literals
    /// (compared case-insensitively on read).
    pub fn with_literals(true_text: impl Into<String>, false_text: impl Into<String>) -> Self {
        Self {
            true_text: true_text.into(),
            false_text: false_text.into(),
        }
    }
}

impl TypeHandler for BoolHandler {
    fn parse(&self, text: &str) -> Result<Value, ConversionError> {
        let trimmed = text.trim();
        if trimmed.eq_ignore_ascii_case(&self.true_text) {
            Ok(Value::Bool(true))
        } else if trimmed.eq_ignore_ascii_case(&self.false_text) {
            Ok(Value::Bool(false))
        } else {
            Err(ConversionError::new(format!(
                "'{}' is neither '{}' nor '{}'",
                text, self.true_text, self.false_text
            )))
        }
    }

    fn format(&self, value: &Value) -> String {
        match value {
            Value::Bool(true) => self.true_text.clone(),
            Value::Bool(false) => self.false_text.clone(),
            other => other.to_string(),
        }
    }

    fn value_type(&self) -> ValueType {
        ValueType::Bool
    }
}
