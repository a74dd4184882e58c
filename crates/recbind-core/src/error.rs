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

//! Error types for schema compilation and record streaming.
//!
//! Compilation failures are reported as [`ConfigError`], a struct carrying a
//! [`ConfigErrorKind`] plus a message and an optional context path. Reading and
//! writing failures are reported as [`StreamError`]; use
//! [`line()`](StreamError::line) to get the offending record's line number
//! uniformly.
//!
//! # Examples
//!
//! ```rust
//! use recbind_core::{ConfigError, ConfigErrorKind};
//!
//! let err = ConfigError::occurs("minOccurs 3 exceeds maxOccurs 2").with_context("record 'detail'");
//! assert_eq!(err.kind, ConfigErrorKind::Occurs);
//! assert!(err.to_string().contains("detail"));
//! ```

use std::fmt;
use thiserror::Error;

/// The kind of error that occurred during schema compilation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigErrorKind {
    /// General schema inconsistency.
    Invariant,
    /// Sibling ordering violation.
    Ordering,
    /// Invalid minOccurs/maxOccurs combination.
    Occurs,
    /// Accessor, collection or type binding could not be resolved.
    Binding,
    /// No constructor matches the constructor-bound children.
    Constructor,
    /// Missing or unusable type handler.
    TypeHandler,
    /// Field position or length problem.
    Layout,
    /// Compile limit exceeded.
    Limit,
}

impl fmt::Display for ConfigErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Invariant => write!(f, "InvariantError"),
            Self::Ordering => write!(f, "OrderingError"),
            Self::Occurs => write!(f, "OccursError"),
            Self::Binding => write!(f, "BindingError"),
            Self::Constructor => write!(f, "ConstructorError"),
            Self::TypeHandler => write!(f, "TypeHandlerError"),
            Self::Layout => write!(f, "LayoutError"),
            Self::Limit => write!(f, "LimitError"),
        }
    }
}

/// A fatal error raised while compiling a schema.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{kind}: {message}{}", .context.as_ref().map(|c| format!(" ({})", c)).unwrap_or_default())]
pub struct ConfigError {
    /// The kind of error.
    pub kind: ConfigErrorKind,
    /// Human-readable error message.
    pub message: String,
    /// Where in the schema the error was found (e.g. "group 'batch' / record 'detail'").
    pub context: Option<String>,
}

impl ConfigError {
    /// Create a new error.
    pub fn new(kind: ConfigErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            context: None,
        }
    }

    /// Add context information. An existing context is kept as the inner part.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        let context = context.into();
        self.context = Some(match self.context.take() {
            Some(inner) => format!("{} / {}", context, inner),
            None => context,
        });
        self
    }

    pub fn invariant(message: impl Into<String>) -> Self {
        Self::new(ConfigErrorKind::Invariant, message)
    }

    pub fn ordering(message: impl Into<String>) -> Self {
        Self::new(ConfigErrorKind::Ordering, message)
    }

    pub fn occurs(message: impl Into<String>) -> Self {
        Self::new(ConfigErrorKind::Occurs, message)
    }

    pub fn binding(message: impl Into<String>) -> Self {
        Self::new(ConfigErrorKind::Binding, message)
    }

    pub fn constructor(message: impl Into<String>) -> Self {
        Self::new(ConfigErrorKind::Constructor, message)
    }

    pub fn type_handler(message: impl Into<String>) -> Self {
        Self::new(ConfigErrorKind::TypeHandler, message)
    }

    pub fn layout(message: impl Into<String>) -> Self {
        Self::new(ConfigErrorKind::Layout, message)
    }

    pub fn limit(message: impl Into<String>) -> Self {
        Self::new(ConfigErrorKind::Limit, message)
    }
}

/// Result type for schema compilation.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Failure raised by an accessor or type factory while binding values to
/// application objects.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BindingError {
    /// The target is not an instance the accessor can work on.
    #[error("expected an instance of '{expected}', found {found}")]
    NotAnInstance { expected: String, found: String },

    /// The property does not exist on a closed type.
    #[error("type '{type_name}' has no property '{property}'")]
    UnknownProperty { type_name: String, property: String },

    /// Instantiation failed.
    #[error("cannot instantiate '{type_name}': {message}")]
    Instantiate { type_name: String, message: String },
}

/// Failure raised by a type handler converting between text and values.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ConversionError {
    pub message: String,
}

impl ConversionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// One failed field-level validation rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// Name of the field that failed.
    pub field: String,
    /// Name of the rule (`required`, `minLength`, `maxLength`, `literal`,
    /// `regex`, `type`, `minOccurs`).
    pub rule: &'static str,
    /// Human-readable detail.
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, rule: &'static str, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            rule,
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]: {}", self.field, self.rule, self.message)
    }
}

fn join_errors(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Errors that can occur while reading or writing records.
///
/// Most variants carry the line number of the offending record; use
/// [`line()`](Self::line) to extract it uniformly.
#[derive(Error, Debug)]
pub enum StreamError {
    /// IO error from the underlying reader or writer.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The record reader could not tokenize a record.
    #[error("Malformed record at line {line}: {message}")]
    Malformed { line: usize, message: String },

    /// No record in the schema identifies the input record.
    #[error("Unidentified record at line {line}")]
    Unidentified { line: usize },

    /// No record or group in the schema identifies the object being written.
    #[error("Unidentified object of type '{type_name}'")]
    UnidentifiedObject { type_name: String },

    /// A node did not reach its minOccurs before the structure moved on.
    #[error("Expected record or group '{node}' at line {line}")]
    Unsatisfied { line: usize, node: String },

    /// The record is known to the schema, but not expected here.
    #[error("Unexpected record '{record}' at line {line}")]
    Unexpected { line: usize, record: String },

    /// One or more field validations failed.
    #[error("Invalid record '{record}' at line {line}: {}", join_errors(.errors))]
    InvalidRecord {
        line: usize,
        record: String,
        errors: Vec<FieldError>,
    },

    /// Binding values to or from application objects failed.
    #[error("Binding error at line {line}: {source}")]
    Binding {
        line: usize,
        #[source]
        source: BindingError,
    },

    /// The session was closed.
    #[error("Stream is closed")]
    Closed,
}

impl StreamError {
    /// Get the line number where the error occurred, if applicable.
    pub fn line(&self) -> Option<usize> {
        match self {
            Self::Malformed { line, .. }
            | Self::Unidentified { line }
            | Self::Unsatisfied { line, .. }
            | Self::Unexpected { line, .. }
            | Self::InvalidRecord { line, .. }
            | Self::Binding { line, .. } => Some(*line),
            Self::Io(_) | Self::UnidentifiedObject { .. } | Self::Closed => None,
        }
    }

    /// Whether this error is a structural violation (ordering or occurrences).
    pub fn is_structural(&self) -> bool {
        matches!(self, Self::Unsatisfied { .. } | Self::Unexpected { .. })
    }

    pub fn malformed(line: usize, message: impl Into<String>) -> Self {
        Self::Malformed {
            line,
            message: message.into(),
        }
    }

    pub fn unsatisfied(line: usize, node: impl Into<String>) -> Self {
        Self::Unsatisfied {
            line,
            node: node.into(),
        }
    }
}

/// Result type for streaming operations.
pub type StreamResult<T> = Result<T, StreamError>;
