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

//! Raw records and format-specific field extraction.
//!
//! Parser components never slice records themselves; they hand a
//! [`FieldLayout`] and an iteration offset to a [`FieldFormat`].

use crate::config::{FormatKind, Justify};
use std::fmt;

/// One raw record unit as produced by a record reader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawRecord {
    /// A tokenized delimited record.
    Fields(Vec<String>),
    /// A single fixed-length line.
    Line(String),
}

impl RawRecord {
    /// Build a delimited record from anything yielding strings.
    pub fn fields<S: Into<String>>(fields: impl IntoIterator<Item = S>) -> Self {
        Self::Fields(fields.into_iter().map(Into::into).collect())
    }

    /// Build a fixed-length record.
    pub fn line(text: impl Into<String>) -> Self {
        Self::Line(text.into())
    }

    /// Record text for diagnostics. Delimited fields are joined with commas.
    pub fn text(&self) -> String {
        match self {
            Self::Fields(fields) => fields.join(","),
            Self::Line(line) => line.clone(),
        }
    }
}

impl fmt::Display for RawRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text())
    }
}

/// Where a field lives inside one record, before iteration offsets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldLayout {
    /// Field index (delimited) or character offset (fixed-length).
    pub position: usize,
    /// Padded width, if the field is padded.
    pub length: Option<usize>,
    pub padding: char,
    pub justify: Justify,
    /// Trim surrounding whitespace on read.
    pub trim: bool,
}

impl FieldLayout {
    /// Layout at `position` with no padding.
    pub fn at(position: usize) -> Self {
        Self {
            position,
            length: None,
            padding: ' ',
            justify: Justify::Left,
            trim: false,
        }
    }

    /// Number of positions one occurrence of this field consumes.
    pub fn width(&self, kind: FormatKind) -> usize {
        match kind {
            FormatKind::Delimited => 1,
            FormatKind::FixedLength => self.length.unwrap_or(0),
        }
    }

    fn unpad(&self, text: &str) -> String {
        let stripped = match (self.length, self.justify) {
            (None, _) => text,
            (Some(_), Justify::Left) => text.trim_end_matches(self.padding),
            (Some(_), Justify::Right) => text.trim_start_matches(self.padding),
        };
        // A value made only of a non-blank pad character (e.g. "000") keeps one.
        let stripped = if stripped.is_empty() && !text.is_empty() && self.padding != ' ' {
            text.get(text.len() - self.padding.len_utf8()..).unwrap_or("")
        } else {
            stripped
        };
        if self.trim {
            stripped.trim().to_string()
        } else {
            stripped.to_string()
        }
    }

    fn pad(&self, text: &str) -> String {
        let Some(length) = self.length else {
            return text.to_string();
        };
        let count = text.chars().count();
        if count >= length {
            return match self.justify {
                Justify::Left => text.chars().take(length).collect(),
                Justify::Right => text.chars().skip(count - length).collect(),
            };
        }
        let fill: String = std::iter::repeat(self.padding).take(length - count).collect();
        match self.justify {
            Justify::Left => format!("{}{}", text, fill),
            Justify::Right => format!("{}{}", fill, text),
        }
    }
}

/// Format-specific access to fields of a raw record.
pub trait FieldFormat: Send + Sync + fmt::Debug {
    fn kind(&self) -> FormatKind;

    /// An empty record to marshal into.
    fn new_record(&self) -> RawRecord;

    /// Whether the record has the shape this format expects.
    fn accepts(&self, record: &RawRecord) -> bool;

    /// Whether the record has data at an absolute position.
    fn has_position(&self, record: &RawRecord, position: usize) -> bool;

    /// Field text, or `None` when the record ends before the field.
    fn extract(&self, record: &RawRecord, layout: &FieldLayout, offset: usize) -> Option<String>;

    /// Write field text into the record, growing it as needed.
    fn insert(&self, record: &mut RawRecord, layout: &FieldLayout, offset: usize, text: &str);
}

/// Positions are field indexes.
#[derive(Debug, Clone, Copy, Default)]
pub struct DelimitedFormat;

impl FieldFormat for DelimitedFormat {
    fn kind(&self) -> FormatKind {
        FormatKind::Delimited
    }

    fn new_record(&self) -> RawRecord {
        RawRecord::Fields(Vec::new())
    }

    fn accepts(&self, record: &RawRecord) -> bool {
        matches!(record, RawRecord::Fields(_))
    }

    fn has_position(&self, record: &RawRecord, position: usize) -> bool {
        matches!(record, RawRecord::Fields(fields) if position < fields.len())
    }

    fn extract(&self, record: &RawRecord, layout: &FieldLayout, offset: usize) -> Option<String> {
        match record {
            RawRecord::Fields(fields) => fields
                .get(layout.position + offset)
                .map(|text| layout.unpad(text)),
            RawRecord::Line(_) => None,
        }
    }

    fn insert(&self, record: &mut RawRecord, layout: &FieldLayout, offset: usize, text: &str) {
        if let RawRecord::Fields(fields) = record {
            let index = layout.position + offset;
            if fields.len() <= index {
                fields.resize(index + 1, String::new());
            }
            fields[index] = layout.pad(text);
        }
    }
}

/// Positions are character offsets within a line.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedLengthFormat;

impl FieldFormat for FixedLengthFormat {
    fn kind(&self) -> FormatKind {
        FormatKind::FixedLength
    }

    fn new_record(&self) -> RawRecord {
        RawRecord::Line(String::new())
    }

    fn accepts(&self, record: &RawRecord) -> bool {
        matches!(record, RawRecord::Line(_))
    }

    fn has_position(&self, record: &RawRecord, position: usize) -> bool {
        matches!(record, RawRecord::Line(line) if position < line.chars().count())
    }

    fn extract(&self, record: &RawRecord, layout: &FieldLayout, offset: usize) -> Option<String> {
        let RawRecord::Line(line) = record else {
            return None;
        };
        let start = layout.position + offset;
        if start >= line.chars().count() {
            return None;
        }
        let raw: String = line
            .chars()
            .skip(start)
            .take(layout.length.unwrap_or(usize::MAX))
            .collect();
        Some(layout.unpad(&raw))
    }

    fn insert(&self, record: &mut RawRecord, layout: &FieldLayout, offset: usize, text: &str) {
        let RawRecord::Line(line) = record else {
            return;
        };
        let start = layout.position + offset;
        let padded = layout.pad(text);
        let mut chars: Vec<char> = line.chars().collect();
        if chars.len() < start {
            chars.resize(start, ' ');
        }
        for (i, c) in padded.chars().enumerate() {
            match chars.get_mut(start + i) {
                Some(slot) => *slot = c,
                None => chars.push(c),
            }
        }
        *line = chars.into_iter().collect();
    }
}

/// The built-in format for a [`FormatKind`].
pub fn format_for(kind: FormatKind) -> std::sync::Arc<dyn FieldFormat> {
    match kind {
        FormatKind::Delimited => std::sync::Arc::new(DelimitedFormat),
        FormatKind::FixedLength => std::sync::Arc::new(FixedLengthFormat),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed(position: usize, length: usize) -> FieldLayout {
        FieldLayout {
            length: Some(length),
            ..FieldLayout::at(position)
        }
    }

    // ==================== Delimited tests ====================

    #[test]
    fn test_delimited_extract() {
        let rec = RawRecord::fields(["H", "2025-01-01", ""]);
        let f = DelimitedFormat;
        assert_eq!(f.extract(&rec, &FieldLayout::at(1), 0).as_deref(), Some("2025-01-01"));
        assert_eq!(f.extract(&rec, &FieldLayout::at(0), 2).as_deref(), Some(""));
        assert_eq!(f.extract(&rec, &FieldLayout::at(3), 0), None);
    }

    #[test]
    fn test_delimited_insert_grows_record() {
        let f = DelimitedFormat;
        let mut rec = f.new_record();
        f.insert(&mut rec, &FieldLayout::at(2), 0, "c");
        f.insert(&mut rec, &FieldLayout::at(0), 0, "a");
        assert_eq!(rec, RawRecord::fields(["a", "", "c"]));
    }

    #[test]
    fn test_delimited_trim() {
        let layout = FieldLayout {
            trim: true,
            ..FieldLayout::at(0)
        };
        let rec = RawRecord::fields(["  x "]);
        assert_eq!(DelimitedFormat.extract(&rec, &layout, 0).as_deref(), Some("x"));
    }

    #[test]
    fn test_delimited_rejects_lines() {
        assert!(!DelimitedFormat.accepts(&RawRecord::line("abc")));
        assert!(DelimitedFormat.accepts(&RawRecord::fields(["abc"])));
    }

    // ==================== Fixed-length tests ====================

    #[test]
    fn test_fixed_extract_strips_padding() {
        let rec = RawRecord::line("Dabc  0042");
        let f = FixedLengthFormat;
        assert_eq!(f.extract(&rec, &fixed(0, 1), 0).as_deref(), Some("D"));
        assert_eq!(f.extract(&rec, &fixed(1, 5), 0).as_deref(), Some("abc"));
        let amount = FieldLayout {
            padding: '0',
            justify: Justify::Right,
            ..fixed(6, 4)
        };
        assert_eq!(f.extract(&rec, &amount, 0).as_deref(), Some("42"));
    }

    #[test]
    fn test_fixed_all_padding_keeps_one_char() {
        let amount = FieldLayout {
            padding: '0',
            justify: Justify::Right,
            ..fixed(0, 3)
        };
        let rec = RawRecord::line("000");
        assert_eq!(FixedLengthFormat.extract(&rec, &amount, 0).as_deref(), Some("0"));
    }

    #[test]
    fn test_fixed_beyond_end_is_missing() {
        let rec = RawRecord::line("AB");
        assert_eq!(FixedLengthFormat.extract(&rec, &fixed(2, 3), 0), None);
        assert_eq!(FixedLengthFormat.extract(&rec, &fixed(1, 3), 0).as_deref(), Some("B"));
    }

    #[test]
    fn test_fixed_insert_pads_and_truncates() {
        let f = FixedLengthFormat;
        let mut rec = f.new_record();
        f.insert(&mut rec, &fixed(4, 3), 0, "xy");
        f.insert(&mut rec, &fixed(0, 2), 0, "abcd");
        let amount = FieldLayout {
            padding: '0',
            justify: Justify::Right,
            ..fixed(7, 4)
        };
        f.insert(&mut rec, &amount, 0, "42");
        assert_eq!(rec, RawRecord::line("ab  xy 0042"));
    }

    #[test]
    fn test_fixed_insert_with_offset() {
        let f = FixedLengthFormat;
        let mut rec = RawRecord::line("0123456789");
        f.insert(&mut rec, &fixed(1, 2), 4, "ab");
        assert_eq!(rec, RawRecord::line("01234ab789"));
    }

    #[test]
    fn test_has_position() {
        assert!(FixedLengthFormat.has_position(&RawRecord::line("abc"), 2));
        assert!(!FixedLengthFormat.has_position(&RawRecord::line("abc"), 3));
        assert!(DelimitedFormat.has_position(&RawRecord::fields(["a"]), 0));
        assert!(!DelimitedFormat.has_position(&RawRecord::fields(["a"]), 1));
    }

    #[test]
    fn test_record_text() {
        assert_eq!(RawRecord::fields(["a", "b"]).text(), "a,b");
        assert_eq!(RawRecord::line("xyz").to_string(), "xyz");
    }
}
