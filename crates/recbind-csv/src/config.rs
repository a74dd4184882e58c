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

//! CSV dialect configuration.

use crate::error::{CsvError, Result};

/// Configuration for CSV record I/O.
///
/// # Examples
///
/// ## Default Configuration
///
/// ```
/// # use recbind_csv::CsvConfig;
/// let config = CsvConfig::default();
/// assert_eq!(config.delimiter, b',');
/// assert!(!config.has_headers);
/// assert!(!config.trim);
/// ```
///
/// ## Tab-Delimited with a Header Row
///
/// ```
/// # use recbind_csv::CsvConfig;
/// let config = CsvConfig {
///     delimiter: b'\t',
///     has_headers: true,
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone)]
pub struct CsvConfig {
    /// Field delimiter character (default: `,`).
    pub delimiter: u8,

    /// Whether the first row is a header (default: `false`).
    ///
    /// Readers skip it; writers emit it when given header names.
    pub has_headers: bool,

    /// Whether to trim surrounding whitespace from every field (default: `false`).
    ///
    /// Field-level trimming in the stream schema is usually the better
    /// choice, since it can differ per field.
    pub trim: bool,

    /// Quote style for written fields (default: necessary).
    pub quote_style: csv::QuoteStyle,
}

impl Default for CsvConfig {
    fn default() -> Self {
        Self {
            delimiter: b',',
            has_headers: false,
            trim: false,
            quote_style: csv::QuoteStyle::Necessary,
        }
    }
}

impl CsvConfig {
    /// Config with a custom delimiter.
    pub fn delimited(delimiter: u8) -> Self {
        Self {
            delimiter,
            ..Self::default()
        }
    }

    /// Reject delimiters that collide with quoting or line breaks.
    pub fn validate(&self) -> Result<()> {
        match self.delimiter {
            b'"' | b'\n' | b'\r' => Err(CsvError::InvalidDelimiter {
                delimiter: char::from(self.delimiter),
            }),
            _ => Ok(()),
        }
    }

    pub(crate) fn reader_builder(&self) -> Result<csv::ReaderBuilder> {
        self.validate()?;
        let mut builder = csv::ReaderBuilder::new();
        builder
            .delimiter(self.delimiter)
            .has_headers(self.has_headers)
            .flexible(true)
            .trim(if self.trim {
                csv::Trim::All
            } else {
                csv::Trim::None
            });
        Ok(builder)
    }

    pub(crate) fn writer_builder(&self) -> Result<csv::WriterBuilder> {
        self.validate()?;
        let mut builder = csv::WriterBuilder::new();
        builder
            .delimiter(self.delimiter)
            .quote_style(self.quote_style)
            .flexible(true);
        Ok(builder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CsvConfig::default();
        assert_eq!(config.delimiter, b',');
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_quote_delimiter() {
        assert!(matches!(
            CsvConfig::delimited(b'"').validate(),
            Err(CsvError::InvalidDelimiter { delimiter: '"' })
        ));
        assert!(CsvConfig::delimited(b'\n').reader_builder().is_err());
        assert!(CsvConfig::delimited(b'|').writer_builder().is_ok());
    }
}
