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

//! Error types for CSV record I/O.

use recbind_core::StreamError;
use thiserror::Error;

/// CSV record I/O error types.
///
/// # Examples
///
/// ```
/// use recbind_csv::CsvError;
///
/// let err = CsvError::InvalidDelimiter { delimiter: '"' };
/// assert_eq!(err.to_string(), "Invalid CSV delimiter '\"'");
/// ```
#[derive(Debug, Error)]
pub enum CsvError {
    /// Error from the underlying CSV library.
    ///
    /// Covers quoting errors, invalid UTF-8 in a record and I/O errors
    /// raised while the CSV reader was filling its buffer.
    #[error("CSV error: {0}")]
    CsvLib(#[from] csv::Error),

    /// I/O error outside the CSV library.
    ///
    /// # Examples
    ///
    /// ```
    /// use recbind_csv::CsvError;
    /// use std::io;
    ///
    /// let err = CsvError::from(io::Error::new(io::ErrorKind::NotFound, "file not found"));
    /// assert!(err.to_string().contains("I/O error"));
    /// ```
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Delimiter that cannot separate fields.
    #[error("Invalid CSV delimiter '{delimiter}'")]
    InvalidDelimiter {
        /// The rejected delimiter.
        delimiter: char,
    },

    /// Invalid UTF-8 in CSV output.
    ///
    /// # Examples
    ///
    /// ```
    /// use recbind_csv::CsvError;
    ///
    /// let err = CsvError::InvalidUtf8 {
    ///     context: "CSV serialization".to_string(),
    /// };
    /// assert_eq!(err.to_string(), "Invalid UTF-8 in CSV serialization");
    /// ```
    #[error("Invalid UTF-8 in {context}")]
    InvalidUtf8 {
        /// Context where the invalid UTF-8 was encountered.
        context: String,
    },
}

/// Convenience type alias for `Result` with `CsvError`.
pub type Result<T> = std::result::Result<T, CsvError>;

impl CsvError {
    /// Line of the offending record, when the CSV library reported one.
    pub fn line(&self) -> Option<usize> {
        match self {
            CsvError::CsvLib(e) => e.position().map(|p| p.line() as usize),
            _ => None,
        }
    }
}

impl From<CsvError> for StreamError {
    fn from(err: CsvError) -> Self {
        let line = err.line().unwrap_or(0);
        match err {
            CsvError::Io(e) => StreamError::Io(e),
            CsvError::CsvLib(e) => {
                let message = e.to_string();
                match e.into_kind() {
                    csv::ErrorKind::Io(e) => StreamError::Io(e),
                    _ => StreamError::malformed(line, message),
                }
            }
            other => StreamError::malformed(line, other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_invalid_delimiter_display() {
        let err = CsvError::InvalidDelimiter { delimiter: '\n' };
        assert!(err.to_string().starts_with("Invalid CSV delimiter"));
        assert_eq!(err.line(), None);
    }

    #[test]
    fn test_io_error_becomes_stream_io() {
        let err = CsvError::from(io::Error::new(io::ErrorKind::BrokenPipe, "closed"));
        assert!(matches!(StreamError::from(err), StreamError::Io(_)));
    }

    #[test]
    fn test_csv_error_becomes_malformed() {
        let data: &[u8] = b"a,b\n\xff\xfe,c\n";
        let mut reader = csv::ReaderBuilder::new().has_headers(false).from_reader(data);
        let mut record = csv::StringRecord::new();
        let err = loop {
            match reader.read_record(&mut record) {
                Ok(true) => continue,
                Ok(false) => panic!("expected a CSV error"),
                Err(e) => break CsvError::from(e),
            }
        };
        assert!(matches!(StreamError::from(err), StreamError::Malformed { .. }));
    }
}
