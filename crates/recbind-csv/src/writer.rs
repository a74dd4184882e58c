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

//! CSV record writer.

use crate::config::CsvConfig;
use crate::error::{CsvError, Result};
use recbind_core::{RawRecord, RecordWriter, StreamResult};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// [`RecordWriter`] producing CSV text.
///
/// Fixed-length records are written as a single field.
///
/// # Examples
///
/// ```
/// use recbind_core::{RawRecord, RecordWriter};
/// use recbind_csv::{CsvConfig, CsvRecordWriter};
///
/// let mut writer = CsvRecordWriter::new(Vec::new(), &CsvConfig::default()).unwrap();
/// writer.write_record(RawRecord::fields(["H", "b,1"])).unwrap();
/// let bytes = writer.into_inner().unwrap();
/// assert_eq!(String::from_utf8(bytes).unwrap(), "H,\"b,1\"\n");
/// ```
#[derive(Debug)]
pub struct CsvRecordWriter<W: Write> {
    writer: csv::Writer<W>,
    has_headers: bool,
    header_written: bool,
}

impl<W: Write> CsvRecordWriter<W> {
    pub fn new(writer: W, config: &CsvConfig) -> Result<Self> {
        Ok(Self::from_csv(config.writer_builder()?.from_writer(writer), config))
    }

    fn from_csv(writer: csv::Writer<W>, config: &CsvConfig) -> Self {
        Self {
            writer,
            has_headers: config.has_headers,
            header_written: false,
        }
    }

    /// Write the header row. Ignored unless the config declares headers,
    /// and only the first call has an effect.
    pub fn write_header<S: AsRef<str>>(&mut self, names: impl IntoIterator<Item = S>) -> Result<()> {
        if !self.has_headers || self.header_written {
            return Ok(());
        }
        let names: Vec<S> = names.into_iter().collect();
        self.writer.write_record(names.iter().map(|n| n.as_ref()))?;
        self.header_written = true;
        Ok(())
    }

    /// Flush and return the inner writer.
    pub fn into_inner(self) -> Result<W> {
        self.writer
            .into_inner()
            .map_err(|e| CsvError::Io(e.into_error()))
    }
}

impl CsvRecordWriter<File> {
    /// Create or truncate a CSV file.
    pub fn from_path(path: impl AsRef<Path>, config: &CsvConfig) -> Result<Self> {
        let writer = config.writer_builder()?.from_path(path)?;
        Ok(Self::from_csv(writer, config))
    }
}

impl<W: Write> RecordWriter for CsvRecordWriter<W> {
    fn write_record(&mut self, record: RawRecord) -> StreamResult<()> {
        let written = match &record {
            RawRecord::Fields(fields) => self.writer.write_record(fields),
            RawRecord::Line(line) => self.writer.write_record([line]),
        };
        written.map_err(CsvError::from)?;
        Ok(())
    }

    fn flush(&mut self) -> StreamResult<()> {
        self.writer.flush()?;
        Ok(())
    }
}
