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

//! CSV record reader.

use crate::config::CsvConfig;
use crate::error::{CsvError, Result};
use recbind_core::{RawRecord, RecordReader, StreamResult};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// [`RecordReader`] over CSV text.
///
/// Records may have any number of fields; quoting follows RFC 4180.
///
/// # Examples
///
/// ```
/// use recbind_core::{RawRecord, RecordReader};
/// use recbind_csv::{CsvConfig, CsvRecordReader};
///
/// let data = "H,\"b,1\"\nD,10\n";
/// let mut reader = CsvRecordReader::new(data.as_bytes(), &CsvConfig::default()).unwrap();
/// let header = reader.read_record().unwrap().unwrap();
/// assert_eq!(header, RawRecord::fields(["H", "b,1"]));
/// ```
#[derive(Debug)]
pub struct CsvRecordReader<R: Read> {
    reader: csv::Reader<R>,
    record: csv::StringRecord,
    line_number: usize,
}

impl<R: Read> CsvRecordReader<R> {
    pub fn new(reader: R, config: &CsvConfig) -> Result<Self> {
        Ok(Self::from_csv(config.reader_builder()?.from_reader(reader)))
    }

    fn from_csv(reader: csv::Reader<R>) -> Self {
        Self {
            reader,
            record: csv::StringRecord::new(),
            line_number: 0,
        }
    }

    /// Header row, when the config declares one.
    pub fn headers(&mut self) -> Result<Option<Vec<String>>> {
        if !self.reader.has_headers() {
            return Ok(None);
        }
        let headers = self.reader.headers()?;
        Ok(Some(headers.iter().map(str::to_string).collect()))
    }

    pub fn into_inner(self) -> R {
        self.reader.into_inner()
    }
}

impl CsvRecordReader<File> {
    /// Open a CSV file.
    pub fn from_path(path: impl AsRef<Path>, config: &CsvConfig) -> Result<Self> {
        let reader = config.reader_builder()?.from_path(path)?;
        Ok(Self::from_csv(reader))
    }
}

impl<R: Read> RecordReader for CsvRecordReader<R> {
    fn read_record(&mut self) -> StreamResult<Option<RawRecord>> {
        if !self.reader.read_record(&mut self.record).map_err(CsvError::from)? {
            return Ok(None);
        }
        self.line_number = match self.record.position() {
            Some(position) => position.line() as usize,
            None => self.line_number + 1,
        };
        Ok(Some(RawRecord::fields(self.record.iter())))
    }

    fn line_number(&self) -> usize {
        self.line_number
    }
}
