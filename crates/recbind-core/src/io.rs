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

//! Record readers and writers.
//!
//! Sessions never touch bytes; they pull and push [`RawRecord`]s through
//! these traits. Line-based implementations live here, CSV lives in
//! `recbind-csv`.

use crate::error::{StreamError, StreamResult};
use crate::format::RawRecord;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};

/// Source of raw records.
pub trait RecordReader {
    /// Read the next record, or `None` at end of input.
    fn read_record(&mut self) -> StreamResult<Option<RawRecord>>;

    /// Line number of the record most recently returned (1-based).
    fn line_number(&self) -> usize;
}

/// Sink for raw records.
pub trait RecordWriter {
    fn write_record(&mut self, record: RawRecord) -> StreamResult<()>;

    fn flush(&mut self) -> StreamResult<()> {
        Ok(())
    }

    fn close(&mut self) -> StreamResult<()> {
        self.flush()
    }
}

impl<T: RecordReader + ?Sized> RecordReader for Box<T> {
    fn read_record(&mut self) -> StreamResult<Option<RawRecord>> {
        (**self).read_record()
    }

    fn line_number(&self) -> usize {
        (**self).line_number()
    }
}

impl<T: RecordWriter + ?Sized> RecordWriter for Box<T> {
    fn write_record(&mut self, record: RawRecord) -> StreamResult<()> {
        (**self).write_record(record)
    }

    fn flush(&mut self) -> StreamResult<()> {
        (**self).flush()
    }

    fn close(&mut self) -> StreamResult<()> {
        (**self).close()
    }
}

/// Buffered line reader.
///
/// Yields one [`RawRecord::Line`] per line, or splits lines on a delimiter
/// when built with [`delimited`](Self::delimited). No quoting is applied;
/// use `recbind-csv` for quoted input.
#[derive(Debug)]
pub struct LineReader<R: Read> {
    reader: BufReader<R>,
    line_number: usize,
    buffer: String,
    delimiter: Option<char>,
}

impl<R: Read> LineReader<R> {
    /// Reader for fixed-length records.
    pub fn new(reader: R) -> Self {
        Self {
            reader: BufReader::new(reader),
            line_number: 0,
            buffer: String::new(),
            delimiter: None,
        }
    }

    /// Reader splitting each line on `delimiter`.
    pub fn delimited(reader: R, delimiter: char) -> Self {
        Self {
            delimiter: Some(delimiter),
            ..Self::new(reader)
        }
    }
}

impl<R: Read> RecordReader for LineReader<R> {
    fn read_record(&mut self) -> StreamResult<Option<RawRecord>> {
        self.buffer.clear();
        if self.reader.read_line(&mut self.buffer)? == 0 {
            return Ok(None);
        }
        self.line_number += 1;

        if self.buffer.ends_with('\n') {
            self.buffer.pop();
            if self.buffer.ends_with('\r') {
                self.buffer.pop();
            }
        }

        Ok(Some(match self.delimiter {
            Some(d) => RawRecord::fields(self.buffer.split(d)),
            None => RawRecord::line(self.buffer.as_str()),
        }))
    }

    fn line_number(&self) -> usize {
        self.line_number
    }
}

/// Buffered line writer, the inverse of [`LineReader`].
#[derive(Debug)]
pub struct LineWriter<W: Write> {
    writer: BufWriter<W>,
    delimiter: char,
}

impl<W: Write> LineWriter<W> {
    pub fn new(writer: W) -> Self {
        Self::delimited(writer, ',')
    }

    /// Writer joining delimited fields with `delimiter`.
    pub fn delimited(writer: W, delimiter: char) -> Self {
        Self {
            writer: BufWriter::new(writer),
            delimiter,
        }
    }

    /// Flush and return the inner writer.
    pub fn into_inner(self) -> StreamResult<W> {
        self.writer
            .into_inner()
            .map_err(|e| StreamError::Io(e.into_error()))
    }
}

impl<W: Write> RecordWriter for LineWriter<W> {
    fn write_record(&mut self, record: RawRecord) -> StreamResult<()> {
        match record {
            RawRecord::Line(line) => writeln!(self.writer, "{}", line)?,
            RawRecord::Fields(fields) => {
                let mut separator = [0u8; 4];
                let separator = self.delimiter.encode_utf8(&mut separator);
                writeln!(self.writer, "{}", fields.join(separator))?
            }
        }
        Ok(())
    }

    fn flush(&mut self) -> StreamResult<()> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Reader over an in-memory sequence of records.
#[derive(Debug)]
pub struct IterReader<I> {
    records: I,
    line_number: usize,
}

impl<I: Iterator<Item = RawRecord>> IterReader<I> {
    pub fn new(records: impl IntoIterator<IntoIter = I>) -> Self {
        Self {
            records: records.into_iter(),
            line_number: 0,
        }
    }
}

impl<I: Iterator<Item = RawRecord>> RecordReader for IterReader<I> {
    fn read_record(&mut self) -> StreamResult<Option<RawRecord>> {
        let next = self.records.next();
        if next.is_some() {
            self.line_number += 1;
        }
        Ok(next)
    }

    fn line_number(&self) -> usize {
        self.line_number
    }
}

impl RecordWriter for Vec<RawRecord> {
    fn write_record(&mut self, record: RawRecord) -> StreamResult<()> {
        self.push(record);
        Ok(())
    }
}
