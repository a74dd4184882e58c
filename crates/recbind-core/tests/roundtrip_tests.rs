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

//! Read/write round trips, including property-based ones.

use proptest::prelude::*;
use recbind_core::{
    compile, FieldConfig, FormatKind, LineReader, LineWriter, RawRecord, RecordConfig, RecordReader,
    RecordWriter, SegmentConfig, Stream, StreamConfig, Value,
};
use recbind_test::{fixtures, records, rows_of};

fn read_all<R: RecordReader>(stream: &Stream, reader: R) -> Vec<Value> {
    let mut session = stream.begin_read(reader);
    let values = session.by_ref().collect::<Result<Vec<_>, _>>().unwrap();
    session.close().unwrap();
    values
}

fn write_all<W: RecordWriter>(stream: &Stream, writer: W, values: &[Value]) -> W {
    let mut session = stream.begin_write(writer);
    for value in values {
        session.write(value).unwrap();
    }
    session.close().unwrap();
    session.into_inner()
}

// ==================== Records back to records ====================

#[test]
fn test_map_segment_round_trip() {
    let stream = compile(
        StreamConfig::new("s", FormatKind::Delimited).record(
            RecordConfig::new("settings")
                .type_name("Settings")
                .min_occurs(0)
                .unbounded()
                .field(FieldConfig::new("kind").rid().literal("M"))
                .segment(
                    SegmentConfig::new("entries")
                        .occurs(0, 3)
                        .collection("map")
                        .key("name")
                        .field(FieldConfig::new("name"))
                        .field(FieldConfig::new("value").type_name("int")),
                ),
        ),
    )
    .unwrap();

    let values = read_all(&stream, records([vec!["M", "a", "1", "b", "2"]]));
    let entries = values[0].property("entries").and_then(Value::as_map).unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[1].0, Value::from("b"));
    assert_eq!(entries[1].1.property("value"), Some(&Value::Int(2)));

    let written = write_all(&stream, Vec::new(), &values);
    assert_eq!(rows_of(&written), vec![vec!["M", "a", "1", "b", "2"]]);
}

#[test]
fn test_set_collection_drops_duplicates() {
    let stream = compile(
        StreamConfig::new("s", FormatKind::Delimited).record(
            RecordConfig::new("tags")
                .type_name("Tags")
                .field(FieldConfig::new("kind").rid().literal("S"))
                .field(FieldConfig::new("tag").unbounded().collection("set")),
        ),
    )
    .unwrap();
    let values = read_all(&stream, records([["S", "x", "x", "y"]]));
    assert_eq!(
        values[0].property("tag"),
        Some(&Value::List(vec![Value::from("x"), Value::from("y")]))
    );
    let written = write_all(&stream, Vec::new(), &values);
    assert_eq!(written, vec![RawRecord::fields(["S", "x", "y"])]);
}

#[test]
fn test_fixed_length_text_round_trip() {
    let stream = compile(fixtures::fixed_length_people()).unwrap();
    // A name filling the whole field, and an age needing no padding.
    let text = format!(
        "{}\n{}\n",
        fixtures::person_line("Ann", 42),
        fixtures::person_line("Christophe", 101)
    );
    let values = read_all(&stream, LineReader::new(text.as_bytes()));
    assert_eq!(values[1], fixtures::person_object("Christophe", 101));

    let writer = write_all(&stream, LineWriter::new(Vec::new()), &values);
    let bytes = writer.into_inner().unwrap();
    assert_eq!(String::from_utf8(bytes).unwrap(), text);
}

// ==================== Property-based ====================

fn batch_strategy() -> impl Strategy<Value = Vec<(String, Vec<i64>)>> {
    prop::collection::vec(
        ("[a-z0-9]{1,8}", prop::collection::vec(any::<i64>(), 0..5)),
        1..6,
    )
}

proptest! {
    #[test]
    fn prop_batch_group_round_trip(batches in batch_strategy()) {
        let stream = compile(fixtures::batch_group()).unwrap();
        let values: Vec<Value> = batches
            .iter()
            .map(|(id, amounts)| fixtures::batch_object(id, amounts))
            .collect();

        let written = write_all(&stream, Vec::new(), &values);
        let detail_count: usize = batches.iter().map(|(_, a)| a.len()).sum();
        prop_assert_eq!(written.len(), batches.len() * 2 + detail_count);

        let read = read_all(&stream, recbind_core::IterReader::new(written));
        prop_assert_eq!(read, values);
    }

    #[test]
    fn prop_orders_round_trip(
        orders in prop::collection::vec(
            (any::<i32>(), "[A-Za-z]{1,8}", "[A-Za-z]{1,8}", prop::collection::vec("[a-z]{1,5}", 0..4)),
            0..6,
        )
    ) {
        let stream = compile(fixtures::orders()).unwrap();
        let values: Vec<Value> = orders
            .iter()
            .map(|(id, name, city, items)| {
                let items: Vec<&str> = items.iter().map(String::as_str).collect();
                fixtures::order_object(i64::from(*id), (name.as_str(), city.as_str()), &items)
            })
            .collect();

        let written = write_all(&stream, Vec::new(), &values);
        let read = read_all(&stream, recbind_core::IterReader::new(written));
        prop_assert_eq!(read, values);
    }
}
