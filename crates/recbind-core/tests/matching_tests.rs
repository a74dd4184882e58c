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

//! Record matching through the public session API: ordering, occurrence
//! bounds and group wrap-around.

use proptest::prelude::*;
use recbind_core::{
    compile, FieldConfig, FormatKind, GroupConfig, Object, RecordConfig, Stream, StreamConfig,
    StreamError, StreamResult, Value,
};
use recbind_test::fixtures::{self, builders::RecordsBuilder};
use recbind_test::records;
use tracing_subscriber::{fmt, EnvFilter};

/// Initialize tracing for tests; `RUST_LOG=recbind_core=trace` shows every
/// matcher stage.
fn init_tracing() {
    let _ = fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_test_writer()
        .try_init();
}

fn read_rows(stream: &Stream, rows: &[&[&str]]) -> StreamResult<Vec<Value>> {
    let mut reader = stream.begin_read(records(rows.iter().map(|r| r.iter().copied())));
    let mut values = Vec::new();
    while let Some(value) = reader.read()? {
        values.push(value);
    }
    reader.close()?;
    Ok(values)
}

fn names(values: &[Value]) -> Vec<String> {
    values
        .iter()
        .filter_map(|v| v.as_object().map(|o| o.type_name.clone()))
        .collect()
}

// ==================== Ordering ====================

#[test]
fn test_ordered_pair_in_order() {
    let stream = compile(fixtures::ordered_pair()).unwrap();
    let values = read_rows(&stream, &[&["A", "1"], &["B", "2"]]).unwrap();
    assert_eq!(names(&values), vec!["A", "B"]);
}

#[test]
fn test_ordered_pair_out_of_order() {
    let stream = compile(fixtures::ordered_pair()).unwrap();
    let err = read_rows(&stream, &[&["B", "2"], &["A", "1"]]).unwrap_err();
    assert!(matches!(err, StreamError::Unsatisfied { line: 1, ref node } if node == "a"), "{:?}", err);
}

#[test]
fn test_ordered_pair_duplicate_is_structural() {
    let stream = compile(fixtures::ordered_pair()).unwrap();
    let err = read_rows(&stream, &[&["A", "1"], &["A", "2"]]).unwrap_err();
    assert!(err.is_structural(), "{:?}", err);
    assert_eq!(err.line(), Some(2));
}

#[test]
fn test_unordered_pair_any_order() {
    let stream = compile(fixtures::unordered_pair()).unwrap();
    let values = read_rows(&stream, &[&["B", "2"], &["A", "1"]]).unwrap();
    assert_eq!(names(&values), vec!["B", "A"]);
}

#[test]
fn test_unordered_pair_still_checks_minimum() {
    let stream = compile(fixtures::unordered_pair()).unwrap();
    let err = read_rows(&stream, &[&["B", "2"]]).unwrap_err();
    assert!(matches!(err, StreamError::Unsatisfied { ref node, .. } if node == "a"));
}

// ==================== Occurrences ====================

#[test]
fn test_occurrences_within_bounds() {
    let stream = compile(fixtures::occurrence_group()).unwrap();
    assert_eq!(read_rows(&stream, &[&["D", "1"], &["D", "2"]]).unwrap().len(), 2);
    assert_eq!(
        read_rows(&stream, &[&["D", "1"], &["D", "2"], &["D", "3"]]).unwrap().len(),
        3
    );
}

#[test]
fn test_occurrences_below_minimum() {
    let stream = compile(fixtures::occurrence_group()).unwrap();
    let err = read_rows(&stream, &[&["D", "1"]]).unwrap_err();
    assert!(matches!(err, StreamError::Unsatisfied { ref node, .. } if node == "d"));

    let err = read_rows(&stream, &[]).unwrap_err();
    assert!(matches!(err, StreamError::Unsatisfied { ref node, .. } if node == "g"));
}

#[test]
fn test_occurrences_above_maximum() {
    init_tracing();
    let stream = compile(fixtures::occurrence_group()).unwrap();
    let row: &[&str] = &["D", "1"];
    let rows = vec![row; 4];
    let err = read_rows(&stream, &rows).unwrap_err();
    assert!(
        matches!(err, StreamError::Unexpected { line: 4, ref record } if record == "d"),
        "{:?}",
        err
    );
}

proptest! {
    #[test]
    fn prop_occurrence_bounds(count in 0usize..8) {
        let stream = compile(fixtures::occurrence_group()).unwrap();
        let row: &[&str] = &["D", "x"];
        let rows = vec![row; count];
        let result = read_rows(&stream, &rows);
        prop_assert_eq!(result.is_ok(), (2..=3).contains(&count));
        if let Ok(values) = result {
            prop_assert_eq!(values.len(), count);
        }
    }
}

// ==================== Wrap-around ====================

fn untyped_batches() -> StreamConfig {
    StreamConfig::new("batches", FormatKind::Delimited).group(
        GroupConfig::new("batch")
            .min_occurs(1)
            .unbounded()
            .record(
                RecordConfig::new("header")
                    .type_name("Header")
                    .field(FieldConfig::new("kind").rid().literal("H"))
                    .field(FieldConfig::new("id")),
            )
            .record(
                RecordConfig::new("detail")
                    .min_occurs(0)
                    .unbounded()
                    .field(FieldConfig::new("kind").rid().literal("D")),
            )
            .record(RecordConfig::new("trailer").field(FieldConfig::new("kind").rid().literal("T"))),
    )
}

#[test]
fn test_group_wraps_into_new_occurrence() {
    init_tracing();
    let stream = compile(untyped_batches()).unwrap();
    let values = read_rows(
        &stream,
        &[&["H", "b1"], &["D"], &["T"], &["H", "b2"], &["T"], &["H", "b3"], &["D"], &["D"], &["T"]],
    )
    .unwrap();
    let ids: Vec<&str> = values
        .iter()
        .filter_map(|v| v.property("id").and_then(Value::as_str))
        .collect();
    assert_eq!(ids, vec!["b1", "b2", "b3"]);
}

#[test]
fn test_failed_wrap_reports_unexpected_record() {
    init_tracing();
    let stream = compile(untyped_batches()).unwrap();
    let err = read_rows(&stream, &[&["H", "b1"], &["T"], &["D"]]).unwrap_err();
    assert!(
        matches!(err, StreamError::Unexpected { line: 3, ref record } if record == "detail"),
        "{:?}",
        err
    );
}

#[test]
fn test_wrap_in_middle_of_group_is_unsatisfied() {
    init_tracing();
    let stream = compile(untyped_batches()).unwrap();
    let err = read_rows(&stream, &[&["H", "b1"], &["D"], &["H", "b2"]]).unwrap_err();
    assert!(err.is_structural(), "{:?}", err);
}

#[test]
fn test_wrap_requires_satisfied_occurrence() {
    let config = StreamConfig::new("s", FormatKind::Delimited).group(
        GroupConfig::new("g")
            .unbounded()
            .record(RecordConfig::new("h").field(FieldConfig::new("kind").rid().literal("H")))
            .record(
                RecordConfig::new("d")
                    .occurs(2, 3)
                    .field(FieldConfig::new("kind").rid().literal("D")),
            ),
    );
    let stream = compile(config).unwrap();
    let err = read_rows(&stream, &[&["H"], &["D"], &["H"], &["D"], &["D"]]).unwrap_err();
    assert!(
        matches!(err, StreamError::Unsatisfied { line: 3, ref node } if node == "d"),
        "{:?}",
        err
    );
    assert_eq!(
        read_rows(&stream, &[&["H"], &["D"], &["D"], &["H"], &["D"], &["D"]]).unwrap().len(),
        0
    );
}

// ==================== Header, detail, footer ====================

fn kind_record(name: &str, type_name: &str, kind: &str) -> RecordConfig {
    RecordConfig::new(name)
        .type_name(type_name)
        .field(FieldConfig::new("kind").rid().literal(kind))
        .field(FieldConfig::new("value"))
}

fn header_detail_footer() -> StreamConfig {
    StreamConfig::new("batches", FormatKind::Delimited).group(
        GroupConfig::new("batch")
            .type_name("Batch")
            .occurs(1, 1)
            .record(kind_record("header", "Header", "H").order(1))
            .record(
                kind_record("detail", "Detail", "D")
                    .order(2)
                    .min_occurs(1)
                    .unbounded()
                    .collection("list"),
            )
            .record(kind_record("footer", "Footer", "F").order(3)),
    )
}

#[test]
fn test_header_details_footer() {
    let stream = compile(header_detail_footer()).unwrap();
    let values = read_rows(&stream, &[&["H", "h"], &["D", "1"], &["D", "2"], &["F", "f"]]).unwrap();
    assert_eq!(values.len(), 1);
    let batch = &values[0];
    assert_eq!(names(&values), vec!["Batch"]);
    assert!(batch.property("header").and_then(Value::as_object).is_some());
    assert_eq!(batch.property("detail").and_then(Value::as_list).map(|l| l.len()), Some(2));
    assert!(batch.property("footer").and_then(Value::as_object).is_some());
}

#[test]
fn test_footer_before_required_detail() {
    let stream = compile(header_detail_footer()).unwrap();
    let err = read_rows(&stream, &[&["H", "h"], &["F", "f"]]).unwrap_err();
    assert!(
        matches!(err, StreamError::Unsatisfied { line: 2, ref node } if node == "detail"),
        "{:?}",
        err
    );
}

#[test]
fn test_detail_before_header() {
    let stream = compile(header_detail_footer()).unwrap();
    let err = read_rows(&stream, &[&["D", "1"], &["H", "h"], &["F", "f"]]).unwrap_err();
    assert!(err.is_structural(), "{:?}", err);
    assert_eq!(err.line(), Some(1));
}

#[test]
fn test_later_sibling_requires_minimum() {
    init_tracing();
    let config = StreamConfig::new("s", FormatKind::Delimited)
        .record(RecordConfig::new("h").field(FieldConfig::new("kind").rid().literal("H")))
        .record(
            RecordConfig::new("d")
                .occurs(2, 3)
                .field(FieldConfig::new("kind").rid().literal("D")),
        )
        .record(RecordConfig::new("t").field(FieldConfig::new("kind").rid().literal("T")));
    let stream = compile(config).unwrap();
    let err = read_rows(&stream, &[&["H"], &["D"], &["T"]]).unwrap_err();
    assert!(
        matches!(err, StreamError::Unsatisfied { line: 3, ref node } if node == "d"),
        "{:?}",
        err
    );
    assert!(read_rows(&stream, &[&["H"], &["D"], &["D"], &["T"]]).is_ok());
}

// ==================== Typed groups ====================

#[test]
fn test_unidentified_records_skipped_inside_group() {
    let stream = compile(fixtures::batch_group().ignore_unidentified_records(true)).unwrap();
    let reader = RecordsBuilder::new()
        .row(["H", "b1"])
        .row(["X", "junk"])
        .row(["D", "10"])
        .row(["T", "1"])
        .reader();
    let mut session = stream.begin_read(reader);
    assert_eq!(session.read().unwrap(), Some(fixtures::batch_object("b1", &[10])));
    assert!(session.read().unwrap().is_none());
}

#[test]
fn test_unidentified_record_inside_group() {
    let stream = compile(fixtures::batch_group()).unwrap();
    let err = read_rows(&stream, &[&["H", "b1"], &["X"]]).unwrap_err();
    assert!(matches!(err, StreamError::Unidentified { line: 2 }));
}

#[test]
fn test_invalid_record_collects_field_errors() {
    let stream = compile(fixtures::batch_group()).unwrap();
    let mut reader = stream.begin_read(records([["H", ""]]));
    match reader.read() {
        Err(StreamError::InvalidRecord { line, record, errors }) => {
            assert_eq!(line, 1);
            assert_eq!(record, "header");
            assert_eq!(errors.len(), 1);
            assert_eq!(errors[0].rule, "required");
        }
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(reader.record_context().field_errors.len(), 1);
}

// ==================== Writing ====================

#[test]
fn test_writer_enforces_order() {
    let stream = compile(fixtures::ordered_pair()).unwrap();
    let mut writer = stream.begin_write(Vec::new());
    let b: Value = Object::new("B").with("kind", "B").with("value", "2").into();
    let err = writer.write(&b).unwrap_err();
    assert!(matches!(err, StreamError::Unsatisfied { ref node, .. } if node == "a"));
}

#[test]
fn test_writer_named_untyped_trailer() {
    let stream = compile(fixtures::flat_batch()).unwrap();
    let mut writer = stream.begin_write(Vec::new());
    writer.write(&fixtures::header_object("b1")).unwrap();
    writer.write(&fixtures::detail_object(5)).unwrap();
    writer.write_named("trailer", &Value::Null).unwrap();
    writer.close().unwrap();
    assert_eq!(
        recbind_test::rows_of(&writer.into_inner()),
        vec![vec!["H", "b1"], vec!["D", "5"], vec!["T", ""]]
    );
}
