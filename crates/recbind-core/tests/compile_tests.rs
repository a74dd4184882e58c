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

//! Schema compilation tests: every configuration error kind, limits and
//! type registry resolution.

use recbind_core::{
    compile, compile_with_options, CompileOptions, ConfigError, ConfigErrorKind, DynamicType,
    FieldConfig, FormatKind, GroupConfig, Object, RecordConfig, SegmentConfig, StreamConfig, Value,
    ValueType,
};
use recbind_test::{fixtures, records};

fn delimited(record: RecordConfig) -> StreamConfig {
    StreamConfig::new("s", FormatKind::Delimited).record(record)
}

fn compile_err(config: StreamConfig) -> ConfigError {
    compile(config).unwrap_err()
}

// ==================== Structure ====================

#[test]
fn test_empty_stream_is_invariant_error() {
    let err = compile_err(StreamConfig::new("empty", FormatKind::Delimited));
    assert_eq!(err.kind, ConfigErrorKind::Invariant);
}

#[test]
fn test_empty_group_is_invariant_error() {
    let err = compile_err(StreamConfig::new("s", FormatKind::Delimited).group(GroupConfig::new("g")));
    assert_eq!(err.kind, ConfigErrorKind::Invariant);
}

#[test]
fn test_identifier_requires_literal_or_regex() {
    let err = compile_err(delimited(
        RecordConfig::new("r").field(FieldConfig::new("kind").rid()),
    ));
    assert_eq!(err.kind, ConfigErrorKind::Invariant);
}

#[test]
fn test_invalid_regex() {
    let err = compile_err(delimited(
        RecordConfig::new("r").field(FieldConfig::new("kind").rid().regex("([a-z")),
    ));
    assert_eq!(err.kind, ConfigErrorKind::Invariant);
}

// ==================== Occurrences ====================

#[test]
fn test_min_exceeding_max() {
    let err = compile_err(delimited(
        RecordConfig::new("detail").occurs(3, 2).field(FieldConfig::new("x")),
    ));
    assert_eq!(err.kind, ConfigErrorKind::Occurs);
    assert!(err.to_string().contains("detail"), "{}", err);
}

#[test]
fn test_zero_max_occurs() {
    let err = compile_err(delimited(
        RecordConfig::new("r").max_occurs(0).field(FieldConfig::new("x")),
    ));
    assert_eq!(err.kind, ConfigErrorKind::Occurs);
}

// ==================== Ordering ====================

#[test]
fn test_partial_orders_rejected() {
    let err = compile_err(
        StreamConfig::new("s", FormatKind::Delimited)
            .record(RecordConfig::new("a").order(1).field(FieldConfig::new("x")))
            .record(RecordConfig::new("b").field(FieldConfig::new("x"))),
    );
    assert_eq!(err.kind, ConfigErrorKind::Ordering);
}

#[test]
fn test_decreasing_orders_rejected() {
    let err = compile_err(
        StreamConfig::new("s", FormatKind::Delimited)
            .record(RecordConfig::new("a").order(2).field(FieldConfig::new("x")))
            .record(RecordConfig::new("b").order(1).field(FieldConfig::new("x"))),
    );
    assert_eq!(err.kind, ConfigErrorKind::Ordering);
}

#[test]
fn test_equal_orders_allowed() {
    let stream = compile(
        StreamConfig::new("s", FormatKind::Delimited)
            .record(
                RecordConfig::new("a")
                    .order(1)
                    .type_name("A")
                    .field(FieldConfig::new("kind").rid().literal("A")),
            )
            .record(
                RecordConfig::new("b")
                    .order(1)
                    .type_name("B")
                    .field(FieldConfig::new("kind").rid().literal("B")),
            ),
    )
    .unwrap();
    let mut reader = stream.begin_read(records([["B"], ["A"]]));
    assert!(reader.read().unwrap().is_some());
    assert!(reader.read().unwrap().is_some());
    reader.close().unwrap();
}

// ==================== Collections ====================

#[test]
fn test_collection_requires_repetition() {
    let err = compile_err(delimited(
        RecordConfig::new("r")
            .type_name("R")
            .field(FieldConfig::new("x").collection("list").max_occurs(1)),
    ));
    assert_eq!(err.kind, ConfigErrorKind::Binding);
}

#[test]
fn test_collection_defaults_to_unbounded() {
    let stream = compile(delimited(
        RecordConfig::new("r")
            .type_name("R")
            .field(FieldConfig::new("x").collection("list")),
    ))
    .unwrap();
    let mut reader = stream.begin_read(records([["a", "b", "c"]]));
    let value = reader.read().unwrap().unwrap();
    assert_eq!(value.property("x").and_then(|v| v.as_list()).map(|l| l.len()), Some(3));
}

#[test]
fn test_repeating_bound_field_requires_collection() {
    let err = compile_err(delimited(
        RecordConfig::new("r")
            .type_name("R")
            .field(FieldConfig::new("items").unbounded()),
    ));
    assert_eq!(err.kind, ConfigErrorKind::Binding);
}

#[test]
fn test_unknown_collection_type() {
    let err = compile_err(delimited(
        RecordConfig::new("r")
            .type_name("R")
            .field(FieldConfig::new("items").unbounded().collection("bag")),
    ));
    assert_eq!(err.kind, ConfigErrorKind::Binding);
}

#[test]
fn test_map_segment_requires_key() {
    let err = compile_err(delimited(
        RecordConfig::new("r").type_name("R").segment(
            SegmentConfig::new("entries")
                .occurs(0, 3)
                .collection("map")
                .field(FieldConfig::new("k"))
                .field(FieldConfig::new("v")),
        ),
    ));
    assert_eq!(err.kind, ConfigErrorKind::Binding);
}

// ==================== Layout ====================

#[test]
fn test_fixed_length_field_requires_length() {
    let err = compile_err(
        StreamConfig::new("s", FormatKind::FixedLength)
            .record(RecordConfig::new("r").field(FieldConfig::new("x"))),
    );
    assert_eq!(err.kind, ConfigErrorKind::Layout);
}

#[test]
fn test_field_after_unbounded_needs_position() {
    let err = compile_err(delimited(
        RecordConfig::new("r")
            .type_name("R")
            .field(FieldConfig::new("items").unbounded().collection("list"))
            .field(FieldConfig::new("after")),
    ));
    assert_eq!(err.kind, ConfigErrorKind::Layout);

    // An explicit position lifts the restriction.
    assert!(compile(delimited(
        RecordConfig::new("r")
            .type_name("R")
            .field(FieldConfig::new("after").position(0))
            .field(FieldConfig::new("items").position(1).unbounded().collection("list")),
    ))
    .is_ok());
}

// ==================== Handlers and types ====================

#[test]
fn test_unknown_handler() {
    let err = compile_err(delimited(
        RecordConfig::new("r").field(FieldConfig::new("x").handler("roman")),
    ));
    assert_eq!(err.kind, ConfigErrorKind::TypeHandler);
}

#[test]
fn test_invalid_default_for_handler() {
    let err = compile_err(delimited(
        RecordConfig::new("r").field(FieldConfig::new("x").type_name("int").default_text("many")),
    ));
    assert_eq!(err.kind, ConfigErrorKind::TypeHandler);
}

#[test]
fn test_strict_types() {
    let options = CompileOptions::builder().strict_types(true).build();
    let err = compile_with_options(fixtures::orders(), &options).unwrap_err();
    assert_eq!(err.kind, ConfigErrorKind::Binding);

    let options = CompileOptions::builder()
        .strict_types(true)
        .register_type(DynamicType::open("Order"))
        .register_type(DynamicType::open("Customer"))
        .build();
    assert!(compile_with_options(fixtures::orders(), &options).is_ok());
}

#[test]
fn test_closed_type_rejects_unknown_property() {
    let options = CompileOptions::builder()
        .register_type(DynamicType::new("Person").property("name", ValueType::String))
        .build();
    let config = delimited(
        RecordConfig::new("person")
            .type_name("Person")
            .field(FieldConfig::new("name"))
            .field(FieldConfig::new("shoe_size")),
    );
    let err = compile_with_options(config, &options).unwrap_err();
    assert_eq!(err.kind, ConfigErrorKind::Binding);
    assert!(err.to_string().contains("shoe_size"), "{}", err);
}

#[test]
fn test_reflected_property_type_selects_handler() {
    let options = CompileOptions::builder()
        .register_type(
            DynamicType::new("Person")
                .property("name", ValueType::String)
                .property("age", ValueType::Int),
        )
        .build();
    let config = delimited(
        RecordConfig::new("person")
            .type_name("Person")
            .field(FieldConfig::new("name"))
            .field(FieldConfig::new("age")),
    );
    let stream = compile_with_options(config, &options).unwrap();
    let person = stream.begin_read(records([["Ann", "42"]])).read().unwrap().unwrap();
    assert_eq!(person.property("age"), Some(&Value::Int(42)));
}

// ==================== Constructors ====================

fn point_options() -> CompileOptions {
    CompileOptions::builder()
        .register_type(DynamicType::new("Point").constructor([("x", ValueType::Int), ("y", ValueType::Int)]))
        .build()
}

#[test]
fn test_constructor_arguments_bind() {
    let config = delimited(
        RecordConfig::new("point")
            .type_name("Point")
            .field(FieldConfig::new("x").constructor_arg(0))
            .field(FieldConfig::new("y").constructor_arg(1)),
    );
    let stream = compile_with_options(config, &point_options()).unwrap();
    let point = stream.begin_read(records([["3", "4"]])).read().unwrap().unwrap();
    assert_eq!(
        point,
        Value::from(Object::new("Point").with("x", 3i64).with("y", 4i64))
    );
}

#[test]
fn test_constructor_arguments_must_be_contiguous() {
    let config = delimited(
        RecordConfig::new("point")
            .type_name("Point")
            .field(FieldConfig::new("x").constructor_arg(0))
            .field(FieldConfig::new("y").constructor_arg(2)),
    );
    let err = compile_with_options(config, &point_options()).unwrap_err();
    assert_eq!(err.kind, ConfigErrorKind::Constructor);
}

#[test]
fn test_no_matching_constructor() {
    let config = delimited(
        RecordConfig::new("point")
            .type_name("Point")
            .field(FieldConfig::new("x").type_name("string").constructor_arg(0))
            .field(FieldConfig::new("y").constructor_arg(1)),
    );
    let err = compile_with_options(config, &point_options()).unwrap_err();
    assert_eq!(err.kind, ConfigErrorKind::Constructor);
}

// ==================== Limits ====================

#[test]
fn test_node_limit() {
    let options = CompileOptions::builder().max_nodes(3).build();
    let err = compile_with_options(fixtures::orders(), &options).unwrap_err();
    assert_eq!(err.kind, ConfigErrorKind::Limit);
}

#[test]
fn test_depth_limit() {
    let nested = StreamConfig::new("s", FormatKind::Delimited).group(
        GroupConfig::new("outer").group(
            GroupConfig::new("inner")
                .record(RecordConfig::new("r").field(FieldConfig::new("x"))),
        ),
    );
    let options = CompileOptions::builder().max_depth(2).build();
    let err = compile_with_options(nested.clone(), &options).unwrap_err();
    assert_eq!(err.kind, ConfigErrorKind::Limit);

    let options = CompileOptions::builder().unlimited().build();
    assert!(compile_with_options(nested, &options).is_ok());
}

#[test]
fn test_every_fixture_compiles() {
    for (name, fixture) in fixtures::all() {
        let stream = compile(fixture());
        assert!(stream.is_ok(), "fixture {} failed: {:?}", name, stream.err());
    }
}

// ==================== Serde ====================

#[cfg(feature = "serde")]
#[test]
fn test_config_serde_round_trip() {
    let config = fixtures::orders();
    let json = serde_json::to_string(&config).unwrap();
    let back: StreamConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(back, config);
    assert!(compile(back).is_ok());
}
