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

//! Stream configurations shared across test suites.

use recbind_core::{
    ConstantConfig, FieldConfig, FormatKind, GroupConfig, Justify, RecordConfig, SegmentConfig,
    StreamConfig,
};

/// Identifying field holding a one-letter record kind.
pub fn kind(literal: &str) -> FieldConfig {
    FieldConfig::new("kind").rid().literal(literal)
}

fn header() -> RecordConfig {
    RecordConfig::new("header")
        .type_name("Header")
        .field(kind("H"))
        .field(FieldConfig::new("id").required())
}

fn detail() -> RecordConfig {
    RecordConfig::new("detail")
        .type_name("Detail")
        .min_occurs(0)
        .unbounded()
        .collection("list")
        .field(kind("D"))
        .field(FieldConfig::new("amount").type_name("int"))
}

fn trailer() -> RecordConfig {
    RecordConfig::new("trailer")
        .field(kind("T"))
        .field(FieldConfig::new("count").type_name("int"))
}

/// Header, details and trailer directly under the stream.
///
/// Rows: `H,<id>` then any number of `D,<amount>` then `T,<count>`. Only
/// header and details are bound; each is read as its own value.
pub fn flat_batch() -> StreamConfig {
    StreamConfig::new("flat_batch", FormatKind::Delimited)
        .record(header())
        .record(
            RecordConfig::new("detail")
                .type_name("Detail")
                .min_occurs(0)
                .unbounded()
                .field(kind("D"))
                .field(FieldConfig::new("amount").type_name("int")),
        )
        .record(trailer())
}

/// A repeating `Batch` group read as one value per batch.
///
/// The batch object holds a `header` object and a `detail` list. The
/// trailer is validated but not bound.
pub fn batch_group() -> StreamConfig {
    StreamConfig::new("batches", FormatKind::Delimited).group(
        GroupConfig::new("batch")
            .type_name("Batch")
            .unbounded()
            .record(header())
            .record(detail())
            .record(trailer()),
    )
}

/// Exactly one untyped group of two or three `D` records.
pub fn occurrence_group() -> StreamConfig {
    StreamConfig::new("occurrences", FormatKind::Delimited).group(
        GroupConfig::new("g").occurs(1, 1).record(
            RecordConfig::new("d")
                .type_name("D")
                .occurs(2, 3)
                .field(kind("D"))
                .field(FieldConfig::new("value")),
        ),
    )
}

fn pair(ordered: bool) -> StreamConfig {
    let name = if ordered { "ordered_pair" } else { "unordered_pair" };
    StreamConfig::new(name, FormatKind::Delimited)
        .ordered(ordered)
        .record(
            RecordConfig::new("a")
                .type_name("A")
                .field(kind("A"))
                .field(FieldConfig::new("value")),
        )
        .record(
            RecordConfig::new("b")
                .type_name("B")
                .field(kind("B"))
                .field(FieldConfig::new("value")),
        )
}

/// Records `a` then `b`, each exactly once, in declared order.
pub fn ordered_pair() -> StreamConfig {
    pair(true)
}

/// Records `a` and `b`, each exactly once, in any order.
pub fn unordered_pair() -> StreamConfig {
    pair(false)
}

/// Fixed-length person records: `P`, a 10-character name and a
/// zero-padded 3-digit age.
pub fn fixed_length_people() -> StreamConfig {
    StreamConfig::new("people", FormatKind::FixedLength).record(
        RecordConfig::new("person")
            .type_name("Person")
            .min_occurs(0)
            .unbounded()
            .field(kind("P").length(1))
            .field(FieldConfig::new("name").length(10))
            .field(
                FieldConfig::new("age")
                    .length(3)
                    .type_name("int")
                    .justify(Justify::Right)
                    .padding('0'),
            ),
    )
}

/// Orders with a nested customer segment, a source constant and a
/// trailing list of items.
pub fn orders() -> StreamConfig {
    StreamConfig::new("orders", FormatKind::Delimited).record(
        RecordConfig::new("order")
            .type_name("Order")
            .min_occurs(0)
            .unbounded()
            .field(kind("O"))
            .field(FieldConfig::new("id").type_name("int"))
            .segment(
                SegmentConfig::new("customer")
                    .type_name("Customer")
                    .field(FieldConfig::new("name"))
                    .field(FieldConfig::new("city")),
            )
            .constant(ConstantConfig::new("source", "batch"))
            .field(FieldConfig::new("items").min_occurs(0).unbounded().collection("list")),
    )
}
