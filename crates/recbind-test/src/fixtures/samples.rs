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

//! Input rows and bound objects matching the schema fixtures.

use recbind_core::{Object, Value};

/// Two batches for [`batch_group`](super::batch_group) or
/// [`flat_batch`](super::flat_batch): `b1` with two details, `b2` with none.
pub fn batch_rows() -> Vec<Vec<&'static str>> {
    vec![
        vec!["H", "b1"],
        vec!["D", "10"],
        vec!["D", "20"],
        vec!["T", "2"],
        vec!["H", "b2"],
        vec!["T", "0"],
    ]
}

/// One batch for the flat layout: header, three details and a trailer.
pub fn flat_batch_rows() -> Vec<Vec<&'static str>> {
    vec![
        vec!["H", "b1"],
        vec!["D", "1"],
        vec!["D", "2"],
        vec!["D", "3"],
        vec!["T", "3"],
    ]
}

/// A `Header` object as bound by the batch schemas.
pub fn header_object(id: &str) -> Value {
    Object::new("Header").with("kind", "H").with("id", id).into()
}

/// A `Detail` object as bound by the batch schemas.
pub fn detail_object(amount: i64) -> Value {
    Object::new("Detail").with("kind", "D").with("amount", amount).into()
}

/// A `Batch` object as bound by [`batch_group`](super::batch_group).
pub fn batch_object(id: &str, amounts: &[i64]) -> Value {
    let mut batch = Object::new("Batch").with("header", header_object(id));
    if !amounts.is_empty() {
        batch.set(
            "detail",
            Value::List(amounts.iter().map(|&a| detail_object(a)).collect()),
        );
    }
    batch.into()
}

/// A fixed-length person line.
pub fn person_line(name: &str, age: u32) -> String {
    format!("P{:<10}{:03}", name, age)
}

/// A `Person` object as bound by
/// [`fixed_length_people`](super::fixed_length_people).
pub fn person_object(name: &str, age: i64) -> Value {
    Object::new("Person")
        .with("kind", "P")
        .with("name", name)
        .with("age", age)
        .into()
}

/// An `Order` object as bound by [`orders`](super::orders).
pub fn order_object(id: i64, customer: (&str, &str), items: &[&str]) -> Value {
    let mut order = Object::new("Order")
        .with("kind", "O")
        .with("id", id)
        .with(
            "customer",
            Object::new("Customer")
                .with("name", customer.0)
                .with("city", customer.1),
        )
        .with("source", "batch");
    if !items.is_empty() {
        order.set(
            "items",
            Value::List(items.iter().map(|&i| Value::from(i)).collect()),
        );
    }
    order.into()
}
