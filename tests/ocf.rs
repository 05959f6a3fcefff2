// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! Object container file round trips and corruption handling.

use avrolite::{Error, Reader, Schema, Writer, types::Value};
use pretty_assertions::assert_eq;

const MARKER: [u8; 16] = [9u8; 16];

const PERSON_SCHEMA: &str = r#"{
    "type": "record",
    "name": "person",
    "fields": [
        {"name": "id", "type": "int"},
        {"name": "name", "type": "string"}
    ]
}"#;

fn person(id: i32, name: &str) -> Value {
    Value::Record(vec![
        ("id".to_string(), Value::Int(id)),
        ("name".to_string(), Value::String(name.to_string())),
    ])
}

fn people(count: i32) -> Vec<Value> {
    (0..count).map(|i| person(i, &format!("name_{i}"))).collect()
}

fn write_file(schema_json: &str, values: &[Value], batch_size: usize) -> Vec<u8> {
    let mut writer = Writer::builder(Vec::new())
        .schema_json(schema_json)
        .batch_size(batch_size)
        .marker(MARKER)
        .build()
        .unwrap();
    writer.write_header().unwrap();
    for value in values {
        writer.append_value_ref(value).unwrap();
    }
    writer.into_inner().unwrap()
}

fn read_file(bytes: &[u8]) -> Vec<Value> {
    Reader::new(bytes)
        .unwrap()
        .map(Result::unwrap)
        .collect()
}

/// Byte offset just past the `n`-th occurrence of the sync marker. The
/// first occurrence terminates the header, each following one a block.
fn offset_after_marker(bytes: &[u8], n: usize) -> usize {
    let mut seen = 0;
    for i in 0..=bytes.len() - 16 {
        if bytes[i..i + 16] == MARKER {
            seen += 1;
            if seen == n {
                return i + 16;
            }
        }
    }
    panic!("marker occurs fewer than {n} times");
}

#[test]
fn test_round_trip_batch_of_two() {
    let values = people(3);
    let file = write_file(PERSON_SCHEMA, &values, 2);

    assert_eq!(read_file(&file), values);

    // three records at batch size two make two blocks
    let mut reader = Reader::new(&file[..]).unwrap();
    assert!(reader.next_batch().unwrap());
    assert!(reader.next_batch().unwrap());
    assert!(!reader.next_batch().unwrap());
}

#[test]
fn test_round_trip_is_batch_size_independent() {
    let values = people(7);
    for batch_size in [1, 2, 1000] {
        let file = write_file(PERSON_SCHEMA, &values, batch_size);
        assert_eq!(read_file(&file), values, "batch size {batch_size}");
    }
}

#[test]
fn test_round_trip_long_boundaries() {
    let values: Vec<Value> = [0i64, 1, -1, 64, -64, -65, i64::MAX, i64::MIN]
        .into_iter()
        .map(Value::Long)
        .collect();
    let file = write_file(r#""long""#, &values, 3);
    assert_eq!(read_file(&file), values);
}

#[test]
fn test_round_trip_nullable_union() {
    let values = vec![
        Value::Union(1, Box::new(Value::String("some".to_string()))),
        Value::Union(0, Box::new(Value::Null)),
        Value::Union(1, Box::new(Value::String("more".to_string()))),
    ];
    let file = write_file(r#"["null", "string"]"#, &values, 2);
    assert_eq!(read_file(&file), values);
}

#[test]
fn test_round_trip_empty_composites() {
    let schema = r#"{
        "type": "record",
        "name": "holder",
        "fields": [
            {"name": "xs", "type": {"type": "array", "items": "long"}},
            {"name": "kv", "type": {"type": "map", "values": "string"}},
            {"name": "tag", "type": "string"}
        ]
    }"#;
    let values = vec![Value::Record(vec![
        ("xs".to_string(), Value::Array(vec![])),
        ("kv".to_string(), Value::Map(Default::default())),
        ("tag".to_string(), Value::String(String::new())),
    ])];
    let file = write_file(schema, &values, 1000);
    assert_eq!(read_file(&file), values);
}

#[test]
fn test_corrupt_block_marker_fails_with_sync_mismatch() {
    let mut file = write_file(PERSON_SCHEMA, &people(3), 2);
    // flip a byte inside the first block's trailing marker
    let first_block_marker = offset_after_marker(&file, 2) - 16;
    file[first_block_marker] ^= 0xFF;

    let mut reader = Reader::new(&file[..]).unwrap();
    assert!(matches!(reader.next(), Some(Err(Error::GetBlockMarker))));
    assert!(reader.next().is_none());
}

#[test]
fn test_truncation_at_block_boundary_is_clean_eof() {
    let file = write_file(PERSON_SCHEMA, &people(3), 2);
    let truncated = &file[..offset_after_marker(&file, 2)];

    // only the first, intact block is delivered
    assert_eq!(read_file(truncated), people(2));
}

#[test]
fn test_truncation_mid_block_is_an_error() {
    let file = write_file(PERSON_SCHEMA, &people(3), 2);
    let cut = offset_after_marker(&file, 2) + 3;
    let mut reader = Reader::new(&file[..cut]).unwrap();

    assert_eq!(reader.next().unwrap().unwrap(), person(0, "name_0"));
    assert_eq!(reader.next().unwrap().unwrap(), person(1, "name_1"));
    assert!(reader.next().unwrap().is_err());
    assert!(reader.next().is_none());
}

#[test]
fn test_unflushed_trailing_block_is_not_visible() {
    let mut writer = Writer::builder(Vec::new())
        .schema_json(PERSON_SCHEMA)
        .batch_size(2)
        .marker(MARKER)
        .build()
        .unwrap();
    writer.write_header().unwrap();
    for value in people(3) {
        writer.append_value_ref(&value).unwrap();
    }
    // the third record sits in the writer's buffer; a reader over the bytes
    // written so far stops cleanly after the full block
    let file = writer.get_ref().clone();
    assert_eq!(read_file(&file), people(2));

    // closing delivers it
    writer.close().unwrap();
    let file = writer.get_ref().clone();
    assert_eq!(read_file(&file), people(3));
}

#[test]
fn test_schema_travels_with_the_file() {
    let file = write_file(PERSON_SCHEMA, &people(1), 1000);
    let reader = Reader::new(&file[..]).unwrap();
    assert_eq!(reader.schema(), &Schema::parse_str(PERSON_SCHEMA).unwrap());
}

#[test]
fn test_writer_from_parsed_schema() {
    let schema = Schema::parse_str(PERSON_SCHEMA).unwrap();
    let mut writer = Writer::with_schema(Vec::new(), &schema).unwrap();
    writer.write_header().unwrap();
    writer.append_value_ref(&person(5, "five")).unwrap();
    let file = writer.into_inner().unwrap();

    let reader = Reader::new(&file[..]).unwrap();
    assert_eq!(reader.schema(), &schema);
    assert_eq!(
        reader.map(Result::unwrap).collect::<Vec<_>>(),
        vec![person(5, "five")]
    );
}
