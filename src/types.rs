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

//! Logic handling the intermediate representation of Avro values.

use crate::schema::{RecordSchema, Schema};
use std::collections::{BTreeMap, HashMap};
use strum_macros::EnumDiscriminants;

/// Represents any valid Avro value.
///
/// A `Value` is what the decoder produces and what the encoder consumes;
/// it carries no schema of its own. The schema drives both directions.
#[derive(Clone, Debug, PartialEq, EnumDiscriminants)]
#[strum_discriminants(name(ValueKind), derive(strum_macros::Display))]
pub enum Value {
    /// A `null` Avro value.
    Null,
    /// A `boolean` Avro value.
    Boolean(bool),
    /// An `int` Avro value.
    Int(i32),
    /// A `long` Avro value.
    Long(i64),
    /// A `float` Avro value.
    Float(f32),
    /// A `double` Avro value.
    Double(f64),
    /// A `bytes` Avro value.
    Bytes(Vec<u8>),
    /// A `string` Avro value.
    String(String),
    /// A `fixed` Avro value, carrying the declared size and the raw bytes.
    Fixed(usize, Vec<u8>),
    /// An `array` Avro value, a homogeneously typed sequence.
    Array(Vec<Value>),
    /// A `map` Avro value. Entry order is not preserved.
    Map(HashMap<String, Value>),
    /// A `record` Avro value, its values paired with the declared field
    /// names in schema field order.
    Record(Vec<(String, Value)>),
    /// A `union` Avro value: the zero-based index of the chosen variant
    /// within its union schema, and the value itself.
    Union(u32, Box<Value>),
}

impl From<()> for Value {
    fn from((): ()) -> Self {
        Self::Null
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Int(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Long(value)
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Self::Float(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Double(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(value)
    }
}

impl From<&[u8]> for Value {
    fn from(value: &[u8]) -> Self {
        Self::Bytes(value.to_owned())
    }
}

/// Builds a union value for the conventional `["null", T]` schema:
/// `None` selects variant 0 (`null`), `Some` selects variant 1.
impl<T> From<Option<T>> for Value
where
    T: Into<Value>,
{
    fn from(value: Option<T>) -> Self {
        match value {
            None => Self::Union(0, Box::new(Self::Null)),
            Some(v) => Self::Union(1, Box::new(v.into())),
        }
    }
}

impl<K, V> From<HashMap<K, V>> for Value
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from(value: HashMap<K, V>) -> Self {
        Self::Map(
            value
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }
}

/// Utility interface to build `Value::Record` objects.
#[derive(Debug, Clone)]
pub struct Record<'a> {
    /// List of fields contained in the record.
    /// Ordered according to the fields in the schema given to create this
    /// `Record` object. Any unset field defaults to `Value::Null`.
    pub fields: Vec<(String, Value)>,
    schema_lookup: &'a BTreeMap<String, usize>,
}

impl<'a> Record<'a> {
    /// Create a `Record` given a `Schema`.
    ///
    /// If the `Schema` is not a `Schema::Record` variant, `None` will be returned.
    pub fn new(schema: &Schema) -> Option<Record<'_>> {
        match *schema {
            Schema::Record(RecordSchema {
                ref fields,
                ref lookup,
                ..
            }) => {
                let mut record_fields = Vec::with_capacity(fields.len());
                for field in fields {
                    record_fields.push((field.name.clone(), Value::Null));
                }
                Some(Record {
                    fields: record_fields,
                    schema_lookup: lookup,
                })
            }
            _ => None,
        }
    }

    /// Put a compatible value in the `Record` for a given `field` name.
    ///
    /// **NOTE** Only ensure that the field name is present in the `Schema`
    /// given when creating this `Record`. Does not perform any schema
    /// validation; the value is checked against the schema when encoded.
    pub fn put<V>(&mut self, field: &str, value: V)
    where
        V: Into<Value>,
    {
        if let Some(&position) = self.schema_lookup.get(field) {
            self.fields[position].1 = value.into()
        }
    }
}

impl<'a> From<Record<'a>> for Value {
    fn from(value: Record<'a>) -> Self {
        Self::Record(value.fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_record_new_keeps_field_order() {
        let schema = Schema::parse_str(
            r#"{
                "type": "record",
                "name": "test",
                "fields": [
                    {"name": "a", "type": "long"},
                    {"name": "b", "type": "string"}
                ]
            }"#,
        )
        .unwrap();

        let mut record = Record::new(&schema).unwrap();
        record.put("b", "foo");
        record.put("a", 27i64);
        record.put("no_such_field", 3i64);

        assert_eq!(
            Value::from(record),
            Value::Record(vec![
                ("a".to_string(), Value::Long(27)),
                ("b".to_string(), Value::String("foo".to_string())),
            ])
        );
    }

    #[test]
    fn test_record_new_rejects_non_record_schema() {
        assert!(Record::new(&Schema::Long).is_none());
    }

    #[test]
    fn test_from_option() {
        assert_eq!(
            Value::from(None::<i64>),
            Value::Union(0, Box::new(Value::Null))
        );
        assert_eq!(
            Value::from(Some(3i64)),
            Value::Union(1, Box::new(Value::Long(3)))
        );
    }
}
