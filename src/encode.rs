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

use crate::{
    AvroResult,
    error::Error,
    schema::{Names, Schema, resolve_names},
    types::{Value, ValueKind},
    util::{zig_i32, zig_i64},
};
use std::collections::HashMap;
use std::io::Write;

/// Encode a `Value` into Avro binary format, driven by `schema`.
///
/// The value's runtime tags are checked against the schema as encoding
/// proceeds; a mismatch anywhere in the tree fails the whole call.
/// Returns the number of bytes written.
pub fn encode<W: Write>(value: &Value, schema: &Schema, writer: &mut W) -> AvroResult<usize> {
    let names = resolve_names(schema)?;
    encode_internal(value, schema, &names, writer)
}

pub(crate) fn encode_bytes<B: AsRef<[u8]> + ?Sized, W: Write>(
    s: &B,
    mut writer: W,
) -> AvroResult<usize> {
    let bytes = s.as_ref();
    let mut n = encode_long(bytes.len() as i64, &mut writer)?;
    n += writer.write(bytes).map_err(Error::WriteBytes)?;
    Ok(n)
}

pub(crate) fn encode_long<W: Write>(i: i64, writer: W) -> AvroResult<usize> {
    zig_i64(i, writer)
}

pub(crate) fn encode_int<W: Write>(i: i32, writer: W) -> AvroResult<usize> {
    zig_i32(i, writer)
}

fn type_mismatch(value: &Value, schema: &Schema) -> Error {
    Error::EncodeValueAsSchema {
        expected: schema.schema_name(),
        actual: ValueKind::from(value),
    }
}

pub(crate) fn encode_internal<W: Write>(
    value: &Value,
    schema: &Schema,
    names: &Names,
    writer: &mut W,
) -> AvroResult<usize> {
    if let Schema::Ref { name } = schema {
        let resolved = names
            .get(name)
            .ok_or_else(|| Error::SchemaResolutionError(name.clone()))?;
        return encode_internal(value, resolved, names, writer);
    }

    if let Schema::Union(inner) = schema {
        return match value {
            // A pre-discriminated value keeps its index; it only has to be
            // in range, the variant encoding checks the tag.
            Value::Union(i, item) => {
                let variant =
                    inner
                        .variants()
                        .get(*i as usize)
                        .ok_or(Error::GetUnionVariant {
                            index: *i as i64,
                            num_variants: inner.variants().len(),
                        })?;
                let mut n = encode_long(*i as i64, &mut *writer)?;
                n += encode_internal(item, variant, names, writer)?;
                Ok(n)
            }
            // Any other value selects the first variant matching its tag.
            other => {
                let (index, variant) = inner
                    .find_schema(other, names)
                    .ok_or_else(|| Error::FindUnionVariant(ValueKind::from(other)))?;
                let mut n = encode_long(index as i64, &mut *writer)?;
                n += encode_internal(other, variant, names, writer)?;
                Ok(n)
            }
        };
    }

    match value {
        Value::Null => match schema {
            Schema::Null => Ok(0),
            _ => Err(type_mismatch(value, schema)),
        },
        Value::Boolean(b) => match schema {
            Schema::Boolean => writer.write(&[u8::from(*b)]).map_err(Error::WriteBytes),
            _ => Err(type_mismatch(value, schema)),
        },
        Value::Int(i) => match schema {
            Schema::Int => encode_int(*i, writer),
            _ => Err(type_mismatch(value, schema)),
        },
        Value::Long(i) => match schema {
            Schema::Long => encode_long(*i, writer),
            _ => Err(type_mismatch(value, schema)),
        },
        Value::Float(x) => match schema {
            Schema::Float => writer.write(&x.to_le_bytes()).map_err(Error::WriteBytes),
            _ => Err(type_mismatch(value, schema)),
        },
        Value::Double(x) => match schema {
            Schema::Double => writer.write(&x.to_le_bytes()).map_err(Error::WriteBytes),
            _ => Err(type_mismatch(value, schema)),
        },
        Value::Bytes(bytes) => match schema {
            Schema::Bytes => encode_bytes(bytes, writer),
            Schema::Fixed(inner) => {
                if bytes.len() != inner.size {
                    return Err(Error::CompareFixedSizes {
                        size: inner.size,
                        n: bytes.len(),
                    });
                }
                writer.write(bytes.as_slice()).map_err(Error::WriteBytes)
            }
            _ => Err(type_mismatch(value, schema)),
        },
        Value::String(s) => match schema {
            Schema::String => encode_bytes(s, writer),
            _ => Err(type_mismatch(value, schema)),
        },
        Value::Fixed(n, bytes) => match schema {
            Schema::Fixed(inner) => {
                if *n != inner.size || bytes.len() != inner.size {
                    return Err(Error::CompareFixedSizes {
                        size: inner.size,
                        n: bytes.len(),
                    });
                }
                writer.write(bytes.as_slice()).map_err(Error::WriteBytes)
            }
            _ => Err(type_mismatch(value, schema)),
        },
        Value::Array(items) => match schema {
            Schema::Array(inner) => {
                // The item count leads even when zero, so an empty array is
                // the count followed by the terminator.
                let mut n = encode_long(items.len() as i64, &mut *writer)?;
                for item in items.iter() {
                    n += encode_internal(item, &inner.items, names, writer)?;
                }
                n += writer.write(&[0u8]).map_err(Error::WriteBytes)?;
                Ok(n)
            }
            _ => Err(type_mismatch(value, schema)),
        },
        Value::Map(items) => match schema {
            Schema::Map(inner) => {
                let mut n = encode_long(items.len() as i64, &mut *writer)?;
                for (key, item) in items {
                    n += encode_bytes(key, &mut *writer)?;
                    n += encode_internal(item, &inner.values, names, writer)?;
                }
                n += writer.write(&[0u8]).map_err(Error::WriteBytes)?;
                Ok(n)
            }
            _ => Err(type_mismatch(value, schema)),
        },
        Value::Record(value_fields) => match schema {
            Schema::Record(inner) => {
                if value_fields.len() != inner.fields.len() {
                    return Err(Error::RecordFieldCount {
                        expected: inner.fields.len(),
                        actual: value_fields.len(),
                    });
                }

                let mut lookup = HashMap::with_capacity(value_fields.len());
                for (name, field_value) in value_fields {
                    lookup.insert(name.as_str(), field_value);
                }

                let mut n = 0;
                for schema_field in &inner.fields {
                    let field_value = lookup
                        .get(schema_field.name.as_str())
                        .ok_or_else(|| Error::GetField(schema_field.name.clone()))?;
                    n += encode_internal(field_value, &schema_field.schema, names, writer)?;
                }
                Ok(n)
            }
            _ => Err(type_mismatch(value, schema)),
        },
        Value::Union(_, _) => Err(type_mismatch(value, schema)),
    }
}

/// Encode a `Value` to a fresh byte buffer.
pub(crate) fn encode_to_vec(value: &Value, schema: &Schema) -> AvroResult<Vec<u8>> {
    let mut buffer = Vec::new();
    encode(value, schema, &mut buffer)?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Record;
    use pretty_assertions::assert_eq;

    fn encoded(value: &Value, schema: &Schema) -> Vec<u8> {
        encode_to_vec(value, schema).unwrap()
    }

    #[test]
    fn test_encode_long() {
        assert_eq!(encoded(&Value::Long(0), &Schema::Long), [0x00]);
        assert_eq!(encoded(&Value::Long(64), &Schema::Long), [0x80, 0x01]);
        assert_eq!(encoded(&Value::Long(-65), &Schema::Long), [0x81, 0x01]);
    }

    #[test]
    fn test_encode_string() {
        assert_eq!(
            encoded(&Value::String("end".to_string()), &Schema::String),
            [0x06, 0x65, 0x6E, 0x64]
        );
        assert_eq!(encoded(&Value::String(String::new()), &Schema::String), [0x00]);
    }

    #[test]
    fn test_encode_array_of_longs() {
        let schema = Schema::parse_str(r#"{"type": "array", "items": "long"}"#).unwrap();
        assert_eq!(encoded(&Value::Array(vec![]), &schema), [0x00, 0x00]);
        assert_eq!(
            encoded(
                &Value::Array(vec![Value::Long(1), Value::Long(-2)]),
                &schema
            ),
            [0x04, 0x02, 0x03, 0x00]
        );
    }

    #[test]
    fn test_encode_record() {
        let schema = Schema::parse_str(
            r#"{
                "type": "record",
                "name": "test",
                "fields": [
                    {"name": "a", "type": "long"},
                    {"name": "b", "type": "long"}
                ]
            }"#,
        )
        .unwrap();
        let mut record = Record::new(&schema).unwrap();
        record.put("a", 1i64);
        record.put("b", -5i64);
        assert_eq!(encoded(&record.into(), &schema), [0x02, 0x09]);
    }

    #[test]
    fn test_encode_nested_record() {
        let schema = Schema::parse_str(
            r#"{
                "type": "record",
                "name": "outer",
                "fields": [
                    {"name": "name", "type": "string"},
                    {
                        "name": "rec",
                        "type": {
                            "type": "record",
                            "name": "inner",
                            "fields": [
                                {"name": "b", "type": "boolean"},
                                {"name": "l", "type": "long"}
                            ]
                        }
                    }
                ]
            }"#,
        )
        .unwrap();
        let value = Value::Record(vec![
            ("name".to_string(), Value::String("two".to_string())),
            (
                "rec".to_string(),
                Value::Record(vec![
                    ("b".to_string(), Value::Boolean(false)),
                    ("l".to_string(), Value::Long(11)),
                ]),
            ),
        ]);
        assert_eq!(encoded(&value, &schema), [0x06, 0x74, 0x77, 0x6F, 0x00, 0x16]);
    }

    #[test]
    fn test_encode_union_wraps_bare_value() {
        let schema = Schema::parse_str(r#"["null", "long"]"#).unwrap();
        assert_eq!(encoded(&Value::Null, &schema), [0x00]);
        assert_eq!(encoded(&Value::Long(1), &schema), [0x02, 0x02]);
        assert_eq!(
            encoded(&Value::Union(1, Box::new(Value::Long(1))), &schema),
            [0x02, 0x02]
        );
    }

    #[test]
    fn test_encode_union_no_match() {
        let schema = Schema::parse_str(r#"["null", "long"]"#).unwrap();
        assert!(matches!(
            encode_to_vec(&Value::Boolean(true), &schema),
            Err(Error::FindUnionVariant(ValueKind::Boolean))
        ));
    }

    #[test]
    fn test_encode_union_index_out_of_range() {
        let schema = Schema::parse_str(r#"["null", "long"]"#).unwrap();
        assert!(matches!(
            encode_to_vec(&Value::Union(2, Box::new(Value::Long(1))), &schema),
            Err(Error::GetUnionVariant {
                index: 2,
                num_variants: 2
            })
        ));
    }

    #[test]
    fn test_encode_type_mismatch() {
        assert!(matches!(
            encode_to_vec(&Value::String("1".to_string()), &Schema::Long),
            Err(Error::EncodeValueAsSchema { expected, actual: ValueKind::String })
                if expected == "long"
        ));
    }

    #[test]
    fn test_encode_fixed_size_mismatch() {
        let schema = Schema::parse_str(r#"{"type": "fixed", "name": "four", "size": 4}"#).unwrap();
        assert_eq!(
            encoded(&Value::Fixed(4, vec![1, 2, 3, 4]), &schema),
            [1, 2, 3, 4]
        );
        assert_eq!(encoded(&Value::Bytes(vec![1, 2, 3, 4]), &schema), [1, 2, 3, 4]);
        assert!(matches!(
            encode_to_vec(&Value::Bytes(vec![1, 2, 3]), &schema),
            Err(Error::CompareFixedSizes { size: 4, n: 3 })
        ));
    }

    #[test]
    fn test_encode_zero_size_fixed() {
        let schema = Schema::parse_str(r#"{"type": "fixed", "name": "nil", "size": 0}"#).unwrap();
        assert_eq!(encoded(&Value::Fixed(0, vec![]), &schema), [0u8; 0]);
    }

    #[test]
    fn test_encode_record_arity_mismatch() {
        let schema = Schema::parse_str(
            r#"{
                "type": "record",
                "name": "test",
                "fields": [
                    {"name": "a", "type": "long"},
                    {"name": "b", "type": "long"}
                ]
            }"#,
        )
        .unwrap();
        let value = Value::Record(vec![("a".to_string(), Value::Long(1))]);
        assert!(matches!(
            encode_to_vec(&value, &schema),
            Err(Error::RecordFieldCount {
                expected: 2,
                actual: 1
            })
        ));
    }

    #[test]
    fn test_encode_empty_map() {
        let schema = Schema::parse_str(r#"{"type": "map", "values": "long"}"#).unwrap();
        assert_eq!(
            encoded(&Value::Map(Default::default()), &schema),
            [0x00, 0x00]
        );
    }
}
