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
    types::Value,
    util::{read_long, safe_len, zag_i32, zag_i64},
};
use log::warn;
use std::collections::HashMap;
use std::io::Read;

/// Decode a `Value` from Avro binary format, driven by `schema`.
///
/// The schema must be the one the data was written with; this crate performs
/// no schema resolution.
pub fn decode<R: Read>(schema: &Schema, reader: &mut R) -> AvroResult<Value> {
    let names = resolve_names(schema)?;
    decode_internal(schema, &names, reader)
}

fn decode_bytes<R: Read>(reader: &mut R) -> AvroResult<Vec<u8>> {
    let len = read_long(reader)?;
    let len = safe_len(usize::try_from(len).map_err(|e| Error::ConvertI64ToUsize(e, len))?)?;
    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf).map_err(Error::ReadBytes)?;
    Ok(buf)
}

fn decode_string<R: Read>(reader: &mut R) -> AvroResult<String> {
    String::from_utf8(decode_bytes(reader)?).map_err(Error::ConvertToUtf8)
}

/// Read the item count opening an array or map block.
///
/// Accepts both count forms: a negative count is the Avro long form, where
/// the block's size in bytes follows. The size only matters to readers that
/// skip blocks, so it is read and discarded here.
fn decode_blocks_len<R: Read>(reader: &mut R) -> AvroResult<usize> {
    let raw = read_long(reader)?;
    let len = if raw < 0 {
        let _block_bytes = read_long(reader)?;
        raw.checked_neg().ok_or(Error::IntegerOverflow)?
    } else {
        raw
    };
    safe_len(usize::try_from(len).map_err(|e| Error::ConvertI64ToUsize(e, len))?)
}

/// Consume the zero count closing an array or map.
///
/// The leading item count is written even for an empty collection, so a
/// zero leading count is still followed by this terminator.
fn expect_block_terminator<R: Read>(reader: &mut R) -> AvroResult<()> {
    match read_long(reader)? {
        0 => Ok(()),
        other => Err(Error::GetBlockTerminator(other)),
    }
}

pub(crate) fn decode_internal<R: Read>(
    schema: &Schema,
    names: &Names,
    reader: &mut R,
) -> AvroResult<Value> {
    match schema {
        Schema::Ref { name } => {
            let resolved = names
                .get(name)
                .ok_or_else(|| Error::SchemaResolutionError(name.clone()))?;
            decode_internal(resolved, names, reader)
        }
        Schema::Null => Ok(Value::Null),
        Schema::Boolean => {
            let mut buf = [0u8; 1];
            reader.read_exact(&mut buf[..]).map_err(Error::ReadBoolean)?;
            match buf[0] {
                0u8 => Ok(Value::Boolean(false)),
                1u8 => Ok(Value::Boolean(true)),
                other => Err(Error::BoolValue(other)),
            }
        }
        Schema::Int => zag_i32(reader).map(Value::Int),
        Schema::Long => zag_i64(reader).map(Value::Long),
        Schema::Float => {
            let mut buf = [0u8; std::mem::size_of::<f32>()];
            reader.read_exact(&mut buf[..]).map_err(Error::ReadFloat)?;
            Ok(Value::Float(f32::from_le_bytes(buf)))
        }
        Schema::Double => {
            let mut buf = [0u8; std::mem::size_of::<f64>()];
            reader.read_exact(&mut buf[..]).map_err(Error::ReadDouble)?;
            Ok(Value::Double(f64::from_le_bytes(buf)))
        }
        Schema::Bytes => decode_bytes(reader).map(Value::Bytes),
        Schema::String => decode_string(reader).map(Value::String),
        Schema::Fixed(inner) => {
            let mut buf = vec![0u8; safe_len(inner.size)?];
            reader
                .read_exact(&mut buf)
                .map_err(|e| Error::ReadFixed(e, inner.size))?;
            Ok(Value::Fixed(inner.size, buf))
        }
        Schema::Array(inner) => {
            let mut items = Vec::new();
            let mut len = decode_blocks_len(reader)?;
            if len == 0 {
                expect_block_terminator(reader)?;
            }
            while len != 0 {
                items.reserve(len);
                for _ in 0..len {
                    items.push(decode_internal(&inner.items, names, reader)?);
                }
                len = decode_blocks_len(reader)?;
            }
            Ok(Value::Array(items))
        }
        Schema::Map(inner) => {
            let mut items = HashMap::new();
            let mut len = decode_blocks_len(reader)?;
            if len == 0 {
                expect_block_terminator(reader)?;
            }
            while len != 0 {
                items.reserve(len);
                for _ in 0..len {
                    let key = decode_string(reader)?;
                    let value = decode_internal(&inner.values, names, reader)?;
                    if items.insert(key.clone(), value).is_some() {
                        warn!("Duplicate key {key:?} in map, keeping the last value");
                    }
                }
                len = decode_blocks_len(reader)?;
            }
            Ok(Value::Map(items))
        }
        Schema::Union(inner) => {
            let index = read_long(reader)?;
            let variants = inner.variants();
            let variant = usize::try_from(index)
                .ok()
                .and_then(|i| variants.get(i))
                .ok_or(Error::GetUnionVariant {
                    index,
                    num_variants: variants.len(),
                })?;
            let value = decode_internal(variant, names, reader)?;
            Ok(Value::Union(index as u32, Box::new(value)))
        }
        Schema::Record(inner) => {
            let mut fields = Vec::with_capacity(inner.fields.len());
            for field in &inner.fields {
                let value = decode_internal(&field.schema, names, reader)?;
                fields.push((field.name.clone(), value));
            }
            Ok(Value::Record(fields))
        }
    }
}
