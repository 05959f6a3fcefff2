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

//! Errors returned by schema parsing, the binary codec and the container
//! file reader/writer.

use crate::types::ValueKind;

/// Errors encountered while working with Avro data.
///
/// Every failure in the crate surfaces as one of these variants; there is no
/// local recovery inside the codec. Reaching the end of a container file is
/// *not* an error, see [`Reader::next_batch`](crate::Reader::next_batch).
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// A value was encoded with a schema that does not describe it.
    #[error("Expect {expected}, found value of type {actual}")]
    EncodeValueAsSchema {
        /// Name of the schema the encoder was driven by.
        expected: String,
        /// Kind of the value that was supplied.
        actual: ValueKind,
    },

    #[error("Record field count mismatch, expected: {expected}, got: {actual}")]
    RecordFieldCount { expected: usize, actual: usize },

    #[error("Missing field in record: {0:?}")]
    GetField(String),

    #[error("Fixed size mismatch, expected: {size}, got: {n}")]
    CompareFixedSizes { size: usize, n: usize },

    #[error("Could not find a union variant for value of type {0}")]
    FindUnionVariant(ValueKind),

    #[error("Union index {index} out of bounds: {num_variants}")]
    GetUnionVariant { index: i64, num_variants: usize },

    #[error("Invalid u8 for bool: {0}")]
    BoolValue(u8),

    #[error("Invalid utf-8 string")]
    ConvertToUtf8(#[source] std::string::FromUtf8Error),

    #[error("Invalid utf-8 string")]
    ConvertToUtf8Error(#[source] std::str::Utf8Error),

    #[error("Overflow when decoding integer value")]
    IntegerOverflow,

    #[error("Int value does not fit in 32 bits: {1}")]
    ZagI32(#[source] std::num::TryFromIntError, i64),

    #[error("Cannot convert i64 to usize: {1}")]
    ConvertI64ToUsize(#[source] std::num::TryFromIntError, i64),

    #[error("Unable to allocate {desired} bytes (maximum allowed: {maximum})")]
    MemoryAllocation { desired: usize, maximum: usize },

    #[error("Failed to parse schema from JSON")]
    ParseSchemaJson(#[source] serde_json::Error),

    #[error("Must be a JSON string, object or array")]
    ParseSchemaFromValidJson,

    #[error("Unknown primitive type: {0}")]
    ParsePrimitive(String),

    #[error("No `name` field")]
    GetNameField,

    #[error("No `name` in record field")]
    GetNameFieldFromRecord,

    #[error("No `type` in record field")]
    GetRecordFieldTypeField,

    #[error("No `fields` in record")]
    GetRecordFieldsJson,

    #[error("No `type` in complex type")]
    GetComplexTypeField,

    #[error("No `items` in array")]
    GetArrayItemsField,

    #[error("No `values` in map")]
    GetMapValuesField,

    #[error("No `size` in fixed")]
    GetFixedSizeField,

    #[error("Unions may not directly contain a union")]
    GetNestedUnion,

    #[error("Unions cannot contain duplicate types")]
    GetUnionDuplicate,

    #[error("Two schemas with the same name were given: {0:?}")]
    NameCollision(String),

    #[error("Failed to resolve schema reference: {0}")]
    SchemaResolutionError(String),

    #[error("Failed to convert JSON to string: {0}")]
    ConvertJsonToString(#[source] serde_json::Error),

    #[error("Failed to read header: {0}")]
    ReadHeader(#[source] std::io::Error),

    #[error("Wrong header magic")]
    HeaderMagic,

    #[error("Failed to get JSON from avro.schema key in map")]
    GetAvroSchemaFromMap,

    #[error("Failed to get metadata from the header")]
    GetHeaderMetadata,

    #[error("Codec '{0}' is not supported")]
    CodecNotSupported(String),

    #[error("avro.codec value is not valid")]
    BadCodecMetadata,

    #[error("Invalid metadata key: {0}")]
    InvalidMetadataKey(String),

    #[error("File header is already written")]
    FileHeaderAlreadyWritten,

    #[error("File header has not been written yet")]
    FileHeaderNotWritten,

    #[error("Failed to read marker bytes: {0}")]
    ReadMarker(#[source] std::io::Error),

    #[error("Failed to read block marker bytes: {0}")]
    ReadBlockMarker(#[source] std::io::Error),

    #[error("Block sync marker does not match the header marker")]
    GetBlockMarker,

    #[error("Expected a zero block terminator, got: {0}")]
    GetBlockTerminator(i64),

    #[error("Failed to read block into internal buffer: {0}")]
    ReadIntoBuf(#[source] std::io::Error),

    #[error("Failed to read boolean bytes: {0}")]
    ReadBoolean(#[source] std::io::Error),

    #[error("Failed to read bytes: {0}")]
    ReadBytes(#[source] std::io::Error),

    #[error("Failed to read float: {0}")]
    ReadFloat(#[source] std::io::Error),

    #[error("Failed to read double: {0}")]
    ReadDouble(#[source] std::io::Error),

    #[error("Failed to read fixed number of bytes {1}: {0}")]
    ReadFixed(#[source] std::io::Error, usize),

    #[error("Failed to read a variable-length integer: {0}")]
    ReadVariableIntegerBytes(#[source] std::io::Error),

    #[error("Failed to write bytes: {0}")]
    WriteBytes(#[source] std::io::Error),

    #[error("Failed to write marker bytes: {0}")]
    WriteMarker(#[source] std::io::Error),

    #[error("Failed to flush the underlying writer: {0}")]
    FlushWriter(#[source] std::io::Error),
}
