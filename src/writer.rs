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

//! Logic handling writing in Avro format at user level.

use crate::{
    AvroResult, Codec,
    encode::{encode, encode_internal, encode_long, encode_to_vec},
    error::Error,
    schema::{MapSchema, Names, Schema, SchemaRepo, resolve_names},
    types::Value,
};
use std::{collections::HashMap, io::Write};

const DEFAULT_BATCH_SIZE: usize = 1000;
const AVRO_OBJECT_HEADER: &[u8] = b"Obj\x01";

/// Main interface for writing Avro container files.
///
/// Values are buffered into blocks of `batch_size` records; each full block
/// is framed with its record count, its byte length and the file's sync
/// marker. Call [`flush`](Writer::flush) or [`into_inner`](Writer::into_inner)
/// before releasing the underlying writer, otherwise a trailing partial
/// block is lost.
pub struct Writer<W: Write> {
    schema: Schema,
    names: Names,
    schema_json: String,
    writer: W,
    codec: Codec,
    batch_size: usize,
    buffer: Vec<u8>,
    num_values: usize,
    marker: [u8; 16],
    has_header: bool,
    user_metadata: HashMap<String, Value>,
}

#[bon::bon]
impl<W: Write> Writer<W> {
    /// Creates a `Writer` given a JSON schema document and something
    /// implementing the `io::Write` trait to write to.
    ///
    /// The schema text is embedded verbatim in the file header.
    #[builder(finish_fn = build)]
    pub fn builder(
        #[builder(start_fn)] writer: W,
        #[builder(into)] schema_json: String,
        #[builder(default)] codec: Codec,
        #[builder(default = DEFAULT_BATCH_SIZE)] batch_size: usize,
        #[builder(default = generate_sync_marker())] marker: [u8; 16],
    ) -> AvroResult<Self> {
        let mut repo = SchemaRepo::new();
        let schema = repo.append(&schema_json)?;
        let names = resolve_names(&schema)?;
        Ok(Self {
            schema,
            names,
            schema_json,
            writer,
            codec,
            batch_size,
            buffer: Vec::new(),
            num_values: 0,
            marker,
            has_header: false,
            user_metadata: HashMap::new(),
        })
    }
}

impl<W: Write> Writer<W> {
    /// Creates a `Writer` given a JSON schema document and something
    /// implementing the `io::Write` trait to write to.
    pub fn new(writer: W, schema_json: &str) -> AvroResult<Self> {
        Self::builder(writer).schema_json(schema_json).build()
    }

    /// Creates a `Writer` from an already parsed `Schema`; its canonical
    /// JSON rendering is embedded in the file header.
    pub fn with_schema(writer: W, schema: &Schema) -> AvroResult<Self> {
        Self::builder(writer)
            .schema_json(schema.canonical_form()?)
            .build()
    }

    /// Get a reference to the `Schema` associated to this `Writer`.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Adds custom metadata to the file header.
    ///
    /// Only usable before the header is written; keys in the reserved
    /// `avro.` namespace are rejected.
    pub fn add_user_metadata<T: AsRef<[u8]>>(&mut self, key: String, value: T) -> AvroResult<()> {
        if self.has_header {
            return Err(Error::FileHeaderAlreadyWritten);
        }
        if key.starts_with("avro.") {
            return Err(Error::InvalidMetadataKey(key));
        }
        self.user_metadata
            .insert(key, Value::Bytes(value.as_ref().to_vec()));
        Ok(())
    }

    /// Write the container file header: magic bytes, the metadata map and
    /// the sync marker.
    ///
    /// Must be called exactly once, before the first value is appended.
    ///
    /// Returns the number of bytes written.
    pub fn write_header(&mut self) -> AvroResult<usize> {
        if self.has_header {
            return Err(Error::FileHeaderAlreadyWritten);
        }

        let mut metadata = HashMap::with_capacity(self.user_metadata.len() + 2);
        metadata.insert(
            "avro.schema".to_string(),
            Value::Bytes(self.schema_json.clone().into_bytes()),
        );
        metadata.insert(
            "avro.codec".to_string(),
            Value::Bytes(<&str>::from(self.codec).as_bytes().to_vec()),
        );
        for (key, value) in &self.user_metadata {
            metadata.insert(key.clone(), value.clone());
        }

        let mut header = Vec::new();
        header.extend_from_slice(AVRO_OBJECT_HEADER);
        let meta_schema = Schema::Map(MapSchema {
            values: Box::new(Schema::Bytes),
        });
        encode_internal(
            &Value::Map(metadata),
            &meta_schema,
            &Names::new(),
            &mut header,
        )?;
        header.extend_from_slice(&self.marker);

        let n = self.writer.write(&header).map_err(Error::WriteBytes)?;
        self.has_header = true;
        Ok(n)
    }

    /// Append a value to the `Writer`.
    ///
    /// Returns the number of bytes written to the underlying writer, which
    /// is 0 unless this append filled the current block: values are
    /// buffered and framed per batch. Call [`flush`](Writer::flush) to force
    /// the current block out.
    pub fn append<T: Into<Value>>(&mut self, value: T) -> AvroResult<usize> {
        let avro = value.into();
        self.append_value_ref(&avro)
    }

    /// Append a `Value` reference to the `Writer`.
    ///
    /// See [`append`](Writer::append) for the buffering behavior.
    pub fn append_value_ref(&mut self, value: &Value) -> AvroResult<usize> {
        if !self.has_header {
            return Err(Error::FileHeaderNotWritten);
        }

        // Keep the block buffer intact when the value does not encode.
        let start = self.buffer.len();
        if let Err(e) = encode_internal(value, &self.schema, &self.names, &mut self.buffer) {
            self.buffer.truncate(start);
            return Err(e);
        }
        self.num_values += 1;

        if self.num_values >= self.batch_size {
            return self.flush();
        }
        Ok(0)
    }

    /// Extend this `Writer` by appending each `Value` from a slice and
    /// flushing the final block.
    ///
    /// Returns the number of bytes written.
    pub fn extend_from_slice(&mut self, values: &[Value]) -> AvroResult<usize> {
        let mut num_bytes = 0;
        for value in values {
            num_bytes += self.append_value_ref(value)?;
        }
        num_bytes += self.flush()?;
        Ok(num_bytes)
    }

    /// Flush the buffered block to the underlying writer.
    ///
    /// A flush with no buffered records is a no-op.
    ///
    /// Returns the number of bytes written.
    pub fn flush(&mut self) -> AvroResult<usize> {
        if self.num_values == 0 {
            return Ok(0);
        }

        self.codec.compress(&mut self.buffer)?;

        let mut num_bytes = encode_long(self.num_values as i64, &mut self.writer)?;
        num_bytes += encode_long(self.buffer.len() as i64, &mut self.writer)?;
        num_bytes += self
            .writer
            .write(self.buffer.as_ref())
            .map_err(Error::WriteBytes)?;
        num_bytes += self
            .writer
            .write(&self.marker)
            .map_err(Error::WriteMarker)?;

        self.buffer.clear();
        self.num_values = 0;

        self.writer.flush().map_err(Error::FlushWriter)?;

        Ok(num_bytes)
    }

    /// Flush any buffered records, ending the current block.
    ///
    /// Returns the number of bytes written.
    pub fn close(&mut self) -> AvroResult<usize> {
        self.flush()
    }

    /// Return what the `Writer` is writing to, consuming the `Writer`.
    ///
    /// Any buffered records are flushed first.
    pub fn into_inner(mut self) -> AvroResult<W> {
        self.flush()?;
        Ok(self.writer)
    }

    /// Gets a reference to the underlying writer.
    ///
    /// **NOTE**: There may still be buffered data. To have all the data
    /// in the writer call [`flush`](Writer::flush) first.
    pub fn get_ref(&self) -> &W {
        &self.writer
    }
}

fn generate_sync_marker() -> [u8; 16] {
    rand::random()
}

/// Encode a `Value` of a given `Schema` to a vector of bytes, without the
/// container file framing.
pub fn to_avro_datum<T: Into<Value>>(schema: &Schema, value: T) -> AvroResult<Vec<u8>> {
    encode_to_vec(&value.into(), schema)
}

/// Encode a `Value` of a given `Schema` into the provided writer, without
/// the container file framing.
///
/// Returns the number of bytes written.
pub fn write_avro_datum_ref<W: Write>(
    schema: &Schema,
    value: &Value,
    writer: &mut W,
) -> AvroResult<usize> {
    encode(value, schema, writer)
}
