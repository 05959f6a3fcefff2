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

//! Logic handling reading from Avro format at user level.

use crate::{
    AvroResult, Codec,
    decode::{decode, decode_internal},
    error::Error,
    schema::{MapSchema, Names, Schema, SchemaRepo, resolve_names},
    types::Value,
    util::{read_long, safe_len},
};
use log::warn;
use std::{
    collections::HashMap,
    io::{ErrorKind, Read},
    str::FromStr,
};

/// Main interface for reading Avro container files.
///
/// The header is read on construction; the writer schema it embeds drives
/// the decoding of every record in the file. To be used as an iterator:
///
/// ```no_run
/// # use avrolite::Reader;
/// # use std::io::Cursor;
/// # let input = Cursor::new(Vec::<u8>::new());
/// for value in Reader::new(input).unwrap() {
///     match value {
///         Ok(v) => println!("{v:?}"),
///         Err(e) => println!("Error: {e}"),
///     };
/// }
/// ```
pub struct Reader<R: Read> {
    reader: R,
    schema: Schema,
    names: Names,
    codec: Codec,
    marker: [u8; 16],
    /// Internal buffering to reduce allocation.
    buf: Vec<u8>,
    buf_idx: usize,
    /// Number of records still to be decoded from the current block.
    message_count: usize,
    user_metadata: HashMap<String, Vec<u8>>,
    errored: bool,
}

impl<R: Read> Reader<R> {
    /// Creates a `Reader` given something implementing the `io::Read` trait
    /// to read from.
    ///
    /// **NOTE** The Avro header is read automatically upon creation.
    pub fn new(reader: R) -> AvroResult<Reader<R>> {
        let mut reader = Reader {
            reader,
            schema: Schema::Null,
            names: Names::new(),
            codec: Codec::Null,
            marker: [0; 16],
            buf: vec![],
            buf_idx: 0,
            message_count: 0,
            user_metadata: HashMap::new(),
            errored: false,
        };
        reader.read_header()?;
        Ok(reader)
    }

    /// Get a reference to the schema the file was written with.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Get a reference to the user metadata carried by the file header.
    pub fn user_metadata(&self) -> &HashMap<String, Vec<u8>> {
        &self.user_metadata
    }

    /// Try to read the header and to set the writer `Schema`, the `Codec`
    /// and the marker based on its content.
    fn read_header(&mut self) -> AvroResult<()> {
        let mut buf = [0u8; 4];
        self.reader.read_exact(&mut buf).map_err(Error::ReadHeader)?;

        if buf != [b'O', b'b', b'j', 1u8] {
            return Err(Error::HeaderMagic);
        }

        let meta_schema = Schema::Map(MapSchema {
            values: Box::new(Schema::Bytes),
        });
        match decode_internal(&meta_schema, &Names::new(), &mut self.reader)? {
            Value::Map(metadata) => {
                self.read_writer_schema(&metadata)?;
                self.codec = read_codec(&metadata)?;

                for (key, value) in metadata {
                    if key == "avro.schema" || key == "avro.codec" {
                        // already processed
                    } else if key.starts_with("avro.") {
                        warn!("Ignoring unknown metadata key: {key}");
                    } else {
                        self.read_user_metadata(key, value);
                    }
                }
            }
            _ => {
                return Err(Error::GetHeaderMetadata);
            }
        }

        self.reader
            .read_exact(&mut self.marker)
            .map_err(Error::ReadMarker)
    }

    fn read_writer_schema(&mut self, metadata: &HashMap<String, Value>) -> AvroResult<()> {
        let json = match metadata.get("avro.schema") {
            Some(Value::Bytes(bytes)) => {
                std::str::from_utf8(bytes).map_err(Error::ConvertToUtf8Error)?
            }
            _ => return Err(Error::GetAvroSchemaFromMap),
        };
        let mut repo = SchemaRepo::new();
        self.schema = repo.append(json)?;
        self.names = resolve_names(&self.schema)?;
        Ok(())
    }

    fn read_user_metadata(&mut self, key: String, value: Value) {
        match value {
            Value::Bytes(bytes) => {
                self.user_metadata.insert(key, bytes);
            }
            wrong => {
                warn!("User metadata values must be bytes, found {wrong:?}");
            }
        }
    }

    /// Read the framing of the next block and fill the internal buffer with
    /// its records.
    ///
    /// Returns `false` on a clean end of stream, i.e. when the input ends
    /// before the record count of a next block. Any later truncation, and a
    /// sync marker differing from the one in the file header, is an error.
    ///
    /// Undecoded records remaining in the current block are discarded.
    pub fn next_batch(&mut self) -> AvroResult<bool> {
        match read_long(&mut self.reader) {
            Ok(count) => {
                self.message_count =
                    usize::try_from(count).map_err(|e| Error::ConvertI64ToUsize(e, count))?;
                let block_bytes = read_long(&mut self.reader)?;
                let block_bytes = safe_len(
                    usize::try_from(block_bytes)
                        .map_err(|e| Error::ConvertI64ToUsize(e, block_bytes))?,
                )?;

                self.buf.resize(block_bytes, 0);
                self.reader
                    .read_exact(&mut self.buf)
                    .map_err(Error::ReadIntoBuf)?;
                self.buf_idx = 0;

                let mut marker = [0u8; 16];
                self.reader
                    .read_exact(&mut marker)
                    .map_err(Error::ReadBlockMarker)?;
                if marker != self.marker {
                    return Err(Error::GetBlockMarker);
                }

                self.codec.decompress(&mut self.buf)?;
                Ok(true)
            }
            Err(Error::ReadVariableIntegerBytes(io_err))
                if io_err.kind() == ErrorKind::UnexpectedEof =>
            {
                // the stream finished cleanly at a block boundary
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Decode the next record, transparently pulling the next block when the
    /// current one is exhausted. `None` signals the end of the stream.
    fn read_next(&mut self) -> AvroResult<Option<Value>> {
        while self.message_count == 0 {
            if !self.next_batch()? {
                return Ok(None);
            }
        }

        let mut block_bytes = &self.buf[self.buf_idx..];
        let bytes_before = block_bytes.len();
        let item = decode_internal(&self.schema, &self.names, &mut block_bytes)?;
        self.buf_idx += bytes_before - block_bytes.len();
        self.message_count -= 1;
        Ok(Some(item))
    }
}

impl<R: Read> Iterator for Reader<R> {
    type Item = AvroResult<Value>;

    fn next(&mut self) -> Option<Self::Item> {
        // to prevent keep on reading after the first error occurs
        if self.errored {
            return None;
        };
        match self.read_next() {
            Ok(opt) => opt.map(Ok),
            Err(e) => {
                self.errored = true;
                Some(Err(e))
            }
        }
    }
}

fn read_codec(metadata: &HashMap<String, Value>) -> AvroResult<Codec> {
    match metadata.get("avro.codec") {
        None => Ok(Codec::Null),
        Some(Value::Bytes(bytes)) => {
            let name = std::str::from_utf8(bytes).map_err(Error::ConvertToUtf8Error)?;
            Codec::from_str(name).map_err(|_| Error::CodecNotSupported(name.to_owned()))
        }
        Some(_) => Err(Error::BadCodecMetadata),
    }
}

/// Decode a `Value` encoded in Avro format given its `Schema` and anything
/// implementing `io::Read` to read from.
///
/// **NOTE** This function has a quite small niche of usage and does NOT
/// take care of reading the header and consecutive data blocks; use
/// [`Reader`] if you don't know what you are doing, instead.
pub fn from_avro_datum<R: Read>(schema: &Schema, reader: &mut R) -> AvroResult<Value> {
    decode(schema, reader)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Writer;
    use crate::encode::encode;
    use pretty_assertions::assert_eq;

    const SCHEMA: &str = r#"{
        "type": "record",
        "name": "test",
        "fields": [
            {"name": "a", "type": "long"},
            {"name": "b", "type": "string"}
        ]
    }"#;

    fn record_value(a: i64, b: &str) -> Value {
        Value::Record(vec![
            ("a".to_string(), Value::Long(a)),
            ("b".to_string(), Value::String(b.to_string())),
        ])
    }

    fn file_with(values: &[Value]) -> Vec<u8> {
        let mut writer = Writer::new(Vec::new(), SCHEMA).unwrap();
        writer.write_header().unwrap();
        writer.extend_from_slice(values).unwrap();
        writer.into_inner().unwrap()
    }

    /// A header with arbitrary metadata, for exercising the header checks.
    fn handcrafted_header(metadata: Vec<(&str, &[u8])>) -> Vec<u8> {
        let meta_schema = Schema::Map(MapSchema {
            values: Box::new(Schema::Bytes),
        });
        let map: HashMap<String, Value> = metadata
            .into_iter()
            .map(|(k, v)| (k.to_string(), Value::Bytes(v.to_vec())))
            .collect();
        let mut header = b"Obj\x01".to_vec();
        encode(&Value::Map(map), &meta_schema, &mut header).unwrap();
        header.extend_from_slice(&[0u8; 16]);
        header
    }

    #[test]
    fn test_read_empty_file() {
        let file = file_with(&[]);
        let mut reader = Reader::new(&file[..]).unwrap();
        assert!(!reader.next_batch().unwrap());
        assert!(reader.next().is_none());
    }

    #[test]
    fn test_read_values_back_in_order() {
        let values = vec![
            record_value(0, "name_0"),
            record_value(1, "name_1"),
            record_value(2, "name_2"),
        ];
        let file = file_with(&values);
        let reader = Reader::new(&file[..]).unwrap();
        let read: Vec<Value> = reader.map(Result::unwrap).collect();
        assert_eq!(read, values);
    }

    #[test]
    fn test_reader_exposes_writer_schema() {
        let file = file_with(&[]);
        let reader = Reader::new(&file[..]).unwrap();
        assert_eq!(reader.schema(), &Schema::parse_str(SCHEMA).unwrap());
    }

    #[test]
    fn test_bad_magic() {
        let file = b"NotAvroData".to_vec();
        assert!(matches!(Reader::new(&file[..]), Err(Error::HeaderMagic)));
    }

    #[test]
    fn test_truncated_magic() {
        assert!(matches!(Reader::new(&b"Ob"[..]), Err(Error::ReadHeader(_))));
    }

    #[test]
    fn test_missing_schema_metadata() {
        let header = handcrafted_header(vec![("avro.codec", b"null")]);
        assert!(matches!(
            Reader::new(&header[..]),
            Err(Error::GetAvroSchemaFromMap)
        ));
    }

    #[test]
    fn test_unsupported_codec() {
        let header = handcrafted_header(vec![
            ("avro.schema", br#""long""#),
            ("avro.codec", b"deflate"),
        ]);
        assert!(matches!(
            Reader::new(&header[..]),
            Err(Error::CodecNotSupported(name)) if name == "deflate"
        ));
    }

    #[test]
    fn test_absent_codec_defaults_to_null() {
        let header = handcrafted_header(vec![("avro.schema", br#""long""#)]);
        let mut reader = Reader::new(&header[..]).unwrap();
        assert!(!reader.next_batch().unwrap());
    }

    #[test]
    fn test_user_metadata_round_trip() {
        let mut writer = Writer::new(Vec::new(), SCHEMA).unwrap();
        writer
            .add_user_metadata("origin".to_string(), b"unit-test")
            .unwrap();
        writer.write_header().unwrap();
        let file = writer.into_inner().unwrap();

        let reader = Reader::new(&file[..]).unwrap();
        assert_eq!(
            reader.user_metadata().get("origin"),
            Some(&b"unit-test".to_vec())
        );
    }

    #[test]
    fn test_iterator_fuses_after_error() {
        let values = vec![record_value(1, "one")];
        let mut file = file_with(&values);
        // corrupt the block's sync marker
        let len = file.len();
        file[len - 1] ^= 0xFF;

        let mut reader = Reader::new(&file[..]).unwrap();
        assert!(matches!(reader.next(), Some(Err(Error::GetBlockMarker))));
        assert!(reader.next().is_none());
    }
}
