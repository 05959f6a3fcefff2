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

//! **avrolite** works with data in the
//! [Apache Avro](https://avro.apache.org/) binary format: a compact,
//! schema-driven serialization in which records carry no field names on the
//! wire.
//!
//! A JSON schema document is parsed into a [`Schema`] tree, which then
//! drives both directions of the codec through the generic
//! [`Value`](types::Value) type. On top of the raw codec sits the object
//! container file layer: [`Writer`] frames batches of encoded values into
//! sync-marked blocks behind a self-describing header, and [`Reader`]
//! iterates the values back out of such a file.
//!
//! Only the `null` (uncompressed) block codec is supported, and no schema
//! resolution is performed: data is decoded with the schema it was written
//! with.
//!
//! # Example
//!
//! ```
//! use avrolite::{Reader, Schema, Writer, types::Record};
//!
//! # fn main() -> Result<(), avrolite::Error> {
//! let schema_json = r#"{
//!     "type": "record",
//!     "name": "test",
//!     "fields": [
//!         {"name": "a", "type": "long"},
//!         {"name": "b", "type": "string"}
//!     ]
//! }"#;
//! let schema = Schema::parse_str(schema_json)?;
//!
//! let mut writer = Writer::new(Vec::new(), schema_json)?;
//! writer.write_header()?;
//! let mut record = Record::new(&schema).unwrap();
//! record.put("a", 27i64);
//! record.put("b", "foo");
//! writer.append(record)?;
//! let encoded = writer.into_inner()?;
//!
//! for value in Reader::new(&encoded[..])? {
//!     println!("{:?}", value?);
//! }
//! # Ok(())
//! # }
//! ```

mod codec;
mod decode;
mod encode;
mod reader;
mod writer;

pub mod error;
pub mod schema;
pub mod types;
pub mod util;

pub use codec::Codec;
pub use error::Error;
pub use reader::{Reader, from_avro_datum};
pub use schema::{Schema, SchemaRepo};
pub use writer::{Writer, to_avro_datum, write_avro_datum_ref};

/// A convenience type alias for `Result`s with `Error`s.
pub type AvroResult<T> = Result<T, Error>;
