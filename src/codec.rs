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

//! Logic for the supported block compression codecs.

use crate::AvroResult;
use strum_macros::{EnumIter, EnumString, IntoStaticStr};

/// The compression codec used to compress blocks.
///
/// Only the `null` codec, which passes data through uncompressed, is
/// supported. Container files declaring any other codec in their
/// `avro.codec` metadata are rejected when opened.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, EnumIter, EnumString, IntoStaticStr)]
#[strum(serialize_all = "kebab_case")]
pub enum Codec {
    /// The `Null` codec simply passes through data uncompressed.
    #[default]
    Null,
}

impl Codec {
    /// Compress a stream of bytes in-place.
    pub fn compress(self, _stream: &mut Vec<u8>) -> AvroResult<()> {
        match self {
            Codec::Null => Ok(()),
        }
    }

    /// Decompress a stream of bytes in-place.
    pub fn decompress(self, _stream: &mut Vec<u8>) -> AvroResult<()> {
        match self {
            Codec::Null => Ok(()),
        }
    }
}
