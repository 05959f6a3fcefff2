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

use crate::AvroResult;
use crate::error::Error;
use crate::schema::{
    ArraySchema, FixedSchema, MapSchema, RecordField, RecordSchema, Schema, UnionSchema,
};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap, HashSet};

/// A name-to-schema table driving JSON schema parsing.
///
/// A fresh repository knows the eight primitive type names. Parsing a
/// document through [`append`](Self::append) registers every named schema
/// (record, fixed) it defines, so later documents appended to the same
/// repository, or later parts of the same document, can refer to them by
/// bare name. A record name registers before its fields are parsed, which
/// is what lets a record refer to itself.
///
/// Names are flat strings stored verbatim; this repository performs no
/// namespace joining.
#[derive(Debug, Clone)]
pub struct SchemaRepo {
    schemas: HashMap<String, Schema>,
    /// Names of records whose fields are currently being parsed. A
    /// reference to one of these resolves to `Schema::Ref`.
    resolving: HashSet<String>,
}

impl Default for SchemaRepo {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaRepo {
    /// Create a repository seeded with the primitive type names.
    pub fn new() -> Self {
        let mut schemas = HashMap::new();
        for (name, schema) in [
            ("null", Schema::Null),
            ("boolean", Schema::Boolean),
            ("int", Schema::Int),
            ("long", Schema::Long),
            ("float", Schema::Float),
            ("double", Schema::Double),
            ("bytes", Schema::Bytes),
            ("string", Schema::String),
        ] {
            schemas.insert(name.to_string(), schema);
        }
        Self {
            schemas,
            resolving: HashSet::new(),
        }
    }

    /// Parse a JSON schema document, registering the named schemas it
    /// defines, and return the parsed `Schema`.
    pub fn append(&mut self, input: &str) -> AvroResult<Schema> {
        let value = serde_json::from_str(input).map_err(Error::ParseSchemaJson)?;
        self.resolving.clear();
        self.parse(&value)
    }

    /// Register `schema` under `name`.
    ///
    /// Registering the identical schema again is a no-op; registering a
    /// different schema under a known name is an error.
    pub fn append_schema(&mut self, name: &str, schema: Schema) -> AvroResult<()> {
        match self.schemas.get(name) {
            Some(existing) if *existing == schema => Ok(()),
            Some(_) => Err(Error::NameCollision(name.to_string())),
            None => {
                self.schemas.insert(name.to_string(), schema);
                Ok(())
            }
        }
    }

    /// Look up a schema by name. Primitive names are always present.
    pub fn get(&self, name: &str) -> Option<&Schema> {
        self.schemas.get(name)
    }

    fn parse(&mut self, value: &Value) -> AvroResult<Schema> {
        match *value {
            Value::String(ref t) => self.parse_known_schema(t.as_str()),
            Value::Object(ref data) => self.parse_complex(data),
            Value::Array(ref data) => self.parse_union(data),
            _ => Err(Error::ParseSchemaFromValidJson),
        }
    }

    /// Parse a string as a primitive type or a reference to a registered
    /// named schema.
    fn parse_known_schema(&mut self, name: &str) -> AvroResult<Schema> {
        match name {
            "null" => Ok(Schema::Null),
            "boolean" => Ok(Schema::Boolean),
            "int" => Ok(Schema::Int),
            "long" => Ok(Schema::Long),
            "double" => Ok(Schema::Double),
            "float" => Ok(Schema::Float),
            "bytes" => Ok(Schema::Bytes),
            "string" => Ok(Schema::String),
            _ => {
                if self.schemas.contains_key(name) || self.resolving.contains(name) {
                    Ok(Schema::Ref {
                        name: name.to_string(),
                    })
                } else {
                    Err(Error::ParsePrimitive(name.to_string()))
                }
            }
        }
    }

    fn parse_complex(&mut self, complex: &Map<String, Value>) -> AvroResult<Schema> {
        match complex.get("type") {
            Some(Value::String(t)) => match t.as_str() {
                "array" => self.parse_array(complex),
                "map" => self.parse_map(complex),
                "record" => self.parse_record(complex),
                "fixed" => self.parse_fixed(complex),
                other => self.parse_known_schema(other),
            },
            // e.g. {"type": {"type": "string"}}
            Some(nested) => self.parse(nested),
            None => Err(Error::GetComplexTypeField),
        }
    }

    fn parse_union(&mut self, items: &[Value]) -> AvroResult<Schema> {
        let variants = items
            .iter()
            .map(|item| self.parse(item))
            .collect::<AvroResult<Vec<_>>>()?;
        Ok(Schema::Union(UnionSchema::new(variants)?))
    }

    fn parse_array(&mut self, complex: &Map<String, Value>) -> AvroResult<Schema> {
        let items = complex.get("items").ok_or(Error::GetArrayItemsField)?;
        Ok(Schema::Array(ArraySchema {
            items: Box::new(self.parse(items)?),
        }))
    }

    fn parse_map(&mut self, complex: &Map<String, Value>) -> AvroResult<Schema> {
        let values = complex.get("values").ok_or(Error::GetMapValuesField)?;
        Ok(Schema::Map(MapSchema {
            values: Box::new(self.parse(values)?),
        }))
    }

    fn parse_fixed(&mut self, complex: &Map<String, Value>) -> AvroResult<Schema> {
        let name = name_field(complex)?;
        let size = complex
            .get("size")
            .and_then(Value::as_u64)
            .ok_or(Error::GetFixedSizeField)?;
        let schema = Schema::Fixed(FixedSchema {
            name: name.clone(),
            size: size as usize,
        });
        self.append_schema(&name, schema.clone())?;
        Ok(schema)
    }

    fn parse_record(&mut self, complex: &Map<String, Value>) -> AvroResult<Schema> {
        let name = name_field(complex)?;
        let items = complex
            .get("fields")
            .and_then(Value::as_array)
            .ok_or(Error::GetRecordFieldsJson)?;

        // The record name resolves while its own fields are parsed, so a
        // field may refer back to the record.
        self.resolving.insert(name.clone());
        let fields = items
            .iter()
            .map(|field| self.parse_record_field(field))
            .collect::<AvroResult<Vec<_>>>();
        self.resolving.remove(&name);
        let fields = fields?;

        let mut lookup = BTreeMap::new();
        for (position, field) in fields.iter().enumerate() {
            lookup.insert(field.name.clone(), position);
        }

        let schema = Schema::Record(RecordSchema {
            name: name.clone(),
            fields,
            lookup,
        });
        self.append_schema(&name, schema.clone())?;
        Ok(schema)
    }

    fn parse_record_field(&mut self, field: &Value) -> AvroResult<RecordField> {
        let field = field.as_object().ok_or(Error::GetNameFieldFromRecord)?;
        let name = field
            .get("name")
            .and_then(Value::as_str)
            .ok_or(Error::GetNameFieldFromRecord)?;
        let ty = field.get("type").ok_or(Error::GetRecordFieldTypeField)?;
        Ok(RecordField {
            name: name.to_string(),
            schema: self.parse(ty)?,
        })
    }
}

fn name_field(complex: &Map<String, Value>) -> AvroResult<String> {
    complex
        .get("name")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or(Error::GetNameField)
}
