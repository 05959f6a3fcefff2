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

//! Logic for parsing and interacting with schemas in Avro format.

mod parser;

pub use crate::schema::parser::SchemaRepo;
use crate::types::Value;
use crate::{AvroResult, error::Error};
use serde::{Serialize, Serializer, ser::SerializeMap, ser::SerializeSeq};
use std::collections::{BTreeMap, HashMap};
use strum_macros::EnumDiscriminants;

/// Represents any valid Avro schema.
///
/// Named schemas (records and fixeds) may refer to themselves or to other
/// named schemas through the [`Schema::Ref`] variant; the definition is kept
/// once in the tree (or in a [`SchemaRepo`]) and every further occurrence is
/// a reference by name.
#[derive(Clone, Debug, PartialEq, EnumDiscriminants)]
#[strum_discriminants(name(SchemaKind), derive(Hash, Ord, PartialOrd))]
pub enum Schema {
    /// A `null` Avro schema.
    Null,
    /// A `boolean` Avro schema.
    Boolean,
    /// An `int` Avro schema.
    Int,
    /// A `long` Avro schema.
    Long,
    /// A `float` Avro schema.
    Float,
    /// A `double` Avro schema.
    Double,
    /// A `bytes` Avro schema.
    ///
    /// `Bytes` represents a sequence of 8-bit unsigned bytes.
    Bytes,
    /// A `string` Avro schema.
    ///
    /// `String` represents a unicode character sequence.
    String,
    /// A `fixed` Avro schema.
    Fixed(FixedSchema),
    /// An `array` Avro schema.
    ///
    /// All items will have the same schema.
    Array(ArraySchema),
    /// A `map` Avro schema.
    ///
    /// Keys are always a `Schema::String` and all values will have the same
    /// schema.
    Map(MapSchema),
    /// A `record` Avro schema.
    Record(RecordSchema),
    /// A `union` Avro schema.
    Union(UnionSchema),
    /// A reference to a named schema defined elsewhere.
    Ref { name: String },
}

/// A description of a Fixed schema.
#[derive(Clone, Debug, PartialEq)]
pub struct FixedSchema {
    /// The name of the schema.
    pub name: String,
    /// The number of bytes of the fixed schema.
    pub size: usize,
}

/// A description of an Array schema.
#[derive(Clone, Debug, PartialEq)]
pub struct ArraySchema {
    /// The schema of the array's items.
    pub items: Box<Schema>,
}

/// A description of a Map schema.
#[derive(Clone, Debug, PartialEq)]
pub struct MapSchema {
    /// The schema of the map's values.
    pub values: Box<Schema>,
}

/// A description of a Record schema.
#[derive(Clone, Debug, PartialEq)]
pub struct RecordSchema {
    /// The name of the schema.
    pub name: String,
    /// The set of fields of the schema, in declaration order.
    ///
    /// Field order is fixed when the schema is built and is part of the
    /// wire contract.
    pub fields: Vec<RecordField>,
    /// The lookup table mapping a field name to its position.
    pub lookup: BTreeMap<String, usize>,
}

/// Represents a `field` in a `record` Avro schema.
#[derive(Clone, Debug, PartialEq)]
pub struct RecordField {
    /// Name of the field.
    pub name: String,
    /// Schema of the field.
    pub schema: Schema,
}

/// A description of a Union schema.
#[derive(Debug, Clone)]
pub struct UnionSchema {
    /// The schemas that make up this union.
    pub(crate) schemas: Vec<Schema>,
    // Used to ensure uniqueness of unnamed schema inputs, and provide
    // constant time finding of the schema index given a value. Named
    // variants (records, fixeds, refs) are matched positionally instead.
    variant_index: BTreeMap<SchemaKind, usize>,
}

impl UnionSchema {
    /// Creates a new UnionSchema from a vector of schemas.
    ///
    /// # Errors
    /// Will return an error if `schemas` has duplicate unnamed schemas or if
    /// `schemas` contains a union.
    pub fn new(schemas: Vec<Schema>) -> AvroResult<Self> {
        let mut vindex = BTreeMap::new();
        for (i, schema) in schemas.iter().enumerate() {
            if let Schema::Union(_) = schema {
                return Err(Error::GetNestedUnion);
            }
            if !schema.is_named() && vindex.insert(SchemaKind::from(schema), i).is_some() {
                return Err(Error::GetUnionDuplicate);
            }
        }
        Ok(UnionSchema {
            schemas,
            variant_index: vindex,
        })
    }

    /// Returns a slice to all variants of this schema.
    pub fn variants(&self) -> &[Schema] {
        &self.schemas
    }

    /// Returns true if any of the variants of this `UnionSchema` is `Null`.
    pub fn is_nullable(&self) -> bool {
        self.schemas.iter().any(|x| matches!(x, Schema::Null))
    }

    /// Optionally returns a reference to the first variant matched by this
    /// value, as well as its position within this union.
    ///
    /// Unnamed variants are found through the kind table; named variants are
    /// scanned in declaration order and matched by shape, chasing references
    /// through `names`.
    pub(crate) fn find_schema(&self, value: &Value, names: &Names) -> Option<(usize, &Schema)> {
        let kind = SchemaKind::from(value);
        if let Some(&i) = self.variant_index.get(&kind) {
            return Some((i, &self.schemas[i]));
        }
        self.schemas
            .iter()
            .enumerate()
            .find(|(_, variant)| variant_matches(value, variant, names))
    }
}

fn variant_matches(value: &Value, variant: &Schema, names: &Names) -> bool {
    let variant = match variant {
        Schema::Ref { name } => match names.get(name) {
            Some(resolved) => resolved,
            None => return false,
        },
        other => other,
    };
    match (value, variant) {
        (Value::Record(value_fields), Schema::Record(inner)) => {
            inner.fields.len() == value_fields.len()
                && inner
                    .fields
                    .iter()
                    .zip(value_fields)
                    .all(|(field, (name, _))| field.name == *name)
        }
        (Value::Fixed(n, _), Schema::Fixed(inner)) => *n == inner.size,
        (Value::Bytes(bytes), Schema::Fixed(inner)) => bytes.len() == inner.size,
        _ => false,
    }
}

// No need to compare variant_index, it is derivative of schemas.
impl PartialEq for UnionSchema {
    fn eq(&self, other: &UnionSchema) -> bool {
        self.schemas.eq(&other.schemas)
    }
}

impl SchemaKind {
    pub fn is_primitive(self) -> bool {
        matches!(
            self,
            SchemaKind::Null
                | SchemaKind::Boolean
                | SchemaKind::Int
                | SchemaKind::Long
                | SchemaKind::Double
                | SchemaKind::Float
                | SchemaKind::Bytes
                | SchemaKind::String,
        )
    }
}

impl From<&Value> for SchemaKind {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Boolean(_) => Self::Boolean,
            Value::Int(_) => Self::Int,
            Value::Long(_) => Self::Long,
            Value::Float(_) => Self::Float,
            Value::Double(_) => Self::Double,
            Value::Bytes(_) => Self::Bytes,
            Value::String(_) => Self::String,
            Value::Fixed(_, _) => Self::Fixed,
            Value::Array(_) => Self::Array,
            Value::Map(_) => Self::Map,
            Value::Record(_) => Self::Record,
            Value::Union(_, _) => Self::Union,
        }
    }
}

/// Mapping from schema name to definition, used to chase [`Schema::Ref`]
/// references while encoding and decoding.
pub(crate) type Names = HashMap<String, Schema>;

/// Walk `schema` collecting the definitions of all named schemas it
/// contains, then verify that every reference in the tree resolves.
pub(crate) fn resolve_names(schema: &Schema) -> AvroResult<Names> {
    let mut names = Names::new();
    collect_names(schema, &mut names);
    check_refs(schema, &names)?;
    Ok(names)
}

fn collect_names(schema: &Schema, names: &mut Names) {
    match schema {
        Schema::Record(inner) => {
            names.insert(inner.name.clone(), schema.clone());
            for field in &inner.fields {
                collect_names(&field.schema, names);
            }
        }
        Schema::Fixed(inner) => {
            names.insert(inner.name.clone(), schema.clone());
        }
        Schema::Array(inner) => collect_names(&inner.items, names),
        Schema::Map(inner) => collect_names(&inner.values, names),
        Schema::Union(inner) => {
            for variant in &inner.schemas {
                collect_names(variant, names);
            }
        }
        _ => (),
    }
}

fn check_refs(schema: &Schema, names: &Names) -> AvroResult<()> {
    match schema {
        Schema::Ref { name } => {
            if names.contains_key(name) {
                Ok(())
            } else {
                Err(Error::SchemaResolutionError(name.clone()))
            }
        }
        Schema::Record(inner) => {
            for field in &inner.fields {
                check_refs(&field.schema, names)?;
            }
            Ok(())
        }
        Schema::Array(inner) => check_refs(&inner.items, names),
        Schema::Map(inner) => check_refs(&inner.values, names),
        Schema::Union(inner) => {
            for variant in &inner.schemas {
                check_refs(variant, names)?;
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

impl Schema {
    /// Create a `Schema` from a string representing a JSON Avro schema.
    ///
    /// Named schemas defined by the document register in a fresh
    /// [`SchemaRepo`]; use [`SchemaRepo::append`] directly to parse several
    /// documents sharing definitions.
    pub fn parse_str(input: &str) -> AvroResult<Schema> {
        let mut repo = SchemaRepo::new();
        repo.append(input)
    }

    /// Whether this schema is a named schema or a reference to one.
    pub fn is_named(&self) -> bool {
        matches!(
            self,
            Schema::Record(_) | Schema::Fixed(_) | Schema::Ref { .. }
        )
    }

    /// The name identifying this schema in union dispatch and error
    /// messages: the primitive name, the declared name for named schemas,
    /// `"[]"` followed by the item name for arrays, `"map"` for maps and
    /// `"union"` for unions.
    pub fn schema_name(&self) -> String {
        match self {
            Schema::Null => "null".to_string(),
            Schema::Boolean => "boolean".to_string(),
            Schema::Int => "int".to_string(),
            Schema::Long => "long".to_string(),
            Schema::Float => "float".to_string(),
            Schema::Double => "double".to_string(),
            Schema::Bytes => "bytes".to_string(),
            Schema::String => "string".to_string(),
            Schema::Fixed(inner) => inner.name.clone(),
            Schema::Array(inner) => format!("[]{}", inner.items.schema_name()),
            Schema::Map(_) => "map".to_string(),
            Schema::Record(inner) => inner.name.clone(),
            Schema::Union(_) => "union".to_string(),
            Schema::Ref { name } => name.clone(),
        }
    }

    /// Render this schema as JSON, suitable for embedding in a container
    /// file header or feeding back to [`Schema::parse_str`].
    pub fn canonical_form(&self) -> AvroResult<String> {
        serde_json::to_string(self).map_err(Error::ConvertJsonToString)
    }
}

impl Serialize for Schema {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match *self {
            Schema::Null => serializer.serialize_str("null"),
            Schema::Boolean => serializer.serialize_str("boolean"),
            Schema::Int => serializer.serialize_str("int"),
            Schema::Long => serializer.serialize_str("long"),
            Schema::Float => serializer.serialize_str("float"),
            Schema::Double => serializer.serialize_str("double"),
            Schema::Bytes => serializer.serialize_str("bytes"),
            Schema::String => serializer.serialize_str("string"),
            Schema::Fixed(ref inner) => {
                let mut map = serializer.serialize_map(Some(3))?;
                map.serialize_entry("type", "fixed")?;
                map.serialize_entry("name", &inner.name)?;
                map.serialize_entry("size", &inner.size)?;
                map.end()
            }
            Schema::Array(ref inner) => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("type", "array")?;
                map.serialize_entry("items", &*inner.items)?;
                map.end()
            }
            Schema::Map(ref inner) => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("type", "map")?;
                map.serialize_entry("values", &*inner.values)?;
                map.end()
            }
            Schema::Record(ref inner) => {
                let mut map = serializer.serialize_map(Some(3))?;
                map.serialize_entry("type", "record")?;
                map.serialize_entry("name", &inner.name)?;
                map.serialize_entry("fields", &inner.fields)?;
                map.end()
            }
            Schema::Union(ref inner) => {
                let mut seq = serializer.serialize_seq(Some(inner.schemas.len()))?;
                for variant in &inner.schemas {
                    seq.serialize_element(variant)?;
                }
                seq.end()
            }
            Schema::Ref { ref name } => serializer.serialize_str(name),
        }
    }
}

impl Serialize for RecordField {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("name", &self.name)?;
        map.serialize_entry("type", &self.schema)?;
        map.end()
    }
}
