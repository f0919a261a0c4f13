use crate::schema::{ObjectSchema, PropertySchema, SchemaNode};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Target document version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flavor {
    /// Swagger 2.0
    Swagger2,
    /// OpenAPI 3.0
    OpenApi3,
}

impl Flavor {
    /// Prefix of every `$ref` pointing at a definition.
    pub fn ref_prefix(&self) -> &'static str {
        match self {
            Flavor::Swagger2 => "#/definitions/",
            Flavor::OpenApi3 => "#/components/schemas/",
        }
    }
}

/// Schema object shared by both document versions
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    /// Reference to a definition
    #[serde(rename = "$ref", skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    /// The type of the schema (string, integer, object, array, etc.)
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub schema_type: Option<String>,
    /// Format for primitive types (e.g., "int32", "int64", "float", "double")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    /// OpenAPI 3.0 deprecation flag
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deprecated: Option<bool>,
    /// Swagger 2.0 has no deprecation flag on schemas
    #[serde(rename = "x-deprecated", skip_serializing_if = "Option::is_none")]
    pub x_deprecated: Option<bool>,
    /// Items schema for array types
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<Schema>>,
    /// Properties for object types, in declaration order
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<IndexMap<String, Schema>>,
    /// Required property names for object types
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<Vec<String>>,
    /// Value schema for map types
    #[serde(rename = "additionalProperties", skip_serializing_if = "Option::is_none")]
    pub additional_properties: Option<Box<Schema>>,
    #[serde(rename = "allOf", skip_serializing_if = "Option::is_none")]
    pub all_of: Option<Vec<Schema>>,
    #[serde(rename = "oneOf", skip_serializing_if = "Option::is_none")]
    pub one_of: Option<Vec<Schema>>,
    /// Swagger 2.0 rendering of alternatives
    #[serde(rename = "x-oneOf", skip_serializing_if = "Option::is_none")]
    pub x_one_of: Option<Vec<Schema>>,
}

impl Schema {
    fn typed(schema_type: &str) -> Self {
        Self {
            schema_type: Some(schema_type.to_string()),
            ..Self::default()
        }
    }
}

/// Schema generator - renders resolved schema nodes as schema objects of
/// one document version
#[derive(Debug, Clone, Copy)]
pub struct SchemaGenerator {
    flavor: Flavor,
}

impl SchemaGenerator {
    pub fn new(flavor: Flavor) -> Self {
        Self { flavor }
    }

    pub fn flavor(&self) -> Flavor {
        self.flavor
    }

    /// Generate the schema object for a node
    pub fn generate_schema(&self, node: &SchemaNode) -> Schema {
        match node {
            SchemaNode::Primitive { name, format } => self.primitive(name, format),
            SchemaNode::Array(item) => Schema {
                items: Some(Box::new(self.generate_schema(item))),
                ..Schema::typed("array")
            },
            SchemaNode::Map(value) => Schema {
                additional_properties: Some(Box::new(self.generate_schema(value))),
                ..Schema::typed("object")
            },
            SchemaNode::Object(object) => match &object.reference {
                Some(key) => Schema {
                    reference: Some(format!("{}{}", self.flavor.ref_prefix(), key)),
                    ..Schema::default()
                },
                None => self.generate_object(object),
            },
            SchemaNode::Interface => Schema::typed("object"),
            SchemaNode::OneOf(variants) => {
                let rendered: Vec<Schema> = variants.iter().map(|v| self.generate_schema(v)).collect();
                match self.flavor {
                    Flavor::OpenApi3 => Schema {
                        one_of: Some(rendered),
                        ..Schema::default()
                    },
                    Flavor::Swagger2 => {
                        let mut primary = rendered.first().cloned().unwrap_or_default();
                        primary.x_one_of = Some(rendered);
                        primary
                    }
                }
            }
        }
    }

    /// Generate an inline or definition object schema
    pub fn generate_object(&self, object: &ObjectSchema) -> Schema {
        let properties: IndexMap<String, Schema> = object
            .properties
            .iter()
            .map(|(name, property)| (name.clone(), self.generate_property(property)))
            .collect();
        Schema {
            title: Some(object.title.clone()).filter(|t| !t.is_empty()),
            properties: Some(properties).filter(|p| !p.is_empty()),
            required: Some(object.required.clone()).filter(|r| !r.is_empty()),
            ..Schema::typed("object")
        }
    }

    /// Generate a property schema. A `$ref` cannot carry siblings, so a
    /// described or deprecated reference is wrapped in `allOf`.
    pub fn generate_property(&self, property: &PropertySchema) -> Schema {
        let base = self.generate_schema(&property.schema);
        let annotated =
            property.description.is_some() || property.default.is_some() || property.deprecated;
        let mut schema = if annotated && base.reference.is_some() {
            Schema {
                all_of: Some(vec![base]),
                ..Schema::default()
            }
        } else {
            base
        };
        if property.description.is_some() {
            schema.description = property.description.clone();
        }
        if property.default.is_some() {
            schema.default = property.default.clone();
        }
        if property.deprecated {
            match self.flavor {
                Flavor::OpenApi3 => schema.deprecated = Some(true),
                Flavor::Swagger2 => schema.x_deprecated = Some(true),
            }
        }
        schema
    }

    /// Generate every definition, keyed as stored
    pub fn generate_definitions(&self, definitions: &BTreeMap<String, ObjectSchema>) -> BTreeMap<String, Schema> {
        definitions
            .iter()
            .map(|(key, object)| (key.clone(), self.generate_object(object)))
            .collect()
    }

    fn primitive(&self, name: &str, format: &str) -> Schema {
        if name == "file" && self.flavor == Flavor::OpenApi3 {
            return Schema {
                format: Some("binary".to_string()),
                ..Schema::typed("string")
            };
        }
        Schema {
            format: Some(format.to_string()).filter(|f| !f.is_empty()),
            ..Schema::typed(name)
        }
    }
}
