use crate::document::{self, Document, ParameterLocation};
use crate::openapi_builder::{info, tags, Info, PathItem, Permission, Tag};
use crate::schema_generator::{Flavor, Schema, SchemaGenerator};
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

pub const SWAGGER_VERSION: &str = "2.0";

/// Swagger 2.0 Operation object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "operationId")]
    pub operation_id: String,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub consumes: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub produces: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub parameters: Vec<Parameter>,
    pub responses: BTreeMap<String, Response>,
    #[serde(skip_serializing_if = "std::ops::Not::not", default)]
    pub deprecated: bool,
    #[serde(rename = "x-permissions", skip_serializing_if = "Vec::is_empty", default)]
    pub permissions: Vec<Permission>,
}

/// Swagger 2.0 Parameter object. Only the body parameter carries a
/// `schema`; the others describe their type inline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    #[serde(rename = "in")]
    pub location: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not", default)]
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<Schema>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub param_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<Schema>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<Schema>,
}

/// Complete Swagger 2.0 document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwaggerDocument {
    pub swagger: String,
    pub info: Info,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(rename = "basePath", skip_serializing_if = "Option::is_none")]
    pub base_path: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub schemes: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub consumes: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub produces: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub tags: Vec<Tag>,
    pub paths: BTreeMap<String, PathItem<Operation>>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub definitions: BTreeMap<String, Schema>,
}

/// Renders a [`Document`] as Swagger 2.0
pub struct SwaggerBuilder<'d> {
    doc: &'d Document,
    schemas: SchemaGenerator,
}

impl<'d> SwaggerBuilder<'d> {
    pub fn new(doc: &'d Document) -> Self {
        Self {
            doc,
            schemas: SchemaGenerator::new(Flavor::Swagger2),
        }
    }

    pub fn build(self) -> SwaggerDocument {
        debug!("Rendering Swagger {} document", SWAGGER_VERSION);
        let mut paths: BTreeMap<String, PathItem<Operation>> = BTreeMap::new();
        for (path, item) in &self.doc.paths {
            let rendered = paths.entry(path.clone()).or_default();
            for (method, operation) in &item.operations {
                *rendered.slot(*method) = Some(self.operation(operation));
            }
        }

        SwaggerDocument {
            swagger: SWAGGER_VERSION.to_string(),
            info: info(self.doc),
            host: self.doc.host.clone(),
            base_path: self.doc.base_path.clone(),
            schemes: self.doc.schemes.clone(),
            consumes: self.doc.consumes.clone(),
            produces: self.doc.produces.clone(),
            tags: tags(self.doc),
            paths,
            definitions: self.schemas.generate_definitions(&self.doc.definitions),
        }
    }

    fn operation(&self, op: &document::Operation) -> Operation {
        let mut parameters: Vec<Parameter> = op.parameters.iter().map(|p| self.parameter(p)).collect();
        if let Some(body) = &op.request_body {
            parameters.push(self.parameter(body));
        }

        let responses = op
            .responses
            .iter()
            .map(|(code, response)| {
                (
                    code.clone(),
                    Response {
                        description: response.description.clone(),
                        schema: response.schema.as_ref().map(|s| self.schemas.generate_schema(s)),
                    },
                )
            })
            .collect();

        Operation {
            tags: op.tags.clone(),
            summary: op.summary.clone(),
            description: op.description.clone(),
            operation_id: op.operation_id.clone(),
            consumes: op.consumes.clone(),
            produces: op.produces.clone(),
            parameters,
            responses,
            deprecated: op.deprecated,
            permissions: op
                .permissions
                .iter()
                .map(|p| Permission {
                    resource: p.resource.clone(),
                    action: p.action.clone(),
                })
                .collect(),
        }
    }

    fn parameter(&self, param: &document::Parameter) -> Parameter {
        let schema = self.schemas.generate_schema(&param.schema);
        let mut rendered = Parameter {
            name: param.name.clone(),
            location: param.location.as_str().to_string(),
            description: param.description.clone(),
            required: param.required,
            schema: None,
            param_type: None,
            format: None,
            items: None,
            default: param.default.clone(),
        };
        if param.location == ParameterLocation::Body {
            // body parameters take no `default` of their own
            let mut schema = schema;
            if let Some(default) = rendered.default.take() {
                schema.default = Some(default);
            }
            rendered.schema = Some(schema);
        } else {
            rendered.param_type = schema.schema_type;
            rendered.format = schema.format;
            rendered.items = schema.items;
        }
        rendered
    }
}
