use crate::document::{self, Document, HttpMethod, ParameterLocation};
use crate::schema::SchemaNode;
use crate::schema_generator::{Flavor, Schema, SchemaGenerator};
use indexmap::IndexMap;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const JSON: &str = "application/json";
const URLENCODED: &str = "application/x-www-form-urlencoded";
const MULTIPART: &str = "multipart/form-data";

/// OpenAPI version written into every 3.0 document.
pub const OPENAPI_VERSION: &str = "3.0.0";

/// Info object, shared by both document versions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Info {
    /// API title
    pub title: String,
    /// API version
    pub version: String,
    /// API description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "termsOfService", skip_serializing_if = "Option::is_none")]
    pub terms_of_service: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact: Option<Contact>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license: Option<License>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct License {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Tag object - one per controller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// `x-permissions` entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Permission {
    pub resource: String,
    pub action: String,
}

/// OpenAPI Server object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Server {
    pub url: String,
}

/// OpenAPI PathItem object - represents all operations for a single path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathItem<O> {
    /// GET operation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub get: Option<O>,
    /// PUT operation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub put: Option<O>,
    /// POST operation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post: Option<O>,
    /// DELETE operation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delete: Option<O>,
    /// OPTIONS operation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<O>,
    /// HEAD operation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub head: Option<O>,
    /// PATCH operation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patch: Option<O>,
}

impl<O> Default for PathItem<O> {
    fn default() -> Self {
        Self {
            get: None,
            put: None,
            post: None,
            delete: None,
            options: None,
            head: None,
            patch: None,
        }
    }
}

impl<O> PathItem<O> {
    pub fn slot(&mut self, method: HttpMethod) -> &mut Option<O> {
        match method {
            HttpMethod::Get => &mut self.get,
            HttpMethod::Put => &mut self.put,
            HttpMethod::Post => &mut self.post,
            HttpMethod::Delete => &mut self.delete,
            HttpMethod::Options => &mut self.options,
            HttpMethod::Head => &mut self.head,
            HttpMethod::Patch => &mut self.patch,
        }
    }
}

/// OpenAPI Operation object - represents a single API operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub tags: Vec<String>,
    /// Operation summary
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Operation description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Operation ID
    #[serde(rename = "operationId")]
    pub operation_id: String,
    /// Parameters (path, query, header, cookie)
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub parameters: Vec<Parameter>,
    /// Request body
    #[serde(rename = "requestBody", skip_serializing_if = "Option::is_none")]
    pub request_body: Option<RequestBody>,
    /// Responses
    pub responses: BTreeMap<String, Response>,
    #[serde(skip_serializing_if = "std::ops::Not::not", default)]
    pub deprecated: bool,
    #[serde(rename = "x-permissions", skip_serializing_if = "Vec::is_empty", default)]
    pub permissions: Vec<Permission>,
}

/// OpenAPI Parameter object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    /// Parameter name
    pub name: String,
    /// Parameter location (path, query, header, cookie)
    #[serde(rename = "in")]
    pub location: String,
    /// Parameter description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Whether the parameter is required
    #[serde(skip_serializing_if = "std::ops::Not::not", default)]
    pub required: bool,
    /// Parameter schema, default value included
    pub schema: Schema,
}

/// OpenAPI RequestBody object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestBody {
    /// Request body description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Whether the request body is required
    #[serde(skip_serializing_if = "std::ops::Not::not", default)]
    pub required: bool,
    /// Content types and their schemas
    pub content: IndexMap<String, MediaType>,
}

/// OpenAPI MediaType object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaType {
    /// Schema for this media type
    pub schema: Schema,
}

/// OpenAPI Response object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// Response description
    pub description: String,
    /// Response content
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<IndexMap<String, MediaType>>,
}

/// OpenAPI Components object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Components {
    /// Schema definitions
    pub schemas: BTreeMap<String, Schema>,
}

/// Complete OpenAPI document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenApiDocument {
    /// OpenAPI version
    pub openapi: String,
    /// API info
    pub info: Info,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub servers: Vec<Server>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub tags: Vec<Tag>,
    /// API paths
    pub paths: BTreeMap<String, PathItem<Operation>>,
    /// Components (schemas, etc.)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub components: Option<Components>,
}

/// Renders a [`Document`] as OpenAPI 3.0
pub struct OpenApiBuilder<'d> {
    doc: &'d Document,
    schemas: SchemaGenerator,
}

impl<'d> OpenApiBuilder<'d> {
    pub fn new(doc: &'d Document) -> Self {
        Self {
            doc,
            schemas: SchemaGenerator::new(Flavor::OpenApi3),
        }
    }

    pub fn build(self) -> OpenApiDocument {
        debug!("Rendering OpenAPI {} document", OPENAPI_VERSION);
        let mut paths: BTreeMap<String, PathItem<Operation>> = BTreeMap::new();
        for (path, item) in &self.doc.paths {
            let rendered = paths.entry(path.clone()).or_default();
            for (method, operation) in &item.operations {
                *rendered.slot(*method) = Some(self.operation(operation));
            }
        }

        let components = Some(self.schemas.generate_definitions(&self.doc.definitions))
            .filter(|schemas| !schemas.is_empty())
            .map(|schemas| Components { schemas });

        OpenApiDocument {
            openapi: OPENAPI_VERSION.to_string(),
            info: info(self.doc),
            servers: servers(self.doc),
            tags: tags(self.doc),
            paths,
            components,
        }
    }

    fn operation(&self, op: &document::Operation) -> Operation {
        let parameters = op
            .parameters
            .iter()
            .filter(|p| p.location != ParameterLocation::FormData)
            .map(|p| Parameter {
                name: p.name.clone(),
                location: p.location.as_str().to_string(),
                description: p.description.clone(),
                required: p.required,
                schema: Schema {
                    default: p.default.clone(),
                    ..self.schemas.generate_schema(&p.schema)
                },
            })
            .collect();

        let request_body = match &op.request_body {
            Some(body) => Some(self.body(op, body)),
            None => self.form(op),
        };

        let produces = first_non_empty(&op.produces, &self.doc.produces);
        let responses = op
            .responses
            .iter()
            .map(|(code, response)| {
                let content = response.schema.as_ref().map(|schema| {
                    let schema = self.schemas.generate_schema(schema);
                    produces
                        .iter()
                        .map(|media| (media.clone(), MediaType { schema: schema.clone() }))
                        .collect()
                });
                (
                    code.clone(),
                    Response {
                        description: response.description.clone(),
                        content,
                    },
                )
            })
            .collect();

        Operation {
            tags: op.tags.clone(),
            summary: op.summary.clone(),
            description: op.description.clone(),
            operation_id: op.operation_id.clone(),
            parameters,
            request_body,
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

    fn body(&self, op: &document::Operation, body: &document::Parameter) -> RequestBody {
        let schema = Schema {
            default: body.default.clone(),
            ..self.schemas.generate_schema(&body.schema)
        };
        let content = first_non_empty(&op.consumes, &self.doc.consumes)
            .into_iter()
            .map(|media| (media, MediaType { schema: schema.clone() }))
            .collect();
        RequestBody {
            description: body.description.clone(),
            required: body.required,
            content,
        }
    }

    /// `formData` parameters collapse into one object-schema request body.
    fn form(&self, op: &document::Operation) -> Option<RequestBody> {
        let fields: Vec<&document::Parameter> = op
            .parameters
            .iter()
            .filter(|p| p.location == ParameterLocation::FormData)
            .collect();
        if fields.is_empty() {
            return None;
        }

        let mut properties = IndexMap::new();
        let mut required = Vec::new();
        for field in &fields {
            let schema = Schema {
                description: field.description.clone(),
                default: field.default.clone(),
                ..self.schemas.generate_schema(&field.schema)
            };
            properties.insert(field.name.clone(), schema);
            if field.required {
                required.push(field.name.clone());
            }
        }
        let schema = Schema {
            schema_type: Some("object".to_string()),
            properties: Some(properties),
            required: Some(required).filter(|r| !r.is_empty()),
            ..Schema::default()
        };

        let media = if fields.iter().any(|f| is_file(&f.schema)) {
            MULTIPART
        } else {
            URLENCODED
        };
        let mut content = IndexMap::new();
        content.insert(media.to_string(), MediaType { schema });
        Some(RequestBody {
            description: None,
            required: fields.iter().any(|f| f.required),
            content,
        })
    }
}

fn is_file(node: &SchemaNode) -> bool {
    match node {
        SchemaNode::Array(item) => is_file(item),
        other => other.is_file(),
    }
}

/// The operation's own media types, else the document's, else JSON.
fn first_non_empty(own: &[String], inherited: &[String]) -> Vec<String> {
    if !own.is_empty() {
        own.to_vec()
    } else if !inherited.is_empty() {
        inherited.to_vec()
    } else {
        vec![JSON.to_string()]
    }
}

pub(crate) fn info(doc: &Document) -> Info {
    let contact = &doc.info.contact;
    let license = &doc.info.license;
    Info {
        title: doc.info.title.clone(),
        version: doc.info.version.clone(),
        description: doc.info.description.clone(),
        terms_of_service: doc.info.terms_of_service.clone(),
        contact: (contact.name.is_some() || contact.url.is_some() || contact.email.is_some()).then(|| Contact {
            name: contact.name.clone(),
            url: contact.url.clone(),
            email: contact.email.clone(),
        }),
        license: (license.name.is_some() || license.url.is_some()).then(|| License {
            name: license.name.clone().unwrap_or_default(),
            url: license.url.clone(),
        }),
    }
}

pub(crate) fn tags(doc: &Document) -> Vec<Tag> {
    doc.tags
        .iter()
        .map(|t| Tag {
            name: t.name.clone(),
            description: t.description.clone(),
        })
        .collect()
}

/// One server per scheme; a host given with its scheme is taken as is.
fn servers(doc: &Document) -> Vec<Server> {
    let Some(host) = doc.host.as_deref() else {
        return doc
            .base_path
            .iter()
            .map(|base| Server { url: base.clone() })
            .collect();
    };
    let base = doc.base_path.as_deref().unwrap_or_default();
    if host.contains("://") {
        return vec![Server {
            url: format!("{}{}", host, base),
        }];
    }
    if doc.schemes.is_empty() {
        return vec![Server {
            url: format!("//{}{}", host, base),
        }];
    }
    doc.schemes
        .iter()
        .map(|scheme| Server {
            url: format!("{}://{}{}", scheme, host, base),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Operation as DocOperation, Parameter as DocParameter, Permission as DocPermission};
    use crate::schema::{ObjectSchema, PropertySchema};
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};

    fn param(name: &str, location: ParameterLocation, schema: SchemaNode) -> DocParameter {
        DocParameter {
            name: name.to_string(),
            location,
            required: true,
            description: None,
            default: None,
            schema,
        }
    }

    fn render(doc: &Document) -> Value {
        serde_json::to_value(OpenApiBuilder::new(doc).build()).unwrap()
    }

    fn sample() -> Document {
        let mut doc = Document::default();
        doc.info.title = "Items".to_string();
        doc.info.version = "1.0".to_string();
        doc.host = Some("api.example.com".to_string());
        doc.base_path = Some("/v1".to_string());
        doc.schemes = vec!["https".to_string(), "http".to_string()];

        let mut op = DocOperation {
            operation_id: "items.get".to_string(),
            tags: vec!["items".to_string()],
            ..DocOperation::default()
        };
        op.parameters.push(DocParameter {
            default: Some(json!(1)),
            ..param("id", ParameterLocation::Path, SchemaNode::primitive("integer", "int32"))
        });
        op.responses.insert(
            "200".to_string(),
            document::Response {
                description: "ok".to_string(),
                schema: Some(SchemaNode::reference("Item")),
            },
        );
        op.responses.insert(
            "404".to_string(),
            document::Response {
                description: String::new(),
                schema: None,
            },
        );
        doc.register("/items/{id}", HttpMethod::Get, op);

        let mut item = ObjectSchema {
            title: "Item".to_string(),
            ..ObjectSchema::default()
        };
        item.properties
            .insert("id".to_string(), PropertySchema::new(SchemaNode::primitive("integer", "int32")));
        doc.definitions.insert("Item".to_string(), item);
        doc
    }

    #[test]
    fn test_document_layout() {
        let value = render(&sample());
        assert_eq!(value["openapi"], "3.0.0");
        assert_eq!(
            value["servers"],
            json!([{"url": "https://api.example.com/v1"}, {"url": "http://api.example.com/v1"}])
        );
        assert_eq!(
            value["paths"]["/items/{id}"]["get"],
            json!({
                "tags": ["items"],
                "operationId": "items.get",
                "parameters": [{
                    "name": "id",
                    "in": "path",
                    "required": true,
                    "schema": {"type": "integer", "format": "int32", "default": 1}
                }],
                "responses": {
                    "200": {
                        "description": "ok",
                        "content": {"application/json": {"schema": {"$ref": "#/components/schemas/Item"}}}
                    },
                    "404": {"description": ""}
                }
            })
        );
        assert_eq!(
            value["components"]["schemas"]["Item"],
            json!({"type": "object", "title": "Item", "properties": {"id": {"type": "integer", "format": "int32"}}})
        );
        assert!(value.get("swagger").is_none());
    }

    #[test]
    fn test_empty_fields_are_omitted() {
        let value = render(&Document::default());
        let object = value.as_object().unwrap();
        assert!(!object.contains_key("servers"));
        assert!(!object.contains_key("tags"));
        assert!(!object.contains_key("components"));
        assert_eq!(value["info"], json!({"title": "", "version": ""}));
    }

    #[test]
    fn test_body_uses_consumes() {
        let mut doc = Document::default();
        doc.consumes = vec!["application/xml".to_string()];
        let op = DocOperation {
            operation_id: "items.create".to_string(),
            request_body: Some(DocParameter {
                description: Some("the item".to_string()),
                ..param("item", ParameterLocation::Body, SchemaNode::reference("Item"))
            }),
            permissions: vec![DocPermission {
                resource: "item".to_string(),
                action: "create".to_string(),
            }],
            deprecated: true,
            ..DocOperation::default()
        };
        doc.register("/items", HttpMethod::Post, op);

        let post = &render(&doc)["paths"]["/items"]["post"];
        assert_eq!(
            post["requestBody"],
            json!({
                "description": "the item",
                "required": true,
                "content": {"application/xml": {"schema": {"$ref": "#/components/schemas/Item"}}}
            })
        );
        assert_eq!(post["deprecated"], true);
        assert_eq!(post["x-permissions"], json!([{"resource": "item", "action": "create"}]));
    }

    #[test]
    fn test_form_parameters_become_request_body() {
        let mut doc = Document::default();
        let op = DocOperation {
            operation_id: "files.upload".to_string(),
            parameters: vec![
                param("file", ParameterLocation::FormData, SchemaNode::primitive("file", "")),
                DocParameter {
                    required: false,
                    ..param("note", ParameterLocation::FormData, SchemaNode::primitive("string", ""))
                },
                param("X-Trace", ParameterLocation::Header, SchemaNode::primitive("string", "")),
            ],
            ..DocOperation::default()
        };
        doc.register("/upload", HttpMethod::Post, op);

        let post = &render(&doc)["paths"]["/upload"]["post"];
        assert_eq!(post["parameters"].as_array().unwrap().len(), 1);
        assert_eq!(
            post["requestBody"],
            json!({
                "required": true,
                "content": {"multipart/form-data": {"schema": {
                    "type": "object",
                    "properties": {
                        "file": {"type": "string", "format": "binary"},
                        "note": {"type": "string"}
                    },
                    "required": ["file"]
                }}}
            })
        );
    }

    #[test]
    fn test_servers_without_schemes() {
        let mut doc = Document::default();
        doc.host = Some("localhost:3000".to_string());
        assert_eq!(servers(&doc), vec![Server { url: "//localhost:3000".to_string() }]);

        doc.host = Some("http://127.0.0.1:3000".to_string());
        doc.base_path = Some("/api".to_string());
        assert_eq!(servers(&doc), vec![Server { url: "http://127.0.0.1:3000/api".to_string() }]);
    }
}
