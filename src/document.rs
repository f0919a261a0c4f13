//! Format-neutral API document assembled from the annotations.

use crate::error::Error;
use crate::schema::{ObjectSchema, SchemaNode};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::fmt;

/// HTTP verbs an operation can be bound to, in output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HttpMethod {
    Get,
    Put,
    Post,
    Delete,
    Options,
    Head,
    Patch,
}

impl HttpMethod {
    /// Case-insensitive parse of a verb.
    pub fn parse(verb: &str) -> Option<Self> {
        let method = match verb.to_ascii_uppercase().as_str() {
            "GET" => HttpMethod::Get,
            "PUT" => HttpMethod::Put,
            "POST" => HttpMethod::Post,
            "DELETE" => HttpMethod::Delete,
            "OPTIONS" => HttpMethod::Options,
            "HEAD" => HttpMethod::Head,
            "PATCH" => HttpMethod::Patch,
            _ => return None,
        };
        Some(method)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Put => "PUT",
            HttpMethod::Post => "POST",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Options => "OPTIONS",
            HttpMethod::Head => "HEAD",
            HttpMethod::Patch => "PATCH",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a parameter is carried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterLocation {
    Query,
    Header,
    Path,
    Cookie,
    FormData,
    Body,
}

impl ParameterLocation {
    /// Parses an `@Param` location token; `form` is accepted for `formData`.
    pub fn parse(name: &str, token: &str) -> Result<Self, Error> {
        match token {
            "query" => Ok(ParameterLocation::Query),
            "header" => Ok(ParameterLocation::Header),
            "path" => Ok(ParameterLocation::Path),
            "cookie" => Ok(ParameterLocation::Cookie),
            "formData" | "form" => Ok(ParameterLocation::FormData),
            "body" => Ok(ParameterLocation::Body),
            other => Err(Error::UnknownLocation {
                name: name.to_string(),
                location: other.to_string(),
            }),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ParameterLocation::Query => "query",
            ParameterLocation::Header => "header",
            ParameterLocation::Path => "path",
            ParameterLocation::Cookie => "cookie",
            ParameterLocation::FormData => "formData",
            ParameterLocation::Body => "body",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub location: ParameterLocation,
    pub required: bool,
    pub description: Option<String>,
    pub default: Option<Value>,
    pub schema: SchemaNode,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub description: String,
    /// `None` for responses without a body.
    pub schema: Option<SchemaNode>,
}

/// An `@Permission resource action` requirement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Permission {
    pub resource: String,
    pub action: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Operation {
    pub operation_id: String,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub deprecated: bool,
    pub consumes: Vec<String>,
    pub produces: Vec<String>,
    /// Every parameter except the request body.
    pub parameters: Vec<Parameter>,
    /// The single `body` parameter.
    pub request_body: Option<Parameter>,
    pub responses: BTreeMap<String, Response>,
    pub permissions: Vec<Permission>,
}

impl Operation {
    pub fn has_file_parameter(&self) -> bool {
        self.parameters.iter().any(|p| p.schema.is_file())
    }
}

/// Operations registered under one path template.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PathItem {
    pub operations: BTreeMap<HttpMethod, Operation>,
}

impl PathItem {
    pub fn get(&self, method: HttpMethod) -> Option<&Operation> {
        self.operations.get(&method)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Contact {
    pub name: Option<String>,
    pub url: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct License {
    pub name: Option<String>,
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Info {
    pub title: String,
    pub version: String,
    pub description: Option<String>,
    pub terms_of_service: Option<String>,
    pub contact: Contact,
    pub license: License,
}

/// API grouping contributed by a controller.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Tag {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Document {
    pub info: Info,
    pub host: Option<String>,
    pub base_path: Option<String>,
    pub schemes: Vec<String>,
    pub consumes: Vec<String>,
    pub produces: Vec<String>,
    pub tags: Vec<Tag>,
    pub paths: BTreeMap<String, PathItem>,
    pub definitions: BTreeMap<String, ObjectSchema>,
}

impl Document {
    /// Registers an operation under `(path, method)`, returning the
    /// operation it displaced, if any.
    pub fn register(&mut self, path: &str, method: HttpMethod, operation: Operation) -> Option<Operation> {
        self.paths
            .entry(path.to_string())
            .or_default()
            .operations
            .insert(method, operation)
    }

    pub fn operation(&self, path: &str, method: HttpMethod) -> Option<&Operation> {
        self.paths.get(path)?.get(method)
    }

    /// Makes `candidate` unique among operation ids already registered,
    /// ignoring the operation at `(path, method)` that is about to be replaced.
    pub fn unique_operation_id(&self, candidate: &str, path: &str, method: HttpMethod) -> String {
        let taken: HashSet<&str> = self
            .paths
            .iter()
            .flat_map(|(p, item)| {
                item.operations
                    .iter()
                    .filter(move |(m, _)| !(p == path && **m == method))
                    .map(|(_, op)| op.operation_id.as_str())
            })
            .collect();
        if !taken.contains(candidate) {
            return candidate.to_string();
        }
        (1..)
            .map(|n| format!("{}_{}", candidate, n))
            .find(|id| !taken.contains(id.as_str()))
            .unwrap_or_else(|| candidate.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn op(id: &str) -> Operation {
        Operation {
            operation_id: id.to_string(),
            ..Operation::default()
        }
    }

    #[test]
    fn test_http_method_parse() {
        assert_eq!(HttpMethod::parse("get"), Some(HttpMethod::Get));
        assert_eq!(HttpMethod::parse("PATCH"), Some(HttpMethod::Patch));
        assert_eq!(HttpMethod::parse("FETCH"), None);
        assert_eq!(HttpMethod::Delete.to_string(), "DELETE");
    }

    #[test]
    fn test_location_parse() {
        assert_eq!(ParameterLocation::parse("a", "form").unwrap(), ParameterLocation::FormData);
        assert_eq!(ParameterLocation::parse("a", "body").unwrap(), ParameterLocation::Body);
        let err = ParameterLocation::parse("id", "nowhere").unwrap_err();
        assert!(err.to_string().contains("`id`"));
    }

    #[test]
    fn test_register_returns_displaced() {
        let mut doc = Document::default();
        assert!(doc.register("/x", HttpMethod::Post, op("a.x")).is_none());
        let displaced = doc.register("/x", HttpMethod::Post, op("b.x")).unwrap();
        assert_eq!(displaced.operation_id, "a.x");
        assert_eq!(doc.operation("/x", HttpMethod::Post).unwrap().operation_id, "b.x");
        assert!(doc.register("/x", HttpMethod::Get, op("c.x")).is_none());
        assert_eq!(doc.paths["/x"].operations.len(), 2);
    }

    #[test]
    fn test_unique_operation_id() {
        let mut doc = Document::default();
        doc.register("/a", HttpMethod::Get, op("t.get"));
        doc.register("/b", HttpMethod::Get, op("t.get_1"));

        assert_eq!(doc.unique_operation_id("t.get", "/c", HttpMethod::Get), "t.get_2");
        assert_eq!(doc.unique_operation_id("t.other", "/c", HttpMethod::Get), "t.other");
        // the operation being replaced does not count
        assert_eq!(doc.unique_operation_id("t.get", "/a", HttpMethod::Get), "t.get");
    }
}
