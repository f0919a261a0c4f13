use crate::annotation::{content_types, join_line, parse_bool, read_tags, split_args, Tag, TagLine};
use crate::document::{HttpMethod, Operation, Parameter, ParameterLocation, Permission, Response};
use crate::error::Error;
use crate::type_resolver::{Scope, TypeResolver};
use crate::warning::Warning;
use anyhow::{Context, Result};
use log::debug;

const FORM_MEDIA_TYPES: [&str; 2] = ["application/x-www-form-urlencoded", "multipart/form-data"];

/// Where an annotated method lives, for lookups and messages.
pub struct MethodSite<'s> {
    pub scope: &'s Scope,
    /// Receiver type name; `None` for free functions.
    pub controller: Option<&'s str>,
    pub method: &'s str,
    /// Tag name operations are grouped under.
    pub tag_name: &'s str,
}

impl MethodSite<'_> {
    /// `file:Controller.Method` (or `file:Method`).
    pub fn context(&self) -> String {
        let file = self
            .scope
            .file
            .file_name()
            .map(|f| f.to_string_lossy().to_string())
            .unwrap_or_default();
        match self.controller {
            Some(controller) => format!("{}:{}.{}", file, controller, self.method),
            None => format!("{}:{}", file, self.method),
        }
    }
}

/// An operation together with the route it is bound to.
#[derive(Debug, Clone)]
pub struct RoutedOperation {
    pub path: String,
    pub method: HttpMethod,
    pub operation: Operation,
}

/// Builds operations from method doc comments.
pub struct OperationBuilder<'r, 'a> {
    resolver: &'r mut TypeResolver<'a>,
    dev_mode: bool,
    warnings: Vec<Warning>,
}

impl<'r, 'a> OperationBuilder<'r, 'a> {
    pub fn new(resolver: &'r mut TypeResolver<'a>, dev_mode: bool) -> Self {
        Self {
            resolver,
            dev_mode,
            warnings: Vec::new(),
        }
    }

    pub fn take_warnings(&mut self) -> Vec<Warning> {
        std::mem::take(&mut self.warnings)
    }

    pub fn resolver(&mut self) -> &mut TypeResolver<'a> {
        self.resolver
    }

    /// Builds the operation described by one method's doc comment.
    ///
    /// Returns `Ok(None)` when the comment has no `@Router`, or when the
    /// method is `@Private`/`@Permission`-gated and the run is not in
    /// development mode. Gated methods are still fully parsed so their
    /// errors surface.
    pub fn build(&mut self, site: &MethodSite, doc: &str) -> Result<Option<RoutedOperation>> {
        let mut operation = Operation {
            tags: vec![site.tag_name.to_string()],
            ..Operation::default()
        };
        let mut route: Option<(HttpMethod, String)> = None;
        let mut titled = false;
        let mut gated = false;
        let mut extra_bodies = 0usize;

        for line in read_tags(doc) {
            self.apply(site, &line, &mut operation, &mut route, &mut titled, &mut gated, &mut extra_bodies)
                .with_context(|| format!("({}) in `{}`", site.context(), line.raw))?;
        }

        let Some((method, path)) = route else {
            debug!("{} has no @Router, skipped", site.context());
            return Ok(None);
        };

        if !titled {
            operation.operation_id = format!("{}.{}", site.tag_name, site.method);
            self.warn(site, "no @Title given, operationId derived from the method name");
        }
        self.check_parameters(site, &mut operation, extra_bodies);

        if gated && !self.dev_mode {
            debug!("{} is private, left out of the document", site.context());
            return Ok(None);
        }

        Ok(Some(RoutedOperation {
            path,
            method,
            operation,
        }))
    }

    #[allow(clippy::too_many_arguments)]
    fn apply(
        &mut self,
        site: &MethodSite,
        line: &TagLine,
        operation: &mut Operation,
        route: &mut Option<(HttpMethod, String)>,
        titled: &mut bool,
        gated: &mut bool,
        extra_bodies: &mut usize,
    ) -> Result<()> {
        match line.tag {
            Tag::Title => {
                operation.operation_id = format!("{}.{}", site.tag_name, line.value);
                *titled = true;
            }
            Tag::Summary => join_line(operation.summary.get_or_insert_with(String::new), &line.value),
            Tag::Description => {
                join_line(operation.description.get_or_insert_with(String::new), &line.value)
            }
            Tag::Deprecated => {
                operation.deprecated = line.value.is_empty()
                    || parse_bool(&line.value).ok_or_else(|| Error::BadValue {
                        what: "@Deprecated".to_string(),
                        value: line.value.clone(),
                    })?;
            }
            Tag::Consumes => operation.consumes.extend(content_types(&line.value)?),
            Tag::Produces => operation.produces.extend(content_types(&line.value)?),
            Tag::Router => *route = Some(parse_router(&line.value)?),
            Tag::Private => *gated = true,
            Tag::Permission => {
                let parts: Vec<&str> = line.value.split_whitespace().collect();
                let [resource, action] = parts[..] else {
                    return Err(Error::BadArity {
                        tag: "@Permission".to_string(),
                        expected: "resource and action".to_string(),
                        got: parts.len(),
                        line: line.raw.clone(),
                    }
                    .into());
                };
                operation.permissions.push(Permission {
                    resource: resource.to_string(),
                    action: action.to_string(),
                });
                *gated = true;
            }
            Tag::Param => {
                let param = self.parameter(site, line)?;
                if param.location == ParameterLocation::Body {
                    // the first body parameter wins
                    if operation.request_body.is_some() {
                        *extra_bodies += 1;
                    } else {
                        operation.request_body = Some(param);
                    }
                } else {
                    operation.parameters.push(param);
                }
            }
            Tag::Success | Tag::Failure => {
                let (code, response) = self.response(site, line)?;
                operation.responses.insert(code, response);
            }
            _ => {}
        }
        Ok(())
    }

    /// `name location type required-or-dash [description-or-dash [default-or-dash]]`
    fn parameter(&mut self, site: &MethodSite, line: &TagLine) -> Result<Parameter> {
        let tokens = split_args(&line.value);
        if tokens.len() < 4 {
            return Err(Error::BadArity {
                tag: "@Param".to_string(),
                expected: "at least 4 arguments".to_string(),
                got: tokens.len(),
                line: line.raw.clone(),
            }
            .into());
        }
        let name = tokens[0].clone();
        let location = ParameterLocation::parse(&name, &tokens[1])?;
        let type_name = &tokens[2];

        let schema = self.resolver.resolve_str(site.scope, type_name)?;
        if location != ParameterLocation::Body && !schema.is_simple() {
            return Err(Error::UnsupportedParameterSchema {
                schema: type_name.clone(),
                location: location.as_str().to_string(),
            }
            .into());
        }

        let required = match tokens[3].as_str() {
            "-" => false,
            flag => parse_bool(flag).ok_or_else(|| Error::BadValue {
                what: format!("required flag of parameter `{}`", name),
                value: flag.to_string(),
            })?,
        };
        let description = tokens
            .get(4)
            .filter(|d| !d.is_empty() && d.as_str() != "-")
            .cloned();
        let default = match tokens.get(5).filter(|d| d.as_str() != "-") {
            Some(raw) => Some(schema.convert_literal(raw).map_err(|cause| Error::BadDefault {
                field: name.clone(),
                ty: type_name.clone(),
                value: raw.clone(),
                cause,
            })?),
            None => None,
        };

        Ok(Parameter {
            name,
            location,
            required,
            description,
            default,
            schema,
        })
    }

    /// `code type-or-dash [description]`
    fn response(&mut self, site: &MethodSite, line: &TagLine) -> Result<(String, Response)> {
        let tokens = split_args(&line.value);
        if !(2..=3).contains(&tokens.len()) {
            return Err(Error::BadArity {
                tag: if line.tag == Tag::Success { "@Success" } else { "@Failure" }.to_string(),
                expected: "code, type and description".to_string(),
                got: tokens.len(),
                line: line.raw.clone(),
            }
            .into());
        }
        let schema = match tokens[1].as_str() {
            "-" => None,
            type_name => Some(self.resolver.resolve_str(site.scope, type_name)?),
        };
        Ok((
            tokens[0].clone(),
            Response {
                description: tokens.get(2).cloned().unwrap_or_default(),
                schema,
            },
        ))
    }

    fn check_parameters(&mut self, site: &MethodSite, operation: &mut Operation, extra_bodies: usize) {
        if extra_bodies > 0 {
            let kept = operation
                .request_body
                .as_ref()
                .map(|b| b.name.clone())
                .unwrap_or_default();
            self.warn(
                site,
                format!("more than one body parameter, keeping `{}` and ignoring the rest", kept),
            );
        }

        let mut corrected = Vec::new();
        for param in operation.parameters.iter_mut() {
            if param.location == ParameterLocation::Path && !param.required {
                param.required = true;
                corrected.push(param.name.clone());
            }
        }
        for name in corrected {
            self.warn(site, format!("path parameter `{}` must be required", name));
        }

        let has_body = operation.request_body.is_some();
        let has_form = operation
            .parameters
            .iter()
            .any(|p| p.location == ParameterLocation::FormData);
        if has_body && has_form {
            self.warn(site, "body and formData parameters cannot coexist");
        }

        if operation.has_file_parameter() {
            if has_body {
                self.warn(site, "file parameters cannot coexist with a body parameter");
            }
            let form_consumes = operation
                .consumes
                .iter()
                .all(|c| FORM_MEDIA_TYPES.contains(&c.as_str()));
            let form_located = operation
                .parameters
                .iter()
                .filter(|p| p.schema.is_file())
                .all(|p| p.location == ParameterLocation::FormData);
            if !form_consumes || !form_located {
                self.warn(site, "file parameters must be formData and consumes must be form or formData");
            }
        }
    }

    fn warn(&mut self, site: &MethodSite, message: impl Into<String>) {
        self.warnings.push(Warning::emit(site.context(), message));
    }
}

/// `VERB path`, `path [verb]`, `path verb` or just `path` (GET).
fn parse_router(value: &str) -> Result<(HttpMethod, String)> {
    let parts: Vec<&str> = value.split_whitespace().collect();
    let bad = || Error::BadRouter(value.to_string());
    let (method, path) = match parts[..] {
        [path] => (HttpMethod::Get, path),
        [first, second] if first.starts_with('/') => {
            let verb = second.trim_start_matches('[').trim_end_matches(']');
            (HttpMethod::parse(verb).ok_or_else(bad)?, first)
        }
        [verb, path] => (HttpMethod::parse(verb).ok_or_else(bad)?, path),
        _ => return Err(bad().into()),
    };
    if !path.starts_with('/') {
        return Err(bad().into());
    }
    Ok((method, path.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locator::MemoryLocator;
    use crate::schema::SchemaNode;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    const API: &str = "example.com/app/api";
    const MODELS: &str = r#"package api

type Item struct {
	ID   int    `json:"id"`
	Name string `json:"name"`
}
"#;

    struct Fixture {
        locator: MemoryLocator,
    }

    impl Fixture {
        fn new() -> Self {
            let mut locator = MemoryLocator::new();
            locator.add_file(API, "api.go", MODELS);
            Self { locator }
        }

        fn build(&self, doc: &str, dev_mode: bool) -> (Result<Option<RoutedOperation>>, Vec<Warning>) {
            let mut resolver = TypeResolver::new(&self.locator);
            let package = resolver.package(API).unwrap();
            let file = package.files[0].path.clone();
            let scope = Scope::new(package, &file);
            let site = MethodSite {
                scope: &scope,
                controller: Some("ItemController"),
                method: "Get",
                tag_name: "items",
            };
            let mut builder = OperationBuilder::new(&mut resolver, dev_mode);
            let result = builder.build(&site, doc);
            let warnings = builder.take_warnings();
            (result, warnings)
        }
    }

    fn built(doc: &str) -> (RoutedOperation, Vec<Warning>) {
        let (result, warnings) = Fixture::new().build(doc, false);
        (result.unwrap().unwrap(), warnings)
    }

    #[test]
    fn test_basic_operation() {
        let (routed, warnings) = built(
            r#"@Title getItem
@Summary Get an item
@Summary by id
@Description Looks up one item
@Param id path int true "Item ID" 123
@Success 200 Item "the item"
@Failure 404 - "not found"
@Router GET /items/{id}"#,
        );
        assert!(warnings.is_empty());
        assert_eq!(routed.method, HttpMethod::Get);
        assert_eq!(routed.path, "/items/{id}");

        let op = routed.operation;
        assert_eq!(op.operation_id, "items.getItem");
        assert_eq!(op.tags, vec!["items"]);
        assert_eq!(op.summary.as_deref(), Some("Get an item<br>by id"));
        assert_eq!(op.description.as_deref(), Some("Looks up one item"));

        let id = &op.parameters[0];
        assert_eq!(id.name, "id");
        assert_eq!(id.location, ParameterLocation::Path);
        assert!(id.required);
        assert_eq!(id.description.as_deref(), Some("Item ID"));
        assert_eq!(id.default, Some(json!(123)));
        assert_eq!(id.schema, SchemaNode::primitive("integer", "int32"));

        assert_eq!(op.responses["200"].schema, Some(SchemaNode::reference("Item")));
        assert_eq!(op.responses["200"].description, "the item");
        assert_eq!(op.responses["404"].schema, None);
    }

    #[test]
    fn test_no_router_is_skipped() {
        let (result, _) = Fixture::new().build("@Title nothing\n@Summary no route", false);
        assert!(result.unwrap().is_none());
    }

    #[test]
    fn test_default_operation_id_warns() {
        let (routed, warnings) = built("@Router /items");
        assert_eq!(routed.method, HttpMethod::Get);
        assert_eq!(routed.operation.operation_id, "items.Get");
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn test_path_parameter_is_forced_required() {
        let (routed, warnings) = built("@Title get\n@Param id path int false \"id\"\n@Router GET /items/{id}");
        assert!(routed.operation.parameters[0].required);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].message.contains("`id`"));

        let (routed, warnings) = built("@Title get\n@Param id path int - \"id\"\n@Router GET /items/{id}");
        assert!(routed.operation.parameters[0].required);
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn test_first_body_parameter_wins() {
        let (routed, warnings) = built(
            r#"@Title create
@Param item body Item true "the item"
@Param other body Item false "ignored"
@Param third body Item false "ignored too"
@Router POST /items"#,
        );
        let body = routed.operation.request_body.unwrap();
        assert_eq!(body.name, "item");
        assert!(body.required);
        assert_eq!(body.description.as_deref(), Some("the item"));
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].message.contains("more than one body"));
    }

    #[test]
    fn test_body_and_form_coexistence_warns() {
        let (_, warnings) = built(
            "@Title create\n@Param item body Item true \"\"\n@Param name formData string true \"\"\n@Router POST /items",
        );
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].message.contains("cannot coexist"));
    }

    #[test]
    fn test_file_parameter_content_type() {
        let (routed, warnings) = built(
            "@Title upload\n@Param f form file true \"the file\"\n@Consumes formData\n@Router POST /upload",
        );
        assert!(warnings.is_empty());
        assert_eq!(routed.operation.consumes, vec!["multipart/form-data"]);

        let (_, warnings) = built(
            "@Title upload\n@Param f formData file true \"\"\n@Consumes json\n@Router POST /upload",
        );
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn test_object_outside_body_is_an_error() {
        let (result, _) = Fixture::new().build("@Param q query Item true \"\"\n@Router GET /items", false);
        let err = result.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::UnsupportedParameterSchema { location, .. }) if location == "query"
        ));

        let (result, _) =
            Fixture::new().build("@Param tags query []string false \"\"\n@Router GET /items", false);
        assert!(result.is_ok());
    }

    #[test]
    fn test_too_few_param_tokens() {
        let (result, _) = Fixture::new().build("@Param id path int\n@Router GET /items/{id}", false);
        let err = result.unwrap_err();
        assert!(matches!(err.downcast_ref::<Error>(), Some(Error::BadArity { got: 3, .. })));
        let chain = format!("{:#}", err);
        assert!(chain.contains("api.go:ItemController.Get"));
        assert!(chain.contains("@Param id path int"));
    }

    #[test]
    fn test_unknown_location() {
        let (result, _) = Fixture::new().build("@Param id nowhere int true\n@Router GET /x", false);
        assert!(matches!(
            result.unwrap_err().downcast_ref::<Error>(),
            Some(Error::UnknownLocation { name, .. }) if name == "id"
        ));
    }

    #[test]
    fn test_response_arity() {
        let (result, _) = Fixture::new().build("@Success 200 string \"ok\" extra\n@Router GET /x", false);
        assert!(matches!(result.unwrap_err().downcast_ref::<Error>(), Some(Error::BadArity { .. })));
    }

    #[test]
    fn test_bad_param_default() {
        let (result, _) = Fixture::new().build("@Param n query int false \"n\" abc\n@Router GET /x", false);
        assert!(matches!(
            result.unwrap_err().downcast_ref::<Error>(),
            Some(Error::BadDefault { field, .. }) if field == "n"
        ));
    }

    #[test]
    fn test_private_is_gated_by_dev_mode() {
        let doc = "@Title secret\n@Private\n@Router GET /secret";
        let (result, _) = Fixture::new().build(doc, false);
        assert!(result.unwrap().is_none());

        let (result, _) = Fixture::new().build(doc, true);
        assert!(result.unwrap().is_some());

        // still parsed: errors surface outside development mode too
        let (result, _) = Fixture::new().build("@Private\n@Param x query Missing true\n@Router GET /s", false);
        assert!(result.is_err());
    }

    #[test]
    fn test_permission() {
        let (result, _) = Fixture::new().build("@Title p\n@Permission member get\n@Router GET /p", true);
        let op = result.unwrap().unwrap().operation;
        assert_eq!(
            op.permissions,
            vec![Permission {
                resource: "member".to_string(),
                action: "get".to_string()
            }]
        );

        let (result, _) = Fixture::new().build("@Permission member\n@Router GET /p", true);
        assert!(result.is_err());
    }

    #[test]
    fn test_deprecated() {
        let (routed, _) = built("@Title d\n@Deprecated\n@Router GET /d");
        assert!(routed.operation.deprecated);
        let (routed, _) = built("@Title d\n@Deprecated false\n@Router GET /d");
        assert!(!routed.operation.deprecated);
    }

    #[test]
    fn test_parse_router_forms() {
        assert_eq!(parse_router("get /a").unwrap(), (HttpMethod::Get, "/a".to_string()));
        assert_eq!(parse_router("/a [post]").unwrap(), (HttpMethod::Post, "/a".to_string()));
        assert_eq!(parse_router("/a delete").unwrap(), (HttpMethod::Delete, "/a".to_string()));
        assert_eq!(parse_router("/a").unwrap(), (HttpMethod::Get, "/a".to_string()));
        assert!(parse_router("").is_err());
        assert!(parse_router("FETCH /a").is_err());
        assert!(parse_router("GET a").is_err());
        assert!(parse_router("GET /a extra").is_err());
    }
}
