//! Document assembly.
//!
//! The entry file's comment groups carry the document-level tags and each
//! of its imports names a package scanned for controllers.

use crate::annotation::{content_types, join_line, read_tags, Tag};
use crate::controller::{discover, ControllerBuilder};
use crate::document::Document;
use crate::go_ast::SourceFile;
use crate::locator::PackageLocator;
use crate::parser::GoParser;
use crate::type_resolver::TypeResolver;
use crate::warning::Warning;
use anyhow::{Context, Result};
use log::{debug, info};
use std::path::Path;

#[derive(Debug, Clone, Default)]
pub struct GeneratorConfig {
    /// Keep `@Private` and `@Permission` operations.
    pub dev_mode: bool,
}

/// The outcome of one run: the document and every soft warning raised.
#[derive(Debug)]
pub struct Generation {
    pub document: Document,
    pub warnings: Vec<Warning>,
}

pub struct Generator<'a> {
    locator: &'a dyn PackageLocator,
    config: GeneratorConfig,
}

impl<'a> Generator<'a> {
    pub fn new(locator: &'a dyn PackageLocator, config: GeneratorConfig) -> Self {
        Self { locator, config }
    }

    /// Parses the entry file and generates the document from it.
    pub fn generate_from_file(&self, path: &Path) -> Result<Generation> {
        info!("Parsing entry file {}", path.display());
        let entry = GoParser::parse_file(path)?;
        self.generate(&entry)
    }

    /// Generates the document for an already parsed entry file. Each run
    /// starts with empty package and definition caches.
    pub fn generate(&self, entry: &SourceFile) -> Result<Generation> {
        let mut document = Document::default();
        for group in &entry.comment_groups {
            apply_document_tags(&mut document, group)
                .with_context(|| format!("in document tags of {}", entry.path.display()))?;
        }

        let mut resolver = TypeResolver::new(self.locator);
        let mut warnings = Vec::new();
        {
            let mut builder = ControllerBuilder::new(&mut resolver, self.config.dev_mode);
            for import in &entry.imports {
                if self.locator.is_standard(&import.path) {
                    debug!("Skipping standard package {}", import.path);
                    continue;
                }
                info!("Scanning package {}", import.path);
                let package = builder
                    .resolver()
                    .package(&import.path)
                    .with_context(|| format!("importing {} from {}", import.path, entry.path.display()))?;
                let controllers = discover(&package);
                debug!("{} controllers in {}", controllers.len(), import.path);
                for controller in &controllers {
                    builder.build(&package, controller, &mut document)?;
                }
            }
            warnings.extend(builder.take_warnings());
        }
        warnings.extend(resolver.take_warnings());
        document.definitions = resolver.into_definitions();

        info!(
            "Generated {} paths and {} definitions with {} warnings",
            document.paths.len(),
            document.definitions.len(),
            warnings.len()
        );
        Ok(Generation { document, warnings })
    }
}

fn apply_document_tags(document: &mut Document, text: &str) -> Result<()> {
    for line in read_tags(text) {
        let value = line.value;
        match line.tag {
            Tag::Version => document.info.version = value,
            Tag::Title => document.info.title = value,
            Tag::Description => {
                join_line(document.info.description.get_or_insert_with(String::new), &value)
            }
            Tag::TermsOfServiceUrl => document.info.terms_of_service = Some(value),
            Tag::Contact => document.info.contact.email = Some(value),
            Tag::Name => document.info.contact.name = Some(value),
            Tag::Url => document.info.contact.url = Some(value),
            Tag::License => document.info.license.name = Some(value),
            Tag::LicenseUrl => document.info.license.url = Some(value),
            Tag::Schemes => document.schemes.extend(
                value
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string),
            ),
            Tag::Host => document.host = Some(value),
            Tag::BasePath => document.base_path = Some(value),
            Tag::Consumes => document.consumes.extend(content_types(&value)?),
            Tag::Produces => document.produces.extend(content_types(&value)?),
            _ => {}
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::HttpMethod;
    use crate::error::Error;
    use crate::locator::MemoryLocator;
    use crate::schema::SchemaNode;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    const ENTRY: &str = r#"// @Version 1.0.0
// @Title Backend API
// @Description API usually works as expected.
// @Description But sometimes it does not.
// @Contact api@example.com
// @Name Api Team
// @URL http://example.com
// @License MIT
// @LicenseUrl http://opensource.org/licenses/MIT
// @Schemes http,wss
// @Host 127.0.0.1:3000
// @BasePath /api
// @Consumes json,xml
// @Produces json
package main

import (
	_ "example.com/app/api"
)

func main() {}
"#;

    const API: &str = r#"package api

// @Name testapi
// @Description test endpoints
type Controller struct{}

// @Title getItem
// @Param id path int true "item id"
// @Success 200 string "ok"
// @Router GET /items/{id}
func (c *Controller) GetItem() {}
"#;

    fn entry() -> SourceFile {
        GoParser::parse_source(PathBuf::from("main.go"), ENTRY).unwrap()
    }

    #[test]
    fn test_document_tags() {
        let mut locator = MemoryLocator::new();
        locator.add_file("example.com/app/api", "api.go", API);
        let generation = Generator::new(&locator, GeneratorConfig::default())
            .generate(&entry())
            .unwrap();
        let doc = generation.document;

        assert_eq!(doc.info.version, "1.0.0");
        assert_eq!(doc.info.title, "Backend API");
        assert_eq!(
            doc.info.description.as_deref(),
            Some("API usually works as expected.<br>But sometimes it does not.")
        );
        assert_eq!(doc.info.contact.email.as_deref(), Some("api@example.com"));
        assert_eq!(doc.info.contact.name.as_deref(), Some("Api Team"));
        assert_eq!(doc.info.contact.url.as_deref(), Some("http://example.com"));
        assert_eq!(doc.info.license.name.as_deref(), Some("MIT"));
        assert_eq!(
            doc.info.license.url.as_deref(),
            Some("http://opensource.org/licenses/MIT")
        );
        assert_eq!(doc.schemes, vec!["http", "wss"]);
        assert_eq!(doc.host.as_deref(), Some("127.0.0.1:3000"));
        assert_eq!(doc.base_path.as_deref(), Some("/api"));
        assert_eq!(doc.consumes, vec!["application/json", "application/xml"]);
        assert_eq!(doc.produces, vec!["application/json"]);
    }

    #[test]
    fn test_end_to_end_operation() {
        let mut locator = MemoryLocator::new();
        locator.add_file("example.com/app/api", "api.go", API);
        let generation = Generator::new(&locator, GeneratorConfig::default())
            .generate(&entry())
            .unwrap();
        assert!(generation.warnings.is_empty());

        let doc = generation.document;
        assert_eq!(doc.tags.len(), 1);
        assert_eq!(doc.tags[0].name, "testapi");

        let op = doc.operation("/items/{id}", HttpMethod::Get).unwrap();
        assert_eq!(op.tags, vec!["testapi"]);
        assert_eq!(op.parameters.len(), 1);
        assert_eq!(op.parameters[0].name, "id");
        assert!(op.parameters[0].required);
        assert_eq!(op.parameters[0].schema, SchemaNode::primitive("integer", "int32"));
        assert_eq!(op.responses["200"].schema, Some(SchemaNode::primitive("string", "")));
    }

    #[test]
    fn test_missing_import_aborts() {
        let locator = MemoryLocator::new();
        let err = Generator::new(&locator, GeneratorConfig::default())
            .generate(&entry())
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::PackageNotFound(p)) if p == "example.com/app/api"
        ));
        assert!(format!("{:#}", err).contains("main.go"));
    }

    #[test]
    fn test_unknown_document_content_type() {
        let source = "// @Consumes yaml\npackage main\n";
        let entry = GoParser::parse_source(PathBuf::from("main.go"), source).unwrap();
        let locator = MemoryLocator::new();
        let err = Generator::new(&locator, GeneratorConfig::default())
            .generate(&entry)
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::UnknownContentType(t)) if t == "yaml"
        ));
    }
}
