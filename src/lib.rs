//! OpenAPI from annotations - Swagger 2.0 / OpenAPI 3.0 documents from
//! annotated Go controllers.
//!
//! The generator statically reads Go sources: an entry file whose comments
//! carry document-level tags (`@Title`, `@Version`, `@Host`, ...) and whose
//! imports name the controller packages. Controllers are struct types with a
//! tagged doc comment; their tagged methods (`@Router`, `@Param`,
//! `@Success`, ...) become operations. Types named in `@Param` and
//! `@Success`/`@Failure` are resolved across packages into schema
//! definitions. Nothing is compiled or executed.
//!
//! # Architecture
//!
//! 1. [`locator`] - Finds and parses the package behind an import path
//!    ([`scanner`] lists its files, [`parser`] lowers them into [`go_ast`])
//! 2. [`annotation`] - Reads `@Tag value` lines out of doc comments
//! 3. [`type_resolver`] - Resolves type expressions into [`schema`] nodes and
//!    named definitions, reading field tags through [`struct_tag`]
//! 4. [`operation_builder`] - Turns one method doc comment into an operation
//! 5. [`controller`] - Discovers controllers and registers their operations
//! 6. [`generator`] - Assembles the [`document`] from an entry file
//! 7. [`openapi_builder`] / [`swagger_builder`] - Render the document as
//!    OpenAPI 3.0 or Swagger 2.0, with [`schema_generator`] for schemas
//! 8. [`serializer`] - Serializes the rendered document to YAML or JSON
//!
//! Hard errors are [`error::Error`] values wrapped in `anyhow` context; soft
//! problems are collected as [`warning::Warning`]s.
//!
//! # Example Usage
//!
//! ```no_run
//! use openapi_from_annotations::{
//!     generator::{Generator, GeneratorConfig},
//!     locator::{FsLocator, LocatorConfig},
//!     openapi_builder::OpenApiBuilder,
//!     serializer::serialize_yaml,
//! };
//! use std::path::{Path, PathBuf};
//!
//! let locator = FsLocator::new(LocatorConfig {
//!     project_root: PathBuf::from("."),
//!     go_paths: vec![PathBuf::from("/home/me/go")],
//!     ..LocatorConfig::default()
//! })
//! .unwrap();
//!
//! let generation = Generator::new(&locator, GeneratorConfig::default())
//!     .generate_from_file(Path::new("swagger.go"))
//!     .unwrap();
//! for warning in &generation.warnings {
//!     eprintln!("{}", warning);
//! }
//!
//! let yaml = serialize_yaml(&OpenApiBuilder::new(&generation.document).build()).unwrap();
//! println!("{}", yaml);
//! ```
//!
//! # Command-Line Interface
//!
//! For command-line usage, see the [`cli`] module.

pub mod annotation;
pub mod cli;
pub mod controller;
pub mod document;
pub mod error;
pub mod generator;
pub mod go_ast;
pub mod locator;
pub mod openapi_builder;
pub mod operation_builder;
pub mod parser;
pub mod scanner;
pub mod schema;
pub mod schema_generator;
pub mod serializer;
pub mod struct_tag;
pub mod swagger_builder;
pub mod type_resolver;
pub mod warning;
