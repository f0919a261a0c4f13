//! Controller discovery and the controller/tag builder.
//!
//! A controller is a struct type whose doc comment carries tags, or that
//! receives tagged methods, plus those methods. Tagged methods whose
//! receiver is not declared in the package, and tagged free functions,
//! form "no-struct" controllers.

use crate::annotation::{is_doc_block, join_line, read_tags, Tag as TagKeyword};
use crate::document::{Document, Tag};
use crate::go_ast::TypeExpr;
use crate::locator::Package;
use crate::operation_builder::{MethodSite, OperationBuilder, RoutedOperation};
use crate::type_resolver::{Scope, TypeResolver};
use crate::warning::Warning;
use anyhow::{Context, Result};
use log::{debug, info};
use std::collections::HashSet;
use std::path::PathBuf;
use std::rc::Rc;

#[derive(Debug, Clone)]
pub struct Controller {
    /// Struct name, or the receiver name for no-struct controllers.
    pub name: String,
    pub doc: Option<String>,
    pub no_struct: bool,
    pub methods: Vec<Method>,
}

#[derive(Debug, Clone)]
pub struct Method {
    pub name: String,
    pub file: PathBuf,
    pub doc: String,
    pub free_function: bool,
}

/// Finds the controllers of a package in declaration order.
pub fn discover(package: &Package) -> Vec<Controller> {
    let mut controllers: Vec<Controller> = Vec::new();
    let receivers: HashSet<&str> = package
        .files
        .iter()
        .flat_map(|file| &file.funcs)
        .filter(|func| func.doc.as_deref().is_some_and(is_doc_block))
        .filter_map(|func| func.receiver.as_deref())
        .collect();

    for file in &package.files {
        for decl in &file.types {
            if !matches!(decl.ty, TypeExpr::Struct(_)) {
                continue;
            }
            let doc = decl.doc.as_deref().filter(|d| is_doc_block(d));
            if doc.is_none() && !receivers.contains(decl.name.as_str()) {
                continue;
            }
            controllers.push(Controller {
                name: decl.name.clone(),
                doc: doc.map(str::to_string),
                no_struct: false,
                methods: Vec::new(),
            });
        }
    }

    for file in &package.files {
        for func in &file.funcs {
            let Some(doc) = func.doc.as_deref().filter(|d| is_doc_block(d)) else {
                continue;
            };
            // free functions share one controller named after the package
            let owner = func.receiver.clone().unwrap_or_else(|| package.name.clone());
            let method = Method {
                name: func.name.clone(),
                file: file.path.clone(),
                doc: doc.to_string(),
                free_function: func.receiver.is_none(),
            };
            match controllers
                .iter_mut()
                .find(|c| c.name == owner && (c.no_struct || func.receiver.is_some()))
            {
                Some(controller) => controller.methods.push(method),
                None => controllers.push(Controller {
                    name: owner,
                    doc: None,
                    no_struct: true,
                    methods: vec![method],
                }),
            }
        }
    }

    controllers
}

/// Builds tags and operations for controllers and registers them into a
/// document.
pub struct ControllerBuilder<'r, 'a> {
    operations: OperationBuilder<'r, 'a>,
    warnings: Vec<Warning>,
}

impl<'r, 'a> ControllerBuilder<'r, 'a> {
    pub fn new(resolver: &'r mut TypeResolver<'a>, dev_mode: bool) -> Self {
        Self {
            operations: OperationBuilder::new(resolver, dev_mode),
            warnings: Vec::new(),
        }
    }

    pub fn resolver(&mut self) -> &mut TypeResolver<'a> {
        self.operations.resolver()
    }

    pub fn take_warnings(&mut self) -> Vec<Warning> {
        let mut warnings = std::mem::take(&mut self.warnings);
        warnings.extend(self.operations.take_warnings());
        warnings
    }

    /// Builds one controller: its tag (if it has one) and every routed
    /// method, registered into `document`.
    pub fn build(&mut self, package: &Rc<Package>, controller: &Controller, document: &mut Document) -> Result<()> {
        let mut tag = Tag::default();
        let mut description = String::new();
        for line in read_tags(controller.doc.as_deref().unwrap_or_default()) {
            match line.tag {
                TagKeyword::Name => tag.name = line.value,
                TagKeyword::Description => join_line(&mut description, &line.value),
                _ => {}
            }
        }
        if !description.is_empty() {
            tag.description = Some(description);
        }

        let tag_name = if !tag.name.is_empty() {
            tag.name.clone()
        } else if controller.no_struct {
            package.name.clone()
        } else {
            controller.name.clone()
        };
        if !controller.no_struct || !tag.name.is_empty() {
            tag.name = tag_name.clone();
            if !document.tags.iter().any(|t| t.name == tag.name) {
                document.tags.push(tag);
            }
        }
        info!(
            "Building controller {} ({} methods) as tag {}",
            controller.name,
            controller.methods.len(),
            tag_name
        );

        for method in &controller.methods {
            let scope = Scope::new(Rc::clone(package), &method.file);
            let site = MethodSite {
                scope: &scope,
                controller: (!method.free_function).then_some(controller.name.as_str()),
                method: &method.name,
                tag_name: &tag_name,
            };
            let routed = self
                .operations
                .build(&site, &method.doc)
                .with_context(|| format!("in controller {} of package {}", controller.name, package.import_path))?;
            if let Some(routed) = routed {
                self.register(&site, routed, document);
            }
        }
        Ok(())
    }

    fn register(&mut self, site: &MethodSite, routed: RoutedOperation, document: &mut Document) {
        let RoutedOperation {
            path,
            method,
            mut operation,
        } = routed;

        let unique = document.unique_operation_id(&operation.operation_id, &path, method);
        if unique != operation.operation_id {
            self.warnings.push(Warning::emit(
                site.context(),
                format!(
                    "operationId `{}` is already used, renamed to `{}`",
                    operation.operation_id, unique
                ),
            ));
            operation.operation_id = unique;
        }

        debug!("Registering {} {} as {}", method, path, operation.operation_id);
        if let Some(displaced) = document.register(&path, method, operation) {
            let owner = displaced.tags.first().cloned().unwrap_or_default();
            self.warnings.push(Warning::emit(
                site.context(),
                format!(
                    "route {} {} already registered by controller `{}`, overwritten",
                    method, path, owner
                ),
            ));
        }
    }
}
