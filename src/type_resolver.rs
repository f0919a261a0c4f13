use crate::error::Error;
use crate::go_ast::{FieldDecl, SourceFile, TypeDecl, TypeExpr};
use crate::locator::{Package, PackageCache, PackageLocator};
use crate::schema::{builtin, ObjectSchema, PropertySchema, SchemaNode};
use crate::struct_tag::FieldDirectives;
use crate::warning::Warning;
use anyhow::{anyhow, Context, Result};
use log::debug;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// Where a type expression appears: the package and the file whose imports
/// apply.
#[derive(Debug, Clone)]
pub struct Scope {
    pub package: Rc<Package>,
    pub file: PathBuf,
}

impl Scope {
    pub fn new(package: Rc<Package>, file: &Path) -> Self {
        Self {
            package,
            file: file.to_path_buf(),
        }
    }

    fn source(&self) -> Result<&SourceFile> {
        self.package.file(&self.file).ok_or_else(|| {
            anyhow!(
                "file {} is not part of package {}",
                self.file.display(),
                self.package.import_path
            )
        })
    }
}

/// Run-scoped table of named struct definitions.
///
/// Maps a `(type name, import path)` pair to its definition key. The first
/// package keeps the bare name, later packages get the first free
/// `Name_k`. A key is never handed out twice, even when a package declares
/// a type literally named `Name_k`. An entry is registered before its
/// fields are resolved so self-referential structs find it and stop.
#[derive(Debug, Default)]
pub struct DefinitionCache {
    keys: HashMap<(String, String), String>,
    taken: HashSet<String>,
    pending: HashSet<String>,
    definitions: BTreeMap<String, ObjectSchema>,
}

impl DefinitionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Canonical key for `name` declared in `import_path`, and whether the
    /// pair was already claimed.
    pub fn claim(&mut self, name: &str, import_path: &str) -> (String, bool) {
        if let Some(key) = self.existing_key(name, import_path) {
            return (key, true);
        }
        let key = if self.taken.contains(name) {
            (1..)
                .map(|k| format!("{}_{}", name, k))
                .find(|candidate| !self.taken.contains(candidate))
                .unwrap_or_default()
        } else {
            name.to_string()
        };
        self.taken.insert(key.clone());
        self.keys
            .insert((name.to_string(), import_path.to_string()), key.clone());
        self.pending.insert(key.clone());
        (key, false)
    }

    /// Stores the finished definition for a claimed key.
    pub fn finish(&mut self, key: &str, definition: ObjectSchema) {
        self.pending.remove(key);
        self.definitions.insert(key.to_string(), definition);
    }

    /// Key of a pair already claimed, without claiming it.
    fn existing_key(&self, name: &str, import_path: &str) -> Option<String> {
        self.keys
            .get(&(name.to_string(), import_path.to_string()))
            .cloned()
    }

    pub fn is_pending(&self, key: &str) -> bool {
        self.pending.contains(key)
    }

    pub fn get(&self, key: &str) -> Option<&ObjectSchema> {
        self.definitions.get(key)
    }

    pub fn definitions(&self) -> &BTreeMap<String, ObjectSchema> {
        &self.definitions
    }
}

/// Resolves Go type expressions into [`SchemaNode`]s.
///
/// Named structs become definitions in the [`DefinitionCache`] and are
/// returned as references; anonymous structs and embedded members are
/// returned inline.
pub struct TypeResolver<'a> {
    packages: PackageCache<'a>,
    cache: DefinitionCache,
    /// Non-struct named types and embedded members currently being expanded
    expanding: Vec<(String, String)>,
    warnings: Vec<Warning>,
}

impl<'a> TypeResolver<'a> {
    pub fn new(locator: &'a dyn PackageLocator) -> Self {
        Self {
            packages: PackageCache::new(locator),
            cache: DefinitionCache::new(),
            expanding: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Locates a package through the run's package cache.
    pub fn package(&mut self, import_path: &str) -> Result<Rc<Package>> {
        self.packages.get(import_path)
    }

    pub fn definitions(&self) -> &BTreeMap<String, ObjectSchema> {
        self.cache.definitions()
    }

    pub fn into_definitions(self) -> BTreeMap<String, ObjectSchema> {
        self.cache.definitions
    }

    pub fn take_warnings(&mut self) -> Vec<Warning> {
        std::mem::take(&mut self.warnings)
    }

    /// Resolves a type written in an annotation, e.g. `[]models.Item`.
    pub fn resolve_str(&mut self, scope: &Scope, schema: &str) -> Result<SchemaNode> {
        self.resolve(scope, &TypeExpr::parse_str(schema))
            .with_context(|| format!("resolving `{}` in {}", schema, scope.file.display()))
    }

    pub fn resolve(&mut self, scope: &Scope, expr: &TypeExpr) -> Result<SchemaNode> {
        self.resolve_expr(scope, expr, false)
    }

    fn resolve_expr(&mut self, scope: &Scope, expr: &TypeExpr, embedded: bool) -> Result<SchemaNode> {
        match expr {
            TypeExpr::Pointer(inner) => self.resolve_expr(scope, inner, embedded),
            TypeExpr::Named(_) | TypeExpr::Qualified { .. } => {
                if let Some(node) = builtin(&expr.to_string()) {
                    return Ok(node);
                }
                self.resolve_declared(scope, expr, embedded)
            }
            TypeExpr::Array(item) => Ok(SchemaNode::Array(Box::new(
                self.resolve_expr(scope, item, false)?,
            ))),
            TypeExpr::Map { key, value } => {
                let key_node = self.resolve_expr(scope, key, false)?;
                if !matches!(&key_node, SchemaNode::Primitive { name, .. } if name == "string") {
                    return Err(Error::UnsupportedMapKey {
                        key: key.to_string(),
                    }
                    .into());
                }
                Ok(SchemaNode::Map(Box::new(self.resolve_expr(scope, value, false)?)))
            }
            TypeExpr::Interface => Ok(SchemaNode::Interface),
            TypeExpr::Struct(fields) => Ok(SchemaNode::Object(self.build_object(scope, "", fields)?)),
            TypeExpr::Unsupported(raw) => Err(Error::UnsupportedTypeExpr(raw.clone()).into()),
        }
    }

    fn resolve_declared(&mut self, scope: &Scope, expr: &TypeExpr, embedded: bool) -> Result<SchemaNode> {
        let (target, decl) = self.lookup(scope, expr)?;
        let import_path = target.package.import_path.clone();
        let id = (import_path.clone(), decl.name.clone());

        match &decl.ty {
            TypeExpr::Struct(fields) if embedded => {
                if self.expanding.contains(&id) {
                    self.warnings.push(Warning::emit(
                        scope.file.display().to_string(),
                        format!("embedded type {} refers back to itself, skipped", decl.name),
                    ));
                    return Ok(SchemaNode::Object(ObjectSchema::default()));
                }
                if let Some(done) = self
                    .cache
                    .existing_key(&decl.name, &import_path)
                    .and_then(|key| self.cache.get(&key))
                {
                    return Ok(SchemaNode::Object(done.clone()));
                }
                self.expanding.push(id);
                let object = self.build_object(&target, &decl.name, fields);
                self.expanding.pop();
                Ok(SchemaNode::Object(object?))
            }
            TypeExpr::Struct(fields) => {
                let (key, known) = self.cache.claim(&decl.name, &import_path);
                if known {
                    debug!("Reusing definition {} for {}.{}", key, import_path, decl.name);
                    return Ok(SchemaNode::reference(&key));
                }
                debug!("Resolving struct {}.{} as {}", import_path, decl.name, key);
                let object = self
                    .build_object(&target, &decl.name, fields)
                    .with_context(|| format!("in struct {}.{}", target.package.name, decl.name))?;
                self.cache.finish(&key, object);
                Ok(SchemaNode::reference(&key))
            }
            other => {
                if self.expanding.contains(&id) {
                    return Err(Error::UnsupportedTypeExpr(format!(
                        "recursive type {}.{}",
                        target.package.name, decl.name
                    ))
                    .into());
                }
                self.expanding.push(id);
                let node = self.resolve_expr(&target, other, embedded);
                self.expanding.pop();
                node
            }
        }
    }

    /// Finds the declaration a named or qualified identifier refers to.
    fn lookup(&mut self, scope: &Scope, expr: &TypeExpr) -> Result<(Scope, TypeDecl)> {
        let unresolved = || Error::UnresolvedType {
            file: scope.file.clone(),
            package: scope.package.import_path.clone(),
            schema: expr.to_string(),
        };
        let imports = scope.source()?.imports.clone();

        match expr {
            TypeExpr::Named(name) => {
                if let Some((file, decl)) = scope.package.find_type(name) {
                    return Ok((Scope::new(Rc::clone(&scope.package), &file.path), decl.clone()));
                }
                // dot imports bring exported names into the file scope
                for import in imports.iter().filter(|i| i.is_dot()) {
                    let package = self
                        .packages
                        .get(&import.path)
                        .with_context(|| unresolved().to_string())?;
                    if let Some((file, decl)) = package.find_type(name) {
                        let found = (Scope::new(Rc::clone(&package), &file.path), decl.clone());
                        return Ok(found);
                    }
                }
                Err(unresolved().into())
            }
            TypeExpr::Qualified { package: qualifier, name } => {
                let mut candidates: Vec<&str> = Vec::new();
                if let Some(aliased) = imports
                    .iter()
                    .find(|i| i.name.as_deref() == Some(qualifier.as_str()))
                {
                    candidates.push(&aliased.path);
                }
                let unaliased: Vec<&str> = imports
                    .iter()
                    .filter(|i| i.name.is_none())
                    .map(|i| i.path.as_str())
                    .collect();
                // the last path element is the usual package name, try it first
                candidates.extend(
                    unaliased
                        .iter()
                        .filter(|p| p.rsplit('/').next() == Some(qualifier.as_str())),
                );
                candidates.extend(
                    unaliased
                        .iter()
                        .filter(|p| p.rsplit('/').next() != Some(qualifier.as_str())),
                );

                for (idx, path) in candidates.iter().enumerate() {
                    let is_alias = idx == 0
                        && imports
                            .iter()
                            .any(|i| i.path == *path && i.name.as_deref() == Some(qualifier.as_str()));
                    let package = match self.packages.get(path) {
                        Ok(package) => package,
                        Err(e) if is_alias => {
                            return Err(e.context(unresolved().to_string()));
                        }
                        Err(e) => {
                            debug!("Skipping import {}: {:#}", path, e);
                            continue;
                        }
                    };
                    if !is_alias && package.name != *qualifier {
                        continue;
                    }
                    return match package.find_type(name) {
                        Some((file, decl)) => {
                            Ok((Scope::new(Rc::clone(&package), &file.path), decl.clone()))
                        }
                        None => Err(unresolved().into()),
                    };
                }
                Err(unresolved().into())
            }
            _ => Err(unresolved().into()),
        }
    }

    /// Builds the object schema of a struct's fields, flattening embedded
    /// members. Own fields win over embedded ones; among embedded members
    /// the first declaration wins.
    fn build_object(&mut self, scope: &Scope, title: &str, fields: &[FieldDecl]) -> Result<ObjectSchema> {
        let mut object = ObjectSchema {
            title: title.to_string(),
            ..ObjectSchema::default()
        };
        let mut promoted: HashSet<String> = HashSet::new();

        for field in fields {
            let source_name = field
                .names
                .first()
                .cloned()
                .unwrap_or_else(|| embedded_name(&field.ty));
            let directives = match &field.tag {
                Some(tag) => FieldDirectives::parse(&source_name, tag)?,
                None => FieldDirectives::default(),
            };
            if directives.ignore {
                continue;
            }

            if field.is_embedded() && directives.name.is_none() {
                let member = self
                    .resolve_expr(scope, &field.ty, true)
                    .with_context(|| format!("embedded field {}", field.ty))?;
                if let SchemaNode::Object(inner) = member {
                    if inner.reference.is_none() {
                        for (key, property) in inner.properties {
                            if object.properties.contains_key(&key) {
                                continue;
                            }
                            if inner.required.contains(&key) {
                                object.required.push(key.clone());
                            }
                            promoted.insert(key.clone());
                            object.properties.insert(key, property);
                        }
                        continue;
                    }
                }
            }

            let schema = self
                .resolve_expr(scope, &field.ty, false)
                .with_context(|| format!("field {}", source_name))?;
            let one_of = match &directives.one_of {
                Some(alt) => Some(self.resolve_str(scope, alt)?),
                None => None,
            };

            let names = if field.names.is_empty() {
                vec![source_name.clone()]
            } else {
                field.names.clone()
            };
            for name in names {
                let primary = directives.name.clone().unwrap_or(name);
                let default = directives
                    .default
                    .as_deref()
                    .map(|raw| {
                        schema.convert_literal(raw).map_err(|cause| Error::BadDefault {
                            field: primary.clone(),
                            ty: field.ty.to_string(),
                            value: raw.to_string(),
                            cause,
                        })
                    })
                    .transpose()?;

                let property = PropertySchema {
                    schema: match &one_of {
                        Some(alt) => SchemaNode::OneOf(vec![schema.clone(), alt.clone()]),
                        None => schema.clone(),
                    },
                    description: directives.description.clone(),
                    default,
                    deprecated: false,
                };

                if !insert_own(&mut object, &mut promoted, &primary, property.clone()) {
                    continue;
                }
                if directives.required && !object.required.contains(&primary) {
                    object.required.push(primary.clone());
                }

                for alternate in &directives.alternate_names {
                    let superseded = PropertySchema {
                        description: Some(format!("superseded by `{}`", primary)),
                        deprecated: true,
                        ..property.clone()
                    };
                    let inserted = insert_own(&mut object, &mut promoted, alternate, superseded);
                    if inserted && directives.required && !object.required.contains(alternate) {
                        object.required.push(alternate.clone());
                    }
                }
            }
        }

        Ok(object)
    }
}

/// Inserts an own property. It replaces a promoted (embedded) property of
/// the same name in place but never an earlier own one.
fn insert_own(
    object: &mut ObjectSchema,
    promoted: &mut HashSet<String>,
    name: &str,
    property: PropertySchema,
) -> bool {
    if object.properties.contains_key(name) {
        if !promoted.remove(name) {
            return false;
        }
        object.required.retain(|r| r != name);
    }
    object.properties.insert(name.to_string(), property);
    true
}

/// Field name Go gives an embedded member: the bare type name.
fn embedded_name(ty: &TypeExpr) -> String {
    match ty {
        TypeExpr::Pointer(inner) => embedded_name(inner),
        TypeExpr::Qualified { name, .. } => name.clone(),
        other => other.to_string(),
    }
}
