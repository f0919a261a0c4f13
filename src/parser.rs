use crate::annotation::comment_text;
use crate::error::Error;
use crate::go_ast::{FieldDecl, FuncDecl, ImportSpec, SourceFile, TypeDecl, TypeExpr};
use anyhow::{Context, Result};
use log::debug;
use std::fs;
use std::path::{Path, PathBuf};
use tree_sitter::{Node, Parser};

/// Parser for Go source files.
///
/// The `GoParser` runs the tree-sitter Go grammar over a file and lowers the
/// syntax tree into the [`SourceFile`] model: package clause, imports, type
/// declarations, functions and methods together with their doc comments.
///
/// # Example
///
/// ```no_run
/// use openapi_from_annotations::parser::GoParser;
/// use std::path::Path;
///
/// let file = GoParser::parse_file(Path::new("pkg/api/api.go")).unwrap();
/// println!("package {} declares {} types", file.package, file.types.len());
/// ```
pub struct GoParser;

impl GoParser {
    /// Reads and parses a single Go source file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or contains syntax errors.
    pub fn parse_file(path: &Path) -> Result<SourceFile> {
        debug!("Parsing file: {}", path.display());

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read file: {}", path.display()))?;

        Self::parse_source(path.to_path_buf(), &content)
    }

    /// Parses Go source text that came from `path`.
    pub fn parse_source(path: PathBuf, content: &str) -> Result<SourceFile> {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_go::LANGUAGE.into())
            .context("Failed to load the Go grammar")?;

        let tree = parser
            .parse(content, None)
            .ok_or_else(|| Error::MalformedSource(path.clone()))?;
        let root = tree.root_node();
        if root.has_error() {
            return Err(Error::MalformedSource(path).into());
        }

        let mut file = SourceFile {
            path,
            ..SourceFile::default()
        };
        let lower = Lowering { src: content };

        let mut cursor = root.walk();
        let children: Vec<Node> = root.children(&mut cursor).collect();
        for (idx, node) in children.iter().enumerate() {
            match node.kind() {
                "package_clause" => {
                    if let Some(name) = node.named_child(0) {
                        file.package = lower.text(name).to_string();
                    }
                }
                "import_declaration" => lower.imports(*node, &mut file.imports),
                "type_declaration" => {
                    let doc = lower.doc_before(&children, idx);
                    lower.type_declaration(*node, doc, &mut file.types);
                }
                "function_declaration" | "method_declaration" => {
                    let doc = lower.doc_before(&children, idx);
                    file.funcs.push(lower.func(*node, doc));
                }
                _ => {}
            }
        }
        file.comment_groups = lower.comment_groups(&children);

        debug!(
            "Parsed {}: package {}, {} imports, {} types, {} funcs",
            file.path.display(),
            file.package,
            file.imports.len(),
            file.types.len(),
            file.funcs.len()
        );
        Ok(file)
    }
}

struct Lowering<'a> {
    src: &'a str,
}

impl<'a> Lowering<'a> {
    fn text(&self, node: Node) -> &'a str {
        &self.src[node.byte_range()]
    }

    /// Doc comment group ending on the line right above `siblings[idx]`.
    fn doc_before(&self, siblings: &[Node], idx: usize) -> Option<String> {
        let mut start_row = siblings[idx].start_position().row;
        let mut texts = Vec::new();
        let mut i = idx;
        while i > 0 {
            let prev = siblings[i - 1];
            if prev.kind() != "comment" || prev.end_position().row + 1 < start_row {
                break;
            }
            // a comment trailing code on the same line belongs to that code
            if i >= 2 {
                let before = siblings[i - 2];
                if before.kind() != "comment" && before.end_position().row == prev.start_position().row {
                    break;
                }
            }
            texts.push(self.text(prev));
            start_row = prev.start_position().row;
            i -= 1;
        }
        if texts.is_empty() {
            return None;
        }
        texts.reverse();
        Some(comment_text(&texts))
    }

    fn comment_groups(&self, siblings: &[Node]) -> Vec<String> {
        let mut groups = Vec::new();
        let mut current: Vec<&str> = Vec::new();
        let mut last_row = 0;
        for node in siblings {
            if node.kind() != "comment" {
                if !current.is_empty() {
                    groups.push(comment_text(&current));
                    current.clear();
                }
                continue;
            }
            if !current.is_empty() && node.start_position().row > last_row + 1 {
                groups.push(comment_text(&current));
                current.clear();
            }
            current.push(self.text(*node));
            last_row = node.end_position().row;
        }
        if !current.is_empty() {
            groups.push(comment_text(&current));
        }
        groups
    }

    fn imports(&self, decl: Node, out: &mut Vec<ImportSpec>) {
        let mut cursor = decl.walk();
        for child in decl.named_children(&mut cursor) {
            match child.kind() {
                "import_spec" => out.extend(self.import_spec(child)),
                "import_spec_list" => {
                    let mut inner = child.walk();
                    for spec in child.named_children(&mut inner) {
                        if spec.kind() == "import_spec" {
                            out.extend(self.import_spec(spec));
                        }
                    }
                }
                _ => {}
            }
        }
    }

    fn import_spec(&self, spec: Node) -> Option<ImportSpec> {
        let path = spec.child_by_field_name("path")?;
        Some(ImportSpec {
            name: spec
                .child_by_field_name("name")
                .map(|n| self.text(n).to_string()),
            path: unquote(self.text(path)),
        })
    }

    fn type_declaration(&self, decl: Node, outer_doc: Option<String>, out: &mut Vec<TypeDecl>) {
        let mut cursor = decl.walk();
        let children: Vec<Node> = decl.named_children(&mut cursor).collect();
        let specs = children
            .iter()
            .filter(|c| matches!(c.kind(), "type_spec" | "type_alias"))
            .count();

        for (idx, spec) in children.iter().enumerate() {
            if !matches!(spec.kind(), "type_spec" | "type_alias") {
                continue;
            }
            let (Some(name), Some(ty)) = (
                spec.child_by_field_name("name"),
                spec.child_by_field_name("type"),
            ) else {
                continue;
            };
            let doc = self
                .doc_before(&children, idx)
                .or_else(|| (specs == 1).then(|| outer_doc.clone()).flatten());
            out.push(TypeDecl {
                name: self.text(name).to_string(),
                ty: self.type_expr(ty),
                doc,
            });
        }
    }

    fn func(&self, node: Node, doc: Option<String>) -> FuncDecl {
        let receiver = node.child_by_field_name("receiver").and_then(|params| {
            let mut cursor = params.walk();
            let decl = params
                .named_children(&mut cursor)
                .find(|c| c.kind() == "parameter_declaration")?;
            decl.child_by_field_name("type")
                .map(|ty| self.receiver_name(ty))
        });
        FuncDecl {
            receiver,
            name: node
                .child_by_field_name("name")
                .map(|n| self.text(n).to_string())
                .unwrap_or_default(),
            doc,
        }
    }

    fn receiver_name(&self, ty: Node) -> String {
        match ty.kind() {
            "pointer_type" | "parenthesized_type" => ty
                .named_child(0)
                .map(|inner| self.receiver_name(inner))
                .unwrap_or_default(),
            "generic_type" => ty
                .child_by_field_name("type")
                .map(|inner| self.text(inner).to_string())
                .unwrap_or_default(),
            _ => self.text(ty).to_string(),
        }
    }

    fn type_expr(&self, node: Node) -> TypeExpr {
        match node.kind() {
            "type_identifier" if self.text(node) == "any" => TypeExpr::Interface,
            "type_identifier" => TypeExpr::Named(self.text(node).to_string()),
            "qualified_type" => {
                match (node.child_by_field_name("package"), node.child_by_field_name("name")) {
                    (Some(package), Some(name)) => TypeExpr::Qualified {
                        package: self.text(package).to_string(),
                        name: self.text(name).to_string(),
                    },
                    _ => TypeExpr::Unsupported(self.text(node).to_string()),
                }
            }
            "pointer_type" | "parenthesized_type" => match node.named_child(0) {
                Some(inner) if node.kind() == "pointer_type" => {
                    TypeExpr::Pointer(Box::new(self.type_expr(inner)))
                }
                Some(inner) => self.type_expr(inner),
                None => TypeExpr::Unsupported(self.text(node).to_string()),
            },
            "slice_type" | "array_type" | "implicit_length_array_type" => {
                match node.child_by_field_name("element") {
                    Some(element) => TypeExpr::Array(Box::new(self.type_expr(element))),
                    None => TypeExpr::Unsupported(self.text(node).to_string()),
                }
            }
            "map_type" => match (node.child_by_field_name("key"), node.child_by_field_name("value")) {
                (Some(key), Some(value)) => TypeExpr::Map {
                    key: Box::new(self.type_expr(key)),
                    value: Box::new(self.type_expr(value)),
                },
                _ => TypeExpr::Unsupported(self.text(node).to_string()),
            },
            "interface_type" => TypeExpr::Interface,
            "struct_type" => TypeExpr::Struct(self.fields(node)),
            _ => TypeExpr::Unsupported(self.text(node).to_string()),
        }
    }

    fn fields(&self, struct_node: Node) -> Vec<FieldDecl> {
        let mut fields = Vec::new();
        let mut cursor = struct_node.walk();
        let Some(list) = struct_node
            .named_children(&mut cursor)
            .find(|c| c.kind() == "field_declaration_list")
        else {
            return fields;
        };

        let mut list_cursor = list.walk();
        for decl in list.named_children(&mut list_cursor) {
            if decl.kind() != "field_declaration" {
                continue;
            }
            let Some(ty) = decl.child_by_field_name("type") else {
                continue;
            };
            let mut name_cursor = decl.walk();
            let names = decl
                .children_by_field_name("name", &mut name_cursor)
                .map(|n| self.text(n).to_string())
                .collect();
            fields.push(FieldDecl {
                names,
                ty: self.type_expr(ty),
                tag: decl
                    .child_by_field_name("tag")
                    .map(|t| unquote(self.text(t))),
            });
        }
        fields
    }
}

/// Strips Go string quoting from a raw or interpreted string literal.
fn unquote(literal: &str) -> String {
    if let Some(raw) = literal.strip_prefix('`').and_then(|s| s.strip_suffix('`')) {
        return raw.to_string();
    }
    let Some(inner) = literal.strip_prefix('"').and_then(|s| s.strip_suffix('"')) else {
        return literal.to_string();
    };
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some(other) => out.push(other),
                None => {}
            }
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn parse(src: &str) -> SourceFile {
        GoParser::parse_source(PathBuf::from("test.go"), src).unwrap()
    }

    #[test]
    fn test_parse_file_from_disk() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("api.go");
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(b"package api\n\ntype Item struct {\n\tID int\n}\n")
            .unwrap();

        let parsed = GoParser::parse_file(&path).unwrap();
        assert_eq!(parsed.path, path);
        assert_eq!(parsed.package, "api");
        assert_eq!(parsed.types[0].name, "Item");
    }

    #[test]
    fn test_parse_file_missing() {
        let result = GoParser::parse_file(Path::new("/nonexistent/file.go"));
        assert!(result.is_err());
    }

    #[test]
    fn test_syntax_error_is_malformed_source() {
        let err = GoParser::parse_source(PathBuf::from("bad.go"), "package x\nfunc {{{").unwrap_err();
        assert!(matches!(err.downcast_ref::<Error>(), Some(Error::MalformedSource(_))));
    }

    #[test]
    fn test_imports() {
        let file = parse(
            r#"package main

import "fmt"

import (
	_ "example.com/app/api"
	. "example.com/app/models"
	m "example.com/app/more"
)
"#,
        );
        assert_eq!(file.imports.len(), 4);
        assert_eq!(file.imports[0], ImportSpec { name: None, path: "fmt".into() });
        assert!(file.imports[1].is_blank());
        assert!(file.imports[2].is_dot());
        assert_eq!(file.imports[3].name.as_deref(), Some("m"));
        assert_eq!(file.imports[3].path, "example.com/app/more");
    }

    #[test]
    fn test_struct_fields_and_tags() {
        let file = parse(
            r#"package api

type Item struct {
	Base
	*Audit
	ID, Rank int `json:"id"`
	Tags []string
	Meta map[string]*other.Meta "json:\"meta\""
	Any interface{}
	Inner struct {
		Flag bool
	}
}
"#,
        );
        let TypeExpr::Struct(fields) = &file.types[0].ty else {
            panic!("expected struct");
        };
        assert_eq!(fields.len(), 7);
        assert!(fields[0].is_embedded());
        assert_eq!(fields[0].ty, TypeExpr::Named("Base".into()));
        assert!(fields[1].is_embedded());
        assert_eq!(fields[2].names, vec!["ID", "Rank"]);
        assert_eq!(fields[2].tag.as_deref(), Some(r#"json:"id""#));
        assert_eq!(fields[3].ty.to_string(), "[]string");
        assert_eq!(fields[4].ty.to_string(), "map[string]*other.Meta");
        assert_eq!(fields[4].tag.as_deref(), Some(r#"json:"meta""#));
        assert_eq!(fields[5].ty, TypeExpr::Interface);
        assert!(matches!(fields[6].ty, TypeExpr::Struct(_)));
    }

    #[test]
    fn test_doc_comments_attach_to_declarations() {
        let file = parse(
            r#"package api

// Unrelated comment

// ItemController handles items
// @Name items
type ItemController struct{}

// List lists items
// @Router GET /items
func (c *ItemController) List() {}

func (c ItemController) hidden() {}
"#,
        );
        let doc = file.types[0].doc.as_deref().unwrap();
        assert_eq!(doc, "ItemController handles items\n@Name items");
        assert_eq!(file.funcs.len(), 2);
        assert_eq!(file.funcs[0].receiver.as_deref(), Some("ItemController"));
        assert_eq!(file.funcs[0].name, "List");
        assert!(file.funcs[0].doc.as_deref().unwrap().contains("@Router GET /items"));
        assert_eq!(file.funcs[1].receiver.as_deref(), Some("ItemController"));
        assert!(file.funcs[1].doc.is_none());
    }

    #[test]
    fn test_grouped_type_declaration() {
        let file = parse(
            r#"package api

type (
	// A is first
	A struct{}
	B = A
)
"#,
        );
        assert_eq!(file.types.len(), 2);
        assert_eq!(file.types[0].doc.as_deref(), Some("A is first"));
        assert_eq!(file.types[1].ty, TypeExpr::Named("A".into()));
        assert!(file.types[1].doc.is_none());
    }

    #[test]
    fn test_comment_groups() {
        let file = parse(
            r#"// @Version 1.0.0
// @Title Demo
package main

// @Host example.com

import _ "example.com/api"
"#,
        );
        assert_eq!(
            file.comment_groups,
            vec!["@Version 1.0.0\n@Title Demo", "@Host example.com"]
        );
    }

    #[test]
    fn test_unquote() {
        assert_eq!(unquote("`a:\"b\"`"), "a:\"b\"");
        assert_eq!(unquote(r#""a:\"b\"""#), "a:\"b\"");
        assert_eq!(unquote(r#""example.com/x""#), "example.com/x");
    }
}
