//! Source model for Go packages.
//!
//! Only the declarations the generator needs survive lowering: the package
//! clause, imports, type declarations, function and method declarations and
//! their doc comments. Type expressions are a closed variant so the resolver
//! can match on them in one place.

use std::fmt;
use std::path::PathBuf;

/// One parsed `.go` file.
#[derive(Debug, Clone, Default)]
pub struct SourceFile {
    pub path: PathBuf,
    /// Declared package name.
    pub package: String,
    pub imports: Vec<ImportSpec>,
    pub types: Vec<TypeDecl>,
    pub funcs: Vec<FuncDecl>,
    /// Text of every top-level comment group, in source order.
    pub comment_groups: Vec<String>,
}

/// An `import` line, with its optional local name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSpec {
    /// Alias identifier, `.` for dot imports, `_` for blank imports.
    pub name: Option<String>,
    pub path: String,
}

impl ImportSpec {
    pub fn is_dot(&self) -> bool {
        self.name.as_deref() == Some(".")
    }

    pub fn is_blank(&self) -> bool {
        self.name.as_deref() == Some("_")
    }
}

/// A named type declaration (`type Foo struct {...}` or `type Foo = Bar`).
#[derive(Debug, Clone)]
pub struct TypeDecl {
    pub name: String,
    pub ty: TypeExpr,
    pub doc: Option<String>,
}

/// A function or method declaration.
#[derive(Debug, Clone)]
pub struct FuncDecl {
    /// Base type name of the receiver, pointer and type arguments stripped.
    pub receiver: Option<String>,
    pub name: String,
    pub doc: Option<String>,
}

/// A struct field. Embedded members have no names.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDecl {
    pub names: Vec<String>,
    pub ty: TypeExpr,
    /// Tag literal with the Go quoting removed.
    pub tag: Option<String>,
}

impl FieldDecl {
    pub fn is_embedded(&self) -> bool {
        self.names.is_empty()
    }
}

/// Syntactic type expression.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeExpr {
    Pointer(Box<TypeExpr>),
    Named(String),
    Qualified { package: String, name: String },
    Array(Box<TypeExpr>),
    Map { key: Box<TypeExpr>, value: Box<TypeExpr> },
    Interface,
    Struct(Vec<FieldDecl>),
    /// Functions, channels, generic instantiations.
    Unsupported(String),
}

impl TypeExpr {
    /// Parses the type strings written in annotations and struct tags:
    /// `int`, `*Foo`, `[]pkg.Bar`, `map[string][]int`, `interface{}`.
    pub fn parse_str(s: &str) -> TypeExpr {
        let s = s.trim();
        if let Some(rest) = s.strip_prefix('*') {
            return TypeExpr::Pointer(Box::new(Self::parse_str(rest)));
        }
        if let Some(rest) = s.strip_prefix("[]") {
            return TypeExpr::Array(Box::new(Self::parse_str(rest)));
        }
        if let Some(rest) = s.strip_prefix('[') {
            // fixed-size array: [N]T
            if let Some(close) = rest.find(']') {
                if rest[..close].chars().all(|c| c.is_ascii_digit()) && close > 0 {
                    return TypeExpr::Array(Box::new(Self::parse_str(&rest[close + 1..])));
                }
            }
            return TypeExpr::Unsupported(s.to_string());
        }
        if let Some(rest) = s.strip_prefix("map[") {
            let mut depth = 1usize;
            for (i, c) in rest.char_indices() {
                match c {
                    '[' => depth += 1,
                    ']' => {
                        depth -= 1;
                        if depth == 0 {
                            return TypeExpr::Map {
                                key: Box::new(Self::parse_str(&rest[..i])),
                                value: Box::new(Self::parse_str(&rest[i + 1..])),
                            };
                        }
                    }
                    _ => {}
                }
            }
            return TypeExpr::Unsupported(s.to_string());
        }
        if s == "interface{}" || s == "any" {
            return TypeExpr::Interface;
        }
        let is_ident = |part: &str| {
            !part.is_empty()
                && part.chars().all(|c| c.is_alphanumeric() || c == '_')
                && !part.starts_with(|c: char| c.is_ascii_digit())
        };
        match s.split_once('.') {
            Some((package, name)) if is_ident(package) && is_ident(name) => TypeExpr::Qualified {
                package: package.to_string(),
                name: name.to_string(),
            },
            None if is_ident(s) => TypeExpr::Named(s.to_string()),
            _ => TypeExpr::Unsupported(s.to_string()),
        }
    }
}

impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeExpr::Pointer(inner) => write!(f, "*{}", inner),
            TypeExpr::Named(name) => write!(f, "{}", name),
            TypeExpr::Qualified { package, name } => write!(f, "{}.{}", package, name),
            TypeExpr::Array(item) => write!(f, "[]{}", item),
            TypeExpr::Map { key, value } => write!(f, "map[{}]{}", key, value),
            TypeExpr::Interface => write!(f, "interface{{}}"),
            TypeExpr::Struct(_) => write!(f, "struct{{...}}"),
            TypeExpr::Unsupported(raw) => write!(f, "{}", raw),
        }
    }
}
