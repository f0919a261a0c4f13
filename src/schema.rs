//! Canonical schema representation of resolved types.
//!
//! These nodes are format-neutral: the Swagger 2.0 and OpenAPI 3.0
//! renderers translate them into their own schema objects.

use crate::annotation::parse_bool;
use indexmap::IndexMap;
use serde_json::Value;

/// A resolved type.
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaNode {
    /// Built-in type mapped to an OpenAPI `(type, format)` pair.
    Primitive { name: String, format: String },
    Array(Box<SchemaNode>),
    /// String-keyed map.
    Map(Box<SchemaNode>),
    Object(ObjectSchema),
    /// Opaque placeholder for interface types.
    Interface,
    OneOf(Vec<SchemaNode>),
}

/// Struct schema. With `reference` set it points at a definition and
/// carries no properties of its own.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ObjectSchema {
    pub title: String,
    pub properties: IndexMap<String, PropertySchema>,
    pub required: Vec<String>,
    pub reference: Option<String>,
}

/// A struct property: the field's schema plus what its tag says about it.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertySchema {
    pub schema: SchemaNode,
    pub description: Option<String>,
    pub default: Option<Value>,
    pub deprecated: bool,
}

impl PropertySchema {
    pub fn new(schema: SchemaNode) -> Self {
        Self {
            schema,
            description: None,
            default: None,
            deprecated: false,
        }
    }
}

impl SchemaNode {
    pub fn primitive(name: &str, format: &str) -> Self {
        SchemaNode::Primitive {
            name: name.to_string(),
            format: format.to_string(),
        }
    }

    /// A reference to the definition stored under `key`.
    pub fn reference(key: &str) -> Self {
        SchemaNode::Object(ObjectSchema {
            title: key.to_string(),
            reference: Some(key.to_string()),
            ..ObjectSchema::default()
        })
    }

    pub fn reference_key(&self) -> Option<&str> {
        match self {
            SchemaNode::Object(obj) => obj.reference.as_deref(),
            _ => None,
        }
    }

    /// Primitives and (nested) arrays of primitives: the only shapes allowed
    /// outside a request body.
    pub fn is_simple(&self) -> bool {
        match self {
            SchemaNode::Primitive { .. } => true,
            SchemaNode::Array(item) => item.is_simple(),
            _ => false,
        }
    }

    pub fn is_file(&self) -> bool {
        matches!(self, SchemaNode::Primitive { name, .. } if name == "file")
    }

    /// Converts a literal default value according to this node's kind:
    /// integers, booleans and numbers are parsed, anything else stays a string.
    pub fn convert_literal(&self, raw: &str) -> Result<Value, String> {
        let SchemaNode::Primitive { name, .. } = self else {
            return Ok(Value::String(raw.to_string()));
        };
        match name.as_str() {
            "integer" => raw
                .parse::<i64>()
                .map(Value::from)
                .map_err(|e| e.to_string()),
            "boolean" => parse_bool(raw)
                .map(Value::Bool)
                .ok_or_else(|| format!("invalid syntax `{}`", raw)),
            "number" => raw
                .parse::<f64>()
                .map_err(|e| e.to_string())
                .and_then(|f| {
                    serde_json::Number::from_f64(f)
                        .map(Value::Number)
                        .ok_or_else(|| format!("`{}` is not a finite number", raw))
                }),
            _ => Ok(Value::String(raw.to_string())),
        }
    }
}

/// Looks up a built-in type by its rendered name.
pub fn builtin(name: &str) -> Option<SchemaNode> {
    let (ty, format) = match name {
        "bool" => ("boolean", ""),
        "uint" | "uint8" | "uint16" | "uint32" | "int" | "int8" | "int16" | "int32" => {
            ("integer", "int32")
        }
        "uint64" | "int64" | "uintptr" => ("integer", "int64"),
        "float32" | "complex64" => ("number", "float"),
        "float64" | "complex128" => ("number", "double"),
        "string" => ("string", ""),
        "byte" | "rune" => ("string", "byte"),
        "time.Time" => ("string", "date-time"),
        "file" => ("file", ""),
        _ => return None,
    };
    Some(SchemaNode::primitive(ty, format))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builtin_table() {
        assert_eq!(builtin("int"), Some(SchemaNode::primitive("integer", "int32")));
        assert_eq!(builtin("uint64"), Some(SchemaNode::primitive("integer", "int64")));
        assert_eq!(builtin("float64"), Some(SchemaNode::primitive("number", "double")));
        assert_eq!(builtin("byte"), Some(SchemaNode::primitive("string", "byte")));
        assert_eq!(builtin("time.Time"), Some(SchemaNode::primitive("string", "date-time")));
        assert_eq!(builtin("string"), Some(SchemaNode::primitive("string", "")));
        assert_eq!(builtin("Item"), None);
    }

    #[test]
    fn test_convert_literal() {
        let int = SchemaNode::primitive("integer", "int32");
        assert_eq!(int.convert_literal("123").unwrap(), json!(123));
        assert!(int.convert_literal("abc").is_err());

        let boolean = SchemaNode::primitive("boolean", "");
        assert_eq!(boolean.convert_literal("true").unwrap(), json!(true));
        assert!(boolean.convert_literal("maybe").is_err());

        let number = SchemaNode::primitive("number", "double");
        assert_eq!(number.convert_literal("1.5").unwrap(), json!(1.5));

        let string = SchemaNode::primitive("string", "");
        assert_eq!(string.convert_literal("x").unwrap(), json!("x"));
    }

    #[test]
    fn test_is_simple() {
        let int = SchemaNode::primitive("integer", "int32");
        assert!(int.is_simple());
        assert!(SchemaNode::Array(Box::new(int.clone())).is_simple());
        assert!(!SchemaNode::Map(Box::new(int)).is_simple());
        assert!(!SchemaNode::reference("Item").is_simple());
        assert!(!SchemaNode::Interface.is_simple());
    }

    #[test]
    fn test_reference() {
        let node = SchemaNode::reference("Item_1");
        assert_eq!(node.reference_key(), Some("Item_1"));
        assert_eq!(SchemaNode::Interface.reference_key(), None);
    }
}
