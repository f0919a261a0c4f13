//! Struct tag directives.
//!
//! A field's raw tag literal (`json:"name,omitempty" swaggo:"true,the name,bob"`)
//! is parsed with Go's `key:"value"` conventions into the fixed set of
//! directives the type resolver understands.

use crate::error::Error;
use anyhow::Result;

/// Directives extracted from one field tag.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldDirectives {
    /// Visible property name overriding the source field name.
    pub name: Option<String>,
    /// Drop the field entirely.
    pub ignore: bool,
    pub required: bool,
    pub description: Option<String>,
    /// Raw default literal, converted later against the resolved type.
    pub default: Option<String>,
    /// Extra names the property is also emitted under.
    pub alternate_names: Vec<String>,
    /// Type expression of an alternative representation.
    pub one_of: Option<String>,
}

impl FieldDirectives {
    /// Parses a raw tag literal, with or without the surrounding backquotes.
    pub fn parse(field: &str, raw: &str) -> Result<Self> {
        let pairs = parse_pairs(raw).ok_or_else(|| Error::BadStructTag {
            field: field.to_string(),
            tag: raw.to_string(),
        })?;
        let get = |key: &str| {
            pairs
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str())
        };

        let mut directives = FieldDirectives::default();

        if let Some(json) = get("json") {
            let name = json.split(',').next().unwrap_or_default();
            if name == "-" {
                directives.ignore = true;
                return Ok(directives);
            }
            if !name.is_empty() {
                directives.name = Some(name.to_string());
            }
        }

        // Legacy single-purpose keys; `swaggo` wins where both are set.
        if get("required").is_some_and(|v| !v.is_empty()) {
            directives.required = true;
        }
        directives.description = get("desc").filter(|v| !v.is_empty()).map(str::to_string);
        directives.default = get("default").filter(|v| !v.is_empty()).map(str::to_string);

        if let Some(swaggo) = get("swaggo") {
            let mut parts = swaggo.splitn(3, ',');
            if parts.next() == Some("true") {
                directives.required = true;
            }
            if let Some(desc) = parts.next().filter(|v| !v.is_empty()) {
                directives.description = Some(desc.to_string());
            }
            if let Some(default) = parts.next().filter(|v| !v.is_empty()) {
                directives.default = Some(default.to_string());
            }
        }

        if let Some(mjson) = get("mjson") {
            for alt in mjson.split(',').map(str::trim) {
                if alt == "-" {
                    directives.ignore = true;
                    return Ok(directives);
                }
                if alt.is_empty() || alt == "omitempty" {
                    continue;
                }
                let primary = directives.name.as_deref().unwrap_or(field);
                if alt != primary && !directives.alternate_names.iter().any(|n| n == alt) {
                    directives.alternate_names.push(alt.to_string());
                }
            }
        }

        directives.one_of = get("oneof")
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string);

        Ok(directives)
    }
}

/// Splits a tag literal into `(key, unquoted value)` pairs. `None` when the
/// literal is malformed.
fn parse_pairs(raw: &str) -> Option<Vec<(String, String)>> {
    let tag = raw.trim().trim_matches('`');
    let mut pairs = Vec::new();
    let mut rest = tag;

    loop {
        rest = rest.trim_start();
        if rest.is_empty() {
            return Some(pairs);
        }

        let colon = rest.find(':')?;
        let key = &rest[..colon];
        if key.is_empty() || key.chars().any(|c| c.is_whitespace() || c == '"' || c.is_control()) {
            return None;
        }
        rest = rest[colon + 1..].strip_prefix('"')?;

        let mut value = String::new();
        let mut chars = rest.char_indices();
        let end = loop {
            let (i, c) = chars.next()?;
            match c {
                '"' => break i,
                '\\' => {
                    let (_, escaped) = chars.next()?;
                    value.push(match escaped {
                        'n' => '\n',
                        't' => '\t',
                        other => other,
                    });
                }
                c => value.push(c),
            }
        };
        pairs.push((key.to_string(), value));
        rest = &rest[end + 1..];
    }
}
