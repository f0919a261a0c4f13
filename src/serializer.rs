//! Serialization of rendered documents to YAML or JSON, and writing them out.

use anyhow::{Context, Result};
use log::debug;
use serde::Serialize;
use std::fs;
use std::path::Path;

/// Serializes a rendered document to YAML.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn serialize_yaml<T: Serialize>(doc: &T) -> Result<String> {
    debug!("Serializing document to YAML");
    serde_yaml::to_string(doc).context("Failed to serialize document to YAML")
}

/// Serializes a rendered document to pretty-printed JSON.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn serialize_json<T: Serialize>(doc: &T) -> Result<String> {
    debug!("Serializing document to JSON");
    serde_json::to_string_pretty(doc).context("Failed to serialize document to JSON")
}

/// Writes string content to a file, creating parent directories and
/// overwriting any existing file.
pub fn write_to_file(content: &str, path: &Path) -> Result<()> {
    debug!("Writing content to file: {}", path.display());

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    fs::write(path, content)
        .with_context(|| format!("Failed to write to file: {}", path.display()))?;

    debug!("Successfully wrote {} bytes to {}", content.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;
    use crate::openapi_builder::OpenApiBuilder;
    use crate::swagger_builder::SwaggerBuilder;
    use tempfile::TempDir;

    fn test_document() -> Document {
        let mut doc = Document::default();
        doc.info.title = "Test API".to_string();
        doc.info.version = "1.0.0".to_string();
        doc.info.description = Some("A test API".to_string());
        doc
    }

    #[test]
    fn test_serialize_yaml() {
        let doc = test_document();
        let yaml = serialize_yaml(&OpenApiBuilder::new(&doc).build()).unwrap();

        assert!(yaml.contains("title: Test API"));
        assert!(yaml.contains("description: A test API"));

        let parsed: serde_yaml::Value = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed["openapi"], serde_yaml::Value::from("3.0.0"));
        assert_eq!(parsed["info"]["version"], serde_yaml::Value::from("1.0.0"));
        assert!(parsed["paths"].is_mapping());
    }

    #[test]
    fn test_serialize_json() {
        let doc = test_document();
        let json = serialize_json(&SwaggerBuilder::new(&doc).build()).unwrap();

        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["swagger"], "2.0");
        assert_eq!(parsed["info"]["title"], "Test API");
    }

    #[test]
    fn test_serialize_json_pretty_format() {
        let doc = test_document();
        let json = serialize_json(&OpenApiBuilder::new(&doc).build()).unwrap();

        assert!(json.contains('\n'));
        assert!(json.contains("  "));
        assert!(json.lines().count() > 5, "Pretty printed JSON should have multiple lines");
    }

    #[test]
    fn test_write_to_file_creates_directories() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("subdir").join("nested").join("swagger.yaml");

        write_to_file("test content", &file_path).unwrap();

        assert_eq!(fs::read_to_string(&file_path).unwrap(), "test content");
    }

    #[test]
    fn test_write_to_file_overwrites_existing() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("swagger.json");

        write_to_file("initial content", &file_path).unwrap();
        write_to_file("new content", &file_path).unwrap();

        assert_eq!(fs::read_to_string(&file_path).unwrap(), "new content");
    }
}
