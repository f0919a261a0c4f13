use anyhow::{Context, Result};
use log::warn;
use std::path::PathBuf;
use walkdir::WalkDir;

/// Scanner for the source files of one Go package directory.
///
/// A Go package is a single directory, so the scan does not descend into
/// sub-directories. Hidden files and `_test.go` files are skipped.
///
/// # Example
///
/// ```no_run
/// use openapi_from_annotations::scanner::FileScanner;
/// use std::path::PathBuf;
///
/// let scanner = FileScanner::new(PathBuf::from("./pkg/api"));
/// let result = scanner.scan().unwrap();
/// println!("Found {} Go files", result.go_files.len());
/// ```
pub struct FileScanner {
    root_path: PathBuf,
}

/// Result of a package directory scan.
pub struct ScanResult {
    /// `.go` files of the package, sorted by path
    pub go_files: Vec<PathBuf>,
    /// Entries that could not be read
    pub warnings: Vec<String>,
}

impl FileScanner {
    pub fn new(root_path: PathBuf) -> Self {
        Self { root_path }
    }

    /// Collects the package's `.go` files.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory does not exist or is not a directory.
    pub fn scan(&self) -> Result<ScanResult> {
        let meta = std::fs::metadata(&self.root_path)
            .with_context(|| format!("Failed to access directory: {}", self.root_path.display()))?;
        if !meta.is_dir() {
            anyhow::bail!("Not a directory: {}", self.root_path.display());
        }

        let mut go_files = Vec::new();
        let mut warnings = Vec::new();

        for entry in WalkDir::new(&self.root_path)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            match entry {
                Ok(entry) => {
                    let name = entry.file_name().to_string_lossy();
                    let is_go = name.ends_with(".go");
                    let is_test = name.ends_with("_test.go");
                    let is_hidden = name.starts_with('.');

                    if entry.file_type().is_file() && is_go && !is_test && !is_hidden {
                        go_files.push(entry.path().to_path_buf());
                    }
                }
                Err(e) => {
                    let warning = format!("Failed to access path: {}", e);
                    warn!("{}", warning);
                    warnings.push(warning);
                }
            }
        }

        Ok(ScanResult { go_files, warnings })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_scan_package_directory() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();

        fs::write(root.join("api.go"), "package api").unwrap();
        fs::write(root.join("models.go"), "package api").unwrap();
        fs::write(root.join("api_test.go"), "package api").unwrap();
        fs::write(root.join(".hidden.go"), "package api").unwrap();
        fs::write(root.join("readme.md"), "# README").unwrap();

        let result = FileScanner::new(root.to_path_buf()).scan().unwrap();

        let file_names: Vec<String> = result
            .go_files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(file_names, vec!["api.go", "models.go"]);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_scan_does_not_descend() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();

        fs::create_dir(root.join("sub")).unwrap();
        fs::write(root.join("sub/inner.go"), "package sub").unwrap();
        fs::write(root.join("outer.go"), "package api").unwrap();

        let result = FileScanner::new(root.to_path_buf()).scan().unwrap();
        assert_eq!(result.go_files.len(), 1);
        assert!(result.go_files[0].ends_with("outer.go"));
    }

    #[test]
    fn test_scan_empty_directory() {
        let temp_dir = TempDir::new().unwrap();
        let result = FileScanner::new(temp_dir.path().to_path_buf()).scan().unwrap();
        assert!(result.go_files.is_empty());
    }

    #[test]
    fn test_scan_nonexistent_directory() {
        let scanner = FileScanner::new(PathBuf::from("/nonexistent/path/12345"));
        assert!(scanner.scan().is_err());
    }
}
