//! Package location.
//!
//! Maps an import path to the parsed source files of that package. The
//! generator only sees the [`PackageLocator`] trait; [`FsLocator`] implements
//! the GOPATH / module cache / vendor lookup and [`MemoryLocator`] serves
//! sources held in memory.

use crate::error::Error;
use crate::go_ast::{SourceFile, TypeDecl};
use crate::parser::GoParser;
use crate::scanner::FileScanner;
use anyhow::{Context, Result};
use log::{debug, warn};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// A located and parsed package.
#[derive(Debug, Clone)]
pub struct Package {
    pub import_path: String,
    /// Declared package name.
    pub name: String,
    pub files: Vec<SourceFile>,
}

impl Package {
    /// Builds a package from parsed files. `main` files are dropped when the
    /// directory also holds a library package.
    pub fn from_files(import_path: &str, files: Vec<SourceFile>) -> Result<Self> {
        let name = files
            .iter()
            .map(|f| f.package.as_str())
            .find(|p| *p != "main")
            .or_else(|| files.first().map(|f| f.package.as_str()))
            .map(str::to_string)
            .ok_or_else(|| Error::PackageNotFound(import_path.to_string()))?;

        let files: Vec<SourceFile> = files.into_iter().filter(|f| f.package == name).collect();
        Ok(Self {
            import_path: import_path.to_string(),
            name,
            files,
        })
    }

    /// Finds a top-level type declaration and the file declaring it.
    pub fn find_type(&self, name: &str) -> Option<(&SourceFile, &TypeDecl)> {
        self.files.iter().find_map(|file| {
            file.types
                .iter()
                .find(|decl| decl.name == name)
                .map(|decl| (file, decl))
        })
    }

    pub fn file(&self, path: &Path) -> Option<&SourceFile> {
        self.files.iter().find(|f| f.path == path)
    }
}

/// Resolves import paths to packages.
pub trait PackageLocator {
    fn locate(&self, import_path: &str) -> Result<Package>;

    /// True for standard library packages, which never hold controllers.
    fn is_standard(&self, _import_path: &str) -> bool {
        false
    }
}

/// Filesystem lookup settings.
#[derive(Debug, Clone, Default)]
pub struct LocatorConfig {
    /// Project root, home of `vendor/` and `go.mod`.
    pub project_root: PathBuf,
    pub go_paths: Vec<PathBuf>,
    pub go_root: Option<PathBuf>,
    /// Resolve through the module cache using `go.mod` requirements.
    pub module_mode: bool,
}

/// Locates packages on disk.
pub struct FsLocator {
    config: LocatorConfig,
    go_mod: Option<GoMod>,
}

impl FsLocator {
    /// Creates a locator. In module mode the project's `go.mod` is read up front.
    pub fn new(config: LocatorConfig) -> Result<Self> {
        let go_mod = if config.module_mode {
            let path = config.project_root.join("go.mod");
            let text = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            Some(GoMod::parse(&text))
        } else {
            None
        };
        Ok(Self { config, go_mod })
    }

    /// Candidate directories for an import path, in lookup order.
    fn candidates(&self, import_path: &str) -> Vec<PathBuf> {
        let mut dirs = Vec::new();

        if let Some(go_mod) = &self.go_mod {
            if let Some(rest) = strip_module(import_path, &go_mod.module) {
                dirs.push(self.config.project_root.join(rest));
            }
            for (module, version) in &go_mod.requires {
                if let Some(rest) = strip_module(import_path, module) {
                    for go_path in &self.config.go_paths {
                        let dir = go_path
                            .join("pkg")
                            .join("mod")
                            .join(format!("{}@{}", module, version));
                        dirs.push(if rest.is_empty() { dir } else { dir.join(rest) });
                    }
                }
            }
        }

        dirs.push(self.config.project_root.join("vendor").join(import_path));
        for go_path in &self.config.go_paths {
            dirs.push(go_path.join("src").join(import_path));
        }
        if let Some(go_root) = &self.config.go_root {
            dirs.push(go_root.join("src").join(import_path));
        }
        dirs
    }
}

impl PackageLocator for FsLocator {
    fn locate(&self, import_path: &str) -> Result<Package> {
        let dir = self
            .candidates(import_path)
            .into_iter()
            .find(|d| d.is_dir())
            .ok_or_else(|| Error::PackageNotFound(import_path.to_string()))?;
        debug!("Located package {} at {}", import_path, dir.display());

        let scan = FileScanner::new(dir.clone()).scan()?;
        let files = scan
            .go_files
            .iter()
            .map(|path| GoParser::parse_file(path))
            .collect::<Result<Vec<_>>>()
            .with_context(|| format!("Failed to parse package {}", import_path))?;
        if files.is_empty() {
            warn!("Package {} at {} has no Go files", import_path, dir.display());
        }
        Package::from_files(import_path, files)
    }

    fn is_standard(&self, import_path: &str) -> bool {
        self.config
            .go_root
            .as_ref()
            .is_some_and(|root| root.join("src").join(import_path).is_dir())
    }
}

/// `rest` of `import_path` below `module`, `""` for the module itself.
fn strip_module<'a>(import_path: &'a str, module: &str) -> Option<&'a str> {
    if import_path == module {
        return Some("");
    }
    import_path
        .strip_prefix(module)
        .and_then(|rest| rest.strip_prefix('/'))
}

/// The parts of `go.mod` the locator needs.
#[derive(Debug, Default, PartialEq, Eq)]
struct GoMod {
    module: String,
    requires: Vec<(String, String)>,
}

impl GoMod {
    fn parse(text: &str) -> Self {
        let mut go_mod = GoMod::default();
        let mut in_require = false;

        for line in text.lines() {
            let line = line.split("//").next().unwrap_or_default().trim();
            if line.is_empty() {
                continue;
            }
            if in_require {
                if line == ")" {
                    in_require = false;
                } else {
                    go_mod.push_require(line);
                }
                continue;
            }
            if let Some(rest) = line.strip_prefix("module ") {
                go_mod.module = rest.trim().trim_matches('"').to_string();
            } else if let Some(rest) = line.strip_prefix("require") {
                let rest = rest.trim();
                if rest == "(" {
                    in_require = true;
                } else {
                    go_mod.push_require(rest);
                }
            }
        }
        go_mod
    }

    fn push_require(&mut self, line: &str) {
        let mut parts = line.split_whitespace();
        if let (Some(path), Some(version)) = (parts.next(), parts.next()) {
            self.requires.push((path.to_string(), version.to_string()));
        }
    }
}

/// Serves packages from in-memory sources.
#[derive(Debug, Default)]
pub struct MemoryLocator {
    packages: HashMap<String, Vec<(PathBuf, String)>>,
}

impl MemoryLocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one source file to the package at `import_path`.
    pub fn add_file(&mut self, import_path: &str, file_name: &str, source: &str) -> &mut Self {
        let path = Path::new(import_path).join(file_name);
        self.packages
            .entry(import_path.to_string())
            .or_default()
            .push((path, source.to_string()));
        self
    }
}

impl PackageLocator for MemoryLocator {
    fn locate(&self, import_path: &str) -> Result<Package> {
        let sources = self
            .packages
            .get(import_path)
            .ok_or_else(|| Error::PackageNotFound(import_path.to_string()))?;
        let files = sources
            .iter()
            .map(|(path, source)| GoParser::parse_source(path.clone(), source))
            .collect::<Result<Vec<_>>>()
            .with_context(|| format!("Failed to parse package {}", import_path))?;
        Package::from_files(import_path, files)
    }
}

/// Run-scoped memo of located packages, so every lookup of one import path
/// during a run sees the same declarations.
pub struct PackageCache<'a> {
    locator: &'a dyn PackageLocator,
    packages: HashMap<String, Rc<Package>>,
}

impl<'a> PackageCache<'a> {
    pub fn new(locator: &'a dyn PackageLocator) -> Self {
        Self {
            locator,
            packages: HashMap::new(),
        }
    }

    pub fn get(&mut self, import_path: &str) -> Result<Rc<Package>> {
        if let Some(package) = self.packages.get(import_path) {
            return Ok(Rc::clone(package));
        }
        let package = Rc::new(self.locator.locate(import_path)?);
        self.packages
            .insert(import_path.to_string(), Rc::clone(&package));
        Ok(package)
    }
}
