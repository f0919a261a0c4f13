use crate::generator::{Generator, GeneratorConfig};
use crate::locator::{FsLocator, LocatorConfig};
use crate::openapi_builder::OpenApiBuilder;
use crate::serializer::{serialize_json, serialize_yaml, write_to_file};
use crate::swagger_builder::SwaggerBuilder;
use anyhow::Result;
use clap::{Parser, ValueEnum};
use log::{debug, info};
use serde::Serialize;
use std::env;
use std::path::PathBuf;

/// Generate Swagger 2.0 / OpenAPI 3.0 documents from annotated Go controllers
#[derive(Parser, Debug)]
#[command(name = "openapi-from-annotations")]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Entry file holding the document tags and the controller imports
    #[arg(short = 's', long = "swagger", value_name = "FILE", default_value = "./swagger.go")]
    pub swagger_file: PathBuf,

    /// Project root, home of `vendor/` and `go.mod`
    #[arg(short = 'p', long = "project", value_name = "DIR", default_value = "./")]
    pub project_path: PathBuf,

    /// Directory the document is written to
    #[arg(short = 'o', long = "output", value_name = "DIR", default_value = "./")]
    pub output_dir: PathBuf,

    /// Output format (json or yaml)
    #[arg(short = 'f', long = "format", value_enum, default_value = "json")]
    pub output_format: OutputFormat,

    /// Document version to emit
    #[arg(long = "openapi", value_enum, default_value = "v3")]
    pub openapi_version: OpenApiVersion,

    /// Development mode: keep @Private and @Permission operations
    #[arg(long = "dev")]
    pub dev: bool,

    /// Resolve imports through go.mod and the module cache
    #[arg(long = "mod")]
    pub module_mode: bool,

    /// Enable verbose output
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

/// Output format options
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum OutputFormat {
    /// JSON format
    Json,
    /// YAML format
    Yaml,
}

impl OutputFormat {
    pub fn file_name(&self) -> &'static str {
        match self {
            OutputFormat::Json => "swagger.json",
            OutputFormat::Yaml => "swagger.yaml",
        }
    }
}

/// Document versions
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum OpenApiVersion {
    /// Swagger 2.0
    V2,
    /// OpenAPI 3.0
    V3,
}

/// Parse command line arguments
pub fn parse_args() -> Result<CliArgs> {
    let args = CliArgs::parse();
    parse_args_from_parsed(args)
}

/// Validate and log already-parsed arguments
pub fn parse_args_from_parsed(args: CliArgs) -> Result<CliArgs> {
    debug!("Parsed arguments: {:?}", args);

    if !args.swagger_file.is_file() {
        anyhow::bail!("Entry file does not exist: {}", args.swagger_file.display());
    }
    if !args.project_path.is_dir() {
        anyhow::bail!(
            "Project path is not a directory: {}",
            args.project_path.display()
        );
    }

    info!("Entry file: {}", args.swagger_file.display());
    info!("Project path: {}", args.project_path.display());
    info!("Output: {:?} {:?} into {}", args.openapi_version, args.output_format, args.output_dir.display());
    if args.dev {
        info!("Development mode: private operations included");
    }

    Ok(args)
}

/// Package lookup settings from the arguments and the `GOPATH`/`GOROOT`
/// environment.
pub fn locator_config(args: &CliArgs) -> LocatorConfig {
    let go_paths = match env::var_os("GOPATH") {
        Some(value) if !value.is_empty() => env::split_paths(&value).collect(),
        _ => env::var_os("HOME")
            .map(|home| vec![PathBuf::from(home).join("go")])
            .unwrap_or_default(),
    };
    let go_root = env::var_os("GOROOT")
        .filter(|value| !value.is_empty())
        .map(PathBuf::from);

    LocatorConfig {
        project_root: args.project_path.clone(),
        go_paths,
        go_root,
        module_mode: args.module_mode,
    }
}

/// Run the main workflow, returning the path written
pub fn run(args: CliArgs) -> Result<PathBuf> {
    info!("Starting document generation...");

    let config = locator_config(&args);
    debug!("Locator configuration: {:?}", config);
    let locator = FsLocator::new(config)?;

    let generator = Generator::new(&locator, GeneratorConfig { dev_mode: args.dev });
    let generation = generator.generate_from_file(&args.swagger_file)?;

    let content = match args.openapi_version {
        OpenApiVersion::V2 => render(&SwaggerBuilder::new(&generation.document).build(), args.output_format)?,
        OpenApiVersion::V3 => render(&OpenApiBuilder::new(&generation.document).build(), args.output_format)?,
    };

    let output_path = args.output_dir.join(args.output_format.file_name());
    info!("Writing output to: {}", output_path.display());
    write_to_file(&content, &output_path)?;

    info!("Generation complete!");
    info!("Summary:");
    info!("  - Paths: {}", generation.document.paths.len());
    info!("  - Definitions: {}", generation.document.definitions.len());
    info!("  - Warnings: {}", generation.warnings.len());

    Ok(output_path)
}

fn render<T: Serialize>(doc: &T, format: OutputFormat) -> Result<String> {
    info!("Serializing to {:?} format...", format);
    match format {
        OutputFormat::Yaml => serialize_yaml(doc),
        OutputFormat::Json => serialize_json(doc),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = CliArgs::try_parse_from(["openapi-from-annotations"]).unwrap();
        assert_eq!(args.swagger_file, PathBuf::from("./swagger.go"));
        assert_eq!(args.project_path, PathBuf::from("./"));
        assert_eq!(args.output_dir, PathBuf::from("./"));
        assert_eq!(args.output_format, OutputFormat::Json);
        assert_eq!(args.openapi_version, OpenApiVersion::V3);
        assert!(!args.dev);
        assert!(!args.module_mode);
    }

    #[test]
    fn test_all_flags() {
        let args = CliArgs::try_parse_from([
            "openapi-from-annotations",
            "-s",
            "api/swagger.go",
            "-p",
            "/src/app",
            "-o",
            "docs",
            "-f",
            "yaml",
            "--openapi",
            "v2",
            "--dev",
            "--mod",
            "-v",
        ])
        .unwrap();
        assert_eq!(args.swagger_file, PathBuf::from("api/swagger.go"));
        assert_eq!(args.project_path, PathBuf::from("/src/app"));
        assert_eq!(args.output_dir, PathBuf::from("docs"));
        assert_eq!(args.output_format, OutputFormat::Yaml);
        assert_eq!(args.openapi_version, OpenApiVersion::V2);
        assert!(args.dev && args.module_mode && args.verbose);
        assert_eq!(locator_config(&args).project_root, PathBuf::from("/src/app"));
    }

    #[test]
    fn test_rejects_unknown_format() {
        assert!(CliArgs::try_parse_from(["openapi-from-annotations", "-f", "toml"]).is_err());
    }

    #[test]
    fn test_missing_entry_file() {
        let args = CliArgs::try_parse_from(["openapi-from-annotations", "-s", "/definitely/not/here.go"]).unwrap();
        assert!(parse_args_from_parsed(args).is_err());
    }
}
