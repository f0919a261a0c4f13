use std::path::PathBuf;

/// Result type alias for hard errors raised by the generator.
pub type Result<T> = std::result::Result<T, Error>;

/// Hard error kinds. Each aborts the run; callers wrap them with
/// positional context (file, controller, method, tag line) through
/// `anyhow::Context`, so the root cause stays downcastable.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("cannot resolve type `{schema}` in package `{package}` ({file})")]
    UnresolvedType {
        file: PathBuf,
        package: String,
        schema: String,
    },

    #[error("unsupported map key type `{key}`: only string keys are allowed")]
    UnsupportedMapKey { key: String },

    #[error("type `{schema}` cannot be used as a {location} parameter, only primitives and arrays of primitives are allowed")]
    UnsupportedParameterSchema { schema: String, location: String },

    #[error("unsupported type expression `{0}`")]
    UnsupportedTypeExpr(String),

    #[error("unknown location `{location}` for parameter `{name}`")]
    UnknownLocation { name: String, location: String },

    #[error("bad arity for {tag}: expected {expected}, got {got} in `{line}`")]
    BadArity {
        tag: String,
        expected: String,
        got: usize,
        line: String,
    },

    #[error("invalid router `{0}`")]
    BadRouter(String),

    #[error("invalid value `{value}` for {what}")]
    BadValue { what: String, value: String },

    #[error("unknown content type `{0}`")]
    UnknownContentType(String),

    #[error("cannot convert default value `{value}` of `{field}` to {ty}: {cause}")]
    BadDefault {
        field: String,
        ty: String,
        value: String,
        cause: String,
    },

    #[error("malformed struct tag on field `{field}`: {tag}")]
    BadStructTag { field: String, tag: String },

    #[error("package `{0}` not found")]
    PackageNotFound(String),

    #[error("malformed source {0}")]
    MalformedSource(PathBuf),
}
