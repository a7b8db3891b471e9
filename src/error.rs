use std::path::PathBuf;

use thiserror::Error;

/// A reference to a name that no struct, enum or external type provides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnresolvedReference {
    pub name: String,
    /// Where the reference was found (struct name or descriptor path).
    pub referenced_by: String,
}

/// Errors that end a compiler run.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("unresolved type references: {}", format_unresolved(.0))]
    UnresolvedReferences(Vec<UnresolvedReference>),

    #[error("strict mode: {kind} at {path}")]
    Strict { kind: &'static str, path: String },

    #[error("declaration parser: {0}")]
    DeclarationParser(String),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

fn format_unresolved(refs: &[UnresolvedReference]) -> String {
    refs.iter()
        .map(|r| format!("`{}` (in {})", r.name, r.referenced_by))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Errors while loading a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config at JSON path {path}: {message}")]
    Json { path: String, message: String },

    #[error("invalid ignorable path pattern `{pattern}`: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}
