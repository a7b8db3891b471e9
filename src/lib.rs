//! Compiles a markdown protocol specification (LSP style: anchored headings,
//! `_Label_:` groups, bullet fields and fenced TypeScript declarations) into
//! typed Rust bindings.

pub mod binder;
pub mod cli;
pub mod codegen;
pub mod config;
pub mod decls;
pub mod diagnostics;
pub mod error;
pub mod ir;
pub mod jq_exec;
pub mod markdown;
pub mod model;
pub mod normalize;
pub mod order;
pub mod path_de;
pub mod run;
pub mod text;

pub use config::Config;
pub use decls::DeclarationParser;
pub use diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
pub use error::{CompileError, ConfigError};
pub use run::{CompileOutput, CompilerRun};

#[cfg(feature = "input-typescript")]
pub use decls::typescript::TypeScriptDeclarations;
