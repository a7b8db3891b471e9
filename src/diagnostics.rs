//! Non-fatal findings collected during one compiler run.
//!
//! Every push is mirrored to `tracing` at warn level; the CLI prints the
//! collected list afterwards.

use std::fmt;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiagnosticKind {
    /// Bullet with a key but no value.
    MissingValue,
    /// Request/notification/capability lacking a required child.
    MissingField,
    /// Several type spans and no entry in the checked-extraction table.
    SuspiciousExtraction,
    /// No type could be read from the text at all.
    CannotExtract,
    /// Leaf text the binder had no rule for.
    UnconsumedFragment,
    /// A structured path was written twice.
    DuplicateOverwrite,
    /// Second struct/enum with an already registered name.
    DuplicateDeclaration,
    RequestWithoutResponse,
    ResponseWithoutRequest,
    /// Mutual references between distinct structs.
    DependencyCycle,
    /// Alias that expands into itself.
    RecursiveAlias,
    /// Declaration shape the model extractor cannot represent.
    UnsupportedDeclaration,
}

impl DiagnosticKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DiagnosticKind::MissingValue => "missing-value",
            DiagnosticKind::MissingField => "missing-field",
            DiagnosticKind::SuspiciousExtraction => "suspicious-extraction",
            DiagnosticKind::CannotExtract => "cannot-extract",
            DiagnosticKind::UnconsumedFragment => "unconsumed-fragment",
            DiagnosticKind::DuplicateOverwrite => "duplicate-overwrite",
            DiagnosticKind::DuplicateDeclaration => "duplicate-declaration",
            DiagnosticKind::RequestWithoutResponse => "request-without-response",
            DiagnosticKind::ResponseWithoutRequest => "response-without-request",
            DiagnosticKind::DependencyCycle => "dependency-cycle",
            DiagnosticKind::RecursiveAlias => "recursive-alias",
            DiagnosticKind::UnsupportedDeclaration => "unsupported-declaration",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    /// Dotted structured path or declaration name the finding is about.
    pub path: String,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "warning[{}] {}: {}", self.kind.as_str(), self.path, self.message)
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, kind: DiagnosticKind, path: impl Into<String>, message: impl Into<String>) {
        let diagnostic = Diagnostic {
            kind,
            path: path.into(),
            message: message.into(),
        };
        tracing::warn!(kind = kind.as_str(), path = %diagnostic.path, "{}", diagnostic.message);
        self.entries.push(diagnostic);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn count(&self, kind: DiagnosticKind) -> usize {
        self.entries.iter().filter(|d| d.kind == kind).count()
    }

    pub fn has(&self, kind: DiagnosticKind) -> bool {
        self.entries.iter().any(|d| d.kind == kind)
    }

    /// One diagnostic per line.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for d in &self.entries {
            out.push_str(&d.to_string());
            out.push('\n');
        }
        out
    }
}
