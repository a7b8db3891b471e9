//! Boundary with the type-description parser.
//!
//! The parser is a black box behind [`DeclarationParser`]; whatever it is, it
//! hands back [`ExternalDeclaration`]s whose member types are already split
//! into named references and inline object literals.

#[cfg(feature = "input-typescript")]
pub mod typescript;

use serde::Serialize;

use crate::diagnostics::Diagnostics;
use crate::error::CompileError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ExternalType {
    /// Any type spelled as text (`Foo`, `Foo[] | null`, `'a' | 'b'`).
    NamedReference { text: String },
    /// `{ ... }` written in place.
    InlineObjectLiteral {
        members: Vec<ExternalMember>,
        /// Count of `[key: K]: V` entries.
        index_signatures: usize,
    },
}

impl ExternalType {
    pub fn reference(text: impl Into<String>) -> Self {
        ExternalType::NamedReference { text: text.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalMember {
    pub name: String,
    pub ty: ExternalType,
    pub is_optional: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum EnumShape {
    /// `enum X { ... }`
    Enumeration,
    /// `namespace X { export const a = ...; }`
    Namespace,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExternalEnumMember {
    pub name: String,
    /// Initializer as written, quotes included; `None` continues the count.
    pub initializer: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "declaration", rename_all = "camelCase")]
pub enum ExternalDeclaration {
    Interface {
        name: String,
        extends: Vec<String>,
        members: Vec<ExternalMember>,
        index_signatures: usize,
    },
    Enum {
        name: String,
        shape: EnumShape,
        members: Vec<ExternalEnumMember>,
    },
    Alias {
        name: String,
        ty: ExternalType,
    },
}

impl ExternalDeclaration {
    pub fn name(&self) -> &str {
        match self {
            ExternalDeclaration::Interface { name, .. }
            | ExternalDeclaration::Enum { name, .. }
            | ExternalDeclaration::Alias { name, .. } => name,
        }
    }
}

pub trait DeclarationParser {
    /// Shapes the parser recognizes but cannot represent are reported as
    /// [`DiagnosticKind::UnsupportedDeclaration`](crate::diagnostics::DiagnosticKind::UnsupportedDeclaration)
    /// and left out of the result.
    fn parse(&self, source: &str, diagnostics: &mut Diagnostics) -> Result<Vec<ExternalDeclaration>, CompileError>;
}

/// Concatenates the bodies of the ```` ```typescript ```` and ```` ```ts ````
/// fences of a markdown document.
pub fn fenced_declaration_source(markdown: &str) -> String {
    let mut out = String::new();
    for part in markdown.split("\n```") {
        if let Some(body) = part.strip_prefix("typescript") {
            out.push_str(body);
        } else if let Some(body) = part.strip_prefix("ts") {
            out.push_str(body);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_typescript_fences_are_kept() {
        let md = "\
# Title

```typescript
interface A {}
```

```json
{ \"a\": 1 }
```

```ts
type B = string;
```
";
        let source = fenced_declaration_source(md);
        assert!(source.contains("interface A {}"));
        assert!(source.contains("type B = string;"));
        assert!(!source.contains("\"a\""));
    }
}
