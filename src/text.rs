//! Leaf text of the structured tree and the rules that read a type or a
//! name out of a sentence of prose.

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::ir::{Scalar, TypeExpr};
use crate::normalize::normalize;

static WHERE_CLAUSE: Lazy<Regex> = Lazy::new(|| Regex::new(r"` *where.*").unwrap());
static LINKED_CODE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[ *(`[^`)]+`) *\]\([^)]+\)").unwrap());
static CODE_THEN_BRACKETS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"`([A-Z][a-zA-Z0-9]+)`\[\]").unwrap());
static ESCAPED_BAR_BETWEEN_CODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"` *\\*\| *`").unwrap());
static CODE_SPAN: Lazy<Regex> = Lazy::new(|| Regex::new(r"`([^`]+)`").unwrap());
static SINGLE_QUOTED: Lazy<Regex> = Lazy::new(|| Regex::new(r"'([^']+)'").unwrap());
static ANY_LIST: Lazy<Regex> = Lazy::new(|| Regex::new(r"any *\[ *\]").unwrap());
static NOTHING: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(?:none|void|null)\b").unwrap());
static NAME_SEPARATORS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[$./ _]+").unwrap());

// ————————————————————————————————————————————————————————————————————————————
// TEXT FRAGMENT
// ————————————————————————————————————————————————————————————————————————————

/// One bullet or group value, with its code spans and quoted runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextFragment {
    pub text: String,
    pub strings: Vec<String>,
    pub types: Vec<String>,
}

impl TextFragment {
    pub fn new(text: &str) -> Self {
        let mut rewritten = WHERE_CLAUSE.replace(text, "`").into_owned();
        loop {
            let next = LINKED_CODE.replace(&rewritten, "$1");
            let next = CODE_THEN_BRACKETS.replace(&next, "`${1}[]`");
            let next = ESCAPED_BAR_BETWEEN_CODE.replace(&next, " | ").into_owned();
            if next == rewritten {
                break;
            }
            rewritten = next;
        }
        let types = CODE_SPAN
            .captures_iter(&rewritten)
            .map(|c| c[1].to_string())
            .collect();
        let strings = SINGLE_QUOTED
            .captures_iter(text)
            .map(|c| c[1].to_string())
            .collect();
        Self {
            text: text.to_string(),
            strings,
            types,
        }
    }

    /// First quoted run, else first code span.
    pub fn first_name(&self) -> Option<&str> {
        self.strings
            .first()
            .or_else(|| self.types.first())
            .map(String::as_str)
    }
}

// ————————————————————————————————————————————————————————————————————————————
// TYPE EXTRACTION
// ————————————————————————————————————————————————————————————————————————————

/// Result of reading a type out of prose.
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractedType {
    Known(TypeExpr),
    /// Nothing trustworthy; rendered as the dynamic scalar.
    Fallback,
}

impl ExtractedType {
    pub fn into_type(self) -> TypeExpr {
        match self {
            ExtractedType::Known(ty) => ty,
            ExtractedType::Fallback => TypeExpr::dynamic(),
        }
    }

    pub fn is_known(&self) -> bool {
        matches!(self, ExtractedType::Known(_))
    }
}

/// Reads the type a fragment talks about.
///
/// `checked` maps the exact text of known multi-span sentences to the type
/// they mean; `path` only labels diagnostics.
pub fn extract_type(
    fragment: &TextFragment,
    checked: &IndexMap<String, String>,
    diagnostics: &mut Diagnostics,
    path: &str,
) -> ExtractedType {
    match fragment.types.as_slice() {
        [single] => return ExtractedType::Known(normalize(single)),
        [first, ..] => {
            if let Some(resolved) = checked.get(&fragment.text) {
                return ExtractedType::Known(normalize(resolved));
            }
            diagnostics.push(
                DiagnosticKind::SuspiciousExtraction,
                path,
                format!("{} code spans in {:?} (first is `{first}`)", fragment.types.len(), fragment.text),
            );
            return ExtractedType::Fallback;
        }
        [] => {}
    }
    if let Some(literal) = fragment.strings.first() {
        return ExtractedType::Known(normalize(&format!("'{literal}'")));
    }
    if ANY_LIST.is_match(&fragment.text) {
        return ExtractedType::Known(TypeExpr::ListOf(Box::new(TypeExpr::dynamic())));
    }
    if NOTHING.is_match(&fragment.text) {
        return ExtractedType::Known(TypeExpr::Scalar(Scalar::Null));
    }
    diagnostics.push(
        DiagnosticKind::CannotExtract,
        path,
        format!("cannot extract a type from {:?}", fragment.text),
    );
    ExtractedType::Fallback
}

// ————————————————————————————————————————————————————————————————————————————
// NAMES
// ————————————————————————————————————————————————————————————————————————————

/// Upper-cases the first character.
pub fn upper_case(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// `textDocument/didOpen` → `TextDocumentDidOpen`, `$/cancelRequest` → `CancelRequest`.
pub fn namify(s: &str) -> String {
    NAME_SEPARATORS.split(s).map(upper_case).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fragment(text: &str) -> TextFragment {
        TextFragment::new(text)
    }

    #[test]
    fn linked_code_is_unwrapped() {
        let f = fragment("[`Hover`](#hover) \\| `null`");
        assert_eq!(f.types, vec!["Hover | null"]);
    }

    #[test]
    fn bracket_suffix_moves_inside_code() {
        let f = fragment("`Location`[] \\| `null`");
        assert_eq!(f.types, vec!["Location[] | null"]);
    }

    #[test]
    fn where_clause_is_dropped() {
        let f = fragment("`ExecuteCommandParams` where `Foo` is defined as follows:");
        assert_eq!(f.types, vec!["ExecuteCommandParams"]);
    }

    #[test]
    fn strings_come_from_the_original_text() {
        let f = fragment("'textDocument/hover'");
        assert_eq!(f.strings, vec!["textDocument/hover"]);
        assert!(f.types.is_empty());
        assert_eq!(f.first_name(), Some("textDocument/hover"));
    }

    #[test]
    fn multi_span_uses_checked_table() {
        let text = "`DocumentSymbol[]` \\| `SymbolInformation[]`. They can not be mixed.";
        let mut checked = IndexMap::new();
        checked.insert(text.to_string(), "DocumentSymbol[] | SymbolInformation[]".to_string());
        let mut diags = Diagnostics::new();

        // the escaped bar joins the two spans, so this one reads as a single span
        let t = extract_type(&fragment(text), &checked, &mut diags, "x");
        assert!(t.is_known());

        let text = "`A` or `B` depending on the client";
        let t = extract_type(&fragment(text), &checked, &mut diags, "x");
        assert_eq!(t, ExtractedType::Fallback);
        assert!(diags.has(DiagnosticKind::SuspiciousExtraction));

        checked.insert(text.to_string(), "A | B".to_string());
        let t = extract_type(&fragment(text), &checked, &mut diags, "x");
        assert_eq!(
            t,
            ExtractedType::Known(TypeExpr::Variant(vec![TypeExpr::named("A"), TypeExpr::named("B")]))
        );
    }

    #[test]
    fn prose_fallbacks() {
        let checked = IndexMap::new();
        let mut diags = Diagnostics::new();
        assert_eq!(
            extract_type(&fragment("void."), &checked, &mut diags, "x").into_type(),
            TypeExpr::Scalar(Scalar::Null)
        );
        assert_eq!(
            extract_type(&fragment("any [] of things"), &checked, &mut diags, "x").into_type(),
            TypeExpr::ListOf(Box::new(TypeExpr::dynamic()))
        );
        assert!(diags.is_empty());
        assert_eq!(
            extract_type(&fragment("annulled"), &checked, &mut diags, "x"),
            ExtractedType::Fallback
        );
        assert!(diags.has(DiagnosticKind::CannotExtract));
    }

    #[test]
    fn namify_splits_on_separators() {
        assert_eq!(namify("textDocument/didOpen"), "TextDocumentDidOpen");
        assert_eq!(namify("$/cancelRequest"), "CancelRequest");
        assert_eq!(namify("workspace.symbol_resolve"), "WorkspaceSymbolResolve");
        assert_eq!(upper_case("élan"), "Élan");
    }
}
