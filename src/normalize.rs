//! Type-expression text → [`TypeExpr`].
//!
//! The input is whatever a declaration member or a prose code span spells as
//! a type (`Foo[]`, `Array<Foo>`, `'a' | 'b'`, `{ [key: string]: T }`, ...).

use crate::ir::{Scalar, TypeExpr, variant_of};

pub fn normalize(text: &str) -> TypeExpr {
    let collapsed = collapse_whitespace(text);
    normalize_clean(strip_outer_parens(&collapsed))
}

fn normalize_clean(text: &str) -> TypeExpr {
    let text = strip_outer_parens(text);
    if text.is_empty() {
        return TypeExpr::dynamic();
    }

    // ---- undefined ----
    let alternatives = split_top_level(text, '|');
    let kept: Vec<&str> = alternatives
        .iter()
        .map(|alt| alt.trim())
        .filter(|alt| *alt != "undefined")
        .collect();
    if kept.is_empty() {
        return TypeExpr::Scalar(Scalar::Null);
    }

    // ---- lists ----
    if kept.len() == 1 {
        let only = strip_outer_parens(kept[0]);
        if let Some(inner) = list_element(only) {
            return TypeExpr::ListOf(Box::new(normalize_clean(inner)));
        }
    }

    // ---- quotes ----
    if kept.len() == 1 && is_single_quoted_literal(kept[0]) {
        return TypeExpr::Scalar(Scalar::String);
    }
    let quoted_literals = kept.iter().all(|alt| is_single_quoted_literal(alt));
    if !quoted_literals && kept.iter().any(|alt| alt.contains(['\'', '"'])) {
        return TypeExpr::dynamic();
    }

    // ---- composite ----
    if kept.len() > 1 {
        return variant_of(kept.into_iter().map(normalize_clean).collect());
    }
    let only = kept[0];
    if only.starts_with('{') && matching_close(only, 0) == Some(only.len() - 1) {
        return TypeExpr::Scalar(Scalar::Object);
    }
    if split_top_level(only, '&').len() > 1 {
        return TypeExpr::Scalar(Scalar::Object);
    }

    // ---- builtins ----
    if let Some(scalar) = builtin(only) {
        return TypeExpr::Scalar(scalar);
    }
    TypeExpr::Named(strip_generics(only).to_string())
}

fn builtin(name: &str) -> Option<Scalar> {
    let scalar = match name {
        "string" => Scalar::String,
        "number" | "integer" | "uinteger" | "decimal" => Scalar::Int,
        "boolean" => Scalar::Bool,
        "any" | "unknown" => Scalar::Dynamic,
        "null" | "void" => Scalar::Null,
        "object" => Scalar::Object,
        "[number, number]" => Scalar::IntPair,
        "0" | "1" | "2" | "3" | "4" => Scalar::Int,
        _ => return None,
    };
    Some(scalar)
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn is_open(c: u8) -> bool {
    matches!(c, b'(' | b'[' | b'{' | b'<')
}

fn is_close(c: u8) -> bool {
    matches!(c, b')' | b']' | b'}' | b'>')
}

/// Index of the bracket closing the one opened at `open`.
fn matching_close(text: &str, open: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    for (i, &b) in bytes.iter().enumerate().skip(open) {
        if is_open(b) {
            depth += 1;
        } else if is_close(b) {
            depth = depth.checked_sub(1)?;
            if depth == 0 {
                return Some(i);
            }
        }
    }
    None
}

fn strip_outer_parens(mut text: &str) -> &str {
    loop {
        text = text.trim();
        if text.starts_with('(') && matching_close(text, 0) == Some(text.len() - 1) {
            text = &text[1..text.len() - 1];
        } else {
            return text;
        }
    }
}

/// Splits on `sep` outside of any bracket pair.
pub(crate) fn split_top_level(text: &str, sep: char) -> Vec<&str> {
    let mut out = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    for (i, c) in text.char_indices() {
        match c {
            '(' | '[' | '{' | '<' => depth += 1,
            ')' | ']' | '}' | '>' => depth -= 1,
            c if c == sep && depth == 0 => {
                out.push(&text[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    out.push(&text[start..]);
    out
}

/// Element text of `T[]` / `(T)[]` / `Array<T>`.
fn list_element(text: &str) -> Option<&str> {
    if let Some(inner) = text.strip_suffix("[]") {
        let inner = inner.trim_end();
        if inner.is_empty() {
            return None;
        }
        // `(A | B)[]` or an atom; `A | B[]` never reaches here as a single alternative
        if inner.starts_with('(') && matching_close(inner, 0) == Some(inner.len() - 1) {
            return Some(inner);
        }
        if split_top_level(inner, '|').len() == 1 && split_top_level(inner, '&').len() == 1 {
            return Some(inner);
        }
        return None;
    }
    let rest = text.strip_prefix("Array<")?;
    if matching_close(text, 5) == Some(text.len() - 1) {
        return Some(&rest[..rest.len() - 1]);
    }
    None
}

fn is_single_quoted_literal(text: &str) -> bool {
    let text = text.trim();
    for quote in ['\'', '"'] {
        if text.len() >= 2 && text.starts_with(quote) && text.ends_with(quote) {
            return !text[1..text.len() - 1].contains(quote);
        }
    }
    false
}

fn strip_generics(name: &str) -> &str {
    match name.find('<') {
        Some(i) => name[..i].trim_end(),
        None => name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn array_spellings_agree() {
        assert_eq!(normalize("A[]"), normalize("Array<A>"));
        assert_eq!(normalize("A[]"), TypeExpr::ListOf(Box::new(TypeExpr::named("A"))));
        assert_eq!(normalize("Array<A>[]"), normalize("A[][]"));
    }

    #[test]
    fn variant_dedups_in_first_seen_order() {
        assert_eq!(
            normalize("A | B | A"),
            TypeExpr::Variant(vec![TypeExpr::named("A"), TypeExpr::named("B")])
        );
        assert_eq!(normalize("A | (B | A)"), normalize("A | B"));
    }

    #[test]
    fn undefined_alternatives_are_dropped() {
        assert_eq!(normalize("string | undefined"), TypeExpr::Scalar(Scalar::String));
    }

    #[test]
    fn literals_and_objects() {
        assert_eq!(normalize("'full'"), TypeExpr::Scalar(Scalar::String));
        assert_eq!(
            normalize("'a' | 'b'"),
            TypeExpr::Scalar(Scalar::String),
            "alternatives of the same literal kind collapse"
        );
        assert_eq!(normalize("{ [uri: string]: TextEdit[]; }"), TypeExpr::Scalar(Scalar::Object));
        assert_eq!(normalize("A & { b: string }"), TypeExpr::Scalar(Scalar::Object));
        assert_eq!(normalize("Foo | 'x'"), TypeExpr::dynamic());
    }

    #[test]
    fn builtins_and_generics() {
        assert_eq!(normalize("[number, number]"), TypeExpr::Scalar(Scalar::IntPair));
        assert_eq!(normalize("uinteger"), TypeExpr::Scalar(Scalar::Int));
        assert_eq!(normalize("void"), TypeExpr::Scalar(Scalar::Null));
        assert_eq!(normalize("ProgressParams<T>"), TypeExpr::named("ProgressParams"));
    }

    #[test]
    fn list_of_union_keeps_parens() {
        let t = normalize("(TextEdit | InsertReplaceEdit)[]");
        assert_eq!(t.to_string(), "(TextEdit | InsertReplaceEdit)[]");
        assert_eq!(normalize("TextEdit | InsertReplaceEdit[]").to_string(), "TextEdit | InsertReplaceEdit[]");
    }

    #[test]
    fn idempotent_through_display() {
        for src in [
            "A[]",
            "Array<A | null>",
            "Location | Location[] | LocationLink[] | null",
            "(  string |  number )[]",
            "'a' | 'b'",
            "{ a: string }",
            "[number, number] | undefined",
            "integer",
        ] {
            let once = normalize(src);
            assert_eq!(normalize(&once.to_string()), once, "{src}");
        }
    }
}
