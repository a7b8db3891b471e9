//! Rust source emission.
//!
//! Produces four files meant to live together in one module directory:
//! `types.rs`, `conversions.rs`, `bindings.rs` and a `mod.rs` tying them up.

mod bindings;
mod conversions;
mod types;

use indexmap::IndexMap;

use crate::binder::ProtocolBindings;
use crate::config::Config;
use crate::ir::{Enum, Scalar, Struct, TypeExpr};

pub const HEADER: &str = "// @generated by lspgen. Do not edit by hand.\n";

/// The generated sources, keyed by their intended file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifacts {
    pub types: String,
    pub conversions: String,
    pub bindings: String,
    pub module_index: String,
}

impl Artifacts {
    pub fn files(&self) -> [(&'static str, &str); 4] {
        [
            ("mod.rs", &self.module_index),
            ("types.rs", &self.types),
            ("conversions.rs", &self.conversions),
            ("bindings.rs", &self.bindings),
        ]
    }
}

/// `structs` must already be in emission order.
pub fn generate(
    structs: &[&Struct],
    enums: &[Enum],
    bindings: &ProtocolBindings,
    config: &Config,
) -> Artifacts {
    let mut renderer = TypeRenderer::default();
    let bindings_src = bindings::emit(bindings, &mut renderer);
    let types_src = types::emit(structs, enums, &mut renderer, config);
    let conversions_src = conversions::emit(enums);

    let mut index = Codegen::new();
    index.raw(HEADER);
    index.line("");
    index.line("pub mod bindings;");
    index.line("pub mod conversions;");
    index.line("pub mod types;");
    index.line("");
    index.line("pub use bindings::*;");
    index.line("pub use conversions::UnknownEnumValue;");
    index.line("pub use types::*;");

    Artifacts {
        types: types_src,
        conversions: conversions_src,
        bindings: bindings_src,
        module_index: index.into_string(),
    }
}

// ————————————————————————————————————————————————————————————————————————————
// OUTPUT BUFFER
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Default)]
pub(crate) struct Codegen {
    out: String,
    indent: usize,
}

impl Codegen {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn line(&mut self, text: &str) {
        if !text.is_empty() {
            for _ in 0..self.indent {
                self.out.push_str("    ");
            }
            self.out.push_str(text);
        }
        self.out.push('\n');
    }

    pub(crate) fn raw(&mut self, text: &str) {
        self.out.push_str(text);
    }

    pub(crate) fn open(&mut self, text: &str) {
        self.line(text);
        self.indent += 1;
    }

    pub(crate) fn close(&mut self, text: &str) {
        self.indent = self.indent.saturating_sub(1);
        self.line(text);
    }

    pub(crate) fn into_string(self) -> String {
        self.out
    }
}

// ————————————————————————————————————————————————————————————————————————————
// TYPE RENDERING
// ————————————————————————————————————————————————————————————————————————————

/// Renders [`TypeExpr`]s as Rust types and remembers the untagged enums the
/// rendered text depends on.
#[derive(Debug, Default)]
pub(crate) struct TypeRenderer {
    variants: IndexMap<String, Vec<TypeExpr>>,
}

impl TypeRenderer {
    pub(crate) fn render(&mut self, ty: &TypeExpr) -> String {
        match ty {
            TypeExpr::Named(name) => type_ident(name),
            TypeExpr::Scalar(scalar) => scalar_type(*scalar).to_string(),
            TypeExpr::ListOf(inner) => format!("Vec<{}>", self.render(inner)),
            TypeExpr::InlineStruct(s) => type_ident(&s.name),
            TypeExpr::Variant(alts) => {
                let present: Vec<&TypeExpr> = alts.iter().filter(|alt| !alt.is_null()).collect();
                let inner = match present.as_slice() {
                    [] => return "()".to_string(),
                    [single] => self.render(single),
                    _ => {
                        let name = variant_name(&present);
                        if !self.variants.contains_key(&name) {
                            let owned: Vec<TypeExpr> = present.iter().map(|alt| (*alt).clone()).collect();
                            self.variants.insert(name.clone(), owned);
                            for alt in &present {
                                self.render(alt);
                            }
                        }
                        name
                    }
                };
                if ty.is_nullable() {
                    format!("Option<{inner}>")
                } else {
                    inner
                }
            }
        }
    }

    /// Untagged enums registered so far, in first-use order.
    pub(crate) fn variants(&self) -> impl Iterator<Item = (&String, &Vec<TypeExpr>)> {
        self.variants.iter()
    }
}

fn scalar_type(scalar: Scalar) -> &'static str {
    match scalar {
        Scalar::String => "String",
        Scalar::Int => "i64",
        Scalar::Bool => "bool",
        Scalar::Dynamic => "serde_json::Value",
        Scalar::Null => "()",
        Scalar::Object => "serde_json::Map<String, serde_json::Value>",
        Scalar::IntPair => "(i64, i64)",
    }
}

/// Identifier-safe name of one alternative.
pub(crate) fn alternative_name(ty: &TypeExpr) -> String {
    match ty {
        TypeExpr::Named(name) => type_ident(name),
        TypeExpr::InlineStruct(s) => type_ident(&s.name),
        TypeExpr::Scalar(Scalar::String) => "String".to_string(),
        TypeExpr::Scalar(Scalar::Int) => "Integer".to_string(),
        TypeExpr::Scalar(Scalar::Bool) => "Boolean".to_string(),
        TypeExpr::Scalar(Scalar::Dynamic) => "Any".to_string(),
        TypeExpr::Scalar(Scalar::Null) => "Null".to_string(),
        TypeExpr::Scalar(Scalar::Object) => "Object".to_string(),
        TypeExpr::Scalar(Scalar::IntPair) => "IntPair".to_string(),
        TypeExpr::ListOf(inner) => format!("{}List", alternative_name(inner)),
        TypeExpr::Variant(alts) => alts
            .iter()
            .filter(|alt| !alt.is_null())
            .map(alternative_name)
            .collect::<Vec<_>>()
            .join("Or"),
    }
}

fn variant_name(alts: &[&TypeExpr]) -> String {
    alts.iter()
        .map(|alt| alternative_name(alt))
        .collect::<Vec<_>>()
        .join("Or")
}

// ————————————————————————————————————————————————————————————————————————————
// IDENTIFIERS
// ————————————————————————————————————————————————————————————————————————————

const KEYWORDS: &[&str] = &[
    "abstract", "as", "async", "await", "become", "box", "break", "const", "continue", "do",
    "dyn", "else", "enum", "extern", "false", "final", "fn", "for", "gen", "if", "impl", "in",
    "let", "loop", "macro", "match", "mod", "move", "mut", "override", "priv", "pub", "ref",
    "return", "static", "struct", "trait", "true", "try", "type", "typeof", "unsafe", "unsized",
    "use", "virtual", "where", "while", "yield",
];

/// Keeps ASCII alphanumerics and `_`; never starts with a digit.
fn sanitize(name: &str) -> String {
    let mut out: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    if out.is_empty() || out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    out
}

pub(crate) fn type_ident(name: &str) -> String {
    let ident = sanitize(name);
    if ident == "Self" { "Self_".to_string() } else { ident }
}

pub(crate) fn snake_case(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c.is_ascii_uppercase() {
            let prev_lower = i > 0 && (chars[i - 1].is_ascii_lowercase() || chars[i - 1].is_ascii_digit());
            let next_lower = chars.get(i + 1).is_some_and(|n| n.is_ascii_lowercase());
            let prev_upper = i > 0 && chars[i - 1].is_ascii_uppercase();
            if i > 0 && !out.ends_with('_') && (prev_lower || (prev_upper && next_lower)) {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
        } else if c.is_ascii_alphanumeric() {
            out.push(c);
        } else if !out.ends_with('_') {
            out.push('_');
        }
    }
    sanitize(&out)
}

pub(crate) fn screaming_snake(name: &str) -> String {
    snake_case(name).to_ascii_uppercase()
}

/// Field identifier for a wire name, with raw identifiers for keywords.
pub(crate) fn field_ident(name: &str) -> String {
    let snake = snake_case(name);
    match snake.as_str() {
        "self" | "super" | "crate" => format!("{snake}_"),
        s if KEYWORDS.contains(&s) => format!("r#{snake}"),
        _ => snake,
    }
}

/// The name serde sees for a field identifier.
pub(crate) fn serde_name(ident: &str) -> &str {
    ident.strip_prefix("r#").unwrap_or(ident)
}
