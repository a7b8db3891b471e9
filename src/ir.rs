//! Strongly-typed model shared by every compiler phase.
//!
//! Text comes in through `markdown`/`decls`, gets normalized into [`TypeExpr`],
//! grouped into [`Struct`]/[`Enum`] by `model` and into descriptors by `binder`.
//! Nothing here knows about the target language.

use std::fmt;

use serde::Serialize;

// ————————————————————————————————————————————————————————————————————————————
// TYPE EXPRESSIONS
// ————————————————————————————————————————————————————————————————————————————

/// Builtin scalar kinds of the target type system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Scalar {
    String,
    Int,
    Bool,
    /// `any`/`unknown` and every fallback: an opaque JSON value.
    Dynamic,
    Null,
    /// `object`, inline `{ ... }` literals and intersections.
    Object,
    /// `[number, number]`
    IntPair,
}

impl Scalar {
    /// Spelling that normalizes back to this scalar.
    pub fn canonical(self) -> &'static str {
        match self {
            Scalar::String => "string",
            Scalar::Int => "number",
            Scalar::Bool => "boolean",
            Scalar::Dynamic => "any",
            Scalar::Null => "null",
            Scalar::Object => "object",
            Scalar::IntPair => "[number, number]",
        }
    }
}

/// Canonical form of a type reference.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "of", rename_all = "camelCase")]
pub enum TypeExpr {
    Named(String),
    Scalar(Scalar),
    ListOf(Box<TypeExpr>),
    /// Flattened, deduplicated alternatives in first-seen order.
    /// A `Scalar(Null)` alternative marks the whole variant as nullable.
    Variant(Vec<TypeExpr>),
    InlineStruct(Box<Struct>),
}

impl TypeExpr {
    pub fn named(name: impl Into<String>) -> Self {
        TypeExpr::Named(name.into())
    }

    pub fn dynamic() -> Self {
        TypeExpr::Scalar(Scalar::Dynamic)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, TypeExpr::Scalar(Scalar::Null))
    }

    /// True for a variant carrying a null alternative.
    pub fn is_nullable(&self) -> bool {
        match self {
            TypeExpr::Variant(alts) => alts.iter().any(TypeExpr::is_null),
            other => other.is_null(),
        }
    }

    /// Name of a plain named reference.
    pub fn as_named(&self) -> Option<&str> {
        match self {
            TypeExpr::Named(name) => Some(name),
            _ => None,
        }
    }

    /// Calls `f` for every named reference, descending into lists, variants
    /// and the members of inline structs.
    pub fn visit_named<'a>(&'a self, f: &mut impl FnMut(&'a str)) {
        match self {
            TypeExpr::Named(name) => f(name),
            TypeExpr::Scalar(_) => {}
            TypeExpr::ListOf(inner) => inner.visit_named(f),
            TypeExpr::Variant(alts) => {
                for alt in alts {
                    alt.visit_named(f);
                }
            }
            TypeExpr::InlineStruct(s) => {
                for member in &s.members {
                    member.ty.visit_named(f);
                }
            }
        }
    }

    /// Rebuilds the expression with every named reference passed through `f`.
    pub fn map_named(&self, f: &mut impl FnMut(&str) -> TypeExpr) -> TypeExpr {
        match self {
            TypeExpr::Named(name) => f(name),
            TypeExpr::Scalar(s) => TypeExpr::Scalar(*s),
            TypeExpr::ListOf(inner) => TypeExpr::ListOf(Box::new(inner.map_named(f))),
            TypeExpr::Variant(alts) => {
                variant_of(alts.iter().map(|alt| alt.map_named(f)).collect())
            }
            TypeExpr::InlineStruct(s) => {
                let mut s = (**s).clone();
                for member in &mut s.members {
                    member.ty = member.ty.map_named(f);
                }
                TypeExpr::InlineStruct(Box::new(s))
            }
        }
    }
}

/// Builds a variant: nested variants are flattened, duplicates dropped
/// (first occurrence wins) and a lone survivor is returned unwrapped.
pub fn variant_of(alts: Vec<TypeExpr>) -> TypeExpr {
    let mut out: Vec<TypeExpr> = Vec::with_capacity(alts.len());
    for alt in alts {
        let flat = match alt {
            TypeExpr::Variant(inner) => inner,
            other => vec![other],
        };
        for t in flat {
            if !out.contains(&t) {
                out.push(t);
            }
        }
    }
    match out.len() {
        0 => TypeExpr::Scalar(Scalar::Null),
        1 => out.remove(0),
        _ => TypeExpr::Variant(out),
    }
}

impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeExpr::Named(name) => f.write_str(name),
            TypeExpr::Scalar(s) => f.write_str(s.canonical()),
            TypeExpr::ListOf(inner) => match **inner {
                TypeExpr::Variant(_) => write!(f, "({inner})[]"),
                _ => write!(f, "{inner}[]"),
            },
            TypeExpr::Variant(alts) => {
                for (i, alt) in alts.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" | ")?;
                    }
                    write!(f, "{alt}")?;
                }
                Ok(())
            }
            // inline structs only exist in member position; the name is enough
            TypeExpr::InlineStruct(s) => f.write_str(&s.name),
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// DECLARATIONS
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub name: String,
    pub ty: TypeExpr,
    pub is_optional: bool,
}

/// A record type, one per declared interface (or inline object literal).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Struct {
    pub name: String,
    pub parent_names: Vec<String>,
    pub members: Vec<Member>,
    /// Declared with an index signature: unknown keys must be kept.
    pub has_open_fields: bool,
}

impl Struct {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent_names: Vec::new(),
            members: Vec::new(),
            has_open_fields: false,
        }
    }

    /// Every name this struct depends on (parents first, then member
    /// references in declaration order). May contain duplicates and itself.
    pub fn referenced_names(&self) -> Vec<&str> {
        let mut out: Vec<&str> = self.parent_names.iter().map(String::as_str).collect();
        for member in &self.members {
            member.ty.visit_named(&mut |name| out.push(name));
        }
        out
    }

    /// True when `member` points back at the struct outside of a list.
    pub fn is_self_slot(&self, member: &Member) -> bool {
        fn direct(ty: &TypeExpr, name: &str) -> bool {
            match ty {
                TypeExpr::Named(n) => n == name,
                TypeExpr::Variant(alts) => alts.iter().any(|alt| direct(alt, name)),
                _ => false,
            }
        }
        direct(&member.ty, &self.name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RepresentationKind {
    Numeric,
    String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnumMember {
    pub name: String,
    /// Literal value with quotes removed.
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Enum {
    pub name: String,
    pub members: Vec<EnumMember>,
    pub representation_kind: RepresentationKind,
}

// ————————————————————————————————————————————————————————————————————————————
// PROTOCOL DESCRIPTORS
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestDescriptor {
    pub binding_name: String,
    pub wire_method: String,
    pub params_type: TypeExpr,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_type: Option<TypeExpr>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partial_result_type: Option<TypeExpr>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_info: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationDescriptor {
    pub binding_name: String,
    pub wire_method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params_type: Option<TypeExpr>,
    /// Params shape is maintained by hand; routed but not bound.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub special: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Side {
    Client,
    Server,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CapabilityDescriptor {
    pub side: Side,
    pub property_path: String,
    pub property_type: TypeExpr,
}
