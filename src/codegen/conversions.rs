//! Wire conversions for generated enums.

use std::collections::HashSet;

use super::{Codegen, HEADER, type_ident};
use crate::ir::{Enum, RepresentationKind};

pub(super) fn emit(enums: &[Enum]) -> String {
    let mut cg = Codegen::new();
    cg.raw(HEADER);
    cg.line("");
    cg.line("use super::types::*;");
    cg.line("");
    emit_error_type(&mut cg);
    for e in enums {
        cg.line("");
        match e.representation_kind {
            RepresentationKind::Numeric => emit_numeric(&mut cg, e),
            RepresentationKind::String => emit_string(&mut cg, e),
        }
    }
    cg.into_string()
}

fn emit_error_type(cg: &mut Codegen) {
    cg.line("/// A wire value that names no member of the target enum.");
    cg.line("#[derive(Debug, Clone, PartialEq, Eq)]");
    cg.open("pub struct UnknownEnumValue {");
    cg.line("pub enum_name: &'static str,");
    cg.line("pub value: String,");
    cg.close("}");
    cg.line("");
    cg.open("impl std::fmt::Display for UnknownEnumValue {");
    cg.open("fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {");
    cg.line("write!(f, \"unknown {} value `{}`\", self.enum_name, self.value)");
    cg.close("}");
    cg.close("}");
    cg.line("");
    cg.line("impl std::error::Error for UnknownEnumValue {}");
}

/// Variants that are actually declared, skipping repeated names and values.
fn declared(e: &Enum) -> Vec<(String, &str)> {
    let mut names = HashSet::new();
    let mut values = HashSet::new();
    let mut out = Vec::new();
    for member in &e.members {
        let ident = type_ident(&member.name);
        if !names.insert(ident.clone()) || !values.insert(member.value.as_str()) {
            continue;
        }
        out.push((ident, member.value.as_str()));
    }
    out
}

fn emit_numeric(cg: &mut Codegen, e: &Enum) {
    let name = type_ident(&e.name);
    let variants = declared(e);

    cg.open(&format!("impl From<{name}> for i64 {{"));
    cg.open(&format!("fn from(value: {name}) -> Self {{"));
    if variants.is_empty() {
        cg.line("match value {}");
    } else {
        cg.line("value as i64");
    }
    cg.close("}");
    cg.close("}");
    cg.line("");

    cg.open(&format!("impl TryFrom<i64> for {name} {{"));
    cg.line("type Error = UnknownEnumValue;");
    cg.line("");
    cg.open("fn try_from(value: i64) -> Result<Self, Self::Error> {");
    cg.open("match value {");
    for (ident, value) in &variants {
        cg.line(&format!("{value} => Ok(Self::{ident}),"));
    }
    cg.open("other => Err(UnknownEnumValue {");
    cg.line(&format!("enum_name: {:?},", e.name));
    cg.line("value: other.to_string(),");
    cg.close("}),");
    cg.close("}");
    cg.close("}");
    cg.close("}");
}

fn emit_string(cg: &mut Codegen, e: &Enum) {
    let name = type_ident(&e.name);
    let variants = declared(e);

    cg.open(&format!("impl {name} {{"));
    cg.open("pub fn as_str(&self) -> &'static str {");
    if variants.is_empty() {
        cg.line("match *self {}");
    } else {
        cg.open("match self {");
        for (ident, value) in &variants {
            cg.line(&format!("Self::{ident} => {value:?},"));
        }
        cg.close("}");
    }
    cg.close("}");
    cg.line("");
    cg.line("/// Case-insensitive lookup of a wire value.");
    cg.open("pub fn from_wire(value: &str) -> Result<Self, UnknownEnumValue> {");
    for (ident, value) in &variants {
        cg.open(&format!("if value.eq_ignore_ascii_case({value:?}) {{"));
        cg.line(&format!("return Ok(Self::{ident});"));
        cg.close("}");
    }
    cg.open("Err(UnknownEnumValue {");
    cg.line(&format!("enum_name: {:?},", e.name));
    cg.line("value: value.to_string(),");
    cg.close("})");
    cg.close("}");
    cg.close("}");
    cg.line("");

    cg.open(&format!("impl std::fmt::Display for {name} {{"));
    cg.open("fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {");
    cg.line("f.write_str(self.as_str())");
    cg.close("}");
    cg.close("}");
}
