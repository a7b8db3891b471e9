//! Struct, enum and untagged-variant declarations.

use std::collections::HashSet;

use super::{Codegen, HEADER, TypeRenderer, alternative_name, field_ident, serde_name, snake_case, type_ident};
use crate::config::Config;
use crate::ir::{Enum, Member, RepresentationKind, Struct, TypeExpr};

pub(super) fn emit(structs: &[&Struct], enums: &[Enum], renderer: &mut TypeRenderer, config: &Config) -> String {
    let mut cg = Codegen::new();
    cg.raw(HEADER);
    cg.line("#![allow(clippy::large_enum_variant)]");
    cg.line("");
    cg.line("use serde::{Deserialize, Serialize};");
    let handwritten = config.handwritten_names();
    if let (Some(module), false) = (&config.handwritten_module, handwritten.is_empty()) {
        let names: Vec<String> = handwritten.iter().map(|n| type_ident(n)).collect();
        cg.line("");
        cg.line("#[allow(unused_imports)]");
        cg.line(&format!("pub use {module}::{{{}}};", names.join(", ")));
    }

    cg.line("");
    cg.line("// ---- enums ----");
    for e in enums {
        cg.line("");
        emit_enum(&mut cg, e);
    }

    cg.line("");
    cg.line("// ---- structs ----");
    for s in structs {
        cg.line("");
        emit_struct(&mut cg, s, &s.name, renderer);
    }

    cg.line("");
    cg.line("// ---- variants ----");
    let variants: Vec<(String, Vec<TypeExpr>)> =
        renderer.variants().map(|(name, alts)| (name.clone(), alts.clone())).collect();
    let mut emitted = HashSet::new();
    let mut pending = variants;
    // rendering an alternative can register further variants
    while !pending.is_empty() {
        for (name, alts) in std::mem::take(&mut pending) {
            if !emitted.insert(name.clone()) {
                continue;
            }
            cg.line("");
            emit_variant(&mut cg, &name, &alts, renderer);
        }
        pending = renderer
            .variants()
            .filter(|(name, _)| !emitted.contains(*name))
            .map(|(name, alts)| (name.clone(), alts.clone()))
            .collect();
    }
    cg.into_string()
}

// ---- structs ----

fn emit_struct(cg: &mut Codegen, s: &Struct, rust_name: &str, renderer: &mut TypeRenderer) {
    // inline member structs first, named after their owner
    for member in &s.members {
        if let TypeExpr::InlineStruct(inline) = &member.ty {
            let name = format!("{rust_name}{}", type_ident(&inline.name));
            emit_struct(cg, inline, &name, renderer);
            cg.line("");
        }
    }

    cg.line("#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]");
    cg.open(&format!("pub struct {} {{", type_ident(rust_name)));
    let mut used: HashSet<String> = s.members.iter().map(|m| field_ident(&m.name)).collect();
    for parent in &s.parent_names {
        let mut ident = snake_case(parent);
        while !used.insert(ident.clone()) {
            ident.push_str("_base");
        }
        cg.line("#[serde(flatten)]");
        cg.line(&format!("pub {ident}: {},", type_ident(parent)));
    }
    for member in &s.members {
        emit_member(cg, s, rust_name, member, renderer);
    }
    if s.has_open_fields {
        let mut ident = "extra_fields".to_string();
        while used.contains(&ident) {
            ident.insert(0, '_');
        }
        cg.line("#[serde(flatten)]");
        cg.line(&format!("pub {ident}: serde_json::Map<String, serde_json::Value>,"));
    }
    cg.close("}");
}

fn emit_member(cg: &mut Codegen, owner: &Struct, rust_name: &str, member: &Member, renderer: &mut TypeRenderer) {
    let ident = field_ident(&member.name);
    let base = match &member.ty {
        TypeExpr::InlineStruct(inline) => format!("{rust_name}{}", type_ident(&inline.name)),
        ty => renderer.render(ty),
    };
    let self_slot = owner.is_self_slot(member);
    let ty = if self_slot {
        let inner = base.strip_prefix("Option<").and_then(|b| b.strip_suffix('>')).unwrap_or(&base);
        format!("Option<Box<{inner}>>")
    } else if member.is_optional && !base.starts_with("Option<") {
        format!("Option<{base}>")
    } else {
        base
    };

    let mut attrs: Vec<String> = Vec::new();
    if serde_name(&ident) != member.name {
        attrs.push(format!("rename = {:?}", member.name));
    }
    if member.is_optional || self_slot {
        attrs.push("default".to_string());
        attrs.push("skip_serializing_if = \"Option::is_none\"".to_string());
    }
    if !attrs.is_empty() {
        cg.line(&format!("#[serde({})]", attrs.join(", ")));
    }
    cg.line(&format!("pub {ident}: {ty},"));
}

// ---- enums ----

fn emit_enum(cg: &mut Codegen, e: &Enum) {
    let name = type_ident(&e.name);
    let mut seen_values: Vec<(&str, String)> = Vec::new();
    let mut aliases: Vec<(String, String)> = Vec::new();
    let mut seen_names: HashSet<String> = HashSet::new();
    let mut variants: Vec<(String, &str)> = Vec::new();
    for member in &e.members {
        let ident = type_ident(&member.name);
        if !seen_names.insert(ident.clone()) {
            continue;
        }
        if let Some((_, first)) = seen_values.iter().find(|(v, _)| *v == member.value) {
            aliases.push((ident, first.clone()));
            continue;
        }
        seen_values.push((&member.value, ident.clone()));
        variants.push((ident, &member.value));
    }

    cg.line("#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]");
    match e.representation_kind {
        RepresentationKind::Numeric => {
            cg.line("#[serde(into = \"i64\", try_from = \"i64\")]");
            if !variants.is_empty() {
                cg.line("#[repr(i64)]");
            }
            cg.open(&format!("pub enum {name} {{"));
            for (ident, value) in &variants {
                cg.line(&format!("{ident} = {value},"));
            }
        }
        RepresentationKind::String => {
            cg.open(&format!("pub enum {name} {{"));
            for (ident, value) in &variants {
                cg.line(&format!("#[serde(rename = {value:?})]"));
                cg.line(&format!("{ident},"));
            }
        }
    }
    cg.close("}");

    if !aliases.is_empty() {
        cg.line("");
        cg.line("#[allow(non_upper_case_globals)]");
        cg.open(&format!("impl {name} {{"));
        for (alias, target) in &aliases {
            cg.line(&format!("pub const {alias}: Self = Self::{target};"));
        }
        cg.close("}");
    }
}

// ---- variants ----

fn emit_variant(cg: &mut Codegen, name: &str, alts: &[TypeExpr], renderer: &mut TypeRenderer) {
    cg.line("#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]");
    cg.line("#[serde(untagged)]");
    cg.open(&format!("pub enum {name} {{"));
    for alt in alts {
        let ty = renderer.render(alt);
        cg.line(&format!("{}({ty}),", alternative_name(alt)));
    }
    cg.close("}");
}
