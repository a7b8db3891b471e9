//! Declarations → structs, enums and the alias table.

use std::collections::HashSet;

use indexmap::IndexMap;

use crate::config::Config;
use crate::decls::{ExternalDeclaration, ExternalEnumMember, ExternalMember, ExternalType};
use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::ir::{Enum, EnumMember, Member, RepresentationKind, Scalar, Struct, TypeExpr};
use crate::normalize::normalize;
use crate::text::upper_case;

#[derive(Debug, Clone, Default)]
pub struct TypeModel {
    pub structs: Vec<Struct>,
    pub enums: Vec<Enum>,
    /// `type X = ...` declarations that name neither a struct nor an enum.
    pub aliases: IndexMap<String, TypeExpr>,
}

impl TypeModel {
    pub fn struct_named(&self, name: &str) -> Option<&Struct> {
        self.structs.iter().find(|s| s.name == name)
    }

    pub fn enum_named(&self, name: &str) -> Option<&Enum> {
        self.enums.iter().find(|e| e.name == name)
    }

    pub fn declares(&self, name: &str) -> bool {
        self.struct_named(name).is_some() || self.enum_named(name).is_some()
    }

    /// Replaces every alias name in `ty` with what it stands for.
    pub fn expand(&self, ty: &TypeExpr, diagnostics: &mut Diagnostics) -> TypeExpr {
        expand_aliases(ty, &self.aliases, &mut Vec::new(), diagnostics)
    }
}

pub fn extract_model(
    declarations: &[ExternalDeclaration],
    config: &Config,
    diagnostics: &mut Diagnostics,
) -> TypeModel {
    let mut model = TypeModel::default();
    let mut seen: HashSet<String> = HashSet::new();
    let mut pending_aliases: Vec<(&str, &ExternalType)> = Vec::new();

    for declaration in declarations {
        match declaration {
            ExternalDeclaration::Interface {
                name,
                extends,
                members,
                index_signatures,
            } => {
                let name = match config.special_structs.get(name) {
                    Some(None) => continue,
                    Some(Some(renamed)) => renamed.clone(),
                    None => name.clone(),
                };
                if !register(&mut seen, &name, diagnostics) {
                    continue;
                }
                let mut s = Struct::new(name);
                s.parent_names = extends.clone();
                s.members = members.iter().map(member).collect();
                s.has_open_fields = *index_signatures > 0;
                model.structs.push(s);
            }
            ExternalDeclaration::Enum { name, members, .. } => {
                let name = match config.special_enums.get(name) {
                    Some(None) => continue,
                    Some(Some(renamed)) => renamed.clone(),
                    None => name.clone(),
                };
                if !register(&mut seen, &name, diagnostics) {
                    continue;
                }
                model.enums.push(enumeration(name, members, diagnostics));
            }
            ExternalDeclaration::Alias { name, ty } => pending_aliases.push((name.as_str(), ty)),
        }
    }

    for (name, ty) in pending_aliases {
        if seen.contains(name) || config.is_handwritten(name) || config.special_structs.contains_key(name) {
            continue;
        }
        match ty {
            ExternalType::InlineObjectLiteral {
                members,
                index_signatures,
            } => {
                seen.insert(name.to_string());
                let mut s = Struct::new(name);
                s.members = members.iter().map(member).collect();
                s.has_open_fields = *index_signatures > 0;
                model.structs.push(s);
            }
            ExternalType::NamedReference { text } => {
                if model.aliases.contains_key(name) {
                    diagnostics.push(
                        DiagnosticKind::DuplicateDeclaration,
                        name,
                        "alias declared twice; keeping the first",
                    );
                    continue;
                }
                model.aliases.insert(name.to_string(), normalize(text));
            }
        }
    }

    let aliases = model.aliases.clone();
    for s in &mut model.structs {
        for parent in &mut s.parent_names {
            let resolved = expand_aliases(&TypeExpr::named(parent.as_str()), &aliases, &mut Vec::new(), diagnostics);
            if let TypeExpr::Named(target) = resolved {
                *parent = target;
            }
        }
        expand_struct(s, &aliases, diagnostics);
    }

    tracing::debug!(
        structs = model.structs.len(),
        enums = model.enums.len(),
        aliases = model.aliases.len(),
        "extracted type model"
    );
    model
}

/// First declaration of a name wins.
fn register(seen: &mut HashSet<String>, name: &str, diagnostics: &mut Diagnostics) -> bool {
    if seen.insert(name.to_string()) {
        return true;
    }
    diagnostics.push(
        DiagnosticKind::DuplicateDeclaration,
        name,
        format!("`{name}` is already declared; keeping the first declaration"),
    );
    false
}

fn member(member: &ExternalMember) -> Member {
    let ty = match &member.ty {
        ExternalType::NamedReference { text } => normalize(text),
        ExternalType::InlineObjectLiteral {
            members,
            index_signatures,
        } => {
            if members.is_empty() {
                if *index_signatures > 0 {
                    TypeExpr::dynamic()
                } else {
                    TypeExpr::Scalar(Scalar::Object)
                }
            } else {
                let mut inline = Struct::new(upper_case(&member.name));
                inline.members = members.iter().map(self::member).collect();
                inline.has_open_fields = *index_signatures > 0;
                TypeExpr::InlineStruct(Box::new(inline))
            }
        }
    };
    Member {
        name: member.name.clone(),
        ty,
        is_optional: member.is_optional,
    }
}

fn enumeration(name: String, members: &[ExternalEnumMember], diagnostics: &mut Diagnostics) -> Enum {
    let mut representation_kind = RepresentationKind::Numeric;
    // `None` once the count has run past `i64::MAX`
    let mut next: Option<i64> = Some(0);
    let mut out = Vec::with_capacity(members.len());
    for m in members {
        let value = match &m.initializer {
            Some(raw) => {
                let raw = raw.trim();
                let value = raw.replace(['\'', '"'], "");
                match value.parse::<i64>() {
                    Ok(n) if value == raw => next = n.checked_add(1),
                    _ => representation_kind = RepresentationKind::String,
                }
                value
            }
            None => match next {
                Some(n) => {
                    next = n.checked_add(1);
                    n.to_string()
                }
                None => {
                    diagnostics.push(
                        DiagnosticKind::UnsupportedDeclaration,
                        format!("{name}.{}", m.name),
                        "implicit value would overflow i64; member skipped",
                    );
                    continue;
                }
            },
        };
        out.push(EnumMember {
            name: upper_case(&m.name),
            value,
        });
    }
    Enum {
        name,
        members: out,
        representation_kind,
    }
}

fn expand_struct(s: &mut Struct, aliases: &IndexMap<String, TypeExpr>, diagnostics: &mut Diagnostics) {
    for member in &mut s.members {
        member.ty = match &mut member.ty {
            TypeExpr::InlineStruct(inline) => {
                expand_struct(inline, aliases, diagnostics);
                continue;
            }
            ty => expand_aliases(ty, aliases, &mut Vec::new(), diagnostics),
        };
    }
}

fn expand_aliases(
    ty: &TypeExpr,
    aliases: &IndexMap<String, TypeExpr>,
    visiting: &mut Vec<String>,
    diagnostics: &mut Diagnostics,
) -> TypeExpr {
    ty.map_named(&mut |name: &str| {
        let Some(target) = aliases.get(name) else {
            return TypeExpr::named(name);
        };
        if visiting.iter().any(|v| v == name) {
            diagnostics.push(
                DiagnosticKind::RecursiveAlias,
                name,
                format!("alias `{name}` expands into itself; using a dynamic value"),
            );
            return TypeExpr::dynamic();
        }
        visiting.push(name.to_string());
        let expanded = expand_aliases(target, aliases, visiting, diagnostics);
        visiting.pop();
        expanded
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decls::EnumShape;

    fn interface(name: &str, members: Vec<ExternalMember>) -> ExternalDeclaration {
        ExternalDeclaration::Interface {
            name: name.into(),
            extends: Vec::new(),
            members,
            index_signatures: 0,
        }
    }

    fn field(name: &str, text: &str) -> ExternalMember {
        ExternalMember {
            name: name.into(),
            ty: ExternalType::reference(text),
            is_optional: false,
        }
    }

    fn enum_decl(name: &str, members: &[(&str, Option<&str>)]) -> ExternalDeclaration {
        ExternalDeclaration::Enum {
            name: name.into(),
            shape: EnumShape::Namespace,
            members: members
                .iter()
                .map(|(n, v)| ExternalEnumMember {
                    name: n.to_string(),
                    initializer: v.map(str::to_string),
                })
                .collect(),
        }
    }

    #[test]
    fn enum_representation_kinds() {
        let decls = vec![
            enum_decl("Numbers", &[("a", Some("1")), ("b", Some("2"))]),
            enum_decl("Words", &[("a", Some("'a'")), ("b", Some("'b'"))]),
            enum_decl("Counted", &[("first", None), ("second", Some("5")), ("third", None)]),
        ];
        let model = extract_model(&decls, &Config::default(), &mut Diagnostics::new());
        assert_eq!(model.enums[0].representation_kind, RepresentationKind::Numeric);
        assert_eq!(model.enums[0].members[0].name, "A");
        assert_eq!(model.enums[1].representation_kind, RepresentationKind::String);
        assert_eq!(model.enums[1].members[1].value, "b");
        let values: Vec<_> = model.enums[2].members.iter().map(|m| m.value.as_str()).collect();
        assert_eq!(values, vec!["0", "5", "6"]);
    }

    #[test]
    fn implicit_value_past_i64_max_is_skipped() {
        let decls = vec![enum_decl(
            "Wide",
            &[("max", Some("9223372036854775807")), ("next", None), ("low", Some("-1")), ("zero", None)],
        )];
        let mut diags = Diagnostics::new();
        let model = extract_model(&decls, &Config::default(), &mut diags);
        let values: Vec<_> = model.enums[0].members.iter().map(|m| m.value.as_str()).collect();
        assert_eq!(values, vec!["9223372036854775807", "-1", "0"]);
        assert_eq!(model.enums[0].representation_kind, RepresentationKind::Numeric);
        assert_eq!(diags.count(DiagnosticKind::UnsupportedDeclaration), 1);
        assert_eq!(diags.iter().next().map(|d| d.path.as_str()), Some("Wide.next"));
    }

    #[test]
    fn quoted_number_makes_a_string_enum() {
        let decls = vec![enum_decl("Version", &[("v1", Some("'1'"))])];
        let model = extract_model(&decls, &Config::default(), &mut Diagnostics::new());
        assert_eq!(model.enums[0].representation_kind, RepresentationKind::String);
    }

    #[test]
    fn inline_objects_become_structs_or_dynamic() {
        let decls = vec![interface(
            "Options",
            vec![
                ExternalMember {
                    name: "workspace".into(),
                    ty: ExternalType::InlineObjectLiteral {
                        members: vec![field("folders", "boolean")],
                        index_signatures: 0,
                    },
                    is_optional: true,
                },
                ExternalMember {
                    name: "changes".into(),
                    ty: ExternalType::InlineObjectLiteral {
                        members: Vec::new(),
                        index_signatures: 1,
                    },
                    is_optional: false,
                },
            ],
        )];
        let model = extract_model(&decls, &Config::default(), &mut Diagnostics::new());
        let s = &model.structs[0];
        match &s.members[0].ty {
            TypeExpr::InlineStruct(inline) => assert_eq!(inline.name, "Workspace"),
            other => panic!("expected inline struct, got {other:?}"),
        }
        assert_eq!(s.members[1].ty, TypeExpr::dynamic());
    }

    #[test]
    fn specials_and_duplicates() {
        let decls = vec![
            interface("Message", vec![field("jsonrpc", "string")]),
            enum_decl("InitializeError", &[("unknownProtocolVersion", Some("1"))]),
            interface("InitializeError", vec![field("retry", "boolean")]),
            interface("A", vec![]),
            interface("A", vec![field("x", "string")]),
        ];
        let mut diags = Diagnostics::new();
        let model = extract_model(&decls, &Config::default(), &mut diags);
        assert!(model.struct_named("Message").is_none());
        assert!(model.enum_named("InitializeErrorCode").is_some());
        assert!(model.struct_named("InitializeError").is_some());
        assert!(model.struct_named("A").unwrap().members.is_empty());
        assert_eq!(diags.count(DiagnosticKind::DuplicateDeclaration), 1);
    }

    #[test]
    fn aliases_expand_and_cycles_degrade() {
        let decls = vec![
            interface("Location", vec![field("uri", "DocumentUri")]),
            ExternalDeclaration::Alias {
                name: "DocumentUri".into(),
                ty: ExternalType::reference("string"),
            },
            ExternalDeclaration::Alias {
                name: "Definition".into(),
                ty: ExternalType::reference("Location | Location[]"),
            },
            ExternalDeclaration::Alias {
                name: "Loop".into(),
                ty: ExternalType::reference("Loop[]"),
            },
            interface("Uses", vec![field("d", "Definition"), field("l", "Loop")]),
        ];
        let mut diags = Diagnostics::new();
        let model = extract_model(&decls, &Config::default(), &mut diags);
        let location = model.struct_named("Location").unwrap();
        assert_eq!(location.members[0].ty, TypeExpr::Scalar(Scalar::String));
        let uses = model.struct_named("Uses").unwrap();
        assert_eq!(uses.members[0].ty.to_string(), "Location | Location[]");
        assert_eq!(uses.members[1].ty.to_string(), "any[]");
        assert!(diags.has(DiagnosticKind::RecursiveAlias));
    }

    #[test]
    fn parents_named_through_an_alias_point_at_the_struct() {
        let mut child = interface("Child", vec![field("b", "string")]);
        if let ExternalDeclaration::Interface { extends, .. } = &mut child {
            extends.push("BaseOptions".into());
            extends.push("Text".into());
        }
        let decls = vec![
            interface("Options", vec![field("a", "string")]),
            ExternalDeclaration::Alias {
                name: "BaseOptions".into(),
                ty: ExternalType::reference("Options"),
            },
            ExternalDeclaration::Alias {
                name: "Text".into(),
                ty: ExternalType::reference("string"),
            },
            child,
        ];
        let model = extract_model(&decls, &Config::default(), &mut Diagnostics::new());
        let child = model.struct_named("Child").unwrap();
        assert_eq!(child.parent_names, vec!["Options", "Text"]);
    }

    #[test]
    fn alias_to_object_literal_is_a_struct() {
        let decls = vec![ExternalDeclaration::Alias {
            name: "Pair".into(),
            ty: ExternalType::InlineObjectLiteral {
                members: vec![field("a", "string")],
                index_signatures: 0,
            },
        }];
        let model = extract_model(&decls, &Config::default(), &mut Diagnostics::new());
        assert_eq!(model.structs[0].name, "Pair");
        assert!(model.aliases.is_empty());
    }
}
