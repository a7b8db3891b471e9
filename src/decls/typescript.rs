//! TypeScript declarations via tree-sitter.
//!
//! Reads interfaces, enums, namespaces of constants and type aliases. Member
//! types stay as source text unless they are object literals written in place.

use tree_sitter::{Node, Parser};

use super::{
    DeclarationParser, EnumShape, ExternalDeclaration, ExternalEnumMember, ExternalMember,
    ExternalType,
};
use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::error::CompileError;

#[derive(Debug, Default, Clone, Copy)]
pub struct TypeScriptDeclarations;

impl DeclarationParser for TypeScriptDeclarations {
    fn parse(&self, source: &str, diagnostics: &mut Diagnostics) -> Result<Vec<ExternalDeclaration>, CompileError> {
        let mut parser = Parser::new();
        parser
            .set_language(&arborium_typescript::language().into())
            .map_err(|e| CompileError::DeclarationParser(format!("tree-sitter init: {e}")))?;
        let tree = parser
            .parse(source, None)
            .ok_or_else(|| CompileError::DeclarationParser("failed to parse TypeScript".into()))?;

        let mut ctx = ExtractContext { source, diagnostics };
        let mut out = Vec::new();
        let root = tree.root_node();
        let mut cursor = root.walk();
        for child in root.children(&mut cursor) {
            ctx.statement(child, &mut out);
        }
        tracing::debug!(declarations = out.len(), "parsed TypeScript declarations");
        Ok(out)
    }
}

struct ExtractContext<'a, 'd> {
    source: &'a str,
    diagnostics: &'d mut Diagnostics,
}

impl<'a> ExtractContext<'a, '_> {
    fn node_text(&self, node: Node) -> &'a str {
        node.utf8_text(self.source.as_bytes()).unwrap_or("")
    }

    /// Records a construct that has no counterpart in the declaration model.
    fn unsupported(&mut self, owner: &str, node: Node) {
        let first_line = self.node_text(node).lines().next().unwrap_or("").trim();
        self.diagnostics.push(
            DiagnosticKind::UnsupportedDeclaration,
            owner,
            format!(
                "skipped {} `{first_line}` at line {}",
                node.kind().replace('_', " "),
                node.start_position().row + 1
            ),
        );
    }

    fn statement(&mut self, node: Node, out: &mut Vec<ExternalDeclaration>) {
        match node.kind() {
            "interface_declaration" => out.extend(self.interface(node)),
            "enum_declaration" => out.extend(self.enumeration(node)),
            "type_alias_declaration" => out.extend(self.alias(node)),
            "internal_module" | "module" => out.extend(self.namespace(node)),
            "export_statement" => {
                if let Some(decl) = node.child_by_field_name("declaration") {
                    self.statement(decl, out);
                }
            }
            "expression_statement" => {
                let mut cursor = node.walk();
                for child in node.named_children(&mut cursor) {
                    self.statement(child, out);
                }
            }
            "comment" | "empty_statement" | "import_statement" | "hash_bang_line" => {}
            _ if !node.is_named() => {}
            _ => self.unsupported("<top level>", node),
        }
    }

    // ---- interfaces ----

    fn interface(&mut self, node: Node) -> Option<ExternalDeclaration> {
        let name = self.node_text(node.child_by_field_name("name")?);
        let body = node.child_by_field_name("body")?;

        let mut extends = Vec::new();
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            if child.kind() == "extends_type_clause" {
                let mut inner = child.walk();
                for parent in child.named_children(&mut inner) {
                    extends.push(strip_type_arguments(self.node_text(parent)).to_string());
                }
            }
        }

        let (members, index_signatures) = self.object_members(body, name);
        Some(ExternalDeclaration::Interface {
            name: name.to_string(),
            extends,
            members,
            index_signatures,
        })
    }

    fn object_members(&mut self, body: Node, owner: &str) -> (Vec<ExternalMember>, usize) {
        let mut members = Vec::new();
        let mut index_signatures = 0;
        let mut cursor = body.walk();
        for child in body.named_children(&mut cursor) {
            match child.kind() {
                "property_signature" => {
                    if let Some(member) = self.property(child, owner) {
                        members.push(member);
                    }
                }
                "index_signature" => index_signatures += 1,
                "comment" => {}
                // method, call and construct signatures
                _ => self.unsupported(owner, child),
            }
        }
        (members, index_signatures)
    }

    fn property(&mut self, node: Node, owner: &str) -> Option<ExternalMember> {
        let name = self.node_text(node.child_by_field_name("name")?);
        let name = name.trim_matches(|c| c == '\'' || c == '"').to_string();
        let is_optional = self.has_question_mark(node);
        let ty = match node.child_by_field_name("type") {
            Some(annotation) => self.annotation(annotation, &format!("{owner}.{name}")),
            None => ExternalType::reference("any"),
        };
        Some(ExternalMember {
            name,
            ty,
            is_optional,
        })
    }

    fn has_question_mark(&self, node: Node) -> bool {
        let mut cursor = node.walk();
        node.children(&mut cursor)
            .any(|child| !child.is_named() && self.node_text(child) == "?")
    }

    /// The type inside a `: T` annotation.
    fn annotation(&mut self, node: Node, owner: &str) -> ExternalType {
        let inner = if node.kind() == "type_annotation" {
            let mut cursor = node.walk();
            node.named_children(&mut cursor).next()
        } else {
            Some(node)
        };
        match inner {
            Some(ty) => self.external_type(ty, owner),
            None => ExternalType::reference("any"),
        }
    }

    fn external_type(&mut self, node: Node, owner: &str) -> ExternalType {
        match node.kind() {
            "object_type" => {
                let (members, index_signatures) = self.object_members(node, owner);
                ExternalType::InlineObjectLiteral {
                    members,
                    index_signatures,
                }
            }
            "parenthesized_type" => {
                let mut cursor = node.walk();
                let inner = node.named_children(&mut cursor).next();
                match inner {
                    Some(inner) if inner.kind() == "object_type" => self.external_type(inner, owner),
                    _ => ExternalType::reference(self.node_text(node)),
                }
            }
            _ => ExternalType::reference(self.node_text(node)),
        }
    }

    // ---- enums ----

    fn enumeration(&mut self, node: Node) -> Option<ExternalDeclaration> {
        let name = self.node_text(node.child_by_field_name("name")?);
        let body = node.child_by_field_name("body")?;
        let mut members = Vec::new();
        let mut cursor = body.walk();
        for child in body.named_children(&mut cursor) {
            match child.kind() {
                "enum_assignment" => {
                    let Some(member) = child.child_by_field_name("name") else {
                        continue;
                    };
                    members.push(ExternalEnumMember {
                        name: self.node_text(member).to_string(),
                        initializer: child
                            .child_by_field_name("value")
                            .map(|v| self.node_text(v).to_string()),
                    });
                }
                "property_identifier" => members.push(ExternalEnumMember {
                    name: self.node_text(child).to_string(),
                    initializer: None,
                }),
                "comment" => {}
                _ => self.unsupported(name, child),
            }
        }
        Some(ExternalDeclaration::Enum {
            name: name.to_string(),
            shape: EnumShape::Enumeration,
            members,
        })
    }

    /// `namespace X { export const a: 1 = 1; }`
    fn namespace(&mut self, node: Node) -> Option<ExternalDeclaration> {
        let name = self.node_text(node.child_by_field_name("name")?);
        let body = node.child_by_field_name("body")?;
        let mut members = Vec::new();
        self.constants(body, name, &mut members);
        Some(ExternalDeclaration::Enum {
            name: name.to_string(),
            shape: EnumShape::Namespace,
            members,
        })
    }

    fn constants(&mut self, node: Node, owner: &str, out: &mut Vec<ExternalEnumMember>) {
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            match child.kind() {
                "export_statement" | "lexical_declaration" | "variable_declaration" => {
                    self.constants(child, owner, out)
                }
                "variable_declarator" => {
                    if let Some(name) = child.child_by_field_name("name") {
                        out.push(ExternalEnumMember {
                            name: self.node_text(name).to_string(),
                            initializer: child
                                .child_by_field_name("value")
                                .map(|v| self.node_text(v).to_string()),
                        });
                    }
                }
                "comment" => {}
                _ => self.unsupported(owner, child),
            }
        }
    }

    // ---- aliases ----

    fn alias(&mut self, node: Node) -> Option<ExternalDeclaration> {
        let name = self.node_text(node.child_by_field_name("name")?);
        let value = node.child_by_field_name("value")?;
        Some(ExternalDeclaration::Alias {
            name: name.to_string(),
            ty: self.external_type(value, name),
        })
    }
}

fn strip_type_arguments(text: &str) -> &str {
    match text.find('<') {
        Some(i) => text[..i].trim_end(),
        None => text.trim(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> Vec<ExternalDeclaration> {
        let mut diagnostics = Diagnostics::new();
        let decls = TypeScriptDeclarations.parse(source, &mut diagnostics).unwrap();
        assert!(diagnostics.is_empty(), "{}", diagnostics.render());
        decls
    }

    #[test]
    fn interface_with_parents_and_inline_object() {
        let decls = parse(
            r#"
export interface HoverParams extends TextDocumentPositionParams, WorkDoneProgressParams {
    position: Position;
    context?: {
        triggerKind: number;
        [key: string]: any;
    };
    options: { [key: string]: string };
}
"#,
        );
        let ExternalDeclaration::Interface { name, extends, members, index_signatures } = &decls[0]
        else {
            panic!("expected interface, got {decls:?}");
        };
        assert_eq!(name, "HoverParams");
        assert_eq!(extends, &["TextDocumentPositionParams", "WorkDoneProgressParams"]);
        assert_eq!(*index_signatures, 0);
        assert_eq!(members[0].ty, ExternalType::reference("Position"));
        assert!(members[1].is_optional);
        match &members[1].ty {
            ExternalType::InlineObjectLiteral { members, index_signatures } => {
                assert_eq!(members.len(), 1);
                assert_eq!(*index_signatures, 1);
            }
            other => panic!("expected object literal, got {other:?}"),
        }
    }

    #[test]
    fn enums_and_namespaces() {
        let decls = parse(
            r#"
export namespace DiagnosticSeverity {
    export const Error: 1 = 1;
    export const Warning: 2 = 2;
}

export enum Kind { A, B = 'b' }

export type DocumentUri = string;
"#,
        );
        assert_eq!(decls.len(), 3);
        match &decls[0] {
            ExternalDeclaration::Enum { name, shape, members } => {
                assert_eq!(name, "DiagnosticSeverity");
                assert_eq!(*shape, EnumShape::Namespace);
                assert_eq!(members[1].initializer.as_deref(), Some("2"));
            }
            other => panic!("unexpected {other:?}"),
        }
        match &decls[1] {
            ExternalDeclaration::Enum { members, .. } => {
                assert_eq!(members[0].initializer, None);
                assert_eq!(members[1].initializer.as_deref(), Some("'b'"));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(
            decls[2],
            ExternalDeclaration::Alias {
                name: "DocumentUri".into(),
                ty: ExternalType::reference("string"),
            }
        );
    }

    #[test]
    fn method_signatures_are_reported_and_skipped() {
        let mut diagnostics = Diagnostics::new();
        let decls = TypeScriptDeclarations
            .parse(
                r#"
interface Disposable {
    /** release resources */
    dispose(): void;
    (value: string): void;
    id: string;
}

function helper(): void {}
"#,
                &mut diagnostics,
            )
            .unwrap();
        let ExternalDeclaration::Interface { members, .. } = &decls[0] else {
            panic!("expected interface, got {decls:?}");
        };
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].name, "id");
        assert_eq!(decls.len(), 1);

        let skipped: Vec<_> = diagnostics
            .iter()
            .filter(|d| d.kind == DiagnosticKind::UnsupportedDeclaration)
            .map(|d| d.path.as_str())
            .collect();
        assert_eq!(skipped, vec!["Disposable", "Disposable", "<top level>"]);
        assert!(diagnostics.iter().next().is_some_and(|d| d.message.contains("`dispose(): void")));
    }
}
