//! Dependency-first struct order.

use std::collections::HashSet;

use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::ir::Struct;

/// Orders `structs` so that every struct comes after the structs it extends
/// or mentions in its members. Ties keep declaration order.
pub fn order_structs<'a>(structs: &'a [Struct], diagnostics: &mut Diagnostics) -> Vec<&'a Struct> {
    let mut orderer = Orderer {
        structs,
        emitted: vec![false; structs.len()],
        on_stack: vec![false; structs.len()],
        out: Vec::with_capacity(structs.len()),
        diagnostics,
    };
    for index in 0..structs.len() {
        orderer.visit(index);
    }
    orderer.out
}

struct Orderer<'a, 'd> {
    structs: &'a [Struct],
    emitted: Vec<bool>,
    on_stack: Vec<bool>,
    out: Vec<&'a Struct>,
    diagnostics: &'d mut Diagnostics,
}

impl<'a> Orderer<'a, '_> {
    fn visit(&mut self, index: usize) {
        if self.emitted[index] {
            return;
        }
        self.on_stack[index] = true;
        let structs = self.structs;
        let current = &structs[index];
        let referenced: HashSet<&str> = current.referenced_names().into_iter().collect();
        for (other_index, other) in structs.iter().enumerate() {
            if other_index == index || self.emitted[other_index] || !referenced.contains(other.name.as_str()) {
                continue;
            }
            if self.on_stack[other_index] {
                self.diagnostics.push(
                    DiagnosticKind::DependencyCycle,
                    current.name.as_str(),
                    format!("`{}` and `{}` depend on each other", current.name, other.name),
                );
                continue;
            }
            self.visit(other_index);
        }
        self.on_stack[index] = false;
        self.emitted[index] = true;
        self.out.push(current);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Member, TypeExpr};

    fn s(name: &str, parents: &[&str], refs: &[&str]) -> Struct {
        let mut s = Struct::new(name);
        s.parent_names = parents.iter().map(|p| p.to_string()).collect();
        s.members = refs
            .iter()
            .map(|r| Member {
                name: r.to_lowercase(),
                ty: TypeExpr::ListOf(Box::new(TypeExpr::named(*r))),
                is_optional: false,
            })
            .collect();
        s
    }

    fn names(order: &[&Struct]) -> Vec<String> {
        order.iter().map(|s| s.name.clone()).collect()
    }

    #[test]
    fn dependencies_come_first() {
        let structs = vec![
            s("Hover", &["Base"], &["MarkupContent"]),
            s("MarkupContent", &[], &[]),
            s("Base", &[], &["Position"]),
            s("Position", &[], &[]),
        ];
        let mut diags = Diagnostics::new();
        let order = order_structs(&structs, &mut diags);
        assert_eq!(names(&order), vec!["MarkupContent", "Position", "Base", "Hover"]);
        assert!(diags.is_empty());
    }

    #[test]
    fn self_reference_is_emitted_once() {
        let structs = vec![s("SelectionRange", &[], &["SelectionRange", "Range"]), s("Range", &[], &[])];
        let mut diags = Diagnostics::new();
        let order = order_structs(&structs, &mut diags);
        assert_eq!(names(&order), vec!["Range", "SelectionRange"]);
        assert!(diags.is_empty());
    }

    #[test]
    fn cycles_are_reported_and_terminate() {
        let structs = vec![s("A", &[], &["B"]), s("B", &[], &["A"])];
        let mut diags = Diagnostics::new();
        let order = order_structs(&structs, &mut diags);
        assert_eq!(names(&order), vec!["B", "A"]);
        assert_eq!(diags.count(DiagnosticKind::DependencyCycle), 1);
    }

    #[test]
    fn order_is_reproducible() {
        let structs = vec![
            s("C", &["A"], &["B"]),
            s("B", &[], &["A"]),
            s("A", &[], &[]),
        ];
        let first = names(&order_structs(&structs, &mut Diagnostics::new()));
        let second = names(&order_structs(&structs, &mut Diagnostics::new()));
        assert_eq!(first, vec!["A", "B", "C"]);
        assert_eq!(first, second);
    }
}
