//! One compiler invocation: markdown + declarations → artifacts.

use indexmap::IndexSet;

use crate::binder::{ProtocolBindings, bind};
use crate::codegen::{Artifacts, generate};
use crate::config::Config;
use crate::decls::{DeclarationParser, fenced_declaration_source};
use crate::diagnostics::Diagnostics;
use crate::error::{CompileError, UnresolvedReference};
use crate::ir::TypeExpr;
use crate::markdown::{StructuredProtocol, extract};
use crate::model::{TypeModel, extract_model};
use crate::order::order_structs;

/// Everything a successful run produced.
#[derive(Debug, Clone)]
pub struct CompileOutput {
    pub protocol: StructuredProtocol,
    pub model: TypeModel,
    pub bindings: ProtocolBindings,
    /// Struct names in emission order.
    pub struct_order: Vec<String>,
    pub artifacts: Artifacts,
}

/// Holds the configuration, the declaration parser and the diagnostics of
/// a single run. Diagnostics survive a failed [`CompilerRun::compile`].
pub struct CompilerRun<'p> {
    config: Config,
    parser: &'p dyn DeclarationParser,
    extra_declarations: Vec<String>,
    diagnostics: Diagnostics,
}

impl<'p> CompilerRun<'p> {
    pub fn new(config: Config, parser: &'p dyn DeclarationParser) -> Self {
        Self {
            config,
            parser,
            extra_declarations: Vec::new(),
            diagnostics: Diagnostics::new(),
        }
    }

    /// Declaration source parsed alongside the fenced blocks of the document.
    pub fn add_declarations(&mut self, source: impl Into<String>) {
        self.extra_declarations.push(source.into());
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn compile(&mut self, markdown: &str) -> Result<CompileOutput, CompileError> {
        let protocol = extract(markdown, &mut self.diagnostics);
        tracing::debug!(sections = protocol.structured_sequence.len(), "extracted structured tree");

        let mut source = fenced_declaration_source(markdown);
        for extra in self.extra_declarations.iter().chain([&self.config.supplementary_declarations]) {
            source.push('\n');
            source.push_str(extra);
        }
        let declarations = self.parser.parse(&source, &mut self.diagnostics)?;
        tracing::debug!(declarations = declarations.len(), "parsed declarations");

        let model = extract_model(&declarations, &self.config, &mut self.diagnostics);
        let bindings = bind(&protocol, &model, &self.config, &mut self.diagnostics)?;

        let unresolved = unresolved_references(&model, &bindings, &self.config);
        if !unresolved.is_empty() {
            return Err(CompileError::UnresolvedReferences(unresolved));
        }

        let ordered = order_structs(&model.structs, &mut self.diagnostics);
        let struct_order = ordered.iter().map(|s| s.name.clone()).collect();
        let artifacts = generate(&ordered, &model.enums, &bindings, &self.config);
        tracing::info!(
            structs = model.structs.len(),
            enums = model.enums.len(),
            requests = bindings.requests.len(),
            notifications = bindings.notifications.len(),
            diagnostics = self.diagnostics.len(),
            "compiled protocol"
        );

        Ok(CompileOutput {
            protocol,
            model,
            bindings,
            struct_order,
            artifacts,
        })
    }
}

/// Every referenced name that is neither declared, aliased nor supplied by
/// hand, once per (name, referrer) pair. Parents must name a struct or a
/// handwritten type; aliases have already been followed.
fn unresolved_references(model: &TypeModel, bindings: &ProtocolBindings, config: &Config) -> Vec<UnresolvedReference> {
    let resolved = |name: &str| model.declares(name) || model.aliases.contains_key(name) || config.is_handwritten(name);
    let mut found: IndexSet<(String, String)> = IndexSet::new();
    for s in &model.structs {
        for parent in &s.parent_names {
            if model.struct_named(parent).is_none() && !config.is_handwritten(parent) {
                found.insert((parent.clone(), s.name.clone()));
            }
        }
    }
    let mut check = |ty: &TypeExpr, referrer: &str| {
        ty.visit_named(&mut |name| {
            if !resolved(name) {
                found.insert((name.to_string(), referrer.to_string()));
            }
        });
    };

    for s in &model.structs {
        for member in &s.members {
            check(&member.ty, &s.name);
        }
    }
    for request in &bindings.requests {
        let referrer = format!("request {}", request.wire_method);
        check(&request.params_type, &referrer);
        for ty in [&request.result_type, &request.partial_result_type].into_iter().flatten() {
            check(ty, &referrer);
        }
    }
    for notification in &bindings.notifications {
        if let Some(params) = &notification.params_type {
            check(params, &format!("notification {}", notification.wire_method));
        }
    }
    for cap in &bindings.capabilities {
        check(&cap.property_type, &format!("capability {}", cap.property_path));
    }

    found
        .into_iter()
        .map(|(name, referenced_by)| UnresolvedReference { name, referenced_by })
        .collect()
}
