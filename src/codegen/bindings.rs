//! Method constants, capability paths, parameter/result aliases and the
//! method → binding-name lookups.

use std::collections::HashSet;

use super::{Codegen, HEADER, TypeRenderer, alternative_name, screaming_snake, type_ident};
use crate::binder::ProtocolBindings;
use crate::ir::{Side, TypeExpr};
use crate::text::namify;

pub(super) fn emit(bindings: &ProtocolBindings, renderer: &mut TypeRenderer) -> String {
    let mut cg = Codegen::new();
    cg.raw(HEADER);
    cg.line("");
    cg.line("use serde::{Deserialize, Serialize};");
    cg.line("");
    cg.line("#[allow(unused_imports)]");
    cg.line("use super::types::*;");

    for (side, module) in [(Side::Client, "client_capabilities"), (Side::Server, "server_capabilities")] {
        cg.line("");
        open_module(&mut cg, module);
        let mut names = HashSet::new();
        for cap in bindings.capabilities.iter().filter(|cap| cap.side == side) {
            let constant = screaming_snake(&cap.property_path);
            if !names.insert(constant.clone()) {
                continue;
            }
            cg.line("");
            cg.line(&format!("pub const {constant}: &str = {:?};", cap.property_path));
            let alias = type_ident(&format!("{}Type", namify(&cap.property_path)));
            cg.line(&format!("pub type {alias} = {};", renderer.render(&cap.property_type)));
        }
        cg.close("}");
    }

    cg.line("");
    open_module(&mut cg, "requests");
    let mut names = HashSet::new();
    for request in &bindings.requests {
        if !names.insert(request.binding_name.clone()) {
            continue;
        }
        cg.line("");
        method_constant(&mut cg, &request.binding_name, &request.wire_method);
        cg.line(&format!(
            "pub type {}ParamsType = {};",
            type_ident(&request.binding_name),
            renderer.render(&request.params_type)
        ));
    }
    cg.close("}");

    cg.line("");
    open_module(&mut cg, "responses");
    let mut names = HashSet::new();
    for request in &bindings.requests {
        let Some(result) = &request.result_type else { continue };
        if !names.insert(request.binding_name.clone()) {
            continue;
        }
        let ident = type_ident(&request.binding_name);
        cg.line("");
        if let Some(error) = &request.error_info {
            cg.line(&format!("/// Error: {}", error.trim()));
        }
        cg.line(&format!("pub type {ident}ResultType = {};", renderer.render(result)));
        if let Some(partial) = &request.partial_result_type {
            cg.line(&format!("pub type {ident}PartialResultType = {};", renderer.render(partial)));
        }
    }
    cg.close("}");

    cg.line("");
    open_module(&mut cg, "notifications");
    let mut names = HashSet::new();
    for notification in &bindings.notifications {
        if !names.insert(notification.binding_name.clone()) {
            continue;
        }
        cg.line("");
        method_constant(&mut cg, &notification.binding_name, &notification.wire_method);
        match &notification.params_type {
            Some(params) if !notification.special => cg.line(&format!(
                "pub type {}ParamsType = {};",
                type_ident(&notification.binding_name),
                renderer.render(params)
            )),
            _ => {}
        }
    }
    cg.close("}");

    cg.line("");
    dispatch_enum(&mut cg, "RequestParams", &bindings.request_params, renderer);
    cg.line("");
    dispatch_enum(&mut cg, "NotificationParams", &bindings.notification_params, renderer);

    cg.line("");
    lookup(&mut cg, "request_method_to_binding_name", bindings.request_method_map.iter());
    cg.line("");
    lookup(&mut cg, "notification_method_to_binding_name", bindings.notification_method_map.iter());
    cg.into_string()
}

fn open_module(cg: &mut Codegen, name: &str) {
    cg.open(&format!("pub mod {name} {{"));
    cg.line("#[allow(unused_imports)]");
    cg.line("use super::*;");
}

fn method_constant(cg: &mut Codegen, binding_name: &str, wire_method: &str) {
    cg.line(&format!("pub const {}_METHOD: &str = {wire_method:?};", screaming_snake(binding_name)));
}

/// Untagged enum over every distinct parameter type, with a catch-all.
fn dispatch_enum(cg: &mut Codegen, name: &str, params: &[TypeExpr], renderer: &mut TypeRenderer) {
    cg.line("#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]");
    cg.line("#[serde(untagged)]");
    cg.open(&format!("pub enum {name} {{"));
    let mut variants = HashSet::new();
    for ty in params {
        let variant = alternative_name(ty);
        if !variants.insert(variant.clone()) {
            continue;
        }
        cg.line(&format!("{variant}({}),", renderer.render(ty)));
    }
    if !variants.contains("Other") {
        cg.line("Other(serde_json::Value),");
    }
    cg.close("}");
}

fn lookup<'a>(cg: &mut Codegen, name: &str, entries: impl Iterator<Item = (&'a String, &'a String)>) {
    cg.open(&format!("pub fn {name}(method: &str) -> Option<&'static str> {{"));
    cg.open("match method {");
    for (method, binding) in entries {
        cg.line(&format!("{method:?} => Some({binding:?}),"));
    }
    cg.line("_ => None,");
    cg.close("}");
    cg.close("}");
}
