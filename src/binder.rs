//! Structured tree + type model → request, notification and capability
//! descriptors.

use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;
use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value, json};

use crate::config::{Config, Strictness};
use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::error::CompileError;
use crate::ir::{CapabilityDescriptor, NotificationDescriptor, RequestDescriptor, Side, TypeExpr};
use crate::markdown::{StructuredEntry, StructuredNode, StructuredProtocol};
use crate::model::TypeModel;
use crate::text::{TextFragment, extract_type, namify};

const SERVER_CAPABILITY: &str = "Server Capability";
const CLIENT_CAPABILITY: &str = "Client Capability";
const REQUEST: &str = "Request";
const RESPONSE: &str = "Response";
const NOTIFICATION: &str = "Notification";

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtocolBindings {
    pub requests: Vec<RequestDescriptor>,
    pub notifications: Vec<NotificationDescriptor>,
    pub capabilities: Vec<CapabilityDescriptor>,
    /// Distinct request parameter types, first-seen order.
    pub request_params: Vec<TypeExpr>,
    /// Distinct notification parameter types, special ones left out.
    pub notification_params: Vec<TypeExpr>,
    /// Wire method → binding name, for requests that have a response.
    pub request_method_map: IndexMap<String, String>,
    pub notification_method_map: IndexMap<String, String>,
    /// Per-section view of what was bound, for debugging.
    #[serde(skip)]
    pub descriptor_tree: Value,
}

pub fn bind(
    protocol: &StructuredProtocol,
    model: &TypeModel,
    config: &Config,
    diagnostics: &mut Diagnostics,
) -> Result<ProtocolBindings, CompileError> {
    let ignorable = config.ignorable_path_patterns()?;
    let mut binder = Binder {
        model,
        config,
        ignorable,
        diagnostics,
        bindings: ProtocolBindings::default(),
        request_params_known: HashSet::new(),
        notification_params_known: HashSet::new(),
        request_binding_methods: HashMap::new(),
        notification_binding_methods: HashMap::new(),
    };
    let mut tree = Map::new();
    for key in &protocol.structured_sequence {
        match protocol.structured.get(key) {
            Some(StructuredEntry::Node(node)) => {
                let groups = binder.groups(key, node)?;
                tree.insert(key.clone(), Value::Object(groups));
            }
            Some(StructuredEntry::Text(fragment)) => binder.unconsumed("", key, fragment),
            None => {}
        }
    }
    binder.bindings.descriptor_tree = Value::Object(tree);
    tracing::debug!(
        requests = binder.bindings.requests.len(),
        notifications = binder.bindings.notifications.len(),
        capabilities = binder.bindings.capabilities.len(),
        "bound protocol"
    );
    Ok(binder.bindings)
}

struct Binder<'a> {
    model: &'a TypeModel,
    config: &'a Config,
    ignorable: Vec<Regex>,
    diagnostics: &'a mut Diagnostics,
    bindings: ProtocolBindings,
    request_params_known: HashSet<String>,
    notification_params_known: HashSet<String>,
    /// Binding name → wire method that claimed it first.
    request_binding_methods: HashMap<String, String>,
    notification_binding_methods: HashMap<String, String>,
}

/// Fields read from a `Request` or `Notification` group.
struct Call {
    method: String,
    params: Option<TypeExpr>,
    binding_name: String,
}

impl Binder<'_> {
    fn groups(&mut self, path: &str, node: &StructuredNode) -> Result<Map<String, Value>, CompileError> {
        let mut out = Map::new();

        for (key, side, label) in [
            (SERVER_CAPABILITY, Side::Server, "ServerCapability"),
            (CLIENT_CAPABILITY, Side::Client, "ClientCapability"),
        ] {
            if let Some(entry) = node.get(key) {
                if let Some(cap) = self.capability(path, side, entry) {
                    out.insert(
                        label.to_string(),
                        json!({ "propertyPath": cap.property_path, "propertyType": cap.property_type.to_string() }),
                    );
                    self.bindings.capabilities.push(cap);
                }
            }
        }

        let explicit_request = node.get(REQUEST).and_then(StructuredEntry::as_node);
        let implicit_request = node.contains_key("method") && node.contains_key(RESPONSE);
        if explicit_request.is_some() || implicit_request {
            let request_node = explicit_request.unwrap_or(node);
            if let Some(value) = self.request(path, request_node, node.get(RESPONSE))? {
                out.insert("Request".to_string(), value);
            }
        } else if let Some(notification) = node.get(NOTIFICATION).and_then(StructuredEntry::as_node) {
            if let Some(value) = self.notification(path, notification) {
                out.insert("Notification".to_string(), value);
            }
        } else {
            if node.contains_key(RESPONSE) {
                self.pairing(DiagnosticKind::ResponseWithoutRequest, path, "Response without Request")?;
            }
            for (key, entry) in node {
                if [REQUEST, RESPONSE, NOTIFICATION, CLIENT_CAPABILITY, SERVER_CAPABILITY].contains(&key.as_str()) {
                    continue;
                }
                match entry {
                    StructuredEntry::Node(child) => {
                        let child_path = format!("{path}.{key}");
                        let groups = self.groups(&child_path, child)?;
                        out.insert(key.clone(), Value::Object(groups));
                    }
                    StructuredEntry::Text(fragment) => self.unconsumed(path, key, fragment),
                }
            }
        }
        Ok(out)
    }

    // ---- capabilities ----

    fn capability(&mut self, path: &str, side: Side, entry: &StructuredEntry) -> Option<CapabilityDescriptor> {
        let label = match side {
            Side::Server => "ServerCapability",
            Side::Client => "ClientCapability",
        };
        let Some(node) = entry.as_node() else {
            self.missing(path, format!("{label} is text, not a group"));
            return None;
        };
        let property_path = ["property path (optional)", "property name (optional)"]
            .into_iter()
            .find_map(|key| text(node, key))
            .and_then(TextFragment::first_name)
            .unwrap_or("")
            .to_string();
        let property_type = match text(node, "property type") {
            Some(fragment) => self.type_of(fragment, path),
            None => {
                self.missing(path, format!("{label} missing 'property type'"));
                TypeExpr::dynamic()
            }
        };
        if property_path.is_empty() {
            self.missing(path, format!("{label} missing 'property path (optional)'"));
            return None;
        }
        Some(CapabilityDescriptor {
            side,
            property_path,
            property_type,
        })
    }

    // ---- requests and notifications ----

    fn call(&mut self, path: &str, node: &StructuredNode, label: &str) -> Option<Call> {
        let method = text(node, "method").and_then(TextFragment::first_name).unwrap_or("");
        if method.is_empty() {
            self.missing(path, format!("{label} missing 'method'"));
            return None;
        }
        let raw_params = match text(node, "params") {
            Some(fragment) => Some(extract_type(
                fragment,
                &self.config.checked_type_extraction,
                self.diagnostics,
                path,
            )
            .into_type()),
            None => {
                self.missing(path, format!("{label} missing 'params'"));
                None
            }
        };
        let binding_name = match raw_params
            .as_ref()
            .and_then(TypeExpr::as_named)
            .and_then(|name| name.strip_suffix("Params"))
            .filter(|stem| !stem.is_empty())
        {
            Some(stem) => stem.to_string(),
            None => namify(path.rsplit('.').next().unwrap_or(path)),
        };
        let params = raw_params.map(|ty| self.model.expand(&ty, self.diagnostics));
        Some(Call {
            method: method.to_string(),
            params,
            binding_name,
        })
    }

    fn request(
        &mut self,
        path: &str,
        node: &StructuredNode,
        response: Option<&StructuredEntry>,
    ) -> Result<Option<Value>, CompileError> {
        let Some(call) = self.call(path, node, "Request") else {
            return Ok(None);
        };
        claim_binding_name(&mut self.request_binding_methods, self.diagnostics, path, &call);
        let params_type = call.params.unwrap_or_else(TypeExpr::dynamic);
        let mut descriptor = RequestDescriptor {
            binding_name: call.binding_name,
            wire_method: call.method,
            params_type,
            result_type: None,
            partial_result_type: None,
            error_info: None,
        };

        match response.and_then(StructuredEntry::as_node) {
            Some(response) => {
                descriptor.result_type = Some(match text(response, "result") {
                    Some(fragment) => self.type_of(fragment, path),
                    None => {
                        self.missing(path, "Response missing 'result'".to_string());
                        TypeExpr::dynamic()
                    }
                });
                descriptor.partial_result_type =
                    text(response, "partial result").map(|fragment| self.type_of(fragment, path));
                descriptor.error_info = text(response, "error").map(|fragment| fragment.text.clone());
                self.bindings
                    .request_method_map
                    .insert(descriptor.wire_method.clone(), descriptor.binding_name.clone());
            }
            None => self.pairing(DiagnosticKind::RequestWithoutResponse, path, "Request without Response")?,
        }

        if self.request_params_known.insert(descriptor.params_type.to_string()) {
            self.bindings.request_params.push(descriptor.params_type.clone());
        }

        let mut value = json!({
            "method": descriptor.wire_method,
            "params": descriptor.params_type.to_string(),
            "bindingName": descriptor.binding_name,
        });
        if let Some(result) = &descriptor.result_type {
            value["response"] = json!({ "result": result.to_string() });
            if let Some(partial) = &descriptor.partial_result_type {
                value["response"]["partialResult"] = json!(partial.to_string());
            }
            if let Some(error) = &descriptor.error_info {
                value["response"]["error"] = json!(error);
            }
        }
        self.bindings.requests.push(descriptor);
        Ok(Some(value))
    }

    fn notification(&mut self, path: &str, node: &StructuredNode) -> Option<Value> {
        let call = self.call(path, node, "Notification")?;
        claim_binding_name(&mut self.notification_binding_methods, self.diagnostics, path, &call);
        let special = call
            .params
            .as_ref()
            .and_then(TypeExpr::as_named)
            .is_some_and(|name| self.config.special_structs.contains_key(name));
        self.bindings
            .notification_method_map
            .insert(call.method.clone(), call.binding_name.clone());
        if let Some(params) = &call.params {
            if !special && self.notification_params_known.insert(params.to_string()) {
                self.bindings.notification_params.push(params.clone());
            }
        }
        let value = json!({
            "method": call.method,
            "params": call.params.as_ref().map(ToString::to_string),
            "bindingName": call.binding_name,
            "special": special,
        });
        self.bindings.notifications.push(NotificationDescriptor {
            binding_name: call.binding_name,
            wire_method: call.method,
            params_type: call.params,
            special,
        });
        Some(value)
    }

    // ---- helpers ----

    fn type_of(&mut self, fragment: &TextFragment, path: &str) -> TypeExpr {
        let ty = extract_type(fragment, &self.config.checked_type_extraction, self.diagnostics, path).into_type();
        self.model.expand(&ty, self.diagnostics)
    }

    fn missing(&mut self, path: &str, message: String) {
        self.diagnostics.push(DiagnosticKind::MissingField, path, message);
    }

    fn pairing(&mut self, kind: DiagnosticKind, path: &str, message: &str) -> Result<(), CompileError> {
        self.diagnostics.push(kind, path, message);
        match self.config.strictness {
            Strictness::Lenient => Ok(()),
            Strictness::Strict => Err(CompileError::Strict {
                kind: kind.as_str(),
                path: path.to_string(),
            }),
        }
    }

    fn unconsumed(&mut self, path: &str, key: &str, fragment: &TextFragment) {
        if self.ignorable.iter().any(|re| re.is_match(path)) {
            return;
        }
        let at = if path.is_empty() { key.to_string() } else { format!("{path}.{key}") };
        self.diagnostics.push(
            DiagnosticKind::UnconsumedFragment,
            at,
            format!("ignoring {:?}", fragment.text),
        );
    }
}

/// Generated items are keyed by binding name, so a second method with the
/// same name shares the first one's items.
fn claim_binding_name(claimed: &mut HashMap<String, String>, diagnostics: &mut Diagnostics, path: &str, call: &Call) {
    match claimed.get(&call.binding_name) {
        Some(first) if *first != call.method => diagnostics.push(
            DiagnosticKind::DuplicateDeclaration,
            path,
            format!(
                "binding name `{}` of `{}` is already used by `{first}`",
                call.binding_name, call.method
            ),
        ),
        Some(_) => {}
        None => {
            claimed.insert(call.binding_name.clone(), call.method.clone());
        }
    }
}

fn text<'n>(node: &'n StructuredNode, key: &str) -> Option<&'n TextFragment> {
    node.get(key).and_then(StructuredEntry::as_text)
}
