use lspgen::decls::{EnumShape, ExternalDeclaration, ExternalEnumMember, ExternalMember, ExternalType};
use lspgen::ir::{Side, TypeExpr};
use lspgen::{CompileError, CompilerRun, Config, DeclarationParser, DiagnosticKind, Diagnostics};

/// Hands back a fixed declaration list whatever the source says.
struct InMemory(Vec<ExternalDeclaration>);

impl DeclarationParser for InMemory {
    fn parse(&self, _source: &str, _diagnostics: &mut Diagnostics) -> Result<Vec<ExternalDeclaration>, CompileError> {
        Ok(self.0.clone())
    }
}

fn interface(name: &str, extends: &[&str], members: &[(&str, &str, bool)]) -> ExternalDeclaration {
    ExternalDeclaration::Interface {
        name: name.to_string(),
        extends: extends.iter().map(|e| e.to_string()).collect(),
        members: members
            .iter()
            .map(|(n, t, optional)| ExternalMember {
                name: n.to_string(),
                ty: ExternalType::reference(*t),
                is_optional: *optional,
            })
            .collect(),
        index_signatures: 0,
    }
}

fn constants(name: &str, shape: EnumShape, members: &[(&str, &str)]) -> ExternalDeclaration {
    ExternalDeclaration::Enum {
        name: name.to_string(),
        shape,
        members: members
            .iter()
            .map(|(n, v)| ExternalEnumMember {
                name: n.to_string(),
                initializer: Some(v.to_string()),
            })
            .collect(),
    }
}

fn declarations() -> Vec<ExternalDeclaration> {
    vec![
        interface("Hover", &[], &[("contents", "MarkupContent", false), ("range", "Range", true)]),
        interface("HoverParams", &["TextDocumentPositionParams"], &[]),
        interface(
            "TextDocumentPositionParams",
            &[],
            &[("textDocument", "TextDocumentIdentifier", false), ("position", "Position", false)],
        ),
        interface("TextDocumentIdentifier", &[], &[("uri", "DocumentUri", false)]),
        interface("Range", &[], &[("start", "Position", false), ("end", "Position", false)]),
        interface("Position", &[], &[("line", "uinteger", false), ("character", "uinteger", false)]),
        interface("MarkupContent", &[], &[("kind", "MarkupKind", false), ("value", "string", false)]),
        interface(
            "SelectionRangeParams",
            &[],
            &[("textDocument", "TextDocumentIdentifier", false), ("positions", "Position[]", false)],
        ),
        interface("SelectionRange", &[], &[("range", "Range", false), ("parent", "SelectionRange", true)]),
        constants(
            "MarkupKind",
            EnumShape::Namespace,
            &[("PlainText", "'plaintext'"), ("Markdown", "'markdown'")],
        ),
        constants(
            "DiagnosticSeverity",
            EnumShape::Namespace,
            &[("Error", "1"), ("Warning", "2"), ("Information", "3"), ("Hint", "4")],
        ),
        ExternalDeclaration::Alias {
            name: "DocumentUri".to_string(),
            ty: ExternalType::reference("string"),
        },
    ]
}

const SPEC: &str = "\
# Protocol

#### Hover Request <a name=\"textDocument_hover\"></a>

The hover request is sent from the client to the server.

_Server Capability_:
* property name (optional): `hoverProvider`
* property type: `boolean`

_Request_:
* method: 'textDocument/hover'
* params: `HoverParams`

_Response_:
* result: `Hover | null`
* error: code and message set in case an exception happens during the hover request.

#### Selection Range Request <a name=\"textDocument_selectionRange\"></a>

_Request_:
* method: 'textDocument/selectionRange'
* params: `SelectionRangeParams`

_Response_:
* result: `SelectionRange[] | null`
* partial result: `SelectionRange[]`

#### Exit Notification <a name=\"exit\"></a>

_Notification_:
* method: 'exit'
* params: void

#### Progress <a name=\"progress\"></a>

_Notification_:
* method: '$/progress'
* params: `ProgressParams`
";

fn compile() -> lspgen::CompileOutput {
    let parser = InMemory(declarations());
    let mut run = CompilerRun::new(Config::default(), &parser);
    let output = run.compile(SPEC).unwrap();
    assert!(run.diagnostics().is_empty(), "{}", run.diagnostics().render());
    output
}

#[test]
fn requests_notifications_and_capabilities_are_bound() {
    let output = compile();
    let bindings = &output.bindings;

    let hover = &bindings.requests[0];
    assert_eq!(hover.binding_name, "Hover");
    assert_eq!(hover.wire_method, "textDocument/hover");
    assert_eq!(hover.params_type, TypeExpr::named("HoverParams"));
    assert_eq!(hover.result_type.as_ref().map(ToString::to_string).as_deref(), Some("Hover | null"));
    assert!(hover.error_info.as_deref().is_some_and(|e| e.starts_with("code and message")));

    let selection = &bindings.requests[1];
    assert_eq!(selection.binding_name, "SelectionRange");
    assert_eq!(
        selection.partial_result_type,
        Some(TypeExpr::ListOf(Box::new(TypeExpr::named("SelectionRange"))))
    );

    let names: Vec<(&str, bool)> = bindings
        .notifications
        .iter()
        .map(|n| (n.binding_name.as_str(), n.special))
        .collect();
    assert_eq!(names, vec![("Exit", false), ("Progress", true)]);
    assert_eq!(bindings.notification_method_map.get("$/progress").map(String::as_str), Some("Progress"));

    assert_eq!(bindings.capabilities.len(), 1);
    assert_eq!(bindings.capabilities[0].side, Side::Server);
    assert_eq!(bindings.capabilities[0].property_path, "hoverProvider");

    assert_eq!(
        output.protocol.structured_sequence,
        vec!["textDocument_hover", "textDocument_selectionRange", "exit", "progress"]
    );
    assert_eq!(
        bindings.descriptor_tree["textDocument_hover"]["Request"]["method"],
        "textDocument/hover"
    );
}

#[test]
fn structs_are_emitted_after_their_dependencies() {
    let output = compile();
    let position = |name: &str| output.struct_order.iter().position(|s| s == name).unwrap();
    assert!(position("MarkupContent") < position("Hover"));
    assert!(position("Range") < position("Hover"));
    assert!(position("Position") < position("Range"));
    assert!(position("TextDocumentPositionParams") < position("HoverParams"));
    assert!(position("Range") < position("SelectionRange"));

    let types = &output.artifacts.types;
    let at = |needle: &str| types.find(needle).unwrap_or_else(|| panic!("missing {needle}\n{types}"));
    assert!(at("pub struct Position {") < at("pub struct Range {"));
    assert!(at("pub struct Range {") < at("pub struct Hover {"));
}

#[test]
fn generated_types_follow_the_model() {
    let output = compile();
    let types = &output.artifacts.types;
    assert!(types.starts_with("// @generated by lspgen."));
    assert!(types.contains("pub use super::handwritten::{"));
    assert!(types.contains("    #[serde(flatten)]\n    pub text_document_position_params: TextDocumentPositionParams,"));
    assert!(types.contains("    pub uri: String,"), "alias should be expanded\n{types}");
    assert!(types.contains("    pub line: i64,"));
    assert!(types.contains("    pub parent: Option<Box<SelectionRange>>,"));
    assert!(types.contains("    pub range: Option<Range>,"));
    assert!(types.contains("    #[serde(rename = \"plaintext\")]\n    PlainText,"));
    assert!(types.contains("pub enum DiagnosticSeverity {\n    Error = 1,"));

    let conversions = &output.artifacts.conversions;
    assert!(conversions.contains("impl TryFrom<i64> for DiagnosticSeverity {"));
    assert!(conversions.contains("impl MarkupKind {"));
}

#[test]
fn generated_bindings_cover_every_method() {
    let output = compile();
    let bindings = &output.artifacts.bindings;
    assert!(bindings.contains("    pub const HOVER_METHOD: &str = \"textDocument/hover\";"), "{bindings}");
    assert!(bindings.contains("    pub type HoverResultType = Option<Hover>;"));
    assert!(bindings.contains("    pub type SelectionRangeResultType = Option<Vec<SelectionRange>>;"));
    assert!(bindings.contains("    pub type SelectionRangePartialResultType = Vec<SelectionRange>;"));
    assert!(bindings.contains("    pub const EXIT_METHOD: &str = \"exit\";"));
    assert!(bindings.contains("    pub type ExitParamsType = ();"));
    assert!(!bindings.contains("ProgressParamsType"));
    assert!(bindings.contains("    pub const HOVER_PROVIDER: &str = \"hoverProvider\";"));
    assert!(bindings.contains("    pub type HoverProviderType = bool;"));
    assert!(bindings.contains("        \"textDocument/selectionRange\" => Some(\"SelectionRange\"),"));
    assert!(bindings.contains("        \"$/progress\" => Some(\"Progress\"),"));
}

#[test]
fn shared_params_type_is_recorded_once() {
    let spec = "\
### One <a name=\"one\"></a>
_Request_:
* method: 'shared/one'
* params: `SharedParams`
_Response_:
* result: `null`

### Two <a name=\"two\"></a>
_Request_:
* method: 'shared/two'
* params: `SharedParams`
_Response_:
* result: `null`
";
    let parser = InMemory(vec![interface("SharedParams", &[], &[("value", "string", false)])]);
    let mut run = CompilerRun::new(Config::default(), &parser);
    let output = run.compile(spec).unwrap();
    assert_eq!(output.bindings.requests.len(), 2);
    assert_eq!(output.bindings.request_params, vec![TypeExpr::named("SharedParams")]);
    assert_eq!(output.artifacts.bindings.matches("SharedParams(SharedParams),").count(), 1);
}

#[test]
fn unresolved_references_end_the_run() {
    let mut decls = declarations();
    decls.retain(|d| d.name() != "Position");
    let parser = InMemory(decls);
    let mut run = CompilerRun::new(Config::default(), &parser);
    match run.compile(SPEC) {
        Err(CompileError::UnresolvedReferences(refs)) => {
            assert!(refs.iter().all(|r| r.name == "Position"));
            assert!(refs.iter().any(|r| r.referenced_by == "Range"));
            assert!(refs.iter().any(|r| r.referenced_by == "SelectionRangeParams"));
        }
        other => panic!("expected unresolved references, got {other:?}"),
    }
}

const OPTIONS_SPEC: &str = "\
### Configure <a name=\"configure\"></a>
_Request_:
* method: 'child/configure'
* params: `ChildParams`
_Response_:
* result: `null`
";

#[test]
fn parent_named_through_an_alias_flattens_the_target_struct() {
    let parser = InMemory(vec![
        interface("Options", &[], &[("a", "string", false)]),
        ExternalDeclaration::Alias {
            name: "BaseOptions".to_string(),
            ty: ExternalType::reference("Options"),
        },
        interface("ChildParams", &["BaseOptions"], &[("b", "integer", true)]),
    ]);
    let mut run = CompilerRun::new(Config::default(), &parser);
    let output = run.compile(OPTIONS_SPEC).unwrap();
    let types = &output.artifacts.types;
    assert!(types.contains("    #[serde(flatten)]\n    pub options: Options,"), "{types}");
    assert!(!types.contains("BaseOptions"), "{types}");
    let position = |name: &str| output.struct_order.iter().position(|s| s == name).unwrap();
    assert!(position("Options") < position("ChildParams"));
}

#[test]
fn parent_aliasing_a_non_struct_ends_the_run() {
    let parser = InMemory(vec![
        ExternalDeclaration::Alias {
            name: "BaseOptions".to_string(),
            ty: ExternalType::reference("string"),
        },
        interface("ChildParams", &["BaseOptions"], &[]),
    ]);
    let mut run = CompilerRun::new(Config::default(), &parser);
    match run.compile(OPTIONS_SPEC) {
        Err(CompileError::UnresolvedReferences(refs)) => {
            assert_eq!(refs.len(), 1);
            assert_eq!(refs[0].name, "BaseOptions");
            assert_eq!(refs[0].referenced_by, "ChildParams");
        }
        other => panic!("expected unresolved references, got {other:?}"),
    }
}

#[test]
fn strict_mode_rejects_a_request_without_response() {
    let spec = "\
### Lonely <a name=\"lonely\"></a>
_Request_:
* method: 'lonely/request'
* params: `SharedParams`
";
    let parser = InMemory(vec![interface("SharedParams", &[], &[])]);

    let mut lenient = CompilerRun::new(Config::default(), &parser);
    assert!(lenient.compile(spec).is_ok());
    assert_eq!(lenient.diagnostics().count(DiagnosticKind::RequestWithoutResponse), 1);

    let config = Config {
        strictness: lspgen::config::Strictness::Strict,
        ..Config::default()
    };
    let mut strict = CompilerRun::new(config, &parser);
    assert!(matches!(strict.compile(spec), Err(CompileError::Strict { .. })));
}

#[test]
fn artifacts_write_to_a_module_directory() {
    let output = compile();
    let dir = tempfile::tempdir().unwrap();
    for (name, source) in output.artifacts.files() {
        std::fs::write(dir.path().join(name), source).unwrap();
    }
    let index = std::fs::read_to_string(dir.path().join("mod.rs")).unwrap();
    assert!(index.contains("pub mod types;"));
    for name in ["types.rs", "conversions.rs", "bindings.rs"] {
        assert!(dir.path().join(name).is_file());
    }
}
