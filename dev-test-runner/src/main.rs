//! Runs every `fixtures/*.md` through the full pipeline (real TypeScript
//! parser) and compares a summary against the sibling `*.expected.json`.
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use colored::Colorize;
use lspgen::ir::{RepresentationKind, Side};
use lspgen::{CompileOutput, CompilerRun, Config, TypeScriptDeclarations};
use serde::{Deserialize, Serialize};

#[derive(Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct Summary {
    sequence: Vec<String>,
    struct_order: Vec<String>,
    enums: Vec<EnumSummary>,
    requests: Vec<RequestSummary>,
    notifications: Vec<NotificationSummary>,
    capabilities: Vec<String>,
    diagnostics: Vec<String>,
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct EnumSummary {
    name: String,
    kind: String,
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct RequestSummary {
    method: String,
    binding_name: String,
    params: String,
    result: Option<String>,
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct NotificationSummary {
    method: String,
    binding_name: String,
    params: Option<String>,
    special: bool,
}

fn summarize(output: &CompileOutput, diagnostics: &lspgen::Diagnostics) -> Summary {
    Summary {
        sequence: output.protocol.structured_sequence.clone(),
        struct_order: output.struct_order.clone(),
        enums: output
            .model
            .enums
            .iter()
            .map(|e| EnumSummary {
                name: e.name.clone(),
                kind: match e.representation_kind {
                    RepresentationKind::Numeric => "numeric".to_string(),
                    RepresentationKind::String => "string".to_string(),
                },
            })
            .collect(),
        requests: output
            .bindings
            .requests
            .iter()
            .map(|r| RequestSummary {
                method: r.wire_method.clone(),
                binding_name: r.binding_name.clone(),
                params: r.params_type.to_string(),
                result: r.result_type.as_ref().map(ToString::to_string),
            })
            .collect(),
        notifications: output
            .bindings
            .notifications
            .iter()
            .map(|n| NotificationSummary {
                method: n.wire_method.clone(),
                binding_name: n.binding_name.clone(),
                params: n.params_type.as_ref().map(ToString::to_string),
                special: n.special,
            })
            .collect(),
        capabilities: output
            .bindings
            .capabilities
            .iter()
            .map(|c| {
                let side = match c.side {
                    Side::Client => "client",
                    Side::Server => "server",
                };
                format!("{side} {}: {}", c.property_path, c.property_type)
            })
            .collect(),
        diagnostics: diagnostics.iter().map(|d| d.kind.as_str().to_string()).collect(),
    }
}

fn load_expected(path: &Path) -> Result<Summary> {
    let source = std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let de = &mut serde_json::Deserializer::from_str(&source);
    serde_path_to_error::deserialize(de).map_err(|e| anyhow::anyhow!("{}: {} at {}", path.display(), e.inner(), e.path()))
}

fn run_fixture(spec: &Path) -> Result<()> {
    let markdown = std::fs::read_to_string(spec).with_context(|| format!("failed to read {}", spec.display()))?;
    let parser = TypeScriptDeclarations;
    let mut run = CompilerRun::new(Config::default(), &parser);
    let output = run.compile(&markdown)?;
    let actual = summarize(&output, run.diagnostics());

    let expected_path = spec.with_extension("expected.json");
    let expected = load_expected(&expected_path)?;
    if actual != expected {
        bail!(
            "summary mismatch\n--- expected\n{}\n--- actual\n{}",
            serde_json::to_string_pretty(&expected)?,
            serde_json::to_string_pretty(&actual)?
        );
    }
    Ok(())
}

fn main() -> Result<()> {
    let fixtures = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures");
    let mut specs: Vec<PathBuf> = std::fs::read_dir(&fixtures)
        .with_context(|| format!("failed to list {}", fixtures.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().is_some_and(|ext| ext == "md"))
        .collect();
    specs.sort();

    let mut failures = 0;
    for spec in &specs {
        let name = spec.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        match run_fixture(spec) {
            Ok(()) => eprintln!("{} {name}", "✓".green()),
            Err(error) => {
                failures += 1;
                eprintln!("{} {name}: {error:#}", "✗".red());
            }
        }
    }
    if failures > 0 {
        bail!("{failures} of {} fixtures failed", specs.len());
    }
    eprintln!("{} fixtures passed", specs.len());
    Ok(())
}
