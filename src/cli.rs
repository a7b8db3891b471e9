//! CLI: markdown spec → (generate | inspect | check)
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;

use crate::config::{Config, Strictness};
use crate::decls::DeclarationParser;
use crate::diagnostics::Diagnostics;
use crate::error::CompileError;
use crate::run::{CompileOutput, CompilerRun};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// compile a markdown protocol specification into typed Rust bindings
#[derive(Parser, Debug)]
#[command(name = "lspgen", version)]
pub struct CommandLineInterface {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// compile and write types.rs, conversions.rs, bindings.rs and mod.rs
    Generate(GenerateOut),
    /// print an intermediate tree, optionally through a jq filter
    Inspect(InspectOut),
    /// compile without writing anything and report diagnostics
    Check(CheckOut),
}

#[derive(Args, Debug, Clone)]
struct InputSettings {
    /// the markdown specification
    #[arg(long, short)]
    input: PathBuf,

    /// extra declaration files. May be literal paths or quoted glob patterns
    #[arg(long = "decls", num_args = 1..)]
    declarations: Vec<String>,

    /// JSON configuration file (built-in LSP tables if omitted)
    #[arg(long)]
    config: Option<PathBuf>,

    /// treat request/response pairing problems as errors
    #[arg(long, default_value_t = false)]
    strict: bool,
}

#[derive(clap::Parser, Debug)]
struct GenerateOut {
    #[command(flatten)]
    input_settings: InputSettings,

    /// output directory for the generated module
    #[arg(short, long)]
    out: PathBuf,

    /// also write the structured tree (protocol_raw.json) here
    #[arg(long)]
    dump_raw: Option<PathBuf>,

    /// also write the descriptor tree (protocol.json) here
    #[arg(long)]
    dump_protocol: Option<PathBuf>,

    /// print the generated files instead of writing them
    #[arg(long)]
    dry_run: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Tree {
    /// the structured markdown tree
    Raw,
    /// the per-section descriptor tree
    Protocol,
    /// the bound requests, notifications and capabilities
    Bindings,
}

#[derive(clap::Parser, Debug)]
struct InspectOut {
    #[command(flatten)]
    input_settings: InputSettings,

    #[arg(long, value_enum, default_value_t = Tree::Protocol)]
    tree: Tree,

    /// jq filter applied to the tree before printing
    #[arg(long)]
    jq: Option<String>,
}

#[derive(clap::Parser, Debug)]
struct CheckOut {
    #[command(flatten)]
    input_settings: InputSettings,
}

/// The result of a run together with whatever it diagnosed on the way.
struct Compiled {
    result: Result<CompileOutput, CompileError>,
    diagnostics: Diagnostics,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl InputSettings {
    fn compile(&self) -> Result<Compiled> {
        let markdown = std::fs::read_to_string(&self.input)
            .with_context(|| format!("failed to read specification {}", self.input.display()))?;
        let mut config = match &self.config {
            Some(path) => Config::load(path)?,
            None => Config::default(),
        };
        if self.strict {
            config.strictness = Strictness::Strict;
        }

        let parser = declaration_parser()?;
        let mut run = CompilerRun::new(config, parser.as_ref());
        for path in resolve_file_path_patterns(&self.declarations)? {
            let source = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read declarations {}", path.display()))?;
            run.add_declarations(source);
        }
        let result = run.compile(&markdown);
        Ok(Compiled {
            result,
            diagnostics: run.diagnostics().clone(),
        })
    }
}

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }

    pub fn run(&self) -> Result<()> {
        match &self.cmd {
            Command::Generate(target) => {
                let compiled = target.input_settings.compile()?;
                summarize(&compiled.diagnostics);
                let output = compiled.result?;

                if let Some(path) = &target.dump_raw {
                    write_json(path, &serde_json::to_value(&output.protocol)?)?;
                }
                if let Some(path) = &target.dump_protocol {
                    write_json(path, &output.bindings.descriptor_tree)?;
                }

                if target.dry_run {
                    for (name, source) in output.artifacts.files() {
                        println!("// ---- {name} ----");
                        println!("{source}");
                    }
                    return Ok(());
                }
                std::fs::create_dir_all(&target.out)
                    .with_context(|| format!("failed to create {}", target.out.display()))?;
                for (name, source) in output.artifacts.files() {
                    let path = target.out.join(name);
                    std::fs::write(&path, source).with_context(|| format!("failed to write {}", path.display()))?;
                }
                tracing::info!(out = %target.out.display(), "wrote generated module");
                Ok(())
            }
            Command::Inspect(target) => {
                let compiled = target.input_settings.compile()?;
                let output = compiled.result?;
                let tree = match target.tree {
                    Tree::Raw => serde_json::to_value(&output.protocol)?,
                    Tree::Protocol => output.bindings.descriptor_tree.clone(),
                    Tree::Bindings => serde_json::to_value(&output.bindings)?,
                };
                let values = match &target.jq {
                    Some(filter) => crate::jq_exec::apply_filter(filter, &tree)
                        .with_context(|| format!("failed to apply jq filter `{filter}`"))?,
                    None => vec![tree],
                };
                for value in values {
                    println!("{}", serde_json::to_string_pretty(&value)?);
                }
                Ok(())
            }
            Command::Check(target) => {
                let compiled = target.input_settings.compile()?;
                for diagnostic in compiled.diagnostics.iter() {
                    eprintln!(
                        "{}{} {}: {}",
                        "warning".yellow().bold(),
                        format!("[{}]", diagnostic.kind.as_str()).dimmed(),
                        diagnostic.path.bold(),
                        diagnostic.message
                    );
                }
                summarize(&compiled.diagnostics);
                match compiled.result {
                    Ok(output) => {
                        eprintln!(
                            "{} {} structs, {} enums, {} requests, {} notifications",
                            "ok".green().bold(),
                            output.model.structs.len(),
                            output.model.enums.len(),
                            output.bindings.requests.len(),
                            output.bindings.notifications.len()
                        );
                        Ok(())
                    }
                    Err(error) => {
                        eprintln!("{}: {error}", "error".red().bold());
                        bail!("check failed")
                    }
                }
            }
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

#[cfg(feature = "input-typescript")]
fn declaration_parser() -> Result<Box<dyn DeclarationParser>> {
    Ok(Box::new(crate::decls::typescript::TypeScriptDeclarations))
}

#[cfg(not(feature = "input-typescript"))]
fn declaration_parser() -> Result<Box<dyn DeclarationParser>> {
    Err(anyhow!("lspgen was built without the `input-typescript` feature"))
}

fn summarize(diagnostics: &Diagnostics) {
    if !diagnostics.is_empty() {
        eprintln!("{} {} diagnostics", "note:".cyan().bold(), diagnostics.len());
    }
}

fn write_json(path: &Path, value: &serde_json::Value) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let source = serde_json::to_string_pretty(value)?;
    std::fs::write(path, source).with_context(|| format!("failed to write {}", path.display()))
}

fn resolve_file_path_patterns<I>(patterns: I) -> Result<Vec<PathBuf>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    fn has_glob_chars(s: &str) -> bool {
        s.bytes().any(|b| matches!(b, b'*' | b'?' | b'[' | b'{'))
    }

    let mut out = Vec::<PathBuf>::new();

    for raw in patterns {
        let pattern = raw.as_ref();

        if has_glob_chars(pattern) {
            let mut matched_any = false;
            for entry in glob::glob(pattern).with_context(|| format!("invalid glob pattern: {pattern}"))? {
                out.push(entry?);
                matched_any = true;
            }
            if !matched_any {
                return Err(anyhow!("glob pattern matched no files: {pattern}"));
            }
        } else {
            out.push(PathBuf::from(pattern));
        }
    }

    // overlapping patterns must not parse a file twice
    let mut seen = std::collections::HashSet::new();
    out.retain(|path| seen.insert(path.clone()));
    Ok(out)
}
