//! Markdown → nested key/value tree.
//!
//! A line-by-line state machine over four shapes of line: bullets, anchored
//! headings, `_Label_:` paragraphs and `**Bold**` group lines. Everything else
//! is prose and skipped.

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::text::TextFragment;

static BULLET: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\* +(?:([^'`:]+):)? *(.*)$").unwrap());
static ERROR_BULLET: Lazy<Regex> = Lazy::new(|| Regex::new(r" *\* *error\.[a-z]*").unwrap());
static SECTION: Lazy<Regex> = Lazy::new(|| Regex::new(r#"^#+ .* name="([^"]*)""#).unwrap());
static GROUP: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?: *|<[^<>]+>)*_([A-Za-z_0-9 ]+)(?:_ *:| *: *_)(?: *|<[^<>]+>)*(\w+.*)?$")
        .unwrap()
});
static BOLD: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\*\* *(\w.*)\*\* *$").unwrap());

// ————————————————————————————————————————————————————————————————————————————
// TREE
// ————————————————————————————————————————————————————————————————————————————

pub type StructuredNode = IndexMap<String, StructuredEntry>;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StructuredEntry {
    Text(TextFragment),
    Node(StructuredNode),
}

impl StructuredEntry {
    pub fn as_text(&self) -> Option<&TextFragment> {
        match self {
            StructuredEntry::Text(t) => Some(t),
            StructuredEntry::Node(_) => None,
        }
    }

    pub fn as_node(&self) -> Option<&StructuredNode> {
        match self {
            StructuredEntry::Node(n) => Some(n),
            StructuredEntry::Text(_) => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuredProtocol {
    pub structured: StructuredNode,
    /// Distinct top-level keys in document order.
    pub structured_sequence: Vec<String>,
}

impl StructuredProtocol {
    /// Entry at `path`, if every step exists.
    pub fn get(&self, path: &[&str]) -> Option<&StructuredEntry> {
        let (first, rest) = path.split_first()?;
        let mut entry = self.structured.get(*first)?;
        for key in rest {
            entry = entry.as_node()?.get(*key)?;
        }
        Some(entry)
    }

    /// Prints the tree back as markdown in the dialect [`extract`] reads.
    pub fn to_document(&self) -> String {
        let mut out = String::new();
        for key in &self.structured_sequence {
            match self.structured.get(key) {
                Some(StructuredEntry::Text(fragment)) => write_bullet(&mut out, key, fragment),
                Some(StructuredEntry::Node(node)) => {
                    out.push_str(&format!("### {key} <a name=\"{key}\"></a>\n\n"));
                    write_section(&mut out, node);
                }
                None => {}
            }
        }
        out
    }
}

fn write_bullet(out: &mut String, key: &str, fragment: &TextFragment) {
    if key.bytes().all(|b| b.is_ascii_digit()) {
        out.push_str(&format!("* {}\n", fragment.text));
    } else {
        out.push_str(&format!("* {key}: {}\n", fragment.text));
    }
}

fn write_group(out: &mut String, key: &str, node: &StructuredNode) {
    out.push_str(&format!("\n_{key}_:\n"));
    for (child_key, child) in node {
        if let StructuredEntry::Text(fragment) = child {
            write_bullet(out, child_key, fragment);
        }
    }
}

fn write_section(out: &mut String, node: &StructuredNode) {
    for (key, entry) in node {
        if let StructuredEntry::Text(fragment) = entry {
            write_bullet(out, key, fragment);
        }
    }
    let is_bold = |n: &StructuredNode| n.values().any(|e| e.as_node().is_some());
    // plain groups hang off the heading, so they must precede any bold group
    for (key, entry) in node {
        if let StructuredEntry::Node(child) = entry {
            if !is_bold(child) {
                write_group(out, key, child);
            }
        }
    }
    for (key, entry) in node {
        if let StructuredEntry::Node(child) = entry {
            if is_bold(child) {
                out.push_str(&format!("\n**{key}**\n\n"));
                for (leaf_key, leaf) in child {
                    if let StructuredEntry::Text(fragment) = leaf {
                        write_bullet(out, leaf_key, fragment);
                    }
                }
                for (group_key, group) in child {
                    if let StructuredEntry::Node(group) = group {
                        write_group(out, group_key, group);
                    }
                }
            }
        }
    }
    out.push('\n');
}

// ————————————————————————————————————————————————————————————————————————————
// EXTRACTION
// ————————————————————————————————————————————————————————————————————————————

struct Extractor<'a> {
    diagnostics: &'a mut Diagnostics,
    base_path: Vec<String>,
    path: Vec<String>,
    positional_index: usize,
    protocol: StructuredProtocol,
}

pub fn extract(source: &str, diagnostics: &mut Diagnostics) -> StructuredProtocol {
    let mut extractor = Extractor {
        diagnostics,
        base_path: Vec::new(),
        path: Vec::new(),
        positional_index: 0,
        protocol: StructuredProtocol::default(),
    };
    for line in source.lines() {
        extractor.line(line);
    }
    tracing::debug!(
        sections = extractor.protocol.structured_sequence.len(),
        "extracted structured protocol"
    );
    extractor.protocol
}

impl Extractor<'_> {
    fn line(&mut self, line: &str) {
        if let Some(m) = BULLET.captures(line) {
            let value = m.get(2).map_or("", |v| v.as_str());
            match m.get(1) {
                Some(key) if !value.is_empty() => {
                    let path = self.child_path(key.as_str().trim());
                    self.insert(path, TextFragment::new(value));
                }
                Some(_) => {
                    if !ERROR_BULLET.is_match(line) {
                        let at = self.path.join(".");
                        self.diagnostics.push(
                            DiagnosticKind::MissingValue,
                            at,
                            format!("missing value: {line}"),
                        );
                    }
                }
                None if !value.is_empty() => {
                    let path = self.child_path(&self.positional_index.to_string());
                    self.positional_index += 1;
                    self.insert(path, TextFragment::new(value));
                }
                None => {}
            }
            return;
        }
        if let Some(m) = SECTION.captures(line) {
            self.base_path = vec![m[1].to_string()];
            self.path = self.base_path.clone();
            self.positional_index = 0;
            return;
        }
        if let Some(m) = GROUP.captures(line) {
            self.path = self.child_path_of_base(&m[1]);
            self.positional_index = 0;
            if let Some(value) = m.get(2) {
                self.insert(self.path.clone(), TextFragment::new(value.as_str()));
            }
            return;
        }
        if let Some(m) = BOLD.captures(line) {
            let group = m[1].trim().to_string();
            self.base_path = match self.base_path.first() {
                Some(section) => vec![section.clone(), group],
                None => vec![group],
            };
            self.path = self.base_path.clone();
        }
    }

    fn child_path(&self, key: &str) -> Vec<String> {
        let mut path = self.path.clone();
        path.push(key.to_string());
        path
    }

    fn child_path_of_base(&self, key: &str) -> Vec<String> {
        let mut path = self.base_path.clone();
        path.push(key.to_string());
        path
    }

    fn insert(&mut self, path: Vec<String>, value: TextFragment) {
        let Some((last, parents)) = path.split_last() else {
            return;
        };
        if !self.protocol.structured_sequence.contains(&path[0]) {
            self.protocol.structured_sequence.push(path[0].clone());
        }
        let dotted = path.join(".");
        let mut node = &mut self.protocol.structured;
        for key in parents {
            let entry = node
                .entry(key.clone())
                .or_insert_with(|| StructuredEntry::Node(IndexMap::new()));
            if let StructuredEntry::Text(old) = entry {
                self.diagnostics.push(
                    DiagnosticKind::DuplicateOverwrite,
                    dotted.as_str(),
                    format!("replacing text {:?} at `{key}` with a group", old.text),
                );
                *entry = StructuredEntry::Node(IndexMap::new());
            }
            node = match entry {
                StructuredEntry::Node(child) => child,
                StructuredEntry::Text(_) => return,
            };
        }
        if let Some(old) = node.get(last) {
            let shown = match old {
                StructuredEntry::Text(t) => format!("{:?}", t.text),
                StructuredEntry::Node(n) => format!("a group of {} entries", n.len()),
            };
            self.diagnostics.push(
                DiagnosticKind::DuplicateOverwrite,
                dotted.as_str(),
                format!("overwriting {shown} with {:?}", value.text),
            );
        }
        node.insert(last.clone(), StructuredEntry::Text(value));
    }
}
