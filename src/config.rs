//! Per-run configuration.
//!
//! Every field has a default; a JSON file only needs the keys it overrides.
//! The defaults describe the Language Server Protocol 3.16 document.

use std::path::Path;

use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strictness {
    /// Unpaired requests and responses are diagnosed and the run continues.
    #[default]
    Lenient,
    /// Unpaired requests and responses end the run.
    Strict,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Struct name → `null` (maintained by hand, not generated) or a new name.
    pub special_structs: IndexMap<String, Option<String>>,
    /// Enum name → `null` (not generated) or a new name.
    pub special_enums: IndexMap<String, Option<String>>,
    /// Names provided by hand-written code; references to them resolve.
    pub external_types: Vec<String>,
    /// Exact fragment text → type text, for sentences naming several types.
    pub checked_type_extraction: IndexMap<String, String>,
    /// Regexes matched against the dotted parent path of an unconsumed leaf.
    pub ignorable_paths: Vec<String>,
    /// Declaration source appended after the fenced blocks of the document.
    pub supplementary_declarations: String,
    pub strictness: Strictness,
    /// Module the generated code imports hand-written types from.
    pub handwritten_module: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        let special_structs = [
            "Message",
            "RequestMessage",
            "ResponseMessage",
            "NotificationMessage",
            "ProgressParams",
            "TextDocumentContentChangeEvent",
        ]
        .into_iter()
        .map(|name| (name.to_string(), None))
        .collect();

        let mut special_enums = IndexMap::new();
        special_enums.insert("ErrorCodes".to_string(), None);
        special_enums.insert("InitializeError".to_string(), Some("InitializeErrorCode".to_string()));

        Self {
            special_structs,
            special_enums,
            external_types: Vec::new(),
            checked_type_extraction: default_checked_type_extraction(),
            ignorable_paths: vec![
                r"^traceValue\b".to_string(),
                r"^version_".to_string(),
                r"^snippet_".to_string(),
                r"^regExp\b".to_string(),
            ],
            supplementary_declarations: SUPPLEMENTARY_DECLARATIONS.to_string(),
            strictness: Strictness::Lenient,
            handwritten_module: Some("super::handwritten".to_string()),
        }
    }
}

const SUPPLEMENTARY_DECLARATIONS: &str = "\
interface RangePlaceHolder {
    range: Range;
    placeholder: string;
}

interface DefaultBehaviorStruct {
    defaultBehavior: boolean;
}
";

fn default_checked_type_extraction() -> IndexMap<String, String> {
    [
        (
            "`TextDocumentSyncKind | TextDocumentSyncOptions`. The below definition of the `TextDocumentSyncOptions` only covers the properties specific to the open, change and close notifications. A complete definition covering all properties can be found [here](#textDocument_didClose):",
            "TextDocumentSyncKind | TextDocumentSyncOptions",
        ),
        (
            r"`CompletionItem[]` \| `CompletionList` \| `null`. If a `CompletionItem[]` is provided it is interpreted to be complete. So it is the same as `{ isIncomplete: false, items }`",
            "CompletionItem[] | CompletionList | null",
        ),
        (
            "`CompletionItem[]` or `CompletionList` followed by `CompletionItem[]`. If the first provided result item is of type `CompletionList` subsequent partial results of `CompletionItem[]` add to the `items` property of the `CompletionList`.",
            "CompletionList | CompletionItem[]",
        ),
        (
            r"`DocumentSymbol[]` \| `SymbolInformation[]`. `DocumentSymbol[]` and `SymbolInformation[]` can not be mixed. That means the first chunk defines the type of all the other chunks.",
            "DocumentSymbol[] | SymbolInformation[]",
        ),
        (
            "`Range | { range: Range, placeholder: string } | { defaultBehavior: boolean } | null` describing a [`Range`](#range) of the string to rename and optionally a placeholder text of the string content to be renamed. If `{ defaultBehavior: boolean }` is returned (since 3.16) the rename position is valid and the client should use its default behavior to compute the rename range. If `null` is returned then it is deemed that a 'textDocument/rename' request is not valid at the given position.",
            "Range | RangePlaceHolder | DefaultBehaviorStruct | null",
        ),
    ]
    .into_iter()
    .map(|(text, ty)| (text.to_string(), ty.to_string()))
    .collect()
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&source)
    }

    pub fn from_json(source: &str) -> Result<Self, ConfigError> {
        crate::path_de::from_str_with_path(source)
    }

    pub fn ignorable_path_patterns(&self) -> Result<Vec<Regex>, ConfigError> {
        self.ignorable_paths
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|source| ConfigError::Pattern {
                    pattern: pattern.clone(),
                    source,
                })
            })
            .collect()
    }

    /// Excluded and external names: references to them need no declaration.
    pub fn is_handwritten(&self, name: &str) -> bool {
        matches!(self.special_structs.get(name), Some(None))
            || matches!(self.special_enums.get(name), Some(None))
            || self.external_types.iter().any(|t| t == name)
    }

    /// Names the generated code must import from [`Config::handwritten_module`].
    pub fn handwritten_names(&self) -> Vec<&str> {
        let excluded = self
            .special_structs
            .iter()
            .chain(self.special_enums.iter())
            .filter(|(_, rename)| rename.is_none())
            .map(|(name, _)| name.as_str());
        let mut out: Vec<&str> = Vec::new();
        for name in excluded.chain(self.external_types.iter().map(String::as_str)) {
            if !out.contains(&name) {
                out.push(name);
            }
        }
        out
    }
}
