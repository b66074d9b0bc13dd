//! Fixed built-in catalogs and the declarative per-dataset API catalog.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::VocabularyError;
use crate::signature::Signature;

pub const EXECUTE_BASH: &str = "execute_bash";
pub const EXECUTE_IPYTHON_CELL: &str = "execute_ipython_cell";
pub const STR_REPLACE_EDITOR: &str = "str_replace_editor";
pub const THINK: &str = "think";
pub const FINISH: &str = "finish";
pub const BROWSER: &str = "browser";

/// Non-web tools every target harness exposes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltinTool {
    pub name: &'static str,
    pub signature: Signature,
    /// Parameter carrying free-form code, for tools that wrap other calls.
    pub code_parameter: Option<&'static str>,
}

pub fn builtin_tools() -> Vec<BuiltinTool> {
    vec![
        BuiltinTool {
            name: EXECUTE_BASH,
            signature: Signature::new(&["command"], &["is_input", "timeout"]),
            code_parameter: Some("command"),
        },
        BuiltinTool {
            name: EXECUTE_IPYTHON_CELL,
            signature: Signature::new(&["code"], &[]),
            code_parameter: Some("code"),
        },
        BuiltinTool {
            name: STR_REPLACE_EDITOR,
            signature: Signature::new(
                &["command", "path"],
                &["file_text", "old_str", "new_str", "insert_line", "view_range"],
            ),
            code_parameter: None,
        },
        BuiltinTool {
            name: THINK,
            signature: Signature::new(&["thought"], &[]),
            code_parameter: None,
        },
        BuiltinTool {
            name: FINISH,
            signature: Signature::new(&["message"], &["task_completed"]),
            code_parameter: None,
        },
        BuiltinTool {
            name: BROWSER,
            signature: Signature::new(&["code"], &[]),
            code_parameter: Some("code"),
        },
    ]
}

/// A BrowserGym-style action primitive rendered inside the browser tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowserPrimitive {
    pub name: &'static str,
    pub signature: Signature,
    /// Argument renames applied before verification (`from`, `to`).
    pub argument_aliases: &'static [(&'static str, &'static str)],
}

impl BrowserPrimitive {
    fn new(name: &'static str, required: &[&str], optional: &[&str]) -> Self {
        Self {
            name,
            signature: Signature::new(required, optional),
            argument_aliases: &[],
        }
    }

    fn with_aliases(mut self, aliases: &'static [(&'static str, &'static str)]) -> Self {
        self.argument_aliases = aliases;
        self
    }

    pub fn requires_element(&self) -> bool {
        self.signature.requires(crate::signature::BID)
    }
}

/// Raw function names that map onto a differently named primitive.
const PRIMITIVE_NAME_ALIASES: &[(&str, &str)] = &[("type", "fill"), ("navigate", "goto")];
const FILL_ALIASES: &[(&str, &str)] = &[("text", "value")];

pub fn browser_primitives() -> Vec<BrowserPrimitive> {
    vec![
        BrowserPrimitive::new("noop", &[], &["wait_ms"]),
        BrowserPrimitive::new("scroll", &["delta_x", "delta_y"], &[]),
        BrowserPrimitive::new("fill", &["bid", "value"], &["enable_autocomplete_menu"])
            .with_aliases(FILL_ALIASES),
        BrowserPrimitive::new("select_option", &["bid", "options"], &[]),
        BrowserPrimitive::new("click", &["bid"], &["button", "modifiers"]),
        BrowserPrimitive::new("dblclick", &["bid"], &["button", "modifiers"]),
        BrowserPrimitive::new("hover", &["bid"], &[]),
        BrowserPrimitive::new("press", &["bid", "key_comb"], &[]),
        BrowserPrimitive::new("focus", &["bid"], &[]),
        BrowserPrimitive::new("clear", &["bid"], &[]),
        BrowserPrimitive::new("upload_file", &["bid", "file"], &[]),
        BrowserPrimitive::new("go_back", &[], &[]),
        BrowserPrimitive::new("go_forward", &[], &[]),
        BrowserPrimitive::new("goto", &["url"], &[]),
        BrowserPrimitive::new("tab_focus", &["index"], &[]),
        BrowserPrimitive::new("new_tab", &[], &[]),
        BrowserPrimitive::new("tab_close", &[], &[]),
        BrowserPrimitive::new("send_msg_to_user", &["text"], &[]),
        BrowserPrimitive::new("keyboard_press", &["key"], &[]),
        BrowserPrimitive::new("keyboard_type", &["text"], &[]),
        BrowserPrimitive::new("mouse_click", &["x", "y"], &["button"]),
        BrowserPrimitive::new("report_infeasible", &["reason"], &[]),
    ]
}

/// Canonical primitive name for a raw function name.
pub fn canonical_primitive_name(function: &str) -> &str {
    PRIMITIVE_NAME_ALIASES
        .iter()
        .find(|(alias, _)| *alias == function)
        .map(|(_, target)| *target)
        .unwrap_or(function)
}

/// Tool used to execute a code action, and whether that tool is built in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeTool {
    pub name: String,
    pub parameter: &'static str,
    pub builtin: bool,
}

/// Map a code action's language onto the tool that runs it.
///
/// Python and shell code use the built-in execution tools; any other
/// language `l` becomes a non-built-in `execute_l` tool taking `code`.
pub fn code_tool_for_language(language: &str) -> CodeTool {
    let normalized = language.trim().to_ascii_lowercase();
    match normalized.as_str() {
        "python" | "python3" | "ipython" | "py" => CodeTool {
            name: EXECUTE_IPYTHON_CELL.to_string(),
            parameter: "code",
            builtin: true,
        },
        "bash" | "sh" | "shell" | "zsh" => CodeTool {
            name: EXECUTE_BASH.to_string(),
            parameter: "command",
            builtin: true,
        },
        other => CodeTool {
            name: format!("execute_{}", other.replace(|c: char| !c.is_ascii_alphanumeric(), "_")),
            parameter: "code",
            builtin: false,
        },
    }
}

/// One dataset-declared API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomApi {
    pub name: String,
    #[serde(default)]
    pub required: Vec<String>,
    #[serde(default)]
    pub optional: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl CustomApi {
    pub fn signature(&self) -> Signature {
        Signature {
            required: self.required.clone(),
            optional: self.optional.clone(),
        }
    }
}

/// Declarative catalog of dataset-specific APIs, loaded as data.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CustomCatalog {
    apis: BTreeMap<String, CustomApi>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CatalogFile {
    List(Vec<CustomApi>),
    Wrapped { apis: Vec<CustomApi> },
}

impl CustomCatalog {
    pub fn from_entries(entries: impl IntoIterator<Item = CustomApi>) -> Result<Self, VocabularyError> {
        let mut apis = BTreeMap::new();
        for api in entries {
            if api.name.trim().is_empty() {
                return Err(VocabularyError::catalog("custom api with empty name"));
            }
            if let Some(arg) = api.required.iter().find(|arg| api.optional.contains(arg)) {
                return Err(VocabularyError::catalog(format!(
                    "custom api '{}' lists '{}' as both required and optional",
                    api.name, arg
                )));
            }
            if apis.insert(api.name.clone(), api.clone()).is_some() {
                return Err(VocabularyError::catalog(format!(
                    "custom api '{}' declared twice",
                    api.name
                )));
            }
        }
        Ok(Self { apis })
    }

    /// Load a YAML (or JSON) catalog: either a list of APIs or `{apis: [...]}`.
    pub fn load(path: &Path) -> Result<Self, VocabularyError> {
        let text = std::fs::read_to_string(path).map_err(|err| {
            VocabularyError::catalog(format!("reading {}: {err}", path.display()))
        })?;
        let parsed: CatalogFile = serde_yaml::from_str(&text).map_err(|err| {
            VocabularyError::catalog(format!("parsing {}: {err}", path.display()))
        })?;
        let entries = match parsed {
            CatalogFile::List(apis) | CatalogFile::Wrapped { apis } => apis,
        };
        Self::from_entries(entries)
    }

    pub fn get(&self, name: &str) -> Option<&CustomApi> {
        self.apis.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.apis.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.apis.len()
    }

    pub fn is_empty(&self) -> bool {
        self.apis.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CustomApi> {
        self.apis.values()
    }
}
