//! Tool manifest: function declarations consumed by a tool-calling harness.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::catalog::CustomApi;
use crate::errors::VocabularyError;
use crate::signature::Signature;

/// One declared function, OpenAI function-calling style.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDeclaration {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// JSON schema of the arguments object.
    #[serde(default = "empty_parameters")]
    pub parameters: Value,
}

fn empty_parameters() -> Value {
    json!({"type": "object", "properties": {}})
}

impl ToolDeclaration {
    /// Required/optional argument sets derived from the parameter schema.
    pub fn signature(&self) -> Signature {
        let required: Vec<String> = self
            .parameters
            .get("required")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        let optional = self
            .parameters
            .get("properties")
            .and_then(Value::as_object)
            .map(|props| {
                props
                    .keys()
                    .filter(|name| !required.contains(name))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        Signature { required, optional }
    }

    /// Declaration synthesized from a custom API entry.
    pub fn from_custom_api(api: &CustomApi) -> Self {
        let properties: serde_json::Map<String, Value> = api
            .required
            .iter()
            .chain(api.optional.iter())
            .map(|name| (name.clone(), json!({})))
            .collect();
        Self {
            name: api.name.clone(),
            description: api.description.clone().unwrap_or_default(),
            parameters: json!({
                "type": "object",
                "properties": properties,
                "required": api.required,
            }),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DeclarationEntry {
    Wrapped {
        #[serde(rename = "type")]
        _kind: String,
        function: ToolDeclaration,
    },
    Plain(ToolDeclaration),
}

impl From<DeclarationEntry> for ToolDeclaration {
    fn from(entry: DeclarationEntry) -> Self {
        match entry {
            DeclarationEntry::Wrapped { function, .. } => function,
            DeclarationEntry::Plain(declaration) => declaration,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ManifestFile {
    List(Vec<DeclarationEntry>),
    Wrapped { tools: Vec<DeclarationEntry> },
}

/// Declared functions keyed by name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolManifest {
    tools: BTreeMap<String, ToolDeclaration>,
}

impl ToolManifest {
    pub fn from_declarations(
        declarations: impl IntoIterator<Item = ToolDeclaration>,
    ) -> Result<Self, VocabularyError> {
        let mut tools = BTreeMap::new();
        for declaration in declarations {
            if declaration.name.trim().is_empty() {
                return Err(VocabularyError::catalog("tool declaration with empty name"));
            }
            tools.insert(declaration.name.clone(), declaration);
        }
        Ok(Self { tools })
    }

    pub fn from_json(value: Value) -> Result<Self, VocabularyError> {
        let parsed: ManifestFile = serde_json::from_value(value)
            .map_err(|err| VocabularyError::catalog(format!("tool manifest: {err}")))?;
        let entries = match parsed {
            ManifestFile::List(entries) | ManifestFile::Wrapped { tools: entries } => entries,
        };
        Self::from_declarations(entries.into_iter().map(ToolDeclaration::from))
    }

    pub fn load(path: &Path) -> Result<Self, VocabularyError> {
        let text = std::fs::read_to_string(path).map_err(|err| {
            VocabularyError::catalog(format!("reading {}: {err}", path.display()))
        })?;
        let value: Value = serde_json::from_str(&text).map_err(|err| {
            VocabularyError::catalog(format!("parsing {}: {err}", path.display()))
        })?;
        Self::from_json(value)
    }

    pub fn get(&self, name: &str) -> Option<&ToolDeclaration> {
        self.tools.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ToolDeclaration> {
        self.tools.values()
    }
}
