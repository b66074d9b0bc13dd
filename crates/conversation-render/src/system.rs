use std::collections::BTreeSet;

use serde_json::json;
use tool_vocabulary::{ToolDeclaration, ToolVocabulary};
use tracing::debug;

/// Heading placed before the declarations of discovered tools.
pub const DISCOVERED_TOOLS_HEADING: &str = "Additional tools available in this task:";

/// Declaration for a non-built-in tool seen while rendering, if one is known.
pub fn declaration_for(name: &str, vocabulary: &ToolVocabulary) -> Option<ToolDeclaration> {
    if let Some(declaration) = vocabulary.manifest().get(name) {
        return Some(declaration.clone());
    }
    if let Some(api) = vocabulary.custom().get(name) {
        return Some(ToolDeclaration::from_custom_api(api));
    }
    let language = name.strip_prefix("execute_")?;
    Some(ToolDeclaration {
        name: name.to_string(),
        description: format!("Execute {language} code and return its output."),
        parameters: json!({
            "type": "object",
            "properties": {"code": {"type": "string"}},
            "required": ["code"],
        }),
    })
}

/// `base` followed by one function declaration per discovered tool.
pub fn system_prompt(base: &str, discovered: &BTreeSet<String>, vocabulary: &ToolVocabulary) -> String {
    let declarations: Vec<String> = discovered
        .iter()
        .filter_map(|name| {
            let declaration = declaration_for(name, vocabulary);
            if declaration.is_none() {
                debug!(tool = %name, "no declaration for discovered tool");
            }
            declaration
        })
        .map(|declaration| json!({"type": "function", "function": declaration}).to_string())
        .collect();
    if declarations.is_empty() {
        return base.to_string();
    }
    let mut prompt = base.trim_end().to_string();
    if !prompt.is_empty() {
        prompt.push_str("\n\n");
    }
    prompt.push_str(DISCOVERED_TOOLS_HEADING);
    for line in declarations {
        prompt.push('\n');
        prompt.push_str(&line);
    }
    prompt
}
