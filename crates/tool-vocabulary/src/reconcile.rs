//! Picks the calling convention an API action is rendered with.

use std::collections::BTreeMap;

use episode_model::ApiAction;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::catalog::{
    browser_primitives, builtin_tools, canonical_primitive_name, BrowserPrimitive, BuiltinTool,
    CustomCatalog, BROWSER, EXECUTE_IPYTHON_CELL,
};
use crate::errors::VocabularyError;
use crate::manifest::ToolManifest;
use crate::signature::{has_element_reference, normalize_bid_alias, Signature, BID};

/// How custom APIs are emitted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiRenderMode {
    /// As a Python call inside `execute_ipython_cell`.
    #[default]
    Wrapped,
    /// As a function call of their own.
    Direct,
}

/// Calling convention selected for one action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Convention {
    Builtin,
    /// Browser primitive that takes no element id.
    BrowserPrimitive,
    Manifest,
    CustomApi { wrapped: bool },
    /// Browser primitive keyed by an element id.
    BrowserElement,
}

impl Convention {
    pub fn label(&self) -> &'static str {
        match self {
            Convention::Builtin => "builtin",
            Convention::BrowserPrimitive | Convention::BrowserElement => "browser",
            Convention::Manifest => "manifest",
            Convention::CustomApi { .. } => "custom",
        }
    }

    /// Tool whose `code` parameter carries the call, if the call is wrapped.
    pub fn wrapper(&self) -> Option<&'static str> {
        match self {
            Convention::BrowserPrimitive | Convention::BrowserElement => Some(BROWSER),
            Convention::CustomApi { wrapped: true } => Some(EXECUTE_IPYTHON_CELL),
            _ => None,
        }
    }

    /// Whether the callable belongs to one of the fixed catalogs.
    pub fn is_builtin(&self) -> bool {
        matches!(
            self,
            Convention::Builtin | Convention::BrowserPrimitive | Convention::BrowserElement
        )
    }
}

/// Outcome of reconciling one action.
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciled {
    pub convention: Convention,
    /// Canonical callable name (primitive aliases applied).
    pub function: String,
    /// Arguments after alias normalization; verified against `signature`.
    pub arguments: BTreeMap<String, Value>,
    pub signature: Signature,
    /// Structural locator carried in place of a bid; must be resolved before rendering.
    pub pending_locator: Option<String>,
}

/// Every catalog an episode's actions are reconciled against.
#[derive(Debug, Clone)]
pub struct ToolVocabulary {
    builtin: BTreeMap<&'static str, BuiltinTool>,
    primitives: BTreeMap<&'static str, BrowserPrimitive>,
    custom: CustomCatalog,
    manifest: ToolManifest,
    api_mode: ApiRenderMode,
}

impl Default for ToolVocabulary {
    fn default() -> Self {
        Self::new(CustomCatalog::default(), ToolManifest::default(), ApiRenderMode::Wrapped)
    }
}

impl ToolVocabulary {
    pub fn new(custom: CustomCatalog, manifest: ToolManifest, api_mode: ApiRenderMode) -> Self {
        Self {
            builtin: builtin_tools().into_iter().map(|t| (t.name, t)).collect(),
            primitives: browser_primitives().into_iter().map(|p| (p.name, p)).collect(),
            custom,
            manifest,
            api_mode,
        }
    }

    pub fn custom(&self) -> &CustomCatalog {
        &self.custom
    }

    pub fn manifest(&self) -> &ToolManifest {
        &self.manifest
    }

    pub fn api_mode(&self) -> ApiRenderMode {
        self.api_mode
    }

    /// Whether `name` is a fixed tool or browser primitive (aliases included).
    pub fn is_builtin_name(&self, name: &str) -> bool {
        self.builtin.contains_key(name)
            || self.primitives.contains_key(canonical_primitive_name(name))
    }

    pub fn builtin(&self, name: &str) -> Option<&BuiltinTool> {
        self.builtin.get(name)
    }

    /// Choose the convention for `action`.
    ///
    /// Rules are tried in priority order and a rule only matches when the
    /// arguments verify against its signature. When some rule applied by name
    /// but none verified, the highest-priority mismatch is returned.
    pub fn reconcile(&self, action: &ApiAction, web: bool) -> Result<Reconciled, VocabularyError> {
        let name = action.function.as_str();
        let shadowed = self.custom.contains(name);
        let primitive = self.primitives.get(canonical_primitive_name(name));
        let mut rejected = Rejections::default();

        if let Some(tool) = self.builtin.get(name).filter(|_| !shadowed) {
            let attempt =
                self.candidate(Convention::Builtin, name, &tool.signature, action.arguments.clone());
            if let Some(found) = rejected.accept(attempt) {
                return Ok(found);
            }
        }

        if let Some(primitive) = primitive.filter(|p| web && !shadowed && !p.requires_element()) {
            let arguments = apply_argument_aliases(primitive, &action.arguments);
            let attempt = self.candidate(
                Convention::BrowserPrimitive,
                primitive.name,
                &primitive.signature,
                arguments,
            );
            if let Some(found) = rejected.accept(attempt) {
                return Ok(found);
            }
        }

        if !has_element_reference(&action.arguments) || !web {
            if let Some(declaration) = self.manifest.get(name) {
                let signature = declaration.signature();
                let attempt =
                    self.candidate(Convention::Manifest, name, &signature, action.arguments.clone());
                if let Some(found) = rejected.accept(attempt) {
                    return Ok(found);
                }
            }
        }

        if let Some(api) = self.custom.get(name) {
            let wrapped = self.api_mode == ApiRenderMode::Wrapped;
            let signature = api.signature();
            let attempt = self.candidate(
                Convention::CustomApi { wrapped },
                name,
                &signature,
                action.arguments.clone(),
            );
            if let Some(found) = rejected.accept(attempt) {
                return Ok(found);
            }
        }

        if let Some(primitive) = primitive.filter(|_| web) {
            let arguments = apply_argument_aliases(primitive, &action.arguments);
            let attempt = self.candidate(
                Convention::BrowserElement,
                primitive.name,
                &primitive.signature,
                arguments,
            );
            if let Some(found) = rejected.accept(attempt) {
                return Ok(found);
            }
        }

        Err(rejected.first.unwrap_or_else(|| VocabularyError::UnknownFunction {
            function: name.to_string(),
            web,
        }))
    }

    fn candidate(
        &self,
        convention: Convention,
        function: &str,
        signature: &Signature,
        mut arguments: BTreeMap<String, Value>,
    ) -> Result<Reconciled, VocabularyError> {
        let pending_locator = normalize_element(signature, &mut arguments);
        if let Err(err) = signature.check(function, convention.label(), &arguments) {
            debug!(
                function,
                convention = convention.label(),
                "arguments rejected by convention"
            );
            return Err(err);
        }
        debug!(
            function,
            convention = convention.label(),
            locator = pending_locator.as_deref(),
            "action reconciled"
        );
        Ok(Reconciled {
            convention,
            function: function.to_string(),
            arguments,
            signature: signature.clone(),
            pending_locator,
        })
    }
}

/// Mismatches collected while falling through the rules.
#[derive(Default)]
struct Rejections {
    first: Option<VocabularyError>,
}

impl Rejections {
    fn accept(&mut self, attempt: Result<Reconciled, VocabularyError>) -> Option<Reconciled> {
        match attempt {
            Ok(found) => Some(found),
            Err(err) => {
                if self.first.is_none() {
                    self.first = Some(err);
                }
                None
            }
        }
    }
}

fn apply_argument_aliases(
    primitive: &BrowserPrimitive,
    arguments: &BTreeMap<String, Value>,
) -> BTreeMap<String, Value> {
    let mut arguments = arguments.clone();
    for (from, to) in primitive.argument_aliases {
        if arguments.contains_key(*to) {
            continue;
        }
        if let Some(value) = arguments.remove(*from) {
            arguments.insert(to.to_string(), value);
        }
    }
    arguments
}

/// Rename element-id aliases to `bid` when the signature wants one, returning
/// the value as a locator when it is structural rather than a bid.
fn normalize_element(signature: &Signature, arguments: &mut BTreeMap<String, Value>) -> Option<String> {
    if !signature.requires(BID) {
        return None;
    }
    let alias = normalize_bid_alias(arguments);
    let value = arguments.get(BID)?.as_str()?;
    if alias == Some("xpath") || looks_like_locator(value) {
        Some(value.to_string())
    } else {
        None
    }
}

fn looks_like_locator(value: &str) -> bool {
    let unquoted = value.trim().trim_start_matches(['"', '\'']);
    unquoted.starts_with('/') || unquoted.starts_with("xpath=")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locator_detection() {
        assert!(looks_like_locator("/html/body/a"));
        assert!(looks_like_locator("'//a[@id=\"x\"]'"));
        assert!(looks_like_locator("xpath=/html"));
        assert!(!looks_like_locator("12"));
    }

    #[test]
    fn wrappers_per_convention() {
        assert_eq!(Convention::BrowserElement.wrapper(), Some(BROWSER));
        assert_eq!(
            Convention::CustomApi { wrapped: true }.wrapper(),
            Some(EXECUTE_IPYTHON_CELL)
        );
        assert_eq!(Convention::CustomApi { wrapped: false }.wrapper(), None);
        assert!(!Convention::Manifest.is_builtin());
    }
}
