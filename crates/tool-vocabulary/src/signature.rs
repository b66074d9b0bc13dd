use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::VocabularyError;

/// Canonical name of the element identifier argument.
pub const BID: &str = "bid";
/// Argument names normalized to [`BID`] when a convention requires it.
pub const BID_ALIASES: &[&str] = &["id", "xpath", "element_id"];

/// `required ⊆ provided ⊆ required ∪ optional`.
pub fn verify<'a, R, O, P>(required: R, optional: O, provided: P) -> bool
where
    R: IntoIterator<Item = &'a str>,
    O: IntoIterator<Item = &'a str>,
    P: IntoIterator<Item = &'a str>,
{
    let required: BTreeSet<&str> = required.into_iter().collect();
    let optional: BTreeSet<&str> = optional.into_iter().collect();
    let provided: BTreeSet<&str> = provided.into_iter().collect();

    required.is_subset(&provided)
        && provided
            .iter()
            .all(|name| required.contains(name) || optional.contains(name))
}

/// Ordered argument contract of one callable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    #[serde(default)]
    pub required: Vec<String>,
    #[serde(default)]
    pub optional: Vec<String>,
}

impl Signature {
    pub fn new(required: &[&str], optional: &[&str]) -> Self {
        Self {
            required: required.iter().map(|s| s.to_string()).collect(),
            optional: optional.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn requires(&self, name: &str) -> bool {
        self.required.iter().any(|arg| arg == name)
    }

    pub fn accepts<'a>(&'a self, provided: impl IntoIterator<Item = &'a str>) -> bool {
        verify(
            self.required.iter().map(String::as_str),
            self.optional.iter().map(String::as_str),
            provided,
        )
    }

    /// Verify `arguments`, producing a hard error naming `function` on mismatch.
    pub fn check(
        &self,
        function: &str,
        convention: &'static str,
        arguments: &BTreeMap<String, Value>,
    ) -> Result<(), VocabularyError> {
        if self.accepts(arguments.keys().map(String::as_str)) {
            return Ok(());
        }
        Err(VocabularyError::ArgumentMismatch {
            function: function.to_string(),
            convention,
            provided: arguments.keys().cloned().collect(),
            required: self.required.clone(),
            optional: self.optional.clone(),
        })
    }

    /// Argument names in rendering order: declared order first, then the rest sorted.
    pub fn order<'a>(&'a self, arguments: &'a BTreeMap<String, Value>) -> Vec<&'a str> {
        let declared = self
            .required
            .iter()
            .chain(self.optional.iter())
            .map(String::as_str)
            .filter(|name| arguments.contains_key(*name));
        let extra = arguments
            .keys()
            .map(String::as_str)
            .filter(|name| !self.requires(name) && !self.optional.iter().any(|o| o == name));
        declared.chain(extra).collect()
    }
}

/// Rename the first present element-id alias to [`BID`].
///
/// Returns the original key that was renamed, if any. An existing `bid` wins
/// over aliases, which are then left untouched.
pub fn normalize_bid_alias(arguments: &mut BTreeMap<String, Value>) -> Option<&'static str> {
    if arguments.contains_key(BID) {
        return None;
    }
    for alias in BID_ALIASES {
        if let Some(value) = arguments.remove(*alias) {
            arguments.insert(BID.to_string(), value);
            return Some(alias);
        }
    }
    None
}

/// Whether the arguments carry any form of element identifier.
pub fn has_element_reference(arguments: &BTreeMap<String, Value>) -> bool {
    arguments.contains_key(BID) || BID_ALIASES.iter().any(|alias| arguments.contains_key(*alias))
}
