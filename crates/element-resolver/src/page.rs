use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One element of a rendered page, as reported by the page renderer.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PageElement {
    pub bid: String,
    /// Absolute positional path of the element, e.g. `/html/body/div[2]/a`.
    pub xpath: String,
    #[serde(default)]
    pub tag: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

/// Output of the external page renderer for one HTML snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RenderedPage {
    /// Flattened accessibility tree text.
    pub axtree: String,
    /// Elements carrying stable identifiers, in document order.
    #[serde(default)]
    pub elements: Vec<PageElement>,
}

impl RenderedPage {
    pub fn element(&self, bid: &str) -> Option<&PageElement> {
        self.elements.iter().find(|element| element.bid == bid)
    }
}
