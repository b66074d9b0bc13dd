//! Structural locators (an XPath subset) and their matching against page elements.

use std::fmt;

use crate::errors::ResolverError;
use crate::page::PageElement;

const XPATH_PREFIX: &str = "xpath=";

/// One step of an absolute path: lowercase tag plus 1-based sibling index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathSegment {
    pub tag: String,
    pub index: usize,
}

/// Parsed structural locator.
///
/// Supported forms:
/// - absolute positional paths `/html/body/div[2]/a` (missing index means `[1]`)
/// - descendant attribute predicates `//input[@name="q"]` or `//*[@id='x']`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    Absolute(Vec<PathSegment>),
    Attribute {
        tag: Option<String>,
        attribute: String,
        value: String,
    },
}

/// Strip exactly one surrounding pair of matching quote characters.
pub fn strip_quotes(raw: &str) -> &str {
    let trimmed = raw.trim();
    let bytes = trimmed.as_bytes();
    if bytes.len() >= 2 {
        let first = bytes[0];
        let last = bytes[bytes.len() - 1];
        if (first == b'"' || first == b'\'') && first == last {
            return &trimmed[1..trimmed.len() - 1];
        }
    }
    trimmed
}

impl Locator {
    pub fn parse(raw: &str) -> Result<Self, ResolverError> {
        let unquoted = strip_quotes(raw).trim();
        let body = unquoted
            .strip_prefix(XPATH_PREFIX)
            .unwrap_or(unquoted)
            .trim();
        if body.is_empty() {
            return Err(ResolverError::malformed("empty locator"));
        }

        if let Some(rest) = body.strip_prefix("//") {
            return parse_attribute_form(rest, raw);
        }
        if let Some(rest) = body.strip_prefix('/') {
            return parse_absolute(rest).map(Locator::Absolute);
        }
        Err(ResolverError::malformed(format!(
            "relative locator not supported: {raw}"
        )))
    }

    pub fn matches(&self, element: &PageElement) -> bool {
        match self {
            Locator::Absolute(segments) => match parse_absolute_str(&element.xpath) {
                Some(path) => &path == segments,
                None => false,
            },
            Locator::Attribute {
                tag,
                attribute,
                value,
            } => {
                let tag_matches = tag
                    .as_deref()
                    .map(|tag| element.tag.eq_ignore_ascii_case(tag))
                    .unwrap_or(true);
                tag_matches
                    && element
                        .attributes
                        .get(attribute)
                        .map(|actual| actual == value)
                        .unwrap_or(false)
            }
        }
    }

    /// Canonical text form, used as index key and in logs.
    pub fn canonical(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Absolute(segments) => {
                for segment in segments {
                    write!(f, "/{}[{}]", segment.tag, segment.index)?;
                }
                Ok(())
            }
            Locator::Attribute {
                tag,
                attribute,
                value,
            } => write!(
                f,
                "//{}[@{}=\"{}\"]",
                tag.as_deref().unwrap_or("*"),
                attribute,
                value
            ),
        }
    }
}

/// Canonicalize an element's absolute xpath; `None` when it is not a plain positional path.
pub fn canonical_xpath(xpath: &str) -> Option<String> {
    parse_absolute_str(xpath).map(|segments| Locator::Absolute(segments).to_string())
}

fn parse_absolute_str(xpath: &str) -> Option<Vec<PathSegment>> {
    let rest = xpath.trim().strip_prefix('/')?;
    if rest.starts_with('/') {
        return None;
    }
    parse_absolute(rest).ok()
}

fn parse_absolute(rest: &str) -> Result<Vec<PathSegment>, ResolverError> {
    rest.split('/').map(parse_segment).collect()
}

fn parse_segment(raw: &str) -> Result<PathSegment, ResolverError> {
    let raw = raw.trim();
    let (name, index) = match raw.find('[') {
        Some(open) => {
            let inner = raw[open + 1..]
                .strip_suffix(']')
                .ok_or_else(|| ResolverError::malformed(format!("unbalanced segment '{raw}'")))?;
            let index: usize = inner
                .trim()
                .parse()
                .map_err(|_| ResolverError::malformed(format!("bad index in '{raw}'")))?;
            if index == 0 {
                return Err(ResolverError::malformed(format!(
                    "indices are 1-based in '{raw}'"
                )));
            }
            (&raw[..open], index)
        }
        None => (raw, 1),
    };
    if !is_tag_name(name) {
        return Err(ResolverError::malformed(format!("bad tag name '{name}'")));
    }
    Ok(PathSegment {
        tag: name.to_ascii_lowercase(),
        index,
    })
}

fn parse_attribute_form(rest: &str, raw: &str) -> Result<Locator, ResolverError> {
    let open = rest
        .find('[')
        .ok_or_else(|| ResolverError::malformed(format!("missing predicate in '{raw}'")))?;
    let tag = rest[..open].trim();
    let predicate = rest[open + 1..]
        .strip_suffix(']')
        .ok_or_else(|| ResolverError::malformed(format!("unbalanced predicate in '{raw}'")))?
        .trim();
    let predicate = predicate
        .strip_prefix('@')
        .ok_or_else(|| ResolverError::malformed(format!("predicate must test an attribute in '{raw}'")))?;
    let (attribute, quoted) = predicate
        .split_once('=')
        .ok_or_else(|| ResolverError::malformed(format!("predicate needs a value in '{raw}'")))?;
    let attribute = attribute.trim();
    let quoted = quoted.trim();
    let value = strip_quotes(quoted);
    if value.len() == quoted.len() || !is_tag_name(attribute) {
        return Err(ResolverError::malformed(format!("bad predicate in '{raw}'")));
    }

    let tag = match tag {
        "*" => None,
        name if is_tag_name(name) => Some(name.to_ascii_lowercase()),
        _ => return Err(ResolverError::malformed(format!("bad tag name in '{raw}'"))),
    };

    Ok(Locator::Attribute {
        tag,
        attribute: attribute.to_string(),
        value: value.to_string(),
    })
}

fn is_tag_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':'))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element(bid: &str, xpath: &str) -> PageElement {
        PageElement {
            bid: bid.to_string(),
            xpath: xpath.to_string(),
            ..PageElement::default()
        }
    }

    #[test]
    fn strips_exactly_one_quote_pair() {
        assert_eq!(strip_quotes("\"/html/body\""), "/html/body");
        assert_eq!(strip_quotes("'\"/html\"'"), "\"/html\"");
        assert_eq!(strip_quotes("\""), "\"");
        assert_eq!(strip_quotes("'a\""), "'a\"");
        assert_eq!(strip_quotes("x"), "x");
    }

    #[test]
    fn implicit_index_equals_first_sibling() {
        let short = Locator::parse("/html/body/div/a").unwrap();
        let long = Locator::parse("/HTML[1]/body[1]/div[1]/a[1]").unwrap();
        assert_eq!(short, long);
        assert!(short.matches(&element("7", "/html[1]/body[1]/div[1]/a[1]")));
        assert!(!short.matches(&element("8", "/html/body/div[2]/a")));
    }

    #[test]
    fn parses_prefixed_and_quoted_locators() {
        let locator = Locator::parse("'xpath=/html/body/button[3]'").unwrap();
        assert_eq!(locator.canonical(), "/html[1]/body[1]/button[3]");
    }

    #[test]
    fn attribute_predicate_matches_tag_and_value() {
        let locator = Locator::parse("//input[@name=\"q\"]").unwrap();
        let mut candidate = element("3", "/html/body/input");
        candidate.tag = "INPUT".to_string();
        candidate
            .attributes
            .insert("name".to_string(), "q".to_string());
        assert!(locator.matches(&candidate));

        let any = Locator::parse("//*[@name='q']").unwrap();
        assert!(any.matches(&candidate));
    }

    #[test]
    fn rejects_malformed_locators() {
        for raw in ["", "''", "div/a", "/html/body[", "/html/body[0]", "//a", "//a[@x]", "/html//a"] {
            assert!(Locator::parse(raw).is_err(), "{raw:?} should be rejected");
        }
    }
}
