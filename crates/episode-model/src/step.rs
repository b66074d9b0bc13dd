use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Opening tag of a finish signal wrapped in a message action.
pub const FINISH_OPEN: &str = "<finish>";
/// Closing tag of a finish signal wrapped in a message action.
pub const FINISH_CLOSE: &str = "</finish>";

/// Who produced an observation.
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    /// Human operator issuing goals or follow-up requests.
    User,
    /// The agent itself.
    Agent,
    /// Tool output, browser, terminal.
    #[default]
    Environment,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::User => "user",
            Source::Agent => "agent",
            Source::Environment => "environment",
        }
    }
}

/// A visible UI element described on a screenshot.
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Annotation {
    pub text: String,
    pub element_type: String,
    /// `[x, y, width, height]` in screenshot pixels.
    pub bounding_box: [f64; 4],
}

/// A structured call with named arguments.
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiAction {
    pub function: String,
    #[serde(default)]
    pub arguments: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ApiAction {
    pub fn new(function: impl Into<String>) -> Self {
        Self {
            function: function.into(),
            arguments: BTreeMap::new(),
            description: None,
        }
    }

    pub fn with_argument(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.arguments.insert(key.into(), value.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Free-form code executed in a named language runtime.
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CodeAction {
    pub language: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Natural-language utterance from the agent.
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MessageAction {
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl MessageAction {
    /// Returns the final message when the content wraps a finish signal.
    pub fn finish_message(&self) -> Option<&str> {
        let trimmed = self.content.trim();
        trimmed
            .strip_prefix(FINISH_OPEN)?
            .strip_suffix(FINISH_CLOSE)
            .map(str::trim)
    }
}

#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TextObservation {
    pub content: String,
    #[serde(default)]
    pub source: Source,
}

#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImageObservation {
    /// Path reference to the image file.
    pub content: String,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
    #[serde(default)]
    pub source: Source,
}

/// Browser state observed after navigation or interaction.
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct WebObservation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub axtree: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageObservation>,
    /// `(width, height)` of the browser viewport.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub viewport: Option<(u32, u32)>,
}

impl WebObservation {
    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..Self::default()
        }
    }
}

/// One step of an episode.
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Step {
    ApiAction(ApiAction),
    CodeAction(CodeAction),
    MessageAction(MessageAction),
    TextObservation(TextObservation),
    ImageObservation(ImageObservation),
    WebObservation(WebObservation),
}

/// Wire tags accepted for [`Step`], in declaration order.
pub const STEP_TAGS: &[&str] = &[
    "api_action",
    "code_action",
    "message_action",
    "text_observation",
    "image_observation",
    "web_observation",
];

impl Step {
    pub fn tag(&self) -> &'static str {
        match self {
            Step::ApiAction(_) => "api_action",
            Step::CodeAction(_) => "code_action",
            Step::MessageAction(_) => "message_action",
            Step::TextObservation(_) => "text_observation",
            Step::ImageObservation(_) => "image_observation",
            Step::WebObservation(_) => "web_observation",
        }
    }

    pub fn is_action(&self) -> bool {
        matches!(
            self,
            Step::ApiAction(_) | Step::CodeAction(_) | Step::MessageAction(_)
        )
    }

    /// Description attached to an action, if any.
    pub fn description(&self) -> Option<&str> {
        match self {
            Step::ApiAction(action) => action.description.as_deref(),
            Step::CodeAction(action) => action.description.as_deref(),
            Step::MessageAction(action) => action.description.as_deref(),
            _ => None,
        }
    }

    /// Mutable access to an action's description slot; `None` for observations.
    pub fn description_mut(&mut self) -> Option<&mut Option<String>> {
        match self {
            Step::ApiAction(action) => Some(&mut action.description),
            Step::CodeAction(action) => Some(&mut action.description),
            Step::MessageAction(action) => Some(&mut action.description),
            _ => None,
        }
    }

    pub fn text(content: impl Into<String>, source: Source) -> Self {
        Step::TextObservation(TextObservation {
            content: content.into(),
            source,
        })
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::ApiAction(action) => write!(f, "api_action({})", action.function),
            Step::CodeAction(action) => write!(f, "code_action({})", action.language),
            Step::MessageAction(_) => f.write_str("message_action"),
            Step::TextObservation(obs) => write!(f, "text_observation({})", obs.source.as_str()),
            Step::ImageObservation(obs) => write!(f, "image_observation({})", obs.content),
            Step::WebObservation(obs) => write!(
                f,
                "web_observation({})",
                obs.url.as_deref().unwrap_or("-")
            ),
        }
    }
}
