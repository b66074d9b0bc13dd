//! Step-by-step conversion of an episode into conversation turns.

use std::collections::BTreeSet;
use std::sync::Arc;

use element_resolver::ElementResolver;
use episode_model::{ApiAction, CodeAction, Episode, MessageAction, Step};
use serde_json::Value;
use tool_vocabulary::{code_tool_for_language, Convention, ToolVocabulary, BID, FINISH};
use tracing::debug;

use crate::errors::RenderError;
use crate::grammar::{function_call, python_call};
use crate::page::{image_text, page_text};
use crate::state::{Origin, Phase, RenderState};
use crate::system::system_prompt;
use crate::turn::{Role, Turn, WireRecord};

/// Dataset-level rendering settings.
#[derive(Debug, Clone, Default)]
pub struct RenderOptions {
    /// Force the web context on or off; `None` infers it from page observations.
    pub web: Option<bool>,
    /// Text prepended to the first turn of every episode.
    pub tool_description: String,
}

/// Turns of one episode plus the non-built-in tools it used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    pub turns: Vec<Turn>,
    pub discovered: BTreeSet<String>,
}

pub struct ConversationRenderer {
    vocabulary: Arc<ToolVocabulary>,
    options: RenderOptions,
}

impl ConversationRenderer {
    pub fn new(vocabulary: Arc<ToolVocabulary>, options: RenderOptions) -> Self {
        Self {
            vocabulary,
            options,
        }
    }

    pub fn vocabulary(&self) -> &ToolVocabulary {
        &self.vocabulary
    }

    /// Render `episode`. Any argument mismatch or unknown function aborts the
    /// whole episode; resolver misses only leave a null element id behind.
    pub fn render(
        &self,
        episode: &Episode,
        resolver: &mut ElementResolver,
    ) -> Result<Rendered, RenderError> {
        let web = self.options.web.unwrap_or_else(|| is_web_episode(episode));
        let mut state = RenderState::new(&self.options.tool_description);

        for (index, step) in episode.steps.iter().enumerate() {
            match step {
                Step::WebObservation(observation) => {
                    let focused = state.last_element.take();
                    let text = page_text(&episode.id, observation, focused.as_deref(), resolver);
                    observe(&mut state, &text, Origin::Page);
                }
                Step::ImageObservation(image) => observe(&mut state, &image_text(image), Origin::Text),
                Step::TextObservation(text) => observe(&mut state, &text.content, Origin::Text),
                Step::ApiAction(action) => {
                    let call = self
                        .render_api(&episode.id, action, web, resolver, &mut state)
                        .map_err(|err| RenderError::vocabulary(&episode.id, index, err))?;
                    let value = with_thought(action.description.as_deref(), call);
                    state.push_action(Role::FunctionCall, value, Phase::AwaitingObservation);
                }
                Step::CodeAction(code) => {
                    let value = with_thought(code.description.as_deref(), render_code(code, &mut state));
                    state.push_action(Role::FunctionCall, value, Phase::AwaitingObservation);
                }
                Step::MessageAction(message) => render_message(message, &mut state),
            }
        }

        let (turns, discovered) = state.finish();
        debug!(
            episode = %episode.id,
            turns = turns.len(),
            discovered = discovered.len(),
            "episode rendered"
        );
        Ok(Rendered { turns, discovered })
    }

    /// Wire record for a rendered episode, with declarations for discovered
    /// tools appended to `system`.
    pub fn wire_record(&self, episode: &Episode, system: &str, rendered: Rendered) -> WireRecord {
        WireRecord {
            id: episode.id.clone(),
            system: system_prompt(system, &rendered.discovered, &self.vocabulary),
            conversations: rendered.turns,
        }
    }

    fn render_api(
        &self,
        episode_id: &str,
        action: &ApiAction,
        web: bool,
        resolver: &mut ElementResolver,
        state: &mut RenderState,
    ) -> Result<String, tool_vocabulary::VocabularyError> {
        let mut reconciled = self.vocabulary.reconcile(action, web)?;

        if let Some(locator) = reconciled.pending_locator.take() {
            let bid = resolver.resolve(episode_id, &locator);
            reconciled
                .arguments
                .insert(BID.to_string(), bid.map(Value::String).unwrap_or(Value::Null));
        }
        if reconciled.convention == Convention::BrowserElement {
            if let Some(bid) = reconciled.arguments.get(BID).and_then(element_ref) {
                state.last_element = Some(bid);
            }
        }
        if !reconciled.convention.is_builtin() {
            state.discovered.insert(reconciled.function.clone());
        }

        let call = match reconciled.convention.wrapper() {
            Some(tool) => {
                let code = Value::String(python_call(
                    &reconciled.function,
                    &reconciled.signature,
                    &reconciled.arguments,
                ));
                function_call(tool, [("code", &code)])
            }
            None => function_call(
                &reconciled.function,
                reconciled
                    .signature
                    .order(&reconciled.arguments)
                    .into_iter()
                    .filter_map(|key| reconciled.arguments.get(key).map(|value| (key, value))),
            ),
        };
        Ok(call)
    }
}

fn observe(state: &mut RenderState, text: &str, origin: Origin) {
    match state.phase {
        Phase::AwaitingObservation => state.push_observation(text, origin),
        _ => {
            if origin == Origin::Page && state.merge_page(text) {
                return;
            }
            state.push_human(text, origin);
        }
    }
}

fn render_code(code: &CodeAction, state: &mut RenderState) -> String {
    let tool = code_tool_for_language(&code.language);
    if !tool.builtin {
        state.discovered.insert(tool.name.clone());
    }
    let content = Value::String(code.content.clone());
    function_call(&tool.name, [(tool.parameter, &content)])
}

fn render_message(message: &MessageAction, state: &mut RenderState) {
    let description = message.description.as_deref();
    match message.finish_message() {
        Some(final_message) => {
            let final_message = Value::String(final_message.to_string());
            let call = function_call(FINISH, [("message", &final_message)]);
            state.push_action(Role::FunctionCall, with_thought(description, call), Phase::AwaitingAction);
        }
        None => {
            let value = with_thought(description, message.content.clone());
            state.push_action(Role::Gpt, value, Phase::AwaitingAction);
        }
    }
}

fn with_thought(description: Option<&str>, body: String) -> String {
    match description.map(str::trim).filter(|text| !text.is_empty()) {
        Some(thought) => format!("{thought}\n{body}"),
        None => body,
    }
}

fn element_ref(value: &Value) -> Option<String> {
    match value {
        Value::String(bid) => Some(bid.clone()),
        Value::Number(bid) => Some(bid.to_string()),
        _ => None,
    }
}

fn is_web_episode(episode: &Episode) -> bool {
    episode
        .steps
        .iter()
        .any(|step| matches!(step, Step::WebObservation(_)))
}
