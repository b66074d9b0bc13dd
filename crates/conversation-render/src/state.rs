//! Per-episode mutable render state.

use std::collections::BTreeSet;

use crate::grammar::called_function;
use crate::turn::{Role, Turn};

/// Position of the renderer in the turn protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Empty,
    /// Last turn is a human or observation turn.
    AwaitingAction,
    /// Last turn is a rendered action.
    AwaitingObservation,
    Done,
}

/// What produced the most recent human/observation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Page,
    Text,
    Action,
}

/// State created at the start of one episode's render and dropped at its end.
#[derive(Debug)]
pub struct RenderState {
    pub phase: Phase,
    pub turns: Vec<Turn>,
    pub origin: Option<Origin>,
    /// Element id used by the most recent browser primitive.
    pub last_element: Option<String>,
    pub discovered: BTreeSet<String>,
    tool_description: String,
}

impl RenderState {
    pub fn new(tool_description: &str) -> Self {
        Self {
            phase: Phase::Empty,
            turns: Vec::new(),
            origin: None,
            last_element: None,
            discovered: BTreeSet::new(),
            tool_description: tool_description.to_string(),
        }
    }

    /// Open a new human turn; the first turn carries the tool description.
    pub fn push_human(&mut self, text: &str, origin: Origin) {
        let value = if self.turns.is_empty() {
            join_blocks(&self.tool_description, text)
        } else {
            text.to_string()
        };
        self.turns.push(Turn::new(Role::Human, value));
        self.origin = Some(origin);
        self.phase = Phase::AwaitingAction;
    }

    /// Append page text to the previous turn when that turn came from a page.
    pub fn merge_page(&mut self, text: &str) -> bool {
        if self.origin != Some(Origin::Page) {
            return false;
        }
        match self.turns.last_mut() {
            Some(turn) if matches!(turn.from, Role::Human | Role::Observation) => {
                turn.value = join_blocks(&turn.value, text);
                true
            }
            _ => false,
        }
    }

    /// Observation answering the last rendered call.
    pub fn push_observation(&mut self, text: &str, origin: Origin) {
        let tool = self
            .turns
            .iter()
            .rev()
            .find(|turn| turn.from == Role::FunctionCall)
            .and_then(|turn| called_function(&turn.value))
            .unwrap_or("unknown");
        let value = format!("EXECUTION RESULT of [{tool}]:\n{text}");
        self.turns.push(Turn::new(Role::Observation, value));
        self.origin = Some(origin);
        self.phase = Phase::AwaitingAction;
    }

    /// Emit an agent turn. An action with nothing before it is preceded by a
    /// human turn holding only the tool description.
    pub fn push_action(&mut self, role: Role, value: String, next: Phase) {
        if self.phase == Phase::Empty {
            let description = self.tool_description.clone();
            self.turns.push(Turn::new(Role::Human, description));
        }
        self.turns.push(Turn::new(role, value));
        self.origin = Some(Origin::Action);
        self.phase = next;
    }

    pub fn finish(mut self) -> (Vec<Turn>, BTreeSet<String>) {
        self.phase = Phase::Done;
        (self.turns, self.discovered)
    }
}

fn join_blocks(head: &str, tail: &str) -> String {
    match (head.is_empty(), tail.is_empty()) {
        (true, _) => tail.to_string(),
        (false, true) => head.to_string(),
        (false, false) => format!("{head}\n\n{tail}"),
    }
}
