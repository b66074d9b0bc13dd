//! Conversation rendering for canonical episodes.
//!
//! [`ConversationRenderer`] walks an [`Episode`](episode_model::Episode) step by
//! step, reconciling each action against the tool vocabulary and resolving
//! structural element locators, and emits role-tagged turns in the
//! `<function=NAME>` tool-calling grammar.

pub mod errors;
pub mod grammar;
pub mod page;
pub mod renderer;
pub mod state;
pub mod system;
pub mod turn;

pub use errors::RenderError;
pub use grammar::{called_function, function_call, python_call, python_literal};
pub use renderer::{ConversationRenderer, RenderOptions, Rendered};
pub use state::{Origin, Phase, RenderState};
pub use system::{declaration_for, system_prompt, DISCOVERED_TOOLS_HEADING};
pub use turn::{Role, Turn, WireRecord};
