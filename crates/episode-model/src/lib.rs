//! Canonical episode model.
//!
//! Upstream parsers normalize raw agent recordings into [`Episode`] values made of
//! tagged [`Step`]s. Everything downstream treats episodes as read-only.

pub mod episode;
pub mod errors;
pub mod step;
pub mod validate;

pub use episode::Episode;
pub use errors::{ValidationError, ValidationIssue};
pub use step::{
    Annotation, ApiAction, CodeAction, ImageObservation, MessageAction, Source, Step,
    TextObservation, WebObservation, FINISH_CLOSE, FINISH_OPEN, STEP_TAGS,
};
pub use validate::{decode_episode, validate_episode};
