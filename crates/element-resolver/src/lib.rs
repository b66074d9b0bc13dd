//! Element reference resolution for recorded web episodes.
//!
//! This crate implements:
//! - the [`PageRenderer`] port that turns an HTML snapshot into an AX tree
//! - a single-slot [`ElementResolver`] cache keyed by the HTML value, built lazily
//!   when a staged page is first needed for a locator
//! - structural locator (XPath subset) resolution to stable element ids
//! - the shared append-only [`ErrorSink`] for soft resolution failures

pub mod errors;
pub mod locator;
pub mod page;
pub mod renderer;
pub mod resolver;
pub mod sink;

pub use errors::ResolverError;
pub use locator::{strip_quotes, Locator};
pub use page::{PageElement, RenderedPage};
pub use renderer::{CommandRenderer, DisabledRenderer, PageRenderer};
pub use resolver::{ElementResolver, ResolverStats};
pub use sink::{ErrorSink, FailurePhase, ResolveFailure};
