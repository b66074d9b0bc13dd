use clap::Subcommand;

use super::annotate::AnnotateArgs;
use super::render::RenderArgs;
use super::schema::SchemaArgs;
use super::validate::ValidateArgs;

#[derive(Subcommand, Clone)]
pub enum Commands {
    /// Render canonical episodes into tool-calling conversations
    Render(RenderArgs),

    /// Validate canonical episodes and report violations per line
    Validate(ValidateArgs),

    /// Print the JSON Schema of the canonical episode format
    Schema(SchemaArgs),

    /// Fill missing action descriptions with synthesized thoughts
    Annotate(AnnotateArgs),
}
