use super::annotate::cmd_annotate;
use super::env::CliArgs;
use super::render::cmd_render;
use super::schema::cmd_schema;
use super::validate::cmd_validate;
use crate::cli::commands::Commands;
use anyhow::Result;

pub async fn dispatch(cli: &CliArgs) -> Result<()> {
    let datasets_dir = cli.datasets_dir.as_deref();
    match cli.command.clone() {
        Commands::Render(args) => cmd_render(args, datasets_dir).await,
        Commands::Validate(args) => cmd_validate(args).await,
        Commands::Schema(args) => cmd_schema(args).await,
        Commands::Annotate(args) => cmd_annotate(args, datasets_dir).await,
    }
}
