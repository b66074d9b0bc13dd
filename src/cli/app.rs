use anyhow::Result;
use clap::Parser;
use tracing::{error, info};

use super::dispatch::dispatch;
use super::env::CliArgs;
use super::runtime::{init_logging, load_local_env_overrides};

pub async fn run() -> Result<()> {
    load_local_env_overrides();
    let cli = CliArgs::parse();

    init_logging(&cli.log_level, cli.debug, cli.log_json)?;
    info!(
        revision = env!("SOUL_EPISODES_REVISION"),
        built = env!("SOUL_EPISODES_BUILD_DATE"),
        "Starting soul-episodes v{}",
        env!("CARGO_PKG_VERSION")
    );

    match dispatch(&cli).await {
        Ok(()) => {
            info!("Command completed successfully");
            Ok(())
        }
        Err(err) => {
            error!("Command failed: {:#}", err);
            Err(err)
        }
    }
}
