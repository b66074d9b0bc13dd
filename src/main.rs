use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    soul_episodes::cli::run().await
}
