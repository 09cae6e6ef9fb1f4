use anyhow::Result;
use clap::Parser;

mod cli;
mod config;
mod render;

#[tokio::main]
async fn main() -> Result<()> {
    let env_failures = config::load_env();
    let app = cli::App::parse();
    app.init_logging();
    for failure in env_failures {
        tracing::warn!(%failure, "failed to load env file");
    }

    app.run().await
}
