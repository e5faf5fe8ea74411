mod ai;
mod app;
mod cli;
mod config;
mod db;
mod domain;
mod extractor;
mod infrastructure;
mod pipeline;
#[cfg(test)]
mod test_support;

use anyhow::Result;
use clap::Parser;
use infrastructure::{directories, logging, shutdown};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = cli::Args::parse();

    let config = config::load_config()?;
    let paths = directories::ensure_directories(&config.directories)?;
    logging::init_tracing(&config, &paths)?;

    let (shutdown, _) = shutdown::Shutdown::new();
    shutdown::install_signal_handlers(shutdown.clone());

    let app = app::AuditApp::initialize(config, paths, shutdown).await?;
    app.run(args.command).await
}
