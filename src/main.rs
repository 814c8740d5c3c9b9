use clap::Parser;
use tracing_subscriber::EnvFilter;

mod app;
mod classifier;
mod cli;
mod commands;
mod config;
mod core;
mod display;
mod executor;
mod generator;
mod history;
mod input;
mod providers;
mod repl;
mod system;

use crate::app::Application;
use crate::cli::Args;
use crate::config::Config;
use crate::core::error::ShellmancerError;

const LOG_ENV: &str = "SHELLMANCER_LOG";

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(args: Args) -> Result<(), ShellmancerError> {
    let config = Config::load()?;
    Application::new(args, config).run().await
}

#[tokio::main]
async fn main() {
    init_tracing();
    let args = Args::parse();

    if let Err(e) = run(args).await {
        display::display_error(&format!("Error: {}", e));
        std::process::exit(1);
    }
}
