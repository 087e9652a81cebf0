mod cli;
mod logging;
mod render;
mod session;

use anyhow::Result;
use clap::Parser;
use dotenv::dotenv;
use moo::config::MooConfig;

use crate::cli::{Cli, Command};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let cli = Cli::parse();
    let config = cli.apply(MooConfig::from_env()?);
    logging::init(config.debug);

    let mut agent = session::build_agent(&config, cli.api_key.clone())?;

    match cli.command() {
        Command::Repl => session::run_repl(&mut agent).await,
        Command::Demo => session::run_demo(&mut agent).await,
        Command::Test { message, file } => session::run_test(&mut agent, &message, &file).await,
    }
}
