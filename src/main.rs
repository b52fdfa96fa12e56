use anyhow::Result;
use clap::Parser;
use divvy::cli::Cli;
use tracing::Level;

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(if cli.verbose {
            Level::DEBUG
        } else {
            Level::WARN
        })
        .init();

    cli.run()
}
