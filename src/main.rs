use anyhow::Result;
use clap::Parser;
use quartermaster::cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    quartermaster::logging::init_tracing(cli.verbose);
    cli.run().await
}
