use anyhow::Result;
use campus_records::cli::Cli;
use campus_records::logging::init_logger;
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logger(cli.verbose);
    cli.run().await
}
