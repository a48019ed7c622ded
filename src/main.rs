use anyhow::Result;
use clap::Parser;

use artistpath::cli::Cli;
use artistpath::server::init_tracing;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_format);
    cli.run().await
}
