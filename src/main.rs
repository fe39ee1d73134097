use anyhow::Result;
use clap::Parser;
use cafeservice::Cli;
use cafeservice::run;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    run(cli).await
}
