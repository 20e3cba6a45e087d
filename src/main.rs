use clap::Parser;
use taskboard::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    taskboard::server::run(cli).await?;

    Ok(())
}
