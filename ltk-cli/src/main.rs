//! Lake trend CLI - analyze lake level series, forecast dry-out and fetch weather covariates.

use clap::Parser;

#[derive(Parser)]
#[command(
    name = "ltk-cli",
    version,
    about = "Lake level trend analysis toolkit"
)]
struct Cli {
    #[command(subcommand)]
    command: ltk_cmd::Command,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    ltk_cmd::run(cli.command).await
}
