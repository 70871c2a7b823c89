mod call;
mod serve;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "duet", version, about = "Two-party audio/video calls over a room signaling service")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the signaling service.
    Serve(serve::ServeArgs),
    /// Create a room and wait for someone to call.
    Create(call::CallArgs),
    /// Join an existing room.
    Join(call::CallArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match Cli::parse().command {
        Commands::Serve(args) => serve::run(args).await,
        Commands::Create(args) => call::run(call::Mode::Create, args).await,
        Commands::Join(args) => call::run(call::Mode::Join, args).await,
    }
}
