use anyhow::{Context, Result};
use colored::*;
use duet::model::IceServerConfig;
use duet::server::{ServerConfig, router, start};
use tracing::info;

#[derive(clap::Args)]
pub struct ServeArgs {
    /// Address to listen on.
    #[arg(long, env = "DUET_ADDR", default_value = "0.0.0.0:8000")]
    addr: String,

    /// TURN server advertised to clients next to the default STUN servers.
    #[arg(long, env = "TURN_URL")]
    turn_url: Option<String>,

    #[arg(long, env = "TURN_USERNAME", requires = "turn_url")]
    turn_username: Option<String>,

    #[arg(long, env = "TURN_CREDENTIAL", requires = "turn_url")]
    turn_credential: Option<String>,
}

pub async fn run(args: ServeArgs) -> Result<()> {
    let mut config = ServerConfig::default();
    if let Some(url) = args.turn_url {
        info!("Advertising TURN server {url}");
        config.ice_servers.push(IceServerConfig {
            urls: vec![url],
            username: args.turn_username,
            credential: args.turn_credential,
        });
    }

    let app = router(start(config));

    let listener = tokio::net::TcpListener::bind(&args.addr)
        .await
        .with_context(|| format!("Failed to bind {}", args.addr))?;
    let addr = listener.local_addr()?;

    println!(
        "{} ws://{}/ws",
        "Signaling service listening on".green().bold(),
        addr
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await
        .context("Signaling service failed")?;
    Ok(())
}
