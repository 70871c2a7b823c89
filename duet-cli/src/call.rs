use anyhow::{Context, Result};
use colored::*;
use dialoguer::Input;
use duet::client::{CallState, ClientConfig, SessionEvent, SyntheticSource, connect};
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};

pub enum Mode {
    Create,
    Join,
}

#[derive(clap::Args)]
pub struct CallArgs {
    /// Identity shown to the other participant; prompted for when missing.
    #[arg(long)]
    email: Option<String>,

    /// Room name; prompted for when missing.
    #[arg(long)]
    room: Option<String>,

    /// Signaling service endpoint.
    #[arg(long, env = "DUET_URL", default_value = "ws://127.0.0.1:8000/ws")]
    url: String,

    /// File the latest room snapshot is kept in.
    #[arg(long)]
    cache: Option<PathBuf>,

    #[arg(long)]
    no_audio: bool,

    #[arg(long)]
    no_video: bool,

    /// Gather loopback candidates, for two clients on the same host.
    #[arg(long)]
    loopback: bool,
}

pub async fn run(mode: Mode, args: CallArgs) -> Result<()> {
    let email = match args.email {
        Some(email) => email,
        None => Input::<String>::new()
            .with_prompt("Email")
            .validate_with(|input: &String| {
                if input.contains('@') {
                    Ok(())
                } else {
                    Err("Please enter a valid email")
                }
            })
            .interact_text()?,
    };
    let room = match args.room {
        Some(room) => room,
        None => Input::<String>::new().with_prompt("Room").interact_text()?,
    };

    let config = ClientConfig {
        server_url: args.url,
        cache_path: args.cache,
        loopback_candidates: args.loopback,
        ..Default::default()
    };
    let source = SyntheticSource::new(!args.no_audio, !args.no_video);
    let mut client = connect(&config, source)
        .await
        .with_context(|| format!("Failed to connect to {}", config.server_url))?;
    println!("{} {}", "Connected as".green().bold(), client.local_id);

    match mode {
        Mode::Create => client.handle.create_room(email, room).await?,
        Mode::Join => client.handle.join_room(email, room).await?,
    }
    print_help();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            evt = client.events.recv() => {
                let Some(evt) = evt else { break };
                report(&evt);
            }

            line = lines.next_line() => {
                let Some(line) = line? else {
                    client.handle.shutdown().await?;
                    break;
                };
                match line.trim() {
                    "call" => client.handle.call().await?,
                    "send" | "accept" => client.handle.send_streams().await?,
                    "quit" | "exit" => {
                        client.handle.shutdown().await?;
                        break;
                    }
                    "help" => print_help(),
                    "" => {}
                    other => println!("{} {other}", "Unknown command:".yellow()),
                }
            }
        }
    }

    client.task.await?;
    println!("{}", "Bye".dimmed());
    Ok(())
}

fn print_help() {
    println!("{}", "Commands:".cyan().bold());
    println!("  call   offer a call to the other participant");
    println!("  send   share your media (accepts an incoming call)");
    println!("  quit   leave");
}

fn report(evt: &SessionEvent) {
    match evt {
        SessionEvent::Welcome { peer_id } => println!("{} {peer_id}", "Connected as".green()),
        SessionEvent::Joined { room, rooms } => {
            println!("{} {room}", "Joined room".green().bold());
            if let Some(members) = rooms.get(room) {
                for user in &members.users {
                    println!("  {} ({})", user.email, user.socket_id);
                }
            }
        }
        SessionEvent::RoomError { msg } => println!("{}", msg.red().bold()),
        SessionEvent::RemoteJoined { email, id } => {
            println!("{} {email} ({id})", "In the room:".cyan());
            println!("  type {} to start a call", "call".bold());
        }
        SessionEvent::StateChanged(state) => {
            println!("{} {state}", "state:".dimmed());
            if let CallState::Answering { .. } = state {
                println!("  call answered, type {} to share your media", "send".bold());
            }
        }
        SessionEvent::LocalStream(stream) => println!(
            "{} {} ({} track(s))",
            "Local stream".blue(),
            stream.id(),
            stream.tracks().len()
        ),
        SessionEvent::RemoteTrack(handle) => println!(
            "{} {:?} track {}",
            "Receiving".magenta().bold(),
            handle.kind,
            handle.track_id
        ),
        SessionEvent::PeerState(state) => println!("{} {:?}", "peer:".dimmed(), state),
    }
}
