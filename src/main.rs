use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ria::audio::{AudioPlayer, MutedOutput};
use ria::messages::{ContentType, Message, Sender};
use ria::protocol::{Dispatcher, PayloadDecoder};
use ria::{parse_reply, Collaborators, ConversationLog, WidgetConfig, WidgetHandle};
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "ria")]
#[command(about = "Conversational assistant client", long_about = None)]
struct Cli {
    /// Configuration file (TOML, YAML or JSON)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a reply into content blocks
    Parse {
        /// File to read; stdin when omitted
        file: Option<PathBuf>,
        /// Print blocks as JSON
        #[arg(long)]
        json: bool,
    },
    /// Decode one control payload and print the resulting conversation
    Decode {
        /// File to read; stdin when omitted
        file: Option<PathBuf>,
    },
    /// Chat with the text endpoint, one message per line
    Chat {
        /// Do not play synthesized speech
        #[arg(long)]
        mute: bool,
    },
}

fn read_input(file: Option<PathBuf>) -> Result<String> {
    match file {
        Some(path) => std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display())),
        None => {
            let mut input = String::new();
            std::io::stdin().read_to_string(&mut input)?;
            Ok(input)
        }
    }
}

fn print_message(message: &Message) {
    let who = match message.sender {
        Sender::User => "you",
        Sender::Bot => "ria",
    };
    match message.content_type {
        ContentType::Text => {
            println!("[{}]", who);
            for block in &message.blocks {
                println!("{}", block);
            }
        }
        other => println!("[{}:{}] {}", who, other.as_str(), message.body),
    }
}

#[cfg(feature = "audio-io")]
fn player(mute: bool) -> Arc<dyn AudioPlayer> {
    if mute {
        Arc::new(MutedOutput)
    } else {
        Arc::new(ria::audio::AudioOutput::new())
    }
}

#[cfg(not(feature = "audio-io"))]
fn player(_mute: bool) -> Arc<dyn AudioPlayer> {
    tracing::warn!("Built without audio-io, speech is not played");
    Arc::new(MutedOutput)
}

async fn chat(config: WidgetConfig, mute: bool) -> Result<()> {
    let collaborators = Collaborators::text_only(&config, player(mute));
    let mut widget = WidgetHandle::start(config, collaborators)?;
    widget.open()?;
    for message in widget.messages() {
        print_message(&message);
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let last_seen = widget.log().last().map(|m| m.id).unwrap_or(0);
        if let Err(e) = widget.send_text(&line).await {
            eprintln!("{}", e);
        }
        for message in widget.log().since(last_seen) {
            if message.sender == Sender::Bot {
                print_message(&message);
            }
        }
        widget.wait_for_playback().await?;
    }

    widget.stop().await;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ria=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Parse { file, json } => {
            let blocks = parse_reply(&read_input(file)?);
            if json {
                println!("{}", serde_json::to_string_pretty(&blocks)?);
            } else {
                for block in &blocks {
                    println!("{}", block);
                }
            }
        }
        Commands::Decode { file } => {
            let payload = read_input(file)?;
            let mut dispatcher = Dispatcher::new(ConversationLog::new());
            let outcome = dispatcher.dispatch(PayloadDecoder::default().decode(payload.trim()), true);
            for message in dispatcher.log().get_all() {
                print_message(&message);
            }
            for clip in &outcome.playback {
                println!("(audio: {} bytes of {})", clip.len(), clip.mime);
            }
            if outcome.interrupt {
                println!("(interrupt)");
            }
        }
        Commands::Chat { mute } => {
            let config = WidgetConfig::load(cli.config.as_deref())?;
            info!("Starting chat against {}", config.endpoints.text_url());
            chat(config, mute).await?;
        }
    }

    Ok(())
}
