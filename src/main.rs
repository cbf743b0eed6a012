use anyhow::{Context, Result};
use chatrelay::cli::{Cli, Commands};
use chatrelay::storage::open_store;
use chatrelay::transcript::snapshot;
use chatrelay::{
    utils, ChatSession, Conversation, OpenAiProvider, RelayClient, RelayServer, Settings, TranscriptSync,
    TurnOutcome, UserId,
};
use clap::Parser;
use std::path::Path;
use std::sync::Arc;
use tokio::io::{self, AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let mut settings = Settings::new().context("Failed to load settings")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.logging.level)),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { host, port } => {
            if let Some(host) = host {
                settings.server.host = host;
            }
            if let Some(port) = port {
                settings.server.port = port;
            }
            handle_serve(settings).await
        }
        Commands::Chat {
            user,
            relay_url,
            resume,
            snapshot,
        } => {
            if let Some(url) = relay_url {
                settings.client.relay_url = url;
            }
            if snapshot.is_some() {
                settings.snapshot.path = snapshot;
            }
            handle_chat(settings, UserId::new(user), resume).await
        }
        Commands::History { user } => handle_history(settings, UserId::new(user)).await,
    }
}

async fn handle_serve(settings: Settings) -> Result<()> {
    let api_key = Settings::api_key()?;
    let provider = Arc::new(OpenAiProvider::new(api_key, settings.provider.clone()));

    RelayServer::new(&settings, provider)
        .run(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
}

async fn handle_chat(settings: Settings, user: UserId, resume: bool) -> Result<()> {
    let store = open_store(&settings.store).await.context("Failed to open transcript store")?;
    let sync = TranscriptSync::new(store, settings.store.collection.clone(), user.clone());
    let transport = Arc::new(RelayClient::new(settings.client.relay_url.clone()));

    let mut session = if resume {
        ChatSession::resume(transport, sync, &settings.client.greeting).await?
    } else {
        let conversation = match &settings.snapshot.path {
            Some(path) => restore_snapshot(path, &settings.client.greeting).await,
            None => Conversation::with_greeting(&settings.client.greeting),
        };
        ChatSession::new(conversation, transport, sync)
    };
    if let Some(path) = settings.snapshot.path.clone() {
        session = session.with_snapshot(path);
    }

    utils::print_header(&format!("Chat ({})", user));
    utils::print_info("Type your messages (Ctrl+C to exit, /help for commands)\n");
    for message in session.conversation().messages() {
        utils::print_message(message);
    }

    let mut reader = BufReader::new(io::stdin());

    loop {
        utils::print_prompt("You: ");
        let mut input = String::new();
        if reader.read_line(&mut input).await? == 0 {
            break;
        }

        let input = input.trim();
        if input.is_empty() {
            continue;
        }

        if input == "/count" {
            utils::print_info(&format!("Messages in conversation: {}", session.conversation().len()));
            continue;
        }

        if input == "/help" {
            println!("Special commands:");
            println!("  /count  - Show message count");
            println!("  /help   - Show this help");
            println!("  Ctrl+C  - Exit\n");
            continue;
        }

        utils::print_prompt("Assistant: ");
        let mut printed = false;
        let outcome = session
            .send(input, |fragment| {
                printed = true;
                utils::print_fragment(fragment);
            })
            .await?;

        match outcome {
            TurnOutcome::Completed { persisted, .. } => {
                println!("\n");
                if !persisted {
                    utils::print_error("(transcript not saved)");
                }
            }
            TurnOutcome::Failed { reply, .. } => {
                if printed {
                    println!();
                } else {
                    println!("{}", reply);
                }
                utils::print_error("(response interrupted)\n");
            }
        }
    }

    Ok(())
}

async fn restore_snapshot(path: &Path, greeting: &str) -> Conversation {
    let conversation = snapshot::load(path).await;
    if conversation.is_empty() {
        Conversation::with_greeting(greeting)
    } else {
        utils::print_success(&format!("Restored {} messages from snapshot", conversation.len()));
        conversation
    }
}

async fn handle_history(settings: Settings, user: UserId) -> Result<()> {
    let store = open_store(&settings.store).await.context("Failed to open transcript store")?;
    let sync = TranscriptSync::new(store, settings.store.collection.clone(), user.clone());

    let records = sync.history().await.context("Failed to query transcripts")?;
    utils::print_header(&format!("Transcripts for {} ({})", user, records.len()));

    for record in records {
        utils::print_info(&format!("\n[{}] {}", record.timestamp.to_rfc3339(), record.id));
        for message in &record.messages {
            utils::print_message(message);
        }
    }

    Ok(())
}
