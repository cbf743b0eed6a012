use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "chatrelay")]
#[command(author, version, about = "Streaming chat relay and transcript client", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the relay server
    Serve {
        #[arg(long)]
        host: Option<String>,

        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Start an interactive chat against a relay
    Chat {
        /// User id tagging persisted transcripts
        #[arg(short, long)]
        user: String,

        /// Relay endpoint (default: client.relay_url from settings)
        #[arg(long)]
        relay_url: Option<String>,

        /// Rebuild the conversation from stored transcripts
        #[arg(short, long)]
        resume: bool,

        /// Mirror the conversation to a local snapshot file
        #[arg(long)]
        snapshot: Option<PathBuf>,
    },

    /// List stored transcripts for a user
    History {
        #[arg(short, long)]
        user: String,
    },
}
