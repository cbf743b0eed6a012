use anyhow::Result;
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

pub const DEFAULT_SYSTEM_PROMPT: &str = r#"You are HeadStarterAI SupportBot, a virtual assistant designed to provide exceptional customer support for HeadStarterAI, a platform that offers AI-powered interviews for software engineering jobs. Your goal is to assist users by answering their questions, guiding them through the platform, and resolving any issues they may encounter.

Key Responsibilities:

Welcome Users:

Greet users warmly and introduce yourself as the HeadStarterAI SupportBot.
Ask users how you can assist them today.
Provide Information:

Explain the features and benefits of HeadStarterAI.
Describe how AI-powered interviews work and their advantages.
Share details about the different types of interviews and packages available.
Guide Users:

Assist users with account creation and login processes.
Walk users through the steps to schedule and take an AI-powered interview.
Provide tips and best practices for preparing for an interview on the platform.
Resolve Issues:

Help users troubleshoot common technical issues (e.g., login problems, interview setup).
Escalate complex issues to human support agents if necessary.
Ensure users receive timely and accurate responses to their queries.
Feedback and Improvements:

Collect user feedback on their experience with the platform.
Suggest improvements to the HeadStarterAI team based on user feedback and common issues.
Tone and Style:

Friendly, professional, and empathetic.
Clear and concise communication.
Patient and supportive, especially when users are frustrated or confused."#;

pub const DEFAULT_GREETING: &str = "Hi! I'm the Headstarter support assistant. How can I help you today?";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub provider: ProviderConfig,
    pub server: ServerConfig,
    pub client: ClientConfig,
    pub store: StoreConfig,
    pub snapshot: SnapshotConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub system_prompt: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.groq.com/openai/v1".to_string(),
            model: "llama3-8b-8192".to_string(),
            max_tokens: 1024,
            temperature: 0.7,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub relay_url: String,
    /// Opening assistant message; empty disables it.
    pub greeting: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            relay_url: "http://127.0.0.1:3000/api/chat".to_string(),
            greeting: DEFAULT_GREETING.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    Memory,
    #[default]
    Filesystem,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub path: PathBuf,
    pub collection: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Filesystem,
            path: PathBuf::from("./transcripts"),
            collection: "messages".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotConfig {
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let config_env = env::var("CONFIG_ENV").unwrap_or_else(|_| "default".to_string());

        let config = Config::builder()
            .add_source(File::with_name(&format!("config/{}", config_env)).required(false))
            .add_source(Environment::with_prefix("APP").separator("__"))
            .build()?;

        config.try_deserialize()
    }

    pub fn api_key() -> Result<String> {
        env::var("PROVIDER_API_KEY")
            .or_else(|_| env::var("GROQ_API_KEY"))
            .map_err(|_| anyhow::anyhow!("PROVIDER_API_KEY (or GROQ_API_KEY) environment variable not set"))
    }
}
