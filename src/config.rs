//! TOML configuration and environment-supplied secrets.
//!
//! The config file carries everything that is safe to commit. The token
//! signing secret and the generative-API key are read from environment
//! variables whose names the file may override.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    pub server: ServerConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub chat: ChatConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub bind: String,
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
    /// Puts `PUT /update/{id}` behind the token gate with an owner check.
    #[serde(default)]
    pub protect_content_update: bool,
}

fn default_max_upload_bytes() -> usize {
    20 * 1024 * 1024
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    #[serde(default = "default_token_ttl_secs")]
    pub token_ttl_secs: u64,
    #[serde(default = "default_secret_env")]
    pub secret_env: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_ttl_secs: default_token_ttl_secs(),
            secret_env: default_secret_env(),
        }
    }
}

fn default_token_ttl_secs() -> u64 {
    5 * 60 * 60
}
fn default_secret_env() -> String {
    "JWT_SECRET".to_string()
}

const MIN_SECRET_LEN: usize = 16;

impl AuthConfig {
    /// Reads the signing secret from the configured environment variable.
    pub fn signing_secret(&self) -> Result<Vec<u8>> {
        let secret = std::env::var(&self.secret_env)
            .with_context(|| format!("{} not set", self.secret_env))?;
        if secret.len() < MIN_SECRET_LEN {
            bail!(
                "{} must be at least {} bytes long",
                self.secret_env,
                MIN_SECRET_LEN
            );
        }
        Ok(secret.into_bytes())
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct IngestConfig {
    #[serde(default = "default_true")]
    pub allow_docx: bool,
    /// External DOCX → PDF command. `{input}` and `{outdir}` are replaced
    /// with the scratch file and scratch directory. When unset, DOCX text
    /// is read straight from the OOXML package.
    #[serde(default)]
    pub docx_converter: Option<Vec<String>>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            allow_docx: true,
            docx_converter: None,
        }
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChatConfig {
    #[serde(default = "default_chat_provider")]
    pub provider: String,
    #[serde(default = "default_chat_model")]
    pub model: String,
    #[serde(default = "default_chat_api_base")]
    pub api_base: String,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_chat_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            provider: default_chat_provider(),
            model: default_chat_model(),
            api_base: default_chat_api_base(),
            api_key_env: default_api_key_env(),
            timeout_secs: default_chat_timeout_secs(),
        }
    }
}

fn default_chat_provider() -> String {
    "gemini".to_string()
}
fn default_chat_model() -> String {
    "gemini-1.5-flash-latest".to_string()
}
fn default_chat_api_base() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}
fn default_api_key_env() -> String {
    "GOOGLE_API_KEY".to_string()
}
fn default_chat_timeout_secs() -> u64 {
    120
}

impl ChatConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

pub fn validate(config: &Config) -> Result<()> {
    if config.server.max_upload_bytes == 0 {
        bail!("server.max_upload_bytes must be > 0");
    }

    if config.auth.token_ttl_secs == 0 {
        bail!("auth.token_ttl_secs must be > 0");
    }

    if let Some(argv) = &config.ingest.docx_converter {
        if argv.is_empty() || argv[0].trim().is_empty() {
            bail!("ingest.docx_converter must name a command");
        }
        if !argv.iter().any(|a| a.contains("{input}")) {
            bail!("ingest.docx_converter must reference {{input}}");
        }
    }

    match config.chat.provider.as_str() {
        "disabled" | "gemini" => {}
        other => bail!(
            "Unknown chat provider: '{}'. Must be disabled or gemini.",
            other
        ),
    }

    Ok(())
}
