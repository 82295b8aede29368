//! # docvault CLI
//!
//! ```bash
//! docvault --config ./config/docvault.toml <command>
//! ```
//!
//! | Command | Description |
//! |---------|-------------|
//! | `docvault init` | Create the SQLite database and schema |
//! | `docvault serve` | Start the HTTP server |
//! | `docvault check-config` | Load and validate the config, print a summary |
//!
//! Secrets come from the environment (or a `.env` file in the working
//! directory): `JWT_SECRET` signs tokens, `GOOGLE_API_KEY` authorizes chat.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use docvault::{config, db, logging, migrate, server};

/// docvault: a multi-user document vault with text search and chat.
#[derive(Parser)]
#[command(name = "docvault", version)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/docvault.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite file and the users/documents tables. Safe to run
    /// more than once.
    Init,

    /// Start the HTTP server on `[server].bind`.
    Serve,

    /// Validate the configuration file and print the effective settings.
    CheckConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    logging::init_tracing();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            let pool = db::connect(&cfg).await?;
            migrate::run_migrations(&pool).await?;
            println!("Database initialized successfully.");
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
        Commands::CheckConfig => {
            println!("Config OK: {}", cli.config.display());
            println!("  db.path:                  {}", cfg.db.path.display());
            println!("  server.bind:              {}", cfg.server.bind);
            println!("  server.max_upload_bytes:  {}", cfg.server.max_upload_bytes);
            println!(
                "  server.protect_content_update: {}",
                cfg.server.protect_content_update
            );
            println!("  auth.token_ttl_secs:      {}", cfg.auth.token_ttl_secs);
            println!(
                "  auth.secret_env:          {} ({})",
                cfg.auth.secret_env,
                if std::env::var_os(&cfg.auth.secret_env).is_some() {
                    "set"
                } else {
                    "not set"
                }
            );
            println!("  ingest.allow_docx:        {}", cfg.ingest.allow_docx);
            match &cfg.ingest.docx_converter {
                Some(argv) => println!("  ingest.docx_converter:    {}", argv.join(" ")),
                None => println!("  ingest.docx_converter:    (built-in OOXML reader)"),
            }
            if cfg.chat.is_enabled() {
                println!(
                    "  chat:                     {} / {}",
                    cfg.chat.provider, cfg.chat.model
                );
            } else {
                println!("  chat:                     disabled");
            }
        }
    }

    Ok(())
}
