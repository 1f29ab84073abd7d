// src/main.rs
use std::fs::File;
use std::net::SocketAddr;
use std::sync::Mutex;

use anyhow::Context;
use chrono::Duration;
use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use expense_tracker::backend::{self, AppState};
use expense_tracker::config::Config;
use expense_tracker::database::db::{connection, migrate};
use expense_tracker::{cli, IdentityVerifier};

#[derive(Parser, Debug)]
#[command(name = "expense-tracker", version, about = "Personal expense tracker")]
struct Cli {
    /// SQLite database URL (overrides DATABASE_URL)
    #[arg(long, global = true)]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP API
    Server {
        /// Listen address (overrides BIND_ADDR)
        #[arg(long)]
        bind: Option<SocketAddr>,
    },
    /// Open the terminal UI (default)
    Tui,
    /// Mint a development identity token
    Token {
        /// User id; a fresh one is generated when omitted
        user_id: Option<Uuid>,
        #[arg(long, default_value_t = 30)]
        days: i64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let args = Cli::parse();
    let mut config = Config::from_env()?;
    let bind = match &args.command {
        Some(Command::Server { bind }) => *bind,
        _ => None,
    };
    config.apply_overrides(args.database_url, bind);

    match args.command.unwrap_or(Command::Tui) {
        Command::Server { .. } => {
            init_tracing(&config.log_filter);
            let verifier = IdentityVerifier::new(config.jwt_secret()?.as_bytes());

            let pool = connection::get_db_pool(&config.database_url)
                .await
                .with_context(|| format!("cannot open {}", config.database_url))?;
            migrate::run_migrations(&pool).await?;

            backend::run_server(AppState::new(pool, verifier), config.bind_addr).await?;
        }
        Command::Tui => {
            // The terminal belongs to the UI; logs go to a file.
            let file = File::create(&config.log_file)
                .with_context(|| format!("cannot create {}", config.log_file.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(EnvFilter::new(&config.log_filter))
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .init();

            cli::run(&config).await?;
        }
        Command::Token { user_id, days } => {
            let verifier = IdentityVerifier::new(config.jwt_secret()?.as_bytes());
            let user_id = user_id.unwrap_or_else(Uuid::new_v4);
            let token = verifier.issue(user_id, Duration::days(days))?;
            eprintln!("user: {user_id}");
            println!("{token}");
        }
    }
    Ok(())
}

fn init_tracing(filter: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();
}
