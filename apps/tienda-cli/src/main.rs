//! # Tienda CLI
//!
//! Terminal front end for the point of sale.
//!
//! ## Startup Sequence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. Initialize Logging (RUST_LOG, default "info")                      │
//! │  2. Load ClientConfig (tienda.toml + TIENDA_* overrides)                │
//! │  3. Read credentials (TIENDA_TOKEN, TIENDA_OPERATOR, TIENDA_ROLE)       │
//! │  4. Build HttpBackend, run the command                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `tienda demo` skips 2-4 and runs a scripted shift against the
//! in-memory backend.

mod commands;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use tienda_client::{ClientConfig, Credentials, HttpBackend, Role, TokenStore};

/// Tienda POS - cash drawer and checkout from the terminal
#[derive(Parser)]
#[command(name = "tienda")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Config file path (defaults to tienda.toml in the platform config dir)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Show the operator's cash session
    Status,

    /// Open the cash drawer with an opening amount
    Open { amount: String },

    /// Close the cash drawer with the counted amount
    Close { amount: String },

    /// List products
    Products {
        #[arg(short, long)]
        search: Option<String>,
    },

    /// List customers
    Customers {
        #[arg(short, long)]
        search: Option<String>,
    },

    /// Sell: one --product per unit, e.g. `--product p1 --product p1`
    Sell {
        #[arg(long)]
        customer: String,

        #[arg(long = "product", required = true)]
        products: Vec<String>,

        /// cash | transfer | card (efectivo, transferencia, tarjeta)
        #[arg(long, default_value = "cash")]
        payment: String,
    },

    /// Run a scripted shift against an in-memory store
    Demo,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let cli = Cli::parse();

    if matches!(cli.command, Command::Demo) {
        return commands::demo().await;
    }

    let config = ClientConfig::load(cli.config).context("loading configuration")?;
    debug!(base_url = %config.api.base_url, "Configuration loaded");

    let credentials = credentials_from_env()?;
    let operator_id = credentials.operator_id.clone();
    let role = credentials.role;

    let tokens = TokenStore::with_credentials(credentials);

    let backend = HttpBackend::new(&config, tokens).context("building HTTP client")?;
    info!(operator_id = %operator_id, "Tienda CLI ready");

    commands::run(cli.command, backend, &config, &operator_id, role).await
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tienda=debug,reqwest=warn"));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn credentials_from_env() -> Result<Credentials> {
    let token = std::env::var("TIENDA_TOKEN").context("TIENDA_TOKEN is not set; sign in first")?;
    let operator_id = std::env::var("TIENDA_OPERATOR").context("TIENDA_OPERATOR is not set")?;
    let role: Role = std::env::var("TIENDA_ROLE")
        .unwrap_or_else(|_| "ventas".to_string())
        .parse()?;

    Ok(Credentials {
        token,
        operator_id,
        role,
    })
}
