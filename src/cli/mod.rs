use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use crate::application::{LedgerError, LedgerService};
use crate::commands::{CommandPool, Dispatcher, Player, economy_commands};
use crate::config::EconomyConfig;
use crate::context::OpContext;
use crate::domain::format_cents;

/// dfeconomy - player balances for a game server
#[derive(Parser)]
#[command(name = "dfeconomy")]
#[command(about = "Per-player balance ledger with payments and rankings")]
#[command(version)]
pub struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Database file path (overrides the configuration)
    #[arg(short, long)]
    pub database: Option<PathBuf>,

    /// Log filter used when RUST_LOG is unset (overrides the configuration)
    #[arg(long)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create or migrate the database
    Init,

    /// Register a player the way the server does when they connect
    Join {
        /// Display name
        name: String,

        /// Player UUID (random if omitted)
        #[arg(long)]
        id: Option<String>,
    },

    /// Run one /economy command as a registered player
    Exec {
        /// Name of the player issuing the command
        #[arg(long = "as")]
        player: String,

        /// Command words, e.g. `pay Steve 10`
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        words: Vec<String>,
    },

    /// Read `<player> <command...>` lines from stdin and run them concurrently
    Shell,
}

impl Cli {
    fn load_config(&self) -> Result<EconomyConfig> {
        let mut config = match &self.config {
            Some(path) => EconomyConfig::load_file(path)
                .with_context(|| format!("Failed to load config from {:?}", path))?,
            None => EconomyConfig::default(),
        };
        if let Some(database) = &self.database {
            config.database_path = database.clone();
        }
        if let Some(level) = &self.log_level {
            config.log_level = level.clone();
        }
        Ok(config)
    }

    pub async fn run(self) -> Result<()> {
        let config = self.load_config()?;
        init_logging(&config.log_level);

        let service = Arc::new(LedgerService::init(&config).await?);
        tracing::debug!(database = %config.database_path.display(), "ledger opened");

        let result = match self.command {
            Commands::Init => {
                println!("Database initialized: {}", config.database_path.display());
                Ok(())
            }
            Commands::Join { name, id } => run_join_command(&service, &config, &name, id).await,
            Commands::Exec { player, words } => {
                run_exec_command(Arc::clone(&service), &config, &player, &words.join(" ")).await
            }
            Commands::Shell => run_shell_command(Arc::clone(&service), &config).await,
        };

        service.close().await;
        result
    }
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    // Logs go to stderr so chat replies on stdout stay clean
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

async fn run_join_command(
    service: &LedgerService,
    config: &EconomyConfig,
    name: &str,
    id: Option<String>,
) -> Result<()> {
    let id = match id {
        Some(id) => Uuid::parse_str(&id).context("Invalid player UUID")?,
        None => Uuid::new_v4(),
    };
    let ctx = OpContext::with_timeout(config.command_timeout());

    if service.register_if_absent(&ctx, id, name).await? {
        println!(
            "Registered {} ({}) with balance {}",
            name,
            id,
            format_cents(service.default_balance())
        );
    } else {
        let balance = service.get_balance(&ctx, id).await?;
        println!(
            "{} ({}) already has an account, balance {}",
            name,
            id,
            format_cents(balance)
        );
    }
    Ok(())
}

async fn resolve_player(
    service: &LedgerService,
    config: &EconomyConfig,
    name: &str,
) -> Result<Player> {
    let ctx = OpContext::with_timeout(config.command_timeout());
    match service.lookup_identity_by_name(&ctx, name).await {
        Ok(id) => Ok(Player::new(id, name)),
        Err(LedgerError::UnknownPlayer(_)) => {
            bail!("Player '{}' is not registered; run `dfeconomy join {}` first", name, name)
        }
        Err(e) => Err(e.into()),
    }
}

fn build_pool(service: Arc<LedgerService>, config: &EconomyConfig) -> CommandPool {
    let dispatcher = Arc::new(Dispatcher::new(economy_commands(service, config)));
    CommandPool::from_config(dispatcher, config)
}

async fn run_exec_command(
    service: Arc<LedgerService>,
    config: &EconomyConfig,
    player_name: &str,
    line: &str,
) -> Result<()> {
    let player = resolve_player(&service, config, player_name).await?;
    let pool = build_pool(service, config);

    let replies = pool
        .submit(player, line)
        .await
        .context("Command task failed")?;
    for reply in replies {
        println!("{}", reply);
    }

    pool.drain().await;
    Ok(())
}

async fn run_shell_command(service: Arc<LedgerService>, config: &EconomyConfig) -> Result<()> {
    let pool = build_pool(Arc::clone(&service), config);
    let mut players: HashMap<String, Player> = HashMap::new();
    let mut printers = Vec::new();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((name, command)) = line.split_once(char::is_whitespace) else {
            eprintln!("expected `<player> <command...>`, got: {}", line);
            continue;
        };

        let player = match players.get(name) {
            Some(player) => player.clone(),
            None => match resolve_player(&service, config, name).await {
                Ok(player) => {
                    players.insert(name.to_string(), player.clone());
                    player
                }
                Err(e) => {
                    eprintln!("{:#}", e);
                    continue;
                }
            },
        };

        let handle = pool.submit(player, command);
        let name = name.to_string();
        printers.push(tokio::spawn(async move {
            match handle.await {
                Ok(replies) => {
                    for reply in replies {
                        println!("{} {}", name, reply);
                    }
                }
                Err(e) => eprintln!("{} command task failed: {}", name, e),
            }
        }));
    }

    pool.drain().await;
    for printer in printers {
        let _ = printer.await;
    }
    Ok(())
}
