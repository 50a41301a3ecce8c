use clap::{Parser, Subcommand};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::mpsc;

use crewbot::application::errors::BotError;
use crewbot::application::messaging::{CommandParser, Dispatcher};
use crewbot::application::services::PluginService;
use crewbot::domain::entities::Sender;
use crewbot::domain::traits::{Bot, Store};
use crewbot::infrastructure::adapters::{ConsoleAdapter, TelegramAdapter};
use crewbot::infrastructure::config::Config;
use crewbot::infrastructure::database::Database;
use crewbot::plugins::builtin_plugins;

/// Chat id used for console sessions when no owner is configured
const CONSOLE_USER_ID: i64 = 1;

#[derive(Parser)]
#[command(name = "crewbot")]
#[command(about = "Team chat bot with role-gated plugin commands", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, default_value = "config.yaml")]
    config: String,

    /// Bot token (overrides config)
    #[arg(short, long)]
    token: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the bot
    Run,
    /// Show version
    Version,
    /// Generate default config
    InitConfig,
}

fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run => run_bot(&cli.config, cli.token),
        Commands::Version => {
            println!("crewbot v{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Commands::InitConfig => init_config(&cli.config),
    };

    if let Err(e) = result {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

fn load_config(config_path: &str, token_override: Option<String>) -> Config {
    let mut config = if Path::new(config_path).exists() {
        Config::load(config_path).unwrap_or_else(|e| {
            tracing::warn!("Failed to load config: {}, using defaults", e);
            Config::default()
        })
    } else {
        Config::default()
    };

    config.apply_env();
    if let Some(token) = token_override {
        config.telegram.token = Some(token);
    }
    config
}

fn run_bot(config_path: &str, token_override: Option<String>) -> Result<(), BotError> {
    let config = load_config(config_path, token_override);
    tracing::info!("Starting {}", config.bot.name);

    let db = Arc::new(Database::new(&config.bot.database)?);
    tracing::info!("Database initialized at {}", config.bot.database.display());

    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| BotError::Internal(format!("Failed to start runtime: {}", e)))?;

    rt.block_on(serve(&config, db))
}

async fn serve(config: &Config, db: Arc<Database>) -> Result<(), BotError> {
    for owner in &config.bot.owners {
        db.seed_owner(*owner).await?;
    }
    if !config.bot.owners.is_empty() {
        tracing::info!("Seeded {} owner(s)", config.bot.owners.len());
    }

    match config.telegram.token.clone() {
        Some(token) => run_telegram_bot(config, db, token).await,
        None => run_console_bot(config, db).await,
    }
}

async fn run_telegram_bot(config: &Config, db: Arc<Database>, token: String) -> Result<(), BotError> {
    let mut adapter = TelegramAdapter::new(token).with_debug(config.telegram.debug);
    adapter.fetch_bot_info().await?;

    let info = adapter.bot_info();
    tracing::info!("Bot started: @{}", info.username);

    let adapter = Arc::new(adapter);
    let service = Arc::new(PluginService::new(db, adapter.clone()));
    service.bootstrap(builtin_plugins()).await;

    if let Err(e) = adapter.set_commands(&service.commands().list()).await {
        tracing::warn!("Failed to register commands: {}", e);
    }

    let dispatcher = Arc::new(
        Dispatcher::new(service)
            .with_parser(CommandParser::new().with_bot_username(info.username))
            .with_options(config.dispatch_options()),
    );

    let (tx, rx) = mpsc::unbounded_channel();
    let poll_timeout = config.telegram.poll_timeout;
    let poller = tokio::spawn(async move { adapter.run_polling(tx, poll_timeout).await });

    tokio::select! {
        _ = dispatcher.run(rx) => {}
        _ = tokio::signal::ctrl_c() => tracing::info!("Shutting down"),
    }
    poller.abort();
    Ok(())
}

async fn run_console_bot(config: &Config, db: Arc<Database>) -> Result<(), BotError> {
    tracing::info!("No Telegram token configured, running on the console");

    let service = Arc::new(PluginService::new(db, Arc::new(ConsoleAdapter::new())));
    service.bootstrap(builtin_plugins()).await;

    let dispatcher = Arc::new(Dispatcher::new(service).with_options(config.dispatch_options()));

    let user_id = config.bot.owners.first().copied().unwrap_or(CONSOLE_USER_ID);
    let user = Sender::new(user_id).with_username("console");

    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(ConsoleAdapter::read_updates(user, tx));

    tokio::select! {
        _ = dispatcher.run(rx) => {}
        _ = tokio::signal::ctrl_c() => tracing::info!("Shutting down"),
    }
    Ok(())
}

fn init_config(path: &str) -> Result<(), BotError> {
    if Path::new(path).exists() {
        return Err(BotError::Internal(format!("{} already exists", path)));
    }

    let yaml = Config::default().to_yaml()?;
    std::fs::write(path, yaml)
        .map_err(|e| BotError::Internal(format!("Failed to write {}: {}", path, e)))?;

    println!("Wrote default config to {}", path);
    Ok(())
}
