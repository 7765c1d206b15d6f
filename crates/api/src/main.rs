//! Aura credit oracle service.
//!
//! Runs the HTTP API together with the passport refresh scheduler, and
//! offers a few maintenance subcommands against the same database.

use anyhow::{Context, Result};
use aura_api::server::run_with_config;
use aura_core::types::ApiTier;
use aura_oracle::config::{Config, LoggingConfig};
use aura_oracle::context::AppContext;
use aura_oracle::storage::Storage;
use clap::{Parser, Subcommand};
use tracing::info;

#[derive(Parser)]
#[command(name = "aura-api")]
#[command(version, about = "Aura wallet trust and credit oracle", long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "aura.toml")]
    config: String,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the API and run the refresh scheduler
    Serve,

    /// Create the database and apply migrations
    InitDb {
        /// Database URL
        #[arg(long, default_value = "sqlite://aura.db")]
        database_url: String,
    },

    /// Print database statistics
    Status,

    /// Issue an API key
    CreateKey {
        /// Tier: free, pro or enterprise
        #[arg(long, default_value = "free")]
        tier: String,

        /// Owner of the key
        #[arg(long)]
        user_id: String,
    },

    /// Revoke an API key
    RevokeKey {
        /// Key to revoke
        key: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Commands::Serve);

    if let Commands::InitDb { database_url } = command {
        init_logging(cli.debug, &LoggingConfig::default())?;
        return init_database(&database_url).await;
    }

    let config = Config::from_file(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config))?;
    init_logging(cli.debug, &config.logging)?;

    info!("Aura oracle starting...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    match command {
        Commands::Serve => run_with_config(config).await?,
        Commands::Status => show_status(&config).await?,
        Commands::CreateKey { tier, user_id } => create_key(config, &tier, &user_id).await?,
        Commands::RevokeKey { key } => revoke_key(config, &key).await?,
        Commands::InitDb { .. } => {}
    }

    Ok(())
}

fn init_logging(debug: bool, logging: &LoggingConfig) -> Result<()> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let env_filter = if debug {
        EnvFilter::new("aura_api=debug,aura_oracle=debug,tower_http=debug,sqlx=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "aura_api={level},aura_oracle={level},tower_http={level}",
                level = logging.level
            ))
        })
    };

    let json = logging.format.eq_ignore_ascii_case("json");
    tracing_subscriber::registry()
        .with(env_filter)
        .with(json.then(|| fmt::layer().json().with_current_span(false)))
        .with((!json).then(|| fmt::layer().with_target(true).with_line_number(true)))
        .init();

    Ok(())
}

async fn init_database(database_url: &str) -> Result<()> {
    info!("Initializing database: {}", database_url);

    let storage = Storage::new(database_url)
        .await
        .context("Failed to connect to database")?;
    storage
        .run_migrations()
        .await
        .context("Failed to run migrations")?;
    storage
        .health_check()
        .await
        .context("Database health check failed")?;
    storage.close().await;

    info!("Database initialized");
    Ok(())
}

async fn show_status(config: &Config) -> Result<()> {
    let storage = Storage::connect(&config.database)
        .await
        .context("Failed to connect to database")?;
    let stats = storage.stats().await?;

    println!("Aura oracle status");
    println!("  Database:          {}", config.database.url);
    println!("  Passports:         {}", stats.passport_count);
    println!("  Active passports:  {}", stats.active_passport_count);
    println!("  Badges:            {}", stats.badge_count);
    println!("  API keys:          {}", stats.api_key_count);
    println!("  Events:            {}", stats.event_count);
    println!(
        "  Scheduler:         {} (every {}s, batch {})",
        if config.scheduler.enabled { "enabled" } else { "disabled" },
        config.scheduler.interval_secs,
        config.scheduler.batch_size
    );

    storage.close().await;
    Ok(())
}

async fn create_key(config: Config, tier: &str, user_id: &str) -> Result<()> {
    let tier: ApiTier = tier.parse()?;
    let (ctx, _recorder) = AppContext::build(config).await?;

    let record = ctx.gate.create_key(tier, user_id).await?;
    println!("{}", record.api_key);
    info!(
        "Created {} key for {} ({} requests)",
        record.tier, record.user_id, record.rate_limit
    );

    ctx.storage.close().await;
    Ok(())
}

async fn revoke_key(config: Config, key: &str) -> Result<()> {
    let (ctx, recorder) = AppContext::build(config).await?;
    let recorder = recorder.map(|recorder| tokio::spawn(recorder.run()));

    ctx.gate.revoke(key).await?;
    info!("API key revoked");

    // The recorder drains once the last sink clone is dropped.
    let storage = ctx.storage.clone();
    drop(ctx);
    if let Some(task) = recorder {
        task.await?;
    }

    storage.close().await;
    Ok(())
}
