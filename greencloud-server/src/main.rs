use std::path::PathBuf;

use anyhow::Context;
use clap::{Args as ClapArgs, Parser, Subcommand};
use greencloud_config::{Config, ConfigLoad, ConfigLoader, ConfigLoaderOptions};
use greencloud_server::infra::startup::{
    build_state, connect_postgres, init_tracing, log_config_warnings,
    run_migrations, serve,
};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "app", version)]
#[command(about = "GreenCloud authentication server")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    #[command(flatten)]
    serve: ServeArgs,
}

#[derive(ClapArgs, Debug, Clone)]
struct ServeArgs {
    /// Path to a greencloud.toml configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Path to a .env file (defaults to ./.env)
    #[arg(long, global = true)]
    env_file: Option<PathBuf>,

    /// Server port (overrides config)
    #[arg(short, long, global = true)]
    port: Option<u16>,

    /// Server host (overrides config)
    #[arg(long, global = true)]
    host: Option<String>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP server (default)
    Serve,
    #[command(subcommand)]
    Db(DbCommand),
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Debug, Subcommand)]
enum DbCommand {
    /// Apply database migrations and exit
    Migrate,
}

#[derive(Debug, Subcommand)]
enum ConfigCommand {
    /// Load and validate configuration, print warnings, and exit
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        None | Some(Command::Serve) => run_server(&cli.serve).await,
        Some(Command::Db(DbCommand::Migrate)) => run_db_migrate(&cli.serve).await,
        Some(Command::Config(ConfigCommand::Check)) => {
            let config = load_config(&cli.serve)?;
            info!(
                bind = %config.server.bind_address(),
                dev_mode = config.dev_mode,
                redis = config.redis.is_some(),
                config_file = ?config.metadata.config_path,
                "configuration is valid"
            );
            Ok(())
        }
    }
}

fn load_config(args: &ServeArgs) -> anyhow::Result<Config> {
    let loader = ConfigLoader::with_options(ConfigLoaderOptions {
        config_path: args.config.clone(),
        env_file: args.env_file.clone(),
    });
    let loaded = loader.load();

    init_tracing();

    let ConfigLoad {
        mut config,
        warnings,
    } = loaded.context("failed to load configuration")?;

    if config.metadata.env_file_loaded {
        info!("loaded .env file");
    }
    log_config_warnings(&warnings);

    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(host) = args.host.clone() {
        config.server.host = host;
    }

    Ok(config)
}

async fn run_db_migrate(args: &ServeArgs) -> anyhow::Result<()> {
    let config = load_config(args)?;
    let pool = connect_postgres(&config).await?;
    run_migrations(&pool).await?;
    Ok(())
}

async fn run_server(args: &ServeArgs) -> anyhow::Result<()> {
    let config = load_config(args)?;

    let pool = connect_postgres(&config).await?;
    run_migrations(&pool).await?;

    let state = build_state(&config, pool).await?;
    serve(&config, state).await
}
