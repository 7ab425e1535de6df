//! netmeshctl - NetMesh control plane CLI
//!
//! Runs network, access key and node operations against the local control
//! plane database, authorizing every call with the configured credential.

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use netmesh_common::ServerConfig;
use netmesh_control::{bearer_token, ControlPlane};
use std::path::PathBuf;
use tracing::debug;

mod commands;
mod output;

use commands::{key, network, node, user, Context};

/// NetMesh control plane CLI
#[derive(Parser)]
#[command(name = "netmeshctl")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file
    #[arg(long, global = true, env = "NETMESH_CONFIG")]
    config: Option<PathBuf>,

    /// Database path, overriding the configuration
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Operator secret or user token (a `Bearer <token>` value is accepted);
    /// defaults to the configured operator secret
    #[arg(long, global = true, env = "NETMESH_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Output format
    #[arg(long, default_value = "table", global = true)]
    format: output::OutputFormat,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage networks
    #[command(subcommand)]
    Network(network::NetworkCommands),

    /// Manage access keys
    #[command(subcommand)]
    Key(key::KeyCommands),

    /// Manage nodes
    #[command(subcommand)]
    Node(node::NodeCommands),

    /// Manage user tokens
    #[command(subcommand)]
    User(user::UserCommands),

    /// Write the effective configuration to the configuration file
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Show version information
    Version,
}

/// Turn the `--token` value into a raw credential
fn credential(token: Option<&str>, config: &ServerConfig) -> String {
    match token {
        Some(t) if t.contains(' ') => bearer_token(Some(t)).to_string(),
        Some(t) => t.to_string(),
        None => config.master_key.clone(),
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(netmesh_common::default_config_path);
    let mut config = ServerConfig::load(&config_path)
        .with_context(|| format!("failed to load {}", config_path.display()))?
        .apply_env();
    if let Some(db) = cli.db {
        config.db_path = db;
    }
    debug!("Using configuration {:?}, database {:?}", config_path, config.db_path);

    let command = match cli.command {
        Commands::Version => {
            println!("netmeshctl v{}", netmesh_common::VERSION);
            return Ok(());
        }
        Commands::InitConfig { force } => {
            if config_path.exists() && !force {
                anyhow::bail!(
                    "{} already exists (use --force to overwrite)",
                    config_path.display()
                );
            }
            config.save(&config_path)?;
            output::print_success(&format!("Wrote {}", config_path.display()));
            return Ok(());
        }
        other => other,
    };

    let plane = ControlPlane::open(&config).context("failed to open control plane")?;
    let ctx = Context {
        credential: credential(cli.token.as_deref(), &config),
        plane,
        format: cli.format,
    };

    let result = match command {
        Commands::Network(cmd) => network::execute(cmd, &ctx).await,
        Commands::Key(cmd) => key::execute(cmd, &ctx).await,
        Commands::Node(cmd) => node::execute(cmd, &ctx).await,
        Commands::User(cmd) => user::execute(cmd, &ctx).await,
        Commands::InitConfig { .. } | Commands::Version => Ok(()),
    };

    ctx.plane.shutdown()?;
    result
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.debug { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli).await {
        output::print_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}
