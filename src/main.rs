//! ith - IRC to Discord private message bridge.

use anyhow::Context;
use clap::Parser;
use ith::config::{
    Config, LogConfig, LogLevel, Overrides, ServerAddress, parse_bool, validate,
};
use ith::hooks::HookCatalog;
use ith::supervisor::Supervisor;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Parser, Debug)]
#[command(name = "ith", version, about = "Relay IRC private messages to Discord and back")]
struct Cli {
    /// IRC nickname
    #[arg(short, long)]
    nickname: Option<String>,

    /// IRC server, as host:port or host/port
    #[arg(short, long)]
    address: Option<ServerAddress>,

    /// IRC username (defaults to the nickname)
    #[arg(short, long)]
    username: Option<String>,

    /// IRC server password
    #[arg(short, long)]
    password: Option<String>,

    /// Log level: DEBUG, INFO, WARNING, ERROR or CRITICAL
    #[arg(long)]
    level: Option<LogLevel>,

    /// Connect over TLS (yes/no)
    #[arg(long, value_parser = parse_bool)]
    ssl: Option<bool>,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory scanned for hook plugin manifests
    #[arg(long)]
    hooks_dir: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, default_value_t = false)]
    json_logs: bool,

    /// Discord bot token
    #[arg(long, env = "DISCORD_BOT_TOKEN", hide_env_values = true)]
    discord_token: Option<String>,

    /// Discord user id that receives forwarded messages
    #[arg(long, env = "MY_DISCORD_ID")]
    discord_admin_id: Option<u64>,
}

impl Cli {
    fn into_overrides(self) -> (Option<PathBuf>, Overrides) {
        let overrides = Overrides {
            nickname: self.nickname,
            address: self.address,
            username: self.username,
            password: self.password,
            tls: self.ssl,
            level: self.level,
            json_logs: self.json_logs,
            hooks_dir: self.hooks_dir,
            discord_token: self.discord_token,
            discord_admin_id: self.discord_admin_id,
        };
        (self.config, overrides)
    }
}

fn load_config(cli: Cli) -> anyhow::Result<Config> {
    let (path, overrides) = cli.into_overrides();
    let mut config = match path {
        Some(path) => Config::load(&path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => Config::default(),
    };
    config.apply(overrides);
    Ok(config)
}

fn init_telemetry(log: &LogConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log.level.directive()));

    if log.json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_target(true))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true))
            .init();
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = match load_config(cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("ith: {:#}", e);
            return ExitCode::FAILURE;
        }
    };
    init_telemetry(&config.log);

    if let Err(errors) = validate(&config) {
        for e in &errors {
            error!(error = %e, "Invalid configuration");
        }
        return ExitCode::FAILURE;
    }

    info!(
        version = env!("CARGO_PKG_VERSION"),
        address = %config.irc.address,
        port = config.irc.port,
        nick = %config.irc.nickname,
        "Starting ith"
    );

    let mut supervisor = Supervisor::new(config);
    if let Err(e) = supervisor.discover_hooks(&HookCatalog::builtin()) {
        error!(error = %e, "Failed to load hooks");
        return ExitCode::FAILURE;
    }

    let connected = match supervisor.connect().await {
        Ok(connected) => connected,
        Err(e) => {
            error!(error = %e, "Failed to connect to IRC");
            return ExitCode::FAILURE;
        }
    };

    let outcome = connected.run().await;
    ExitCode::from(outcome.exit_code())
}
