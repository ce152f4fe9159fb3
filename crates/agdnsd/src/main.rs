// # agdnsd - AdGuard Home external-dns webhook daemon
//
// This is a THIN integration layer:
// - DO NOT add rule or record logic here; it lives in agdns-core
// - Configuration is via environment variables ONLY
//
// The agdnsd daemon is responsible for:
// 1. Reading configuration from environment variables
// 2. Initializing logging and the runtime
// 3. Connecting to AdGuard Home
// 4. Serving the webhook until SIGTERM/SIGINT
//
// ## Configuration
//
// ### AdGuard Home
// - `ADGUARD_HOME_URL`: Base URL, e.g. `http://adguard:3000`
// - `ADGUARD_HOME_USER` / `ADGUARD_HOME_PASS`: Basic auth credentials
// - `ADGUARD_HOME_MANAGED_BY_REF`: Optional tag reference (one per external-dns instance)
//
// ### Records
// - `DOMAIN_FILTER`: Comma-separated zones to report
// - `EXCLUDE_DOMAINS`: Comma-separated zones to hide
// - `DRY_RUN`: Read rules but never write them
//
// ### Daemon
// - `LOG_LEVEL`: trace, debug, info (default), warn, error
// - `LOG_FORMAT`: text (default) or json
// - `LISTEN_ADDR`: Webhook listen address (default `0.0.0.0:8888`)
//
// ## Example
//
// ```bash
// export ADGUARD_HOME_URL=http://adguard.local:3000
// export ADGUARD_HOME_USER=admin
// export ADGUARD_HOME_PASS=secret
// export DOMAIN_FILTER=home.example.com
//
// agdnsd
// ```

use agdns_adguard::AdGuardHomeClient;
use agdns_core::{ProviderConfig, Reconciler};
use anyhow::Result;
use std::env;
use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{Level, error, info};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

const ENV_LOG_LEVEL: &str = "LOG_LEVEL";
const ENV_LOG_FORMAT: &str = "LOG_FORMAT";
const ENV_LISTEN_ADDR: &str = "LISTEN_ADDR";

const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8888";

/// Upper bound for draining in-flight requests after a shutdown signal
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum AgdnsExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<AgdnsExitCode> for ExitCode {
    fn from(code: AgdnsExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LogFormat {
    Text,
    Json,
}

/// Daemon configuration
#[derive(Debug)]
struct Config {
    provider: ProviderConfig,
    log_level: Level,
    log_format: LogFormat,
    listen_addr: SocketAddr,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load and validate configuration through a variable lookup
    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let provider = ProviderConfig::from_lookup(&lookup)?;

        let log_level = lookup(ENV_LOG_LEVEL).unwrap_or_else(|| "info".to_string());
        let log_level = match log_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => anyhow::bail!(
                "{ENV_LOG_LEVEL} '{log_level}' is not valid. \
                Valid levels: trace, debug, info, warn, error"
            ),
        };

        let log_format = lookup(ENV_LOG_FORMAT).unwrap_or_else(|| "text".to_string());
        let log_format = match log_format.to_lowercase().as_str() {
            "text" => LogFormat::Text,
            "json" => LogFormat::Json,
            _ => anyhow::bail!(
                "{ENV_LOG_FORMAT} '{log_format}' is not valid. Valid formats: text, json"
            ),
        };

        let listen_addr =
            lookup(ENV_LISTEN_ADDR).unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_string());
        let listen_addr = listen_addr.parse().map_err(|e| {
            anyhow::anyhow!("{ENV_LISTEN_ADDR} '{listen_addr}' is not a socket address: {e}")
        })?;

        Ok(Self {
            provider,
            log_level,
            log_format,
            listen_addr,
        })
    }
}

fn init_tracing(config: &Config) -> Result<()> {
    let builder = FmtSubscriber::builder().with_max_level(config.log_level);
    match config.log_format {
        LogFormat::Text => tracing::subscriber::set_global_default(builder.finish())?,
        LogFormat::Json => tracing::subscriber::set_global_default(builder.json().finish())?,
    }
    Ok(())
}

fn main() -> ExitCode {
    // Load configuration from environment
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return AgdnsExitCode::ConfigError.into();
        }
    };

    if let Err(e) = init_tracing(&config) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return AgdnsExitCode::ConfigError.into();
    }

    info!("Starting agdnsd daemon");
    info!(config = ?config.provider, "Configuration loaded");

    // Enter tokio runtime
    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return AgdnsExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        let client = match AdGuardHomeClient::connect(&config.provider).await {
            Ok(client) => client,
            Err(e) => {
                error!("Failed to connect to AdGuard Home: {}", e);
                return AgdnsExitCode::ConfigError;
            }
        };

        if let Err(e) = run_daemon(config, client).await {
            error!("Daemon error: {}", e);
            AgdnsExitCode::RuntimeError
        } else {
            AgdnsExitCode::CleanShutdown
        }
    });

    result.into()
}

/// Serve the webhook until a shutdown signal arrives
async fn run_daemon(config: Config, client: AdGuardHomeClient) -> Result<()> {
    let reconciler = Reconciler::new(
        Box::new(client),
        config.provider.managed_by(),
        config.provider.domain_filter.clone(),
    );
    info!(managed_by = %reconciler.managed_by(), "Reconciler ready");

    let app = agdns_webhook::router(Arc::new(reconciler));
    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind {}: {}", config.listen_addr, e))?;
    info!(addr = %config.listen_addr, "Webhook listening");

    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
    let server = axum::serve(listener, app).with_graceful_shutdown(async move {
        let _ = stop_rx.await;
    });
    let mut server = tokio::spawn(async move { server.await });

    tokio::select! {
        result = &mut server => {
            result??;
            anyhow::bail!("Webhook server stopped unexpectedly");
        }
        signal = wait_for_shutdown() => {
            info!("Received shutdown signal: {}", signal?);
        }
    }

    info!("Shutting down daemon");
    let _ = stop_tx.send(());

    match tokio::time::timeout(SHUTDOWN_TIMEOUT, server).await {
        Ok(result) => result??,
        Err(_) => anyhow::bail!("Shutdown timeout after {:?}", SHUTDOWN_TIMEOUT),
    }

    Ok(())
}

/// Wait for shutdown signals (SIGTERM, SIGINT)
///
/// # Returns
///
/// Returns the name of the signal received.
#[cfg(unix)]
async fn wait_for_shutdown() -> Result<&'static str> {
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;

    Ok(tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    })
}

/// Wait for shutdown signals (SIGINT only)
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
async fn wait_for_shutdown() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to wait for CTRL-C: {}", e))?;
    Ok("SIGINT")
}
