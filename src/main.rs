use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::net::TcpListener;
use tracing::{info, warn};

use chatbridge::bridge::Bridge;
use chatbridge::config::BridgeConfig;
use chatbridge::engine::script::{ScriptConfig, ScriptEngine};
use chatbridge::limiter::ConcurrencyLimiter;
use chatbridge::server::{self, AppState};

#[derive(Parser)]
#[command(
    name = "chatbridge",
    version,
    about = "Answers questions over HTTP by asking an external engine."
)]
struct Cli {
    #[command(flatten)]
    config: BridgeConfig,

    /// Emit logs as JSON lines
    #[arg(long, env = "LOG_JSON", default_value_t = false)]
    log_json: bool,
}

fn init_tracing(json: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let config = cli.config;
    config.validate()?;

    if !config.script_path.exists() {
        warn!(
            script = %config.script_path.display(),
            "answer engine not found yet, requests will fail until it exists"
        );
    }

    let engine = Arc::new(ScriptEngine::new(ScriptConfig::from(&config)));
    let limiter = ConcurrencyLimiter::new(config.max_concurrent_invocations, config.queue_timeout());
    let bridge = Arc::new(Bridge::new(engine, limiter));
    let state = AppState::new(bridge, config.verbose_errors, config.max_body_bytes);

    let addr = config.socket_addr()?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    info!(
        timeout_ms = config.request_timeout_ms,
        max_concurrent = config.max_concurrent_invocations,
        queue_timeout_ms = config.queue_timeout_ms,
        "starting chatbridge"
    );

    server::serve(listener, state, async {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutting down");
        }
    })
    .await
    .context("server error")?;

    Ok(())
}
