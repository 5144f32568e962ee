//! Runtime configuration for the bridge server.
//!
//! Every setting can come from an environment variable or the matching
//! command-line flag. Flags win over the environment.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Args;

use crate::consts::{
    DEFAULT_BIND_ADDR, DEFAULT_MAX_BODY_BYTES, DEFAULT_MAX_CONCURRENT_INVOCATIONS, DEFAULT_PORT,
    DEFAULT_QUEUE_TIMEOUT_MS, DEFAULT_REQUEST_TIMEOUT_MS, DEFAULT_SCRIPT_PATH,
};

/// Settings for one bridge process.
#[derive(Debug, Clone, Args)]
pub struct BridgeConfig {
    /// Port to listen on
    #[arg(long, env = "PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Address to bind
    #[arg(long, env = "BIND_ADDR", default_value = DEFAULT_BIND_ADDR)]
    pub bind_addr: String,

    /// Path to the answer engine
    #[arg(long, env = "SCRIPT_PATH", default_value = DEFAULT_SCRIPT_PATH)]
    pub script_path: PathBuf,

    /// Interpreter to run the engine with (e.g. python3). Unset runs it directly
    #[arg(long, env = "SCRIPT_INTERPRETER")]
    pub script_interpreter: Option<String>,

    /// Per-invocation timeout in milliseconds
    #[arg(long, env = "REQUEST_TIMEOUT_MS", default_value_t = DEFAULT_REQUEST_TIMEOUT_MS)]
    pub request_timeout_ms: u64,

    /// Maximum engine processes running at once
    #[arg(long, env = "MAX_CONCURRENT_INVOCATIONS", default_value_t = DEFAULT_MAX_CONCURRENT_INVOCATIONS)]
    pub max_concurrent_invocations: usize,

    /// How long a request may wait for a free slot (0 = reject immediately)
    #[arg(long, env = "QUEUE_TIMEOUT_MS", default_value_t = DEFAULT_QUEUE_TIMEOUT_MS)]
    pub queue_timeout_ms: u64,

    /// Maximum request body size in bytes
    #[arg(long, env = "MAX_BODY_BYTES", default_value_t = DEFAULT_MAX_BODY_BYTES)]
    pub max_body_bytes: usize,

    /// Include engine stderr in client error messages
    #[arg(long, env = "VERBOSE_ERRORS", default_value_t = false)]
    pub verbose_errors: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            script_path: PathBuf::from(DEFAULT_SCRIPT_PATH),
            script_interpreter: None,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            max_concurrent_invocations: DEFAULT_MAX_CONCURRENT_INVOCATIONS,
            queue_timeout_ms: DEFAULT_QUEUE_TIMEOUT_MS,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            verbose_errors: false,
        }
    }
}

impl BridgeConfig {
    /// Reject settings the server cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.max_concurrent_invocations == 0 {
            bail!("MAX_CONCURRENT_INVOCATIONS must be at least 1");
        }
        if self.request_timeout_ms == 0 {
            bail!("REQUEST_TIMEOUT_MS must be at least 1");
        }
        if self.max_body_bytes == 0 {
            bail!("MAX_BODY_BYTES must be at least 1");
        }
        if self.script_path.as_os_str().is_empty() {
            bail!("SCRIPT_PATH must not be empty");
        }
        Ok(())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.bind_addr, self.port)
            .parse()
            .with_context(|| format!("invalid bind address {}:{}", self.bind_addr, self.port))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn queue_timeout(&self) -> Duration {
        Duration::from_millis(self.queue_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        config: BridgeConfig,
    }

    fn parse(args: &[&str]) -> BridgeConfig {
        let mut argv = vec!["chatbridge"];
        argv.extend_from_slice(args);
        TestCli::try_parse_from(argv).unwrap().config
    }

    #[test]
    fn default_is_valid() {
        BridgeConfig::default().validate().unwrap();
    }

    #[test]
    fn flags_override_defaults() {
        let config = parse(&[
            "--port",
            "8081",
            "--script-path",
            "/opt/engine.py",
            "--script-interpreter",
            "python3",
            "--request-timeout-ms",
            "1500",
            "--max-concurrent-invocations",
            "2",
            "--verbose-errors",
        ]);
        assert_eq!(config.port, 8081);
        assert_eq!(config.script_path, PathBuf::from("/opt/engine.py"));
        assert_eq!(config.script_interpreter.as_deref(), Some("python3"));
        assert_eq!(config.request_timeout(), Duration::from_millis(1500));
        assert_eq!(config.max_concurrent_invocations, 2);
        assert!(config.verbose_errors);
    }

    #[test]
    fn zero_concurrency_rejected() {
        let config = BridgeConfig {
            max_concurrent_invocations: 0,
            ..BridgeConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("MAX_CONCURRENT_INVOCATIONS"));
    }

    #[test]
    fn zero_timeout_rejected() {
        let config = BridgeConfig {
            request_timeout_ms: 0,
            ..BridgeConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn socket_addr_combines_bind_and_port() {
        let config = BridgeConfig {
            bind_addr: "127.0.0.1".to_string(),
            port: 5050,
            ..BridgeConfig::default()
        };
        assert_eq!(config.socket_addr().unwrap().to_string(), "127.0.0.1:5050");
    }

    #[test]
    fn bad_bind_addr_is_an_error() {
        let config = BridgeConfig {
            bind_addr: "not an address".to_string(),
            ..BridgeConfig::default()
        };
        assert!(config.socket_addr().is_err());
    }
}
