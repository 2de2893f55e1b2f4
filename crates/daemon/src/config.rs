//! Daemon settings, read once from the environment

use anyhow::{Context, Result};
use courier_api_rpc::RpcServerConfig;
use courier_api_ws::WsServerConfig;
use courier_core::domain::QueueConfig;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Settings {
    pub ws: WsServerConfig,
    pub rpc: RpcServerConfig,
    pub queue: QueueConfig,
    pub shutdown_grace: Duration,
    /// `token:user_id,...` for the development token table
    pub dev_tokens: String,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from any key lookup (tests pass a map)
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let ws_defaults = WsServerConfig::default();
        let rpc_defaults = RpcServerConfig::default();
        let queue_defaults = QueueConfig::default();

        let ws = WsServerConfig {
            host: lookup("COURIER_WS_HOST").unwrap_or(ws_defaults.host),
            port: parse(&lookup, "COURIER_WS_PORT", ws_defaults.port)?,
        };

        let rpc = RpcServerConfig {
            host: lookup("COURIER_RPC_HOST").unwrap_or(rpc_defaults.host),
            port: parse(&lookup, "COURIER_RPC_PORT", rpc_defaults.port)?,
            rate_limit_burst: parse(&lookup, "COURIER_RATE_LIMIT_BURST", rpc_defaults.rate_limit_burst)?,
            rate_limit_rate: parse(&lookup, "COURIER_RATE_LIMIT_RATE", rpc_defaults.rate_limit_rate)?,
        };

        let queue = QueueConfig {
            worker_count: parse(&lookup, "COURIER_QUEUE_WORKERS", queue_defaults.worker_count)?,
            capacity: parse(&lookup, "COURIER_QUEUE_CAPACITY", queue_defaults.capacity)?,
            retry_limit: parse(&lookup, "COURIER_QUEUE_RETRY_LIMIT", queue_defaults.retry_limit)?,
            retry_delay: Duration::from_millis(parse(
                &lookup,
                "COURIER_QUEUE_RETRY_DELAY_MS",
                queue_defaults.retry_delay.as_millis() as u64,
            )?),
        };

        Ok(Self {
            ws,
            rpc,
            queue,
            shutdown_grace: Duration::from_millis(parse(&lookup, "COURIER_SHUTDOWN_GRACE_MS", 5000u64)?),
            dev_tokens: lookup("COURIER_DEV_TOKENS").unwrap_or_default(),
        })
    }
}

fn parse<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} has an invalid value: {:?}", key, raw)),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::from_lookup(lookup(&[])).unwrap();
        assert_eq!(settings.ws.port, 8080);
        assert_eq!(settings.rpc.port, 9527);
        assert_eq!(settings.queue, QueueConfig::default());
        assert_eq!(settings.shutdown_grace, Duration::from_secs(5));
        assert!(settings.dev_tokens.is_empty());
    }

    #[test]
    fn test_overrides() {
        let settings = Settings::from_lookup(lookup(&[
            ("COURIER_WS_PORT", "9000"),
            ("COURIER_QUEUE_WORKERS", "8"),
            ("COURIER_QUEUE_RETRY_DELAY_MS", "250"),
            ("COURIER_DEV_TOKENS", "alice:1"),
        ]))
        .unwrap();
        assert_eq!(settings.ws.port, 9000);
        assert_eq!(settings.queue.worker_count, 8);
        assert_eq!(settings.queue.retry_delay, Duration::from_millis(250));
        assert_eq!(settings.dev_tokens, "alice:1");
    }

    #[test]
    fn test_invalid_value_is_an_error() {
        let err = Settings::from_lookup(lookup(&[("COURIER_RPC_PORT", "not-a-port")])).unwrap_err();
        assert!(err.to_string().contains("COURIER_RPC_PORT"));
    }
}
