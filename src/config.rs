//! Configuration loader for the `pondwatch` alert service.
//!
//! This module centralizes all runtime configuration values and their defaults,
//! loading from environment variables (with optional `.env` file support
//! provided by the caller). Nothing else in the crate reads the environment.
//!
use std::env;
use std::time::Duration;

use anyhow::{anyhow, bail, Result};

use crate::dispatcher::DispatchConfig;
use crate::feed::FeedMode;
use crate::worker::WorkerConfig;

/// Parse an optional variable with a default value.
macro_rules! parse_env {
    ($lookup:expr, $var_name:expr, $ty:ty, $default:expr) => {
        $lookup($var_name)
            .map(|v| v.trim().parse::<$ty>())
            .transpose()
            .map_err(|e| anyhow!("Invalid {}: {}", $var_name, e))?
            .unwrap_or($default)
    };
}

/// Parse a required string variable.
macro_rules! require_env {
    ($lookup:expr, $var_name:expr) => {
        $lookup($var_name)
            .ok_or_else(|| anyhow!("{} must be set in .env or environment", $var_name))?
    };
}

/// Where recipient tokens come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecipientSource {
    /// HTTP directory service listing users.
    Url(String),
    /// Fixed list from `RECIPIENT_TOKENS`.
    Static(Vec<String>),
}

/// Strongly typed application configuration.
///
/// All fields are immutable after loading, ensuring a consistent configuration
/// snapshot for the lifetime of the application.
#[derive(Debug, Clone)]
pub struct Config {
    // ---
    /// Port the HTTP listener binds to.
    pub port: u16,

    /// Push gateway endpoint for multicast sends.
    pub push_gateway_url: String,

    /// Bearer key for the push gateway, if it needs one.
    pub push_api_key: Option<String>,

    pub recipients: RecipientSource,

    pub dispatch: DispatchConfig,

    pub feed_mode: FeedMode,

    pub worker: WorkerConfig,
}

/// Load configuration from environment variables with defaults.
///
/// Required:
/// - `PUSH_GATEWAY_URL` – push gateway endpoint
///
/// Optional:
/// - `PORT` – listen port (default: 8080)
/// - `PUSH_API_KEY` – bearer key for the gateway
/// - `RECIPIENTS_URL` – recipient directory endpoint; when unset
///   `RECIPIENT_TOKENS` (comma separated) is used
/// - `DISPATCH_BATCH_SIZE` – addresses per transport call (default: 500)
/// - `DISPATCH_MAX_ATTEMPTS` – attempts per batch (default: 3)
/// - `DISPATCH_RETRY_DELAY_MS` – delay between attempts (default: 3000)
/// - `DISPATCH_RETRY_JITTER_MS` – extra random delay, up to (default: 0)
/// - `DISPATCH_TIMEOUT_MS` – per-call timeout (default: 10000)
/// - `FEED_MODE` – `all` or `latest` (default: all)
/// - `WORKER_CONCURRENCY` – pipeline runs in flight (default: 8)
/// - `WORKER_QUEUE_CAPACITY` – queued readings before submitters wait (default: 256)
///
/// Returns an error if any required variable is missing or invalid.
pub fn load_from_env() -> Result<Config> {
    // ---
    load_with(|name| env::var(name).ok())
}

/// Same as [`load_from_env`], reading variables through `lookup`.
pub fn load_with(lookup: impl Fn(&str) -> Option<String>) -> Result<Config> {
    // ---
    let push_gateway_url = require_env!(lookup, "PUSH_GATEWAY_URL");
    let push_api_key = lookup("PUSH_API_KEY").filter(|k| !k.is_empty());
    let port = parse_env!(lookup, "PORT", u16, 8080);

    let recipients = match lookup("RECIPIENTS_URL").filter(|u| !u.is_empty()) {
        Some(url) => RecipientSource::Url(url),
        None => RecipientSource::Static(parse_token_list(
            &lookup("RECIPIENT_TOKENS").unwrap_or_default(),
        )),
    };

    let defaults = DispatchConfig::default();
    let dispatch = DispatchConfig {
        batch_size: parse_env!(lookup, "DISPATCH_BATCH_SIZE", usize, defaults.batch_size),
        max_attempts: parse_env!(lookup, "DISPATCH_MAX_ATTEMPTS", u32, defaults.max_attempts),
        retry_delay: Duration::from_millis(parse_env!(
            lookup,
            "DISPATCH_RETRY_DELAY_MS",
            u64,
            defaults.retry_delay.as_millis() as u64
        )),
        retry_jitter: Duration::from_millis(parse_env!(
            lookup,
            "DISPATCH_RETRY_JITTER_MS",
            u64,
            defaults.retry_jitter.as_millis() as u64
        )),
        call_timeout: Duration::from_millis(parse_env!(
            lookup,
            "DISPATCH_TIMEOUT_MS",
            u64,
            defaults.call_timeout.as_millis() as u64
        )),
    };

    let feed_mode = match lookup("FEED_MODE") {
        Some(v) => v.parse::<FeedMode>().map_err(|e| anyhow!("Invalid FEED_MODE: {}", e))?,
        None => FeedMode::default(),
    };

    let worker_defaults = WorkerConfig::default();
    let worker = WorkerConfig {
        concurrency: parse_env!(
            lookup,
            "WORKER_CONCURRENCY",
            usize,
            worker_defaults.concurrency
        ),
        queue_capacity: parse_env!(
            lookup,
            "WORKER_QUEUE_CAPACITY",
            usize,
            worker_defaults.queue_capacity
        ),
    };

    let cfg = Config {
        port,
        push_gateway_url,
        push_api_key,
        recipients,
        dispatch,
        feed_mode,
        worker,
    };
    cfg.validate()?;
    Ok(cfg)
}

fn parse_token_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(String::from)
        .collect()
}

impl Config {
    // ---
    fn validate(&self) -> Result<()> {
        // ---
        if self.dispatch.batch_size == 0 {
            bail!("DISPATCH_BATCH_SIZE must be greater than 0");
        }
        if self.dispatch.max_attempts == 0 {
            bail!("DISPATCH_MAX_ATTEMPTS must be greater than 0");
        }
        if self.dispatch.call_timeout.is_zero() {
            bail!("DISPATCH_TIMEOUT_MS must be greater than 0");
        }
        if self.worker.concurrency == 0 {
            bail!("WORKER_CONCURRENCY must be greater than 0");
        }
        if self.worker.queue_capacity == 0 {
            bail!("WORKER_QUEUE_CAPACITY must be greater than 0");
        }
        Ok(())
    }

    /// Log the loaded configuration for debugging purposes.
    ///
    /// Masks the push key and recipient tokens while showing every other
    /// configuration value that was loaded.
    pub fn log_config(&self) {
        // ---
        let masked_key = match &self.push_api_key {
            Some(key) => {
                let shown = key.chars().count().saturating_sub(8).min(4);
                let tail: String = key.chars().skip(key.chars().count() - shown).collect();
                format!("****{}", tail)
            }
            None => "<unset>".to_string(),
        };
        let recipients = match &self.recipients {
            RecipientSource::Url(url) => url.clone(),
            RecipientSource::Static(tokens) => format!("<{} static tokens>", tokens.len()),
        };

        tracing::info!("Configuration loaded:");
        tracing::info!("  PORT                     : {}", self.port);
        tracing::info!("  PUSH_GATEWAY_URL         : {}", self.push_gateway_url);
        tracing::info!("  PUSH_API_KEY             : {}", masked_key);
        tracing::info!("  RECIPIENTS               : {}", recipients);
        tracing::info!("  DISPATCH_BATCH_SIZE      : {}", self.dispatch.batch_size);
        tracing::info!("  DISPATCH_MAX_ATTEMPTS    : {}", self.dispatch.max_attempts);
        tracing::info!("  DISPATCH_RETRY_DELAY     : {:?}", self.dispatch.retry_delay);
        tracing::info!("  DISPATCH_RETRY_JITTER    : {:?}", self.dispatch.retry_jitter);
        tracing::info!("  DISPATCH_TIMEOUT         : {:?}", self.dispatch.call_timeout);
        tracing::info!("  FEED_MODE                : {:?}", self.feed_mode);
        tracing::info!("  WORKER_CONCURRENCY       : {}", self.worker.concurrency);
        tracing::info!("  WORKER_QUEUE_CAPACITY    : {}", self.worker.queue_capacity);
    }
}
