//! Application entry point for the `pondwatch` alert service.
//!
//! This binary orchestrates the full startup sequence for the alert listener,
//! including:
//! - Loading configuration from environment variables or `.env`
//! - Initializing structured logging/tracing
//! - Building the push transport and recipient directory clients
//! - Spawning the bounded alert worker
//! - Mounting all routes via the `routes` gateway
//! - Binding the Axum HTTP server and serving requests
//!
//! # Environment Variables
//! - `PUSH_GATEWAY_URL` (**required**) – push gateway endpoint
//! - `RECIPIENTS_URL` / `RECIPIENT_TOKENS` (optional) – where recipients come from
//! - `AXUM_LOG_LEVEL` (optional) – log verbosity (default: `debug`)
//! - `AXUM_SPAN_EVENTS` (optional) – span event mode for tracing
//!
//! See `config` for the dispatch, feed and worker settings.
use std::{env, net::SocketAddr, sync::Arc};

use axum::Router;
use dotenvy::dotenv;
use is_terminal::IsTerminal;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;

use anyhow::Result;

use pondwatch::config::{self, RecipientSource};
use pondwatch::directory::{HttpRecipientDirectory, RecipientDirectory, StaticRecipientDirectory};
use pondwatch::dispatcher::Dispatcher;
use pondwatch::pipeline::Pipeline;
use pondwatch::routes;
use pondwatch::transport::HttpPushTransport;
use pondwatch::worker::AlertWorker;

// ---

#[tokio::main]
async fn main() -> Result<()> {
    // ---
    init_tracing();
    dotenv().ok();

    let cfg = config::load_from_env()?;
    cfg.log_config();

    let transport = HttpPushTransport::new(
        cfg.push_gateway_url.clone(),
        cfg.push_api_key.clone(),
        cfg.dispatch.call_timeout,
    )
    .map_err(|e| anyhow::anyhow!("Failed to build push transport: {}", e))?;

    let directory: Arc<dyn RecipientDirectory> = match &cfg.recipients {
        RecipientSource::Url(url) => {
            let client = reqwest::Client::builder()
                .timeout(cfg.dispatch.call_timeout)
                .build()?;
            Arc::new(HttpRecipientDirectory::new(client, url.clone()))
        }
        RecipientSource::Static(tokens) => {
            if tokens.is_empty() {
                tracing::warn!(
                    "No RECIPIENTS_URL or RECIPIENT_TOKENS set; alerts will have no recipients"
                );
            }
            Arc::new(StaticRecipientDirectory::new(tokens.iter().map(String::as_str)))
        }
    };

    let dispatcher = Dispatcher::new(Arc::new(transport), cfg.dispatch.clone());
    let pipeline = Arc::new(Pipeline::new(directory, dispatcher));
    let (worker, worker_task) = AlertWorker::spawn(pipeline, cfg.worker);

    // Build app from routes gateway
    let app: Router = routes::router(worker, cfg.clone());

    let addr = SocketAddr::from(([0, 0, 0, 0], cfg.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // The router held the last worker handle; wait for in-flight alerts.
    worker_task.await?;
    tracing::info!("Shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    // ---
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

// ---

/// Initialize the global tracing subscriber for structured logging.
///
/// This function configures the [`tracing_subscriber`] with:
/// - Log target, file, and line number output enabled
/// - Color output controlled by TTY detection and `FORCE_COLOR` env var:
///   - `FORCE_COLOR=1|true|yes`: force colors on
///   - `FORCE_COLOR=0|false|no`: force colors off
///   - unset or other values: auto-detect TTY
/// - Span event emission mode controlled by the `AXUM_SPAN_EVENTS` env var:
///   - `"full"`       : emit ENTER, EXIT, and CLOSE events with timing
///   - `"enter_exit"` : emit ENTER and EXIT only
///   - unset or other values: emit CLOSE events only (default)
/// - Log level controlled by the `AXUM_LOG_LEVEL` env var
///
/// Called once at startup before any logging macros are invoked.
fn init_tracing() {
    // ---
    let span_events = match env::var("AXUM_SPAN_EVENTS").as_deref() {
        Ok("full") => FmtSpan::FULL,
        Ok("enter_exit") => FmtSpan::ENTER | FmtSpan::EXIT,
        _ => FmtSpan::CLOSE,
    };

    // Determine if we should use colors
    let use_color = match env::var("FORCE_COLOR").as_deref() {
        Ok("1") | Ok("true") | Ok("yes") => true,
        Ok("0") | Ok("false") | Ok("no") => false,
        _ => std::io::stdout().is_terminal(),
    };

    // Use RUST_LOG if available, otherwise fall back to AXUM_LOG_LEVEL
    let env_filter = if env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        let level = match env::var("AXUM_LOG_LEVEL").ok().as_deref() {
            Some("trace") => "trace",
            Some("debug") => "debug",
            Some("info") => "info",
            Some("warn") => "warn",
            Some("error") => "error",
            _ => "debug",
        };
        EnvFilter::new(format!("{level},hyper=info,reqwest=info"))
    };

    tracing_subscriber::fmt()
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_span_events(span_events)
        .with_env_filter(env_filter)
        .with_ansi(use_color)
        .compact()
        .init();
}
