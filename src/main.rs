//! Faultline - fault-injection harness for JSON-RPC Ethereum nodes
//!
//! Sends deliberately malformed, conflicting and boundary-case requests and
//! transactions to a node and records every exchange to a plain-text report.

use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};

mod chain;
mod config;
mod contract;
mod error;
mod metrics;
mod report;
mod rpc;
mod scenario;
mod suite;
#[cfg(test)]
mod testing;
mod tx;

use chain::ChainProvider;
use config::Settings;
use report::{ReportSink, Reporter, WriterSink};
use suite::RunContext;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    init_logging();

    info!("Starting Faultline v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let settings = Settings::load()?;
    let network = settings.network()?;
    info!(
        "Loaded configuration for network {} ({})",
        settings.harness.network, network.rpc_url
    );
    if let Some(node_type) = &network.local_node_type {
        info!("Target is a local {} node", node_type);
    }

    // Readiness probe; an unreachable node aborts the run
    let provider = ChainProvider::new(&network.rpc_url, settings.harness.rpc_timeout())?;
    provider.ensure_ready(network.chain_id).await?;

    let sink: Arc<dyn ReportSink> = match &settings.report.path {
        Some(path) => Arc::new(
            WriterSink::file(path).with_context(|| format!("Failed to open report {:?}", path))?,
        ),
        None => Arc::new(WriterSink::stdout()),
    };
    let reporter = Reporter::new(sink, settings.harness.max_logged_request_len);

    let ctx = RunContext::from_settings(&settings, Arc::new(provider), reporter)?;
    info!("Sending from {:?} on chain {}", ctx.from(), ctx.chain_id);

    let run_id = uuid::Uuid::new_v4().to_string();
    let started = chrono::Utc::now();
    ctx.reporter
        .header(&run_id, &settings.harness.network, &started.to_rfc3339())?;
    info!(run_id = %run_id, "Run started");

    let result = tokio::select! {
        result = suite::run_tests(&ctx, &settings.harness.tests) => Some(result),
        _ = shutdown_signal() => None,
    };

    if let Some(path) = &settings.report.metrics_textfile {
        if let Err(e) = metrics::write_textfile(path) {
            warn!("Failed to write metrics: {}", e);
        }
    }

    let elapsed = chrono::Utc::now() - started;
    match result {
        Some(Ok(summary)) => {
            info!(
                run_id = %run_id,
                total = summary.total(),
                outcomes = ?summary.outcomes,
                skipped = ?summary.skipped,
                elapsed_ms = elapsed.num_milliseconds(),
                "Run complete"
            );
            Ok(())
        }
        Some(Err(e)) => {
            error!(run_id = %run_id, "Run aborted: {}", e);
            Err(e.into())
        }
        None => {
            warn!(run_id = %run_id, "Interrupted, stopping");
            Ok(())
        }
    }
}

fn init_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("info,faultline=debug,hyper=warn,reqwest=warn")
    });

    // Report lines own stdout
    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(true),
        )
        .init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
