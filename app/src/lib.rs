//! Lendscope application library

pub mod poller;

use std::path::PathBuf;

use anyhow::Context;
use lendscope_api::AppState;
use lendscope_core::AppConfig;
use tracing_subscriber::EnvFilter;

/// Log directives added on top of `RUST_LOG`, one per workspace crate
pub const DEFAULT_LOG_DIRECTIVES: &[&str] = &[
    "lendscope=debug",
    "lendscope_lib=debug",
    "lendscope_api=debug",
    "lendscope_core=debug",
    "loan_auction=debug",
    "stacks_node_client=debug",
    "clarity_codec=debug",
    "info",
];

/// Config path from the first CLI argument, else from `LENDSCOPE_CONFIG`
fn config_path() -> Option<PathBuf> {
    std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .or_else(AppConfig::path_from_env)
}

fn log_filter() -> anyhow::Result<EnvFilter> {
    let mut filter = EnvFilter::from_default_env();
    for directive in DEFAULT_LOG_DIRECTIVES {
        filter = filter.add_directive(directive.parse()?);
    }
    Ok(filter)
}

/// Run the poller and API server until Ctrl-C
pub fn run() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter(log_filter()?).init();

    let path = config_path();
    let config = AppConfig::load(path.as_deref()).with_context(|| match &path {
        Some(p) => format!("loading config from {}", p.display()),
        None => "loading default config".to_string(),
    })?;

    tracing::info!(
        node = %config.node.url,
        network = %config.network,
        contract = %config.contracts.loan_contract(),
        "Starting Lendscope"
    );

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("building tokio runtime")?;

    runtime.block_on(serve(config))
}

async fn serve(config: AppConfig) -> anyhow::Result<()> {
    let port = config.api_port;
    let interval = config.fetch.poll_interval_secs;
    let state = AppState::with_config(config);

    let poller = tokio::spawn(poller::run(state.clone(), interval));

    let result = lendscope_api::start_server(state, port, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
        }
        tracing::info!("Shutdown requested");
    })
    .await
    .with_context(|| format!("serving API on port {}", port));

    poller.abort();
    result
}
