//! Handoff bot - webhook relay between Lark and a supervised task
//!
//! Wires the pieces together: config, the Lark client, the session
//! registry, the callback router, the task supervisor, and the axum
//! webhook server.

mod server;
mod task;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use handoff_core::{
    AllowList, Authorizer, CallbackRouter, Config, SessionRegistry, Task, TaskSupervisor,
};
use handoff_lark::{LarkClient, LarkNotifier};

use server::AppState;
use task::DryRunTask;

#[derive(Parser)]
#[command(name = "handoff-bot")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Chat relay with human-in-the-loop gating", long_about = None)]
struct Cli {
    /// Config file (TOML); HANDOFF_* env vars override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(if cli.verbose {
            "debug,hyper=info,reqwest=info"
        } else {
            "info"
        })
        .init();

    let config = match &cli.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => Config::from_env().context("failed to load config from environment")?,
    };

    info!(app_id = %config.lark.app_id, "starting handoff bot");
    info!(allowed_users = ?config.lark.allowed_users, "authorization allow list");

    let client = Arc::new(LarkClient::new(
        &config.lark.base_url,
        &config.lark.app_id,
        &config.lark.app_secret,
    ));

    let registry = Arc::new(SessionRegistry::new());
    let authorizer: Arc<dyn Authorizer> =
        Arc::new(AllowList::new(config.lark.allowed_users.clone()));
    let backend: Arc<dyn Task> = Arc::new(DryRunTask);

    let supervisor = Arc::new(TaskSupervisor::new(
        registry.clone(),
        LarkNotifier::factory(client, config.lark.receive_id_type.clone()),
        authorizer,
        backend,
    ));
    let router = Arc::new(CallbackRouter::new(registry));

    let state = Arc::new(AppState { supervisor, router });
    let addr = config.listen_addr();
    info!(addr = %addr, "webhook listening");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    axum::serve(listener, server::app(state))
        .await
        .context("webhook server failed")?;

    Ok(())
}
