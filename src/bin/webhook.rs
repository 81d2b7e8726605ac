//! The billing webhook-receiver process (§2, §4.9).
//!
//! An independent process from the bot fleet, sharing only the
//! database. Exposes the one POST path `webhook::router` builds.

use std::collections::HashMap;
use std::sync::Arc;

use bridgeos::config::Config;
use bridgeos::store::Store;
use bridgeos::webhook::{router, WebhookState};
use clap::Parser;
use log::info;
use poem::listener::TcpListener;
use poem::Server;

#[derive(Parser, Debug)]
#[command(name = "bridgeos-webhook", about = "BridgeOS billing webhook receiver")]
struct Args {
    /// Address to bind the HTTP listener to.
    #[arg(long, env = "WEBHOOK_BIND_ADDR", default_value = "0.0.0.0:8080")]
    bind_addr: String,
}

fn init_logging() {
    let _ = log4rs::init_file("log4rs.yaml", Default::default());
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    let args = Args::parse();
    let config = Config::from_env()?;

    let store = Store::connect(
        &config.database_url,
        config.pool_min_connections,
        config.pool_max_connections,
        std::time::Duration::from_secs(config.pool_acquire_timeout_secs),
    )
    .await?;

    // Notifications triggered by a subscription transition are
    // best-effort and go out through whichever bot slot the chat
    // client registry knows about (§9); empty here for the same reason
    // noted in `bin/bot.rs`.
    let transport_by_slot: HashMap<i16, Arc<dyn bridgeos::collaborators::Transport>> = HashMap::new();

    let state = Arc::new(WebhookState {
        store,
        webhook_secret: config.webhook_secret.clone(),
        transport_by_slot: Box::new(move |slot: i16| transport_by_slot.get(&slot).cloned()),
    });

    info!(target: "bridgeos::webhook", "webhook receiver listening on {}", args.bind_addr);

    Server::new(TcpListener::bind(args.bind_addr))
        .run(router(state))
        .await?;

    Ok(())
}
