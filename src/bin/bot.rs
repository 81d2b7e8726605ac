//! One bot-process entry point (§2, §6 "Bot slot determination").
//!
//! Reads `BOT_ID=bot1`..`bot5` to learn which slot it owns, connects the
//! shared store, and holds the registry of transport clients (one per
//! slot) that the webhook receiver and the pipeline dispatch through
//! when a notification has to cross from one bot's chat-platform client
//! to another's (§9 "Cross-bot messaging").
//!
//! The chat-platform update loop itself — parsing inbound
//! messages/commands, rendering keyboards, forwarding media — is the
//! out-of-scope `Transport`/collaborator boundary (§1); this binary only
//! wires the engineered core up to that boundary.

use std::collections::HashMap;
use std::sync::Arc;

use bridgeos::config::{slot_from_bot_id, Config};
use bridgeos::store::Store;
use clap::Parser;
use log::info;
use parking_lot::RwLock;

#[derive(Parser, Debug)]
#[command(name = "bridgeos-bot", about = "BridgeOS bot-slot front-end process")]
struct Args {
    /// Logical slot this process owns, e.g. `bot1`..`bot5` (§6).
    #[arg(long, env = "BOT_ID")]
    bot_id: String,
}

fn init_logging() {
    let _ = log4rs::init_file("log4rs.yaml", Default::default());
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    let args = Args::parse();
    let slot = slot_from_bot_id(&args.bot_id)
        .ok_or_else(|| anyhow::anyhow!("BOT_ID must be bot1..bot5, got {:?}", args.bot_id))?;

    let config = Config::from_env()?;
    let store = Store::connect(
        &config.database_url,
        config.pool_min_connections,
        config.pool_max_connections,
        std::time::Duration::from_secs(config.pool_acquire_timeout_secs),
    )
    .await?;

    // Capability passed to whichever component needs to notify a
    // different slot's chat client; empty until a concrete Transport is
    // wired in by the out-of-scope chat-platform integration (§9).
    let transports: Arc<RwLock<HashMap<i16, Arc<dyn bridgeos::collaborators::Transport>>>> =
        Arc::new(RwLock::new(HashMap::new()));

    info!(target: "bridgeos::bot", "bot process ready on slot {slot}");

    let _ = &store;
    let _ = &transports;

    tokio::signal::ctrl_c().await?;
    info!(target: "bridgeos::bot", "shutting down slot {slot}");
    Ok(())
}
