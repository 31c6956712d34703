//! Entry point that wires config, components and the handler chain, then runs the REPL.

use anyhow::Result;
use tracing::{info, instrument};

use crate::components::{build_app, build_bot_components, create_teloxide_bot, seed_credentials};
use crate::config::BotConfig;
use crate::telegram::run_repl;

/// Main entry: validate config, init logging, build components, seed keys, start follow-ups,
/// then run the REPL until shutdown.
#[instrument(skip(config))]
pub async fn run_bot(config: BotConfig) -> Result<()> {
    config.validate()?;
    chatsim_core::init_tracing(Some(config.log_file()))?;

    info!(
        database_url = %config.database_url(),
        owner_id = config.owner_id(),
        "Initializing bot"
    );

    let teloxide_bot = create_teloxide_bot(&config);
    let components = build_bot_components(&config, teloxide_bot.clone()).await?;
    seed_credentials(&config, components.store.clone()).await?;

    let app = build_app(&config, &components);
    let follow_ups = app.follow_ups.clone().spawn();

    info!(handlers = app.chain.len(), "Bot started successfully");

    let result = run_repl(teloxide_bot, app.chain, components.bot.clone()).await;
    follow_ups.abort();
    result
}
