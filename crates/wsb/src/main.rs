use std::sync::Arc;

use anyhow::Context;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use wsb_bridge::BridgeClient;
use wsb_core::{
    config::Config,
    dispatcher::Dispatcher,
    lifecycle::{self, CrashPolicy, FailureOrigin, SessionManager},
    sticker::ContainPngCodec,
    transport::port::SessionClient,
};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        CrashPolicy::enforce(FailureOrigin::Lifecycle, &format!("{e:#}"));
    }
}

async fn run() -> anyhow::Result<()> {
    wsb_core::logging::init("wsb")?;
    lifecycle::install_panic_logger();

    let cfg = Config::load().context("loading configuration")?;
    info!(
        bridge = %cfg.bridge_url,
        client_id = %cfg.client_id,
        "starting WhatsApp sticker bot"
    );

    let client = Arc::new(BridgeClient::new(&cfg).context("creating bridge client")?);

    let dispatcher = Arc::new(Dispatcher::new(
        client.clone(),
        Arc::new(ContainPngCodec),
        cfg.bot.clone(),
    ));
    let manager = SessionManager::new(client.clone(), dispatcher, cfg.auth_dir.clone());

    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("🛑 shutting down");
            }
            shutdown.cancel();
        }
    });

    manager.run(shutdown).await;

    if let Err(e) = client.destroy().await {
        warn!("failed to close session cleanly: {e}");
    }
    info!("bye");
    Ok(())
}
