//! Session lifecycle: connect, feed events to the dispatcher, reconnect.

use std::{fmt::Display, path::PathBuf, sync::Arc, time::Duration};

use tokio::{sync::mpsc, task::JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::{
    dispatcher::{Dispatcher, Outcome},
    replies,
    transport::{port::SessionClient, types::SessionEvent},
};

const EVENT_BUFFER: usize = 256;

/// Where an unexpected failure surfaced.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailureOrigin {
    /// Inside the task handling one inbound message.
    EventTask,
    /// In the session lifecycle itself (the process's main flow).
    Lifecycle,
}

/// What the process does about an unexpected failure.
///
/// Per-message tasks are expendable: their failures are logged and the bot
/// keeps serving. A failing lifecycle leaves the bot without a session, so the
/// process exits and an external supervisor restarts it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CrashPolicy {
    LogOnly,
    Terminate,
}

impl CrashPolicy {
    pub fn for_origin(origin: FailureOrigin) -> Self {
        match origin {
            FailureOrigin::EventTask => Self::LogOnly,
            FailureOrigin::Lifecycle => Self::Terminate,
        }
    }

    /// Log `detail` and, for [`CrashPolicy::Terminate`], exit with status 1.
    pub fn enforce(origin: FailureOrigin, detail: &dyn Display) {
        match Self::for_origin(origin) {
            Self::LogOnly => error!(?origin, "unhandled failure: {detail}"),
            Self::Terminate => {
                error!(?origin, "fatal failure, exiting: {detail}");
                std::process::exit(1);
            }
        }
    }
}

/// Route panic messages through `tracing` before the default hook runs.
pub fn install_panic_logger() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        error!("panic: {panic_info}");
        default_hook(panic_info);
    }));
}

/// Owns the session connection and the reconnect-on-disconnect policy.
pub struct SessionManager {
    client: Arc<dyn SessionClient>,
    dispatcher: Arc<Dispatcher>,
    reconnect_delay: Duration,
    auth_dir: PathBuf,
}

impl SessionManager {
    pub fn new(
        client: Arc<dyn SessionClient>,
        dispatcher: Arc<Dispatcher>,
        auth_dir: PathBuf,
    ) -> Self {
        let reconnect_delay = dispatcher.settings().reconnect_delay;
        Self {
            client,
            dispatcher,
            reconnect_delay,
            auth_dir,
        }
    }

    /// Run until `shutdown` is cancelled.
    ///
    /// Disconnects (and failed connection attempts) are followed by a fixed
    /// delay and a new attempt, without limit.
    pub async fn run(&self, shutdown: CancellationToken) {
        let mut tasks: JoinSet<Outcome> = JoinSet::new();

        loop {
            let (tx, mut rx) = mpsc::channel(EVENT_BUFFER);

            let reason = match self.client.initialize(tx).await {
                Err(e) => format!("initialization failed: {e}"),
                Ok(()) => loop {
                    tokio::select! {
                        _ = shutdown.cancelled() => {
                            drain(&mut tasks).await;
                            return;
                        }
                        Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                            if let Err(e) = joined {
                                CrashPolicy::enforce(FailureOrigin::EventTask, &e);
                            }
                        }
                        event = rx.recv() => match event {
                            None => break "event stream closed".to_string(),
                            Some(SessionEvent::Disconnected(reason)) => break reason,
                            Some(event) => self.on_event(event, &mut tasks),
                        },
                    }
                },
            };

            warn!("🔌 disconnected: {reason}");
            info!(
                "🔄 reconnecting in {} seconds...",
                self.reconnect_delay.as_secs()
            );
            tokio::select! {
                _ = shutdown.cancelled() => {
                    drain(&mut tasks).await;
                    return;
                }
                _ = tokio::time::sleep(self.reconnect_delay) => {}
            }
        }
    }

    fn on_event(&self, event: SessionEvent, tasks: &mut JoinSet<Outcome>) {
        match event {
            SessionEvent::Qr(code) => {
                info!("scan this QR code with WhatsApp on your phone: {code}");
            }
            SessionEvent::Ready => {
                info!("bot ready, commands:");
                for line in replies::READY_BANNER {
                    info!("{line}");
                }
            }
            SessionEvent::AuthFailure(reason) => {
                error!(
                    "❌ authentication failed ({reason}). Delete {} and scan the QR code again.",
                    self.auth_dir.display()
                );
            }
            SessionEvent::StateChanged(state) => info!("🔄 state changed: {state}"),
            SessionEvent::Message(msg) => {
                let dispatcher = Arc::clone(&self.dispatcher);
                tasks.spawn(async move { dispatcher.handle(&msg).await });
            }
            // Handled by the caller.
            SessionEvent::Disconnected(_) => {}
        }
    }
}

/// Let in-flight message tasks finish (their replies are already underway).
async fn drain(tasks: &mut JoinSet<Outcome>) {
    while let Some(joined) = tasks.join_next().await {
        if let Err(e) = joined {
            CrashPolicy::enforce(FailureOrigin::EventTask, &e);
        }
    }
}
