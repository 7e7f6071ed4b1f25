//! Chat transport and the bot runtime.
//!
//! The adapter owns the wire protocol. The runtime wires the adapter to the
//! conversation engine for inbound messages and to the scheduler for
//! reminders, restarting the adapter with backoff when it fails.

pub mod telegram;
pub mod traits;

pub use telegram::TelegramAdapter;
pub use traits::{ChannelAdapter, InboundMessage, OutboundMessage, ReplyKeyboard, TextMarkup};

use crate::catalog::{JsonTextCatalog, TextRepository};
use crate::config::BotConfig;
use crate::conversation::{
    ConversationEngine, MemorySessionStore, SessionStore, SqliteSessionStore,
};
use crate::error::Result;
use crate::i18n::{Language, Localizer};
use crate::scheduler::Scheduler;
use crate::store::SqlitePreferenceStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

const INBOUND_QUEUE_SIZE: usize = 64;
const MAX_BACKOFF_SECS: u64 = 60;

/// Shared stores and lookup tables, opened once at startup.
#[derive(Clone)]
pub struct BotServices {
    pub localizer: Arc<Localizer>,
    pub store: Arc<SqlitePreferenceStore>,
    pub catalog: Arc<dyn TextRepository>,
    pub sessions: Arc<dyn SessionStore>,
}

impl BotServices {
    /// Open the database and catalog named in `config`.
    ///
    /// # Errors
    ///
    /// Fails if the database cannot be opened or the embedded locale trees are
    /// invalid. A bad catalog file only logs; the bot starts with no texts.
    pub fn open(config: &BotConfig) -> Result<Self> {
        let localizer = Arc::new(Localizer::embedded()?);
        for lang in Language::ALL {
            let missing = localizer.missing_keys(lang);
            if !missing.is_empty() {
                tracing::debug!(
                    language = %lang,
                    count = missing.len(),
                    "locale falls back to default for some keys"
                );
            }
        }

        let store = Arc::new(SqlitePreferenceStore::open(&config.db_path)?);
        let catalog: Arc<dyn TextRepository> =
            Arc::new(JsonTextCatalog::open(config.texts_path.clone()));
        let sessions: Arc<dyn SessionStore> = if config.sessions.persist {
            Arc::new(SqliteSessionStore::new(
                Arc::clone(&store),
                config.sessions.ttl_secs,
            ))
        } else {
            Arc::new(MemorySessionStore::new())
        };

        Ok(Self {
            localizer,
            store,
            catalog,
            sessions,
        })
    }

    #[must_use]
    pub fn engine(&self) -> ConversationEngine {
        ConversationEngine::new(
            Arc::clone(&self.localizer),
            Arc::clone(&self.store),
            Arc::clone(&self.catalog),
            Arc::clone(&self.sessions),
        )
    }
}

/// Run the bot against Telegram until `shutdown` fires.
pub async fn run_bot(config: BotConfig, shutdown: CancellationToken) -> anyhow::Result<()> {
    config.validate()?;
    let services = BotServices::open(&config)?;
    let adapter: Arc<dyn ChannelAdapter> =
        Arc::new(TelegramAdapter::new(&config.bot_token, &config.telegram));

    match adapter.health_check().await {
        Ok(true) => tracing::info!("telegram reachable"),
        Ok(false) => tracing::warn!("telegram health check failed; continuing"),
        Err(err) => tracing::warn!("telegram health check errored: {err}; continuing"),
    }

    run_runtime(
        services,
        adapter,
        Duration::from_secs(config.scheduler.poll_interval_secs),
        shutdown,
    )
    .await
}

/// Wire `adapter` to the conversation engine and the scheduler.
pub async fn run_runtime(
    services: BotServices,
    adapter: Arc<dyn ChannelAdapter>,
    poll_interval: Duration,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let engine = services.engine();

    let scheduler = Scheduler::new(
        Arc::clone(&services.store),
        Arc::clone(&services.catalog),
        Arc::clone(&services.localizer),
        Arc::clone(&adapter),
    )
    .with_poll_interval(poll_interval);
    let scheduler_handle = scheduler.run(shutdown.child_token());

    let (inbound_tx, mut inbound_rx) = tokio::sync::mpsc::channel::<InboundMessage>(INBOUND_QUEUE_SIZE);
    let mut workers = JoinSet::new();
    {
        let adapter = Arc::clone(&adapter);
        workers.spawn(async move {
            let mut backoff_secs = 2u64;
            loop {
                match adapter.run(inbound_tx.clone()).await {
                    Ok(()) if inbound_tx.is_closed() => break,
                    Ok(()) => {
                        tracing::warn!("channel {} stopped; restarting", adapter.id());
                    }
                    Err(err) => {
                        tracing::warn!(
                            "channel {} failed: {err}; retrying in {backoff_secs}s",
                            adapter.id()
                        );
                    }
                }
                tokio::time::sleep(Duration::from_secs(backoff_secs)).await;
                backoff_secs = backoff_secs.saturating_mul(2).min(MAX_BACKOFF_SECS);
            }
        });
    }
    tracing::info!("bot runtime started on [{}]", adapter.id());

    loop {
        let message = tokio::select! {
            () = shutdown.cancelled() => break,
            message = inbound_rx.recv() => match message {
                Some(message) => message,
                None => break,
            },
        };
        handle_inbound(&engine, adapter.as_ref(), message).await;
    }

    inbound_rx.close();
    workers.abort_all();
    while workers.join_next().await.is_some() {}
    if let Err(err) = scheduler_handle.await {
        tracing::error!("scheduler task ended abnormally: {err}");
    }
    tracing::info!("bot runtime stopped");
    Ok(())
}

/// Handle one inbound message and send the reply.
///
/// Failures are logged; the sender never sees raw errors.
pub async fn handle_inbound(
    engine: &ConversationEngine,
    adapter: &dyn ChannelAdapter,
    message: InboundMessage,
) {
    let now = chrono::Utc::now().timestamp();
    let reply = {
        let mut rng = rand::thread_rng();
        engine.handle(&message, now, &mut rng)
    };
    let reply = match reply {
        Ok(reply) => reply,
        Err(err) => {
            tracing::error!(user_id = message.user_id, "failed to handle message: {err}");
            return;
        }
    };
    if let Err(err) = adapter.send(reply).await {
        tracing::warn!(
            user_id = message.user_id,
            "failed to send {} reply: {err}",
            adapter.id()
        );
    }
}
