//! Reminder scheduler background loop.
//!
//! Spawns a tokio task that polls the preference store for users whose next
//! send time has passed, delivers one text to each, and reschedules them.

use crate::catalog::TextRepository;
use crate::channels::{ChannelAdapter, OutboundMessage};
use crate::delivery;
use crate::error::{BotError, Result};
use crate::i18n::Localizer;
use crate::scheduler::schedule;
use crate::store::{SqlitePreferenceStore, UserPreference};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Default interval between due-user polls.
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(300);

/// What happened to one due user during a tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// Sent and rescheduled.
    Delivered { next_send: i64 },
    /// Nothing new to send in the user's category; schedule untouched.
    NoContent,
}

/// Counters for one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub due: usize,
    pub delivered: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Background scheduler for reminder deliveries.
pub struct Scheduler {
    store: Arc<SqlitePreferenceStore>,
    catalog: Arc<dyn TextRepository>,
    localizer: Arc<Localizer>,
    adapter: Arc<dyn ChannelAdapter>,
    poll_interval: Duration,
    rng: StdRng,
}

impl Scheduler {
    pub fn new(
        store: Arc<SqlitePreferenceStore>,
        catalog: Arc<dyn TextRepository>,
        localizer: Arc<Localizer>,
        adapter: Arc<dyn ChannelAdapter>,
    ) -> Self {
        Self {
            store,
            catalog,
            localizer,
            adapter,
            poll_interval: DEFAULT_POLL_INTERVAL,
            rng: StdRng::from_entropy(),
        }
    }

    /// Override the poll interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval.max(Duration::from_secs(1));
        self
    }

    /// Use a fixed random source.
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    /// Start the polling loop. The first tick runs immediately.
    ///
    /// Cancellation is observed between ticks; a tick in progress always
    /// finishes, so no user is left with a sent text but a stale schedule.
    pub fn run(mut self, cancel: CancellationToken) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            info!(
                interval_secs = self.poll_interval.as_secs(),
                "scheduler started"
            );
            let mut interval = tokio::time::interval(self.poll_interval);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    () = cancel.cancelled() => break,
                    _ = interval.tick() => {}
                }
                let report = self.tick_at(chrono::Utc::now().timestamp()).await;
                if report.due > 0 {
                    info!(
                        due = report.due,
                        delivered = report.delivered,
                        skipped = report.skipped,
                        failed = report.failed,
                        "scheduler tick finished"
                    );
                }
            }
            info!("scheduler stopped");
        })
    }

    /// Run one tick as if the clock read `now`.
    ///
    /// Each due user is handled independently; a failure for one is logged
    /// and the rest still run.
    pub async fn tick_at(&mut self, now: i64) -> TickReport {
        let users = match self.store.due_users(now) {
            Ok(users) => users,
            Err(e) => {
                error!("failed to query due users: {e}");
                return TickReport::default();
            }
        };

        let mut report = TickReport {
            due: users.len(),
            ..TickReport::default()
        };
        for user in &users {
            match self.deliver(user, now).await {
                Ok(DeliveryOutcome::Delivered { next_send }) => {
                    debug!(user_id = user.user_id, next_send, "reminder delivered");
                    report.delivered += 1;
                }
                Ok(DeliveryOutcome::NoContent) => {
                    warn!(
                        user_id = user.user_id,
                        category = user.motivation_type.map(|m| m.as_canonical()),
                        "no new texts for scheduled reminder; skipping"
                    );
                    report.skipped += 1;
                }
                Err(e) => {
                    error!(user_id = user.user_id, "scheduled delivery failed: {e}");
                    report.failed += 1;
                }
            }
        }
        report
    }

    async fn deliver(&mut self, user: &UserPreference, now: i64) -> Result<DeliveryOutcome> {
        let lang = user.language_or_default();
        let Some(text) = delivery::take_text(
            self.catalog.as_ref(),
            &self.store,
            user.user_id,
            user.motivation_type,
            lang,
            now,
            &mut self.rng,
        )?
        else {
            return Ok(DeliveryOutcome::NoContent);
        };

        let header = self.localizer.resolve(lang, "scheduler.scheduledMessage");
        let body = delivery::format_scheduled(&header, &text, delivery::pick_emoji(&mut self.rng));
        let message = OutboundMessage::text(user.user_id, body).markdown();
        self.adapter
            .send(message)
            .await
            .map_err(|e| BotError::Dispatch(e.to_string()))?;

        let next_send = user
            .frequency
            .and_then(|freq| schedule::recurring_next_send(freq, now, &mut self.rng))
            .unwrap_or(0);
        self.store.update_schedule(user.user_id, next_send, now)?;
        Ok(DeliveryOutcome::Delivered { next_send })
    }
}
