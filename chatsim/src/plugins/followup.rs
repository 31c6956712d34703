//! # Follow-ups
//!
//! Private-chat users who went quiet get a nudge. Activity timestamps (unix seconds) live in the
//! gchat collection; a background loop sweeps them every interval.
//!
//! Eligible: not gchat-disabled, not follow-up-disabled, and follow-ups are on for everyone or
//! for this user. A swept user's timestamp is refreshed so they are nudged once per threshold.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chatsim_core::{Bot, ReplyTarget};
use storage::{KvStore, KvStoreExt, StorageError};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{info, instrument, warn};

use crate::notify::OperatorNotifier;
use crate::settings::{list_contains, list_insert, list_remove, GChatSettings, GCHAT_COLLECTION};

const ENABLED_USERS: &str = "follow_up_enabled_users";
const DISABLED_USERS: &str = "follow_up_disabled_users";
const FOR_ALL: &str = "follow_up_for_all";
const TIMESTAMPS: &str = "user_last_message_timestamps";

/// Follow-up flags and activity timestamps.
#[derive(Clone)]
pub struct FollowUpState {
    store: Arc<dyn KvStore>,
    /// Held across the read-modify-write of the timestamp map.
    stamps_lock: Arc<Mutex<()>>,
}

impl FollowUpState {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self {
            store,
            stamps_lock: Arc::new(Mutex::new(())),
        }
    }

    pub async fn timestamps(&self) -> Result<BTreeMap<String, i64>, StorageError> {
        self.store
            .get_or(GCHAT_COLLECTION, TIMESTAMPS, BTreeMap::new())
            .await
    }

    /// Records activity of `user_id` at `now` (unix seconds).
    pub async fn touch(&self, user_id: i64, now: i64) -> Result<(), StorageError> {
        self.set_timestamps(&[user_id], now).await
    }

    /// Writers sharing this state are serialized, so a touch never drops another user's entry.
    async fn set_timestamps(&self, users: &[i64], now: i64) -> Result<(), StorageError> {
        let _guard = self.stamps_lock.lock().await;
        let mut stamps = self.timestamps().await?;
        for user_id in users {
            stamps.insert(user_id.to_string(), now);
        }
        self.store.set(GCHAT_COLLECTION, TIMESTAMPS, &stamps).await
    }

    pub async fn enable(&self, user_id: i64) -> Result<(), StorageError> {
        list_remove(self.store.as_ref(), GCHAT_COLLECTION, DISABLED_USERS, &user_id).await?;
        list_insert(self.store.as_ref(), GCHAT_COLLECTION, ENABLED_USERS, user_id).await?;
        Ok(())
    }

    pub async fn disable(&self, user_id: i64) -> Result<(), StorageError> {
        list_insert(self.store.as_ref(), GCHAT_COLLECTION, DISABLED_USERS, user_id).await?;
        list_remove(self.store.as_ref(), GCHAT_COLLECTION, ENABLED_USERS, &user_id).await?;
        Ok(())
    }

    /// Flips `follow_up_for_all`; returns the new value.
    pub async fn toggle_all(&self) -> Result<bool, StorageError> {
        let current: bool = self.store.get_or(GCHAT_COLLECTION, FOR_ALL, false).await?;
        self.store.set(GCHAT_COLLECTION, FOR_ALL, &!current).await?;
        Ok(!current)
    }

    pub async fn is_eligible(&self, user_id: i64, gchat: &GChatSettings) -> Result<bool, StorageError> {
        if gchat.is_user_disabled(user_id).await?
            || list_contains(self.store.as_ref(), GCHAT_COLLECTION, DISABLED_USERS, &user_id).await?
        {
            return Ok(false);
        }
        if self.store.get_or(GCHAT_COLLECTION, FOR_ALL, false).await? {
            return Ok(true);
        }
        list_contains(self.store.as_ref(), GCHAT_COLLECTION, ENABLED_USERS, &user_id).await
    }
}

pub struct FollowUpService {
    state: FollowUpState,
    gchat: GChatSettings,
    bot: Arc<dyn Bot>,
    notifier: Arc<dyn OperatorNotifier>,
    interval: Duration,
    threshold: Duration,
    message: String,
}

impl FollowUpService {
    pub fn new(
        state: FollowUpState,
        gchat: GChatSettings,
        bot: Arc<dyn Bot>,
        notifier: Arc<dyn OperatorNotifier>,
        interval: Duration,
        threshold: Duration,
        message: impl Into<String>,
    ) -> Self {
        Self {
            state,
            gchat,
            bot,
            notifier,
            interval,
            threshold,
            message: message.into(),
        }
    }

    pub fn state(&self) -> &FollowUpState {
        &self.state
    }

    /// Sends the follow-up to every eligible user idle for at least the threshold.
    /// Per-user failures are reported and skipped. Returns the number of users nudged.
    #[instrument(skip(self))]
    pub async fn sweep(&self, now: i64) -> anyhow::Result<usize> {
        let threshold = i64::try_from(self.threshold.as_secs()).unwrap_or(i64::MAX);
        let mut swept = Vec::new();

        for (user, last) in self.state.timestamps().await? {
            let Ok(user_id) = user.parse::<i64>() else {
                warn!(user = %user, "Skipping malformed follow-up entry");
                continue;
            };
            if now.saturating_sub(last) < threshold {
                continue;
            }
            match self.state.is_eligible(user_id, &self.gchat).await {
                Ok(true) => {}
                Ok(false) => continue,
                Err(e) => {
                    self.notifier
                        .notify(&format!("Follow-up error for {}: {}", user_id, e))
                        .await;
                    continue;
                }
            }
            match self
                .bot
                .send_message(&ReplyTarget::chat(user_id), &self.message)
                .await
            {
                Ok(()) => swept.push(user_id),
                Err(e) => {
                    self.notifier
                        .notify(&format!("Follow-up error for {}: {}", user_id, e))
                        .await
                }
            }
        }

        if !swept.is_empty() {
            self.state.set_timestamps(&swept, now).await?;
            info!(users = swept.len(), "step: follow-ups sent");
        }
        Ok(swept.len())
    }

    /// Runs [`Self::sweep`] every interval until the task is aborted.
    pub fn spawn(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(
                tokio::time::Instant::now() + self.interval,
                self.interval,
            );
            loop {
                ticker.tick().await;
                if let Err(e) = self.sweep(chrono::Utc::now().timestamp()).await {
                    self.notifier.notify(&format!("Follow-up error: {:#}", e)).await;
                }
            }
        })
    }
}
