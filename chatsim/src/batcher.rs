//! # Conversation batcher
//!
//! Coalesces rapid-fire messages per conversation. The first message of an idle conversation
//! schedules one draining task after a randomized debounce delay; the task hands queued items to
//! a [`BatchSink`] in groups of at most `batch_size` until the queue is empty.
//!
//! Invariants:
//! - At most one draining task per conversation. The slot records its owner id, and only the
//!   owner may release it.
//! - The emptiness check and the slot release happen under the same map entry lock, so a message
//!   arriving concurrently either joins the running drain or schedules a fresh one.
//! - The slot is released by a drop guard on every exit path (drained, sink error, panic, abort).

use async_trait::async_trait;
use chatsim_core::ConversationId;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use rand::seq::SliceRandom;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, instrument};

use crate::notify::OperatorNotifier;

/// Debounce delay candidates and batch size for one kind of traffic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebounceConfig {
    /// One is drawn at random per scheduled drain. Empty means no delay.
    pub delays: Vec<Duration>,
    /// Max items per batch; `None` takes the whole queue.
    pub batch_size: Option<usize>,
}

impl DebounceConfig {
    pub fn new(delays: Vec<Duration>, batch_size: Option<usize>) -> Self {
        Self { delays, batch_size }
    }

    /// Private chats: 4, 8 or 10 seconds; two messages per batch.
    pub fn gchat() -> Self {
        Self::new(secs(&[4, 8, 10]), Some(2))
    }

    /// Group topics: 4 or 6 seconds; two messages per batch.
    pub fn wchat() -> Self {
        Self::new(secs(&[4, 6]), Some(2))
    }

    /// Photos: 5 seconds; everything buffered goes in one batch.
    pub fn photos() -> Self {
        Self::new(secs(&[5]), None)
    }

    fn pick_delay(&self) -> Duration {
        self.delays
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or(Duration::ZERO)
    }
}

fn secs(values: &[u64]) -> Vec<Duration> {
    values.iter().map(|s| Duration::from_secs(*s)).collect()
}

/// Items popped together for one conversation, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch<T> {
    pub conversation: ConversationId,
    pub items: Vec<T>,
}

/// Consumer of batches. An error ends the current drain and is reported to the operator.
#[async_trait]
pub trait BatchSink<T>: Send + Sync {
    async fn process(&self, batch: Batch<T>) -> anyhow::Result<()>;
}

struct Slot<T> {
    queue: VecDeque<T>,
    /// Id of the live draining task, if any.
    owner: Option<u64>,
}

struct Inner<T> {
    name: &'static str,
    config: DebounceConfig,
    slots: DashMap<ConversationId, Slot<T>>,
    sink: Arc<dyn BatchSink<T>>,
    notifier: Arc<dyn OperatorNotifier>,
    next_owner: AtomicU64,
}

/// Per-conversation queue plus single-drain scheduler. Cheap to clone.
pub struct ConversationBatcher<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for ConversationBatcher<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Send + Sync + 'static> ConversationBatcher<T> {
    /// `name` tags logs and operator notifications (e.g. `gchat`).
    pub fn new(
        name: &'static str,
        config: DebounceConfig,
        sink: Arc<dyn BatchSink<T>>,
        notifier: Arc<dyn OperatorNotifier>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                name,
                config,
                slots: DashMap::new(),
                sink,
                notifier,
                next_owner: AtomicU64::new(1),
            }),
        }
    }

    /// Queues `item`. Returns true when this call scheduled a new drain, false when it joined a
    /// pending or running one. Must be called inside a tokio runtime.
    pub fn on_message(&self, conversation: ConversationId, item: T) -> bool {
        let owner = {
            let mut slot = self
                .inner
                .slots
                .entry(conversation.clone())
                .or_insert_with(|| Slot {
                    queue: VecDeque::new(),
                    owner: None,
                });
            slot.queue.push_back(item);
            if slot.owner.is_some() {
                return false;
            }
            let owner = self.inner.next_owner.fetch_add(1, Ordering::Relaxed);
            slot.owner = Some(owner);
            owner
        };

        let delay = self.inner.config.pick_delay();
        info!(
            batcher = self.inner.name,
            conversation = %conversation,
            delay_secs = delay.as_secs_f64(),
            "step: drain scheduled"
        );
        let inner = Arc::clone(&self.inner);
        tokio::spawn(inner.drain(conversation, owner, delay));
        true
    }

    /// True while a drain is pending or running for `conversation`.
    pub fn is_scheduled(&self, conversation: &ConversationId) -> bool {
        self.inner
            .slots
            .get(conversation)
            .is_some_and(|slot| slot.owner.is_some())
    }

    /// Items queued and not yet handed to the sink.
    pub fn pending(&self, conversation: &ConversationId) -> usize {
        self.inner
            .slots
            .get(conversation)
            .map_or(0, |slot| slot.queue.len())
    }

    /// Conversations that still hold a slot (queued items or a live drain).
    pub fn active_conversations(&self) -> usize {
        self.inner.slots.len()
    }
}

/// Releases the slot if `owner` still holds it: removed when empty, otherwise left queued for
/// the next message to reschedule.
struct SlotGuard<T> {
    inner: Arc<Inner<T>>,
    conversation: ConversationId,
    owner: u64,
}

impl<T> Drop for SlotGuard<T> {
    fn drop(&mut self) {
        if let Entry::Occupied(mut entry) = self.inner.slots.entry(self.conversation.clone()) {
            if entry.get().owner != Some(self.owner) {
                return;
            }
            if entry.get().queue.is_empty() {
                entry.remove();
            } else {
                entry.get_mut().owner = None;
            }
        }
    }
}

impl<T: Send + Sync + 'static> Inner<T> {
    /// Pops the next batch, or releases the slot (same lock) when the queue is empty.
    fn next_batch(&self, conversation: &ConversationId, owner: u64) -> Option<Vec<T>> {
        match self.slots.entry(conversation.clone()) {
            Entry::Occupied(mut entry) => {
                if entry.get().owner != Some(owner) {
                    return None;
                }
                if entry.get().queue.is_empty() {
                    entry.remove();
                    return None;
                }
                let queue = &mut entry.get_mut().queue;
                let take = self
                    .config
                    .batch_size
                    .unwrap_or(queue.len())
                    .clamp(1, queue.len());
                Some(queue.drain(..take).collect())
            }
            Entry::Vacant(_) => None,
        }
    }

    #[instrument(skip(self, conversation), fields(batcher = self.name, conversation = %conversation))]
    async fn drain(self: Arc<Self>, conversation: ConversationId, owner: u64, delay: Duration) {
        let _guard = SlotGuard {
            inner: Arc::clone(&self),
            conversation: conversation.clone(),
            owner,
        };

        tokio::time::sleep(delay).await;

        let mut batches = 0usize;
        while let Some(items) = self.next_batch(&conversation, owner) {
            batches += 1;
            info!(items = items.len(), batch = batches, "step: batch started");
            let batch = Batch {
                conversation: conversation.clone(),
                items,
            };
            if let Err(e) = self.sink.process(batch).await {
                error!(error = %format!("{:#}", e), "Batch processing failed");
                self.notifier
                    .notify(&format!(
                        "Error in {} for {}: {:#}",
                        self.name, conversation, e
                    ))
                    .await;
                return;
            }
        }

        info!(batches, "step: drain finished");
    }
}
