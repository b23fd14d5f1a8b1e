// Durable local queue of punch events.
//
// Purpose
// - Hold every punch that has not been confirmed by the acceptance endpoint,
//   across crashes and restarts.
//
// Responsibilities
// - Assign ids and persistence timestamps as a strict total order.
// - Apply state transitions atomically: journal first, memory second.
// - Keep the backlog counters current so reads are O(1).
// - On open, replay the journal and put interrupted deliveries back to pending.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::modules::punches::adapters::outbound::punch_journal::{JournalRecord, QueueJournal};
use crate::modules::punches::core::punch_event::{NewPunch, PunchEvent};
use crate::modules::punches::core::sync_state::SyncState;
use crate::modules::punches::queue::errors::QueueError;
use crate::shared::core::primitives::now_millis;

pub const DEFAULT_COMPACTION_THRESHOLD: usize = 512;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct QueueDepth {
    pub pending: usize,
    pub in_flight: usize,
    pub failed: usize,
}

impl QueueDepth {
    /// Events not yet synced.
    pub fn total(&self) -> usize {
        self.pending + self.in_flight + self.failed
    }

    fn slot(&mut self, state: SyncState) -> Option<&mut usize> {
        match state {
            SyncState::Pending => Some(&mut self.pending),
            SyncState::InFlight => Some(&mut self.in_flight),
            SyncState::Failed => Some(&mut self.failed),
            SyncState::Synced => None,
        }
    }

    fn enter(&mut self, state: SyncState) {
        if let Some(slot) = self.slot(state) {
            *slot += 1;
        }
    }

    fn leave(&mut self, state: SyncState) {
        if let Some(slot) = self.slot(state) {
            *slot = slot.saturating_sub(1);
        }
    }
}

#[derive(Default)]
struct QueueIndex {
    events: BTreeMap<u64, PunchEvent>,
    next_id: u64,
    last_created_at: i64,
    depth: QueueDepth,
    records_since_compaction: usize,
}

impl QueueIndex {
    fn apply(&mut self, record: JournalRecord) {
        match record {
            JournalRecord::Device { .. } => {}
            JournalRecord::Appended { event } => {
                self.next_id = self.next_id.max(event.id + 1);
                self.last_created_at = self.last_created_at.max(event.created_at);
                self.depth.enter(event.sync_state);
                if let Some(previous) = self.events.insert(event.id, event) {
                    self.depth.leave(previous.sync_state);
                }
            }
            JournalRecord::StateChanged {
                id,
                state,
                attempts,
                last_error,
                failed_at,
            } => match self.events.get_mut(&id) {
                Some(event) => {
                    self.depth.leave(event.sync_state);
                    self.depth.enter(state);
                    event.sync_state = state;
                    event.attempts = attempts;
                    event.last_error = last_error;
                    event.failed_at = failed_at;
                }
                None => tracing::warn!(id, "journal state change for unknown punch ignored"),
            },
            JournalRecord::Removed { id } => {
                if let Some(event) = self.events.remove(&id) {
                    self.depth.leave(event.sync_state);
                }
            }
            JournalRecord::Watermark {
                next_id,
                last_created_at,
            } => {
                self.next_id = self.next_id.max(next_id);
                self.last_created_at = self.last_created_at.max(last_created_at);
            }
        }
    }

    fn ordered(&self, filter: impl Fn(&PunchEvent) -> bool) -> Vec<PunchEvent> {
        let mut events: Vec<PunchEvent> = self
            .events
            .values()
            .filter(|event| filter(event))
            .cloned()
            .collect();
        events.sort_by_key(PunchEvent::order_key);
        events
    }
}

pub struct PunchQueue {
    device_id: String,
    journal: Arc<dyn QueueJournal>,
    inner: Mutex<QueueIndex>,
    compaction_threshold: usize,
}

impl PunchQueue {
    /// Rebuilds the queue from `journal`.
    ///
    /// Punches left `in_flight` by a crash have an unknown delivery outcome and
    /// are reset to `pending`; the endpoint deduplicates the retry by id.
    pub async fn open(journal: Arc<dyn QueueJournal>) -> Result<Self, QueueError> {
        let records = journal.load().await?;
        let mut device_id = None;
        let mut index = QueueIndex {
            next_id: 1,
            ..QueueIndex::default()
        };
        let replayed = records.len();
        for record in records {
            if let JournalRecord::Device { device_id: id } = &record {
                device_id.get_or_insert_with(|| id.clone());
            }
            index.apply(record);
        }

        let device_id = match device_id {
            Some(device_id) => device_id,
            None => {
                let device_id = Uuid::now_v7().to_string();
                journal
                    .append(&JournalRecord::Device {
                        device_id: device_id.clone(),
                    })
                    .await?;
                tracing::info!(%device_id, "initialised new punch queue");
                device_id
            }
        };

        let queue = Self {
            device_id,
            journal,
            inner: Mutex::new(index),
            compaction_threshold: DEFAULT_COMPACTION_THRESHOLD,
        };

        let recovered = queue.requeue_in_flight().await?;
        if recovered > 0 {
            tracing::warn!(recovered, "reset interrupted deliveries to pending");
        }
        {
            let mut inner = queue.inner.lock().await;
            // Confirmed before the crash, only the removal was lost.
            inner
                .events
                .retain(|_, event| event.sync_state != SyncState::Synced);
            queue.compact(&mut inner).await?;
            tracing::info!(
                device_id = %queue.device_id,
                replayed,
                backlog = inner.depth.total(),
                next_id = inner.next_id,
                "punch queue opened"
            );
        }
        Ok(queue)
    }

    pub fn with_compaction_threshold(mut self, threshold: usize) -> Self {
        self.compaction_threshold = threshold.max(1);
        self
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    /// Persists a new punch in `pending` and returns it with its id.
    pub async fn append(&self, punch: NewPunch) -> Result<PunchEvent, QueueError> {
        let mut inner = self.inner.lock().await;
        let id = inner.next_id;
        let created_at = now_millis().max(inner.last_created_at);
        let event = PunchEvent::from_new(id, created_at, punch);
        self.journal
            .append(&JournalRecord::Appended {
                event: event.clone(),
            })
            .await?;
        inner.apply(JournalRecord::Appended {
            event: event.clone(),
        });
        tracing::debug!(id, employee_id = %event.employee_id, punch_type = %event.punch_type, "punch queued");
        self.after_write(&mut inner).await;
        Ok(event)
    }

    pub async fn get(&self, id: u64) -> Option<PunchEvent> {
        self.inner.lock().await.events.get(&id).cloned()
    }

    /// Snapshot of every punch not yet synced, oldest first.
    pub async fn list_pending(&self) -> Vec<PunchEvent> {
        self.inner
            .lock()
            .await
            .ordered(|event| event.sync_state != SyncState::Synced)
    }

    pub async fn list_failed(&self) -> Vec<PunchEvent> {
        self.inner
            .lock()
            .await
            .ordered(|event| event.sync_state == SyncState::Failed)
    }

    pub async fn mark_state(&self, id: u64, state: SyncState) -> Result<PunchEvent, QueueError> {
        self.transition(id, state, None).await
    }

    /// Like `mark_state`, also keeping `reason` as the punch's last error.
    pub async fn record_attempt_failure(
        &self,
        id: u64,
        state: SyncState,
        reason: impl Into<String>,
    ) -> Result<PunchEvent, QueueError> {
        self.transition(id, state, Some(reason.into())).await
    }

    async fn transition(
        &self,
        id: u64,
        to: SyncState,
        error: Option<String>,
    ) -> Result<PunchEvent, QueueError> {
        let mut inner = self.inner.lock().await;
        let event = inner.events.get(&id).ok_or(QueueError::NotFound(id))?;
        let from = event.sync_state;
        if !from.can_transition_to(to) {
            return Err(QueueError::InvalidTransition { id, from, to });
        }
        let attempts = if to == SyncState::InFlight {
            event.attempts.saturating_add(1)
        } else {
            event.attempts
        };
        let record = JournalRecord::StateChanged {
            id,
            state: to,
            attempts,
            last_error: error.or_else(|| event.last_error.clone()),
            failed_at: (to == SyncState::Failed).then(now_millis),
        };
        self.journal.append(&record).await?;
        inner.apply(record);
        self.after_write(&mut inner).await;
        inner.events.get(&id).cloned().ok_or(QueueError::NotFound(id))
    }

    /// Deletes a synced punch. Absent ids are ignored.
    pub async fn remove(&self, id: u64) -> Result<(), QueueError> {
        self.remove_in(id, SyncState::Synced, false).await
    }

    /// Acknowledges a failed punch and drops it from the queue.
    pub async fn discard_failed(&self, id: u64) -> Result<(), QueueError> {
        self.remove_in(id, SyncState::Failed, true).await
    }

    async fn remove_in(
        &self,
        id: u64,
        required: SyncState,
        must_exist: bool,
    ) -> Result<(), QueueError> {
        let mut inner = self.inner.lock().await;
        let Some(event) = inner.events.get(&id) else {
            return if must_exist {
                Err(QueueError::NotFound(id))
            } else {
                Ok(())
            };
        };
        if event.sync_state != required {
            return Err(QueueError::NotRemovable {
                id,
                state: event.sync_state,
            });
        }
        let record = JournalRecord::Removed { id };
        self.journal.append(&record).await?;
        inner.apply(record);
        self.after_write(&mut inner).await;
        Ok(())
    }

    /// Drops punches that failed before `cutoff` (epoch millis).
    pub async fn purge_failed_before(&self, cutoff: i64) -> Result<usize, QueueError> {
        let mut inner = self.inner.lock().await;
        let expired: Vec<u64> = inner
            .events
            .values()
            .filter(|event| {
                event.sync_state == SyncState::Failed
                    && event.failed_at.is_some_and(|failed_at| failed_at < cutoff)
            })
            .map(|event| event.id)
            .collect();
        for id in &expired {
            let record = JournalRecord::Removed { id: *id };
            self.journal.append(&record).await?;
            inner.apply(record);
            self.after_write(&mut inner).await;
        }
        Ok(expired.len())
    }

    /// Puts every `in_flight` punch back to `pending`.
    pub async fn requeue_in_flight(&self) -> Result<usize, QueueError> {
        let mut inner = self.inner.lock().await;
        let stuck: Vec<(u64, u32, Option<String>)> = inner
            .events
            .values()
            .filter(|event| event.sync_state == SyncState::InFlight)
            .map(|event| (event.id, event.attempts, event.last_error.clone()))
            .collect();
        for (id, attempts, last_error) in &stuck {
            let record = JournalRecord::StateChanged {
                id: *id,
                state: SyncState::Pending,
                attempts: *attempts,
                last_error: last_error.clone(),
                failed_at: None,
            };
            self.journal.append(&record).await?;
            inner.apply(record);
            self.after_write(&mut inner).await;
        }
        Ok(stuck.len())
    }

    /// Number of punches not yet synced.
    pub async fn count(&self) -> usize {
        self.inner.lock().await.depth.total()
    }

    pub async fn depth(&self) -> QueueDepth {
        self.inner.lock().await.depth
    }

    async fn after_write(&self, inner: &mut QueueIndex) {
        inner.records_since_compaction += 1;
        if inner.records_since_compaction < self.compaction_threshold {
            return;
        }
        // The triggering mutation is already durable; a failed compaction only
        // postpones the rewrite.
        if let Err(error) = self.compact(inner).await {
            tracing::warn!(%error, "journal compaction failed");
        }
    }

    async fn compact(&self, inner: &mut QueueIndex) -> Result<(), QueueError> {
        let mut snapshot = Vec::with_capacity(inner.events.len() + 2);
        snapshot.push(JournalRecord::Device {
            device_id: self.device_id.clone(),
        });
        snapshot.push(JournalRecord::Watermark {
            next_id: inner.next_id,
            last_created_at: inner.last_created_at,
        });
        snapshot.extend(
            inner
                .events
                .values()
                .cloned()
                .map(|event| JournalRecord::Appended { event }),
        );
        self.journal.compact(&snapshot).await?;
        inner.records_since_compaction = 0;
        Ok(())
    }
}
