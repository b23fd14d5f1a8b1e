// In memory implementation of the QueueJournal port.
//
// Purpose
// - Support queue and coordinator tests without touching the filesystem.
//
// Responsibilities
// - Keep records in a list that can outlive a queue instance, so a test can
//   drop a queue and reopen it to simulate a restart.
// - Simulate a storage outage with `toggle_offline`.

use crate::modules::punches::adapters::outbound::punch_journal::{
    JournalRecord, QueueJournal, StorageError,
};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;

#[derive(Default)]
pub struct InMemoryJournal {
    pub records: Mutex<Vec<JournalRecord>>,
    is_offline: AtomicBool,
}

impl InMemoryJournal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn toggle_offline(&self) {
        self.is_offline.fetch_xor(true, Ordering::SeqCst);
    }

    fn ensure_online(&self) -> Result<(), StorageError> {
        if self.is_offline.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("Punch journal offline".into()));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl QueueJournal for InMemoryJournal {
    async fn load(&self) -> Result<Vec<JournalRecord>, StorageError> {
        self.ensure_online()?;
        Ok(self.records.lock().await.clone())
    }

    async fn append(&self, record: &JournalRecord) -> Result<(), StorageError> {
        self.ensure_online()?;
        self.records.lock().await.push(record.clone());
        Ok(())
    }

    async fn compact(&self, snapshot: &[JournalRecord]) -> Result<(), StorageError> {
        self.ensure_online()?;
        *self.records.lock().await = snapshot.to_vec();
        Ok(())
    }
}
