// Journal port behind the durable punch queue.
//
// Purpose
// - Persist every queue mutation as an append-only record so the queue can be
//   rebuilt after a restart.
//
// Responsibilities
// - Define the record shapes and the storage error taxonomy.
// - Let adapters decide where the records live (file, memory).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::modules::punches::core::punch_event::PunchEvent;
use crate::modules::punches::core::sync_state::SyncState;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum JournalRecord {
    Device {
        device_id: String,
    },
    Appended {
        event: PunchEvent,
    },
    StateChanged {
        id: u64,
        state: SyncState,
        attempts: u32,
        last_error: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        failed_at: Option<i64>,
    },
    Removed {
        id: u64,
    },
    /// Survives compaction so ids are never handed out twice.
    Watermark {
        next_id: u64,
        last_created_at: i64,
    },
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("journal io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("journal record encoding error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("journal corrupt at line {line}: {reason}")]
    Corrupt { line: usize, reason: String },

    #[error("journal unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait QueueJournal: Send + Sync {
    /// Returns every record in write order.
    async fn load(&self) -> Result<Vec<JournalRecord>, StorageError>;

    /// Durably appends one record. Returns only once the record is persisted.
    async fn append(&self, record: &JournalRecord) -> Result<(), StorageError>;

    /// Atomically replaces the whole journal with `snapshot`.
    async fn compact(&self, snapshot: &[JournalRecord]) -> Result<(), StorageError>;
}

pub mod file;
pub mod in_memory;
