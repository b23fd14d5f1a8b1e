use thiserror::Error;

use crate::modules::punches::adapters::outbound::punch_journal::StorageError;
use crate::modules::punches::core::sync_state::SyncState;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("punch {0} not found")]
    NotFound(u64),

    #[error("invalid transition for punch {id}: {from} -> {to}")]
    InvalidTransition {
        id: u64,
        from: SyncState,
        to: SyncState,
    },

    #[error("punch {id} cannot be removed while {state}")]
    NotRemovable { id: u64, state: SyncState },

    #[error(transparent)]
    Storage(#[from] StorageError),
}
