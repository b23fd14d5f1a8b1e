// File implementation of the QueueJournal port.
//
// Purpose
// - Keep the punch queue on disk as a JSON Lines journal so queued punches
//   survive a crash or a restart of the device agent.
//
// Responsibilities
// - Append one record per line, flushed and fsynced before returning.
// - Tolerate a torn final line left by a crash mid-write, and truncate it so
//   later appends start on a clean line.
// - Roll back a partially written record when an append fails, so the next
//   record never lands behind a fragment.
// - Compact by writing the snapshot to a temp file, fsyncing and renaming it
//   over the journal.

use std::path::{Path, PathBuf};

use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::modules::punches::adapters::outbound::punch_journal::{
    JournalRecord, QueueJournal, StorageError,
};

/// Open append handle and the length of the journal up to its last complete
/// record.
struct Writer {
    file: File,
    committed: u64,
}

pub struct FileJournal {
    path: PathBuf,
    writer: Mutex<Option<Writer>>,
}

impl FileJournal {
    /// Prepares a journal at `path`, creating parent directories and removing a
    /// stale temp file from an interrupted compaction.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }
        let journal = Self {
            path,
            writer: Mutex::new(None),
        };
        match fs::remove_file(journal.tmp_path()).await {
            Ok(()) => tracing::warn!(path = %journal.path.display(), "removed stale journal temp file"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        Ok(journal)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    /// Opens the append handle, cutting anything after the last newline.
    async fn open_writer(&self) -> Result<Writer, StorageError> {
        let content = match fs::read(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };
        let committed = content
            .iter()
            .rposition(|byte| *byte == b'\n')
            .map_or(0, |last| last + 1) as u64;
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        if committed < content.len() as u64 {
            tracing::warn!(
                path = %self.path.display(),
                kept_bytes = committed,
                "truncating incomplete journal record before appending"
            );
            file.set_len(committed).await?;
            file.sync_all().await?;
        }
        Ok(Writer { file, committed })
    }

    fn encode(record: &JournalRecord) -> Result<Vec<u8>, StorageError> {
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');
        Ok(line)
    }
}

#[async_trait::async_trait]
impl QueueJournal for FileJournal {
    async fn load(&self) -> Result<Vec<JournalRecord>, StorageError> {
        // Hold the writer lock so no append interleaves with a tail repair.
        let mut writer = self.writer.lock().await;
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut records = Vec::new();
        let mut valid_len = 0usize;
        let mut torn_tail = false;
        for (index, raw) in content.split_inclusive('\n').enumerate() {
            if !raw.ends_with('\n') {
                // Only the final segment can lack a newline: an append that never completed.
                torn_tail = true;
                break;
            }
            valid_len += raw.len();
            let line = raw.trim();
            if line.is_empty() {
                continue;
            }
            let record = serde_json::from_str::<JournalRecord>(line).map_err(|e| {
                StorageError::Corrupt {
                    line: index + 1,
                    reason: e.to_string(),
                }
            })?;
            records.push(record);
        }

        if torn_tail {
            tracing::warn!(
                path = %self.path.display(),
                kept_bytes = valid_len,
                "dropping torn final journal record"
            );
            let file = OpenOptions::new().write(true).open(&self.path).await?;
            file.set_len(valid_len as u64).await?;
            file.sync_all().await?;
            *writer = None;
        }

        Ok(records)
    }

    async fn append(&self, record: &JournalRecord) -> Result<(), StorageError> {
        let line = Self::encode(record)?;
        let mut slot = self.writer.lock().await;
        if slot.is_none() {
            *slot = Some(self.open_writer().await?);
        }
        let Some(writer) = slot.as_mut() else {
            return Err(StorageError::Unavailable("journal writer not open".into()));
        };
        let committed = writer.committed;
        let file = &mut writer.file;
        let written = async {
            if file.metadata().await?.len() > committed {
                tracing::warn!(kept_bytes = committed, "dropping stray bytes after last journal record");
                file.set_len(committed).await?;
            }
            file.write_all(&line).await?;
            file.flush().await?;
            file.sync_data().await
        }
        .await;
        match written {
            Ok(()) => {
                writer.committed = committed + line.len() as u64;
                Ok(())
            }
            Err(e) => {
                // Cut the partial record so the next append starts on a clean line.
                if let Err(rollback) = file.set_len(committed).await {
                    tracing::warn!(error = %rollback, "could not roll back failed journal append");
                }
                *slot = None;
                Err(e.into())
            }
        }
    }

    async fn compact(&self, snapshot: &[JournalRecord]) -> Result<(), StorageError> {
        let mut buffer = Vec::new();
        for record in snapshot {
            buffer.extend(Self::encode(record)?);
        }

        let mut writer = self.writer.lock().await;
        let tmp_path = self.tmp_path();
        let mut tmp = File::create(&tmp_path).await?;
        tmp.write_all(&buffer).await?;
        tmp.flush().await?;
        tmp.sync_all().await?;
        drop(tmp);

        fs::rename(&tmp_path, &self.path).await?;
        #[cfg(unix)]
        {
            let parent = self.path.parent().filter(|p| !p.as_os_str().is_empty());
            if let Some(Ok(dir)) = match parent {
                Some(parent) => Some(File::open(parent).await),
                None => None,
            } {
                if let Err(error) = dir.sync_all().await {
                    tracing::warn!(%error, "journal directory fsync failed after compaction");
                }
            }
        }
        *writer = None;
        tracing::debug!(path = %self.path.display(), records = snapshot.len(), "journal compacted");
        Ok(())
    }
}
