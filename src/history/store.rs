use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use log::{error, info};
use snafu::{ResultExt, Snafu};
use tokio::sync::Mutex;

use crate::config::models::History;

use super::models::{HistoryRecord, HistoryStatus};

/// Upper bound for [`HistoryStore::recent`], whatever `history.limit` says.
pub const MAX_RECENT: usize = 50;

/// Append-only print history kept as a JSON array, newest record first.
///
/// Every read-modify-write cycle holds the store's lock, so concurrent submissions cannot
/// overwrite each other's records.
pub struct HistoryStore {
    path: PathBuf,
    limit: usize,
    lock: Mutex<()>,
}

impl HistoryStore {
    pub fn new(history_settings: &History) -> Self {
        HistoryStore {
            path: PathBuf::from(&history_settings.path),
            limit: history_settings.limit.min(MAX_RECENT),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn append(&self, record: HistoryRecord) -> Result<(), HistoryError> {
        let _guard = self.lock.lock().await;
        let mut records = self.read_all().await?;
        records.insert(0, record);
        self.write_all(&records).await
    }

    /// Sets the status of the record with `id`. Returns whether such a record exists.
    pub async fn mark(&self, id: i64, status: HistoryStatus) -> Result<bool, HistoryError> {
        let _guard = self.lock.lock().await;
        let mut records = self.read_all().await?;
        let Some(record) = records.iter_mut().find(|record| record.id == id) else {
            return Ok(false);
        };
        record.status = status;
        self.write_all(&records).await?;
        Ok(true)
    }

    /// The most recent records, at most `history.limit` (capped at [`MAX_RECENT`]) of them.
    /// An unreadable history is logged and reported as empty.
    pub async fn recent(&self) -> Vec<HistoryRecord> {
        let _guard = self.lock.lock().await;
        match self.read_all().await {
            Ok(mut records) => {
                records.truncate(self.limit);
                records
            }
            Err(e) => {
                error!("Could not read the print history: {}", e);
                Vec::new()
            }
        }
    }

    async fn read_all(&self) -> Result<Vec<HistoryRecord>, HistoryError> {
        let data = match tokio::fs::read_to_string(&self.path).await {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e).context(ReadSnafu { path: &self.path }),
        };
        if data.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&data).context(ParseSnafu { path: &self.path })
    }

    async fn write_all(&self, records: &[HistoryRecord]) -> Result<(), HistoryError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if !parent.exists() {
                tokio::fs::create_dir_all(parent).await.context(WriteSnafu { path: parent })?;
                info!("Created history directory {}", parent.display());
            }
        }

        let data = serde_json::to_string_pretty(records).context(SerializeSnafu)?;
        let staging = self.path.with_extension("json.tmp");
        tokio::fs::write(&staging, data).await.context(WriteSnafu { path: &staging })?;
        tokio::fs::rename(&staging, &self.path).await.context(WriteSnafu { path: &self.path })
    }
}

// ////// //
// Errors //
// ////// //

#[derive(Debug, Snafu)]
pub enum HistoryError {
    #[snafu(display("Could not read {}", path.display()))]
    Read { path: PathBuf, source: std::io::Error },

    #[snafu(display("{} is not a valid history file", path.display()))]
    Parse { path: PathBuf, source: serde_json::Error },

    #[snafu(display("Could not write {}", path.display()))]
    Write { path: PathBuf, source: std::io::Error },

    #[snafu(display("Could not serialize the history"))]
    Serialize { source: serde_json::Error },
}
