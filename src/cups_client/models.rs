use std::fmt::{Display, Formatter};

use chrono::{DateTime, Utc};
use serde_derive::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PrinterState {
    Idle,
    Processing,
    Stopped,
    Unknown,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PrinterInfo {
    pub name: String,
    pub state: PrinterState,
    pub state_message: String,
    pub state_reasons: String,
    pub is_online: bool,
    pub is_accepting_jobs: bool,
    pub location: String,
    pub model: String,
    pub info: String,
    /// Server reported summary, replaced by a live count in the status view.
    pub queued_jobs: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Cancelled,
    Aborted,
    Stopped,
}

#[derive(Debug, Clone, PartialEq)]
pub struct JobInfo {
    pub id: i32,
    pub printer: String,
    pub filename: String,
    pub status: JobStatus,
    pub submitted_at: DateTime<Utc>,
    pub owner_user: String,
    pub pages: i32,
}

/// Value of the `which-jobs` operation attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JobScope {
    #[default]
    All,
    NotCompleted,
}

impl JobScope {
    pub fn keyword(&self) -> &'static str {
        match self {
            JobScope::All => "all",
            JobScope::NotCompleted => "not-completed",
        }
    }
}

impl Display for JobScope {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.keyword())
    }
}

/// Where a Get-Jobs request goes and which of the returned jobs are kept.
#[derive(Debug, Clone, Default)]
pub struct JobQuery {
    pub scope: JobScope,
    pub printer: Option<String>,
    /// Query the bare server even when a printer is given, and keep only that printer's jobs.
    pub shared_endpoint: bool,
}

impl JobQuery {
    pub fn all() -> Self {
        JobQuery::default()
    }

    pub fn not_completed_on(printer: &str) -> Self {
        JobQuery { scope: JobScope::NotCompleted, printer: Some(printer.to_string()), shared_endpoint: false }
    }
}

#[derive(Debug, Clone)]
pub struct PrintRequest {
    pub printer: String,
    pub document: Vec<u8>,
    pub job_name: String,
    pub copies: u32,
    pub user: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PrintReceipt {
    pub job_id: i64,
    /// False when the server did not hand out a job-id and a local one was generated.
    pub assigned_by_server: bool,
    pub document_format: &'static str,
    pub job_name: String,
}
