use chrono::{DateTime, Utc};
use serde_derive::{Deserialize, Serialize};

use crate::cups_client::models::{JobInfo, JobScope, JobStatus, PrinterInfo, PrinterState};
use crate::history::models::HistoryRecord;

// //////// //
// Printers //
// //////// //

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrinterPayload {
    pub name: String,
    pub state: PrinterState,
    pub state_message: String,
    pub state_reasons: String,
    pub is_online: bool,
    pub is_accepting_jobs: bool,
    pub location: String,
    pub model: String,
    pub info: String,
    pub jobs: i32,
}

impl From<&PrinterInfo> for PrinterPayload {
    fn from(printer: &PrinterInfo) -> Self {
        PrinterPayload {
            name: printer.name.clone(),
            state: printer.state,
            state_message: printer.state_message.clone(),
            state_reasons: printer.state_reasons.clone(),
            is_online: printer.is_online,
            is_accepting_jobs: printer.is_accepting_jobs,
            location: printer.location.clone(),
            model: printer.model.clone(),
            info: printer.info.clone(),
            jobs: printer.queued_jobs,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PrintersResponse {
    pub success: bool,
    pub printers: Vec<PrinterPayload>,
}

impl PrintersResponse {
    pub fn new(printers: &[PrinterInfo]) -> Self {
        PrintersResponse { success: true, printers: printers.iter().map(PrinterPayload::from).collect() }
    }
}

// //// //
// Jobs //
// //// //

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobPayload {
    pub id: i32,
    pub printer: String,
    pub filename: String,
    pub name: String,
    pub status: JobStatus,
    pub submitted_at: DateTime<Utc>,
    pub user_name: String,
    pub pages: i32,
}

impl From<&JobInfo> for JobPayload {
    fn from(job: &JobInfo) -> Self {
        JobPayload {
            id: job.id,
            printer: job.printer.clone(),
            filename: job.filename.clone(),
            name: job.filename.clone(),
            status: job.status,
            submitted_at: job.submitted_at,
            user_name: job.owner_user.clone(),
            pages: job.pages,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct JobsResponse {
    pub success: bool,
    pub jobs: Vec<JobPayload>,
}

impl JobsResponse {
    pub fn new(jobs: &[JobInfo]) -> Self {
        JobsResponse { success: true, jobs: jobs.iter().map(JobPayload::from).collect() }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct JobsParams {
    pub printer: Option<String>,
    pub which: Option<String>,
}

impl JobsParams {
    pub fn scope(&self) -> JobScope {
        match self.which.as_deref() {
            Some("not-completed") => JobScope::NotCompleted,
            _ => JobScope::All,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct CancelRequest {
    #[serde(default)]
    pub printer: String,
}

// /////// //
// History //
// /////// //

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub success: bool,
    pub history: Vec<HistoryRecord>,
}

// /////// //
// Generic //
// /////// //

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrintResponse {
    pub success: bool,
    pub message: String,
    pub job_id: i64,
}

/// Body of every failed API call.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponseBody {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
