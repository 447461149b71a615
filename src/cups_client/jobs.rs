use log::{debug, info};
use snafu::ensure;

use crate::ipp_client::models::{IppOperation, IppRequest, JOB_ATTRIBUTES_TAG};

use super::client::CupsClient;
use super::error::{Error, MissingPrinterSnafu};
use super::models::{JobInfo, JobQuery};
use super::normalize::{groups_of, normalize_job};

pub const JOB_ATTRIBUTES: [&str; 12] = [
    "job-id",
    "job-name",
    "job-state",
    "job-originating-user-name",
    "time-at-creation",
    "date-time-at-creation",
    "job-pages",
    "copies",
    "job-uri",
    "printer-uri",
    "job-printer-uri",
    "printer-name",
];

impl CupsClient {
    /// Runs one Get-Jobs request and normalizes the answer. Jobs without an id are skipped.
    ///
    /// A query for a printer goes to that printer's URI, unless `shared_endpoint` is set: then
    /// the bare server is asked and the jobs are filtered by their derived printer name.
    pub async fn list_jobs(&self, query: &JobQuery) -> Result<Vec<JobInfo>, Error> {
        let target = match (&query.printer, query.shared_endpoint) {
            (Some(printer), false) => self.printer_url(printer),
            _ => self.server_url(),
        };
        let request = IppRequest::new(IppOperation::GetJobs)
            .operation_attribute("requesting-user-name", self.settings().requesting_user())
            .operation_attribute("which-jobs", query.scope.keyword())
            .operation_attribute("limit", i64::from(self.settings().job_limit))
            .requested_attributes(&JOB_ATTRIBUTES);

        debug!("Listing {} jobs on {}", query.scope, target);
        let reply = self.call(&target, request).await?;

        let placeholder = &self.settings().placeholder_printer;
        let mut jobs: Vec<JobInfo> = groups_of(&reply.attributes, JOB_ATTRIBUTES_TAG)
            .into_iter()
            .filter_map(|group| normalize_job(group, placeholder))
            .collect();

        if let (Some(printer), true) = (&query.printer, query.shared_endpoint) {
            jobs.retain(|job| &job.printer == printer);
        }

        info!("Found {} jobs on {}", jobs.len(), target);
        Ok(jobs)
    }

    pub async fn cancel_job(&self, printer: &str, job_id: i32, user: &str) -> Result<(), Error> {
        ensure!(!printer.trim().is_empty(), MissingPrinterSnafu);

        let request = IppRequest::new(IppOperation::CancelJob)
            .operation_attribute("requesting-user-name", user)
            .operation_attribute("job-id", i64::from(job_id));
        self.call(&self.printer_url(printer), request).await?;

        info!("Cancelled job {} on {}", job_id, printer);
        Ok(())
    }
}
