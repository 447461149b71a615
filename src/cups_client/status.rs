use futures::future::join_all;
use log::error;

use super::client::CupsClient;
use super::error::Error;
use super::models::{JobQuery, PrinterInfo};

impl CupsClient {
    /// Discovered printers with `queued_jobs` replaced by a live count of their unfinished jobs.
    ///
    /// The counts are fetched concurrently. A printer whose count cannot be fetched reports 0.
    pub async fn printer_status(&self) -> Result<Vec<PrinterInfo>, Error> {
        let printers = self.discover_printers().await?;
        let counts = join_all(printers.iter().map(|printer| self.live_job_count(&printer.name))).await;

        Ok(printers
            .into_iter()
            .zip(counts)
            .map(|(mut printer, count)| {
                printer.queued_jobs = count;
                printer
            })
            .collect())
    }

    async fn live_job_count(&self, printer: &str) -> i32 {
        match self.list_jobs(&JobQuery::not_completed_on(printer)).await {
            Ok(jobs) => i32::try_from(jobs.len()).unwrap_or(i32::MAX),
            Err(e) => {
                error!("Could not count the jobs of printer {}: {}", printer, e);
                0
            }
        }
    }
}
