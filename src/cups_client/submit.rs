use chrono::Utc;
use log::{info, warn};
use snafu::ensure;

use crate::ipp_client::models::{AttrValue, IppOperation, IppRequest, JOB_ATTRIBUTES_TAG};

use super::client::CupsClient;
use super::error::{Error, MissingPrinterSnafu};
use super::models::{PrintReceipt, PrintRequest};
use super::normalize::{groups_of, recover_filename};

/// Sent for documents whose type could not be sniffed or is not one of [`SUPPORTED_FORMATS`].
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Document formats passed through to the printer as sniffed.
pub const SUPPORTED_FORMATS: [&str; 7] = [
    "application/pdf",
    "application/postscript",
    "image/jpeg",
    "image/png",
    "image/tiff",
    "text/plain",
    "text/html",
];

pub fn sniff_mime(document: &[u8]) -> Option<&'static str> {
    infer::get(document).map(|kind| kind.mime_type())
}

pub fn document_format(document: &[u8]) -> &'static str {
    match sniff_mime(document) {
        Some(mime) => SUPPORTED_FORMATS.iter().copied().find(|format| *format == mime).unwrap_or_else(|| {
            warn!("Document format {} is not supported, sending {}", mime, OCTET_STREAM);
            OCTET_STREAM
        }),
        None => OCTET_STREAM,
    }
}

impl CupsClient {
    /// Sends one Print-Job. Unsupported formats are not rejected, they go out as
    /// [`OCTET_STREAM`]. Failures are not retried.
    pub async fn submit(&self, request: PrintRequest) -> Result<PrintReceipt, Error> {
        ensure!(!request.printer.trim().is_empty(), MissingPrinterSnafu);

        let document_format = document_format(&request.document);
        let job_name = recover_filename(&request.job_name);
        let copies = request.copies.max(1);
        let target = self.printer_url(&request.printer);

        info!(
            "Printing {} ({}, {} bytes, {} copies) on {} for {}",
            job_name,
            document_format,
            request.document.len(),
            copies,
            request.printer,
            request.user
        );
        let ipp_request = IppRequest::new(IppOperation::PrintJob)
            .operation_attribute("requesting-user-name", request.user.as_str())
            .operation_attribute("job-name", job_name.as_str())
            .operation_attribute("document-format", document_format)
            .job_attribute("copies", i64::from(copies))
            .document(request.document);
        let reply = self.call(&target, ipp_request).await?;

        let server_job_id = groups_of(&reply.attributes, JOB_ATTRIBUTES_TAG)
            .into_iter()
            .chain(std::iter::once(&reply.attributes))
            .find_map(|group| group.get("job-id").and_then(AttrValue::as_integer))
            .filter(|id| *id != 0);
        if server_job_id.is_none() {
            warn!("Print-Job on {} returned no job-id, using a local id", request.printer);
        }

        let receipt = PrintReceipt {
            job_id: server_job_id.unwrap_or_else(|| Utc::now().timestamp_millis()),
            assigned_by_server: server_job_id.is_some(),
            document_format,
            job_name,
        };
        info!("Job {} accepted by {}", receipt.job_id, request.printer);
        Ok(receipt)
    }
}
