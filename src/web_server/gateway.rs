use std::path::Path;
use std::sync::Arc;

use axum::http::StatusCode;
use log::{error, info, warn};
use snafu::{ensure, Snafu};

use crate::config::models::{Settings, Upload};
use crate::cups_client::client::CupsClient;
use crate::cups_client::models::{PrintReceipt, PrintRequest};
use crate::cups_client::submit::sniff_mime;
use crate::cups_client::error::Error as CupsError;
use crate::history::models::{format_file_size, HistoryRecord, HistoryStatus};
use crate::history::store::HistoryStore;
use crate::ipp_client::client::CupsTransport;

/// A file received through the upload form.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: String,
    pub data: Vec<u8>,
}

/// Everything the HTTP handlers need: the print server, the print history and the upload rules.
pub struct Gateway {
    pub cups: CupsClient,
    pub history: HistoryStore,
    upload: Upload,
}

impl Gateway {
    pub fn new(cups: CupsClient, history: HistoryStore, upload_settings: Upload) -> Self {
        Gateway { cups, history, upload: upload_settings }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        let transport = Arc::new(CupsTransport::new(&settings.cups));
        Gateway::new(
            CupsClient::new(transport, settings.cups.clone()),
            HistoryStore::new(&settings.history),
            settings.upload.clone(),
        )
    }

    pub fn max_upload_size(&self) -> usize {
        self.upload.max_size
    }

    /// Checks the upload against the configured size limit, extensions and MIME types.
    pub fn validate(&self, file: &UploadedFile) -> Result<(), ApiError> {
        ensure!(!file.data.is_empty(), MissingFileSnafu);
        ensure!(
            file.data.len() <= self.upload.max_size,
            FileTooLargeSnafu { size: file.data.len(), max: self.upload.max_size }
        );

        let extension = Path::new(&file.filename)
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy().to_lowercase()))
            .unwrap_or_default();
        let extension_allowed = self.upload.allowed_extensions.iter().any(|allowed| allowed.to_lowercase() == extension);
        ensure!(extension_allowed, UnsupportedFileTypeSnafu { filename: &file.filename });

        // Content that cannot be sniffed (plain text mostly) is judged by its extension alone.
        if let Some(mime) = sniff_mime(&file.data) {
            ensure!(
                self.upload.allowed_mime_types.iter().any(|allowed| allowed == mime),
                UnsupportedFileTypeSnafu { filename: &file.filename }
            );
        }
        Ok(())
    }

    /// Validates and submits an upload, then records the outcome in the history.
    pub async fn print(&self, file: UploadedFile, printer: &str, copies: u32, user: &str) -> Result<PrintReceipt, ApiError> {
        self.validate(&file)?;

        let size = file.data.len() as u64;
        let filename = file.filename.clone();
        let request = PrintRequest {
            printer: printer.to_string(),
            document: file.data,
            job_name: file.filename,
            copies,
            user: user.to_string(),
        };

        match self.cups.submit(request).await {
            Ok(receipt) => {
                info!("{} printed {} ({}) on {}", user, receipt.job_name, format_file_size(size), printer);
                self.record(HistoryRecord::printed(&receipt, printer, size, user)).await;
                Ok(receipt)
            }
            Err(source) => {
                if !source.is_validation() {
                    self.record(HistoryRecord::failed(&filename, printer, size, user)).await;
                }
                Err(ApiError::Cups { message: "Print failed", source })
            }
        }
    }

    pub async fn cancel(&self, printer: &str, job_id: i32, user: &str) -> Result<(), ApiError> {
        if let Err(source) = self.cups.cancel_job(printer, job_id, user).await {
            return Err(ApiError::Cups { message: "Could not cancel the job", source });
        }

        match self.history.mark(i64::from(job_id), HistoryStatus::Cancelled).await {
            Ok(true) => {}
            Ok(false) => info!("Cancelled job {} has no history record", job_id),
            Err(e) => error!("Could not mark job {} as cancelled in the history: {}", job_id, e),
        }
        Ok(())
    }

    async fn record(&self, record: HistoryRecord) {
        if let Err(e) = self.history.append(record).await {
            error!("Could not write the print history: {}", e);
        }
    }
}

// ////// //
// Errors //
// ////// //

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ApiError {
    #[snafu(display("Please upload a file"))]
    MissingFile,

    #[snafu(display("The file is {} but at most {} may be uploaded", format_file_size(*size as u64), format_file_size(*max as u64)))]
    FileTooLarge { size: usize, max: usize },

    #[snafu(display("Unsupported file type: {filename}"))]
    UnsupportedFileType { filename: String },

    #[snafu(display("Malformed upload"))]
    InvalidUpload { source: axum::extract::multipart::MultipartError },

    #[snafu(display("{message}"))]
    Cups { message: &'static str, source: CupsError },
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingFile
            | ApiError::FileTooLarge { .. }
            | ApiError::UnsupportedFileType { .. }
            | ApiError::InvalidUpload { .. } => StatusCode::BAD_REQUEST,
            ApiError::Cups { source, .. } if source.is_validation() => StatusCode::BAD_REQUEST,
            ApiError::Cups { .. } => StatusCode::BAD_GATEWAY,
        }
    }

    /// The underlying causes, outermost first, joined into one line.
    pub fn cause(&self) -> Option<String> {
        let mut current = std::error::Error::source(self)?;
        let mut causes = vec![current.to_string()];
        while let Some(next) = current.source() {
            causes.push(next.to_string());
            current = next;
        }
        Some(causes.join(": "))
    }

    pub fn log(&self) {
        match self.cause() {
            Some(cause) if self.status().is_server_error() => error!("{}: {}", self, cause),
            Some(cause) => warn!("{}: {}", self, cause),
            None => warn!("{}", self),
        }
    }
}
