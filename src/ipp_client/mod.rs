use std::time::Duration;

use async_trait::async_trait;
use snafu::Snafu;

use self::models::{IppOperation, IppReply, IppRequest};

pub mod client;
pub mod models;

#[cfg(test)]
pub mod fake;

/// Request/response primitive towards the print server.
///
/// Implementations only fail for transport level problems. An answer carrying an IPP error
/// status is still an [`IppReply`], interpreting it is up to the caller.
#[async_trait]
pub trait IppTransport: Send + Sync {
    async fn execute(&self, target: &str, request: IppRequest) -> Result<IppReply, TransportError>;
}

// ////// //
// Errors //
// ////// //

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum TransportError {
    #[snafu(display("Invalid IPP target URI '{uri}': {message}"))]
    InvalidUri { uri: String, message: String },

    #[snafu(display("{operation} to {target} failed"))]
    Send {
        operation: IppOperation,
        target: String,
        source: ipp::error::IppError,
    },

    #[snafu(display("No answer from {target} within {}", humantime::format_duration(*timeout)))]
    Timeout { target: String, timeout: Duration },
}
