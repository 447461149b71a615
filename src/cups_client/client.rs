use std::sync::Arc;

use snafu::ResultExt;
use url::Url;

use crate::config::models::Cups;
use crate::ipp_client::models::{IppReply, IppRequest};
use crate::ipp_client::{IppTransport, TransportError};

use super::error::{Error, RejectedSnafu, TransportSnafu};

/// Entry point for everything the gateway asks of the print server.
///
/// Holds no state besides the transport and the settings; the operations themselves live in
/// the `discovery`, `jobs`, `status` and `submit` modules.
pub struct CupsClient {
    transport: Arc<dyn IppTransport>,
    settings: Cups,
}

impl CupsClient {
    pub fn new(transport: Arc<dyn IppTransport>, settings: Cups) -> Self {
        CupsClient { transport, settings }
    }

    pub fn settings(&self) -> &Cups {
        &self.settings
    }

    pub fn server_url(&self) -> String {
        build_cups_url(&self.settings, None)
    }

    pub fn printer_url(&self, printer: &str) -> String {
        build_cups_url(&self.settings, Some(printer))
    }

    /// Raw call, for callers that inspect the status themselves.
    pub(crate) async fn send(&self, target: &str, request: IppRequest) -> Result<IppReply, TransportError> {
        self.transport.execute(target, request).await
    }

    /// Call that only succeeds when the server answers with a successful status.
    pub(crate) async fn call(&self, target: &str, request: IppRequest) -> Result<IppReply, Error> {
        let operation = request.operation;
        let reply = self.send(target, request).await.context(TransportSnafu { operation })?;
        if !reply.status.is_success() {
            return RejectedSnafu { operation, status: reply.status }.fail();
        }
        Ok(reply)
    }
}

/// Server URI (scheme, host and port of the configured URI) or the URI of one of its printers.
pub fn build_cups_url(cups_settings: &Cups, queue_id: Option<&str>) -> String {
    let Ok(mut cups_url) = Url::parse(&cups_settings.uri) else {
        let base = cups_settings.uri.trim_end_matches('/');
        return match queue_id {
            Some(queue_id) => format!("{base}/printers/{queue_id}"),
            None => base.to_string(),
        };
    };
    cups_url.set_query(None);
    cups_url.set_fragment(None);

    match queue_id {
        Some(queue_id) => {
            if let Ok(mut segments) = cups_url.path_segments_mut() {
                segments.clear().push("printers").push(queue_id);
            }
            cups_url.to_string()
        }
        None => {
            cups_url.set_path("");
            cups_url.to_string().trim_end_matches('/').to_string()
        }
    }
}
