//! Printer discovery.
//!
//! Not every server answers the CUPS bulk query, so discovery walks through three stages and
//! stops at the first one that yields printers:
//!
//! 1. `CUPS-Get-Printers` against the server,
//! 2. `Get-Printer-Attributes` against the bare server URI,
//! 3. `Get-Printer-Attributes` against each configured probe name.

use ipp::model::StatusCode;
use log::{debug, info, warn};

use crate::ipp_client::models::{AttributeBag, IppOperation, IppRequest, PRINTER_ATTRIBUTES_TAG};

use super::client::CupsClient;
use super::error::Error;
use super::models::PrinterInfo;
use super::normalize::{groups_of, normalize_printer};

pub const PRINTER_ATTRIBUTES: [&str; 10] = [
    "printer-name",
    "printer-state",
    "printer-state-message",
    "printer-state-reasons",
    "printer-is-accepting-jobs",
    "printer-location",
    "printer-make-and-model",
    "printer-uri-supported",
    "printer-info",
    "queued-job-count",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryStage {
    BulkQuery,
    DirectQuery,
    NameProbe,
}

#[derive(Debug)]
pub enum StageOutcome {
    Found(Vec<PrinterInfo>),
    Failed(String),
}

#[derive(Debug)]
pub enum Transition {
    Next(DiscoveryStage),
    Done(Result<Vec<PrinterInfo>, Error>),
}

/// Decides what follows a stage. A stage that found nothing counts as failed.
pub fn advance(stage: DiscoveryStage, outcome: StageOutcome) -> Transition {
    match (stage, outcome) {
        (_, StageOutcome::Found(printers)) if !printers.is_empty() => Transition::Done(Ok(printers)),
        (DiscoveryStage::BulkQuery, _) => Transition::Next(DiscoveryStage::DirectQuery),
        (DiscoveryStage::DirectQuery, _) => Transition::Next(DiscoveryStage::NameProbe),
        (DiscoveryStage::NameProbe, _) => Transition::Done(Err(Error::NoPrinters)),
    }
}

impl CupsClient {
    pub async fn discover_printers(&self) -> Result<Vec<PrinterInfo>, Error> {
        let mut stage = DiscoveryStage::BulkQuery;
        loop {
            let outcome = match stage {
                DiscoveryStage::BulkQuery => self.bulk_query().await,
                DiscoveryStage::DirectQuery => self.direct_query().await,
                DiscoveryStage::NameProbe => self.probe_names().await,
            };
            match &outcome {
                StageOutcome::Found(printers) => info!("{:?} found {} printers", stage, printers.len()),
                StageOutcome::Failed(reason) => warn!("{:?} failed: {}", stage, reason),
            }

            match advance(stage, outcome) {
                Transition::Next(next) => stage = next,
                Transition::Done(result) => return result,
            }
        }
    }

    fn printer_query(&self, operation: IppOperation) -> IppRequest {
        IppRequest::new(operation)
            .operation_attribute("requesting-user-name", self.settings().requesting_user())
            .requested_attributes(&PRINTER_ATTRIBUTES)
    }

    async fn bulk_query(&self) -> StageOutcome {
        let request = self.printer_query(IppOperation::CupsGetPrinters);
        match self.send(&self.server_url(), request).await {
            Err(e) => StageOutcome::Failed(e.to_string()),
            Ok(reply) if is_server_error(reply.status) => {
                StageOutcome::Failed(format!("server answered {:?}", reply.status))
            }
            Ok(reply) => StageOutcome::Found(printers_in(&reply.attributes)),
        }
    }

    async fn direct_query(&self) -> StageOutcome {
        let request = self.printer_query(IppOperation::GetPrinterAttributes);
        match self.send(&self.server_url(), request).await {
            Err(e) => StageOutcome::Failed(e.to_string()),
            Ok(reply) if !reply.status.is_success() => {
                StageOutcome::Failed(format!("server answered {:?}", reply.status))
            }
            Ok(reply) => {
                let printer = normalize_printer(&reply.attributes);
                if printer.name.is_empty() {
                    StageOutcome::Found(printers_in(&reply.attributes))
                } else {
                    StageOutcome::Found(vec![printer])
                }
            }
        }
    }

    async fn probe_names(&self) -> StageOutcome {
        let names = &self.settings().probe_names;
        let mut found = Vec::new();

        for name in names {
            let request = self.printer_query(IppOperation::GetPrinterAttributes);
            match self.send(&self.printer_url(name), request).await {
                Ok(reply) if reply.status.is_success() => {
                    let mut printer = normalize_printer(&reply.attributes);
                    if printer.name.is_empty() {
                        printer.name = name.clone();
                    }
                    info!("Found printer by name: {}", name);
                    found.push(printer);
                }
                Ok(reply) => debug!("Probing printer {} answered {:?}", name, reply.status),
                Err(e) => debug!("Probing printer {} failed: {}", name, e),
            }
        }

        if found.is_empty() {
            StageOutcome::Failed(format!("none of the {} probe names answered", names.len()))
        } else {
            StageOutcome::Found(found)
        }
    }
}

/// Server-error class (0x0500-0x05ff), the answer of servers lacking the CUPS bulk query.
fn is_server_error(status: StatusCode) -> bool {
    (0x0500..=0x05ff).contains(&(status as u16))
}

/// Printers of a reply that carry a name.
fn printers_in(attributes: &AttributeBag) -> Vec<PrinterInfo> {
    groups_of(attributes, PRINTER_ATTRIBUTES_TAG)
        .into_iter()
        .map(normalize_printer)
        .filter(|printer| !printer.name.is_empty())
        .collect()
}
