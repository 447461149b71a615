use ipp::model::StatusCode;
use snafu::Snafu;

use crate::ipp_client::models::IppOperation;
use crate::ipp_client::TransportError;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display("{operation} could not reach the print server"))]
    Transport {
        operation: IppOperation,
        source: TransportError,
    },

    #[snafu(display("{operation} was answered with {status:?}"))]
    Rejected {
        operation: IppOperation,
        status: StatusCode,
    },

    #[snafu(display("No printers found on the print server"))]
    NoPrinters,

    #[snafu(display("A printer name is required"))]
    MissingPrinter,
}

impl Error {
    /// Caller supplied input was invalid; nothing went wrong on the print server side.
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::MissingPrinter)
    }
}
