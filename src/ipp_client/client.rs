use std::{io::Cursor, sync::Arc, time::Duration};

use async_trait::async_trait;
use chrono::{FixedOffset, NaiveDate, TimeZone, Utc};
use dashmap::DashMap;
use ipp::model::{JobState, PrinterState};
use ipp::prelude::*;
use log::debug;
use snafu::ResultExt;

use crate::config::models::Cups;

use super::models::{
    AttrValue, AttributeBag, IppOperation, IppReply, IppRequest, JOB_ATTRIBUTES_TAG,
    OPERATION_ATTRIBUTES_TAG, PRINTER_ATTRIBUTES_TAG,
};
use super::{InvalidUriSnafu, IppTransport, SendSnafu, TimeoutSnafu, TransportError};

/// [`IppTransport`] backed by the `ipp` crate's async client.
///
/// Clients are pooled by target URI, every call is bounded by the configured request timeout.
pub struct CupsTransport {
    ignore_tls_errors: bool,
    credentials: Option<(String, String)>,
    timeout: Duration,
    clients: DashMap<String, Arc<AsyncIppClient>>,
}

impl CupsTransport {
    pub fn new(cups_settings: &Cups) -> Self {
        let credentials = cups_settings
            .has_credentials()
            .then(|| (cups_settings.username.clone(), cups_settings.password.clone()));
        CupsTransport {
            ignore_tls_errors: cups_settings.ignore_tls_errors,
            credentials,
            timeout: cups_settings.request_timeout,
            clients: DashMap::new(),
        }
    }

    fn client_for(&self, target: &str, uri: &Uri) -> Arc<AsyncIppClient> {
        self.clients
            .entry(target.to_string())
            .or_insert_with(|| {
                let mut builder = AsyncIppClient::builder(uri.clone()).ignore_tls_errors(self.ignore_tls_errors);
                if let Some((username, password)) = &self.credentials {
                    builder = builder.basic_auth(username, password);
                }
                Arc::new(builder.build())
            })
            .value()
            .clone()
    }
}

#[async_trait]
impl IppTransport for CupsTransport {
    async fn execute(&self, target: &str, request: IppRequest) -> Result<IppReply, TransportError> {
        let uri: Uri = match target.parse() {
            Ok(uri) => uri,
            Err(e) => return InvalidUriSnafu { uri: target, message: e.to_string() }.fail(),
        };
        let client = self.client_for(target, &uri);
        let operation = request.operation;

        debug!("Sending {} to {}", operation, target);
        let response = if operation == IppOperation::PrintJob {
            tokio::time::timeout(self.timeout, client.send(build_print_job(uri, request))).await
        } else {
            tokio::time::timeout(self.timeout, client.send(build_request(uri, request))).await
        }
        .map_err(|_| TimeoutSnafu { target, timeout: self.timeout }.build())?
        .context(SendSnafu { operation, target })?;

        let status = response.header().status_code();
        debug!("{} to {} answered {:?}", operation, target, status);
        Ok(IppReply { status, attributes: reshape_response(response.attributes()) })
    }
}

fn to_ipp_operation(operation: IppOperation) -> Operation {
    match operation {
        IppOperation::CupsGetPrinters => Operation::CupsGetPrinters,
        IppOperation::GetPrinterAttributes => Operation::GetPrinterAttributes,
        IppOperation::GetJobs => Operation::GetJobs,
        IppOperation::PrintJob => Operation::PrintJob,
        IppOperation::CancelJob => Operation::CancelJob,
    }
}

fn build_request(uri: Uri, request: IppRequest) -> IppRequestResponse {
    let mut req = IppRequestResponse::new(
        IppVersion::v1_1(),
        to_ipp_operation(request.operation),
        Some(uri)
    );
    for (name, value) in &request.operation_attributes {
        req.attributes_mut().add(
            DelimiterTag::OperationAttributes,
            IppAttribute::new(name.as_str(), to_ipp_value(name, value)),
        );
    }
    for (name, value) in &request.job_attributes {
        req.attributes_mut().add(
            DelimiterTag::JobAttributes,
            IppAttribute::new(name.as_str(), to_ipp_value(name, value)),
        );
    }
    req
}

fn build_print_job(uri: Uri, request: IppRequest) -> impl ipp::operation::IppOperation {
    let payload = IppPayload::new(Cursor::new(request.document.unwrap_or_default()));
    let mut print_job = IppOperationBuilder::print_job(uri, payload);

    let operation_attributes = &request.operation_attributes;
    if let Some(user) = operation_attributes.get("requesting-user-name") {
        print_job = print_job.user_name(user.to_string());
    }
    if let Some(job_name) = operation_attributes.get("job-name") {
        print_job = print_job.job_title(job_name.to_string());
    }
    if let Some(format) = operation_attributes.get("document-format") {
        print_job = print_job.document_format(format.to_string());
    }
    for (name, value) in &request.job_attributes {
        print_job = print_job.attribute(IppAttribute::new(name.as_str(), to_ipp_value(name, value)));
    }

    print_job.build()
}

/// Picks the IPP syntax for an outgoing attribute.
fn to_ipp_value(name: &str, value: &AttrValue) -> IppValue {
    match value {
        AttrValue::Integer(v) => IppValue::Integer(i32::try_from(*v).unwrap_or(i32::MAX)),
        AttrValue::Boolean(v) => IppValue::Boolean(*v),
        AttrValue::Text(v) => match name {
            "requesting-user-name" | "job-name" => IppValue::NameWithoutLanguage(v.clone()),
            "document-format" => IppValue::MimeMediaType(v.clone()),
            n if n.ends_with("-uri") => IppValue::Uri(v.clone()),
            _ => IppValue::Keyword(v.clone()),
        },
        AttrValue::DateTime(v) => IppValue::TextWithoutLanguage(v.to_rfc3339()),
        AttrValue::List(values) => IppValue::Array(values.iter().map(|v| to_ipp_value(name, v)).collect()),
        AttrValue::Bag(_) => IppValue::NoValue,
    }
}

/// Regroups a response into one bag entry per delimiter tag. A tag that occurs once maps to a
/// bag, a repeated tag (one group per printer or job) maps to a list of bags.
fn reshape_response(attributes: &IppAttributes) -> AttributeBag {
    let mut reshaped = AttributeBag::new();

    for group in attributes.groups() {
        let key = match group.tag() {
            DelimiterTag::OperationAttributes => OPERATION_ATTRIBUTES_TAG,
            DelimiterTag::PrinterAttributes => PRINTER_ATTRIBUTES_TAG,
            DelimiterTag::JobAttributes => JOB_ATTRIBUTES_TAG,
            _ => continue,
        };
        let bag: AttributeBag = group
            .attributes()
            .iter()
            .map(|(name, attribute)| (name.clone(), from_ipp_value(name, attribute.value())))
            .collect();

        let merged = match reshaped.remove(key) {
            None => AttrValue::Bag(bag),
            Some(AttrValue::List(mut groups)) => {
                groups.push(AttrValue::Bag(bag));
                AttrValue::List(groups)
            }
            Some(previous) => AttrValue::List(vec![previous, AttrValue::Bag(bag)]),
        };
        reshaped.insert(key.to_string(), merged);
    }

    reshaped
}

fn from_ipp_value(name: &str, value: &IppValue) -> AttrValue {
    match value {
        IppValue::Integer(v) => AttrValue::Integer(i64::from(*v)),
        IppValue::Enum(v) => match state_keyword(name, *v) {
            Some(keyword) => AttrValue::Text(keyword.to_string()),
            None => AttrValue::Integer(i64::from(*v)),
        },
        IppValue::Boolean(v) => AttrValue::Boolean(*v),
        IppValue::Array(values) => AttrValue::List(values.iter().map(|v| from_ipp_value(name, v)).collect()),
        IppValue::DateTime {
            year,
            month,
            day,
            hour,
            minutes,
            seconds,
            deci_seconds,
            utc_dir,
            utc_hours,
            utc_mins,
        } => {
            let offset_secs = (i32::from(*utc_hours) * 3600 + i32::from(*utc_mins) * 60)
                * if *utc_dir == '-' { -1 } else { 1 };
            NaiveDate::from_ymd_opt(i32::from(*year), u32::from(*month), u32::from(*day))
                .and_then(|date| {
                    date.and_hms_milli_opt(
                        u32::from(*hour),
                        u32::from(*minutes),
                        u32::from(*seconds),
                        u32::from(*deci_seconds) * 100,
                    )
                })
                .zip(FixedOffset::east_opt(offset_secs))
                .and_then(|(naive, offset)| offset.from_local_datetime(&naive).single())
                .map(|dt| AttrValue::DateTime(dt.with_timezone(&Utc)))
                .unwrap_or_else(|| AttrValue::Text(value.to_string()))
        }
        IppValue::NoValue => AttrValue::Text(String::new()),
        other => AttrValue::Text(other.to_string()),
    }
}

/// Keywords for the printer and job state enums.
fn state_keyword(name: &str, value: i32) -> Option<&'static str> {
    match name {
        "printer-state" => PrinterState::from_i32(value).map(|state| match state {
            PrinterState::Idle => "idle",
            PrinterState::Processing => "processing",
            PrinterState::Stopped => "stopped",
        }),
        "job-state" => JobState::from_i32(value).map(|state| match state {
            JobState::Pending => "pending",
            JobState::PendingHeld => "pending-held",
            JobState::Processing => "processing",
            JobState::ProcessingStopped => "processing-stopped",
            JobState::Canceled => "canceled",
            JobState::Aborted => "aborted",
            JobState::Completed => "completed",
        }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enum_states_become_keywords() {
        assert_eq!(from_ipp_value("printer-state", &IppValue::Enum(5)), AttrValue::from("stopped"));
        assert_eq!(from_ipp_value("job-state", &IppValue::Enum(9)), AttrValue::from("completed"));
        assert_eq!(from_ipp_value("job-state", &IppValue::Enum(7)), AttrValue::from("canceled"));
        assert_eq!(from_ipp_value("orientation-requested", &IppValue::Enum(3)), AttrValue::Integer(3));
        assert_eq!(from_ipp_value("job-state", &IppValue::Enum(12)), AttrValue::Integer(12));
    }

    #[test]
    fn date_time_is_normalized_to_utc() {
        let value = IppValue::DateTime {
            year: 2024,
            month: 3,
            day: 1,
            hour: 12,
            minutes: 30,
            seconds: 0,
            deci_seconds: 0,
            utc_dir: '+',
            utc_hours: 2,
            utc_mins: 0,
        };
        let converted = from_ipp_value("date-time-at-creation", &value);
        let expected = Utc.with_ymd_and_hms(2024, 3, 1, 10, 30, 0).unwrap();
        assert_eq!(converted, AttrValue::DateTime(expected));
    }

    #[test]
    fn outgoing_syntax_follows_attribute_name() {
        assert!(matches!(to_ipp_value("job-name", &AttrValue::from("a.pdf")), IppValue::NameWithoutLanguage(_)));
        assert!(matches!(to_ipp_value("document-format", &AttrValue::from("application/pdf")), IppValue::MimeMediaType(_)));
        assert!(matches!(to_ipp_value("which-jobs", &AttrValue::from("all")), IppValue::Keyword(_)));
        assert!(matches!(to_ipp_value("copies", &AttrValue::Integer(2)), IppValue::Integer(2)));
    }

    fn find_attribute(request: &IppRequestResponse, name: &str) -> Option<IppValue> {
        request
            .attributes()
            .groups()
            .iter()
            .find_map(|group| group.attributes().get(name))
            .map(|attribute| attribute.value().clone())
    }

    #[test]
    fn print_job_carries_the_document_metadata() {
        let uri: Uri = "http://cups.test:631/printers/office1".parse().unwrap();
        let request = IppRequest::new(IppOperation::PrintJob)
            .operation_attribute("requesting-user-name", "alice")
            .operation_attribute("job-name", "report.pdf")
            .operation_attribute("document-format", "application/pdf")
            .job_attribute("copies", 2i64)
            .document(b"%PDF-1.7".to_vec());

        let print_job = ipp::operation::IppOperation::into_ipp_request(build_print_job(uri, request));

        assert_eq!(print_job.header().operation_or_status, Operation::PrintJob as u16);
        assert_eq!(find_attribute(&print_job, "job-name").map(|v| v.to_string()), Some("report.pdf".to_string()));
        assert!(matches!(find_attribute(&print_job, "copies"), Some(IppValue::Integer(2))));
    }
}
