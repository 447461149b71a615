//! Turns the attribute bags handed back by the print server into [`PrinterInfo`] and [`JobInfo`].
//!
//! Every function in here is total: an attribute that is missing, has an unexpected type or
//! cannot be parsed falls back to a default instead of failing.

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::ipp_client::models::{AttrValue, AttributeBag, JOB_ATTRIBUTES_TAG, PRINTER_ATTRIBUTES_TAG};

use super::models::{JobInfo, JobStatus, PrinterInfo, PrinterState};

pub const UNKNOWN_PRINTER: &str = "Unknown Printer";
pub const UNKNOWN_USER: &str = "Unknown User";
pub const UNTITLED: &str = "Untitled";

/// Merges an attribute group embedded under `tag` over the outer bag. Inner keys win.
pub fn flatten_group(raw: &AttributeBag, tag: &str) -> AttributeBag {
    let mut flat = raw.clone();
    if let Some(AttrValue::Bag(inner)) = raw.get(tag) {
        flat.extend(inner.iter().map(|(k, v)| (k.clone(), v.clone())));
    }
    flat
}

/// The groups stored under `tag`, whether the reply carries a single group or a list of them.
pub fn groups_of<'a>(raw: &'a AttributeBag, tag: &str) -> Vec<&'a AttributeBag> {
    match raw.get(tag) {
        Some(AttrValue::Bag(group)) => vec![group],
        Some(AttrValue::List(groups)) => groups.iter().filter_map(AttrValue::as_bag).collect(),
        _ => Vec::new(),
    }
}

pub fn normalize_printer(raw: &AttributeBag) -> PrinterInfo {
    let attributes = flatten_group(raw, PRINTER_ATTRIBUTES_TAG);
    let state = printer_state(attributes.get("printer-state"));

    PrinterInfo {
        name: text(&attributes, "printer-name").unwrap_or_default(),
        state,
        state_message: text(&attributes, "printer-state-message").unwrap_or_default(),
        state_reasons: text(&attributes, "printer-state-reasons").unwrap_or_default(),
        is_online: state != PrinterState::Stopped,
        is_accepting_jobs: attributes.get("printer-is-accepting-jobs").is_some_and(truthy),
        location: text(&attributes, "printer-location").unwrap_or_default(),
        model: text(&attributes, "printer-make-and-model").unwrap_or_default(),
        info: text(&attributes, "printer-info").unwrap_or_default(),
        queued_jobs: integer(&attributes, "queued-job-count")
            .and_then(|count| i32::try_from(count).ok())
            .unwrap_or(0),
    }
}

/// Returns `None` for bags without a usable `job-id`; such entries are dropped by callers.
pub fn normalize_job(raw: &AttributeBag, placeholder_printer: &str) -> Option<JobInfo> {
    normalize_job_at(raw, placeholder_printer, Utc::now())
}

pub fn normalize_job_at(raw: &AttributeBag, placeholder_printer: &str, now: DateTime<Utc>) -> Option<JobInfo> {
    let attributes = flatten_group(raw, JOB_ATTRIBUTES_TAG);
    let id = integer(&attributes, "job-id")
        .and_then(|id| i32::try_from(id).ok())
        .filter(|id| *id != 0)?;

    let filename = text(&attributes, "job-name").unwrap_or_else(|| UNTITLED.to_string());

    Some(JobInfo {
        id,
        printer: job_printer(&attributes, placeholder_printer),
        filename: recover_filename(&filename),
        status: job_status(attributes.get("job-state")),
        submitted_at: submitted_at(&attributes, now),
        owner_user: text(&attributes, "job-originating-user-name").unwrap_or_else(|| UNKNOWN_USER.to_string()),
        pages: integer(&attributes, "job-pages")
            .and_then(|pages| i32::try_from(pages).ok())
            .unwrap_or(0),
    })
}

pub fn printer_state(raw: Option<&AttrValue>) -> PrinterState {
    let Some(raw) = raw else {
        return PrinterState::Unknown;
    };
    match raw.as_integer() {
        Some(3) => PrinterState::Idle,
        Some(4) => PrinterState::Processing,
        Some(5) => PrinterState::Stopped,
        Some(_) => PrinterState::Unknown,
        None => match raw.as_text().map(str::trim) {
            Some("idle") => PrinterState::Idle,
            Some("processing") => PrinterState::Processing,
            Some("stopped") => PrinterState::Stopped,
            _ => PrinterState::Unknown,
        },
    }
}

/// Unrecognized or missing states map to [`JobStatus::Pending`].
pub fn job_status(raw: Option<&AttrValue>) -> JobStatus {
    let Some(raw) = raw else {
        return JobStatus::Pending;
    };
    match raw.as_integer() {
        Some(4) => JobStatus::Processing,
        Some(5) => JobStatus::Completed,
        Some(6) => JobStatus::Cancelled,
        Some(7) => JobStatus::Aborted,
        Some(_) => JobStatus::Pending,
        None => match raw.as_text().map(str::trim) {
            Some("processing") => JobStatus::Processing,
            Some("completed") => JobStatus::Completed,
            Some("canceled") | Some("cancelled") => JobStatus::Cancelled,
            Some("aborted") => JobStatus::Aborted,
            Some("stopped") | Some("processing-stopped") => JobStatus::Stopped,
            _ => JobStatus::Pending,
        },
    }
}

/// Creation time of a job: `time-at-creation` (epoch seconds), then `date-time-at-creation`
/// (epoch seconds, ISO-8601 text or a date value), then `now`.
pub fn submitted_at(attributes: &AttributeBag, now: DateTime<Utc>) -> DateTime<Utc> {
    if let Some(at) = attributes
        .get("time-at-creation")
        .and_then(AttrValue::as_integer)
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
    {
        return at;
    }

    let from_date_time = match attributes.get("date-time-at-creation") {
        Some(AttrValue::DateTime(at)) => Some(*at),
        Some(AttrValue::Integer(secs)) => DateTime::from_timestamp(*secs, 0),
        Some(AttrValue::Text(text)) => parse_timestamp(text),
        _ => None,
    };
    from_date_time.unwrap_or(now)
}

fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(at) = DateTime::parse_from_rfc3339(text) {
        return Some(at.with_timezone(&Utc));
    }
    if let Ok(secs) = text.parse::<i64>() {
        return DateTime::from_timestamp(secs, 0);
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .map(|naive| naive.and_utc())
}

/// Printer a job belongs to: the trailing `/printers/<name>` segment of its printer URI, then
/// `printer-name`, then the placeholder for jobs that only carry a `job-uri`.
///
/// A job-uri does not name its printer, so the placeholder is a guess.
pub fn job_printer(attributes: &AttributeBag, placeholder_printer: &str) -> String {
    ["printer-uri", "job-printer-uri"]
        .iter()
        .filter_map(|name| text(attributes, name))
        .find_map(|uri| printer_from_uri(&uri))
        .or_else(|| text(attributes, "printer-name"))
        .unwrap_or_else(|| {
            if attributes.contains_key("job-uri") {
                placeholder_printer.to_string()
            } else {
                UNKNOWN_PRINTER.to_string()
            }
        })
}

pub fn printer_from_uri(uri: &str) -> Option<String> {
    let (_, name) = uri.rsplit_once("/printers/")?;
    (!name.is_empty() && !name.contains('/')).then(|| name.to_string())
}

/// Undoes UTF-8 text that was decoded as Latin-1 on the way in (`rÃ©sumÃ©.pdf` becomes
/// `résumé.pdf`). Strings that do not decode that way are returned unchanged.
pub fn recover_filename(raw: &str) -> String {
    let latin1: Option<Vec<u8>> = raw.chars().map(|c| u8::try_from(c).ok()).collect();
    latin1
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .unwrap_or_else(|| raw.to_string())
}

fn text(attributes: &AttributeBag, name: &str) -> Option<String> {
    match attributes.get(name)? {
        AttrValue::Bag(_) => None,
        value => Some(value.to_string()).filter(|t| !t.is_empty()),
    }
}

fn integer(attributes: &AttributeBag, name: &str) -> Option<i64> {
    attributes.get(name).and_then(AttrValue::as_integer)
}

fn truthy(value: &AttrValue) -> bool {
    match value {
        AttrValue::Boolean(b) => *b,
        AttrValue::Integer(n) => *n != 0,
        AttrValue::Text(t) => t.eq_ignore_ascii_case("true") || t == "1",
        AttrValue::List(values) => values.first().is_some_and(truthy),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::ipp_client::fake::bag;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap()
    }

    #[test]
    fn printer_state_is_the_same_for_codes_and_keywords() {
        for (code, keyword, expected) in [
            (3, "idle", PrinterState::Idle),
            (4, "processing", PrinterState::Processing),
            (5, "stopped", PrinterState::Stopped),
        ] {
            assert_eq!(printer_state(Some(&AttrValue::Integer(code))), expected);
            assert_eq!(printer_state(Some(&AttrValue::from(keyword))), expected);
            assert_eq!(printer_state(Some(&AttrValue::from(code.to_string()))), expected);
        }
        assert_eq!(printer_state(Some(&AttrValue::Integer(9))), PrinterState::Unknown);
        assert_eq!(printer_state(Some(&AttrValue::from("warming-up"))), PrinterState::Unknown);
        assert_eq!(printer_state(Some(&AttrValue::Boolean(true))), PrinterState::Unknown);
        assert_eq!(printer_state(None), PrinterState::Unknown);
    }

    #[test]
    fn job_status_is_the_same_for_codes_and_keywords() {
        for (code, keyword, expected) in [
            (3, "pending", JobStatus::Pending),
            (4, "processing", JobStatus::Processing),
            (5, "completed", JobStatus::Completed),
            (6, "cancelled", JobStatus::Cancelled),
            (7, "aborted", JobStatus::Aborted),
        ] {
            assert_eq!(job_status(Some(&AttrValue::Integer(code))), expected);
            assert_eq!(job_status(Some(&AttrValue::from(keyword))), expected);
        }
        assert_eq!(job_status(Some(&AttrValue::from("canceled"))), JobStatus::Cancelled);
        assert_eq!(job_status(Some(&AttrValue::from("stopped"))), JobStatus::Stopped);
    }

    #[test]
    fn unrecognized_job_state_defaults_to_pending() {
        assert_eq!(job_status(Some(&AttrValue::Integer(42))), JobStatus::Pending);
        assert_eq!(job_status(Some(&AttrValue::from("mystery"))), JobStatus::Pending);
        assert_eq!(job_status(None), JobStatus::Pending);
    }

    #[test]
    fn printer_fields_and_defaults() {
        let raw = bag([
            ("printer-name", "office1".into()),
            ("printer-state", AttrValue::Integer(5)),
            ("printer-location", "2nd floor".into()),
            ("printer-is-accepting-jobs", true.into()),
        ]);
        let printer = normalize_printer(&raw);
        assert_eq!(printer.name, "office1");
        assert_eq!(printer.state, PrinterState::Stopped);
        assert!(!printer.is_online);
        assert!(printer.is_accepting_jobs);
        assert_eq!(printer.location, "2nd floor");
        assert_eq!(printer.model, "");
        assert_eq!(printer.queued_jobs, 0);

        let bare = normalize_printer(&AttributeBag::new());
        assert_eq!(bare.state, PrinterState::Unknown);
        assert!(bare.is_online);
        assert!(!bare.is_accepting_jobs);
    }

    #[test]
    fn nested_group_keys_take_precedence() {
        let inner = bag([
            ("printer-name", "inner".into()),
            ("queued-job-count", AttrValue::Integer(4)),
        ]);
        let raw = bag([
            ("printer-name", "outer".into()),
            ("printer-info", "from outer".into()),
            (PRINTER_ATTRIBUTES_TAG, AttrValue::Bag(inner)),
        ]);
        let printer = normalize_printer(&raw);
        assert_eq!(printer.name, "inner");
        assert_eq!(printer.info, "from outer");
        assert_eq!(printer.queued_jobs, 4);
    }

    #[test]
    fn job_without_id_is_dropped() {
        let raw = bag([("job-name", "a.pdf".into()), ("job-state", AttrValue::Integer(3))]);
        assert_eq!(normalize_job_at(&raw, "7100cn", now()), None);
        assert_eq!(normalize_job_at(&bag([("job-id", "abc".into())]), "7100cn", now()), None);
        assert_eq!(normalize_job_at(&AttributeBag::new(), "7100cn", now()), None);
    }

    #[test]
    fn job_fields_and_defaults() {
        let raw = bag([
            ("job-id", AttrValue::Integer(12)),
            ("job-state", "canceled".into()),
            ("printer-uri", "ipp://cups:631/printers/office1".into()),
            ("job-pages", AttrValue::Integer(3)),
        ]);
        let job = normalize_job_at(&raw, "7100cn", now()).unwrap();
        assert_eq!(job.id, 12);
        assert_eq!(job.printer, "office1");
        assert_eq!(job.filename, UNTITLED);
        assert_eq!(job.status, JobStatus::Cancelled);
        assert_eq!(job.submitted_at, now());
        assert_eq!(job.owner_user, UNKNOWN_USER);
        assert_eq!(job.pages, 3);
    }

    #[test]
    fn printer_attribution_order() {
        let with_uri = bag([
            ("printer-uri", "http://cups:631/printers/lab".into()),
            ("printer-name", "ignored".into()),
            ("job-uri", "http://cups:631/jobs/3".into()),
        ]);
        assert_eq!(job_printer(&with_uri, "7100cn"), "lab");

        let with_name = bag([
            ("printer-uri", "http://cups:631/classes/all".into()),
            ("printer-name", "desk".into()),
        ]);
        assert_eq!(job_printer(&with_name, "7100cn"), "desk");

        let job_uri_only = bag([("job-uri", "http://cups:631/jobs/3".into())]);
        assert_eq!(job_printer(&job_uri_only, "7100cn"), "7100cn");

        assert_eq!(job_printer(&AttributeBag::new(), "7100cn"), UNKNOWN_PRINTER);
    }

    #[test]
    fn job_printer_uri_is_a_uri_candidate() {
        let raw = bag([("job-printer-uri", "ipp://cups/printers/front-desk".into())]);
        assert_eq!(job_printer(&raw, "7100cn"), "front-desk");
    }

    #[test]
    fn printer_from_uri_needs_a_trailing_segment() {
        assert_eq!(printer_from_uri("ipp://h/printers/a"), Some("a".to_string()));
        assert_eq!(printer_from_uri("ipp://h/printers/"), None);
        assert_eq!(printer_from_uri("ipp://h/printers/a/extra"), None);
        assert_eq!(printer_from_uri("ipp://h/jobs/7"), None);
    }

    #[test]
    fn time_at_creation_is_preferred() {
        let raw = bag([
            ("time-at-creation", AttrValue::Integer(1_700_000_000)),
            ("date-time-at-creation", "2020-01-01T00:00:00Z".into()),
        ]);
        assert_eq!(submitted_at(&raw, now()), Utc.timestamp_opt(1_700_000_000, 0).unwrap());
    }

    #[test]
    fn date_time_at_creation_encodings() {
        let iso = bag([("date-time-at-creation", "2024-05-06T07:08:09+02:00".into())]);
        assert_eq!(submitted_at(&iso, now()), Utc.with_ymd_and_hms(2024, 5, 6, 5, 8, 9).unwrap());

        let epoch = bag([("date-time-at-creation", AttrValue::Integer(86_400))]);
        assert_eq!(submitted_at(&epoch, now()), Utc.with_ymd_and_hms(1970, 1, 2, 0, 0, 0).unwrap());

        let native = Utc.with_ymd_and_hms(2023, 12, 24, 18, 0, 0).unwrap();
        let date = bag([("date-time-at-creation", AttrValue::DateTime(native))]);
        assert_eq!(submitted_at(&date, now()), native);
    }

    #[test]
    fn unparseable_or_missing_creation_time_is_now() {
        let garbage = bag([("date-time-at-creation", "yesterday-ish".into())]);
        assert_eq!(submitted_at(&garbage, now()), now());
        assert_eq!(submitted_at(&AttributeBag::new(), now()), now());
    }

    #[test]
    fn filename_recovery_repairs_latin1_mojibake() {
        assert_eq!(recover_filename("rÃ©sumÃ©.pdf"), "résumé.pdf");
        let mangled: String = "报告.pdf".bytes().map(char::from).collect();
        assert_eq!(recover_filename(&mangled), "报告.pdf");
    }

    #[test]
    fn filename_recovery_leaves_correct_text_alone() {
        for name in ["report.pdf", "résumé.pdf", "报告.pdf", "naïve café.txt"] {
            assert_eq!(recover_filename(name), name);
            assert_eq!(recover_filename(&recover_filename(name)), name);
        }
    }

    #[test]
    fn job_names_are_recovered() {
        let raw = bag([("job-id", AttrValue::Integer(1)), ("job-name", "rÃ©sumÃ©.pdf".into())]);
        assert_eq!(normalize_job_at(&raw, "7100cn", now()).unwrap().filename, "résumé.pdf");
    }
}
