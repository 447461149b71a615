use chrono::{DateTime, Utc};
use serde_derive::{Deserialize, Serialize};

use crate::cups_client::models::PrintReceipt;
use crate::cups_client::normalize::recover_filename;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryStatus {
    Success,
    Cancelled,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRecord {
    pub id: i64,
    pub filename: String,
    pub printer: String,
    pub printed_at: DateTime<Utc>,
    pub status: HistoryStatus,
    pub size: String,
    pub user: String,
}

impl HistoryRecord {
    pub fn printed(receipt: &PrintReceipt, printer: &str, size_bytes: u64, user: &str) -> Self {
        HistoryRecord {
            id: receipt.job_id,
            filename: receipt.job_name.clone(),
            printer: printer.to_string(),
            printed_at: Utc::now(),
            status: HistoryStatus::Success,
            size: format_file_size(size_bytes),
            user: user.to_string(),
        }
    }

    /// A submission the print server never accepted. Gets a local, timestamp based id.
    pub fn failed(filename: &str, printer: &str, size_bytes: u64, user: &str) -> Self {
        let printed_at = Utc::now();
        HistoryRecord {
            id: printed_at.timestamp_millis(),
            filename: recover_filename(filename),
            printer: printer.to_string(),
            printed_at,
            status: HistoryStatus::Failed,
            size: format_file_size(size_bytes),
            user: user.to_string(),
        }
    }
}

/// `0 Bytes`, `512 Bytes`, `1.5 KB`, `2 MB`: base 1024, at most two decimals.
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];
    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    let rounded = (value * 100.0).round() / 100.0;
    format!("{} {}", rounded, UNITS[unit])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_sizes() {
        assert_eq!(format_file_size(0), "0 Bytes");
        assert_eq!(format_file_size(512), "512 Bytes");
        assert_eq!(format_file_size(1536), "1.5 KB");
        assert_eq!(format_file_size(2 * 1024 * 1024), "2 MB");
        assert_eq!(format_file_size(1_234_567), "1.18 MB");
        assert_eq!(format_file_size(5 * 1024 * 1024 * 1024 * 1024), "5120 GB");
    }

    #[test]
    fn json_shape() {
        let record = HistoryRecord {
            id: 42,
            filename: "report.pdf".to_string(),
            printer: "office1".to_string(),
            printed_at: DateTime::from_timestamp(0, 0).unwrap(),
            status: HistoryStatus::Success,
            size: "1 KB".to_string(),
            user: "alice".to_string(),
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["printedAt"], "1970-01-01T00:00:00Z");
        assert_eq!(json["status"], "success");
        assert_eq!(json["id"], 42);
    }
}
