use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

use chrono::{DateTime, Utc};
use ipp::model::StatusCode;

/// Loosely typed attribute values, as handed back by the print server.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Integer(i64),
    Boolean(bool),
    Text(String),
    DateTime(DateTime<Utc>),
    List(Vec<AttrValue>),
    Bag(AttributeBag),
}

pub type AttributeBag = BTreeMap<String, AttrValue>;

impl AttrValue {
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            AttrValue::Integer(v) => Some(*v),
            AttrValue::Text(v) => v.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            AttrValue::Text(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bag(&self) -> Option<&AttributeBag> {
        match self {
            AttrValue::Bag(v) => Some(v),
            _ => None,
        }
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        AttrValue::Text(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        AttrValue::Text(value)
    }
}

impl From<i64> for AttrValue {
    fn from(value: i64) -> Self {
        AttrValue::Integer(value)
    }
}

impl From<bool> for AttrValue {
    fn from(value: bool) -> Self {
        AttrValue::Boolean(value)
    }
}

impl From<AttributeBag> for AttrValue {
    fn from(value: AttributeBag) -> Self {
        AttrValue::Bag(value)
    }
}

impl Display for AttrValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            AttrValue::Integer(v) => write!(f, "{v}"),
            AttrValue::Boolean(v) => write!(f, "{v}"),
            AttrValue::Text(v) => f.write_str(v),
            AttrValue::DateTime(v) => write!(f, "{}", v.to_rfc3339()),
            AttrValue::List(values) => {
                let parts: Vec<String> = values.iter().map(|v| v.to_string()).collect();
                f.write_str(&parts.join(","))
            }
            AttrValue::Bag(bag) => write!(f, "{{{} attributes}}", bag.len()),
        }
    }
}

// ////////////// //
// Delimiter tags //
// ////////////// //

pub const OPERATION_ATTRIBUTES_TAG: &str = "operation-attributes-tag";
pub const PRINTER_ATTRIBUTES_TAG: &str = "printer-attributes-tag";
pub const JOB_ATTRIBUTES_TAG: &str = "job-attributes-tag";

// ////////// //
// Operations //
// ////////// //

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IppOperation {
    CupsGetPrinters,
    GetPrinterAttributes,
    GetJobs,
    PrintJob,
    CancelJob,
}

impl Display for IppOperation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            IppOperation::CupsGetPrinters => "CUPS-Get-Printers",
            IppOperation::GetPrinterAttributes => "Get-Printer-Attributes",
            IppOperation::GetJobs => "Get-Jobs",
            IppOperation::PrintJob => "Print-Job",
            IppOperation::CancelJob => "Cancel-Job",
        })
    }
}

#[derive(Debug, Clone)]
pub struct IppRequest {
    pub operation: IppOperation,
    pub operation_attributes: AttributeBag,
    pub job_attributes: AttributeBag,
    pub document: Option<Vec<u8>>,
}

impl IppRequest {
    pub fn new(operation: IppOperation) -> Self {
        IppRequest {
            operation,
            operation_attributes: AttributeBag::new(),
            job_attributes: AttributeBag::new(),
            document: None,
        }
    }

    pub fn operation_attribute(mut self, name: &str, value: impl Into<AttrValue>) -> Self {
        self.operation_attributes.insert(name.to_string(), value.into());
        self
    }

    pub fn job_attribute(mut self, name: &str, value: impl Into<AttrValue>) -> Self {
        self.job_attributes.insert(name.to_string(), value.into());
        self
    }

    pub fn requested_attributes(self, names: &[&str]) -> Self {
        let names = names.iter().map(|n| AttrValue::from(*n)).collect();
        self.operation_attribute("requested-attributes", AttrValue::List(names))
    }

    pub fn document(mut self, document: Vec<u8>) -> Self {
        self.document = Some(document);
        self
    }
}

#[derive(Debug, Clone)]
pub struct IppReply {
    pub status: StatusCode,
    pub attributes: AttributeBag,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_from_text() {
        assert_eq!(AttrValue::from(" 12 ").as_integer(), Some(12));
        assert_eq!(AttrValue::from("idle").as_integer(), None);
        assert_eq!(AttrValue::Boolean(true).as_integer(), None);
    }
}
