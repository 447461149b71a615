//! Scripted stand-in for a print server.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use ipp::model::StatusCode;

use super::models::{AttrValue, AttributeBag, IppOperation, IppReply, IppRequest};
use super::{IppTransport, TransportError};

type Handler = dyn Fn(&str, &IppRequest) -> Result<IppReply, TransportError> + Send + Sync;

pub struct FakeTransport {
    handler: Box<Handler>,
    calls: Mutex<Vec<(String, IppRequest)>>,
}

impl FakeTransport {
    pub fn new(handler: impl Fn(&str, &IppRequest) -> Result<IppReply, TransportError> + Send + Sync + 'static) -> Self {
        FakeTransport { handler: Box::new(handler), calls: Mutex::new(Vec::new()) }
    }

    /// Every call made so far, as (target, request).
    pub fn calls(&self) -> Vec<(String, IppRequest)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn operations(&self) -> Vec<(String, IppOperation)> {
        self.calls().into_iter().map(|(target, request)| (target, request.operation)).collect()
    }
}

#[async_trait]
impl IppTransport for FakeTransport {
    async fn execute(&self, target: &str, request: IppRequest) -> Result<IppReply, TransportError> {
        self.calls.lock().unwrap().push((target.to_string(), request.clone()));
        (self.handler)(target, &request)
    }
}

pub fn unreachable(target: &str) -> TransportError {
    TransportError::Timeout { target: target.to_string(), timeout: Duration::from_secs(15) }
}

pub fn reply(status: StatusCode, attributes: AttributeBag) -> Result<IppReply, TransportError> {
    Ok(IppReply { status, attributes })
}

/// Builds a bag from `(name, value)` pairs.
pub fn bag<const N: usize>(entries: [(&str, AttrValue); N]) -> AttributeBag {
    entries.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
}

/// A successful reply with one group per element of `groups` under `tag`.
pub fn groups(tag: &str, groups: Vec<AttributeBag>) -> Result<IppReply, TransportError> {
    let value = match groups.len() {
        1 => AttrValue::Bag(groups.into_iter().next().unwrap()),
        _ => AttrValue::List(groups.into_iter().map(AttrValue::Bag).collect()),
    };
    reply(StatusCode::SuccessfulOk, bag([(tag, value)]))
}
