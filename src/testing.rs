//! Shared in-crate test doubles: a scripted wire and a recording delay.

use std::collections::VecDeque;
use std::time::Duration;

use parking_lot::Mutex;

use crate::error::TransportError;
use crate::transport::{CancelToken, Delay, Wire, WireReply};
use crate::wire::{CatalogItem, QueryBody};

pub(crate) fn ok_reply(body: &str) -> WireReply {
    WireReply {
        status: 200,
        body: body.to_string(),
    }
}

pub(crate) fn throttled_reply() -> WireReply {
    WireReply {
        status: 429,
        body: String::new(),
    }
}

pub(crate) fn item(id: &str, votecount: u64) -> CatalogItem {
    CatalogItem {
        id: id.to_string(),
        title: Some(format!("title {id}")),
        votecount: Some(votecount),
        popularity: None,
        rating: None,
    }
}

/// Serialize a page reply the way the service would.
pub(crate) fn page_reply(items: &[CatalogItem], more: bool) -> WireReply {
    let body = serde_json::json!({ "results": items, "more": more });
    ok_reply(&body.to_string())
}

/// [`Wire`] double that serves a fixed reply script FIFO and records every
/// exchange.
pub(crate) struct ScriptedWire {
    replies: Mutex<VecDeque<Result<WireReply, TransportError>>>,
    log: Mutex<Vec<(String, serde_json::Value)>>,
}

impl ScriptedWire {
    pub fn new(replies: Vec<Result<WireReply, TransportError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            log: Mutex::new(Vec::new()),
        }
    }

    /// Number of exchanges attempted against this wire.
    pub fn exchanges(&self) -> usize {
        self.log.lock().len()
    }

    /// Serialized bodies of every POST, in order (`null` for GETs).
    pub fn bodies(&self) -> Vec<serde_json::Value> {
        self.log.lock().iter().map(|(_, b)| b.clone()).collect()
    }

    fn next_reply(&self) -> Result<WireReply, TransportError> {
        self.replies
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::Network("reply script exhausted".to_string())))
    }
}

impl Wire for ScriptedWire {
    fn post(&self, endpoint: &str, body: &QueryBody) -> Result<WireReply, TransportError> {
        let value = serde_json::to_value(body).unwrap_or(serde_json::Value::Null);
        self.log.lock().push((endpoint.to_string(), value));
        self.next_reply()
    }

    fn get(&self, endpoint: &str) -> Result<WireReply, TransportError> {
        self.log
            .lock()
            .push((endpoint.to_string(), serde_json::Value::Null));
        self.next_reply()
    }
}

/// [`Delay`] double that records requested waits and returns immediately.
pub(crate) struct InstantDelay {
    waits: Mutex<Vec<Duration>>,
}

impl InstantDelay {
    pub fn new() -> Self {
        Self {
            waits: Mutex::new(Vec::new()),
        }
    }

    pub fn waits(&self) -> Vec<Duration> {
        self.waits.lock().clone()
    }
}

impl Delay for InstantDelay {
    fn wait(&self, duration: Duration, cancel: &CancelToken) -> bool {
        self.waits.lock().push(duration);
        !cancel.is_cancelled()
    }
}
