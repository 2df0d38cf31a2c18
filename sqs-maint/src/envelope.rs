//! The nested envelope webhook events travel in.
//!
//! ```text
//! { "requestId": .., "className": .., "payload": "<inner as a JSON string>" }
//!   inner:     { "url": "https://..", "payload": "<event as a JSON string>", .. }
//!     event:   { "statusTime": "2024-05-01T10:00:00Z", "text": "..", .. }
//! ```
//!
//! Only the filter and the grouping consumer look inside; the tasks treat bodies as opaque.

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::{Error, Result};

#[derive(Deserialize)]
struct Outer {
    payload: String,
}

#[derive(Deserialize)]
struct Inner {
    #[serde(default)]
    url: Option<String>,
    payload: String,
}

#[derive(Debug)]
pub(crate) struct Envelope {
    /// Webhook the event is addressed to.
    pub(crate) url: Option<String>,
    /// The event exactly as it was embedded.
    pub(crate) event_raw: String,
    pub(crate) event: Map<String, Value>,
}

impl Envelope {
    pub(crate) fn open(body: &str) -> Result<Self> {
        let outer: Outer = serde_json::from_str(body)?;
        let inner: Inner = serde_json::from_str(&outer.payload)?;
        let event = serde_json::from_str(&inner.payload)?;

        Ok(Self {
            url: inner.url,
            event_raw: inner.payload,
            event,
        })
    }

    pub(crate) fn event_str(&self, field: &str) -> Result<&str> {
        self.event
            .get(field)
            .and_then(Value::as_str)
            .ok_or_else(|| Error::InvalidPayload(format!("event has no string field `{field}`")))
    }
}

/// Builds an envelope body. Only used to fabricate messages in tests.
#[cfg(test)]
pub(crate) fn wrap(url: &str, event: &Value) -> String {
    let inner = serde_json::json!({
        "url": url,
        "payload": event.to_string(),
    });
    serde_json::json!({
        "requestId": "req-1",
        "className": "WebhookRequest",
        "payload": inner.to_string(),
    })
    .to_string()
}
