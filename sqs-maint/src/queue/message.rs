use std::collections::HashMap;

use crate::{Error, Result};

/// Name of the system attribute holding the time a message was first delivered to any consumer.
pub const FIRST_RECEIVE_TIMESTAMP: &str = "ApproximateFirstReceiveTimestamp";

/// One delivery of a message, as handed out by a receive.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Message {
    pub message_id: String,
    /// Authorizes deletion of this particular delivery. Changes on every receive.
    pub receipt_handle: String,
    pub body: String,
    /// System attributes, keyed by their service name.
    pub attributes: HashMap<String, String>,
}

impl Message {
    /// Milliseconds since the epoch at which this message was first delivered to any consumer.
    pub fn first_received(&self) -> Result<i64> {
        let value = self
            .attributes
            .get(FIRST_RECEIVE_TIMESTAMP)
            .ok_or_else(|| Error::MissingAttribute {
                message_id: self.message_id.clone(),
                name: FIRST_RECEIVE_TIMESTAMP,
            })?;

        value.trim().parse().map_err(|_| Error::InvalidAttribute {
            message_id: self.message_id.clone(),
            name: FIRST_RECEIVE_TIMESTAMP,
            value: value.clone(),
        })
    }
}
