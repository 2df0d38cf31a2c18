use indexmap::{IndexMap, IndexSet};

use crate::{envelope::Envelope, Error, Message, Result};

/// Called by the read task for every message it looks at.
///
/// The returned string is what the consumer extracted from the message; the read task only
/// logs it. An error aborts the run.
pub trait MessageConsumer: Send {
    fn consume(&mut self, message: &Message, body: &str) -> Result<String>;
}

impl<F> MessageConsumer for F
where
    F: FnMut(&Message, &str) -> Result<String> + Send,
{
    fn consume(&mut self, message: &Message, body: &str) -> Result<String> {
        self(message, body)
    }
}

/// Collects webhook events by the webhook URL they are addressed to.
///
/// URLs keep the order they were first seen in, and so do the distinct events under each URL.
/// An event is recorded by its `text` field when it has one, otherwise by its raw JSON.
#[derive(Debug, Default)]
pub struct GroupByWebhookUrl {
    groups: IndexMap<String, IndexSet<String>>,
}

impl GroupByWebhookUrl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn groups(&self) -> &IndexMap<String, IndexSet<String>> {
        &self.groups
    }

    pub fn into_groups(self) -> IndexMap<String, IndexSet<String>> {
        self.groups
    }

    fn record(&mut self, body: &str) -> Result<String> {
        let Envelope {
            url,
            event_raw,
            event,
        } = Envelope::open(body)?;
        let url =
            url.ok_or_else(|| Error::InvalidPayload("envelope has no webhook url".to_owned()))?;

        let event = match event.get("text") {
            Some(serde_json::Value::String(text)) => text.clone(),
            Some(other) => other.to_string(),
            None => event_raw,
        };

        self.groups.entry(url).or_default().insert(event.clone());
        Ok(event)
    }
}

impl MessageConsumer for GroupByWebhookUrl {
    fn consume(&mut self, message: &Message, body: &str) -> Result<String> {
        self.record(body).map_err(|e| Error::rejected(message, e))
    }
}
