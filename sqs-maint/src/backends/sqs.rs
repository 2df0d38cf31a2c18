use aws_sdk_sqs::{
    config::Region,
    types::{Message as SqsMessage, MessageSystemAttributeName, QueueAttributeName},
    Client,
};

use crate::{
    queue::{looks_like_url, QueueClient, MAX_BATCH_SIZE},
    Error, Message, QueueCounts, Result,
};

/// Region the tool has historically been deployed in.
pub const DEFAULT_REGION: &str = "us-west-2";

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SqsConfig {
    pub region: String,
    /// Overrides the service endpoint, e.g. to point at a local ElasticMQ.
    pub endpoint: Option<String>,
}

impl Default for SqsConfig {
    fn default() -> Self {
        Self {
            region: DEFAULT_REGION.to_owned(),
            endpoint: None,
        }
    }
}

/// [`QueueClient`] backed by Amazon SQS.
///
/// Credentials come from the usual AWS environment (variables, profile, instance role).
#[derive(Clone, Debug)]
pub struct SqsBackend {
    client: Client,
}

impl SqsBackend {
    pub async fn new(cfg: SqsConfig) -> Self {
        let mut loader = aws_config::from_env().region(Region::new(cfg.region));
        if let Some(endpoint) = &cfg.endpoint {
            loader = loader.endpoint_url(endpoint);
        }
        let aws_cfg = loader.load().await;

        Self::from_client(Client::new(&aws_cfg))
    }

    pub fn from_client(client: Client) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }
}

impl QueueClient for SqsBackend {
    async fn receive_batch(&self, queue_url: &str) -> Result<Vec<Message>> {
        let out = self
            .client
            .receive_message()
            .queue_url(queue_url)
            .max_number_of_messages(MAX_BATCH_SIZE)
            .message_system_attribute_names(
                MessageSystemAttributeName::ApproximateFirstReceiveTimestamp,
            )
            .send()
            .await
            .map_err(Error::generic)?;

        Ok(out
            .messages
            .unwrap_or_default()
            .into_iter()
            .map(wrap_message)
            .collect())
    }

    async fn send_body(&self, queue_url: &str, body: &str) -> Result<()> {
        self.client
            .send_message()
            .queue_url(queue_url)
            .message_body(body)
            .send()
            .await
            .map_err(Error::generic)?;

        Ok(())
    }

    async fn delete_by_receipt(&self, queue_url: &str, receipt_handle: &str) -> Result<()> {
        self.client
            .delete_message()
            .queue_url(queue_url)
            .receipt_handle(receipt_handle)
            .send()
            .await
            .map_err(Error::generic)?;

        Ok(())
    }

    async fn purge(&self, queue_url: &str) -> Result<()> {
        self.client
            .purge_queue()
            .queue_url(queue_url)
            .send()
            .await
            .map_err(|e| match e.as_service_error() {
                Some(err) if err.is_queue_does_not_exist() => {
                    Error::QueueNotFound(queue_url.to_owned())
                }
                _ => Error::generic(e),
            })?;

        Ok(())
    }

    async fn count_approximate(&self, queue_url: &str) -> Result<QueueCounts> {
        let out = self
            .client
            .get_queue_attributes()
            .queue_url(queue_url)
            .attribute_names(QueueAttributeName::ApproximateNumberOfMessages)
            .attribute_names(QueueAttributeName::ApproximateNumberOfMessagesDelayed)
            .attribute_names(QueueAttributeName::ApproximateNumberOfMessagesNotVisible)
            .send()
            .await
            .map_err(Error::generic)?;

        let attributes = out.attributes.unwrap_or_default();
        let count = |name: QueueAttributeName| -> Result<u64> {
            attributes
                .get(&name)
                .map_or(Ok(0), |v| v.parse().map_err(Error::generic))
        };

        Ok(QueueCounts {
            visible: count(QueueAttributeName::ApproximateNumberOfMessages)?,
            delayed: count(QueueAttributeName::ApproximateNumberOfMessagesDelayed)?,
            not_visible: count(QueueAttributeName::ApproximateNumberOfMessagesNotVisible)?,
        })
    }

    async fn resolve_queue_url(&self, name_or_url: &str) -> Result<String> {
        if looks_like_url(name_or_url) {
            return Ok(name_or_url.to_owned());
        }

        let out = self
            .client
            .get_queue_url()
            .queue_name(name_or_url)
            .send()
            .await
            .map_err(|e| match e.as_service_error() {
                Some(err) if err.is_queue_does_not_exist() => {
                    Error::QueueNotFound(name_or_url.to_owned())
                }
                _ => Error::generic(e),
            })?;

        out.queue_url
            .ok_or_else(|| Error::QueueNotFound(name_or_url.to_owned()))
    }
}

fn wrap_message(message: SqsMessage) -> Message {
    Message {
        message_id: message.message_id.unwrap_or_default(),
        receipt_handle: message.receipt_handle.unwrap_or_default(),
        body: message.body.unwrap_or_default(),
        attributes: message
            .attributes
            .unwrap_or_default()
            .into_iter()
            .map(|(name, value)| (name.as_str().to_owned(), value))
            .collect(),
    }
}
