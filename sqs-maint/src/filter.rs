use std::sync::Arc;

use time::{format_description::well_known::Rfc3339, Duration, OffsetDateTime, Weekday};

use crate::{envelope::Envelope, Error, Result};

/// Webhooks under this prefix disable themselves when flooded, so their events are never
/// replayed.
pub const SLACK_WEBHOOK_PREFIX: &str = "https://hooks.slack.com/services/";

/// Decides whether a redriven message is forwarded to the target queue (`true`) or dropped.
///
/// Dropped messages are still deleted from the source queue. An error aborts the whole run.
///
/// Any closure with the right signature is a filter.
pub trait MessageFilter: Send + Sync {
    fn forward(&self, body: &str) -> Result<bool>;
}

impl<F> MessageFilter for F
where
    F: Fn(&str) -> Result<bool> + Send + Sync,
{
    fn forward(&self, body: &str) -> Result<bool> {
        self(body)
    }
}

/// Forwards everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct AlwaysForward;

impl MessageFilter for AlwaysForward {
    fn forward(&self, _body: &str) -> Result<bool> {
        Ok(true)
    }
}

type Clock = Arc<dyn Fn() -> OffsetDateTime + Send + Sync>;

/// Forwards webhook events that are recent enough and not addressed to a denylisted webhook.
///
/// Events are read from the nested envelope's `statusTime`. What counts as recent depends on
/// the local day of the week: between Saturday and Tuesday the window is five days so that
/// events from the weekend survive until someone looks at them, otherwise it is three.
#[derive(Clone)]
pub struct FreshnessFilter {
    denylist: Vec<String>,
    clock: Clock,
}

impl Default for FreshnessFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl FreshnessFilter {
    pub fn new() -> Self {
        Self {
            denylist: vec![SLACK_WEBHOOK_PREFIX.to_owned()],
            clock: Arc::new(local_now),
        }
    }

    /// Replaces the default denylist. Bodies containing any of `entries` are dropped.
    pub fn with_denylist<I, S>(mut self, entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.denylist = entries.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_clock(mut self, clock: impl Fn() -> OffsetDateTime + Send + Sync + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn max_age(weekday: Weekday) -> Duration {
        match weekday {
            Weekday::Saturday | Weekday::Sunday | Weekday::Monday | Weekday::Tuesday => {
                Duration::days(5)
            }
            Weekday::Wednesday | Weekday::Thursday | Weekday::Friday => Duration::days(3),
        }
    }
}

impl MessageFilter for FreshnessFilter {
    fn forward(&self, body: &str) -> Result<bool> {
        let envelope = Envelope::open(body)?;
        let status_time =
            OffsetDateTime::parse(envelope.event_str("statusTime")?, &Rfc3339).map_err(Error::generic)?;

        let denied = self.denylist.iter().any(|entry| body.contains(entry.as_str()));
        let now = (self.clock)();
        let cutoff = now - Self::max_age(now.weekday());

        Ok(status_time > cutoff && !denied)
    }
}

fn local_now() -> OffsetDateTime {
    OffsetDateTime::now_local().unwrap_or_else(|e| {
        tracing::debug!("local offset unavailable ({e}), using UTC");
        OffsetDateTime::now_utc()
    })
}
