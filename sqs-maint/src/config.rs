//! Invocation parameters and their validation.
//!
//! Parameters arrive as loose strings (environment variables or command line flags) and are
//! turned into a [`Plan`] before any call to the queue service is made.

use std::str::FromStr;

use thiserror::Error;

use crate::{rate_limiter::interval_for, tasks::redrive::DEFAULT_REDRIVE_RATE};

pub const COMMAND: &str = "command";
pub const FROM_QUEUE: &str = "fromQueue";
pub const TO_QUEUE: &str = "toQueue";
pub const QUEUE: &str = "queue";
pub const RATE: &str = "rate";
pub const FILTER: &str = "filter";

/// Problems with the invocation itself. These are reported back as the invocation's result
/// rather than failing it.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("Please specify command to execute.")]
    MissingCommand,
    #[error("Please specify command to execute.")]
    UnknownCommand(String),
    #[error("Please specify `{0}`.")]
    MissingParameter(&'static str),
    #[error("Invalid rate {0:?}: expected a positive number of requests per second.")]
    InvalidRate(String),
    #[error("Unknown filter {0:?}: expected `freshness` or `always`.")]
    UnknownFilter(String),
}

/// Which predicate decides what a redrive forwards.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum FilterKind {
    /// [`FreshnessFilter`](crate::FreshnessFilter), what the tool has always used.
    #[default]
    Freshness,
    /// [`AlwaysForward`](crate::AlwaysForward).
    Always,
}

impl FromStr for FilterKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "freshness" => Ok(Self::Freshness),
            "always" | "all" | "none" => Ok(Self::Always),
            _ => Err(ConfigError::UnknownFilter(s.to_owned())),
        }
    }
}

/// Raw invocation parameters, named after the keys operators set.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Parameters {
    /// `REDRIVE`, `READ` or `PURGE`, in any case.
    pub command: Option<String>,
    pub from_queue: Option<String>,
    pub to_queue: Option<String>,
    pub queue: Option<String>,
    /// Redrive rate in requests per second.
    pub rate: Option<String>,
    /// `freshness` or `always`.
    pub filter: Option<String>,
}

/// A validated invocation.
#[derive(Clone, Debug, PartialEq)]
pub enum Plan {
    Redrive {
        from_queue: String,
        to_queue: String,
        rate: f64,
        filter: FilterKind,
    },
    Read {
        queue: String,
    },
    Purge {
        queue: String,
    },
}

impl Parameters {
    /// Builds parameters from `key=value` style pairs, e.g. the process environment.
    ///
    /// Keys are matched exactly; unrelated pairs are ignored.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut params = Self::default();
        for (key, value) in pairs {
            let slot = match key.as_ref() {
                COMMAND => &mut params.command,
                FROM_QUEUE => &mut params.from_queue,
                TO_QUEUE => &mut params.to_queue,
                QUEUE => &mut params.queue,
                RATE => &mut params.rate,
                FILTER => &mut params.filter,
                _ => continue,
            };
            *slot = Some(value.into());
        }
        params
    }

    pub fn plan(&self) -> Result<Plan, ConfigError> {
        let command = present(&self.command).ok_or(ConfigError::MissingCommand)?;

        match command.to_ascii_uppercase().as_str() {
            "REDRIVE" => {
                let rate = match present(&self.rate) {
                    Some(rate) => parse_rate(rate)?,
                    None => DEFAULT_REDRIVE_RATE,
                };
                let filter = present(&self.filter)
                    .map(str::parse::<FilterKind>)
                    .transpose()?
                    .unwrap_or_default();

                Ok(Plan::Redrive {
                    from_queue: required(&self.from_queue, FROM_QUEUE)?,
                    to_queue: required(&self.to_queue, TO_QUEUE)?,
                    rate,
                    filter,
                })
            }
            "READ" => Ok(Plan::Read {
                queue: required(&self.queue, QUEUE)?,
            }),
            "PURGE" => Ok(Plan::Purge {
                queue: required(&self.queue, QUEUE)?,
            }),
            _ => Err(ConfigError::UnknownCommand(command.to_owned())),
        }
    }
}

/// Blank values count as unset; an empty environment variable is a common accident.
fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn required(value: &Option<String>, name: &'static str) -> Result<String, ConfigError> {
    present(value)
        .map(ToOwned::to_owned)
        .ok_or(ConfigError::MissingParameter(name))
}

fn parse_rate(value: &str) -> Result<f64, ConfigError> {
    match value.parse::<f64>() {
        Ok(rate) if interval_for(rate).is_some() => Ok(rate),
        _ => Err(ConfigError::InvalidRate(value.to_owned())),
    }
}
