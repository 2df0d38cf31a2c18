//! The maintenance tasks. Each one runs to completion against a single [`QueueClient`] and
//! reports back with a human-readable summary through its report's `Display` impl.
//!
//! [`QueueClient`]: crate::QueueClient

use crate::{Error, Message};

pub mod purge;
pub mod read;
pub mod redrive;

pub use self::{
    purge::{PurgeReport, PurgeTask},
    read::{ReadReport, ReadTask, READ_LIMIT},
    redrive::{RedriveReport, RedriveStats, RedriveTask, DEFAULT_REDRIVE_RATE},
};

/// Attaches the message to a filter or consumer failure, unless the plug-in already did.
fn rejected(message: &Message, err: Error) -> Error {
    match err {
        Error::Rejected { .. } => err,
        err => Error::rejected(message, err),
    }
}
