#[cfg(feature = "in_memory")]
pub mod in_memory;
#[cfg(feature = "sqs")]
pub mod sqs;

#[cfg(feature = "in_memory")]
pub use in_memory::{InMemoryBackend, Operation, OperationCounts};
#[cfg(feature = "sqs")]
pub use sqs::{SqsBackend, SqsConfig};
