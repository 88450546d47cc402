use crate::Key;
use std::time::Duration;

/// Represents the result of a single, non-blocking key generation attempt.
///
/// This type models the outcome of [`Generator::try_create`]:
///
/// - [`KeyGenStatus::Ready`] indicates a new key was minted.
/// - [`KeyGenStatus::Pending`] means the sequence space for the current
///   millisecond is spent and the caller should wait for the clock to
///   advance before retrying.
///
/// This allows non-blocking generation loops and clean backoff strategies;
/// [`Generator::create`] is the blocking loop over it.
///
/// # Example
///
/// ```
/// use snowkey::{Generator, KeyGenStatus};
///
/// let generator = Generator::new(0);
/// match generator.try_create(0).unwrap() {
///     KeyGenStatus::Ready { key } => println!("key: {key}"),
///     KeyGenStatus::Pending { yield_for } => println!("back off for {yield_for:?}"),
/// }
/// ```
///
/// [`Generator::create`]: crate::Generator::create
/// [`Generator::try_create`]: crate::Generator::try_create
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyGenStatus {
    /// A unique key was generated and is ready to use.
    Ready {
        /// The generated key.
        key: Key,
    },
    /// No key could be generated because the sequence space is exhausted for
    /// the current millisecond.
    Pending {
        /// How long to sleep or yield before attempting again.
        yield_for: Duration,
    },
}
