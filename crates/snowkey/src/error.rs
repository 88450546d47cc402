use std::sync::{MutexGuard, PoisonError};

/// A result type defaulting to this crate's [`Error`].
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// All recoverable errors that `snowkey` can produce.
///
/// Configuration violations (a discriminator width above
/// [`MAX_APP_BITS`], an out-of-range discriminator passed to
/// [`Generator::create`], or a timestamp outside the 42-bit budget) are
/// programmer errors and panic instead of surfacing here.
///
/// [`MAX_APP_BITS`]: crate::MAX_APP_BITS
/// [`Generator::create`]: crate::Generator::create
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The operation failed due to a poisoned lock.
    ///
    /// This can happen if another thread panicked while holding the
    /// generator's lock.
    #[error("generator lock poisoned")]
    LockPoisoned,

    /// A key could not be decoded from its text form.
    #[error(transparent)]
    Parse(#[from] ParseKeyError),
}

// Convert all poisoned lock errors to a simplified `LockPoisoned`
impl<T> From<PoisonError<MutexGuard<'_, T>>> for Error {
    fn from(_: PoisonError<MutexGuard<'_, T>>) -> Self {
        Self::LockPoisoned
    }
}

/// Reasons a text form fails to decode into a [`Key`].
///
/// Decoding is all-or-nothing: on any of these, no partial key is returned.
///
/// [`Key`]: crate::Key
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ParseKeyError {
    /// A byte outside the base-32 alphabet (after separator handling and
    /// alias folding).
    #[error("non base-32 character 0x{byte:02X} found at index {index}")]
    NonBase32 {
        /// The offending input byte.
        byte: u8,
        /// Its position in the input.
        index: usize,
    },

    /// The input encodes a value wider than 64 bits.
    #[error("does not fit in 64 bits")]
    Overflow,

    /// A `-` separator in a position where it cannot separate two digit
    /// groups (first or last character).
    #[error("stray separator at index {index}")]
    StraySeparator {
        /// The separator's position in the input.
        index: usize,
    },
}
