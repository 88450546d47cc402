use crate::key::{APP_SEQ_BITS, APP_SEQ_MASK, MAX_APP_BITS, MAX_TIMESTAMP};
use crate::time::EPOCH_MILLIS;
use crate::{Key, KeyGenStatus, Result, SystemClock, TimeSource};
use std::sync::Mutex;
use std::thread;
use std::time::Duration;
#[cfg(feature = "tracing")]
use tracing::instrument;

/// How long [`Generator::create`] sleeps when the sequence space for the
/// current millisecond is spent. The next clock tick brings a fresh budget,
/// so the retry loop needs no upper bound.
const EXHAUSTED_BACKOFF: Duration = Duration::from_millis(1);

/// The pair guarded by the generator's mutex.
#[derive(Debug, Default)]
struct State {
    /// Unix-millisecond timestamp of the most recent creation.
    last_ts: u64,
    /// Next sequence number to hand out for `last_ts`.
    next_seq: u64,
}

/// A generator for unique, time-ordered [`Key`] values.
///
/// The generator is configured once with the number of bits reserved for the
/// application discriminator (0 through [`MAX_APP_BITS`]); the remaining
/// bits of the 22-bit low field count keys minted within one millisecond.
/// Narrow discriminators leave more sequence bits and therefore a higher
/// per-millisecond throughput ceiling.
///
/// Keys from one generator instance are strictly increasing in call order,
/// also across threads: the generator wraps its (timestamp, sequence) pair
/// in a [`Mutex`] and may be shared by reference or in an `Arc`. There is no
/// coordination between instances; callers must keep discriminators disjoint
/// across generators and processes to avoid collisions.
///
/// # Example
///
/// ```
/// use snowkey::Generator;
///
/// // 8 discriminator bits leave 14 sequence bits per millisecond
/// let generator = Generator::new(8);
/// let key = generator.create(3);
///
/// assert!(key.is_valid());
/// assert_eq!(generator.app_id(key), 3);
/// ```
pub struct Generator<T = SystemClock>
where
    T: TimeSource,
{
    state: Mutex<State>,
    time: T,
    /// Number of bits for application use. Range: 0 to [`MAX_APP_BITS`].
    app_bits: u32,
    /// `1 << app_bits`; the first out-of-range discriminator.
    app_max: u32,
}

impl Generator<SystemClock> {
    /// Creates a new key generator with a given number of bits for
    /// application use, reading the system clock.
    ///
    /// # Panics
    ///
    /// Panics if `app_bits` exceeds [`MAX_APP_BITS`]: at least two of the 22
    /// non-timestamp bits must remain for the sequence counter.
    pub fn new(app_bits: u32) -> Self {
        Self::with_time_source(app_bits, SystemClock)
    }
}

impl Default for Generator<SystemClock> {
    /// A generator with no discriminator bits; only `create(0)` is in range.
    fn default() -> Self {
        Self::new(0)
    }
}

impl<T> Generator<T>
where
    T: TimeSource,
{
    /// Creates a new key generator reading time from `time`.
    ///
    /// This is how tests drive the generator with a deterministic clock; for
    /// the common case see [`Generator::new`].
    ///
    /// # Panics
    ///
    /// Panics if `app_bits` exceeds [`MAX_APP_BITS`].
    ///
    /// # Example
    ///
    /// ```
    /// use snowkey::{Generator, TimeSource};
    ///
    /// struct FixedTime;
    /// impl TimeSource for FixedTime {
    ///     fn current_millis(&self) -> u64 {
    ///         1_717_200_000_000 + 42
    ///     }
    /// }
    ///
    /// let generator = Generator::with_time_source(0, FixedTime);
    /// assert_eq!(generator.create(0).timestamp_millis(), 42);
    /// ```
    pub fn with_time_source(app_bits: u32, time: T) -> Self {
        assert!(
            app_bits <= MAX_APP_BITS,
            "key generator needs too many application bits: {app_bits} (max {MAX_APP_BITS})"
        );
        Self {
            state: Mutex::new(State::default()),
            time,
            app_bits,
            app_max: 1 << app_bits,
        }
    }

    /// Generates a new key carrying the given application discriminator.
    ///
    /// Blocks (sleeping in 1 ms steps) while the sequence space for the
    /// current millisecond is exhausted; the clock tick that follows always
    /// provides a fresh budget. For a non-blocking attempt, use
    /// [`Generator::try_create`].
    ///
    /// # Panics
    ///
    /// Panics if `app_id` is out of range for this generator's discriminator
    /// width, if the clock reads outside the 42-bit timestamp budget, or if
    /// the lock is poisoned.
    pub fn create(&self, app_id: u32) -> Key {
        loop {
            match self.try_create(app_id).unwrap() {
                KeyGenStatus::Ready { key } => return key,
                KeyGenStatus::Pending { yield_for } => thread::sleep(yield_for),
            }
        }
    }

    /// Attempts to generate a new key without blocking.
    ///
    /// Returns [`KeyGenStatus::Ready`] with the key, or
    /// [`KeyGenStatus::Pending`] when the sequence space for the current
    /// millisecond is spent and the caller should back off until the clock
    /// advances.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LockPoisoned`] if another thread panicked while
    /// holding the generator's lock.
    ///
    /// # Panics
    ///
    /// Panics if `app_id` is out of range for this generator's discriminator
    /// width, or if the clock reads outside the 42-bit timestamp budget —
    /// both are unrecoverable configuration errors, not expected runtime
    /// conditions.
    ///
    /// [`Error::LockPoisoned`]: crate::Error::LockPoisoned
    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self)))]
    pub fn try_create(&self, app_id: u32) -> Result<KeyGenStatus> {
        assert!(
            app_id < self.app_max,
            "application id {app_id} out of range (max {})",
            self.app_max - 1
        );

        let now = self.time.current_millis();
        let seq = {
            let mut state = self.state.lock()?;
            if now > state.last_ts {
                state.last_ts = now;
                state.next_seq = 1;
                0
            } else {
                // Same millisecond, or the clock went backwards; both keep
                // spending sequence numbers from the current budget.
                let seq = state.next_seq;
                state.next_seq += 1;
                seq
            }
        };

        if seq >= self.seq_space() {
            return Ok(KeyGenStatus::Pending {
                yield_for: EXHAUSTED_BACKOFF,
            });
        }

        let offset = now
            .checked_sub(EPOCH_MILLIS)
            .expect("clock reads before the key epoch");
        assert!(
            offset <= MAX_TIMESTAMP,
            "timestamp {offset} exceeds the 42-bit budget ({MAX_TIMESTAMP})"
        );

        let raw =
            (offset << APP_SEQ_BITS) | (u64::from(app_id) << (APP_SEQ_BITS - self.app_bits)) | seq;
        Ok(KeyGenStatus::Ready {
            key: Key::from_raw(raw),
        })
    }

    /// Returns the largest discriminator accepted by [`Generator::create`].
    pub fn max_app_id(&self) -> u32 {
        self.app_max - 1
    }

    /// Extracts the application discriminator from a key.
    ///
    /// The key must have been produced under this generator's discriminator
    /// width; a key from a generator configured differently yields a
    /// meaningless value, not an error.
    pub fn app_id(&self, key: Key) -> u32 {
        ((key.to_raw() & APP_SEQ_MASK) >> (APP_SEQ_BITS - self.app_bits)) as u32
    }

    /// Extracts the per-millisecond sequence number from a key.
    ///
    /// Subject to the same width contract as [`Generator::app_id`].
    pub fn sequence(&self, key: Key) -> u32 {
        (key.to_raw() & APP_SEQ_MASK) as u32 & (self.seq_space() as u32 - 1)
    }

    /// Number of sequence values available per millisecond.
    fn seq_space(&self) -> u64 {
        1 << (APP_SEQ_BITS - self.app_bits)
    }
}
