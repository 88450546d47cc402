use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Key epoch: Saturday, June 1, 2024 00:00:00 UTC
///
/// Key timestamps count milliseconds from this instant. 42 bits of
/// milliseconds reach into the year 2163.
pub const KEY_EPOCH: Duration = Duration::from_millis(1_717_200_000_000);

/// [`KEY_EPOCH`] as milliseconds since the Unix epoch, for timestamp math.
pub(crate) const EPOCH_MILLIS: u64 = KEY_EPOCH.as_millis() as u64;

/// A trait for time sources that return a wall-clock timestamp.
///
/// This abstraction allows you to plug in the real system clock or a mocked
/// time source in tests.
///
/// The unit is **milliseconds since the Unix epoch** (not the key epoch; the
/// generator performs the epoch adjustment itself).
///
/// # Example
///
/// ```
/// use snowkey::TimeSource;
///
/// struct FixedTime;
/// impl TimeSource for FixedTime {
///     fn current_millis(&self) -> u64 {
///         1234
///     }
/// }
///
/// let time = FixedTime;
/// assert_eq!(time.current_millis(), 1234);
/// ```
pub trait TimeSource {
    /// Returns the current time in milliseconds since the Unix epoch.
    fn current_millis(&self) -> u64;
}

/// The wall clock, truncated to milliseconds.
///
/// This is the time source used by [`Generator::new`]. It reads
/// [`SystemTime`] on every call, so it follows external clock adjustments;
/// the generator's sequence counter is what keeps keys strictly increasing
/// when the reading repeats or regresses.
///
/// [`Generator::new`]: crate::Generator::new
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl TimeSource for SystemClock {
    fn current_millis(&self) -> u64 {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock before Unix epoch");
        now.as_millis() as u64
    }
}
